//! Access policy: who may call what, and when.
//!
//! Each public vault operation is an [`Operation`] with a fixed
//! [`Role`] requirement and a fixed rule about the time lock. The vault
//! consults this table before touching any state, so the policy reads in
//! one place:
//!
//! | Operation            | Role     | While locked |
//! |----------------------|----------|--------------|
//! | `deposit`            | anyone   | yes          |
//! | `lock`               | tier-one | yes          |
//! | `add_tier_one`       | tier-one | no           |
//! | `add_tier_two`       | tier-one | no           |
//! | `remove_tier_two`    | tier-one | no           |
//! | `propose_transfer`   | tier-two | no           |
//! | `cancel_by_admin`    | tier-one | yes          |
//! | `cancel_own`         | tier-two | no           |
//! | `clear_all_payments` | tier-one | yes          |
//! | `withdraw`           | anyone   | no           |
//! | `destroy`            | tier-one | no           |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::Height;

/// Identity and clock reading supplied by the environment for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// The account invoking the operation.
    pub caller: Address,
    /// Logical-clock height at which the operation executes.
    pub height: Height,
}

impl Call {
    pub fn new(caller: Address, height: Height) -> Self {
        Self { caller, height }
    }
}

/// Role a caller must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No membership required.
    Anyone,
    /// Administrative members.
    TierOne,
    /// Operational members.
    TierTwo,
}

/// A public vault operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Deposit,
    Lock,
    AddTierOne,
    AddTierTwo,
    RemoveTierTwo,
    ProposeTransfer,
    CancelByAdmin,
    CancelOwn,
    ClearAllPayments,
    Withdraw,
    Destroy,
}

impl Operation {
    /// Role the caller must hold.
    pub const fn required_role(self) -> Role {
        match self {
            Operation::Deposit | Operation::Withdraw => Role::Anyone,
            Operation::ProposeTransfer | Operation::CancelOwn => Role::TierTwo,
            Operation::Lock
            | Operation::AddTierOne
            | Operation::AddTierTwo
            | Operation::RemoveTierTwo
            | Operation::CancelByAdmin
            | Operation::ClearAllPayments
            | Operation::Destroy => Role::TierOne,
        }
    }

    /// Whether the operation may run while the vault is time-locked.
    pub const fn allowed_while_locked(self) -> bool {
        matches!(
            self,
            Operation::Deposit
                | Operation::Lock
                | Operation::CancelByAdmin
                | Operation::ClearAllPayments
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Lock => "lock",
            Operation::AddTierOne => "add_tier_one",
            Operation::AddTierTwo => "add_tier_two",
            Operation::RemoveTierTwo => "remove_tier_two",
            Operation::ProposeTransfer => "propose_transfer",
            Operation::CancelByAdmin => "cancel_by_admin",
            Operation::CancelOwn => "cancel_own",
            Operation::ClearAllPayments => "clear_all_payments",
            Operation::Withdraw => "withdraw",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_deposit_lock_and_purges_pass_the_lock() {
        let open: Vec<_> = [
            Operation::Deposit,
            Operation::Lock,
            Operation::AddTierOne,
            Operation::AddTierTwo,
            Operation::RemoveTierTwo,
            Operation::ProposeTransfer,
            Operation::CancelByAdmin,
            Operation::CancelOwn,
            Operation::ClearAllPayments,
            Operation::Withdraw,
            Operation::Destroy,
        ]
        .into_iter()
        .filter(|op| op.allowed_while_locked())
        .collect();
        assert_eq!(
            open,
            vec![
                Operation::Deposit,
                Operation::Lock,
                Operation::CancelByAdmin,
                Operation::ClearAllPayments
            ]
        );
    }

    #[test]
    fn withdraw_is_open_to_anyone() {
        assert_eq!(Operation::Withdraw.required_role(), Role::Anyone);
        assert_eq!(Operation::CancelOwn.required_role(), Role::TierTwo);
        assert_eq!(Operation::Destroy.required_role(), Role::TierOne);
    }
}
