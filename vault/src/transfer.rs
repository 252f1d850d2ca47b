//! Outbound value movement.
//!
//! The vault never moves funds itself. On withdrawal it hands the recipient
//! and amount to a [`ValueTransfer`] supplied by the surrounding ledger. If
//! that payout fails the withdrawal is rolled back in full.
//!
//! [`AccountBook`] is a plain in-memory implementation that credits
//! recipients in a map. Drivers and tests use it in place of a real chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::Amount;

/// Why an outbound payment could not be made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    /// The recipient's account cannot absorb the payment.
    #[error("recipient {recipient} balance would overflow")]
    RecipientOverflow {
        /// The account being credited.
        recipient: Address,
    },

    /// The recipient refused the payment.
    #[error("recipient {0} rejected the payment")]
    Rejected(Address),
}

/// Moves native currency out of the vault to another account.
pub trait ValueTransfer {
    /// Pays `amount` to `to`. Must either complete or leave no trace.
    fn pay(&mut self, to: &Address, amount: Amount) -> Result<(), PayoutError>;
}

/// In-memory account balances credited by withdrawals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBook {
    balances: BTreeMap<Address, Amount>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance credited to `account` so far.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Every account that has received a payment, in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }
}

impl ValueTransfer for AccountBook {
    fn pay(&mut self, to: &Address, amount: Amount) -> Result<(), PayoutError> {
        let current = self.balance_of(to);
        let updated = current
            .checked_add(amount)
            .ok_or(PayoutError::RecipientOverflow { recipient: *to })?;
        self.balances.insert(*to, updated);
        Ok(())
    }
}
