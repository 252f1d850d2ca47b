//! Checked arithmetic over the vault's `u64` numeric domain.
//!
//! Amounts and heights never wrap. Every addition that could leave the
//! domain goes through [`add`], which turns the overflow into
//! [`VaultError::ArithmeticOverflow`]; subtractions that must not go
//! negative either saturate ([`uncommitted`]) or go through [`sub`].

use crate::error::VaultError;
use crate::{Amount, Height};

/// `lhs + rhs`, or [`VaultError::ArithmeticOverflow`].
pub fn add(lhs: u64, rhs: u64) -> Result<u64, VaultError> {
    lhs.checked_add(rhs)
        .ok_or(VaultError::ArithmeticOverflow { lhs, rhs })
}

/// `lhs - rhs` for callers whose invariants guarantee `rhs <= lhs`.
///
/// A violated invariant is still reported rather than wrapped, as
/// [`VaultError::ArithmeticOverflow`] with the operands as given.
pub fn sub(lhs: u64, rhs: u64) -> Result<u64, VaultError> {
    lhs.checked_sub(rhs)
        .ok_or(VaultError::ArithmeticOverflow { lhs, rhs })
}

/// Balance not yet committed to pending transfers, floored at zero.
pub fn uncommitted(balance: Amount, committed: Amount) -> Amount {
    balance.saturating_sub(committed)
}

/// First height at which something created at `created_at` has aged `delay`.
///
/// Saturates at `u64::MAX`: a maturity beyond the clock's range is simply
/// never reached.
pub fn matures_at(created_at: Height, delay: u64) -> Height {
    created_at.saturating_add(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_wraparound() {
        assert_eq!(add(2, 3), Ok(5));
        assert_eq!(
            add(u64::MAX, 1),
            Err(VaultError::ArithmeticOverflow {
                lhs: u64::MAX,
                rhs: 1
            })
        );
    }

    #[test]
    fn sub_rejects_underflow() {
        assert_eq!(sub(5, 5), Ok(0));
        assert!(sub(1, 2).is_err());
    }

    #[test]
    fn uncommitted_never_negative() {
        assert_eq!(uncommitted(3, 2), 1);
        assert_eq!(uncommitted(2, 3), 0);
    }

    #[test]
    fn maturity_saturates() {
        assert_eq!(matures_at(10, 4), 14);
        assert_eq!(matures_at(u64::MAX - 1, 4), u64::MAX);
    }
}
