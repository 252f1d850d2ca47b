//! # Vault Configuration & Constants
//!
//! Every bound the vault enforces at creation time lives here, together with
//! [`VaultConfig`], the bundle of parameters a vault is created from.
//!
//! The bounds are part of the vault's external contract. Monitors and
//! drivers rely on them being stable, so changing one is a breaking change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest accepted maturation delay, in blocks.
///
/// Anything shorter leaves tier-one members no realistic window to notice and
/// cancel a rogue transfer.
pub const MIN_MATURATION_DELAY: u64 = 4;

/// Largest accepted maturation delay, in blocks (2^32, inclusive).
pub const MAX_MATURATION_DELAY: u64 = 1 << 32;

/// Length of an account identifier in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// The null account. Never a valid transfer recipient.
pub const NULL_ADDRESS: Address = Address::new([0u8; ADDRESS_LENGTH]);

/// Identifier assigned to the first transfer a vault ever records.
/// Ids start at one so that zero can never name a live transfer.
pub const FIRST_TRANSFER_ID: u64 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a set of creation parameters is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The account creating the vault may not be its owner.
    #[error("creator {0} cannot be the vault owner")]
    CreatorIsOwner(Address),

    /// The owner and the initial tier-two member must be distinct accounts.
    #[error("owner {0} cannot also be the initial tier-two member")]
    OwnerIsTierTwo(Address),

    /// The maturation delay falls outside the accepted range.
    #[error("maturation delay {delay} outside [{min}, {max}]")]
    DelayOutOfRange {
        /// The rejected delay.
        delay: u64,
        /// Lower bound (inclusive).
        min: u64,
        /// Upper bound (inclusive).
        max: u64,
    },

    /// A vault must be able to hold at least one pending transfer.
    #[error("capacity must be at least one pending transfer")]
    ZeroCapacity,

    /// The vault's own address is null or belongs to the owner or the
    /// initial tier-two member. Such a member could never be paid.
    #[error("vault address {0} is null or held by a member")]
    InvalidVaultAddress(Address),
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Parameters fixed when a vault is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Beneficiary of the vault. Permanently tier-one.
    pub owner: Address,
    /// First operational (tier-two) member.
    pub initial_tier_two: Address,
    /// Blocks a pending transfer must age before it can be withdrawn.
    pub maturation_delay: u64,
    /// Maximum number of simultaneously pending transfers.
    pub capacity: usize,
}

impl VaultConfig {
    /// Checks the parameters for a vault at `vault` created by `creator`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking the creator, the
    /// role separation, the vault address, the delay range and the
    /// capacity, in that order.
    pub fn validate(&self, creator: &Address, vault: &Address) -> Result<(), ConfigError> {
        if *creator == self.owner {
            return Err(ConfigError::CreatorIsOwner(self.owner));
        }
        if self.owner == self.initial_tier_two {
            return Err(ConfigError::OwnerIsTierTwo(self.owner));
        }
        check_vault_address(vault, [&self.owner, &self.initial_tier_two])?;
        check_bounds(self.maturation_delay, self.capacity)
    }
}

/// Rejects a vault address that is null or equal to any of `members`.
pub(crate) fn check_vault_address<'a>(
    vault: &Address,
    members: impl IntoIterator<Item = &'a Address>,
) -> Result<(), ConfigError> {
    if vault.is_null() || members.into_iter().any(|m| m == vault) {
        return Err(ConfigError::InvalidVaultAddress(*vault));
    }
    Ok(())
}

/// Checks the maturation delay range and the capacity floor.
pub(crate) fn check_bounds(maturation_delay: u64, capacity: usize) -> Result<(), ConfigError> {
    if !(MIN_MATURATION_DELAY..=MAX_MATURATION_DELAY).contains(&maturation_delay) {
        return Err(ConfigError::DelayOutOfRange {
            delay: maturation_delay,
            min: MIN_MATURATION_DELAY,
            max: MAX_MATURATION_DELAY,
        });
    }
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: u64 = 0xF0;

    fn addr(n: u64) -> Address {
        Address::from_index(n)
    }

    fn config(delay: u64, capacity: usize) -> VaultConfig {
        VaultConfig {
            owner: addr(1),
            initial_tier_two: addr(2),
            maturation_delay: delay,
            capacity,
        }
    }

    #[test]
    fn delay_bounds_are_inclusive() {
        let accepts = |delay| config(delay, 10).validate(&addr(2), &addr(VAULT)).is_ok();
        assert!(accepts(MIN_MATURATION_DELAY));
        assert!(accepts(MAX_MATURATION_DELAY));
        assert!(!accepts(MIN_MATURATION_DELAY - 1));
        assert!(!accepts(MAX_MATURATION_DELAY + 1));
        assert!(!accepts(0));
    }

    #[test]
    fn creator_cannot_be_owner() {
        assert_eq!(
            config(8640, 10).validate(&addr(1), &addr(VAULT)),
            Err(ConfigError::CreatorIsOwner(addr(1)))
        );
    }

    #[test]
    fn owner_and_spender_must_differ() {
        let mut cfg = config(8640, 10);
        cfg.initial_tier_two = cfg.owner;
        assert_eq!(
            cfg.validate(&addr(3), &addr(VAULT)),
            Err(ConfigError::OwnerIsTierTwo(addr(1)))
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            config(8640, 0).validate(&addr(2), &addr(VAULT)),
            Err(ConfigError::ZeroCapacity)
        );
    }

    #[test]
    fn vault_address_must_be_free() {
        let cfg = config(8640, 10);
        for taken in [NULL_ADDRESS, addr(1), addr(2)] {
            assert_eq!(
                cfg.validate(&addr(3), &taken),
                Err(ConfigError::InvalidVaultAddress(taken))
            );
        }
        // The creator may deploy at its own address.
        assert!(cfg.validate(&addr(3), &addr(3)).is_ok());
    }

    #[test]
    fn null_address_is_all_zero() {
        assert!(NULL_ADDRESS.is_null());
        assert_eq!(NULL_ADDRESS.as_bytes(), &[0u8; ADDRESS_LENGTH]);
    }
}
