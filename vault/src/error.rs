//! # Vault Errors
//!
//! Every rejected operation surfaces as exactly one [`VaultError`]. Failures
//! are all-or-nothing: when an operation returns `Err`, no part of the vault
//! or its ledger has changed.
//!
//! External drivers that need to branch on the failure without caring about
//! its context fields should match on [`VaultError::kind`], whose values are
//! stable across releases.
//!
//! [`SnapshotError`] is separate: it rejects serialized state that no
//! sequence of operations could have produced.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Operation;
use crate::address::Address;
use crate::config::ConfigError;
use crate::ledger::TransferId;
use crate::transfer::PayoutError;
use crate::{Amount, Height};

/// Errors returned by vault and ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller does not hold the role the operation requires.
    #[error("unauthorized: {caller} may not {operation}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The attempted operation.
        operation: Operation,
    },

    /// The vault is time-locked at the current height.
    #[error("vault locked until height {unlock_height} (now {now})")]
    VaultLocked {
        /// Height at which the lock expires.
        unlock_height: Height,
        /// Height of the rejected call.
        now: Height,
    },

    /// The vault has been destroyed; nothing further is accepted.
    #[error("vault has been destroyed")]
    VaultDestroyed,

    /// The pending-transfer ledger is full.
    #[error("ledger at capacity ({capacity} pending transfers)")]
    CapacityExceeded {
        /// Maximum number of pending transfers.
        capacity: usize,
    },

    /// The recipient is the vault itself or the null account.
    #[error("invalid recipient {0}")]
    InvalidRecipient(Address),

    /// Zero-value transfers and deposits are meaningless.
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// An addition (or a subtraction guarded by an invariant) would leave
    /// the fixed-width numeric domain.
    #[error("arithmetic overflow on operands {lhs} and {rhs}")]
    ArithmeticOverflow {
        /// Left operand.
        lhs: u64,
        /// Right operand.
        rhs: u64,
    },

    /// Not enough uncommitted balance to back the proposed transfer.
    #[error("insufficient uncommitted funds: requested {requested}, available {available}")]
    InsufficientUncommitted {
        /// Amount the caller tried to commit.
        requested: Amount,
        /// Balance not already committed to pending transfers.
        available: Amount,
    },

    /// No live transfer carries this id.
    #[error("unknown transfer {0}")]
    UnknownTransfer(TransferId),

    /// The transfer has not aged past the maturation delay yet.
    #[error("transfer {id} matures at height {matures_at} (now {now})")]
    NotMature {
        /// The transfer being withdrawn.
        id: TransferId,
        /// First height at which it may be withdrawn.
        matures_at: Height,
        /// Height of the rejected call.
        now: Height,
    },

    /// Only the proposer of a transfer may cancel it through `cancel_own`.
    #[error("{caller} did not initiate transfer {id}")]
    NotInitiator {
        /// The rejected caller.
        caller: Address,
        /// The transfer they tried to cancel.
        id: TransferId,
    },

    /// The account already holds the tier-one role.
    #[error("{0} is already tier-one")]
    AlreadyTierOne(Address),

    /// The account already holds the tier-two role.
    #[error("{0} is already tier-two")]
    AlreadyTierTwo(Address),

    /// The account does not hold the tier-two role.
    #[error("{0} is not tier-two")]
    NotTierTwo(Address),

    /// A lock may only keep or push back the unlock height.
    #[error("lock must not decrease: current {current}, requested {requested}")]
    LockMustNotDecrease {
        /// Unlock height in force.
        current: Height,
        /// Unlock height the call would have set.
        requested: Height,
    },

    /// Only an empty vault can be destroyed.
    #[error("vault still holds {balance}")]
    NotEmpty {
        /// Remaining balance.
        balance: Amount,
    },

    /// The outbound value transfer for a withdrawal failed.
    #[error("payout failed: {0}")]
    Payout(#[from] PayoutError),
}

/// Reasons a deserialized vault or ledger is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Creation bounds or the vault address do not hold.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("owner {0} is not tier-one")]
    OwnerNotTierOne(Address),

    #[error("{0} holds both tiers")]
    OverlappingTiers(Address),

    /// The embedded ledger was built for a different vault.
    #[error("ledger belongs to {ledger}, not {vault}")]
    LedgerMismatch { vault: Address, ledger: Address },

    #[error("entry keyed {key} carries id {id}")]
    KeyMismatch { key: TransferId, id: TransferId },

    /// Ids are positive and below the ledger's next id.
    #[error("transfer id {id} outside [1, {next_id})")]
    IdOutOfRange { id: TransferId, next_id: TransferId },

    /// Zero amount, or paid to the vault or the null account.
    #[error("transfer {0} could never have been proposed")]
    MalformedTransfer(TransferId),

    #[error("{pending} pending transfers exceed capacity {capacity}")]
    OverCapacity { pending: usize, capacity: usize },

    #[error("recorded total {recorded} does not match the pending entries")]
    TotalMismatch { recorded: Amount },

    #[error("committed {committed} exceeds balance {balance}")]
    OverCommitted { committed: Amount, balance: Amount },

    /// Demotion purges a member's transfers, so every initiator is tier-two.
    #[error("transfer {id} was proposed by {initiator}, who is not tier-two")]
    OrphanedTransfer { id: TransferId, initiator: Address },

    #[error("destroyed vault still holds {0}")]
    DestroyedWithBalance(Amount),
}

/// Fieldless discriminant of a [`VaultError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    VaultLocked,
    VaultDestroyed,
    CapacityExceeded,
    InvalidRecipient,
    ZeroAmount,
    ArithmeticOverflow,
    InsufficientUncommitted,
    UnknownTransfer,
    NotMature,
    NotInitiator,
    AlreadyTierOne,
    AlreadyTierTwo,
    NotTierTwo,
    LockMustNotDecrease,
    NotEmpty,
    PayoutFailed,
}

impl VaultError {
    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Unauthorized { .. } => ErrorKind::Unauthorized,
            VaultError::VaultLocked { .. } => ErrorKind::VaultLocked,
            VaultError::VaultDestroyed => ErrorKind::VaultDestroyed,
            VaultError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            VaultError::InvalidRecipient(_) => ErrorKind::InvalidRecipient,
            VaultError::ZeroAmount => ErrorKind::ZeroAmount,
            VaultError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
            VaultError::InsufficientUncommitted { .. } => ErrorKind::InsufficientUncommitted,
            VaultError::UnknownTransfer(_) => ErrorKind::UnknownTransfer,
            VaultError::NotMature { .. } => ErrorKind::NotMature,
            VaultError::NotInitiator { .. } => ErrorKind::NotInitiator,
            VaultError::AlreadyTierOne(_) => ErrorKind::AlreadyTierOne,
            VaultError::AlreadyTierTwo(_) => ErrorKind::AlreadyTierTwo,
            VaultError::NotTierTwo(_) => ErrorKind::NotTierTwo,
            VaultError::LockMustNotDecrease { .. } => ErrorKind::LockMustNotDecrease,
            VaultError::NotEmpty { .. } => ErrorKind::NotEmpty,
            VaultError::Payout(_) => ErrorKind::PayoutFailed,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
