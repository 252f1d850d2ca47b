// Copyright (c) 2026 Phoenix Vault Contributors. MIT License.
// See LICENSE for details.

//! # Phoenix Vault
//!
//! A custodial value vault that releases funds only through a time-delayed,
//! capacity-bounded ledger of pending transfers. No single caller can move
//! funds instantly:
//!
//! - **Tier-two** members propose transfers; each must age
//!   `maturation_delay` blocks before anyone may withdraw it.
//! - **Tier-one** members (always including the owner) manage membership,
//!   cancel or purge pending transfers, and time-lock the vault against
//!   administrative changes and withdrawals.
//!
//! The surrounding ledger supplies the logical clock and caller identity for
//! every call (see [`Call`]) and moves value out on withdrawal (see
//! [`ValueTransfer`]).
//!
//! ## Modules
//!
//! - **ledger**: pending transfers and their committed total.
//! - **vault**: the state machine enforcing roles, locks and lifecycle.
//! - **access**: the per-operation role and lock policy.
//! - **config**: creation parameters and protocol bounds.
//! - **math**: checked arithmetic over the `u64` domain.
//! - **transfer**: outbound payouts on withdrawal.
//! - **event**: the journal of successful operations.
//!
//! ## Design Principles
//!
//! 1. Money never wraps: every addition is checked, every failure is typed.
//! 2. Operations are all-or-nothing; a rejected call changes nothing.
//! 3. State transitions are explicit: enum variants, not boolean flags.
//! 4. State, events and error kinds are serializable (serde) for snapshots
//!    and monitors.

pub mod access;
pub mod address;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod math;
pub mod transfer;
pub mod vault;

/// Native-currency units.
pub type Amount = u64;

/// Logical-clock height supplied by the surrounding ledger.
pub type Height = u64;

pub use access::{Call, Operation, Role};
pub use address::{Address, AddressError};
pub use config::{ConfigError, VaultConfig};
pub use error::{ErrorKind, SnapshotError, VaultError};
pub use event::VaultEvent;
pub use ledger::{CommitmentLedger, PendingTransfer, TransferId};
pub use transfer::{AccountBook, PayoutError, ValueTransfer};
pub use vault::{Vault, VaultStatus};
