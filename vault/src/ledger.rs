//! # Commitment Ledger
//!
//! Bounded bookkeeping for proposed-but-unpaid transfers. The ledger knows
//! nothing about roles or locks; the [`Vault`](crate::vault::Vault) decides
//! who may call what, and the ledger only guarantees that:
//!
//! - at most `capacity` transfers are pending at once,
//! - `total_committed` always equals the sum of the pending amounts and can
//!   never wrap,
//! - transfer ids strictly increase over the ledger's lifetime and are never
//!   handed out twice, no matter how entries leave.
//!
//! Ids and storage are decoupled: `next_id` is a plain counter and entries
//! live in a `BTreeMap` keyed by id, so iteration order is proposal order.
//!
//! A deserialized ledger is re-checked against these guarantees before it is
//! handed out; see [`SnapshotError`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::{self, FIRST_TRANSFER_ID};
use crate::error::{SnapshotError, VaultError};
use crate::math;
use crate::{Amount, Height};

/// Identifier of a pending transfer. Positive and never reused.
pub type TransferId = u64;

/// A proposed outgoing payment waiting to mature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Ledger-assigned identifier.
    pub id: TransferId,
    /// Tier-two member that proposed the transfer.
    pub initiator: Address,
    /// Account that receives the funds on withdrawal.
    pub recipient: Address,
    /// Committed value. Paid in full or not at all.
    pub amount: Amount,
    /// Height at which the transfer was proposed.
    pub created_at: Height,
}

impl PendingTransfer {
    /// First height at which the transfer can be withdrawn.
    pub fn matures_at(&self, delay: u64) -> Height {
        math::matures_at(self.created_at, delay)
    }

    /// Whether the transfer has aged `delay` blocks by `now`.
    pub fn is_mature(&self, delay: u64, now: Height) -> bool {
        now >= self.matures_at(delay)
    }
}

/// The bounded set of pending transfers and their aggregate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LedgerSnapshot")]
pub struct CommitmentLedger {
    /// The owning vault's own address; never a valid recipient.
    vault: Address,
    capacity: usize,
    maturation_delay: u64,
    next_id: TransferId,
    total_committed: Amount,
    entries: BTreeMap<TransferId, PendingTransfer>,
}

/// Serialized form of a [`CommitmentLedger`], untrusted until converted.
#[derive(Deserialize)]
struct LedgerSnapshot {
    vault: Address,
    capacity: usize,
    maturation_delay: u64,
    next_id: TransferId,
    total_committed: Amount,
    entries: BTreeMap<TransferId, PendingTransfer>,
}

impl TryFrom<LedgerSnapshot> for CommitmentLedger {
    type Error = SnapshotError;

    fn try_from(raw: LedgerSnapshot) -> Result<Self, SnapshotError> {
        config::check_bounds(raw.maturation_delay, raw.capacity)?;
        if raw.entries.len() > raw.capacity {
            return Err(SnapshotError::OverCapacity {
                pending: raw.entries.len(),
                capacity: raw.capacity,
            });
        }

        let mismatch = SnapshotError::TotalMismatch {
            recorded: raw.total_committed,
        };
        let mut sum: Amount = 0;
        for (&key, transfer) in &raw.entries {
            let id = transfer.id;
            if key != id {
                return Err(SnapshotError::KeyMismatch { key, id });
            }
            if id < FIRST_TRANSFER_ID || id >= raw.next_id {
                return Err(SnapshotError::IdOutOfRange {
                    id,
                    next_id: raw.next_id,
                });
            }
            if transfer.amount == 0
                || transfer.recipient == raw.vault
                || transfer.recipient.is_null()
            {
                return Err(SnapshotError::MalformedTransfer(id));
            }
            sum = sum
                .checked_add(transfer.amount)
                .ok_or_else(|| mismatch.clone())?;
        }
        if sum != raw.total_committed {
            return Err(mismatch);
        }

        Ok(Self {
            vault: raw.vault,
            capacity: raw.capacity,
            maturation_delay: raw.maturation_delay,
            next_id: raw.next_id,
            total_committed: raw.total_committed,
            entries: raw.entries,
        })
    }
}

impl CommitmentLedger {
    /// Creates an empty ledger for the vault at `vault`.
    pub fn new(vault: Address, capacity: usize, maturation_delay: u64) -> Self {
        Self {
            vault,
            capacity,
            maturation_delay,
            next_id: FIRST_TRANSFER_ID,
            total_committed: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Records a new pending transfer and returns its id.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - [`VaultError::CapacityExceeded`] if the ledger is full.
    /// - [`VaultError::InvalidRecipient`] if `recipient` is the vault or the
    ///   null account.
    /// - [`VaultError::ZeroAmount`] if `amount` is zero.
    /// - [`VaultError::ArithmeticOverflow`] if the new total would not fit.
    pub fn propose(
        &mut self,
        initiator: Address,
        recipient: Address,
        amount: Amount,
        now: Height,
    ) -> Result<TransferId, VaultError> {
        if self.is_full() {
            return Err(VaultError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if recipient == self.vault || recipient.is_null() {
            return Err(VaultError::InvalidRecipient(recipient));
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let total = math::add(self.total_committed, amount)?;
        let id = self.next_id;
        let next_id = math::add(id, 1)?;

        self.entries.insert(
            id,
            PendingTransfer {
                id,
                initiator,
                recipient,
                amount,
                created_at: now,
            },
        );
        self.total_committed = total;
        self.next_id = next_id;
        Ok(id)
    }

    /// Removes a pending transfer and returns the amount it had committed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnknownTransfer`] if no live entry has `id`.
    pub fn cancel(&mut self, id: TransferId) -> Result<Amount, VaultError> {
        self.take(id).map(|transfer| transfer.amount)
    }

    /// Removes every transfer proposed by `initiator`, in proposal order.
    pub fn cancel_all_by_initiator(
        &mut self,
        initiator: &Address,
    ) -> Result<Vec<(TransferId, Amount)>, VaultError> {
        let removed: Vec<(TransferId, Amount)> = self
            .entries
            .values()
            .filter(|t| t.initiator == *initiator)
            .map(|t| (t.id, t.amount))
            .collect();

        let released = removed
            .iter()
            .try_fold(0, |acc, (_, amount)| math::add(acc, *amount))?;
        self.total_committed = math::sub(self.total_committed, released)?;

        for (id, _) in &removed {
            self.entries.remove(id);
        }
        Ok(removed)
    }

    /// Removes every pending transfer. Clearing an empty ledger is a no-op.
    pub fn clear_all(&mut self) -> Vec<(TransferId, Amount)> {
        self.total_committed = 0;
        std::mem::take(&mut self.entries)
            .into_values()
            .map(|t| (t.id, t.amount))
            .collect()
    }

    /// Removes a matured transfer so the caller can pay it out.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnknownTransfer`] if no live entry has `id`, and
    /// [`VaultError::NotMature`] if it has not aged the maturation delay by
    /// `now`. The entry is left untouched on error.
    pub fn settle(&mut self, id: TransferId, now: Height) -> Result<PendingTransfer, VaultError> {
        let transfer = self.get(id).ok_or(VaultError::UnknownTransfer(id))?;
        if !transfer.is_mature(self.maturation_delay, now) {
            return Err(VaultError::NotMature {
                id,
                matures_at: transfer.matures_at(self.maturation_delay),
                now,
            });
        }
        self.take(id)
    }

    /// Puts back a transfer taken by [`settle`](Self::settle) whose payout
    /// failed. The id keeps its original value.
    pub(crate) fn restore(&mut self, transfer: PendingTransfer) {
        // The amount was part of the total a moment ago, so it fits again.
        self.total_committed = self.total_committed.saturating_add(transfer.amount);
        self.entries.insert(transfer.id, transfer);
    }

    /// Portion of `balance` not already committed, floored at zero.
    pub fn available_to_commit(&self, balance: Amount) -> Amount {
        math::uncommitted(balance, self.total_committed)
    }

    /// Looks up a live transfer.
    pub fn get(&self, id: TransferId) -> Option<&PendingTransfer> {
        self.entries.get(&id)
    }

    /// Live transfers in proposal order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingTransfer> {
        self.entries.values()
    }

    /// Address of the vault this ledger belongs to.
    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Sum of all pending amounts.
    pub fn total_committed(&self) -> Amount {
        self.total_committed
    }

    /// Id the next successful proposal will receive.
    pub fn next_id(&self) -> TransferId {
        self.next_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn maturation_delay(&self) -> u64 {
        self.maturation_delay
    }

    fn take(&mut self, id: TransferId) -> Result<PendingTransfer, VaultError> {
        let amount = self
            .get(id)
            .map(|t| t.amount)
            .ok_or(VaultError::UnknownTransfer(id))?;
        let total = math::sub(self.total_committed, amount)?;
        let transfer = self
            .entries
            .remove(&id)
            .ok_or(VaultError::UnknownTransfer(id))?;
        self.total_committed = total;
        Ok(transfer)
    }
}
