//! # Vault State Machine
//!
//! A [`Vault`] holds native currency for its owner and only lets it leave
//! through the [`CommitmentLedger`]: a tier-two member proposes a transfer,
//! the transfer ages for `maturation_delay` blocks, and then anyone may
//! withdraw it to its recipient. Tier-one members can cancel transfers,
//! purge the whole ledger, manage membership and time-lock the vault.
//!
//! Every operation runs through the same gate before touching state:
//!
//! 1. a destroyed vault rejects everything with `VaultDestroyed`,
//! 2. the caller must hold the operation's role (`Unauthorized`),
//! 3. unless the operation is allowed while locked, `now < lock_height`
//!    rejects it with `VaultLocked`.
//!
//! Operations are all-or-nothing. On success they append their outcomes to
//! the event journal; on failure nothing changes and nothing is recorded.
//!
//! ## Invariants
//!
//! - `tier_one` and `tier_two` are disjoint; the owner is always tier-one.
//! - `total_committed <= balance`.
//! - at most `capacity` transfers are pending.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::{Call, Operation, Role};
use crate::address::Address;
use crate::config::{self, ConfigError, VaultConfig};
use crate::error::{SnapshotError, VaultError};
use crate::event::VaultEvent;
use crate::ledger::{CommitmentLedger, PendingTransfer, TransferId};
use crate::math;
use crate::transfer::ValueTransfer;
use crate::{Amount, Height};

/// Lifecycle of a vault. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    Active,
    Destroyed,
}

/// A time-locked custodial vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VaultSnapshot")]
pub struct Vault {
    /// The vault's own account identifier.
    address: Address,
    owner: Address,
    tier_one: BTreeSet<Address>,
    tier_two: BTreeSet<Address>,
    /// Administrative operations and withdrawals are refused below this height.
    lock_height: Height,
    balance: Amount,
    status: VaultStatus,
    ledger: CommitmentLedger,
    #[serde(skip)]
    events: Vec<VaultEvent>,
}

/// Serialized form of a [`Vault`]. Restoring it re-checks the invariants
/// the operations maintain.
#[derive(Deserialize)]
struct VaultSnapshot {
    address: Address,
    owner: Address,
    tier_one: BTreeSet<Address>,
    tier_two: BTreeSet<Address>,
    lock_height: Height,
    balance: Amount,
    status: VaultStatus,
    ledger: CommitmentLedger,
}

impl TryFrom<VaultSnapshot> for Vault {
    type Error = SnapshotError;

    fn try_from(raw: VaultSnapshot) -> Result<Self, SnapshotError> {
        if raw.ledger.vault() != raw.address {
            return Err(SnapshotError::LedgerMismatch {
                vault: raw.address,
                ledger: raw.ledger.vault(),
            });
        }
        config::check_vault_address(&raw.address, [&raw.owner])?;
        if !raw.tier_one.contains(&raw.owner) {
            return Err(SnapshotError::OwnerNotTierOne(raw.owner));
        }
        if let Some(both) = raw.tier_one.intersection(&raw.tier_two).next() {
            return Err(SnapshotError::OverlappingTiers(*both));
        }
        if raw.ledger.total_committed() > raw.balance {
            return Err(SnapshotError::OverCommitted {
                committed: raw.ledger.total_committed(),
                balance: raw.balance,
            });
        }
        if let Some(t) = raw
            .ledger
            .iter()
            .find(|t| !raw.tier_two.contains(&t.initiator))
        {
            return Err(SnapshotError::OrphanedTransfer {
                id: t.id,
                initiator: t.initiator,
            });
        }
        if raw.status == VaultStatus::Destroyed && raw.balance != 0 {
            return Err(SnapshotError::DestroyedWithBalance(raw.balance));
        }

        Ok(Self {
            address: raw.address,
            owner: raw.owner,
            tier_one: raw.tier_one,
            tier_two: raw.tier_two,
            lock_height: raw.lock_height,
            balance: raw.balance,
            status: raw.status,
            ledger: raw.ledger,
            events: Vec::new(),
        })
    }
}

impl Vault {
    /// Creates a vault at `address` on behalf of `creator`.
    ///
    /// The vault starts unlocked, empty, with `{owner}` as tier-one and
    /// `{initial_tier_two}` as tier-two.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the creator is the owner, the owner is
    /// also the initial tier-two member, `address` is null or taken by one of
    /// them, or the delay or capacity are out of range.
    pub fn create(
        creator: &Address,
        address: Address,
        config: VaultConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(creator, &address)?;

        info!(
            vault = %address,
            owner = %config.owner,
            tier_two = %config.initial_tier_two,
            maturation_delay = config.maturation_delay,
            capacity = config.capacity,
            "vault created"
        );

        Ok(Self {
            address,
            owner: config.owner,
            tier_one: BTreeSet::from([config.owner]),
            tier_two: BTreeSet::from([config.initial_tier_two]),
            lock_height: 0,
            balance: 0,
            status: VaultStatus::Active,
            ledger: CommitmentLedger::new(address, config.capacity, config.maturation_delay),
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Credits an inbound payment. Open to anyone, even while locked.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`] for an empty deposit and
    /// [`VaultError::ArithmeticOverflow`] if the balance would not fit.
    pub fn deposit(&mut self, call: &Call, amount: Amount) -> Result<Amount, VaultError> {
        self.execute(call, Operation::Deposit, |vault| {
            if amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            vault.balance = math::add(vault.balance, amount)?;
            info!(from = %call.caller, amount, balance = vault.balance, "deposit received");
            vault.events.push(VaultEvent::Deposited {
                from: call.caller,
                amount,
            });
            Ok(vault.balance)
        })
    }

    /// Locks the vault until `now + extend_by`.
    ///
    /// `lock(0)` confirms an expired lock at the current height. The unlock
    /// height can only stay put or move forward.
    ///
    /// # Errors
    ///
    /// [`VaultError::LockMustNotDecrease`] if `now + extend_by` is below the
    /// current unlock height.
    pub fn lock(&mut self, call: &Call, extend_by: u64) -> Result<Height, VaultError> {
        self.execute(call, Operation::Lock, |vault| {
            let requested = math::add(call.height, extend_by)?;
            if requested < vault.lock_height {
                return Err(VaultError::LockMustNotDecrease {
                    current: vault.lock_height,
                    requested,
                });
            }
            vault.lock_height = requested;
            info!(caller = %call.caller, unlock_height = requested, "vault locked");
            vault.events.push(VaultEvent::Locked {
                unlock_height: requested,
            });
            Ok(requested)
        })
    }

    /// Grants tier-one membership.
    ///
    /// A current tier-two member is not promoted implicitly: they must be
    /// removed from tier-two first, which also purges their transfers.
    ///
    /// # Errors
    ///
    /// [`VaultError::AlreadyTierOne`] or [`VaultError::AlreadyTierTwo`].
    pub fn add_tier_one(&mut self, call: &Call, addr: Address) -> Result<(), VaultError> {
        self.execute(call, Operation::AddTierOne, |vault| {
            if vault.tier_one.contains(&addr) {
                return Err(VaultError::AlreadyTierOne(addr));
            }
            if vault.tier_two.contains(&addr) {
                return Err(VaultError::AlreadyTierTwo(addr));
            }
            vault.tier_one.insert(addr);
            info!(addr = %addr, by = %call.caller, "tier-one member added");
            vault.events.push(VaultEvent::TierOneAdded { addr });
            Ok(())
        })
    }

    /// Grants tier-two membership.
    ///
    /// # Errors
    ///
    /// [`VaultError::AlreadyTierOne`] if `addr` is an administrator,
    /// [`VaultError::AlreadyTierTwo`] if it is already a member.
    pub fn add_tier_two(&mut self, call: &Call, addr: Address) -> Result<(), VaultError> {
        self.execute(call, Operation::AddTierTwo, |vault| {
            if vault.tier_one.contains(&addr) {
                return Err(VaultError::AlreadyTierOne(addr));
            }
            if vault.tier_two.contains(&addr) {
                return Err(VaultError::AlreadyTierTwo(addr));
            }
            vault.tier_two.insert(addr);
            info!(addr = %addr, by = %call.caller, "tier-two member added");
            vault.events.push(VaultEvent::TierTwoAdded { addr });
            Ok(())
        })
    }

    /// Revokes tier-two membership and cancels every transfer `addr`
    /// proposed. Returns the cancelled `(id, amount)` pairs.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotTierTwo`] if `addr` is not a member.
    pub fn remove_tier_two(
        &mut self,
        call: &Call,
        addr: Address,
    ) -> Result<Vec<(TransferId, Amount)>, VaultError> {
        self.execute(call, Operation::RemoveTierTwo, |vault| {
            if !vault.tier_two.contains(&addr) {
                return Err(VaultError::NotTierTwo(addr));
            }
            let cancelled = vault.ledger.cancel_all_by_initiator(&addr)?;
            vault.tier_two.remove(&addr);

            info!(
                addr = %addr,
                by = %call.caller,
                cancelled = cancelled.len(),
                "tier-two member removed"
            );
            vault.events.extend(
                cancelled
                    .iter()
                    .map(|&(id, amount)| VaultEvent::TransferCancelled { id, amount }),
            );
            vault.events.push(VaultEvent::TierTwoRemoved { addr });
            Ok(cancelled)
        })
    }

    /// Proposes a transfer of `amount` to `recipient` and returns its id.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientUncommitted`] if the balance not already
    /// committed cannot back `amount`; otherwise any ledger rejection
    /// (`CapacityExceeded`, `InvalidRecipient`, `ZeroAmount`,
    /// `ArithmeticOverflow`).
    pub fn propose_transfer(
        &mut self,
        call: &Call,
        recipient: Address,
        amount: Amount,
    ) -> Result<TransferId, VaultError> {
        self.execute(call, Operation::ProposeTransfer, |vault| {
            let available = vault.uncommitted();
            if amount > available {
                return Err(VaultError::InsufficientUncommitted {
                    requested: amount,
                    available,
                });
            }
            let id = vault
                .ledger
                .propose(call.caller, recipient, amount, call.height)?;

            info!(
                id,
                initiator = %call.caller,
                recipient = %recipient,
                amount,
                matures_at = math::matures_at(call.height, vault.ledger.maturation_delay()),
                "transfer proposed"
            );
            vault.events.push(VaultEvent::TransferProposed {
                id,
                initiator: call.caller,
                recipient,
                amount,
            });
            Ok(id)
        })
    }

    /// Cancels any pending transfer. Allowed while locked.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownTransfer`] if `id` is not pending.
    pub fn cancel_by_admin(&mut self, call: &Call, id: TransferId) -> Result<Amount, VaultError> {
        self.execute(call, Operation::CancelByAdmin, |vault| {
            let amount = vault.ledger.cancel(id)?;
            info!(id, amount, by = %call.caller, "transfer cancelled by admin");
            vault.events.push(VaultEvent::TransferCancelled { id, amount });
            Ok(amount)
        })
    }

    /// Cancels a pending transfer the caller proposed.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownTransfer`] if `id` is not pending,
    /// [`VaultError::NotInitiator`] if someone else proposed it.
    pub fn cancel_own(&mut self, call: &Call, id: TransferId) -> Result<Amount, VaultError> {
        self.execute(call, Operation::CancelOwn, |vault| {
            let initiator = vault
                .ledger
                .get(id)
                .map(|t| t.initiator)
                .ok_or(VaultError::UnknownTransfer(id))?;
            if initiator != call.caller {
                return Err(VaultError::NotInitiator {
                    caller: call.caller,
                    id,
                });
            }
            let amount = vault.ledger.cancel(id)?;
            info!(id, amount, by = %call.caller, "transfer cancelled by initiator");
            vault.events.push(VaultEvent::TransferCancelled { id, amount });
            Ok(amount)
        })
    }

    /// Drops every pending transfer. Allowed while locked; clearing an empty
    /// ledger succeeds.
    pub fn clear_all_payments(
        &mut self,
        call: &Call,
    ) -> Result<Vec<(TransferId, Amount)>, VaultError> {
        self.execute(call, Operation::ClearAllPayments, |vault| {
            let cleared = vault.ledger.clear_all();
            info!(cleared = cleared.len(), by = %call.caller, "all payments cleared");
            vault.events.push(VaultEvent::AllPaymentsCleared);
            Ok(cleared)
        })
    }

    /// Pays out a matured transfer through `payout`. Open to anyone.
    ///
    /// If the payout fails the transfer stays pending and the balance is
    /// untouched.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownTransfer`], [`VaultError::NotMature`], or
    /// [`VaultError::Payout`].
    pub fn withdraw(
        &mut self,
        call: &Call,
        id: TransferId,
        payout: &mut dyn ValueTransfer,
    ) -> Result<PendingTransfer, VaultError> {
        self.execute(call, Operation::Withdraw, |vault| {
            let transfer = vault.ledger.settle(id, call.height)?;

            let paid = math::sub(vault.balance, transfer.amount).and_then(|remaining| {
                payout.pay(&transfer.recipient, transfer.amount)?;
                Ok(remaining)
            });
            let remaining = match paid {
                Ok(remaining) => remaining,
                Err(err) => {
                    vault.ledger.restore(transfer);
                    return Err(err);
                }
            };
            vault.balance = remaining;

            info!(
                id,
                recipient = %transfer.recipient,
                amount = transfer.amount,
                balance = vault.balance,
                "transfer settled"
            );
            vault.events.push(VaultEvent::TransferSettled {
                recipient: transfer.recipient,
                id,
                amount: transfer.amount,
            });
            Ok(transfer)
        })
    }

    /// Permanently retires an empty vault.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotEmpty`] while any balance remains.
    pub fn destroy(&mut self, call: &Call) -> Result<(), VaultError> {
        self.execute(call, Operation::Destroy, |vault| {
            if vault.balance != 0 {
                return Err(VaultError::NotEmpty {
                    balance: vault.balance,
                });
            }
            vault.status = VaultStatus::Destroyed;
            info!(vault = %vault.address, by = %call.caller, "vault destroyed");
            vault.events.push(VaultEvent::VaultDestroyed);
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn status(&self) -> VaultStatus {
        self.status
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == VaultStatus::Destroyed
    }

    pub fn is_tier_one(&self, addr: &Address) -> bool {
        self.tier_one.contains(addr)
    }

    pub fn is_tier_two(&self, addr: &Address) -> bool {
        self.tier_two.contains(addr)
    }

    /// Tier-one members in address order.
    pub fn tier_one(&self) -> impl Iterator<Item = &Address> {
        self.tier_one.iter()
    }

    /// Tier-two members in address order.
    pub fn tier_two(&self) -> impl Iterator<Item = &Address> {
        self.tier_two.iter()
    }

    pub fn lock_height(&self) -> Height {
        self.lock_height
    }

    /// Whether the time lock is in force at `now`.
    pub fn is_locked(&self, now: Height) -> bool {
        now < self.lock_height
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_committed(&self) -> Amount {
        self.ledger.total_committed()
    }

    /// Balance still free to back new proposals.
    pub fn uncommitted(&self) -> Amount {
        self.ledger.available_to_commit(self.balance)
    }

    pub fn pending(&self, id: TransferId) -> Option<&PendingTransfer> {
        self.ledger.get(id)
    }

    /// Pending transfers in proposal order.
    pub fn pending_transfers(&self) -> impl Iterator<Item = &PendingTransfer> {
        self.ledger.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn capacity(&self) -> usize {
        self.ledger.capacity()
    }

    pub fn maturation_delay(&self) -> u64 {
        self.ledger.maturation_delay()
    }

    pub fn next_transfer_id(&self) -> TransferId {
        self.ledger.next_id()
    }

    /// Outcomes recorded since creation or the last [`drain_events`](Self::drain_events).
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Hands the recorded outcomes to the caller and clears the journal.
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Gate
    // -----------------------------------------------------------------------

    fn execute<T>(
        &mut self,
        call: &Call,
        operation: Operation,
        body: impl FnOnce(&mut Self) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let result = self.admit(call, operation).and_then(|()| body(self));
        if let Err(err) = &result {
            debug!(
                %operation,
                caller = %call.caller,
                height = call.height,
                error = %err,
                "operation rejected"
            );
        }
        result
    }

    fn admit(&self, call: &Call, operation: Operation) -> Result<(), VaultError> {
        if self.is_destroyed() {
            return Err(VaultError::VaultDestroyed);
        }

        let authorized = match operation.required_role() {
            Role::Anyone => true,
            Role::TierOne => self.is_tier_one(&call.caller),
            Role::TierTwo => self.is_tier_two(&call.caller),
        };
        if !authorized {
            return Err(VaultError::Unauthorized {
                caller: call.caller,
                operation,
            });
        }

        if !operation.allowed_while_locked() && self.is_locked(call.height) {
            return Err(VaultError::VaultLocked {
                unlock_height: self.lock_height,
                now: call.height,
            });
        }
        Ok(())
    }
}
