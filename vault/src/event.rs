//! Observable outcomes of successful vault operations.
//!
//! The vault appends one or more [`VaultEvent`]s to its journal for every
//! operation that succeeds, in the order the effects happened. Failed
//! operations record nothing.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::ledger::TransferId;
use crate::{Amount, Height};

/// An outcome consumed by external monitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Value arrived in the vault.
    Deposited { from: Address, amount: Amount },
    /// The unlock height was set (or confirmed).
    Locked { unlock_height: Height },
    TierOneAdded { addr: Address },
    TierTwoAdded { addr: Address },
    /// A tier-two member was demoted. Preceded by one
    /// [`TransferCancelled`](Self::TransferCancelled) per purged transfer.
    TierTwoRemoved { addr: Address },
    TransferProposed {
        id: TransferId,
        initiator: Address,
        recipient: Address,
        amount: Amount,
    },
    TransferCancelled { id: TransferId, amount: Amount },
    /// Every pending transfer was dropped.
    AllPaymentsCleared,
    /// A matured transfer was paid out.
    TransferSettled {
        recipient: Address,
        id: TransferId,
        amount: Amount,
    },
    /// Terminal: the vault accepts nothing further.
    VaultDestroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let ev = VaultEvent::TransferCancelled { id: 2, amount: 5 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "transfer_cancelled");
        assert_eq!(json["id"], 2);
        assert_eq!(json["amount"], 5);

        let json = serde_json::to_value(VaultEvent::AllPaymentsCleared).unwrap();
        assert_eq!(json["event"], "all_payments_cleared");
    }
}
