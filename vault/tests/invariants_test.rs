//! Randomized invariant checks.
//!
//! Drives vaults through long, seeded sequences of arbitrary operations from
//! arbitrary callers and checks, after every single step, that:
//!
//! - committed value never exceeds the balance,
//! - the ledger never holds more than `capacity` transfers,
//! - tier-one and tier-two stay disjoint and the owner stays tier-one,
//! - transfer ids only ever grow,
//! - a rejected operation changes nothing,
//! - every reachable state survives a snapshot round trip.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use phoenix_vault::{AccountBook, Address, Call, Vault, VaultConfig, VaultError};

const OWNER: u64 = 1;
const VAULT: u64 = 0xF0;
const ACCOUNTS: u64 = 8;

fn addr(n: u64) -> Address {
    Address::from_index(n)
}

fn new_vault(delay: u64, capacity: usize) -> Vault {
    Vault::create(
        &addr(ACCOUNTS + 1),
        addr(VAULT),
        VaultConfig {
            owner: addr(OWNER),
            initial_tier_two: addr(2),
            maturation_delay: delay,
            capacity,
        },
    )
    .unwrap()
}

fn assert_invariants(v: &Vault) {
    assert!(v.total_committed() <= v.balance());
    assert!(v.pending_count() <= v.capacity());
    assert!(v.is_tier_one(&v.owner()));
    assert!(v.tier_one().all(|a| !v.is_tier_two(a)));
    assert!(v.tier_two().all(|a| !v.is_tier_one(a)));
    assert_eq!(v.uncommitted(), v.balance() - v.total_committed());
    assert!(v.pending_transfers().all(|t| v.is_tier_two(&t.initiator)));

    let sum: u64 = v.pending_transfers().map(|t| t.amount).sum();
    assert_eq!(sum, v.total_committed());

    let ids: Vec<_> = v.pending_transfers().map(|t| t.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(ids.iter().all(|id| *id < v.next_transfer_id()));
}

/// Observable state used to check that failures leave no trace.
fn fingerprint(v: &Vault) -> String {
    serde_json::to_string(v).unwrap()
}

fn step(
    v: &mut Vault,
    book: &mut AccountBook,
    rng: &mut StdRng,
    height: u64,
) -> Result<(), VaultError> {
    let call = Call::new(addr(rng.gen_range(1..=ACCOUNTS)), height);
    let target = addr(rng.gen_range(0..=ACCOUNTS));
    let id = rng.gen_range(0..v.next_transfer_id() + 2);

    match rng.gen_range(0..11) {
        0 => v.deposit(&call, rng.gen_range(0..50)).map(drop),
        1 => v.lock(&call, rng.gen_range(0..6)).map(drop),
        2 => v.add_tier_one(&call, target),
        3 => v.add_tier_two(&call, target),
        4 => v.remove_tier_two(&call, target).map(drop),
        5 | 6 => v
            .propose_transfer(&call, target, rng.gen_range(0..40))
            .map(drop),
        7 => v.cancel_by_admin(&call, id).map(drop),
        8 => v.cancel_own(&call, id).map(drop),
        9 => {
            if rng.gen_bool(0.1) {
                v.clear_all_payments(&call).map(drop)
            } else {
                v.withdraw(&call, id, book).map(drop)
            }
        }
        _ => {
            if rng.gen_bool(0.02) {
                v.destroy(&call)
            } else {
                v.withdraw(&call, id, book).map(drop)
            }
        }
    }
}

#[test]
fn invariants_hold_across_random_sequences() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let capacity = rng.gen_range(1..6);
        let mut v = new_vault(4, capacity);
        let mut book = AccountBook::new();
        let mut height = 0;
        let mut last_next_id = v.next_transfer_id();

        for _ in 0..500 {
            height += rng.gen_range(0..3);
            let before = fingerprint(&v);
            let events_before = v.events().len();

            let outcome = step(&mut v, &mut book, &mut rng, height);
            if outcome.is_err() {
                assert_eq!(fingerprint(&v), before, "seed {seed}: failure mutated state");
                assert_eq!(v.events().len(), events_before);
            }

            assert_invariants(&v);
            let restored: Vault = serde_json::from_str(&fingerprint(&v))
                .unwrap_or_else(|e| panic!("seed {seed}: live state refused on restore: {e}"));
            assert_eq!(fingerprint(&restored), fingerprint(&v));
            assert!(v.next_transfer_id() >= last_next_id);
            last_next_id = v.next_transfer_id();

            if v.is_destroyed() {
                break;
            }
        }
    }
}

#[test]
fn value_is_conserved() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut v = new_vault(4, 4);
    let mut book = AccountBook::new();
    let mut deposited = 0u64;

    for height in 0..2_000u64 {
        let call = Call::new(addr(rng.gen_range(1..=ACCOUNTS)), height);
        match rng.gen_range(0..3) {
            0 => {
                let amount = rng.gen_range(1..20);
                v.deposit(&call, amount).unwrap();
                deposited += amount;
            }
            1 => {
                let spender = Call::new(addr(2), height);
                let recipient = addr(rng.gen_range(3..=ACCOUNTS));
                let _ = v.propose_transfer(&spender, recipient, rng.gen_range(1..30));
            }
            _ => {
                let id = rng.gen_range(1..v.next_transfer_id() + 1);
                let _ = v.withdraw(&call, id, &mut book);
            }
        }
        let paid: u64 = book.iter().map(|(_, amount)| *amount).sum();
        assert_eq!(paid + v.balance(), deposited);
    }
}

#[test]
fn demotion_releases_exactly_the_members_commitments() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..50 {
        let mut v = new_vault(4, 16);
        let admin = Call::new(addr(OWNER), 0);
        v.add_tier_two(&admin, addr(3)).unwrap();
        v.deposit(&admin, 1_000).unwrap();

        for _ in 0..rng.gen_range(1..16) {
            let proposer = Call::new(addr(rng.gen_range(2..=3)), 0);
            v.propose_transfer(&proposer, addr(7), rng.gen_range(1..50))
                .unwrap();
        }

        let theirs: Vec<_> = v
            .pending_transfers()
            .filter(|t| t.initiator == addr(2))
            .map(|t| (t.id, t.amount))
            .collect();
        let survivors: Vec<_> = v
            .pending_transfers()
            .filter(|t| t.initiator != addr(2))
            .map(|t| t.id)
            .collect();
        let before = v.total_committed();

        let cancelled = v.remove_tier_two(&admin, addr(2)).unwrap();
        assert_eq!(cancelled, theirs);
        let released: u64 = theirs.iter().map(|(_, a)| a).sum();
        assert_eq!(v.total_committed(), before - released);
        assert_eq!(v.pending_transfers().map(|t| t.id).collect::<Vec<_>>(), survivors);
    }
}
