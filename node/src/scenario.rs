//! # Scenario Replay
//!
//! A scenario is a JSON document describing a vault's creation parameters
//! and an ordered list of calls:
//!
//! ```json
//! {
//!   "creator": "0x00000000000000000000000000000000000000aa",
//!   "address": "0x00000000000000000000000000000000000000f0",
//!   "config": {
//!     "owner": "0x0000000000000000000000000000000000000001",
//!     "initial_tier_two": "0x0000000000000000000000000000000000000002",
//!     "maturation_delay": 4,
//!     "capacity": 8
//!   },
//!   "steps": [
//!     { "height": 1, "caller": "0x...01", "op": "deposit", "amount": 100 }
//!   ]
//! }
//! ```
//!
//! Heights must never decrease from one step to the next. Each step yields
//! one [`Outcome`]: the events it produced, or the kind of error that
//! rejected it.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use phoenix_vault::{
    AccountBook, Address, Amount, Call, ErrorKind, Height, Operation, TransferId, Vault,
    VaultConfig, VaultError, VaultEvent,
};

/// A scripted run against a single vault.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Account that creates the vault. Must differ from the owner.
    pub creator: Address,
    /// Address the vault lives at.
    pub address: Address,
    pub config: VaultConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One call in a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub height: Height,
    pub caller: Address,
    #[serde(flatten)]
    pub op: Op,
}

/// The operation a step invokes, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Deposit { amount: Amount },
    Lock { extend_by: u64 },
    AddTierOne { addr: Address },
    AddTierTwo { addr: Address },
    RemoveTierTwo { addr: Address },
    ProposeTransfer { recipient: Address, amount: Amount },
    CancelByAdmin { id: TransferId },
    CancelOwn { id: TransferId },
    ClearAllPayments,
    Withdraw { id: TransferId },
    Destroy,
}

impl Op {
    pub fn operation(&self) -> Operation {
        match self {
            Op::Deposit { .. } => Operation::Deposit,
            Op::Lock { .. } => Operation::Lock,
            Op::AddTierOne { .. } => Operation::AddTierOne,
            Op::AddTierTwo { .. } => Operation::AddTierTwo,
            Op::RemoveTierTwo { .. } => Operation::RemoveTierTwo,
            Op::ProposeTransfer { .. } => Operation::ProposeTransfer,
            Op::CancelByAdmin { .. } => Operation::CancelByAdmin,
            Op::CancelOwn { .. } => Operation::CancelOwn,
            Op::ClearAllPayments => Operation::ClearAllPayments,
            Op::Withdraw { .. } => Operation::Withdraw,
            Op::Destroy => Operation::Destroy,
        }
    }
}

/// Result of one replayed step, printed as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Zero-based position in the scenario.
    pub step: usize,
    pub height: Height,
    pub caller: Address,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<VaultEvent>,
}

/// Final state of a replay.
#[derive(Debug)]
pub struct Replay {
    pub outcomes: Vec<Outcome>,
    pub vault: Vault,
    /// Payments made by withdrawals.
    pub book: AccountBook,
}

/// Reads and parses a scenario file.
pub fn load(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

/// Checks that heights never go backwards.
fn check_heights(steps: &[Step]) -> Result<()> {
    for (index, pair) in steps.windows(2).enumerate() {
        if pair[1].height < pair[0].height {
            bail!(
                "step {} height {} is below step {} height {}",
                index + 1,
                pair[1].height,
                index,
                pair[0].height
            );
        }
    }
    Ok(())
}

/// Creates the vault and runs every step in order.
///
/// A rejected step is recorded and the run continues. Only an invalid
/// scenario (bad config or decreasing heights) aborts the replay.
pub fn replay(scenario: &Scenario) -> Result<Replay> {
    check_heights(&scenario.steps)?;

    let mut vault = Vault::create(&scenario.creator, scenario.address, scenario.config.clone())
        .context("vault creation rejected")?;
    let mut book = AccountBook::new();
    let mut outcomes = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let call = Call::new(step.caller, step.height);
        let result = apply(&mut vault, &mut book, &call, &step.op);
        let events = vault.drain_events();

        let outcome = match result {
            Ok(()) => Outcome {
                step: index,
                height: step.height,
                caller: step.caller,
                op: step.op.operation().name(),
                ok: true,
                error: None,
                message: None,
                events,
            },
            Err(err) => {
                tracing::debug!(step = index, error = %err, "step rejected");
                Outcome {
                    step: index,
                    height: step.height,
                    caller: step.caller,
                    op: step.op.operation().name(),
                    ok: false,
                    error: Some(err.kind()),
                    message: Some(err.to_string()),
                    events,
                }
            }
        };
        outcomes.push(outcome);
    }

    let rejected = outcomes.iter().filter(|o| !o.ok).count();
    tracing::info!(
        steps = outcomes.len(),
        rejected,
        balance = vault.balance(),
        pending = vault.pending_count(),
        "replay finished"
    );

    Ok(Replay {
        outcomes,
        vault,
        book,
    })
}

fn apply(vault: &mut Vault, book: &mut AccountBook, call: &Call, op: &Op) -> Result<(), VaultError> {
    match *op {
        Op::Deposit { amount } => vault.deposit(call, amount).map(drop),
        Op::Lock { extend_by } => vault.lock(call, extend_by).map(drop),
        Op::AddTierOne { addr } => vault.add_tier_one(call, addr),
        Op::AddTierTwo { addr } => vault.add_tier_two(call, addr),
        Op::RemoveTierTwo { addr } => vault.remove_tier_two(call, addr).map(drop),
        Op::ProposeTransfer { recipient, amount } => {
            vault.propose_transfer(call, recipient, amount).map(drop)
        }
        Op::CancelByAdmin { id } => vault.cancel_by_admin(call, id).map(drop),
        Op::CancelOwn { id } => vault.cancel_own(call, id).map(drop),
        Op::ClearAllPayments => vault.clear_all_payments(call).map(drop),
        Op::Withdraw { id } => vault.withdraw(call, id, book).map(drop),
        Op::Destroy => vault.destroy(call),
    }
}

/// Writes one JSON line per outcome, then the vault state if requested.
pub fn write_report<W: Write>(out: &mut W, replay: &Replay, snapshot: bool) -> Result<()> {
    for outcome in &replay.outcomes {
        serde_json::to_writer(&mut *out, outcome)?;
        writeln!(out)?;
    }
    if snapshot {
        serde_json::to_writer(&mut *out, &replay.vault)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn addr(n: u64) -> Address {
        Address::from_index(n)
    }

    fn scenario(steps: Value) -> Scenario {
        serde_json::from_value(json!({
            "creator": addr(0xAA),
            "address": addr(0xF0),
            "config": {
                "owner": addr(1),
                "initial_tier_two": addr(2),
                "maturation_delay": 4,
                "capacity": 2
            },
            "steps": steps
        }))
        .unwrap()
    }

    #[test]
    fn parses_tagged_steps() {
        let s = scenario(json!([
            { "height": 0, "caller": addr(1), "op": "deposit", "amount": 10 },
            { "height": 0, "caller": addr(2), "op": "propose_transfer",
              "recipient": addr(5), "amount": 3 },
            { "height": 1, "caller": addr(1), "op": "clear_all_payments" }
        ]));
        assert_eq!(s.steps.len(), 3);
        assert_eq!(
            s.steps[1].op,
            Op::ProposeTransfer {
                recipient: addr(5),
                amount: 3
            }
        );
        assert_eq!(s.steps[2].op, Op::ClearAllPayments);
    }

    #[test]
    fn full_cycle_pays_the_recipient() {
        let s = scenario(json!([
            { "height": 0, "caller": addr(9), "op": "deposit", "amount": 100 },
            { "height": 1, "caller": addr(2), "op": "propose_transfer",
              "recipient": addr(5), "amount": 40 },
            { "height": 3, "caller": addr(9), "op": "withdraw", "id": 1 },
            { "height": 5, "caller": addr(9), "op": "withdraw", "id": 1 }
        ]));
        let run = replay(&s).unwrap();

        let kinds: Vec<_> = run.outcomes.iter().map(|o| o.error).collect();
        assert_eq!(kinds, vec![None, None, Some(ErrorKind::NotMature), None]);
        assert_eq!(run.book.balance_of(&addr(5)), 40);
        assert_eq!(run.vault.balance(), 60);
        assert_eq!(
            run.outcomes[3].events,
            vec![VaultEvent::TransferSettled {
                recipient: addr(5),
                id: 1,
                amount: 40
            }]
        );
    }

    #[test]
    fn rejected_steps_do_not_stop_the_run() {
        let s = scenario(json!([
            { "height": 0, "caller": addr(7), "op": "lock", "extend_by": 10 },
            { "height": 0, "caller": addr(1), "op": "lock", "extend_by": 10 },
            { "height": 2, "caller": addr(1), "op": "add_tier_two", "addr": addr(3) },
            { "height": 10, "caller": addr(1), "op": "add_tier_two", "addr": addr(3) }
        ]));
        let run = replay(&s).unwrap();

        assert_eq!(run.outcomes[0].error, Some(ErrorKind::Unauthorized));
        assert!(run.outcomes[1].ok);
        assert_eq!(run.outcomes[2].error, Some(ErrorKind::VaultLocked));
        assert!(run.outcomes[3].ok);
        assert!(run.vault.is_tier_two(&addr(3)));
    }

    #[test]
    fn decreasing_heights_abort_before_any_step() {
        let s = scenario(json!([
            { "height": 5, "caller": addr(1), "op": "deposit", "amount": 1 },
            { "height": 4, "caller": addr(1), "op": "deposit", "amount": 1 }
        ]));
        let err = replay(&s).unwrap_err();
        assert!(err.to_string().contains("step 1 height 4"));
    }

    #[test]
    fn invalid_config_aborts() {
        let mut s = scenario(json!([]));
        s.config.capacity = 0;
        assert!(replay(&s).is_err());
    }

    #[test]
    fn report_is_one_line_per_step_plus_snapshot() {
        let s = scenario(json!([
            { "height": 0, "caller": addr(1), "op": "deposit", "amount": 0 },
            { "height": 0, "caller": addr(1), "op": "deposit", "amount": 8 }
        ]));
        let run = replay(&s).unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &run, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["ok"], json!(false));
        assert_eq!(lines[0]["error"], json!("ZeroAmount"));
        assert_eq!(lines[1]["op"], json!("deposit"));
        assert_eq!(lines[1]["events"][0]["event"], json!("deposited"));
        assert_eq!(lines[2]["balance"], json!(8));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let body = json!({
            "creator": addr(0xAA),
            "address": addr(0xF0),
            "config": {
                "owner": addr(1),
                "initial_tier_two": addr(2),
                "maturation_delay": 4,
                "capacity": 2
            },
            "steps": [{ "height": 0, "caller": addr(1), "op": "destroy" }]
        });
        fs::write(&path, body.to_string()).unwrap();

        let s = load(&path).unwrap();
        assert_eq!(s.steps[0].op, Op::Destroy);
        assert!(load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn bundled_demo_replays() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/basic.json");
        let run = replay(&load(&path).unwrap()).unwrap();

        let kinds: Vec<_> = run.outcomes.iter().map(|o| o.error).collect();
        assert_eq!(
            kinds,
            vec![
                None,
                None,
                Some(ErrorKind::InsufficientUncommitted),
                None,
                None,
                Some(ErrorKind::NotMature),
                None,
                None,
                Some(ErrorKind::VaultLocked),
                None,
                None,
            ]
        );
        assert_eq!(run.book.balance_of(&addr(5)), 300);
        assert_eq!(run.vault.balance(), 700);
        assert_eq!(run.vault.pending_count(), 0);
        assert!(!run.vault.is_tier_two(&addr(2)));
    }
}
