// Snapshot tests - the journal is the ledger's only persisted form

use crate::common::new_account;
use custody::identity::AccountId;
use custody::ledger::{Amount, Journal, Ledger, LedgerError};
use custody::transfer::{DirectSink, ValueSink};

#[test]
fn test_empty_ledger_snapshot() {
    let ledger = Ledger::new();
    let restored = Ledger::from_bytes(&ledger.to_bytes()).unwrap();

    assert_eq!(restored.account_count(), 0);
    assert!(restored.is_solvent());
}

#[test]
fn test_from_journal_replays_balances() {
    let mut ledger = Ledger::new();
    let mut sink = DirectSink::new();
    let alice = new_account();
    let bob = new_account();

    ledger.deposit(&alice, 9, 9).unwrap();
    ledger.deposit(&bob, 4, 4).unwrap();
    ledger.withdraw(&alice, 2, &mut sink).unwrap();

    let replayed = Ledger::from_journal(ledger.journal().clone()).unwrap();

    assert_eq!(replayed.balance_of(&alice), 7);
    assert_eq!(replayed.balance_of(&bob), 4);
    assert_eq!(replayed.pool(), 11);
    assert!(replayed.is_solvent());
}

#[test]
fn test_truncated_snapshot_is_rejected() {
    let mut ledger = Ledger::new();
    ledger.deposit(&new_account(), 9, 9).unwrap();

    let bytes = ledger.to_bytes();
    let result = Ledger::from_bytes(&bytes[..bytes.len() / 2]);

    assert!(matches!(result, Err(LedgerError::CorruptSnapshot(_))));
}

/// Release that snapshots the ledger mid-withdrawal
struct SnapshottingSink {
    snapshot: Vec<u8>,
}

impl ValueSink for SnapshottingSink {
    fn release(&mut self, ledger: &mut Ledger, _to: &AccountId, _amount: Amount) -> Result<(), String> {
        self.snapshot = ledger.to_bytes();
        Ok(())
    }
}

#[test]
fn test_snapshot_during_release_omits_in_flight_withdrawal() {
    let mut ledger = Ledger::new();
    let alice = new_account();
    ledger.deposit(&alice, 10, 10).unwrap();

    let mut sink = SnapshottingSink { snapshot: Vec::new() };
    ledger.withdraw(&alice, 6, &mut sink).unwrap();

    let restored = Ledger::from_bytes(&sink.snapshot).unwrap();
    assert_eq!(restored.balance_of(&alice), 10);
    assert!(restored.is_solvent());
}

#[test]
fn test_default_journal_is_empty() {
    assert!(Journal::default().is_empty());
}
