// Withdrawal tests

use crate::common::{new_account, ONE};
use custody::ledger::{EntryKind, Ledger, LedgerError};
use custody::transfer::{DirectSink, MockSink};

// ============================================================================
// SUCCESSFUL WITHDRAWALS
// ============================================================================

#[test]
fn test_withdraw_reduces_balance_and_pool() {
    let mut ledger = Ledger::new();
    let mut sink = DirectSink::new();
    let alice = new_account();

    ledger.deposit(&alice, 2 * ONE, 2 * ONE).unwrap();
    ledger.withdraw(&alice, ONE / 2, &mut sink).unwrap();

    assert_eq!(ledger.balance_of(&alice), 3 * ONE / 2);
    assert_eq!(ledger.pool(), 3 * ONE / 2);
    assert_eq!(ledger.total_withdrawn(), ONE / 2);
    assert_eq!(sink.released_to(&alice), ONE / 2);
    assert!(ledger.is_solvent());
}

#[test]
fn test_withdraw_entire_balance() {
    let mut ledger = Ledger::new();
    let mut sink = DirectSink::new();
    let alice = new_account();

    ledger.deposit(&alice, 100, 100).unwrap();
    ledger.withdraw(&alice, 100, &mut sink).unwrap();

    assert_eq!(ledger.balance_of(&alice), 0);
    assert_eq!(ledger.pool(), 0);
    // entry persists at zero
    assert_eq!(ledger.account_count(), 1);
}

#[test]
fn test_withdraw_pays_the_caller() {
    let mut ledger = Ledger::new();
    let mut sink = MockSink::new();
    let alice = new_account();

    ledger.deposit(&alice, 10, 10).unwrap();
    ledger.withdraw(&alice, 4, &mut sink).unwrap();

    assert_eq!(sink.delivered(), &[(alice, 4)]);
}

#[test]
fn test_withdraw_is_journaled_after_release() {
    let mut ledger = Ledger::new();
    let mut sink = DirectSink::new();
    let alice = new_account();

    ledger.deposit(&alice, 10, 10).unwrap();
    ledger.withdraw(&alice, 3, &mut sink).unwrap();

    let last = ledger.journal().entries().last().unwrap();
    assert_eq!(last.kind(), EntryKind::Withdrawal);
    assert_eq!(last.amount(), 3);
    assert_eq!(last.balance_after(), 7);
}

// ============================================================================
// INSUFFICIENT BALANCE
// ============================================================================

#[test]
fn test_overdraft_fails_with_insufficient_balance() {
    let mut ledger = Ledger::new();
    let mut sink = MockSink::new();
    let alice = new_account();

    ledger.deposit(&alice, ONE, ONE).unwrap();
    let result = ledger.withdraw(&alice, 2 * ONE, &mut sink);

    assert_eq!(
        result,
        Err(LedgerError::InsufficientBalance {
            available: ONE,
            required: 2 * ONE
        })
    );
    assert_eq!(ledger.balance_of(&alice), ONE);
    assert_eq!(sink.call_count(), 0, "no value may leave on a rejected withdrawal");
}

#[test]
fn test_never_deposited_account_cannot_withdraw() {
    let mut ledger = Ledger::new();
    let mut sink = DirectSink::new();
    let stranger = new_account();

    let result = ledger.withdraw(&stranger, 1, &mut sink);

    assert!(matches!(result, Err(LedgerError::InsufficientBalance { available: 0, required: 1 })));
    assert_eq!(ledger.account_count(), 0);
    assert!(ledger.journal().is_empty());
}

// ============================================================================
// FAILED RELEASE
// ============================================================================

#[test]
fn test_failed_release_rolls_back_debit() {
    let mut ledger = Ledger::new();
    let mut sink = MockSink::new().with_failure("recipient cannot receive");
    let alice = new_account();

    ledger.deposit(&alice, 50, 50).unwrap();
    let before = ledger.statistics();
    let head = ledger.journal().head();

    let result = ledger.withdraw(&alice, 20, &mut sink);

    assert_eq!(
        result,
        Err(LedgerError::TransferFailed("recipient cannot receive".to_string()))
    );
    assert_eq!(ledger.balance_of(&alice), 50);
    assert_eq!(ledger.statistics(), before);
    assert_eq!(ledger.journal().head(), head);
    assert!(ledger.is_solvent());
}

#[test]
fn test_debit_is_visible_during_release() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut ledger = Ledger::new();
    let alice = new_account();
    ledger.deposit(&alice, 50, 50).unwrap();

    let seen = Rc::new(Cell::new(None));
    let seen_in_hook = Rc::clone(&seen);
    let mut sink = MockSink::new().with_hook(move |ledger, to, _| {
        seen_in_hook.set(Some((ledger.balance_of(to), ledger.pool(), ledger.in_flight())));
    });

    ledger.withdraw(&alice, 20, &mut sink).unwrap();

    assert_eq!(seen.get(), Some((30, 30, 20)));
    assert_eq!(ledger.in_flight(), 0);
}

#[test]
fn test_retry_after_failed_release_is_independent() {
    let mut ledger = Ledger::new();
    let mut sink = MockSink::new().with_failures_then_success(1);
    let alice = new_account();
    ledger.deposit(&alice, 50, 50).unwrap();

    assert!(ledger.withdraw(&alice, 20, &mut sink).is_err());
    ledger.withdraw(&alice, 20, &mut sink).unwrap();

    assert_eq!(ledger.balance_of(&alice), 30);
    assert_eq!(ledger.total_withdrawn(), 20);
    assert_eq!(sink.delivered().len(), 1);
}
