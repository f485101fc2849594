// Deposit tests

use crate::common::{new_account, ONE};
use custody::ledger::{Amount, EntryKind, Ledger, LedgerError};

// ============================================================================
// SUCCESSFUL DEPOSITS
// ============================================================================

#[test]
fn test_deposit_increases_balance_and_pool() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    ledger.deposit(&alice, ONE, ONE).unwrap();

    assert_eq!(ledger.balance_of(&alice), ONE);
    assert_eq!(ledger.pool(), ONE);
    assert_eq!(ledger.total_deposited(), ONE);
    assert!(ledger.is_solvent());
}

#[test]
fn test_first_deposit_creates_account_entry() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    assert_eq!(ledger.account_count(), 0);
    ledger.deposit(&alice, 5, 5).unwrap();

    assert_eq!(ledger.account_count(), 1);
    assert_eq!(ledger.accounts(), vec![alice]);
}

#[test]
fn test_zero_deposit_is_accepted_and_journaled() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    ledger.deposit(&alice, 0, 0).unwrap();

    assert_eq!(ledger.balance_of(&alice), 0);
    assert_eq!(ledger.journal().len(), 1);
}

#[test]
fn test_deposit_is_journaled_with_resulting_balance() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    ledger.deposit(&alice, 30, 30).unwrap();
    ledger.deposit(&alice, 12, 12).unwrap();

    let entry = &ledger.journal().entries()[1];
    assert_eq!(entry.account(), &alice);
    assert_eq!(entry.kind(), EntryKind::Deposit);
    assert_eq!(entry.amount(), 12);
    assert_eq!(entry.balance_after(), 42);
    assert!(ledger.journal().verify().is_ok());
}

// ============================================================================
// REJECTED DEPOSITS
// ============================================================================

#[test]
fn test_declared_more_than_supplied_fails() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    let result = ledger.deposit(&alice, 2 * ONE, ONE);

    assert_eq!(
        result,
        Err(LedgerError::AmountMismatch {
            declared: 2 * ONE,
            supplied: ONE
        })
    );
    assert_eq!(ledger.balance_of(&alice), 0);
    assert_eq!(ledger.pool(), 0);
    assert!(ledger.journal().is_empty());
}

#[test]
fn test_declared_less_than_supplied_fails() {
    let mut ledger = Ledger::new();
    let alice = new_account();

    let result = ledger.deposit(&alice, 1, 2);

    assert!(matches!(result, Err(LedgerError::AmountMismatch { .. })));
    assert_eq!(ledger.account_count(), 0);
}

#[test]
fn test_overflowing_deposit_leaves_state_unchanged() {
    let mut ledger = Ledger::new();
    let alice = new_account();
    ledger.deposit(&alice, Amount::MAX - 1, Amount::MAX - 1).unwrap();
    let before = ledger.statistics();

    let result = ledger.deposit(&alice, 2, 2);

    assert_eq!(result, Err(LedgerError::Overflow));
    assert_eq!(ledger.statistics(), before);
    assert_eq!(ledger.balance_of(&alice), Amount::MAX - 1);
}
