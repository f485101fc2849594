// Ledger state - balances, the custodial pool, and the rules that move value

use crate::identity::AccountId;
use crate::ledger::journal::{EntryKind, Journal};
use crate::ledger::Amount;
use crate::transfer::ValueSink;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during ledger operations
///
/// Every variant is terminal for the invocation that raised it: the ledger
/// is left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Amount mismatch: declared {declared}, supplied {supplied}")]
    AmountMismatch { declared: Amount, supplied: Amount },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Aggregate figures about the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerStatistics {
    pub accounts: usize,
    pub pool: Amount,
    pub in_flight: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub journal_entries: usize,
}

/// Ledger state as it stood before a withdrawal, put back if the release fails
#[derive(Debug)]
struct Checkpoint {
    balances: HashMap<AccountId, Amount>,
    pool: Amount,
    in_flight: Amount,
    total_deposited: Amount,
    total_withdrawn: Amount,
    journal_len: usize,
}

/// The custodial ledger
///
/// Owns the balance of every account and the pool backing them. All
/// mutation goes through `&mut self`, so callers are serialized by the
/// borrow checker; the only re-entry point is the value sink handed to
/// [`Ledger::withdraw`].
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<AccountId, Amount>,
    /// Sum of all balances
    pool: Amount,
    /// Debited by a withdrawal whose release has not reported back yet
    in_flight: Amount,
    total_deposited: Amount,
    total_withdrawn: Amount,
    journal: Journal,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Current balance of an account; 0 if it never deposited
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Value held in custody for all accounts
    pub fn pool(&self) -> Amount {
        self.pool
    }

    pub fn in_flight(&self) -> Amount {
        self.in_flight
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    /// Number of accounts that have ever held a balance entry
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Known accounts, sorted by address
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<AccountId> = self.balances.keys().copied().collect();
        accounts.sort();
        accounts
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn statistics(&self) -> LedgerStatistics {
        LedgerStatistics {
            accounts: self.balances.len(),
            pool: self.pool,
            in_flight: self.in_flight,
            total_deposited: self.total_deposited,
            total_withdrawn: self.total_withdrawn,
            journal_entries: self.journal.len(),
        }
    }

    /// Check that the pool equals the sum of balances and that nothing was
    /// created or lost: deposited == withdrawn + pool + in flight.
    pub fn is_solvent(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b));

        let accounted = self
            .total_withdrawn
            .checked_add(self.pool)
            .and_then(|v| v.checked_add(self.in_flight));

        sum == Some(self.pool) && accounted == Some(self.total_deposited)
    }

    // ========================================================================
    // DEPOSIT
    // ========================================================================

    /// Credit `caller` with value attached to the call
    ///
    /// `declared` is what the caller says it is depositing and `supplied` is
    /// what the environment actually delivered; they must agree.
    pub fn deposit(
        &mut self,
        caller: &AccountId,
        declared: Amount,
        supplied: Amount,
    ) -> Result<(), LedgerError> {
        if declared != supplied {
            warn!(account = %caller, declared, supplied, "deposit rejected: amount mismatch");
            return Err(LedgerError::AmountMismatch { declared, supplied });
        }

        let balance = self.balance_of(caller).checked_add(declared);
        let pool = self
            .pool
            .checked_add(declared)
            .filter(|pool| pool.checked_add(self.in_flight).is_some());
        let total = self.total_deposited.checked_add(declared);

        let (Some(balance), Some(pool), Some(total)) = (balance, pool, total) else {
            warn!(account = %caller, amount = declared, "deposit rejected: overflow");
            return Err(LedgerError::Overflow);
        };

        self.balances.insert(*caller, balance);
        self.pool = pool;
        self.total_deposited = total;
        self.journal.append(*caller, EntryKind::Deposit, declared, balance);

        debug!(account = %caller, amount = declared, balance, "deposit committed");
        Ok(())
    }

    // ========================================================================
    // WITHDRAW
    // ========================================================================

    /// Debit `caller` and release the value to it through `sink`
    ///
    /// The debit is committed before `sink` runs, and `sink` gets the ledger
    /// back, so anything it calls re-entrantly sees the reduced balance. If
    /// the release fails the whole invocation is undone, including whatever
    /// the sink did to the ledger in between.
    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        amount: Amount,
        sink: &mut dyn ValueSink,
    ) -> Result<(), LedgerError> {
        let account = *caller;
        let available = self.balance_of(&account);
        if amount > available {
            warn!(account = %account, amount, available, "withdrawal rejected: insufficient balance");
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let checkpoint = self.checkpoint();

        // Commit the debit. pool + in_flight is unchanged, so neither add overflows.
        self.balances.insert(account, available - amount);
        self.pool -= amount;
        self.in_flight += amount;

        match sink.release(self, &account, amount) {
            Ok(()) => {
                self.in_flight -= amount;
                // withdrawn + pool + in_flight == deposited, so this stays in range
                self.total_withdrawn += amount;
                let balance = self.balance_of(&account);
                self.journal.append(account, EntryKind::Withdrawal, amount, balance);

                debug!(account = %account, amount, balance, "withdrawal committed");
                Ok(())
            }
            Err(reason) => {
                let undone = self.journal.len() - checkpoint.journal_len;
                self.restore(checkpoint);

                warn!(account = %account, amount, %reason, undone, "withdrawal rolled back: transfer failed");
                Err(LedgerError::TransferFailed(reason))
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            balances: self.balances.clone(),
            pool: self.pool,
            in_flight: self.in_flight,
            total_deposited: self.total_deposited,
            total_withdrawn: self.total_withdrawn,
            journal_len: self.journal.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.balances = checkpoint.balances;
        self.pool = checkpoint.pool;
        self.in_flight = checkpoint.in_flight;
        self.total_deposited = checkpoint.total_deposited;
        self.total_withdrawn = checkpoint.total_withdrawn;
        self.journal.truncate(checkpoint.journal_len);
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Rebuild a ledger by replaying a journal
    ///
    /// The chain must verify and every entry must be applicable in order.
    pub fn from_journal(journal: Journal) -> Result<Self, LedgerError> {
        journal
            .verify()
            .map_err(|fault| LedgerError::CorruptSnapshot(fault.to_string()))?;

        let mut ledger = Ledger::new();
        for entry in journal.iter() {
            let account = *entry.account();
            let balance = ledger.balance_of(&account);
            let corrupt = || {
                LedgerError::CorruptSnapshot(format!(
                    "entry {} cannot be applied to {}",
                    entry.sequence(),
                    account
                ))
            };

            match entry.kind() {
                EntryKind::Deposit => {
                    let balance = balance.checked_add(entry.amount()).ok_or_else(corrupt)?;
                    ledger.pool = ledger.pool.checked_add(entry.amount()).ok_or_else(corrupt)?;
                    ledger.total_deposited = ledger
                        .total_deposited
                        .checked_add(entry.amount())
                        .ok_or_else(corrupt)?;
                    ledger.balances.insert(account, balance);
                }
                EntryKind::Withdrawal => {
                    let balance = balance.checked_sub(entry.amount()).ok_or_else(corrupt)?;
                    ledger.pool -= entry.amount();
                    ledger.total_withdrawn += entry.amount();
                    ledger.balances.insert(account, balance);
                }
            }
        }

        ledger.journal = journal;
        Ok(ledger)
    }

    /// Serialize the ledger's journal
    ///
    /// A snapshot taken while a withdrawal is in flight omits that withdrawal.
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(&self.journal).unwrap_or_default()
    }

    /// Restore a ledger from [`Ledger::to_bytes`] output
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let journal: Journal = postcard::from_bytes(bytes)
            .map_err(|e| LedgerError::CorruptSnapshot(e.to_string()))?;
        Self::from_journal(journal)
    }
}
