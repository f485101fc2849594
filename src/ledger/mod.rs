// Ledger module - THE CORE
// Per-account balances over a shared custodial pool, plus the append-only journal

mod journal;
mod state;

pub use journal::{EntryKind, Journal, JournalEntry, JournalFault, GENESIS_DIGEST};
pub use state::{Ledger, LedgerError, LedgerStatistics};

/// Quantity of value in the smallest indivisible unit
pub type Amount = u128;
