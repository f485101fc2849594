// Journal - append-only record of every successful balance mutation
//
// Entries are hash-chained: each digest covers the previous digest and the
// entry's own fields, so a truncated or edited journal fails verification.

use crate::identity::AccountId;
use crate::ledger::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Digest of the (empty) journal before the first entry
pub const GENESIS_DIGEST: [u8; 32] = [0u8; 32];

/// What a journal entry did to its account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Deposit,
    Withdrawal,
}

impl EntryKind {
    fn tag(self) -> u8 {
        match self {
            EntryKind::Deposit => 0x01,
            EntryKind::Withdrawal => 0x02,
        }
    }
}

/// One committed mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    sequence: u64,
    account: AccountId,
    kind: EntryKind,
    amount: Amount,
    balance_after: Amount,
    timestamp: DateTime<Utc>,
    digest: [u8; 32],
}

impl JournalEntry {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Account balance at the moment this entry was committed
    pub fn balance_after(&self) -> Amount {
        self.balance_after
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    fn compute_digest(&self, previous: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(previous);
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.account.as_bytes());
        hasher.update([self.kind.tag()]);
        hasher.update(self.amount.to_be_bytes());
        hasher.update(self.balance_after.to_be_bytes());
        hasher.update(self.timestamp.timestamp_micros().to_be_bytes());
        hasher.finalize().into()
    }
}

/// Why a journal failed verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalFault {
    /// Entry at this position carries the wrong sequence number
    SequenceGap { position: usize, found: u64 },
    /// Entry at this position does not chain from its predecessor
    BrokenChain { position: usize },
}

impl std::fmt::Display for JournalFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalFault::SequenceGap { position, found } => {
                write!(f, "entry {} has sequence {}", position, found)
            }
            JournalFault::BrokenChain { position } => {
                write!(f, "entry {} does not chain from its predecessor", position)
            }
        }
    }
}

/// Append-only, hash-chained list of journal entries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest of the latest entry, or the genesis digest when empty
    pub fn head(&self) -> [u8; 32] {
        self.entries.last().map(|e| e.digest).unwrap_or(GENESIS_DIGEST)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Entries touching one account, oldest first
    pub fn entries_for<'a>(&'a self, account: &'a AccountId) -> impl Iterator<Item = &'a JournalEntry> {
        self.entries.iter().filter(move |e| &e.account == account)
    }

    /// Append a committed mutation
    pub(crate) fn append(&mut self, account: AccountId, kind: EntryKind, amount: Amount, balance_after: Amount) {
        let previous = self.head();
        let mut entry = JournalEntry {
            sequence: self.entries.len() as u64,
            account,
            kind,
            amount,
            balance_after,
            timestamp: Utc::now(),
            digest: GENESIS_DIGEST,
        };
        entry.digest = entry.compute_digest(&previous);
        self.entries.push(entry);
    }

    /// Drop entries past `len`; only used to undo a rolled-back invocation
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Recompute the hash chain from genesis
    pub fn verify(&self) -> Result<(), JournalFault> {
        let mut previous = GENESIS_DIGEST;
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.sequence != position as u64 {
                return Err(JournalFault::SequenceGap {
                    position,
                    found: entry.sequence,
                });
            }
            if entry.compute_digest(&previous) != entry.digest {
                return Err(JournalFault::BrokenChain { position });
            }
            previous = entry.digest;
        }
        Ok(())
    }
}
