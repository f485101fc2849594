// Shared helpers for ledger tests

use custody::identity::{AccountId, Keypair};
use custody::ledger::Amount;

/// One major unit with 18 decimals
pub const ONE: Amount = 1_000_000_000_000_000_000;

/// A fresh address owned by a newly generated keypair
pub fn new_account() -> AccountId {
    AccountId::from_public_key(&Keypair::generate().public_key())
}
