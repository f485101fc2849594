//! Custodial value ledger.
//!
//! Accounts deposit value into a shared pool and withdraw it again; no
//! account can ever observe or extract more than it has put in. The
//! [`ledger`] module is the core; everything else is the environment
//! around it (identity, value release, unit conversion, scripted runs).

pub mod config;
pub mod harness;
pub mod identity;
pub mod ledger;
pub mod telemetry;
pub mod transfer;
pub mod units;

pub use config::BankConfig;
pub use identity::AccountId;
pub use ledger::{Amount, Ledger, LedgerError};
pub use transfer::ValueSink;
