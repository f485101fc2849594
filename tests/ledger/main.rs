// Ledger integration tests

mod common;
mod deposit_test;
mod snapshot_test;
mod withdraw_test;
