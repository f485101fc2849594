// Transfer module - the value-release channel
// How withdrawn value leaves the ledger and reaches its owner

mod sink;

pub use sink::*;
