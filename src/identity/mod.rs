// Identity module - who is calling the ledger
// Keypairs, account addresses, and signed invocations that authenticate a caller

mod account;
mod invocation;
mod keypair;
mod signer;

pub use account::*;
pub use invocation::*;
pub use keypair::*;
pub use signer::*;
