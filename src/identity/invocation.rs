// Signed invocations - the authentication layer in front of the ledger
//
// The ledger trusts whatever AccountId it is handed. This module is how the
// tooling earns that trust: every mutating call is signed by the account's
// keypair and checked here before it is dispatched.

use crate::identity::{AccountId, Keypair, PublicKey, Signature, Signer};
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const SIGNING_DOMAIN: &[u8] = b"custody:invocation:v1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvocationError {
    #[error("Signature does not match the invocation")]
    InvalidSignature,

    #[error("Public key does not own account {0}")]
    AccountMismatch(AccountId),

    #[error("Replayed nonce {nonce} for {account} (last accepted {last})")]
    ReplayedNonce {
        account: AccountId,
        nonce: u64,
        last: u64,
    },

    #[error("Failed to encode invocation: {0}")]
    Encoding(String),
}

/// A ledger operation requested by a caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// Deposit `amount`, with `attached` value actually delivered alongside
    Deposit { amount: Amount, attached: Amount },
    /// Withdraw `amount` back to the caller
    Withdraw { amount: Amount },
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    domain: &'a [u8],
    account: &'a AccountId,
    nonce: u64,
    call: &'a Call,
}

/// A call signed by the account that makes it
#[derive(Clone, Debug)]
pub struct Invocation {
    public_key: PublicKey,
    account: AccountId,
    nonce: u64,
    call: Call,
    signature: Signature,
}

impl Invocation {
    /// Sign `call` on behalf of the account owned by `keypair`
    pub fn sign(keypair: &Keypair, nonce: u64, call: Call) -> Result<Self, InvocationError> {
        let public_key = keypair.public_key();
        let account = AccountId::from_public_key(&public_key);
        let message = signing_bytes(&account, nonce, &call)?;
        let signature = Signer::sign(keypair, &message);

        Ok(Self {
            public_key,
            account,
            nonce,
            call,
            signature,
        })
    }

    /// The account this invocation claims to act for
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    /// Check the signature and that the signing key owns the claimed account
    pub fn verify(&self) -> Result<(), InvocationError> {
        if AccountId::from_public_key(&self.public_key) != self.account {
            return Err(InvocationError::AccountMismatch(self.account));
        }

        let message = signing_bytes(&self.account, self.nonce, &self.call)?;
        if !Signer::verify(&self.public_key, &message, &self.signature) {
            return Err(InvocationError::InvalidSignature);
        }

        Ok(())
    }

    /// Replace the call while keeping the original signature (tampering, for tests)
    #[cfg(test)]
    pub(crate) fn with_call(mut self, call: Call) -> Self {
        self.call = call;
        self
    }
}

fn signing_bytes(account: &AccountId, nonce: u64, call: &Call) -> Result<Vec<u8>, InvocationError> {
    let payload = SigningPayload {
        domain: SIGNING_DOMAIN,
        account,
        nonce,
        call,
    };
    postcard::to_allocvec(&payload).map_err(|e| InvocationError::Encoding(e.to_string()))
}

/// Proof that an invocation was verified; the only way to obtain a trusted caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    account: AccountId,
    call: Call,
}

impl AuthenticatedCaller {
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn call(&self) -> &Call {
        &self.call
    }
}

/// Verifies invocations and rejects nonce replays, per account
#[derive(Debug, Default)]
pub struct Gatekeeper {
    last_nonce: HashMap<AccountId, u64>,
}

impl Gatekeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify an invocation and consume its nonce
    ///
    /// Nonces must strictly increase per account. A rejected invocation does
    /// not consume its nonce.
    pub fn admit(&mut self, invocation: &Invocation) -> Result<AuthenticatedCaller, InvocationError> {
        invocation.verify()?;

        let account = *invocation.account();
        if let Some(&last) = self.last_nonce.get(&account) {
            if invocation.nonce() <= last {
                return Err(InvocationError::ReplayedNonce {
                    account,
                    nonce: invocation.nonce(),
                    last,
                });
            }
        }
        self.last_nonce.insert(account, invocation.nonce());

        Ok(AuthenticatedCaller {
            account,
            call: *invocation.call(),
        })
    }

    /// Highest nonce accepted so far for an account
    pub fn last_nonce(&self, account: &AccountId) -> Option<u64> {
        self.last_nonce.get(account).copied()
    }
}
