use crate::identity::PublicKey;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ADDRESS_PREFIX: &str = "0x";

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// Opaque account identity: a 20-byte address written as `0x` + 40 hex digits
///
/// The ledger only compares and hashes these. Addresses are derived from a
/// public key by taking the last 20 bytes of its Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; ADDRESS_LEN]);

impl AccountId {
    /// Derive the account address owned by a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Keccak256::digest(public_key.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Self(bytes)
    }

    /// Wrap raw address bytes supplied by the environment
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an address from its `0x`-prefixed hex form
    pub fn parse(s: &str) -> Result<Self, AccountIdError> {
        let digits = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| AccountIdError::InvalidFormat(format!("missing '0x' prefix in '{}'", s)))?;

        let decoded = hex::decode(digits).map_err(|e| AccountIdError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| AccountIdError::InvalidLength(decoded.len()))?;

        Ok(Self(bytes))
    }

    /// Get the raw address bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
