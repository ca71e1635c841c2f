//! Plasma data model: positions, inputs, outputs, deposits, transactions and blocks.
//!
//! These are pure value types. Their canonical byte encodings feed both the store keyspace
//! and the hashes that owners sign, so they must never change shape silently.

use std::{fmt, str::FromStr};

use anyhow::{bail, Context};
use derive_more::Display;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, Bytes};

pub mod codec;

mod block;
mod deposit;
mod input;
mod output;
mod position;
mod transaction;

pub use block::Block;
pub use deposit::Deposit;
pub use input::Input;
pub use output::Output;
pub use position::{Position, MAX_TX_INDEX};
pub use transaction::Transaction;

/// Token amounts, unbounded to match rootchain values.
pub type Amount = BigUint;

pub const ADDRESS_LENGTH: usize = 20;
pub const SIGNATURE_LENGTH: usize = 65;

/// Plasma block height, counted independently from the host runtime height.
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub fn next(self) -> BlockHeight {
        BlockHeight(self.0 + 1)
    }
}

/// 20-byte rootchain (Ethereum) account address.
#[serde_as]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(#[serde_as(as = "Hex")] pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub const ZERO: Address = Address([0; ADDRESS_LENGTH]);

    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let inner: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .with_context(|| format!("address must be {ADDRESS_LENGTH} bytes, got {}", bytes.len()))?;
        Ok(Address(inner))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).context("address is not valid hex")?;
        Address::from_slice(&bytes)
    }
}

/// Hash identifying a transaction in the ledger (its inclusion hash).
#[serde_as]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxHash(#[serde_as(as = "Hex")] pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for TxHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).context("transaction hash is not valid hex")?;
        let Ok(inner) = <[u8; 32]>::try_from(bytes.as_slice()) else {
            bail!("transaction hash must be 32 bytes, got {}", bytes.len());
        };
        Ok(TxHash(inner))
    }
}

/// 65-byte `r || s || v` recoverable ECDSA signature.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] pub [u8; SIGNATURE_LENGTH]);

impl Signature {
    pub const EMPTY: Signature = Signature([0; SIGNATURE_LENGTH]);

    pub fn is_empty(&self) -> bool {
        self == &Self::EMPTY
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parsing() {
        let addr: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr.0[19], 0xff);
        assert_eq!(addr.to_string(), "0x00000000000000000000000000000000000000ff");

        let no_prefix: Address = "00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr, no_prefix);

        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz000000000000000000000000000000000000ff".parse::<Address>().is_err());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn tx_hash_parsing() {
        let hash = TxHash([7; 32]);
        let parsed: TxHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!("0x0707".parse::<TxHash>().is_err());
    }
}
