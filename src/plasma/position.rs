use std::{fmt, str::FromStr};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Transaction index reserved for the per-block fee output.
pub const MAX_TX_INDEX: u16 = u16::MAX;

/// Identifies exactly one spendable output: a deposit (`deposit_nonce != 0`), a block fee
/// (`tx_index == MAX_TX_INDEX`) or a regular transaction output.
///
/// The derived ordering is lexicographic over `(block_num, tx_index, output_index, deposit_nonce)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub block_num: u64,
    pub tx_index: u16,
    pub output_index: u8,
    pub deposit_nonce: u64,
}

impl Position {
    pub const ENCODED_LEN: usize = 8 + 2 + 1 + 8;

    pub fn new(block_num: u64, tx_index: u16, output_index: u8, deposit_nonce: u64) -> Self {
        Position {
            block_num,
            tx_index,
            output_index,
            deposit_nonce,
        }
    }

    pub fn deposit(nonce: u64) -> Self {
        Position::new(0, 0, 0, nonce)
    }

    pub fn fee(block_num: u64) -> Self {
        Position::new(block_num, MAX_TX_INDEX, 0, 0)
    }

    pub fn is_deposit(&self) -> bool {
        self.deposit_nonce != 0
    }

    pub fn is_fee(&self) -> bool {
        !self.is_deposit() && self.tx_index == MAX_TX_INDEX
    }

    pub fn is_nil(&self) -> bool {
        *self == Position::default()
    }

    pub fn validate_basic(&self) -> Result<()> {
        if self.is_nil() {
            bail!("position cannot be nil");
        }
        if self.is_deposit() {
            if self.block_num != 0 || self.tx_index != 0 || self.output_index != 0 {
                bail!("deposit position {self} must only specify a deposit nonce");
            }
            return Ok(());
        }
        if self.block_num == 0 {
            bail!("position {self} must specify a block number");
        }
        if self.is_fee() {
            if self.output_index != 0 {
                bail!("fee position {self} must have output index 0");
            }
        } else if self.output_index > 1 {
            bail!("output index of {self} must be 0 or 1");
        }
        Ok(())
    }

    /// Fixed-width big-endian encoding, used as a store key suffix.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..8].copy_from_slice(&self.block_num.to_be_bytes());
        out[8..10].copy_from_slice(&self.tx_index.to_be_bytes());
        out[10] = self.output_index;
        out[11..19].copy_from_slice(&self.deposit_nonce.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            bail!(
                "encoded position must be {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            );
        }
        let mut block_num = [0u8; 8];
        block_num.copy_from_slice(&bytes[0..8]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[11..19]);
        Ok(Position {
            block_num: u64::from_be_bytes(block_num),
            tx_index: u16::from_be_bytes([bytes[8], bytes[9]]),
            output_index: bytes[10],
            deposit_nonce: u64::from_be_bytes(nonce),
        })
    }

    /// Exit priority used by the rootchain contract.
    pub fn priority(&self) -> u128 {
        if self.is_deposit() {
            return self.deposit_nonce as u128;
        }
        self.block_num as u128 * 1_000_000_000
            + self.tx_index as u128 * 10_000
            + self.output_index as u128
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}.{}.{}.{})",
            self.block_num, self.tx_index, self.output_index, self.deposit_nonce
        )
    }
}

impl FromStr for Position {
    type Err = anyhow::Error;

    /// Parses `(block.txIndex.outputIndex.depositNonce)`; the parentheses are optional.
    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim();
        let inner = inner.strip_prefix('(').unwrap_or(inner);
        let inner = inner.strip_suffix(')').unwrap_or(inner);
        let parts: Vec<&str> = inner.split('.').collect();
        if parts.len() != 4 {
            bail!("position {s:?} must have the form (blockNum.txIndex.outputIndex.depositNonce)");
        }
        Ok(Position {
            block_num: parts[0].parse().context("invalid block number")?,
            tx_index: parts[1].parse().context("invalid transaction index")?,
            output_index: parts[2].parse().context("invalid output index")?,
            deposit_nonce: parts[3].parse().context("invalid deposit nonce")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn categories() {
        let deposit = Position::deposit(1);
        assert!(deposit.is_deposit());
        assert!(!deposit.is_fee());

        let fee = Position::fee(100);
        assert!(fee.is_fee());
        assert!(!fee.is_deposit());

        let regular = Position::new(1, 0, 0, 0);
        assert!(!regular.is_deposit());
        assert!(!regular.is_fee());

        assert!(Position::default().is_nil());
    }

    #[test]
    fn validate_basic() {
        assert!(Position::default().validate_basic().is_err());
        assert!(Position::new(1, 0, 0, 1).validate_basic().is_err());
        assert!(Position::new(0, 1, 0, 0).validate_basic().is_err());
        assert!(Position::new(1, 0, 2, 0).validate_basic().is_err());
        assert!(Position::new(5, MAX_TX_INDEX, 1, 0).validate_basic().is_err());

        assert!(Position::deposit(3).validate_basic().is_ok());
        assert!(Position::fee(5).validate_basic().is_ok());
        assert!(Position::new(1, 6, 1, 0).validate_basic().is_ok());
    }

    #[test]
    fn categories_never_share_bytes() {
        // Same numeric soup, three different meanings.
        let deposit = Position::deposit(7);
        let fee = Position::fee(7);
        let regular = Position::new(7, 0, 0, 0);
        assert_ne!(deposit.to_bytes(), fee.to_bytes());
        assert_ne!(deposit.to_bytes(), regular.to_bytes());
        assert_ne!(fee.to_bytes(), regular.to_bytes());
    }

    #[test]
    fn string_form() {
        let pos: Position = "(100.65535.0.0)".parse().unwrap();
        assert_eq!(pos, Position::fee(100));
        assert_eq!(pos.to_string(), "(100.65535.0.0)");

        let pos: Position = "1.0.0.0".parse().unwrap();
        assert_eq!(pos, Position::new(1, 0, 0, 0));

        assert!("(1.0.0)".parse::<Position>().is_err());
        assert!("(1.70000.0.0)".parse::<Position>().is_err());
    }

    #[test]
    fn priority() {
        assert_eq!(Position::deposit(5).priority(), 5);
        assert_eq!(Position::new(2, 3, 1, 0).priority(), 2_000_030_001);
    }

    #[test]
    fn ordering() {
        let mut positions = vec![
            Position::new(2, 0, 0, 0),
            Position::deposit(1),
            Position::new(1, 1, 0, 0),
            Position::new(1, 0, 1, 0),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                Position::deposit(1),
                Position::new(1, 0, 1, 0),
                Position::new(1, 1, 0, 0),
                Position::new(2, 0, 0, 0),
            ]
        );
    }

    proptest! {
        #[test]
        fn bytes_round_trip(block in any::<u64>(), tx in any::<u16>(), out in any::<u8>(), nonce in any::<u64>()) {
            let pos = Position::new(block, tx, out, nonce);
            prop_assert_eq!(Position::from_bytes(&pos.to_bytes()).unwrap(), pos);
            prop_assert_eq!(pos.to_string().parse::<Position>().unwrap(), pos);
        }
    }
}
