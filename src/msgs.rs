//! Messages accepted by the plasma chain.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::plasma::{Address, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    Spend(Transaction),
    IncludeDeposit(IncludeDepositMsg),
}

/// Asks the chain to make a rootchain deposit spendable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDepositMsg {
    pub deposit_nonce: u64,
    pub owner: Address,
    /// Only differentiates re-submissions of the same inclusion request.
    pub replay_nonce: u64,
}

impl IncludeDepositMsg {
    pub fn validate_basic(&self) -> Result<()> {
        if self.deposit_nonce == 0 {
            bail!("deposit nonce must be positive");
        }
        if self.owner.is_zero() {
            bail!("deposit owner cannot be the zero address");
        }
        Ok(())
    }
}

impl Msg {
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Msg::Spend(tx) => tx.validate_basic(),
            Msg::IncludeDeposit(msg) => msg.validate_basic(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Spend(_) => "spend",
            Msg::IncludeDeposit(_) => "include_deposit",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .context("encoding message")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (msg, read): (Msg, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .context("decoding message")?;
        if read != bytes.len() {
            bail!("{} trailing bytes after {} message", bytes.len() - read, msg.kind());
        }
        msg.validate_basic()
            .with_context(|| format!("invalid {} message", msg.kind()))?;
        Ok(msg)
    }
}
