use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{codec, output::MAX_AMOUNT_BITS, Amount, Input, Output, Position, TxHash};
use crate::utils::crypto::{keccak256, sha256};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub fee: Amount,
}

impl Transaction {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>, fee: impl Into<Amount>) -> Self {
        Transaction {
            inputs,
            outputs,
            fee: fee.into(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        if self.inputs.is_empty() || self.inputs.len() > 2 {
            bail!("transaction must have 1 or 2 inputs, got {}", self.inputs.len());
        }
        if self.outputs.is_empty() || self.outputs.len() > 2 {
            bail!("transaction must have 1 or 2 outputs, got {}", self.outputs.len());
        }

        for (i, input) in self.inputs.iter().enumerate() {
            input.validate_basic().with_context(|| format!("input {i}"))?;
        }
        if let [first, second] = self.inputs.as_slice() {
            if first.position == second.position {
                bail!("both inputs spend {}", first.position);
            }
        }

        for (i, output) in self.outputs.iter().enumerate() {
            output.validate_basic().with_context(|| format!("output {i}"))?;
        }
        if self.fee.bits() > MAX_AMOUNT_BITS {
            bail!("fee {} does not fit in 256 bits", self.fee);
        }
        Ok(())
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        codec::signing_bytes(&self.inputs, &self.outputs, &self.fee)
    }

    /// The hash every input owner signs. Signatures are excluded.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_bytes())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .context("encoding transaction")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (tx, read): (Transaction, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .context("decoding transaction")?;
        if read != bytes.len() {
            bail!("{} trailing bytes after transaction", bytes.len() - read);
        }
        tx.validate_basic()?;
        Ok(tx)
    }

    /// Hash over the full encoding, signatures included. Identifies the transaction in the ledger.
    pub fn inclusion_hash(&self) -> Result<TxHash> {
        Ok(TxHash(sha256(&self.to_bytes()?)))
    }

    pub fn input_positions(&self) -> impl Iterator<Item = &Position> {
        self.inputs.iter().map(|input| &input.position)
    }

    /// Sum of output amounts plus the fee.
    pub fn total_spent(&self) -> Amount {
        self.outputs
            .iter()
            .fold(self.fee.clone(), |acc, output| acc + &output.amount)
    }
}
