use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::plasma::{Amount, Block, Deposit, Output, Position, Transaction, TxHash};

/// An output as seen by the ledger, whatever its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOutput {
    pub output: Output,
    pub spent: bool,
    pub spender: Option<TxHash>,
}

impl StoredOutput {
    pub fn unspent(output: Output) -> Self {
        StoredOutput {
            output,
            spent: false,
            spender: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDeposit {
    pub deposit: Deposit,
    pub spent: bool,
    pub spender: Option<TxHash>,
}

impl StoredDeposit {
    pub fn unspent(deposit: Deposit) -> Self {
        StoredDeposit {
            deposit,
            spent: false,
            spender: None,
        }
    }

    pub fn as_stored_output(&self) -> StoredOutput {
        StoredOutput {
            output: self.deposit.as_output(),
            spent: self.spent,
            spender: self.spender,
        }
    }
}

/// A committed transaction with per-output spend state.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub transaction: Transaction,
    /// The message confirm signatures over this transaction's outputs are made on.
    #[serde_as(as = "Hex")]
    pub confirmation_hash: [u8; 32],
    pub spent: Vec<bool>,
    pub spenders: Vec<Option<TxHash>>,
    /// Position the transaction occupies; its outputs sit at the same block and tx index.
    pub position: Position,
}

impl StoredTransaction {
    pub fn new(transaction: Transaction, confirmation_hash: [u8; 32], position: Position) -> Self {
        let outputs = transaction.outputs.len();
        StoredTransaction {
            transaction,
            confirmation_hash,
            spent: vec![false; outputs],
            spenders: vec![None; outputs],
            position,
        }
    }

    pub fn output_position(&self, output_index: u8) -> Position {
        Position::new(
            self.position.block_num,
            self.position.tx_index,
            output_index,
            0,
        )
    }

    pub fn output(&self, output_index: u8) -> Option<StoredOutput> {
        let i = output_index as usize;
        Some(StoredOutput {
            output: self.transaction.outputs.get(i)?.clone(),
            spent: *self.spent.get(i)?,
            spender: *self.spenders.get(i)?,
        })
    }
}

/// Per-address cached index. `balance` always equals the sum of the unspent amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: Amount,
    pub unspent: BTreeSet<Position>,
    pub spent: BTreeSet<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub block: Block,
    pub host_height: u64,
}
