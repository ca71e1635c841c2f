use serde::{Deserialize, Serialize};

use super::{Address, Amount, Output};

/// A deposit observed on the rootchain contract. Never created by a sidechain transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub owner: Address,
    pub amount: Amount,
    pub rootchain_block: Amount,
}

impl Deposit {
    pub fn new(owner: Address, amount: impl Into<Amount>, rootchain_block: impl Into<Amount>) -> Self {
        Deposit {
            owner,
            amount: amount.into(),
            rootchain_block: rootchain_block.into(),
        }
    }

    pub fn as_output(&self) -> Output {
        Output::new(self.owner, self.amount.clone())
    }
}
