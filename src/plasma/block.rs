use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::Amount;

/// Aggregated record of one host-runtime block that admitted plasma transactions.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde_as(as = "Hex")]
    pub header: [u8; 32],
    pub tx_count: u16,
    pub fee_amount: Amount,
}

impl Block {
    pub fn new(header: [u8; 32], tx_count: u16, fee_amount: Amount) -> Self {
        Block {
            header,
            tx_count,
            fee_amount,
        }
    }
}
