use anyhow::{bail, Result};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{Address, Amount};

/// Largest amount representable in a rootchain word.
pub(crate) const MAX_AMOUNT_BITS: u64 = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub owner: Address,
    pub amount: Amount,
}

impl Output {
    pub fn new(owner: Address, amount: impl Into<Amount>) -> Self {
        Output {
            owner,
            amount: amount.into(),
        }
    }

    /// An intentionally empty output slot.
    pub fn is_empty(&self) -> bool {
        self.owner.is_zero() && self.amount.is_zero()
    }

    pub fn validate_basic(&self) -> Result<()> {
        if self.owner.is_zero() {
            bail!("output owner cannot be the zero address");
        }
        if self.amount.is_zero() {
            bail!("output amount must be positive");
        }
        if self.amount.bits() > MAX_AMOUNT_BITS {
            bail!("output amount {} does not fit in 256 bits", self.amount);
        }
        Ok(())
    }
}
