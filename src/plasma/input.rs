use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{Address, Position, Signature};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub position: Position,
    pub owner: Address,
    pub signature: Signature,
    /// One signature per owner that contributed to the transaction which created
    /// `position`. Always empty for deposits and fees.
    pub confirm_signatures: Vec<Signature>,
}

impl Input {
    pub fn new(
        position: Position,
        owner: Address,
        signature: Signature,
        confirm_signatures: Vec<Signature>,
    ) -> Self {
        Input {
            position,
            owner,
            signature,
            confirm_signatures,
        }
    }

    /// Whether this input spends a regular transaction output, and so must carry confirm signatures.
    pub fn needs_confirmation(&self) -> bool {
        !self.position.is_deposit() && !self.position.is_fee()
    }

    pub fn validate_basic(&self) -> Result<()> {
        self.position
            .validate_basic()
            .with_context(|| format!("invalid input position {}", self.position))?;

        if self.owner.is_zero() {
            bail!("input owner cannot be the zero address");
        }
        if self.signature.is_empty() {
            bail!("cannot provide an empty signature");
        }

        let confirm_sigs = self.confirm_signatures.len();
        if self.needs_confirmation() {
            if confirm_sigs != 1 && confirm_sigs != 2 {
                bail!("transaction inputs must specify 1 or 2 confirm signatures");
            }
            if self.confirm_signatures.iter().any(Signature::is_empty) {
                bail!("confirm signatures cannot be empty");
            }
        } else if confirm_sigs != 0 {
            bail!("deposit or fee inputs must not include confirm signatures");
        }
        Ok(())
    }
}
