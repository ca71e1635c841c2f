//! Facts about the rootchain contract, as reported by an external watcher.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::RwLock,
};

use anyhow::{bail, Result};

use crate::plasma::{Amount, Deposit, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositStatus {
    NotFound,
    /// Seen on the rootchain but not final yet.
    Pending {
        blocks_remaining: Amount,
        deposit: Deposit,
    },
    Final(Deposit),
}

/// Answers are never cached by the ledger beyond a single validation call.
pub trait RootchainOracle {
    fn get_deposit(&self, plasma_height: u64, nonce: u64) -> DepositStatus;

    /// Errors are treated by callers as transient local faults.
    fn has_exited(&self, plasma_height: u64, position: &Position) -> Result<bool>;
}

impl<T: RootchainOracle + ?Sized> RootchainOracle for &T {
    fn get_deposit(&self, plasma_height: u64, nonce: u64) -> DepositStatus {
        (**self).get_deposit(plasma_height, nonce)
    }

    fn has_exited(&self, plasma_height: u64, position: &Position) -> Result<bool> {
        (**self).has_exited(plasma_height, position)
    }
}

/// In-memory oracle for tests and development nodes.
#[derive(Debug, Default)]
pub struct MockOracle {
    deposits: RwLock<BTreeMap<u64, DepositStatus>>,
    exited: RwLock<BTreeSet<Position>>,
    unreachable: RwLock<BTreeSet<Position>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_deposit(&self, nonce: u64, deposit: Deposit) {
        if let Ok(mut deposits) = self.deposits.write() {
            deposits.insert(nonce, DepositStatus::Final(deposit));
        }
    }

    pub fn add_pending_deposit(&self, nonce: u64, deposit: Deposit, blocks_remaining: u64) {
        if let Ok(mut deposits) = self.deposits.write() {
            deposits.insert(
                nonce,
                DepositStatus::Pending {
                    blocks_remaining: blocks_remaining.into(),
                    deposit,
                },
            );
        }
    }

    pub fn exit(&self, position: Position) {
        if let Ok(mut exited) = self.exited.write() {
            exited.insert(position);
        }
    }

    /// Makes exit queries about `position` fail.
    pub fn make_unreachable(&self, position: Position) {
        if let Ok(mut unreachable) = self.unreachable.write() {
            unreachable.insert(position);
        }
    }
}

impl RootchainOracle for MockOracle {
    fn get_deposit(&self, _plasma_height: u64, nonce: u64) -> DepositStatus {
        self.deposits
            .read()
            .ok()
            .and_then(|deposits| deposits.get(&nonce).cloned())
            .unwrap_or(DepositStatus::NotFound)
    }

    fn has_exited(&self, _plasma_height: u64, position: &Position) -> Result<bool> {
        let Ok(unreachable) = self.unreachable.read() else {
            bail!("oracle state poisoned");
        };
        if unreachable.contains(position) {
            bail!("rootchain unreachable while checking {position}");
        }
        let Ok(exited) = self.exited.read() else {
            bail!("oracle state poisoned");
        };
        Ok(exited.contains(position))
    }
}
