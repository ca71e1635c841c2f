use num_bigint::BigUint;
use tracing::{debug, error};

use super::{
    keys::{deposit_key, fee_key, position_key, tx_key, wallet_key},
    types::{StoredDeposit, StoredOutput, StoredTransaction, Wallet},
    DataStore, KvStore,
};
use crate::{
    error::{Error, Result},
    plasma::{Address, Deposit, Output, Position, TxHash},
};

impl<K: KvStore> DataStore<K> {
    pub fn get_wallet(&self, address: &Address) -> Result<Option<Wallet>> {
        self.read(&wallet_key(address))
    }

    pub fn get_deposit(&self, nonce: u64) -> Result<Option<StoredDeposit>> {
        self.read(&deposit_key(nonce))
    }

    pub fn has_deposit(&self, nonce: u64) -> Result<bool> {
        Ok(self.kv.has(&deposit_key(nonce))?)
    }

    pub fn get_fee(&self, position: &Position) -> Result<Option<StoredOutput>> {
        self.read(&fee_key(position))
    }

    pub fn get_transaction(&self, hash: &TxHash) -> Result<Option<StoredTransaction>> {
        self.read(&tx_key(hash))
    }

    /// Resolves an output position to the transaction that created it.
    pub fn get_transaction_by_position(
        &self,
        position: &Position,
    ) -> Result<Option<StoredTransaction>> {
        let Some(hash) = self.read::<TxHash>(&position_key(position))? else {
            return Ok(None);
        };
        match self.get_transaction(&hash)? {
            Some(tx) => Ok(Some(tx)),
            None => {
                error!("position {} indexes missing transaction {}", position, hash);
                Err(Error::Corrupted(format!(
                    "position {position} indexes missing transaction {hash}"
                )))
            }
        }
    }

    pub fn get_output(&self, position: &Position) -> Result<Option<StoredOutput>> {
        if position.is_deposit() {
            return Ok(self
                .get_deposit(position.deposit_nonce)?
                .map(|deposit| deposit.as_stored_output()));
        }
        if position.is_fee() {
            return self.get_fee(position);
        }
        let Some(tx) = self.get_transaction_by_position(position)? else {
            return Ok(None);
        };
        tx.output(position.output_index).map(Some).ok_or_else(|| {
            Error::Corrupted(format!("transaction at {position} has no such output"))
        })
    }

    pub fn has_output(&self, position: &Position) -> Result<bool> {
        Ok(self.get_output(position)?.is_some())
    }

    pub fn store_deposit(&mut self, nonce: u64, deposit: Deposit) -> Result<()> {
        if self.has_deposit(nonce)? {
            return Err(Error::Corrupted(format!(
                "deposit with nonce {nonce} already stored"
            )));
        }
        let position = Position::deposit(nonce);
        self.credit(&deposit.owner, position, &deposit.amount)?;
        debug!("storing deposit {} for {}", nonce, deposit.owner);
        self.write(deposit_key(nonce), &StoredDeposit::unspent(deposit))
    }

    pub fn store_fee(&mut self, block_num: u64, output: Output) -> Result<()> {
        let position = Position::fee(block_num);
        let key = fee_key(&position);
        if self.kv.has(&key)? {
            return Err(Error::Corrupted(format!(
                "fee for block {block_num} already stored"
            )));
        }
        self.credit(&output.owner, position, &output.amount)?;
        debug!("storing fee {} for {}", position, output.owner);
        self.write(key, &StoredOutput::unspent(output))
    }

    /// Persists the transaction record. Its outputs are not discoverable until
    /// [`DataStore::store_outputs`] has run as well.
    pub fn store_transaction(&mut self, tx: &StoredTransaction) -> Result<TxHash> {
        let hash = tx
            .transaction
            .inclusion_hash()
            .map_err(|e| Error::Serialization(format!("{e:#}")))?;
        debug!("storing transaction {} at {}", hash, tx.position);
        self.write(tx_key(&hash), tx)?;
        Ok(hash)
    }

    /// Indexes every output of `tx` by position and credits its owner.
    pub fn store_outputs(&mut self, tx: &StoredTransaction) -> Result<()> {
        let hash = tx
            .transaction
            .inclusion_hash()
            .map_err(|e| Error::Serialization(format!("{e:#}")))?;
        for (i, output) in tx.transaction.outputs.iter().enumerate() {
            let position = tx.output_position(i as u8);
            self.write(position_key(&position), &hash)?;
            self.credit(&output.owner, position, &output.amount)?;
        }
        Ok(())
    }

    pub fn spend_deposit(&mut self, nonce: u64, spender: TxHash) -> Result<()> {
        let key = deposit_key(nonce);
        let position = Position::deposit(nonce);
        let Some(mut stored) = self.read::<StoredDeposit>(&key)? else {
            return Err(Error::OutputDNE(format!("deposit {position} does not exist")));
        };
        if stored.spent {
            return Err(Error::OutputSpent(format!("deposit {position} already spent")));
        }
        stored.spent = true;
        stored.spender = Some(spender);
        self.debit(&stored.deposit.owner, position, &stored.deposit.amount)?;
        self.write(key, &stored)
    }

    pub fn spend_fee(&mut self, position: &Position, spender: TxHash) -> Result<()> {
        let key = fee_key(position);
        let Some(mut stored) = self.read::<StoredOutput>(&key)? else {
            return Err(Error::OutputDNE(format!("fee {position} does not exist")));
        };
        if stored.spent {
            return Err(Error::OutputSpent(format!("fee {position} already spent")));
        }
        stored.spent = true;
        stored.spender = Some(spender);
        self.debit(&stored.output.owner, *position, &stored.output.amount)?;
        self.write(key, &stored)
    }

    pub fn spend_output(&mut self, position: &Position, spender: TxHash) -> Result<()> {
        let Some(hash) = self.read::<TxHash>(&position_key(position))? else {
            return Err(Error::OutputDNE(format!("output {position} does not exist")));
        };
        let Some(mut tx) = self.get_transaction(&hash)? else {
            return Err(Error::Corrupted(format!(
                "position {position} indexes missing transaction {hash}"
            )));
        };
        let i = position.output_index as usize;
        let (Some(output), Some(spent)) = (tx.transaction.outputs.get(i), tx.spent.get(i)) else {
            return Err(Error::Corrupted(format!(
                "transaction {hash} has no output {i}"
            )));
        };
        if *spent {
            return Err(Error::OutputSpent(format!("output {position} already spent")));
        }
        let (owner, amount) = (output.owner, output.amount.clone());
        tx.spent[i] = true;
        tx.spenders[i] = Some(spender);
        self.debit(&owner, *position, &amount)?;
        self.write(tx_key(&hash), &tx)
    }

    fn credit(&mut self, owner: &Address, position: Position, amount: &BigUint) -> Result<()> {
        let mut wallet = self.get_wallet(owner)?.unwrap_or_default();
        if !wallet.unspent.insert(position) {
            return Err(Error::Corrupted(format!(
                "{position} credited twice to {owner}"
            )));
        }
        wallet.balance += amount;
        self.write(wallet_key(owner), &wallet)
    }

    fn debit(&mut self, owner: &Address, position: Position, amount: &BigUint) -> Result<()> {
        let mut wallet = self.get_wallet(owner)?.unwrap_or_default();
        if wallet.balance < *amount {
            error!(
                "wallet {} would go negative: balance {} < {}",
                owner, wallet.balance, amount
            );
            return Err(Error::Corrupted(format!(
                "debiting {amount} from {owner} would make its balance negative"
            )));
        }
        if !wallet.unspent.remove(&position) {
            return Err(Error::Corrupted(format!(
                "{position} is not an unspent output of {owner}"
            )));
        }
        wallet.balance -= amount;
        wallet.spent.insert(position);
        self.write(wallet_key(owner), &wallet)
    }
}
