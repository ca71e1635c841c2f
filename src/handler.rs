//! Applies admitted messages to the ledger.

use tracing::{debug, info};

use crate::{
    ante::Admission,
    chain::{BlockSession, Context},
    error::Result,
    plasma::{Position, Transaction, TxHash},
    store::{DataStore, KvStore, StoredTransaction},
    utils::crypto::sha256,
};

pub fn handle<K: KvStore>(
    ctx: &Context,
    store: &mut DataStore<K>,
    session: &mut BlockSession,
    admission: Admission,
) -> Result<()> {
    match admission {
        Admission::Spend { tx, hash } => handle_spend(ctx, store, session, tx, hash),
        Admission::IncludeDeposit { nonce, deposit } => {
            let tx_index = session.next_tx_index()?;
            info!(
                "including deposit {} of {} for {} at tx index {}",
                nonce, deposit.amount, deposit.owner, tx_index
            );
            store.store_deposit(nonce, deposit)
        }
    }
}

fn handle_spend<K: KvStore>(
    ctx: &Context,
    store: &mut DataStore<K>,
    session: &mut BlockSession,
    tx: Transaction,
    hash: TxHash,
) -> Result<()> {
    for position in tx.input_positions() {
        spend(store, position, hash)?;
    }

    let tx_index = session.next_tx_index()?;
    let block_num = store.next_plasma_block_height()?.0;
    let position = Position::new(block_num, tx_index, 0, 0);

    let stored = StoredTransaction::new(tx, confirmation_hash(&hash, &ctx.header_hash), position);
    store.store_transaction(&stored)?;
    store.store_outputs(&stored)?;
    debug!("spend {} stored at {}", hash, position);
    Ok(())
}

fn spend<K: KvStore>(store: &mut DataStore<K>, position: &Position, spender: TxHash) -> Result<()> {
    if position.is_deposit() {
        store.spend_deposit(position.deposit_nonce, spender)
    } else if position.is_fee() {
        store.spend_fee(position, spender)
    } else {
        store.spend_output(position, spender)
    }
}

/// Binds a transaction to the host block it was included in. Confirm signatures sign this.
pub fn confirmation_hash(inclusion_hash: &TxHash, header_hash: &[u8; 32]) -> [u8; 32] {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&inclusion_hash.0);
    preimage[32..].copy_from_slice(header_hash);
    sha256(&preimage)
}
