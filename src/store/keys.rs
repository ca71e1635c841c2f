//! Store keyspace. Each category owns a one-byte prefix, and every suffix is fixed width,
//! so no two categories can ever produce the same key.

use crate::plasma::{Address, BlockHeight, Position, TxHash};

pub const WALLET_PREFIX: u8 = 0x00;
pub const DEPOSIT_PREFIX: u8 = 0x01;
pub const FEE_PREFIX: u8 = 0x02;
pub const TX_PREFIX: u8 = 0x03;
pub const POSITION_PREFIX: u8 = 0x04;
pub const BLOCK_PREFIX: u8 = 0x05;
pub const PLASMA_HEIGHT_KEY: &[u8] = &[0x06];

fn prefixed(prefix: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + suffix.len());
    key.push(prefix);
    key.extend_from_slice(suffix);
    key
}

pub fn wallet_key(address: &Address) -> Vec<u8> {
    prefixed(WALLET_PREFIX, &address.0)
}

pub fn deposit_key(nonce: u64) -> Vec<u8> {
    prefixed(DEPOSIT_PREFIX, &nonce.to_be_bytes())
}

pub fn fee_key(position: &Position) -> Vec<u8> {
    prefixed(FEE_PREFIX, &position.to_bytes())
}

pub fn tx_key(hash: &TxHash) -> Vec<u8> {
    prefixed(TX_PREFIX, &hash.0)
}

pub fn position_key(position: &Position) -> Vec<u8> {
    prefixed(POSITION_PREFIX, &position.to_bytes())
}

pub fn block_key(height: BlockHeight) -> Vec<u8> {
    prefixed(BLOCK_PREFIX, &height.0.to_be_bytes())
}
