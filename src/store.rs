//! Ledger and block stores over a byte-level [`KvStore`].

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

mod blocks;
pub mod keys;
pub mod kv;
mod kv_sled;
mod outputs;
pub mod types;

pub use kv::{CacheKv, KvStore, KvWrites, MemoryKv};
pub use kv_sled::SledKv;
pub use types::{StoredBlock, StoredDeposit, StoredOutput, StoredTransaction, Wallet};

/// Typed access to the ledger keyspace. All ledger and block operations live on this type;
/// atomicity is provided by whatever `K` buffers the writes.
#[derive(Debug)]
pub struct DataStore<K> {
    kv: K,
}

impl<K: KvStore> DataStore<K> {
    pub fn new(kv: K) -> Self {
        DataStore { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let Some(bytes) = self.kv.get(key)? else {
            return Ok(None);
        };
        let (value, _): (T, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e| Error::Corrupted(format!("undecodable entry {}: {e}", hex::encode(key))),
            )?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| Error::Serialization(format!("encoding {}: {e}", hex::encode(&key))))?;
        self.kv.set(key, bytes)?;
        Ok(())
    }
}
