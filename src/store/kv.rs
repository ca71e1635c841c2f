use std::collections::BTreeMap;

use anyhow::Result;

/// Pending writes, ordered by key so that batches apply deterministically.
pub type KvWrites = BTreeMap<Vec<u8>, Vec<u8>>;

/// Minimal byte-level key-value interface the ledger is written against.
///
/// Nothing is ever deleted from the ledger, so there is no `remove`.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Applies every write, atomically where the backend supports it.
    fn write_batch(&mut self, writes: KvWrites) -> Result<()> {
        for (key, value) in writes {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl<T: KvStore + ?Sized> KvStore for &mut T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        (**self).set(key, value)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        (**self).has(key)
    }

    fn write_batch(&mut self, writes: KvWrites) -> Result<()> {
        (**self).write_batch(writes)
    }
}

/// In-memory store, for tests and throwaway nodes.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: KvWrites,
}

impl MemoryKv {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn write_batch(&mut self, writes: KvWrites) -> Result<()> {
        self.entries.extend(writes);
        Ok(())
    }
}

/// Write overlay on top of a parent store. Reads fall through to the parent, writes stay
/// in the overlay until [`CacheKv::write`] pushes them down in one batch.
#[derive(Debug)]
pub struct CacheKv<P> {
    parent: P,
    writes: KvWrites,
}

impl<P: KvStore> CacheKv<P> {
    pub fn new(parent: P) -> Self {
        Self::resume(parent, KvWrites::new())
    }

    /// Re-attaches writes previously taken out with [`CacheKv::into_writes`].
    pub fn resume(parent: P, writes: KvWrites) -> Self {
        CacheKv { parent, writes }
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Drops the overlay and hands back the untouched parent.
    pub fn discard(self) -> P {
        self.parent
    }

    pub fn into_writes(self) -> KvWrites {
        self.writes
    }

    /// Flushes the overlay into the parent and returns it.
    pub fn write(mut self) -> Result<P> {
        if !self.writes.is_empty() {
            self.parent.write_batch(self.writes)?;
        }
        Ok(self.parent)
    }
}

impl<P: KvStore> KvStore for CacheKv<P> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.writes.insert(key, value);
        Ok(())
    }

    fn write_batch(&mut self, writes: KvWrites) -> Result<()> {
        self.writes.extend(writes);
        Ok(())
    }
}
