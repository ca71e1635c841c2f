use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::kv::{KvStore, KvWrites};

/// Ledger state persisted in a single `sled::Tree`.
#[derive(Debug, Clone)]
pub struct SledKv {
    // Name of the `sled::Tree`, for error messages.
    name: &'static str,
    tree: sled::Tree,
}

impl SledKv {
    pub fn new(db: &sled::Db, name: &'static str) -> Result<Self> {
        let tree = db
            .open_tree(name)
            .with_context(|| format!("opening {} database", name))?;
        Ok(SledKv { name, tree })
    }

    /// Opens (or creates) the database under `path`.
    pub fn open(path: &Path, name: &'static str) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("opening sled database at {}", path.display()))?;
        Self::new(&db, name)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl KvStore for SledKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .tree
            .get(key)
            .with_context(|| format!("retrieving {} in {}", hex::encode(key), self.name))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.tree
            .insert(key.as_slice(), value)
            .with_context(|| format!("inserting {} to {}", hex::encode(&key), self.name))?;
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.tree
            .contains_key(key)
            .with_context(|| format!("looking up {} in {}", hex::encode(key), self.name))
    }

    /// Either every write lands or none does.
    fn write_batch(&mut self, writes: KvWrites) -> Result<()> {
        let count = writes.len();
        let mut batch = sled::Batch::default();
        for (key, value) in writes {
            batch.insert(key, value);
        }
        self.tree
            .apply_batch(batch)
            .with_context(|| format!("applying batch of {} writes to {}", count, self.name))?;
        self.tree
            .flush()
            .with_context(|| format!("flushing {}", self.name))?;
        debug!("{} entries written to {}", count, self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sled_kv() -> Result<()> {
        let tmpdir = tempfile::Builder::new().prefix("tests").tempdir()?;
        let mut kv = SledKv::open(&tmpdir.path().join("db"), "ledger")?;
        assert!(
            kv.is_empty(),
            "calling len on an empty database should return 0"
        );
        assert_eq!(kv.get(b"missing")?, None);

        kv.set(b"a".to_vec(), b"1".to_vec())?;
        assert!(kv.has(b"a")?);

        let mut writes = KvWrites::new();
        for i in 0u8..10 {
            writes.insert(vec![b'k', i], vec![i]);
        }
        kv.write_batch(writes)?;
        assert_eq!(kv.len(), 11, "batch should land in full");
        assert_eq!(kv.get(&[b'k', 7])?, Some(vec![7]));
        Ok(())
    }

    #[test]
    fn test_sled_kv_shared_db() -> Result<()> {
        let tmpdir = tempfile::Builder::new().prefix("tests").tempdir()?;
        let db = sled::open(tmpdir.path().join("db"))?;
        let mut writer = SledKv::new(&db, "ledger")?;
        let reader = SledKv::new(&db, "ledger")?;
        let other = SledKv::new(&db, "other")?;

        writer.write_batch(KvWrites::from([(b"k".to_vec(), b"v".to_vec())]))?;
        assert_eq!(reader.get(b"k")?, Some(b"v".to_vec()));
        assert!(!other.has(b"k")?, "trees should not share keys");
        Ok(())
    }

    #[test]
    fn set_leaves_flushing_to_the_batch() -> Result<()> {
        let tmpdir = tempfile::Builder::new().prefix("tests").tempdir()?;
        let mut kv = SledKv::open(&tmpdir.path().join("db"), "ledger")?;
        kv.set(b"a".to_vec(), b"1".to_vec())?;
        assert!(kv.tree.flush()? > 0, "set should not flush on its own");

        kv.set(b"b".to_vec(), b"2".to_vec())?;
        kv.write_batch(KvWrites::new())?;
        assert_eq!(kv.tree.flush()?, 0, "write_batch flushes everything pending");
        assert_eq!(kv.get(b"b")?, Some(b"2".to_vec()));
        Ok(())
    }
}
