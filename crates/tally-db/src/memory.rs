//! In-memory backend.

use std::collections::BTreeMap;

use crate::{DbError, Result, Store};

type Table = BTreeMap<(String, String), String>;

/// [`Store`] over a `BTreeMap`. Batches snapshot the whole map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Table,
    checkpoint: Option<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities of `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.entries.keys().filter(|(k, _)| k == kind).count()
    }
}

impl Store for MemoryStore {
    fn get_raw(&self, kind: &str, id: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(&(kind.to_string(), id.to_string()))
            .cloned())
    }

    fn set_raw(&mut self, kind: &str, id: &str, body: String) -> Result<()> {
        self.entries.insert((kind.to_string(), id.to_string()), body);
        Ok(())
    }

    fn delete_raw(&mut self, kind: &str, id: &str) -> Result<()> {
        self.entries.remove(&(kind.to_string(), id.to_string()));
        Ok(())
    }

    fn list_ids(&self, kind: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .keys()
            .filter(|(k, _)| k == kind)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn begin_batch(&mut self) -> Result<()> {
        self.checkpoint = Some(self.entries.clone());
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        self.checkpoint.take().map(|_| ()).ok_or(DbError::NoBatch)
    }

    fn rollback_batch(&mut self) -> Result<()> {
        let saved = self.checkpoint.take().ok_or(DbError::NoBatch)?;
        self.entries = saved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::new();
        store.set_raw("k", "a", "1".into()).expect("set");
        assert_eq!(store.get_raw("k", "a").expect("get"), Some("1".into()));
        store.delete_raw("k", "a").expect("delete");
        assert_eq!(store.get_raw("k", "a").expect("get"), None);
        store.delete_raw("k", "a").expect("missing delete is fine");
    }

    #[test]
    fn test_kinds_are_isolated() {
        let mut store = MemoryStore::new();
        store.set_raw("a", "1", "x".into()).expect("set");
        store.set_raw("b", "1", "y".into()).expect("set");
        assert_eq!(store.list_ids("a").expect("list"), vec!["1".to_string()]);
        assert_eq!(store.count("b"), 1);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut store = MemoryStore::new();
        store.set_raw("k", "keep", "1".into()).expect("set");
        store.begin_batch().expect("begin");
        store.set_raw("k", "drop", "2".into()).expect("set");
        store.delete_raw("k", "keep").expect("delete");
        store.rollback_batch().expect("rollback");
        assert_eq!(store.get_raw("k", "keep").expect("get"), Some("1".into()));
        assert_eq!(store.get_raw("k", "drop").expect("get"), None);
    }

    #[test]
    fn test_commit_without_batch_fails() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.commit_batch(), Err(DbError::NoBatch)));
    }
}
