//! In-process tables standing in for the database engine.
//!
//! A [`MemoryTable`] keeps records in insertion order and enforces unique
//! indexes. Every write takes the table's write lock for the whole
//! check-then-write sequence, so concurrent writers are serialized the same
//! way a storage engine serializes them through its constraints.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A record that can live in a [`MemoryTable`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary key.
    fn id(&self) -> Uuid;

    /// Values of unique-indexed columns as `(column, value)` pairs.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("unique constraint violated on {field}: {value}")]
    UniqueViolation { field: &'static str, value: String },

    #[error("record {id} not found")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

struct Inner<T> {
    next_seq: u64,
    rows: BTreeMap<u64, T>,
    by_id: HashMap<Uuid, u64>,
    unique: HashMap<(&'static str, String), Uuid>,
}

impl<T: Record> Inner<T> {
    fn check_unique(&self, record: &T) -> Result<(), DbError> {
        let id = record.id();
        for (field, value) in record.unique_keys() {
            match self.unique.get(&(field, value.clone())) {
                Some(owner) if *owner != id => {
                    return Err(DbError::UniqueViolation { field, value });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn index(&mut self, record: &T) {
        let id = record.id();
        for key in record.unique_keys() {
            self.unique.insert(key, id);
        }
    }

    fn unindex(&mut self, record: &T) {
        for key in record.unique_keys() {
            self.unique.remove(&key);
        }
    }
}

/// Insertion-ordered table with unique indexes.
pub struct MemoryTable<T> {
    name: &'static str,
    inner: RwLock<Inner<T>>,
}

impl<T: Record> MemoryTable<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(Inner {
                next_seq: 0,
                rows: BTreeMap::new(),
                by_id: HashMap::new(),
                unique: HashMap::new(),
            }),
        }
    }

    /// Snapshot of every record, oldest first.
    pub async fn all(&self) -> Vec<T> {
        self.inner.read().await.rows.values().cloned().collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        let inner = self.inner.read().await;
        inner
            .by_id
            .get(&id)
            .and_then(|seq| inner.rows.get(seq))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn insert(&self, record: T) -> Result<T, DbError> {
        let mut inner = self.inner.write().await;
        let id = record.id();
        if inner.by_id.contains_key(&id) {
            return Err(DbError::UniqueViolation {
                field: "id",
                value: id.to_string(),
            });
        }
        inner.check_unique(&record)?;

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index(&record);
        inner.by_id.insert(id, seq);
        inner.rows.insert(seq, record.clone());

        tracing::debug!(table = self.name, %id, "row inserted");
        Ok(record)
    }

    /// Replace the stored record with the same id. Unique indexes ignore the
    /// record's own previous values.
    pub async fn replace(&self, record: T) -> Result<T, DbError> {
        let mut inner = self.inner.write().await;
        let id = record.id();
        let seq = *inner.by_id.get(&id).ok_or(DbError::NotFound { id })?;
        inner.check_unique(&record)?;

        if let Some(previous) = inner.rows.get(&seq).cloned() {
            inner.unindex(&previous);
        }
        inner.index(&record);
        inner.rows.insert(seq, record.clone());

        tracing::debug!(table = self.name, %id, "row replaced");
        Ok(record)
    }

    pub async fn remove(&self, id: Uuid) -> Result<T, DbError> {
        let mut inner = self.inner.write().await;
        let seq = inner.by_id.remove(&id).ok_or(DbError::NotFound { id })?;
        let record = inner
            .rows
            .remove(&seq)
            .ok_or(DbError::NotFound { id })?;
        inner.unindex(&record);

        tracing::debug!(table = self.name, %id, "row removed");
        Ok(record)
    }
}
