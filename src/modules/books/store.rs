use std::sync::Arc;

use async_trait::async_trait;
use bookstore_db::{DbError, MemoryTable};
use uuid::Uuid;

use super::models::Book;

/// Persistence seam for the books module.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every book, oldest first.
    async fn all(&self) -> Result<Vec<Book>, DbError>;

    async fn count(&self) -> Result<usize, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Book>, DbError>;

    async fn insert(&self, book: Book) -> Result<Book, DbError>;

    async fn replace(&self, book: Book) -> Result<Book, DbError>;

    async fn remove(&self, id: Uuid) -> Result<Book, DbError>;
}

pub type SharedStore = Arc<dyn BookStore>;

#[async_trait]
impl BookStore for MemoryTable<Book> {
    async fn all(&self) -> Result<Vec<Book>, DbError> {
        Ok(MemoryTable::all(self).await)
    }

    async fn count(&self) -> Result<usize, DbError> {
        Ok(MemoryTable::len(self).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, DbError> {
        Ok(MemoryTable::get(self, id).await)
    }

    async fn insert(&self, book: Book) -> Result<Book, DbError> {
        MemoryTable::insert(self, book).await
    }

    async fn replace(&self, book: Book) -> Result<Book, DbError> {
        MemoryTable::replace(self, book).await
    }

    async fn remove(&self, id: Uuid) -> Result<Book, DbError> {
        MemoryTable::remove(self, id).await
    }
}

/// Fresh, empty in-process catalog.
pub fn memory_store() -> SharedStore {
    Arc::new(MemoryTable::<Book>::new("books"))
}
