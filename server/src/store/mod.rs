//! Storage seam for ticket types and tickets.
//!
//! Every state change goes through a [`StoreTransaction`]. Reads made with the
//! `lock_*` methods hold the record until the transaction commits or is dropped,
//! so a check made on them cannot be invalidated by a concurrent writer.
//! Dropping a transaction without calling `commit` discards its writes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Ticket, TicketQuery, TicketType};

pub mod memory;
pub mod postgres;

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction lost a race with another writer and may be retried.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),

    #[error("migration failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if matches!(
                db.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ) {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError>;

    /// Ticket types of one event, newest first.
    async fn ticket_types_for_event(&self, event_id: &str) -> Result<Vec<TicketType>, StoreError>;

    /// Tickets matching `query`, newest purchase first.
    async fn tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, StoreError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    async fn lock_ticket_type(&mut self, id: Uuid) -> Result<Option<TicketType>, StoreError>;

    async fn save_ticket_type(&mut self, ticket_type: &TicketType) -> Result<(), StoreError>;

    async fn delete_ticket_type(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn lock_ticket_by_code(&mut self, code: &str) -> Result<Option<Ticket>, StoreError>;

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
