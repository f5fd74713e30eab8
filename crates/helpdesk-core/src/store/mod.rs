//! Storage contract for ticket documents.
//!
//! Tickets are keyed by `(partition, id)` where the partition is the
//! ticket's category, as in a partitioned document database. A category
//! change therefore cannot be an in-place update: see [`PersistPlan`].

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileRepository;
pub use lock::{LockError, StoreLock};
pub use memory::MemoryRepository;

use crate::error::ErrorCode;
use crate::machine::Transition;
use crate::model::{Category, Ticket};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ticket {id} not found")]
    NotFound { id: String },
    #[error("ticket {id} already exists")]
    AlreadyExists { id: String },
    #[error("ticket store is not initialized at {0}")]
    NotInitialized(std::path::PathBuf),
    #[error("ticket store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ticket store document is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::TicketNotFound,
            Self::AlreadyExists { .. } => ErrorCode::DuplicateTicket,
            Self::NotInitialized(_) => ErrorCode::NotInitialized,
            Self::Io(_) | Self::Serde(_) => ErrorCode::StoreWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }
}

/// Document repository the service persists tickets through.
pub trait TicketRepository {
    /// Look a ticket up by id across all partitions.
    ///
    /// An interrupted relocation can leave one id under two partitions. The
    /// copy with the longer comment history wins: a category change always
    /// appends to it, so that is the relocated copy.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no partition holds `id`.
    fn get(&self, id: &str) -> Result<Ticket, StoreError>;

    /// Insert a new document under the ticket's partition.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] when the key is taken.
    fn create(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Insert or replace the document under the ticket's partition.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn put(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Remove the document stored under `(partition_key, id)`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when nothing is stored under that key.
    fn delete_by_key(&mut self, id: &str, partition_key: &Category) -> Result<(), StoreError>;

    /// All stored tickets, ordered by id.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn list(&self) -> Result<Vec<Ticket>, StoreError>;
}

/// How a transition's snapshot must be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistPlan {
    /// Same partition: replace in place.
    Upsert(Ticket),
    /// Category changed: create under the new partition, then delete the
    /// document left under `stale_key`.
    Relocate { ticket: Ticket, stale_key: Category },
}

impl PersistPlan {
    #[must_use]
    pub fn for_transition(transition: Transition) -> Self {
        match transition.relocation {
            Some(relocation) => Self::Relocate {
                ticket: transition.ticket,
                stale_key: relocation.from,
            },
            None => Self::Upsert(transition.ticket),
        }
    }

    #[must_use]
    pub const fn ticket(&self) -> &Ticket {
        match self {
            Self::Upsert(ticket) | Self::Relocate { ticket, .. } => ticket,
        }
    }
}
