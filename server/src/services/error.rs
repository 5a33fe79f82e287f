use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Outcomes of ticketing operations other than success.
///
/// Everything except `Store` is an expected business result the caller is meant
/// to act on.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Ticket type '{0}' not found")]
    TicketTypeNotFound(Uuid),

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("No tickets available for this type")]
    SoldOut { ticket_type_id: Uuid },

    #[error("Ticket type is not on sale")]
    NotOnSale { ticket_type_id: Uuid },

    #[error("Ticket has already been used")]
    AlreadyUsed {
        ticket_id: Uuid,
        used_at: Option<DateTime<Utc>>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Ticket store is busy, gave up after {attempts} attempts")]
    Transient { attempts: u32 },

    #[error("ticket store failure")]
    Store(#[from] StoreError),
}
