//! Individual tickets and their redemption.
//!
//! A ticket is minted `active` and moves to `used` exactly once, through
//! [`TicketRegistry::validate`]. There is no way back.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{PurchaseOrder, RetryPolicy, TicketingError};
use crate::auth::Identity;
use crate::models::{Ticket, TicketQuery, TicketStatus, TicketType};
use crate::store::{StoreTransaction, TicketStore};

/// Listing filter as supplied by callers.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub organizer_view: bool,
}

impl TicketFilter {
    /// Organizers with an event see every ticket of that event; everyone else is
    /// narrowed to a user, and to the event when one is given.
    fn into_query(self) -> TicketQuery {
        match self {
            TicketFilter {
                event_id: Some(event_id),
                organizer_view: true,
                ..
            } => TicketQuery {
                event_id: Some(event_id),
                user_id: None,
            },
            TicketFilter {
                user_id: Some(user_id),
                event_id,
                ..
            } => TicketQuery {
                event_id,
                user_id: Some(user_id),
            },
            _ => TicketQuery::default(),
        }
    }
}

#[derive(Clone)]
pub struct TicketRegistry {
    store: Arc<dyn TicketStore>,
    retry: RetryPolicy,
}

impl TicketRegistry {
    pub fn new(store: Arc<dyn TicketStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Write a fresh `active` ticket inside the caller's transaction.
    ///
    /// The redemption code is a random v4 UUID; at 122 random bits a collision is not
    /// checked for, though the store still rejects one on commit.
    pub async fn mint(
        &self,
        tx: &mut dyn StoreTransaction,
        ticket_type: &TicketType,
        order: &PurchaseOrder,
    ) -> Result<Ticket, TicketingError> {
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_type_id: ticket_type.id,
            ticket_type_name: ticket_type.name.clone(),
            event_id: order.event_id.clone(),
            event_title: order.event_title.clone(),
            user_id: order.buyer.user_id.clone(),
            user_name: order.buyer.display_name.clone(),
            user_email: order.buyer.email.clone(),
            price: ticket_type.price,
            redemption_code: Uuid::new_v4().to_string(),
            status: TicketStatus::Active,
            purchase_date: Utc::now(),
            used_at: None,
            validated_by: None,
        };

        tx.insert_ticket(&ticket).await?;
        Ok(ticket)
    }

    /// Redeem a ticket by its code. A second redemption of the same code fails with
    /// `AlreadyUsed`, whether it races the first or comes after it.
    pub async fn validate(
        &self,
        redemption_code: &str,
        validator: &Identity,
    ) -> Result<Ticket, TicketingError> {
        let code = redemption_code.trim();
        if code.is_empty() {
            return Err(TicketingError::InvalidInput(
                "Redemption code is required".to_string(),
            ));
        }

        let ticket = self
            .retry
            .run("validate_ticket", move || self.try_validate(code, validator))
            .await?;

        info!(
            ticket_id = %ticket.id,
            event_id = %ticket.event_id,
            validated_by = %validator.user_id,
            "Ticket redeemed"
        );
        Ok(ticket)
    }

    async fn try_validate(
        &self,
        code: &str,
        validator: &Identity,
    ) -> Result<Ticket, TicketingError> {
        let mut tx = self.store.begin().await?;
        let mut ticket = tx
            .lock_ticket_by_code(code)
            .await?
            .ok_or(TicketingError::TicketNotFound)?;

        if ticket.status == TicketStatus::Used {
            return Err(TicketingError::AlreadyUsed {
                ticket_id: ticket.id,
                used_at: ticket.used_at,
            });
        }

        ticket.status = TicketStatus::Used;
        ticket.used_at = Some(Utc::now());
        ticket.validated_by = Some(validator.user_id.clone());

        tx.save_ticket(&ticket).await?;
        tx.commit().await?;
        Ok(ticket)
    }

    pub async fn list(&self, filter: TicketFilter) -> Result<Vec<Ticket>, TicketingError> {
        Ok(self.store.tickets(&filter.into_query()).await?)
    }

    /// Every ticket sold for an event, newest first.
    pub async fn sold(&self, event_id: &str) -> Result<Vec<Ticket>, TicketingError> {
        let query = TicketQuery {
            event_id: Some(event_id.to_string()),
            user_id: None,
        };
        Ok(self.store.tickets(&query).await?)
    }
}
