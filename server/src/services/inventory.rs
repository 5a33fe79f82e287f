//! Ticket type capacity and the purchase transaction.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{RetryPolicy, TicketRegistry, TicketingError};
use crate::auth::Identity;
use crate::models::{NewTicketType, Ticket, TicketType, TicketTypeChanges, TicketTypeView};
use crate::store::TicketStore;

/// A buyer's request for one ticket of one type.
#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub ticket_type_id: Uuid,
    pub event_id: String,
    pub event_title: String,
    pub buyer: Identity,
}

fn require_text(value: &str, field: &str) -> Result<(), TicketingError> {
    if value.trim().is_empty() {
        return Err(TicketingError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

// Prices are stored as NUMERIC(12, 2).
const PRICE_SCALE: u32 = 2;
const MAX_PRICE_CENTS: i64 = 999_999_999_999;

fn validate_terms(price: Decimal, total_quantity: i32) -> Result<(), TicketingError> {
    if price.is_sign_negative() {
        return Err(TicketingError::InvalidInput(
            "price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(TicketingError::InvalidInput(format!(
            "price must have at most {} decimal places",
            PRICE_SCALE
        )));
    }
    if price > Decimal::new(MAX_PRICE_CENTS, PRICE_SCALE) {
        return Err(TicketingError::InvalidInput(format!(
            "price must not exceed {}",
            Decimal::new(MAX_PRICE_CENTS, PRICE_SCALE)
        )));
    }
    if total_quantity < 0 {
        return Err(TicketingError::InvalidInput(
            "total_quantity must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn TicketStore>,
    registry: TicketRegistry,
    retry: RetryPolicy,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn TicketStore>, registry: TicketRegistry, retry: RetryPolicy) -> Self {
        Self {
            store,
            registry,
            retry,
        }
    }

    pub async fn create_ticket_type(
        &self,
        new: NewTicketType,
        created_by: &str,
    ) -> Result<TicketType, TicketingError> {
        require_text(&new.event_id, "event_id")?;
        require_text(&new.name, "name")?;
        validate_terms(new.price, new.total_quantity)?;

        let ticket_type = TicketType {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            name: new.name.trim().to_string(),
            description: new.description.unwrap_or_default(),
            price: new.price,
            total_quantity: new.total_quantity,
            sold_quantity: 0,
            is_active: true,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };

        self.store.insert_ticket_type(&ticket_type).await?;
        info!(
            ticket_type_id = %ticket_type.id,
            event_id = %ticket_type.event_id,
            total_quantity = ticket_type.total_quantity,
            "Ticket type created"
        );
        Ok(ticket_type)
    }

    /// All ticket types of an event, newest first. With both `available_only` and
    /// `organizer_view` set, inactive and zero-capacity types are left out.
    pub async fn list_ticket_types(
        &self,
        event_id: &str,
        available_only: bool,
        organizer_view: bool,
    ) -> Result<Vec<TicketTypeView>, TicketingError> {
        let types = self.store.ticket_types_for_event(event_id).await?;
        Ok(types
            .into_iter()
            .filter(|t| !(available_only && organizer_view) || (t.is_active && t.total_quantity > 0))
            .map(TicketTypeView::from)
            .collect())
    }

    /// Types a buyer can currently pick from. The counts may be stale by the time
    /// a purchase runs; `purchase` checks again under lock.
    pub async fn get_available(&self, event_id: &str) -> Result<Vec<TicketTypeView>, TicketingError> {
        let types = self.store.ticket_types_for_event(event_id).await?;
        Ok(types
            .into_iter()
            .filter(|t| t.is_active)
            .map(TicketTypeView::from)
            .filter(|view| view.available_quantity > 0)
            .collect())
    }

    pub async fn update_ticket_type(
        &self,
        id: Uuid,
        changes: TicketTypeChanges,
    ) -> Result<TicketType, TicketingError> {
        require_text(&changes.name, "name")?;
        validate_terms(changes.price, changes.total_quantity)?;

        let changes = &changes;
        let updated = self
            .retry
            .run("update_ticket_type", move || self.try_update(id, changes))
            .await?;

        info!(ticket_type_id = %id, "Ticket type updated");
        Ok(updated)
    }

    async fn try_update(
        &self,
        id: Uuid,
        changes: &TicketTypeChanges,
    ) -> Result<TicketType, TicketingError> {
        let mut tx = self.store.begin().await?;
        let mut ticket_type = tx
            .lock_ticket_type(id)
            .await?
            .ok_or(TicketingError::TicketTypeNotFound(id))?;

        if changes.total_quantity < ticket_type.sold_quantity {
            return Err(TicketingError::Conflict(format!(
                "total_quantity cannot be lower than the {} tickets already sold",
                ticket_type.sold_quantity
            )));
        }

        ticket_type.name = changes.name.trim().to_string();
        if let Some(description) = &changes.description {
            ticket_type.description = description.clone();
        }
        ticket_type.price = changes.price;
        ticket_type.total_quantity = changes.total_quantity;
        if let Some(is_active) = changes.is_active {
            ticket_type.is_active = is_active;
        }
        ticket_type.updated_at = Some(Utc::now());

        tx.save_ticket_type(&ticket_type).await?;
        tx.commit().await?;
        Ok(ticket_type)
    }

    /// Remove a ticket type nobody has bought yet. Types with sales are kept so
    /// their tickets keep a valid reference; deactivate them instead.
    pub async fn delete_ticket_type(&self, id: Uuid) -> Result<(), TicketingError> {
        self.retry
            .run("delete_ticket_type", move || self.try_delete(id))
            .await?;
        info!(ticket_type_id = %id, "Ticket type deleted");
        Ok(())
    }

    async fn try_delete(&self, id: Uuid) -> Result<(), TicketingError> {
        let mut tx = self.store.begin().await?;
        let ticket_type = tx
            .lock_ticket_type(id)
            .await?
            .ok_or(TicketingError::TicketTypeNotFound(id))?;

        if ticket_type.sold_quantity > 0 {
            return Err(TicketingError::Conflict(format!(
                "ticket type has {} sold tickets and cannot be deleted",
                ticket_type.sold_quantity
            )));
        }

        tx.delete_ticket_type(id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Sell one ticket. Capacity check, sold counter increment and ticket minting
    /// commit together or not at all.
    pub async fn purchase(&self, order: &PurchaseOrder) -> Result<Ticket, TicketingError> {
        require_text(&order.buyer.user_id, "buyer user id")?;
        require_text(&order.event_id, "event_id")?;
        require_text(&order.event_title, "event_title")?;

        let ticket = self
            .retry
            .run("purchase_ticket", move || self.try_purchase(order))
            .await?;

        info!(
            ticket_id = %ticket.id,
            ticket_type_id = %ticket.ticket_type_id,
            user_id = %ticket.user_id,
            price = %ticket.price,
            "Ticket purchased"
        );
        Ok(ticket)
    }

    async fn try_purchase(&self, order: &PurchaseOrder) -> Result<Ticket, TicketingError> {
        let mut tx = self.store.begin().await?;
        let mut ticket_type = tx
            .lock_ticket_type(order.ticket_type_id)
            .await?
            .ok_or(TicketingError::TicketTypeNotFound(order.ticket_type_id))?;

        if ticket_type.event_id != order.event_id {
            return Err(TicketingError::InvalidInput(format!(
                "ticket type {} does not belong to event {}",
                ticket_type.id, order.event_id
            )));
        }
        if !ticket_type.is_active {
            return Err(TicketingError::NotOnSale {
                ticket_type_id: ticket_type.id,
            });
        }
        if ticket_type.is_sold_out() {
            return Err(TicketingError::SoldOut {
                ticket_type_id: ticket_type.id,
            });
        }

        ticket_type.sold_quantity += 1;
        tx.save_ticket_type(&ticket_type).await?;

        let ticket = self.registry.mint(tx.as_mut(), &ticket_type, order).await?;
        tx.commit().await?;
        Ok(ticket)
    }
}
