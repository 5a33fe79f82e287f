use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A purchasable class of ticket for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub total_quantity: i32,
    pub sold_quantity: i32,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TicketType {
    /// Seats left to sell. Never negative while `sold_quantity <= total_quantity` holds.
    pub fn available_quantity(&self) -> i32 {
        (self.total_quantity - self.sold_quantity).max(0)
    }

    pub fn is_sold_out(&self) -> bool {
        self.sold_quantity >= self.total_quantity
    }
}

/// Ticket type as returned to clients, with the availability computed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct TicketTypeView {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    pub available_quantity: i32,
}

impl From<TicketType> for TicketTypeView {
    fn from(ticket_type: TicketType) -> Self {
        let available_quantity = ticket_type.available_quantity();
        Self {
            ticket_type,
            available_quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicketType {
    pub event_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub total_quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketTypeChanges {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub total_quantity: i32,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(total: i32, sold: i32) -> TicketType {
        TicketType {
            id: Uuid::new_v4(),
            event_id: "evt-1".to_string(),
            name: "General".to_string(),
            description: String::new(),
            price: Decimal::new(2500, 2),
            total_quantity: total,
            sold_quantity: sold,
            is_active: true,
            created_by: "organizer".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_available_quantity() {
        assert_eq!(sample(10, 3).available_quantity(), 7);
        assert_eq!(sample(2, 2).available_quantity(), 0);
        assert!(sample(2, 2).is_sold_out());
        assert!(!sample(0, 0).available_quantity().is_negative());
    }

    #[test]
    fn test_view_serializes_flat() {
        let view = TicketTypeView::from(sample(5, 1));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["available_quantity"], 4);
        assert_eq!(json["sold_quantity"], 1);
        assert_eq!(json["name"], "General");
    }
}
