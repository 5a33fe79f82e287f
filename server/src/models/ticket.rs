use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "used" => Ok(TicketStatus::Used),
            other => Err(format!("unknown ticket status '{}'", other)),
        }
    }
}

/// One sold, redeemable admission.
///
/// `price` is frozen at sale time; later edits to the ticket type do not touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub ticket_type_name: String,
    pub event_id: String,
    pub event_title: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub price: Decimal,
    pub redemption_code: String,
    pub status: TicketStatus,
    pub purchase_date: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub validated_by: Option<String>,
}

impl Ticket {
    pub fn is_used(&self) -> bool {
        self.status == TicketStatus::Used
    }
}

/// Which tickets a listing should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.event_id
            .as_deref()
            .map_or(true, |event_id| ticket.event_id == event_id)
            && self
                .user_id
                .as_deref()
                .map_or(true, |user_id| ticket.user_id == user_id)
    }
}
