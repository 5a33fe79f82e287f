use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketTypeStats {
    pub type_id: Uuid,
    pub type_name: String,
    pub total_quantity: i32,
    pub sold_quantity: i32,
    pub revenue: Decimal,
    pub used_tickets: usize,
}

/// Per-event sales rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_tickets_sold: usize,
    pub total_revenue: Decimal,
    pub used_tickets: usize,
    pub ticket_types: usize,
    pub stats_by_type: Vec<TicketTypeStats>,
}
