use std::sync::Arc;

use rust_decimal::Decimal;

use super::TicketingError;
use crate::models::{StatsReport, Ticket, TicketQuery, TicketTypeStats};
use crate::store::TicketStore;

/// Read-only sales rollup. Reads ticket types and tickets separately, so a
/// purchase landing in between can make the two views disagree by one sale.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn TicketStore>,
}

fn revenue<'a>(tickets: impl Iterator<Item = &'a Ticket>) -> Decimal {
    tickets.map(|ticket| ticket.price).sum()
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    pub async fn event_stats(&self, event_id: &str) -> Result<StatsReport, TicketingError> {
        let ticket_types = self.store.ticket_types_for_event(event_id).await?;
        let tickets = self
            .store
            .tickets(&TicketQuery {
                event_id: Some(event_id.to_string()),
                user_id: None,
            })
            .await?;

        let stats_by_type: Vec<TicketTypeStats> = ticket_types
            .iter()
            .map(|ticket_type| {
                let of_type = || tickets.iter().filter(|t| t.ticket_type_id == ticket_type.id);
                TicketTypeStats {
                    type_id: ticket_type.id,
                    type_name: ticket_type.name.clone(),
                    total_quantity: ticket_type.total_quantity,
                    sold_quantity: ticket_type.sold_quantity,
                    revenue: revenue(of_type()),
                    used_tickets: of_type().filter(|t| t.is_used()).count(),
                }
            })
            .collect();

        Ok(StatsReport {
            total_tickets_sold: tickets.len(),
            total_revenue: revenue(tickets.iter()),
            used_tickets: tickets.iter().filter(|t| t.is_used()).count(),
            ticket_types: ticket_types.len(),
            stats_by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::models::{NewTicketType, TicketTypeChanges};
    use crate::services::{InventoryLedger, PurchaseOrder, RetryPolicy, TicketRegistry};
    use crate::store::MemoryTicketStore;

    fn person(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            email: String::new(),
        }
    }

    #[tokio::test]
    async fn test_event_stats_use_sale_prices() {
        let store: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());
        let registry = TicketRegistry::new(store.clone(), RetryPolicy::default());
        let ledger = InventoryLedger::new(store.clone(), registry.clone(), RetryPolicy::default());
        let stats = StatsAggregator::new(store.clone());

        let general = ledger
            .create_ticket_type(
                NewTicketType {
                    event_id: "evt-9".to_string(),
                    name: "General".to_string(),
                    description: None,
                    price: Decimal::new(1000, 2),
                    total_quantity: 100,
                },
                "organizer",
            )
            .await
            .unwrap();
        let vip = ledger
            .create_ticket_type(
                NewTicketType {
                    event_id: "evt-9".to_string(),
                    name: "VIP".to_string(),
                    description: None,
                    price: Decimal::new(5000, 2),
                    total_quantity: 10,
                },
                "organizer",
            )
            .await
            .unwrap();

        let buy = |ticket_type_id, user: &str| PurchaseOrder {
            ticket_type_id,
            event_id: "evt-9".to_string(),
            event_title: "Conf".to_string(),
            buyer: person(user),
        };

        let first = ledger.purchase(&buy(general.id, "a")).await.unwrap();
        ledger
            .update_ticket_type(
                general.id,
                TicketTypeChanges {
                    name: "General".to_string(),
                    description: None,
                    price: Decimal::new(1200, 2),
                    total_quantity: 100,
                    is_active: None,
                },
            )
            .await
            .unwrap();
        ledger.purchase(&buy(general.id, "b")).await.unwrap();
        ledger.purchase(&buy(vip.id, "c")).await.unwrap();
        registry
            .validate(&first.redemption_code, &person("door"))
            .await
            .unwrap();

        let report = stats.event_stats("evt-9").await.unwrap();
        assert_eq!(report.total_tickets_sold, 3);
        assert_eq!(report.total_revenue, Decimal::new(7200, 2));
        assert_eq!(report.used_tickets, 1);
        assert_eq!(report.ticket_types, 2);

        let general_stats = report
            .stats_by_type
            .iter()
            .find(|s| s.type_id == general.id)
            .unwrap();
        assert_eq!(general_stats.sold_quantity, 2);
        assert_eq!(general_stats.revenue, Decimal::new(2200, 2));
        assert_eq!(general_stats.used_tickets, 1);

        let vip_stats = report.stats_by_type.iter().find(|s| s.type_id == vip.id).unwrap();
        assert_eq!(vip_stats.revenue, Decimal::new(5000, 2));
        assert_eq!(vip_stats.used_tickets, 0);
    }

    #[tokio::test]
    async fn test_empty_event() {
        let stats = StatsAggregator::new(Arc::new(MemoryTicketStore::new()));
        let report = stats.event_stats("nothing").await.unwrap();
        assert_eq!(report.total_tickets_sold, 0);
        assert_eq!(report.total_revenue, Decimal::ZERO);
        assert!(report.stats_by_type.is_empty());
    }
}
