use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::services::{InventoryLedger, RetryPolicy, StatsAggregator, TicketRegistry};
use crate::store::TicketStore;

/// Shared handles passed to every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub ledger: InventoryLedger,
    pub registry: TicketRegistry,
    pub stats: StatsAggregator,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TicketStore>,
        identity: Arc<dyn IdentityProvider>,
        retry: RetryPolicy,
    ) -> Self {
        let registry = TicketRegistry::new(store.clone(), retry);
        Self {
            ledger: InventoryLedger::new(store.clone(), registry.clone(), retry),
            registry,
            stats: StatsAggregator::new(store),
            identity,
        }
    }
}
