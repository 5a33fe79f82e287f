//! Ticket inventory core: capacity-guarded sales, redemption, and reporting.

pub mod error;
pub mod inventory;
pub mod registry;
pub mod retry;
pub mod stats;

pub use error::TicketingError;
pub use inventory::{InventoryLedger, PurchaseOrder};
pub use registry::{TicketFilter, TicketRegistry};
pub use retry::RetryPolicy;
pub use stats::StatsAggregator;
