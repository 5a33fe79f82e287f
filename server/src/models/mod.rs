pub mod stats;
pub mod ticket;
pub mod ticket_type;

pub use stats::{StatsReport, TicketTypeStats};
pub use ticket::{Ticket, TicketQuery, TicketStatus};
pub use ticket_type::{NewTicketType, TicketType, TicketTypeChanges, TicketTypeView};
