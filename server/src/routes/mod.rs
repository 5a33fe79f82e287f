use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::health_check;
use crate::handlers::tickets::{
    available_tickets, create_ticket_type, delete_ticket_type, event_stats, list_ticket_types,
    list_tickets, purchase_ticket, sold_tickets, update_ticket_type, validate_ticket,
};
use crate::state::AppState;

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets))
        .route("/types", post(create_ticket_type).get(list_ticket_types))
        .route(
            "/types/:ticket_type_id",
            put(update_ticket_type).delete(delete_ticket_type),
        )
        .route("/purchase", post(purchase_ticket))
        .route("/sold", get(sold_tickets))
        .route("/validate", post(validate_ticket))
        .route("/available", get(available_tickets))
        .route("/stats", get(event_stats))
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/tickets", ticket_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
