use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::models::{NewTicketType, Ticket, TicketTypeChanges, TicketTypeView};
use crate::services::{PurchaseOrder, TicketFilter};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct EventParams {
    pub event_id: Option<String>,
}

impl EventParams {
    fn require_event_id(self) -> Result<String, AppError> {
        self.event_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::ValidationError("event_id is required".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct TicketTypeParams {
    pub event_id: Option<String>,
    #[serde(default)]
    pub available_only: bool,
    #[serde(default)]
    pub organizer: bool,
}

#[derive(Debug, Deserialize)]
pub struct TicketListParams {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub organizer: bool,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub ticket_type_id: Uuid,
    pub event_id: String,
    pub event_title: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub redemption_code: String,
}

#[derive(Serialize)]
pub struct TicketTypeList {
    pub ticket_types: Vec<TicketTypeView>,
}

#[derive(Serialize)]
pub struct TicketList<T: Serialize> {
    pub tickets: Vec<T>,
}

#[derive(Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

pub async fn create_ticket_type(
    State(state): State<AppState>,
    caller: Identity,
    body: Result<Json<NewTicketType>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = body?;
    let ticket_type = state.ledger.create_ticket_type(new, &caller.user_id).await?;
    Ok(created(ticket_type, "Ticket type created"))
}

pub async fn list_ticket_types(
    State(state): State<AppState>,
    _caller: Identity,
    params: Result<Query<TicketTypeParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let event_id = EventParams {
        event_id: params.event_id,
    }
    .require_event_id()?;

    let ticket_types = state
        .ledger
        .list_ticket_types(&event_id, params.available_only, params.organizer)
        .await?;
    Ok(success(TicketTypeList { ticket_types }, "Ticket types retrieved"))
}

pub async fn update_ticket_type(
    State(state): State<AppState>,
    _caller: Identity,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TicketTypeChanges>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(ticket_type_id) = path?;
    let Json(changes) = body?;
    let ticket_type = state
        .ledger
        .update_ticket_type(ticket_type_id, changes)
        .await?;
    Ok(success(ticket_type, "Ticket type updated successfully"))
}

pub async fn delete_ticket_type(
    State(state): State<AppState>,
    _caller: Identity,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(ticket_type_id) = path?;
    state.ledger.delete_ticket_type(ticket_type_id).await?;
    Ok(success(Deleted { id: ticket_type_id }, "Ticket type deleted successfully"))
}

pub async fn purchase_ticket(
    State(state): State<AppState>,
    buyer: Identity,
    body: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body?;
    let order = PurchaseOrder {
        ticket_type_id: request.ticket_type_id,
        event_id: request.event_id,
        event_title: request.event_title,
        buyer,
    };
    let ticket = state.ledger.purchase(&order).await?;
    Ok(created(ticket, "Ticket purchased"))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    caller: Identity,
    params: Result<Query<TicketListParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let filter = TicketFilter {
        event_id: params.event_id,
        user_id: params.user_id.or(Some(caller.user_id)),
        organizer_view: params.organizer,
    };
    let tickets: Vec<Ticket> = state.registry.list(filter).await?;
    Ok(success(TicketList { tickets }, "Tickets retrieved"))
}

pub async fn sold_tickets(
    State(state): State<AppState>,
    _caller: Identity,
    params: Result<Query<EventParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let event_id = params.require_event_id()?;
    let tickets = state.registry.sold(&event_id).await?;
    Ok(success(TicketList { tickets }, "Sold tickets retrieved"))
}

pub async fn validate_ticket(
    State(state): State<AppState>,
    validator: Identity,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body?;
    let ticket = state
        .registry
        .validate(&request.redemption_code, &validator)
        .await?;
    Ok(success(ticket, "Ticket validated"))
}

pub async fn available_tickets(
    State(state): State<AppState>,
    _caller: Identity,
    params: Result<Query<EventParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let event_id = params.require_event_id()?;
    let tickets = state.ledger.get_available(&event_id).await?;
    Ok(success(TicketList { tickets }, "Available tickets retrieved"))
}

pub async fn event_stats(
    State(state): State<AppState>,
    _caller: Identity,
    params: Result<Query<EventParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let event_id = params.require_event_id()?;
    let report = state.stats.event_stats(&event_id).await?;
    Ok(success(report, "Event stats retrieved"))
}
