//! In-process store.
//!
//! A transaction owns the single state mutex from `begin` until it is committed
//! or dropped, so transactions are fully serialized. Writes are staged on the
//! transaction and only applied on commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{StoreError, StoreTransaction, TicketStore};
use crate::models::{Ticket, TicketQuery, TicketType};

#[derive(Debug, Default)]
struct MemoryState {
    ticket_types: HashMap<Uuid, TicketType>,
    tickets: HashMap<Uuid, Ticket>,
    codes: HashMap<String, Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    state: Arc<Mutex<MemoryState>>,
    injected_conflicts: Arc<AtomicUsize>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits abort with a retryable conflict.
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Committed state of one ticket type, read outside any transaction.
    pub async fn ticket_type(&self, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        Ok(self.state.lock().await.ticket_types.get(&id).cloned())
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            store: self.clone(),
            ticket_types: HashMap::new(),
            tickets: HashMap::new(),
        }))
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .ticket_types
            .insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn ticket_types_for_event(&self, event_id: &str) -> Result<Vec<TicketType>, StoreError> {
        let state = self.state.lock().await;
        let mut types: Vec<TicketType> = state
            .ticket_types
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        types.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(types)
    }

    async fn tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, StoreError> {
        let state = self.state.lock().await;
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
        Ok(tickets)
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    store: MemoryTicketStore,
    // `None` marks a staged delete.
    ticket_types: HashMap<Uuid, Option<TicketType>>,
    tickets: HashMap<Uuid, Ticket>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_ticket_type(&mut self, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        if let Some(staged) = self.ticket_types.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.guard.ticket_types.get(&id).cloned())
    }

    async fn save_ticket_type(&mut self, ticket_type: &TicketType) -> Result<(), StoreError> {
        self.ticket_types
            .insert(ticket_type.id, Some(ticket_type.clone()));
        Ok(())
    }

    async fn delete_ticket_type(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.ticket_types.insert(id, None);
        Ok(())
    }

    async fn lock_ticket_by_code(&mut self, code: &str) -> Result<Option<Ticket>, StoreError> {
        if let Some(staged) = self.tickets.values().find(|t| t.redemption_code == code) {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .guard
            .codes
            .get(code)
            .and_then(|id| self.guard.tickets.get(id))
            .cloned())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut guard,
            store,
            ticket_types,
            tickets,
        } = *self;

        if store.take_injected_conflict() {
            return Err(StoreError::Conflict("injected conflict".to_string()));
        }

        for ticket in tickets.values() {
            if let Some(owner) = guard.codes.get(&ticket.redemption_code) {
                if *owner != ticket.id {
                    return Err(StoreError::Corrupt(format!(
                        "duplicate redemption code for ticket {}",
                        ticket.id
                    )));
                }
            }
        }

        for (id, staged) in ticket_types {
            match staged {
                Some(ticket_type) => {
                    guard.ticket_types.insert(id, ticket_type);
                }
                None => {
                    guard.ticket_types.remove(&id);
                }
            }
        }
        for (id, ticket) in tickets {
            guard.codes.insert(ticket.redemption_code.clone(), id);
            guard.tickets.insert(id, ticket);
        }
        Ok(())
    }
}
