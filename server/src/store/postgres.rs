//! PostgreSQL store.
//!
//! Transactions run at READ COMMITTED and take row locks with `SELECT ... FOR UPDATE`.
//! A second purchaser of the same ticket type blocks on the lock and then reads the
//! committed `sold_quantity`, so capacity checks never act on a stale row.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{StoreError, StoreTransaction, TicketStore};
use crate::models::{Ticket, TicketQuery, TicketStatus, TicketType};

#[derive(Debug, Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_type_id: Uuid,
    ticket_type_name: String,
    event_id: String,
    event_title: String,
    user_id: String,
    user_name: String,
    user_email: String,
    price: Decimal,
    redemption_code: String,
    status: String,
    purchase_date: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    validated_by: Option<String>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status: TicketStatus = row.status.parse().map_err(StoreError::Corrupt)?;
        Ok(Ticket {
            id: row.id,
            ticket_type_id: row.ticket_type_id,
            ticket_type_name: row.ticket_type_name,
            event_id: row.event_id,
            event_title: row.event_title,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            price: row.price,
            redemption_code: row.redemption_code,
            status,
            purchase_date: row.purchase_date,
            used_at: row.used_at,
            validated_by: row.validated_by,
        })
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_types
                (id, event_id, name, description, price, total_quantity, sold_quantity,
                 is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ticket_type.id)
        .bind(&ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.total_quantity)
        .bind(ticket_type.sold_quantity)
        .bind(ticket_type.is_active)
        .bind(&ticket_type.created_by)
        .bind(ticket_type.created_at)
        .bind(ticket_type.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ticket_types_for_event(&self, event_id: &str) -> Result<Vec<TicketType>, StoreError> {
        let types = sqlx::query_as::<_, TicketType>(
            r#"
            SELECT id, event_id, name, description, price, total_quantity, sold_quantity,
                   is_active, created_by, created_at, updated_at
            FROM ticket_types
            WHERE event_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    async fn tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, ticket_type_id, ticket_type_name, event_id, event_title, user_id,
                   user_name, user_email, price, redemption_code, status, purchase_date,
                   used_at, validated_by
            FROM tickets
            WHERE ($1::text IS NULL OR event_id = $1)
              AND ($2::text IS NULL OR user_id = $2)
            ORDER BY purchase_date DESC
            "#,
        )
        .bind(query.event_id.as_deref())
        .bind(query.user_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Ticket::try_from).collect()
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_ticket_type(&mut self, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        let ticket_type = sqlx::query_as::<_, TicketType>(
            r#"
            SELECT id, event_id, name, description, price, total_quantity, sold_quantity,
                   is_active, created_by, created_at, updated_at
            FROM ticket_types
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket_type)
    }

    async fn save_ticket_type(&mut self, ticket_type: &TicketType) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE ticket_types
            SET name = $2,
                description = $3,
                price = $4,
                total_quantity = $5,
                sold_quantity = $6,
                is_active = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(ticket_type.id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.total_quantity)
        .bind(ticket_type.sold_quantity)
        .bind(ticket_type.is_active)
        .bind(ticket_type.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_ticket_type(&mut self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ticket_types WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn lock_ticket_by_code(&mut self, code: &str) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, ticket_type_id, ticket_type_name, event_id, event_title, user_id,
                   user_name, user_email, price, redemption_code, status, purchase_date,
                   used_at, validated_by
            FROM tickets
            WHERE redemption_code = $1
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tickets
                (id, ticket_type_id, ticket_type_name, event_id, event_title, user_id,
                 user_name, user_email, price, redemption_code, status, purchase_date,
                 used_at, validated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.ticket_type_id)
        .bind(&ticket.ticket_type_name)
        .bind(&ticket.event_id)
        .bind(&ticket.event_title)
        .bind(&ticket.user_id)
        .bind(&ticket.user_name)
        .bind(&ticket.user_email)
        .bind(ticket.price)
        .bind(&ticket.redemption_code)
        .bind(ticket.status.as_str())
        .bind(ticket.purchase_date)
        .bind(ticket.used_at)
        .bind(ticket.validated_by.as_deref())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2,
                used_at = $3,
                validated_by = $4
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.status.as_str())
        .bind(ticket.used_at)
        .bind(ticket.validated_by.as_deref())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
