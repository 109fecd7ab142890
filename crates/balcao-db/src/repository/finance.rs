//! # Finance Repository
//!
//! Database operations for receivables and payables.
//!
//! ## Settlement Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Both ledgers share one shape:                                      │
//! │                                                                     │
//! │    create           → status 'pending', no settlement date          │
//! │    settle(id, date) → status 'paid', settlement date recorded       │
//! │    delete(id)       → row removed outright                          │
//! │                                                                     │
//! │  "Overdue" is DERIVED at read time (pending + due_date < today);    │
//! │  the stored status stays 'pending' until someone settles it.        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use balcao_core::{Payable, Receivable};

const RECEIVABLE_COLUMNS: &str =
    "id, customer_id, sale_id, amount_cents, due_date, settled_on, status, created_at";

const PAYABLE_COLUMNS: &str =
    "id, description, amount_cents, due_date, paid_on, supplier_id, category, status, created_at";

/// Repository for receivable and payable database operations.
#[derive(Debug, Clone)]
pub struct FinanceRepository {
    pool: SqlitePool,
}

impl FinanceRepository {
    /// Creates a new FinanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FinanceRepository { pool }
    }

    // =========================================================================
    // Receivables
    // =========================================================================

    /// Inserts a receivable inside an open transaction.
    ///
    /// Used by the sale engine so the boleto receivable lands in the
    /// same transaction as its sale.
    pub async fn insert_receivable(
        conn: &mut SqliteConnection,
        receivable: &Receivable,
    ) -> DbResult<()> {
        debug!(
            id = %receivable.id,
            amount = receivable.amount_cents,
            due = %receivable.due_date,
            "Inserting receivable"
        );

        sqlx::query(
            r#"
            INSERT INTO receivables (
                id, customer_id, sale_id, amount_cents,
                due_date, settled_on, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&receivable.id)
        .bind(&receivable.customer_id)
        .bind(&receivable.sale_id)
        .bind(receivable.amount_cents)
        .bind(receivable.due_date)
        .bind(receivable.settled_on)
        .bind(receivable.status)
        .bind(receivable.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a standalone receivable (manual entry, no sale attached).
    pub async fn create_receivable(&self, receivable: &Receivable) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_receivable(&mut conn, receivable).await
    }

    /// Gets a receivable by ID.
    pub async fn get_receivable(&self, id: &str) -> DbResult<Option<Receivable>> {
        let row = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists receivables, soonest due first.
    pub async fn list_receivables(&self, limit: i64, offset: i64) -> DbResult<Vec<Receivable>> {
        let rows = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables ORDER BY due_date ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists receivables still pending with a due date before `today`.
    pub async fn list_overdue_receivables(&self, today: NaiveDate) -> DbResult<Vec<Receivable>> {
        let rows = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables \
             WHERE status = 'pending' AND due_date < ?1 ORDER BY due_date ASC"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Marks a receivable paid.
    ///
    /// `settled_on` defaults to today when the caller does not supply a
    /// date. Settling an already-paid row just refreshes the date, same
    /// as the original behavior.
    pub async fn settle_receivable(
        &self,
        id: &str,
        settled_on: Option<NaiveDate>,
    ) -> DbResult<()> {
        let date = settled_on.unwrap_or_else(|| Utc::now().date_naive());
        debug!(id = %id, date = %date, "Settling receivable");

        let result = sqlx::query(
            "UPDATE receivables SET status = 'paid', settled_on = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Receivable", id));
        }
        Ok(())
    }

    /// Deletes a receivable.
    pub async fn delete_receivable(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM receivables WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Receivable", id));
        }
        Ok(())
    }

    // =========================================================================
    // Payables
    // =========================================================================

    /// Inserts a payable.
    pub async fn create_payable(&self, payable: &Payable) -> DbResult<()> {
        debug!(
            id = %payable.id,
            amount = payable.amount_cents,
            due = %payable.due_date,
            "Inserting payable"
        );

        sqlx::query(
            r#"
            INSERT INTO payables (
                id, description, amount_cents, due_date,
                paid_on, supplier_id, category, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&payable.id)
        .bind(&payable.description)
        .bind(payable.amount_cents)
        .bind(payable.due_date)
        .bind(payable.paid_on)
        .bind(&payable.supplier_id)
        .bind(&payable.category)
        .bind(payable.status)
        .bind(payable.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a payable by ID.
    pub async fn get_payable(&self, id: &str) -> DbResult<Option<Payable>> {
        let row = sqlx::query_as::<_, Payable>(&format!(
            "SELECT {PAYABLE_COLUMNS} FROM payables WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists payables, soonest due first.
    pub async fn list_payables(&self, limit: i64, offset: i64) -> DbResult<Vec<Payable>> {
        let rows = sqlx::query_as::<_, Payable>(&format!(
            "SELECT {PAYABLE_COLUMNS} FROM payables ORDER BY due_date ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists payables still pending with a due date before `today`.
    pub async fn list_overdue_payables(&self, today: NaiveDate) -> DbResult<Vec<Payable>> {
        let rows = sqlx::query_as::<_, Payable>(&format!(
            "SELECT {PAYABLE_COLUMNS} FROM payables \
             WHERE status = 'pending' AND due_date < ?1 ORDER BY due_date ASC"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Marks a payable paid. `paid_on` defaults to today.
    pub async fn settle_payable(&self, id: &str, paid_on: Option<NaiveDate>) -> DbResult<()> {
        let date = paid_on.unwrap_or_else(|| Utc::now().date_naive());
        debug!(id = %id, date = %date, "Settling payable");

        let result = sqlx::query("UPDATE payables SET status = 'paid', paid_on = ?2 WHERE id = ?1")
            .bind(id)
            .bind(date)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payable", id));
        }
        Ok(())
    }

    /// Deletes a payable.
    pub async fn delete_payable(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payables WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payable", id));
        }
        Ok(())
    }
}

/// Generates a new finance-entry ID.
pub fn generate_finance_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
