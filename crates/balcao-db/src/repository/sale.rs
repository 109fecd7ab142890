//! # Sale Repository
//!
//! Database operations for sale headers and lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                │
//! │                                                                     │
//! │  1. COMMIT (balcao-engine, one transaction)                         │
//! │     ├── insert_sale() → Sale { status: Finalized }                  │
//! │     └── insert_line() × N                                           │
//! │                                                                     │
//! │  2. (OPTIONAL) CANCEL                                               │
//! │     └── mark_cancelled() → Sale { status: Cancelled }               │
//! │         guarded by WHERE status = 'finalized'                       │
//! │                                                                     │
//! │  Lines are write-once; the status flip is the header's only         │
//! │  post-commit mutation.                                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use balcao_core::{Sale, SaleLine};

const SALE_COLUMNS: &str = "id, customer_id, user_id, sold_at, status, \
     subtotal_cents, discount_cents, total_cents, payment_method, notes, created_at";

const LINE_COLUMNS: &str = "id, sale_id, product_id, name_snapshot, \
     quantity, unit_price_cents, discount_cents, subtotal_cents";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Transaction-aware writes (used by the engine's commit/cancel)
    // =========================================================================

    /// Inserts a sale header.
    pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total = %sale.total_cents, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_id, user_id, sold_at, status,
                subtotal_cents, discount_cents, total_cents,
                payment_method, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(&sale.user_id)
        .bind(sale.sold_at)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one sale line.
    ///
    /// ## Snapshot Pattern
    /// The product name and unit price arrive already frozen from the
    /// cart; catalog changes after this point never affect the sale.
    pub async fn insert_line(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, name_snapshot,
                quantity, unit_price_cents, discount_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(&line.name_snapshot)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Flips a finalized sale to cancelled.
    ///
    /// Returns whether a row changed. The `WHERE status = 'finalized'`
    /// guard makes a second cancel (or a cancel racing another cancel)
    /// a no-op the engine reports as `InvalidStateTransition`.
    pub async fn mark_cancelled(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<bool> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let result =
            sqlx::query("UPDATE sales SET status = 'cancelled' WHERE id = ?1 AND status = 'finalized'")
                .bind(sale_id)
                .execute(&mut *conn)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Gets a sale's lines inside a transaction (used by cancel to know
    /// what to restock).
    pub async fn lines_for_update(
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all lines for a sale, in the order they were committed.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists sales, newest first. Feeds the sale-history view.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY sold_at DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale line ID.
pub fn generate_sale_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
