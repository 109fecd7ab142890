//! # Product Repository (Inventory Ledger)
//!
//! Catalog reads/writes plus the atomic stock primitives. This module is
//! the single source of truth for stock levels.
//!
//! ## The No-Oversell Guarantee
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Conditional Debit Strategy                          │
//! │                                                                     │
//! │  ❌ WRONG: read-then-write (races under concurrent sales)          │
//! │     SELECT current_stock ... ; if enough: UPDATE ...                │
//! │                                                                     │
//! │  ✅ CORRECT: single conditional update                              │
//! │     UPDATE products SET current_stock = current_stock - ?qty        │
//! │     WHERE id = ? AND is_active = 1 AND current_stock >= ?qty        │
//! │                                                                     │
//! │  Two terminals selling the last units of the same product race      │
//! │  on this one statement; SQLite serializes it, exactly one wins.     │
//! │  No application-level locks needed.                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use balcao_core::Product;

/// Outcome of a conditional stock debit.
///
/// Distinguishing the reasons a debit did not apply lets the engine map
/// them to its `InsufficientStock` / `NotFound` taxonomy with detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDebit {
    /// Stock was decremented by exactly the requested quantity.
    Applied,
    /// Product exists and is active, but holds fewer units than requested.
    Insufficient { available: i64 },
    /// Product is unknown or soft-deleted.
    NotFound,
}

const PRODUCT_COLUMNS: &str = "id, name, description, barcode, category, \
     cost_price_cents, sale_price_cents, current_stock, minimum_stock, \
     is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Stock primitives (transaction-aware)
    // =========================================================================

    /// Atomically debits stock if and only if enough is available.
    ///
    /// Takes a connection rather than the pool so the engine can stack
    /// several debits (plus the sale insert) inside one transaction.
    /// The check-and-decrement is a single statement; there is no window
    /// for a concurrent sale to oversell.
    pub async fn reserve_and_debit(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<StockDebit> {
        debug!(product_id = %product_id, quantity = %quantity, "Debiting stock");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                current_stock = current_stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND current_stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(StockDebit::Applied);
        }

        // Nothing changed; find out why so the caller can report it.
        let row: Option<(i64, bool)> =
            sqlx::query_as("SELECT current_stock, is_active FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        match row {
            Some((available, true)) => Ok(StockDebit::Insufficient { available }),
            _ => Ok(StockDebit::NotFound),
        }
    }

    /// Unconditionally credits stock back (cancellation, restock).
    /// No upper bound: returns are always accepted.
    pub async fn credit(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity = %quantity, "Crediting stock");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    // =========================================================================
    // Catalog reads
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 ORDER BY name LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products at or below their low-stock threshold,
    /// lowest stock first. Feeds the low-stock dashboard card.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND current_stock <= minimum_stock \
             ORDER BY current_stock"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Catalog writes
    // =========================================================================

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, barcode, category,
                cost_price_cents, sale_price_cents,
                current_stock, minimum_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(&product.category)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.current_stock)
        .bind(product.minimum_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates catalog metadata and prices.
    ///
    /// Deliberately does NOT touch `current_stock`: stock moves only
    /// through `reserve_and_debit` / `credit`.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                barcode = ?4,
                category = ?5,
                cost_price_cents = ?6,
                sale_price_cents = ?7,
                minimum_stock = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(&product.category)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.minimum_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product.
    ///
    /// ## Why Soft Delete?
    /// Historical sale lines keep referencing the product; deleting the
    /// row would break that referential integrity.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
