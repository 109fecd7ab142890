//! # Sale Transaction Engine
//!
//! Turns an accumulated cart into durable records: stock debits, a sale
//! header with its lines, and (for deferred payment) a pending
//! receivable.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Commit Pipeline                              │
//! │                                                                     │
//! │  CommitSale request                                                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  1. Validate       operator present? cart non-empty?                │
//! │  2. Price          subtotal = Σ line subtotals                      │
//! │                    total    = subtotal − sale discount              │
//! │  3. BEGIN ───────────────────────────────────────────┐              │
//! │  4. Debit stock    conditional UPDATE per line;      │ one          │
//! │                    any failure aborts everything     │ SQLite       │
//! │  5. Insert sale    header (finalized) + lines        │ transaction  │
//! │  6. Receivable     only when payment is deferred     │              │
//! │  7. COMMIT ──────────────────────────────────────────┘              │
//! │                                                                     │
//! │  Steps 4-6 share one transaction, so a failed debit on line N       │
//! │  leaves lines 1..N-1 untouched and writes no sale at all.           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancel runs the mirror image: credit every line's stock back and flip
//! the header to cancelled, again in one transaction. A receivable
//! created by the sale is left in place for the finance ledger to
//! resolve by hand.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use balcao_core::{
    validation, CartLine, PaymentMethod, Receivable, Sale, SaleLine, SaleStatus, SettlementStatus,
    DEFAULT_RECEIVABLE_TERM_DAYS,
};
use balcao_db::repository::finance::generate_finance_id;
use balcao_db::repository::sale::{generate_sale_id, generate_sale_line_id};
use balcao_db::{Database, FinanceRepository, ProductRepository, SaleRepository, StockDebit};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Request Types
// =============================================================================

/// A commit request: the cart's frozen lines plus sale-level fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSale {
    /// Optional customer reference.
    pub customer_id: Option<String>,

    /// Operator performing the sale. Required.
    pub operator_id: Option<String>,

    /// Cart lines with their price and name snapshots.
    pub lines: Vec<CartLine>,

    /// How the customer pays.
    pub payment_method: PaymentMethod,

    /// Sale-level discount in cents, applied after line discounts.
    pub discount_cents: i64,

    /// Free-form note on the sale.
    pub notes: Option<String>,

    /// Due date for the receivable when payment is deferred. Defaults
    /// to today plus [`DEFAULT_RECEIVABLE_TERM_DAYS`].
    pub due_date: Option<NaiveDate>,
}

/// Parses a payment method from its wire form (`"cash"`, `"pix"`,
/// `"bank_slip"`, ...).
pub fn parse_payment(value: &str) -> EngineResult<PaymentMethod> {
    PaymentMethod::from_str(value)
        .map_err(|_| EngineError::InvalidPaymentMethod(value.to_string()))
}

// =============================================================================
// Sale Engine
// =============================================================================

/// The sale transaction engine. Cheap to clone; all state lives in the
/// database.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    db: Database,
}

impl SaleEngine {
    /// Creates an engine over an open database.
    pub fn new(db: Database) -> Self {
        SaleEngine { db }
    }

    /// Commits a sale atomically.
    ///
    /// Debits stock for every line, writes the finalized sale header and
    /// its lines, and creates a pending receivable when the payment
    /// method is deferred. All of it lands in one transaction: if any
    /// line's stock debit fails, nothing is written.
    ///
    /// ## Errors
    /// - [`EngineError::Unauthorized`] when no operator is set
    /// - [`EngineError::EmptyCart`] when there are no lines
    /// - [`EngineError::InvalidLine`] when a line's quantity, price, or
    ///   discount violates the data model
    /// - [`EngineError::InsufficientStock`] when a debit would oversell
    /// - [`EngineError::NotFound`] when a line references a product that
    ///   does not exist or is inactive
    pub async fn commit(&self, request: CommitSale) -> EngineResult<Sale> {
        let operator = match request.operator_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => return Err(EngineError::Unauthorized),
        };
        if request.lines.is_empty() {
            return Err(EngineError::EmptyCart);
        }

        // The lines arrive over the wire; re-check the data model here
        // rather than trusting the cart to have run. A negative quantity
        // would sail through the conditional debit and mint stock.
        for line in &request.lines {
            validation::validate_quantity(line.quantity)
                .and_then(|()| validation::validate_price_cents(line.unit_price_cents))
                .and_then(|()| validation::validate_discount_cents(line.discount_cents))
                .map_err(|source| EngineError::InvalidLine {
                    product_id: line.product_id.clone(),
                    source,
                })?;
        }

        let subtotal: i64 = request.lines.iter().map(|l| l.subtotal_cents()).sum();
        // Not clamped at zero; an over-discounted sale records a
        // negative total rather than silently altering it.
        let total = subtotal - request.discount_cents;

        let now = Utc::now();
        let sale_id = generate_sale_id();

        debug!(
            sale_id = %sale_id,
            lines = request.lines.len(),
            subtotal,
            total,
            payment = %request.payment_method,
            "Committing sale"
        );

        let mut tx = self.db.pool().begin().await.map_err(balcao_db::DbError::from)?;

        // Debit stock in cart order. The conditional UPDATE is the only
        // oversell guard; a failure here aborts the transaction and
        // every earlier debit unwinds with it.
        for line in &request.lines {
            match ProductRepository::reserve_and_debit(&mut tx, &line.product_id, line.quantity)
                .await?
            {
                StockDebit::Applied => {}
                StockDebit::Insufficient { available } => {
                    return Err(EngineError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        requested: line.quantity,
                        available,
                    });
                }
                StockDebit::NotFound => {
                    return Err(EngineError::NotFound {
                        entity: "Product",
                        id: line.product_id.clone(),
                    });
                }
            }
        }

        let sale = Sale {
            id: sale_id.clone(),
            customer_id: request.customer_id.clone(),
            user_id: operator,
            sold_at: now,
            status: SaleStatus::Finalized,
            subtotal_cents: subtotal,
            discount_cents: request.discount_cents,
            total_cents: total,
            payment_method: request.payment_method,
            notes: request.notes,
            created_at: now,
        };
        SaleRepository::insert_sale(&mut tx, &sale).await?;

        for line in &request.lines {
            let sale_line = SaleLine {
                id: generate_sale_line_id(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                discount_cents: line.discount_cents,
                subtotal_cents: line.subtotal_cents(),
            };
            SaleRepository::insert_line(&mut tx, &sale_line).await?;
        }

        if request.payment_method.is_deferred() {
            let due_date = request.due_date.unwrap_or_else(|| {
                now.date_naive() + Duration::days(DEFAULT_RECEIVABLE_TERM_DAYS)
            });
            let receivable = Receivable {
                id: generate_finance_id(),
                customer_id: request.customer_id,
                sale_id: Some(sale_id.clone()),
                amount_cents: total,
                due_date,
                settled_on: None,
                status: SettlementStatus::Pending,
                created_at: now,
            };
            FinanceRepository::insert_receivable(&mut tx, &receivable).await?;
        }

        tx.commit().await.map_err(balcao_db::DbError::from)?;

        info!(
            sale_id = %sale.id,
            total = sale.total_cents,
            payment = %sale.payment_method,
            "Sale committed"
        );
        Ok(sale)
    }

    /// Cancels a finalized sale, restocking every line.
    ///
    /// Credits stock back unconditionally (a cancel may legitimately push
    /// stock above where it ever was, if the product was restocked in
    /// between) and flips the header to cancelled, in one transaction.
    /// Only finalized sales can be cancelled; a second cancel fails with
    /// [`EngineError::InvalidStateTransition`].
    pub async fn cancel(&self, sale_id: &str) -> EngineResult<Sale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Sale",
                id: sale_id.to_string(),
            })?;

        if sale.status != SaleStatus::Finalized {
            return Err(EngineError::InvalidStateTransition {
                sale_id: sale_id.to_string(),
                status: sale.status,
            });
        }

        let mut tx = self.db.pool().begin().await.map_err(balcao_db::DbError::from)?;

        let lines = SaleRepository::lines_for_update(&mut tx, sale_id).await?;
        for line in &lines {
            ProductRepository::credit(&mut tx, &line.product_id, line.quantity).await?;
        }

        // The status guard re-checks inside the transaction, so two
        // racing cancels cannot both restock.
        if !SaleRepository::mark_cancelled(&mut tx, sale_id).await? {
            return Err(EngineError::InvalidStateTransition {
                sale_id: sale_id.to_string(),
                status: sale.status,
            });
        }

        tx.commit().await.map_err(balcao_db::DbError::from)?;

        info!(sale_id = %sale_id, lines = lines.len(), "Sale cancelled, stock restored");

        Ok(Sale {
            status: SaleStatus::Cancelled,
            ..sale
        })
    }

    /// Fetches a sale with its lines.
    pub async fn get_sale(&self, sale_id: &str) -> EngineResult<(Sale, Vec<SaleLine>)> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Sale",
                id: sale_id.to_string(),
            })?;
        let lines = self.db.sales().get_lines(sale_id).await?;
        Ok((sale, lines))
    }

    /// Lists sales, newest first.
    pub async fn list_sales(&self, limit: i64, offset: i64) -> EngineResult<Vec<Sale>> {
        Ok(self.db.sales().list(limit, offset).await?)
    }

    /// The underlying database, for callers that need direct repository
    /// access (finance ledger, catalog).
    pub fn db(&self) -> &Database {
        &self.db
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_core::{Cart, Product};
    use balcao_db::{DbConfig, DbError};

    async fn test_engine() -> SaleEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        SaleEngine::new(db)
    }

    async fn seed_product(engine: &SaleEngine, id: &str, name: &str, price: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            barcode: None,
            category: None,
            cost_price_cents: price / 2,
            sale_price_cents: price,
            current_stock: stock,
            minimum_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        engine.db().products().insert(&product).await.unwrap();
        product
    }

    async fn stock_of(engine: &SaleEngine, id: &str) -> i64 {
        engine
            .db()
            .products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .current_stock
    }

    fn request(lines: Vec<CartLine>, payment: PaymentMethod, discount: i64) -> CommitSale {
        CommitSale {
            customer_id: None,
            operator_id: Some("operator-1".to_string()),
            lines,
            payment_method: payment,
            discount_cents: discount,
            notes: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_commit_cash_sale() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Café Torrado 500g", 1_690, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 3).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Cash, 0))
            .await
            .unwrap();

        assert_eq!(sale.status, SaleStatus::Finalized);
        assert_eq!(sale.subtotal_cents, 5_070);
        assert_eq!(sale.total_cents, 5_070);
        assert_eq!(stock_of(&engine, "p1").await, 7);

        let (stored, lines) = engine.get_sale(&sale.id).await.unwrap();
        assert_eq!(stored.payment_method, PaymentMethod::Cash);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name_snapshot, "Café Torrado 500g");
        assert_eq!(lines[0].quantity, 3);

        // cash sales create no receivable
        let receivables = engine.db().finance().list_receivables(10, 0).await.unwrap();
        assert!(receivables.is_empty());
    }

    #[tokio::test]
    async fn test_commit_totals_with_line_and_sale_discounts() {
        let engine = test_engine().await;
        let a = seed_product(&engine, "a", "Item A", 2_500, 10).await;
        let b = seed_product(&engine, "b", "Item B", 2_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&a, 3).unwrap(); // 7_500
        cart.add_item(&b, 2).unwrap(); // 4_000
        cart.set_line_discount("a", 500).unwrap(); // line a → 7_000
        cart.set_discount(1_000).unwrap();

        let discount = cart.discount_cents();
        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Pix, discount))
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 10_500);
        assert_eq!(sale.discount_cents, 1_000);
        assert_eq!(sale.total_cents, 9_500);

        let (_, lines) = engine.get_sale(&sale.id).await.unwrap();
        let line_sum: i64 = lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(line_sum, sale.subtotal_cents);
    }

    #[tokio::test]
    async fn test_pix_sale_decrements_stock_without_receivable() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Produto", 5_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 3).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Pix, 0))
            .await
            .unwrap();

        assert_eq!(sale.total_cents, 15_000);
        assert_eq!(stock_of(&engine, "p1").await, 7);
        assert!(engine
            .db()
            .finance()
            .list_receivables(10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_bank_slip_receivable_covers_discounted_total() {
        let engine = test_engine().await;
        let a = seed_product(&engine, "a", "Item A", 5_000, 10).await;
        let b = seed_product(&engine, "b", "Item B", 2_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&a, 2).unwrap(); // 10_000
        cart.add_item(&b, 1).unwrap(); //  2_000
        cart.set_line_discount("a", 500).unwrap();
        cart.set_discount(1_000).unwrap();

        let discount = cart.discount_cents();
        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::BankSlip, discount))
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 11_500);
        assert_eq!(sale.total_cents, 10_500);

        let receivables = engine.db().finance().list_receivables(10, 0).await.unwrap();
        assert_eq!(receivables.len(), 1);
        assert_eq!(receivables[0].amount_cents, 10_500);
        assert_eq!(receivables[0].sale_id.as_deref(), Some(sale.id.as_str()));
    }

    #[tokio::test]
    async fn test_commit_allows_negative_total() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 500, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 1).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Cash, 800))
            .await
            .unwrap();

        assert_eq!(sale.total_cents, -300);
    }

    #[tokio::test]
    async fn test_commit_rejects_empty_cart() {
        let engine = test_engine().await;
        let err = engine
            .commit(request(vec![], PaymentMethod::Cash, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCart));
    }

    #[tokio::test]
    async fn test_commit_requires_operator() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 500, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 1).unwrap();

        let mut req = request(cart.into_lines(), PaymentMethod::Cash, 0);
        req.operator_id = None;
        assert!(matches!(
            engine.commit(req.clone()).await.unwrap_err(),
            EngineError::Unauthorized
        ));

        req.operator_id = Some("   ".to_string());
        assert!(matches!(
            engine.commit(req).await.unwrap_err(),
            EngineError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn test_failed_debit_rolls_back_everything() {
        let engine = test_engine().await;
        let plenty = seed_product(&engine, "plenty", "Plenty", 1_000, 50).await;
        let scarce = seed_product(&engine, "scarce", "Scarce", 1_000, 2).await;

        // Build lines by hand with a stale stock snapshot so the cart's
        // advisory check passes and the database has the final word.
        let now = Utc::now();
        let lines = vec![
            CartLine {
                product_id: plenty.id.clone(),
                name: plenty.name.clone(),
                unit_price_cents: plenty.sale_price_cents,
                stock_snapshot: 50,
                quantity: 5,
                discount_cents: 0,
                added_at: now,
            },
            CartLine {
                product_id: scarce.id.clone(),
                name: scarce.name.clone(),
                unit_price_cents: scarce.sale_price_cents,
                stock_snapshot: 10,
                quantity: 5,
                discount_cents: 0,
                added_at: now,
            },
        ];

        let err = engine
            .commit(request(lines, PaymentMethod::Cash, 0))
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, "scarce");
                assert_eq!(requested, 5);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // first line's debit was rolled back, nothing was written
        assert_eq!(stock_of(&engine, "plenty").await, 50);
        assert_eq!(stock_of(&engine, "scarce").await, 2);
        assert_eq!(engine.db().sales().count().await.unwrap(), 0);
    }

    fn raw_line(product_id: &str, quantity: i64, price: i64, discount: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            name: "Item".to_string(),
            unit_price_cents: price,
            stock_snapshot: 100,
            quantity,
            discount_cents: discount,
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_negative_quantity_line_rejected_without_minting_stock() {
        let engine = test_engine().await;
        seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let err = engine
            .commit(request(vec![raw_line("p1", -5, 1_000, 0)], PaymentMethod::Cash, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidLine { .. }));
        // a negative debit would have credited stock to 15
        assert_eq!(stock_of(&engine, "p1").await, 10);
        assert_eq!(engine.db().sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_line_rejected() {
        let engine = test_engine().await;
        seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let err = engine
            .commit(request(vec![raw_line("p1", 0, 1_000, 0)], PaymentMethod::Cash, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLine { .. }));
        assert_eq!(stock_of(&engine, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_oversized_quantity_line_rejected() {
        let engine = test_engine().await;
        seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let err = engine
            .commit(request(
                vec![raw_line("p1", balcao_core::MAX_LINE_QUANTITY + 1, 1_000, 0)],
                PaymentMethod::Cash,
                0,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLine { .. }));
    }

    #[tokio::test]
    async fn test_negative_line_discount_rejected() {
        let engine = test_engine().await;
        seed_product(&engine, "p1", "Item", 1_000, 10).await;

        // a negative line discount would inflate the subtotal
        let err = engine
            .commit(request(
                vec![raw_line("p1", 1, 1_000, -10_000)],
                PaymentMethod::Cash,
                0,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLine { .. }));
        assert_eq!(engine.db().sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_unit_price_rejected() {
        let engine = test_engine().await;
        seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let err = engine
            .commit(request(vec![raw_line("p1", 1, -500, 0)], PaymentMethod::Cash, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLine { .. }));
    }

    #[tokio::test]
    async fn test_commit_unknown_product() {
        let engine = test_engine().await;

        let lines = vec![CartLine {
            product_id: "ghost".to_string(),
            name: "Ghost".to_string(),
            unit_price_cents: 100,
            stock_snapshot: 10,
            quantity: 1,
            discount_cents: 0,
            added_at: Utc::now(),
        }];

        let err = engine
            .commit(request(lines, PaymentMethod::Cash, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Product", .. }));
    }

    #[tokio::test]
    async fn test_bank_slip_creates_receivable() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 4_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 2).unwrap();

        let mut req = request(cart.into_lines(), PaymentMethod::BankSlip, 500);
        req.customer_id = Some("customer-9".to_string());
        let sale = engine.commit(req).await.unwrap();

        let receivables = engine.db().finance().list_receivables(10, 0).await.unwrap();
        assert_eq!(receivables.len(), 1);
        let r = &receivables[0];
        assert_eq!(r.sale_id.as_deref(), Some(sale.id.as_str()));
        assert_eq!(r.customer_id.as_deref(), Some("customer-9"));
        assert_eq!(r.amount_cents, 7_500);
        assert_eq!(r.status, SettlementStatus::Pending);
        assert_eq!(
            r.due_date,
            Utc::now().date_naive() + Duration::days(DEFAULT_RECEIVABLE_TERM_DAYS)
        );
    }

    #[tokio::test]
    async fn test_bank_slip_honors_explicit_due_date() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 1).unwrap();

        let due = NaiveDate::from_ymd_opt(2026, 12, 24).unwrap();
        let mut req = request(cart.into_lines(), PaymentMethod::BankSlip, 0);
        req.due_date = Some(due);
        engine.commit(req).await.unwrap();

        let receivables = engine.db().finance().list_receivables(10, 0).await.unwrap();
        assert_eq!(receivables[0].due_date, due);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let engine = test_engine().await;
        let a = seed_product(&engine, "a", "Item A", 1_000, 10).await;
        let b = seed_product(&engine, "b", "Item B", 2_000, 8).await;

        let mut cart = Cart::new();
        cart.add_item(&a, 4).unwrap();
        cart.add_item(&b, 2).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Cash, 0))
            .await
            .unwrap();
        assert_eq!(stock_of(&engine, "a").await, 6);
        assert_eq!(stock_of(&engine, "b").await, 6);

        let cancelled = engine.cancel(&sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(stock_of(&engine, "a").await, 10);
        assert_eq!(stock_of(&engine, "b").await, 8);

        // lines survive for history
        let (stored, lines) = engine.get_sale(&sale.id).await.unwrap();
        assert_eq!(stored.status, SaleStatus::Cancelled);
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_twice_fails_without_double_restock() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 1_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 3).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::Cash, 0))
            .await
            .unwrap();
        engine.cancel(&sale.id).await.unwrap();

        let err = engine.cancel(&sale.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidStateTransition {
                status: SaleStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(stock_of(&engine, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_cancel_unknown_sale() {
        let engine = test_engine().await;
        let err = engine.cancel("ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Sale", .. }));
    }

    #[tokio::test]
    async fn test_cancel_leaves_receivable_in_place() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 2_000, 10).await;

        let mut cart = Cart::new();
        cart.add_item(&product, 1).unwrap();

        let sale = engine
            .commit(request(cart.into_lines(), PaymentMethod::BankSlip, 0))
            .await
            .unwrap();
        engine.cancel(&sale.id).await.unwrap();

        // the receivable stays pending; the finance ledger resolves it
        let receivables = engine.db().finance().list_receivables(10, 0).await.unwrap();
        assert_eq!(receivables.len(), 1);
        assert_eq!(receivables[0].status, SettlementStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_commits_cannot_oversell() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 1_000, 9).await;

        let make_lines = || {
            vec![CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price_cents: product.sale_price_cents,
                stock_snapshot: 9,
                quantity: 5,
                discount_cents: 0,
                added_at: Utc::now(),
            }]
        };

        let e1 = engine.clone();
        let e2 = engine.clone();
        let r1 = make_lines();
        let r2 = make_lines();

        let (a, b) = tokio::join!(
            e1.commit(request(r1, PaymentMethod::Cash, 0)),
            e2.commit(request(r2, PaymentMethod::Cash, 0)),
        );

        // exactly one of the two 5-unit sales can fit in 9 units
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(stock_of(&engine, "p1").await, 4);
        assert_eq!(engine.db().sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sales() {
        let engine = test_engine().await;
        let product = seed_product(&engine, "p1", "Item", 1_000, 100).await;

        for _ in 0..3 {
            let mut cart = Cart::new();
            cart.add_item(&product, 1).unwrap();
            engine
                .commit(request(cart.into_lines(), PaymentMethod::Cash, 0))
                .await
                .unwrap();
        }

        let listed = engine.list_sales(2, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(engine.db().sales().count().await.unwrap(), 3);
    }

    #[test]
    fn test_parse_payment() {
        assert_eq!(parse_payment("pix").unwrap(), PaymentMethod::Pix);
        assert_eq!(parse_payment("bank_slip").unwrap(), PaymentMethod::BankSlip);
        assert!(matches!(
            parse_payment("barter").unwrap_err(),
            EngineError::InvalidPaymentMethod(_)
        ));
    }

    #[tokio::test]
    async fn test_db_error_passthrough() {
        let engine = test_engine().await;
        // duplicate product id surfaces as a Db error, not a panic
        seed_product(&engine, "p1", "Item", 1_000, 10).await;
        let dup = Product {
            id: "p1".to_string(),
            name: "Other".to_string(),
            description: None,
            barcode: None,
            category: None,
            cost_price_cents: 1,
            sale_price_cents: 2,
            current_stock: 0,
            minimum_stock: 5,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = engine.db().products().insert(&dup).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { .. } | DbError::QueryFailed { .. }
        ));
    }
}
