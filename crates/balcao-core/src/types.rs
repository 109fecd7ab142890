//! # Domain Types
//!
//! Core domain types used throughout Balcão.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │    Product    │   │     Sale      │   │   SaleLine    │         │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │         │
//! │  │  id (UUID)    │   │  id (UUID)    │   │  sale_id (FK) │         │
//! │  │  sale_price   │──►│  status       │──►│  quantity     │         │
//! │  │  stock        │   │  total_cents  │   │  unit_price   │         │
//! │  └───────────────┘   └───────────────┘   └───────────────┘         │
//! │                              │                                      │
//! │                              ▼ (bank slip only)                     │
//! │  ┌───────────────┐   ┌───────────────┐                              │
//! │  │    Payable    │   │  Receivable   │                              │
//! │  │  supplier FK  │   │  sale FK      │                              │
//! │  │  due_date     │   │  due_date     │                              │
//! │  └───────────────┘   └───────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sale lines freeze the product name and unit price at commit time, so a
//! sale's recorded values stay stable when the catalog changes later.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// `current_stock` is owned by the inventory ledger: the repository's
/// conditional debit/credit primitives are the only mutation path for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Free-form category label.
    pub category: Option<String>,

    /// Acquisition cost in cents (for margin reporting).
    pub cost_price_cents: i64,

    /// Sale price in cents.
    pub sale_price_cents: i64,

    /// Current stock level. Never negative.
    pub current_stock: i64,

    /// Threshold for low-stock alerting.
    pub minimum_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as a Money type.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Returns the cost price as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Whether the product is at or below its low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    /// Checks the catalog rules before a product is written: non-empty
    /// bounded name, non-negative prices.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_product_name(&self.name)?;
        validation::validate_price_cents(self.sale_price_cents)?;
        validation::validate_price_cents(self.cost_price_cents)?;
        Ok(())
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// The only transition after commit is `Finalized` → `Cancelled`,
/// performed by the engine's `cancel`. Never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is being assembled (never persisted by the engine).
    Open,
    /// Sale has been committed: stock debited, totals reconciled.
    Finalized,
    /// Sale was cancelled and its stock restored.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Open
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleStatus::Open => "open",
            SaleStatus::Finalized => "finalized",
            SaleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
///
/// `BankSlip` (boleto) defers actual cash receipt, so committing a sale
/// with it spawns a pending [`Receivable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    BankSlip,
}

impl PaymentMethod {
    /// Whether this method defers receipt and therefore creates a receivable.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, PaymentMethod::BankSlip)
    }

    /// Wire name, matching the serde/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Pix => "pix",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankSlip => "bank_slip",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "pix" => Ok(PaymentMethod::Pix),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "bank_slip" | "boleto" => Ok(PaymentMethod::BankSlip),
            other => Err(CoreError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed (or cancelled) sale transaction.
///
/// ## Invariants
/// - `total_cents = subtotal_cents - discount_cents`
/// - `subtotal_cents = Σ line.subtotal_cents`
/// - `user_id` is always present: every sale is attributable to an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Opaque reference into the customer directory.
    pub customer_id: Option<String>,
    /// Operator who rang the sale up. Required.
    pub user_id: String,
    pub sold_at: DateTime<Utc>,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    /// Cart-level discount, on top of per-line discounts.
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item in a sale. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time the line entered the cart (frozen).
    pub unit_price_cents: i64,
    /// Per-line discount.
    pub discount_cents: i64,
    /// quantity × unit_price − discount.
    pub subtotal_cents: i64,
}

impl SaleLine {
    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Settlement Status
// =============================================================================

/// Lifecycle state shared by receivables and payables.
///
/// `Overdue` exists as a stored value for manual bookkeeping, but nothing
/// in this system transitions to it automatically: overdue-ness is a
/// query-time concept (`is_overdue`), not a scheduled state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl Default for SettlementStatus {
    fn default() -> Self {
        SettlementStatus::Pending
    }
}

// =============================================================================
// Receivable
// =============================================================================

/// Money owed to the business by a customer.
///
/// Created automatically by the engine for bank-slip sales, or manually
/// through the finance ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receivable {
    pub id: String,
    pub customer_id: Option<String>,
    /// Originating sale, when auto-created by a bank-slip commit.
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    /// Settlement date, set by `settle`.
    pub settled_on: Option<NaiveDate>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl Receivable {
    /// Query-time overdue check: past due and still pending.
    #[inline]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == SettlementStatus::Pending && self.due_date < today
    }

    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Payable
// =============================================================================

/// Money owed by the business to a supplier or for an expense.
/// Entirely manual lifecycle; stored here so financial-health reporting
/// can read both sides of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payable {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    /// Opaque reference into the supplier directory.
    pub supplier_id: Option<String>,
    /// Free-form expense category.
    pub category: Option<String>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl Payable {
    /// Query-time overdue check: past due and still pending.
    #[inline]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == SettlementStatus::Pending && self.due_date < today
    }

    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
