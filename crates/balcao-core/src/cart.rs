//! # Cart Accumulator
//!
//! The pre-commit working set of lines a caller is assembling. Pure,
//! in-memory, never persisted: only `commit` in balcao-engine turns a cart
//! into durable state.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Cart Accumulator                                 │
//! │                                                                     │
//! │  Caller Action            Operation              Cart Change        │
//! │  ─────────────            ─────────              ───────────        │
//! │                                                                     │
//! │  Pick product ──────────► add_item() ──────────► merge or push     │
//! │                                                                     │
//! │  +/- quantity ──────────► adjust_quantity() ───► qty += delta      │
//! │                                                  (≤ 0 removes)     │
//! │                                                                     │
//! │  Remove line ───────────► remove_item() ───────► line deleted      │
//! │                                                                     │
//! │  Apply discount ────────► set_discount() ──────► cart discount     │
//! │                                                                     │
//! │  Totals display ────────► subtotal/total ──────► (pure reads)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock checks are advisory
//! The cart rejects quantities above the stock snapshot taken when the
//! product was added, so the operator gets early feedback. The
//! authoritative check is the inventory ledger's atomic conditional debit
//! at commit time; a cart check passing guarantees nothing under
//! concurrent sales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product entry in the cart.
///
/// ## Price Freezing
/// `unit_price_cents` is captured the instant the product enters the cart
/// and is NOT re-read at commit time, so the sale's recorded prices stay
/// stable even if the catalog price changes in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Stock level at time of adding; ceiling for the advisory checks.
    pub stock_snapshot: i64,

    /// Quantity in cart. Always ≥ 1 while the line exists.
    pub quantity: i64,

    /// Per-line discount in cents, ≥ 0.
    pub discount_cents: i64,

    /// When this line was added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.sale_price_cents,
            stock_snapshot: product.current_stock,
            quantity,
            discount_cents: 0,
            added_at: Utc::now(),
        }
    }

    /// Line subtotal: quantity × unit price − line discount.
    #[inline]
    pub fn subtotal_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents - self.discount_cents
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Line quantity is ≥ 1 (adjusting to ≤ 0 removes the line)
/// - Insertion order is preserved; commit debits stock in this order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,

    /// Cart-level discount in cents, on top of per-line discounts.
    discount_cents: i64,

    /// When the cart was created/last cleared.
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount_cents: 0,
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart, merging into an existing line.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity increases
    /// - Product not in cart: new line with price and stock snapshots
    /// - Rejects (no-op) if the merged quantity would exceed the stock
    ///   snapshot: `InsufficientStock`
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validation::validate_quantity(quantity)?;
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id.clone()));
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            if new_qty > line.stock_snapshot {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    requested: new_qty,
                    available: line.stock_snapshot,
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }
        if quantity > product.current_stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                requested: quantity,
                available: product.current_stock,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Adjusts a line's quantity by a delta.
    ///
    /// ## Behavior
    /// - New quantity ≤ 0: the line is removed entirely
    /// - New quantity above the stock snapshot: rejected, line unchanged
    pub fn adjust_quantity(&mut self, product_id: &str, delta: i64) -> CoreResult<()> {
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return Err(CoreError::LineNotFound(product_id.to_string()));
        };

        let new_qty = line.quantity + delta;
        if new_qty <= 0 {
            self.lines.retain(|l| l.product_id != product_id);
            return Ok(());
        }
        if new_qty > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: new_qty,
                max: MAX_LINE_QUANTITY,
            });
        }
        if new_qty > line.stock_snapshot {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: new_qty,
                available: line.stock_snapshot,
            });
        }
        line.quantity = new_qty;
        Ok(())
    }

    /// Removes a line unconditionally.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Sets a per-line discount in cents.
    pub fn set_line_discount(&mut self, product_id: &str, discount_cents: i64) -> CoreResult<()> {
        validation::validate_discount_cents(discount_cents)?;
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return Err(CoreError::LineNotFound(product_id.to_string()));
        };
        line.discount_cents = discount_cents;
        Ok(())
    }

    /// Sets the cart-level discount in cents.
    ///
    /// Not clamped against the subtotal; a discount larger than the cart
    /// drives the total negative, matching the permissive source behavior.
    pub fn set_discount(&mut self, discount_cents: i64) -> CoreResult<()> {
        validation::validate_discount_cents(discount_cents)?;
        self.discount_cents = discount_cents;
        Ok(())
    }

    /// Clears all lines and the cart discount.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount_cents = 0;
        self.created_at = Utc::now();
    }

    /// The lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consumes the cart, yielding the lines for a commit request.
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Cart-level discount in cents.
    pub fn discount_cents(&self) -> i64 {
        self.discount_cents
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Subtotal: Σ(quantity × unit price − line discount). Recomputed on
    /// every read, never stored.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.subtotal_cents()).sum()
    }

    /// Total: subtotal − cart discount.
    pub fn total_cents(&self) -> i64 {
        self.subtotal_cents() - self.discount_cents
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: None,
            barcode: None,
            category: None,
            cost_price_cents: 0,
            sale_price_cents: price_cents,
            current_stock: stock,
            minimum_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal_cents(), 1998);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        cart.add_item(&product, 3).unwrap();

        assert_eq!(cart.line_count(), 1); // still one line
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_rejects_beyond_stock_snapshot() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 3);

        cart.add_item(&product, 2).unwrap();
        let err = cart.add_item(&product, 2).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        // rejected add is a no-op
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_add_inactive_product_rejected() {
        let mut cart = Cart::new();
        let mut product = test_product("1", 999, 10);
        product.is_active = false;

        assert!(matches!(
            cart.add_item(&product, 1),
            Err(CoreError::ProductInactive(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_adjust_quantity_to_zero_removes_line() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        cart.adjust_quantity("1", -2).unwrap();

        assert!(cart.is_empty());
    }

    #[test]
    fn test_adjust_quantity_rejects_beyond_stock() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 3);

        cart.add_item(&product, 3).unwrap();
        let err = cart.adjust_quantity("1", 1).unwrap_err();

        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(cart.total_quantity(), 3); // unchanged
    }

    #[test]
    fn test_adjust_quantity_unknown_line() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.adjust_quantity("missing", 1),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        cart.remove_item("1").unwrap();

        assert!(cart.is_empty());
        assert!(matches!(
            cart.remove_item("1"),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_totals_with_discounts() {
        // cart {P×2 @ 50.00, line discount 5.00} + {Q×1 @ 20.00},
        // cart discount 10.00 → subtotal 115.00, total 105.00
        let mut cart = Cart::new();
        let p = test_product("p", 5000, 10);
        let q = test_product("q", 2000, 10);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&q, 1).unwrap();
        cart.set_line_discount("p", 500).unwrap();
        cart.set_discount(1000).unwrap();

        assert_eq!(cart.subtotal_cents(), 11_500);
        assert_eq!(cart.total_cents(), 10_500);
    }

    #[test]
    fn test_price_is_frozen_at_add_time() {
        let mut cart = Cart::new();
        let mut product = test_product("1", 1000, 10);

        cart.add_item(&product, 1).unwrap();

        // catalog price changes after the add
        product.sale_price_cents = 9999;
        cart.add_item(&product, 1).unwrap();

        // both units priced at the original snapshot
        assert_eq!(cart.subtotal_cents(), 2000);
    }

    #[test]
    fn test_negative_discount_rejected() {
        let mut cart = Cart::new();
        assert!(cart.set_discount(-1).is_err());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        cart.set_discount(100).unwrap();
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.discount_cents(), 0);
    }
}
