//! # Engine Error Types
//!
//! Errors surfaced by sale commit, cancel, and the finance operations.
//! Each variant corresponds to one refusal the engine can hand back to
//! a caller; storage failures pass through as
//! [`EngineError::Persistence`].

use balcao_core::{SaleStatus, ValidationError};
use balcao_db::DbError;
use thiserror::Error;

/// Errors from the sale transaction engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Commit was attempted with no lines.
    #[error("cannot commit an empty cart")]
    EmptyCart,

    /// Payment method string did not match any known method.
    #[error("invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// No operator identity on the request.
    #[error("an operator is required to commit a sale")]
    Unauthorized,

    /// A line in the commit request violates the data model (quantity
    /// outside 1..=max, negative price or discount). `CommitSale` is a
    /// wire type; the cart's checks cannot be assumed to have run.
    #[error("invalid line for product {product_id}: {source}")]
    InvalidLine {
        product_id: String,
        source: ValidationError,
    },

    /// Stock debit failed; the whole commit was rolled back.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Sale is not in a state that permits the requested operation.
    #[error("sale {sale_id} is {status}, operation not permitted")]
    InvalidStateTransition {
        sale_id: String,
        status: SaleStatus,
    },

    /// Storage failure.
    #[error("database error: {0}")]
    Persistence(#[from] DbError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
