//! # balcao-engine: Sale Transaction Engine for Balcão
//!
//! The write path of the point-of-sale core: committing carts into
//! durable sales and cancelling them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Balcão Data Flow                             │
//! │                                                                     │
//! │  balcao-core (pure):  Cart ── into_lines() ──┐                      │
//! │                                              ▼                      │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                 balcao-engine (THIS CRATE)                    │ │
//! │  │                                                               │ │
//! │  │   SaleEngine::commit   — debit stock, write sale + lines,     │ │
//! │  │                          create receivable (deferred pay),    │ │
//! │  │                          all in ONE transaction               │ │
//! │  │   SaleEngine::cancel   — restock lines, flip to cancelled     │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │                                              │                      │
//! │                                              ▼                      │
//! │  balcao-db: repositories over SQLite                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why No Locks
//!
//! The engine holds no in-process state. Oversell protection is the
//! conditional stock UPDATE in the product repository, executed inside
//! the commit transaction; concurrent commits race on the database row
//! and at most one wins the last unit.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{parse_payment, CommitSale, SaleEngine};
pub use error::{EngineError, EngineResult};
