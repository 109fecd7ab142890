//! # balcao-db: Database Layer for Balcão
//!
//! SQLite storage for the sale transaction core, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Balcão Data Flow                             │
//! │                                                                     │
//! │  balcao-engine (commit / cancel)                                    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                   balcao-db (THIS CRATE)                      │ │
//! │  │                                                               │ │
//! │  │  ┌─────────────┐   ┌────────────────┐   ┌────────────────┐   │ │
//! │  │  │  Database   │   │  Repositories  │   │   Migrations   │   │ │
//! │  │  │  (pool.rs)  │◄──│ product (stock)│   │   (embedded)   │   │ │
//! │  │  │ SqlitePool  │   │ sale           │   │ 001_initial…   │   │ │
//! │  │  │             │   │ finance        │   │                │   │ │
//! │  │  └─────────────┘   └────────────────┘   └────────────────┘   │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database (WAL mode, foreign keys on)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, sale, finance)
//!
//! ## Transaction-aware writes
//!
//! Writes that must land atomically with others (stock debit, sale/line
//! inserts, the auto-created receivable) are associated functions taking
//! `&mut SqliteConnection`, so the engine can run them inside a single
//! transaction. Plain reads and standalone writes go through pool-backed
//! `&self` methods.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::finance::FinanceRepository;
pub use repository::product::{ProductRepository, StockDebit};
pub use repository::sale::SaleRepository;
