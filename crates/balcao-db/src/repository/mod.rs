//! # Repository Module
//!
//! Repository implementations for database access.
//!
//! ## Repository Pattern
//! Each repository owns the SQL for one aggregate:
//!
//! - [`product`] - catalog reads/writes and the atomic stock primitives
//!   (the inventory ledger)
//! - [`sale`] - sale headers and lines
//! - [`finance`] - receivables and payables

pub mod finance;
pub mod product;
pub mod sale;
