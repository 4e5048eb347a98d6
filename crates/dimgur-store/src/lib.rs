//! # dimgur store
//!
//! Storage abstraction for dimgur. Provides a trait-based interface for
//! posts, comments and the two vote ledgers, with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait keeps the ledgers storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`VoteInsert`] / [`VoteRemoval`] - Outcomes of the atomic vote procedures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dimgur_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("dimgur.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **One vote per pair**: `(subject, voter)` is unique in each ledger
//! - **Atomic procedures**: the vote row and the counter change in one transaction
//! - **Floored counters**: removal never takes a count below zero
//! - **Idempotent creation**: posts and comments are content-addressed

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Procedure, Store, VoteInsert, VoteRemoval};
