//! # dimgur
//!
//! Signed votes, comments and posts for a decentralized image board.
//!
//! ## Overview
//!
//! Every mutating request carries a message signed by the acting wallet's
//! Ed25519 key. The server verifies the detached signature against the
//! claimed address before it touches the store, and the store keeps at most
//! one vote per `(subject, voter)` with a counter that always equals the
//! number of votes.
//!
//! - [`ledger`] - post and comment vote ledgers
//! - [`service`] - the mutation orchestrator, [`VoteService`]
//! - [`api`] - the HTTP surface
//! - [`config`] / [`logging`] - process setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dimgur::{api, ServiceConfig, VoteService};
//! use dimgur::store::SqliteStore;
//!
//! async fn example() {
//!     let config = ServiceConfig::default();
//!     let store = SqliteStore::open(&config.database_path).unwrap();
//!     let service = Arc::new(VoteService::new(store, config.policy()));
//!     let app = api::router(service);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `dimgur::core` - Core primitives (addresses, signatures, messages)
//! - `dimgur::store` - Storage abstraction and SQLite

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod service;

// Re-export component crates
pub use dimgur_core as core;
pub use dimgur_store as store;

// Re-export main types for convenience
pub use config::{Policy, ServiceConfig};
pub use error::{ConfigError, LedgerError, Result, ServiceError};
pub use ledger::{CommentVoteLedger, Ledger, LedgerKey, VoteLedger};
pub use logging::{init_logging, LogFormat};
pub use service::VoteService;

// Re-export commonly used core types
pub use dimgur_core::{
    Action, Comment, CommentId, Keypair, Post, PostId, SignedAction, Subject, VoteAction,
    VoteTally, WalletAddress, WalletSignature,
};
