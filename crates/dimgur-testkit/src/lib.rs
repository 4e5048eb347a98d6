//! # dimgur testkit
//!
//! Testing utilities for dimgur.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: wallets that sign requests the way the browser client
//!   does, and a service with helpers for seeding posts and comments
//! - **Generators**: Proptest strategies and a reference ledger model for
//!   property-based testing
//!
//! The scenario and property tests for the whole system live in this
//! crate's `tests/` directory.
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dimgur_testkit::generators::{ledger_ops, LedgerModel};
//!
//! proptest! {
//!     #[test]
//!     fn count_never_exceeds_voters(ops in ledger_ops(3, 20)) {
//!         let mut model = LedgerModel::new();
//!         for op in ops {
//!             let _ = model.apply(op);
//!             prop_assert!(model.count() <= 3);
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use dimgur_testkit::fixtures::{TestFixture, Wallet};
//! use dimgur_core::VoteAction;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let post = fixture.post("sunset").await;
//!     let voter = Wallet::new();
//!     let tally = fixture
//!         .service
//!         .vote_post(&voter.vote(&post.id, VoteAction::Add))
//!         .await
//!         .unwrap();
//!     assert_eq!(tally.vote_count, 1);
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{wallets, TestFixture, Wallet};
pub use generators::{ledger_ops, LedgerModel, LedgerOp};
