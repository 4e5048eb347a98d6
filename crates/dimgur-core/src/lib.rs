//! # dimgur core
//!
//! Pure primitives for dimgur: wallet addresses, detached signatures,
//! canonical messages, signed actions and the vote state machine.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over signed data.
//!
//! ## Key Types
//!
//! - [`WalletAddress`] - base58 Ed25519 public key
//! - [`WalletSignature`] - 64-byte detached signature
//! - [`SignedAction`] - an action plus the proof that the actor authorized it
//! - [`VoteState`] - `NoVote -> Voted -> NoVote`
//!
//! ## Canonical messages
//!
//! The exact text a wallet signs for each action lives in [`canonical`].

pub mod action;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod post;
pub mod types;
pub mod validation;
pub mod vote;

pub use action::{Action, SignedAction, VoteAction};
pub use canonical::{
    canonicalize, comment_vote_message, create_comment_message, create_post_message,
    embedded_timestamp, format_timestamp, post_vote_message,
};
pub use crypto::{verify_detached, verify_signature, Keypair, WalletAddress, WalletSignature};
pub use error::{CoreError, ValidationError};
pub use post::{Comment, Post};
pub use types::{CommentId, ContentId, PostId, Subject, SubjectKind};
pub use validation::{
    validate_comment, validate_comment_vote, validate_post, validate_vote, CommentVote,
    CommentVoteRequest, CreateCommentRequest, CreatePostRequest, Limits, NewComment, NewPost,
    PostVote, VoteRequest,
};
pub use vote::{Conflict, Vote, VoteState, VoteTally};
