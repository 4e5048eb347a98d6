//! Store trait: the abstract interface for posts, comments and vote ledgers.
//!
//! This trait keeps the ledgers storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use std::fmt;

use async_trait::async_trait;
use dimgur_core::{
    Comment, CommentId, Post, PostId, Subject, SubjectKind, Vote, WalletAddress,
};

use crate::error::Result;

/// Result of inserting a post or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Row was inserted.
    Inserted,
    /// A row with the same content-addressed id exists (idempotent).
    AlreadyExists,
    /// The parent post of a comment does not exist.
    ParentNotFound,
}

/// Result of the atomic insert-and-increment procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteInsert {
    /// Vote recorded; `vote_count` is the subject's count after the increment.
    Recorded { vote_count: u64 },
    /// The `(subject, voter)` pair already has a vote. Nothing changed.
    AlreadyVoted,
    /// The subject does not exist. Nothing changed.
    SubjectNotFound,
}

/// Result of the atomic delete-and-decrement procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRemoval {
    /// Vote deleted; `vote_count` is the subject's count after the decrement.
    Removed { vote_count: u64 },
    /// No vote exists for the pair. Nothing changed.
    NoExistingVote,
}

/// The named vote procedures. Each runs as a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    CreateVote,
    RemoveVote,
    CreateCommentVote,
    RemoveCommentVote,
}

impl Procedure {
    pub fn create(kind: SubjectKind) -> Self {
        match kind {
            SubjectKind::Post => Procedure::CreateVote,
            SubjectKind::Comment => Procedure::CreateCommentVote,
        }
    }

    pub fn remove(kind: SubjectKind) -> Self {
        match kind {
            SubjectKind::Post => Procedure::RemoveVote,
            SubjectKind::Comment => Procedure::RemoveCommentVote,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Procedure::CreateVote => "create_vote",
            Procedure::RemoveVote => "remove_vote",
            Procedure::CreateCommentVote => "create_comment_vote",
            Procedure::RemoveCommentVote => "remove_comment_vote",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The Store trait: async interface for persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Atomicity
///
/// [`Store::create_vote`] and [`Store::remove_vote`] must each apply the
/// row change and the subject's counter change together or not at all, and
/// must serialize against each other for the same `(subject, voter)` pair.
/// The uniqueness of that pair is enforced here, not by callers.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Post Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a post. Returns `AlreadyExists` if the id is taken.
    async fn insert_post(&self, post: &Post) -> Result<InsertResult>;

    /// Get a post by id.
    async fn get_post(&self, id: &PostId) -> Result<Option<Post>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Comment Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a comment. Returns `ParentNotFound` if its post is missing.
    async fn insert_comment(&self, comment: &Comment) -> Result<InsertResult>;

    /// Get a comment by id.
    async fn get_comment(&self, id: &CommentId) -> Result<Option<Comment>>;

    /// List the comments on a post, oldest first.
    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Vote Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Point lookup: does `(subject, voter)` have a vote?
    async fn has_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<bool>;

    /// Atomically insert the vote and increment the subject's count.
    async fn create_vote(&self, vote: &Vote) -> Result<VoteInsert>;

    /// Atomically delete the vote and decrement the subject's count,
    /// floored at zero.
    async fn remove_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<VoteRemoval>;

    /// The subject's aggregate counter, or `None` if the subject is unknown.
    async fn vote_count(&self, subject: &Subject) -> Result<Option<u64>>;

    /// Count the vote rows referencing a subject. Used to audit the counter.
    async fn count_vote_rows(&self, subject: &Subject) -> Result<u64>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn insert_post(&self, post: &Post) -> Result<InsertResult> {
        (**self).insert_post(post).await
    }

    async fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        (**self).get_post(id).await
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<InsertResult> {
        (**self).insert_comment(comment).await
    }

    async fn get_comment(&self, id: &CommentId) -> Result<Option<Comment>> {
        (**self).get_comment(id).await
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        (**self).list_comments(post_id).await
    }

    async fn has_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<bool> {
        (**self).has_vote(subject, voter).await
    }

    async fn create_vote(&self, vote: &Vote) -> Result<VoteInsert> {
        (**self).create_vote(vote).await
    }

    async fn remove_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<VoteRemoval> {
        (**self).remove_vote(subject, voter).await
    }

    async fn vote_count(&self, subject: &Subject) -> Result<Option<u64>> {
        (**self).vote_count(subject).await
    }

    async fn count_vote_rows(&self, subject: &Subject) -> Result<u64> {
        (**self).count_vote_rows(subject).await
    }
}
