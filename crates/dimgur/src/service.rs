//! The mutation orchestrator: unified API for the dimgur server.
//!
//! Every mutating request goes through the same steps:
//!
//! 1. validate the payload,
//! 2. verify the detached signature over the exact message bytes sent,
//! 3. apply the configured freshness and message-binding checks,
//! 4. read the current vote state,
//! 5. call the ledger, which re-checks the state inside the store's
//!    atomic procedure,
//! 6. report `{ voted, voteCount }`.
//!
//! A request that fails at any step leaves the store untouched.

use std::sync::Arc;

use chrono::Utc;
use dimgur_core::{
    validate_comment, validate_comment_vote, validate_post, validate_vote, Comment, CommentId,
    CommentVoteRequest, Conflict, CreateCommentRequest, CreatePostRequest, Post, PostId,
    SignedAction, ValidationError, VoteAction, VoteRequest, VoteTally, WalletAddress,
};
use dimgur_store::{InsertResult, Store};

use crate::config::Policy;
use crate::error::{Result, ServiceError};
use crate::ledger::{CommentVoteLedger, Ledger, LedgerKey, VoteLedger};

/// The orchestrator over one store.
///
/// Holds no mutable state of its own; share it behind an `Arc`.
pub struct VoteService<S: Store> {
    store: Arc<S>,
    votes: VoteLedger<Arc<S>>,
    comment_votes: CommentVoteLedger<Arc<S>>,
    policy: Policy,
}

impl<S: Store> VoteService<S> {
    /// Create a new service over a store.
    pub fn new(store: S, policy: Policy) -> Self {
        Self::from_shared(Arc::new(store), policy)
    }

    /// Create a service over a store that is shared with other owners.
    pub fn from_shared(store: Arc<S>, policy: Policy) -> Self {
        Self {
            votes: Ledger::new(store.clone()),
            comment_votes: Ledger::new(store.clone()),
            store,
            policy,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn votes(&self) -> &VoteLedger<Arc<S>> {
        &self.votes
    }

    pub fn comment_votes(&self) -> &CommentVoteLedger<Arc<S>> {
        &self.comment_votes
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Vote Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add or remove a vote on a post.
    pub async fn vote_post(&self, req: &VoteRequest) -> Result<VoteTally> {
        let vote = validate_vote(req)?;
        self.authenticate(&vote.signed, vote.post_id.as_str())?;
        mutate(&self.votes, &vote.post_id, vote.action, &vote.signed).await
    }

    /// Add or remove a vote on a comment.
    pub async fn vote_comment(&self, req: &CommentVoteRequest) -> Result<VoteTally> {
        let vote = validate_comment_vote(req)?;
        self.authenticate(&vote.signed, vote.comment_id.as_str())?;
        mutate(&self.comment_votes, &vote.comment_id, vote.action, &vote.signed).await
    }

    /// Whether `voter` has voted on a post. Fails open.
    pub async fn has_voted_post(&self, post_id: &PostId, voter: &WalletAddress) -> bool {
        self.votes.has_voted(post_id, voter).await
    }

    /// Whether `voter` has voted on a comment. Fails open.
    pub async fn has_voted_comment(&self, comment_id: &CommentId, voter: &WalletAddress) -> bool {
        self.comment_votes.has_voted(comment_id, voter).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a post. Replaying the same signed creation returns the
    /// existing post.
    pub async fn create_post(&self, req: &CreatePostRequest) -> Result<Post> {
        let new = validate_post(req, &self.policy.limits)?;
        self.authenticate(&new.signed, &new.title)?;

        let post = Post::from_signed(&new.signed, new.title, new.image_url, new.tags);
        match self.store.insert_post(&post).await? {
            InsertResult::Inserted => {
                tracing::info!(post = %post.id, author = %post.author, "post created");
                Ok(post)
            }
            InsertResult::AlreadyExists | InsertResult::ParentNotFound => {
                tracing::debug!(post = %post.id, "replayed post creation");
                self.get_post(&post.id).await
            }
        }
    }

    /// Create a comment on an existing post. Replaying the same signed
    /// creation returns the existing comment.
    pub async fn create_comment(&self, req: &CreateCommentRequest) -> Result<Comment> {
        let new = validate_comment(req, &self.policy.limits)?;
        self.authenticate(&new.signed, &new.content)?;

        let comment = Comment::from_signed(&new.signed, new.post_id, new.content);
        match self.store.insert_comment(&comment).await? {
            InsertResult::Inserted => {
                tracing::info!(
                    comment = %comment.id,
                    post = %comment.post_id,
                    author = %comment.author,
                    "comment created"
                );
                Ok(comment)
            }
            InsertResult::AlreadyExists => {
                tracing::debug!(comment = %comment.id, "replayed comment creation");
                self.store
                    .get_comment(&comment.id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("comment {}", comment.id)))
            }
            InsertResult::ParentNotFound => {
                Err(ServiceError::NotFound(format!("post {}", comment.post_id)))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a post by id.
    pub async fn get_post(&self, id: &PostId) -> Result<Post> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("post {id}")))
    }

    /// List a post's comments, oldest first.
    pub async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("post {post_id}")));
        }
        Ok(self.store.list_comments(post_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify the signature, then the configured message checks.
    fn authenticate(&self, signed: &SignedAction, subject: &str) -> Result<()> {
        match signed.verify() {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    actor = %signed.actor,
                    action = %signed.action,
                    "signature rejected"
                );
                return Err(ServiceError::InvalidSignature);
            }
            Err(e) => {
                tracing::warn!(actor = %signed.actor, error = %e, "signature check failed");
                return Err(e.into());
            }
        }

        if let Some(max_age) = self.policy.max_message_age {
            signed.check_freshness(Utc::now(), max_age).map_err(|e| {
                tracing::warn!(actor = %signed.actor, error = %e, "stale message");
                e
            })?;
        }

        if self.policy.bind_message_to_action && !signed.matches_canonical(subject) {
            tracing::debug!(
                actor = %signed.actor,
                action = %signed.action,
                "message not canonical"
            );
            return Err(ValidationError::MessageMismatch.into());
        }

        Ok(())
    }
}

/// Read the pair's state, check the declared action against it, then
/// mutate through the ledger.
async fn mutate<K, S>(
    ledger: &Ledger<K, S>,
    id: &K,
    action: VoteAction,
    signed: &SignedAction,
) -> Result<VoteTally>
where
    K: LedgerKey,
    S: Store,
{
    let state = ledger.state(id, &signed.actor).await?;
    if let Err(conflict) = state.apply(action) {
        tracing::debug!(subject = %id.subject(), voter = %signed.actor, ?conflict, "vote conflict");
        return Err(match conflict {
            Conflict::AlreadyVoted => ServiceError::AlreadyVoted,
            Conflict::NoExistingVote => ServiceError::NoExistingVote,
        });
    }

    let vote_count = match action {
        VoteAction::Add => ledger.add_vote(id, &signed.actor, signed.signature).await?,
        VoteAction::Remove => ledger.remove_vote(id, &signed.actor).await?,
    };

    Ok(VoteTally {
        voted: action == VoteAction::Add,
        vote_count,
    })
}
