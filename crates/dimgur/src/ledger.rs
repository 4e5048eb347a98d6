//! Vote ledgers.
//!
//! A ledger records at most one vote per `(subject, voter)` and keeps the
//! subject's `vote_count` equal to the number of those votes. The post and
//! comment ledgers share this code but are distinct types, so a comment id
//! cannot reach the post ledger.

use std::marker::PhantomData;

use dimgur_core::{
    CommentId, PostId, Subject, SubjectKind, Vote, VoteState, WalletAddress, WalletSignature,
};
use dimgur_store::{Store, VoteInsert, VoteRemoval};

use crate::error::LedgerError;

/// An identifier that one ledger is keyed on.
pub trait LedgerKey: Clone + Send + Sync {
    const KIND: SubjectKind;

    fn subject(&self) -> Subject;
}

impl LedgerKey for PostId {
    const KIND: SubjectKind = SubjectKind::Post;

    fn subject(&self) -> Subject {
        Subject::Post(self.clone())
    }
}

impl LedgerKey for CommentId {
    const KIND: SubjectKind = SubjectKind::Comment;

    fn subject(&self) -> Subject {
        Subject::Comment(self.clone())
    }
}

/// A vote ledger over a store.
pub struct Ledger<K, S> {
    store: S,
    _key: PhantomData<fn() -> K>,
}

/// Votes on posts.
pub type VoteLedger<S> = Ledger<PostId, S>;

/// Votes on comments.
pub type CommentVoteLedger<S> = Ledger<CommentId, S>;

impl<K: LedgerKey, S: Store> Ledger<K, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _key: PhantomData,
        }
    }

    /// Current state of one `(subject, voter)` pair.
    ///
    /// Unlike [`Ledger::has_voted`], a store failure is returned as an error.
    pub async fn state(&self, id: &K, voter: &WalletAddress) -> Result<VoteState, LedgerError> {
        let voted = self.store.has_vote(&id.subject(), voter).await?;
        Ok(VoteState::from_voted(voted))
    }

    /// Record a vote and return the subject's new count.
    ///
    /// Fails with `AlreadyVoted` if the pair already has a vote. The check
    /// runs once here and again inside the store's atomic procedure.
    pub async fn add_vote(
        &self,
        id: &K,
        voter: &WalletAddress,
        signature: WalletSignature,
    ) -> Result<u64, LedgerError> {
        let subject = id.subject();

        if self.store.has_vote(&subject, voter).await? {
            tracing::debug!(%subject, %voter, "add rejected: already voted");
            return Err(LedgerError::AlreadyVoted(subject));
        }

        let vote = Vote::new(subject.clone(), *voter, signature);
        match self.store.create_vote(&vote).await? {
            VoteInsert::Recorded { vote_count } => {
                tracing::debug!(%subject, %voter, vote_count, "vote recorded");
                Ok(vote_count)
            }
            VoteInsert::AlreadyVoted => {
                tracing::debug!(%subject, %voter, "add rejected: already voted");
                Err(LedgerError::AlreadyVoted(subject))
            }
            VoteInsert::SubjectNotFound => Err(LedgerError::SubjectNotFound(subject)),
        }
    }

    /// Remove a vote and return the subject's new count, floored at zero.
    pub async fn remove_vote(&self, id: &K, voter: &WalletAddress) -> Result<u64, LedgerError> {
        let subject = id.subject();
        match self.store.remove_vote(&subject, voter).await? {
            VoteRemoval::Removed { vote_count } => {
                tracing::debug!(%subject, %voter, vote_count, "vote removed");
                Ok(vote_count)
            }
            VoteRemoval::NoExistingVote => {
                tracing::debug!(%subject, %voter, "remove rejected: no existing vote");
                Err(LedgerError::NoExistingVote(subject))
            }
        }
    }

    /// Whether the voter has a vote on the subject.
    ///
    /// Fails open: a store error is logged and reported as `false`.
    pub async fn has_voted(&self, id: &K, voter: &WalletAddress) -> bool {
        let subject = id.subject();
        match self.store.has_vote(&subject, voter).await {
            Ok(voted) => voted,
            Err(e) => {
                tracing::error!(
                    %subject,
                    %voter,
                    error = %e,
                    "vote lookup failed, reporting not voted"
                );
                false
            }
        }
    }

    /// The subject's aggregate vote count.
    pub async fn vote_count(&self, id: &K) -> Result<u64, LedgerError> {
        let subject = id.subject();
        self.store
            .vote_count(&subject)
            .await?
            .ok_or(LedgerError::SubjectNotFound(subject))
    }
}
