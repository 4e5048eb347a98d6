//! Votes and the per-(subject, voter) state machine.
//!
//! Each `(subject, voter)` pair is either `NoVote` or `Voted`. Adding moves
//! `NoVote -> Voted`, removing moves back. Any other transition is a
//! conflict the caller must see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::VoteAction;
use crate::crypto::{WalletAddress, WalletSignature};
use crate::types::Subject;

/// A recorded vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub subject: Subject,
    pub voter: WalletAddress,
    /// Signature that authorized the vote, kept as proof.
    pub signature: WalletSignature,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(subject: Subject, voter: WalletAddress, signature: WalletSignature) -> Self {
        Self {
            subject,
            voter,
            signature,
            created_at: Utc::now(),
        }
    }
}

/// State of one `(subject, voter)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteState {
    NoVote,
    Voted,
}

/// A transition that the current state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    AlreadyVoted,
    NoExistingVote,
}

impl VoteState {
    pub fn from_voted(voted: bool) -> Self {
        if voted {
            VoteState::Voted
        } else {
            VoteState::NoVote
        }
    }

    pub fn is_voted(self) -> bool {
        self == VoteState::Voted
    }

    /// Apply a declared action, returning the next state.
    pub fn apply(self, action: VoteAction) -> Result<VoteState, Conflict> {
        match (self, action) {
            (VoteState::NoVote, VoteAction::Add) => Ok(VoteState::Voted),
            (VoteState::Voted, VoteAction::Remove) => Ok(VoteState::NoVote),
            (VoteState::Voted, VoteAction::Add) => Err(Conflict::AlreadyVoted),
            (VoteState::NoVote, VoteAction::Remove) => Err(Conflict::NoExistingVote),
        }
    }
}

/// The outcome reported back to a voter after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub voted: bool,
    pub vote_count: u64,
}
