//! Signed actions: one mutation request, authenticated by a wallet signature.
//!
//! A `SignedAction` is built per request, checked once, then dropped. It is
//! never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonical::{canonicalize, embedded_timestamp};
use crate::crypto::{verify_detached, Keypair, WalletAddress, WalletSignature};
use crate::error::{CoreError, ValidationError};

/// What a signed message authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    AddVote,
    RemoveVote,
    /// Add or remove on a comment; the message does not distinguish them.
    CommentVote,
    CreateComment,
    CreatePost,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::AddVote => "add-vote",
            Action::RemoveVote => "remove-vote",
            Action::CommentVote => "comment-vote",
            Action::CreateComment => "create-comment",
            Action::CreatePost => "create-post",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-declared intent of a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Add,
    Remove,
}

impl VoteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteAction::Add => "add",
            VoteAction::Remove => "remove",
        }
    }
}

impl FromStr for VoteAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(VoteAction::Add),
            "remove" => Ok(VoteAction::Remove),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for VoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action together with the proof that the actor authorized it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAction {
    /// The wallet that claims to have signed.
    pub actor: WalletAddress,
    pub action: Action,
    /// The exact text that was signed.
    pub message: String,
    pub signature: WalletSignature,
    /// Timestamp embedded in the message, if it carries one.
    pub timestamp: Option<DateTime<Utc>>,
}

impl SignedAction {
    pub fn new(
        actor: WalletAddress,
        action: Action,
        message: String,
        signature: WalletSignature,
    ) -> Self {
        let timestamp = embedded_timestamp(&message);
        Self {
            actor,
            action,
            message,
            signature,
            timestamp,
        }
    }

    /// Sign `message` with `keypair`. The wallet side of the protocol.
    pub fn sign(keypair: &Keypair, action: Action, message: String) -> Self {
        let signature = keypair.sign(message.as_bytes());
        Self::new(keypair.address(), action, message, signature)
    }

    /// Check the signature over the message bytes.
    pub fn verify(&self) -> Result<bool, CoreError> {
        verify_detached(&self.actor, self.message.as_bytes(), &self.signature)
    }

    /// Check that the message is the canonical message for this action on
    /// `subject`, using the message's own timestamp.
    pub fn matches_canonical(&self, subject: &str) -> bool {
        let at = match (self.action, self.timestamp) {
            // Comment-vote messages carry no timestamp; any instant renders the same.
            (Action::CommentVote, _) => DateTime::<Utc>::default(),
            (_, Some(at)) => at,
            (_, None) => return false,
        };
        self.message == canonicalize(self.action, subject, at)
    }

    /// Check the embedded timestamp against a freshness window.
    ///
    /// Messages without a timestamp pass. A bound that falls outside the
    /// representable range leaves that side of the window open.
    pub fn check_freshness(
        &self,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Result<(), ValidationError> {
        let Some(at) = self.timestamp else {
            return Ok(());
        };
        let too_old = now.checked_sub_signed(max_age).is_some_and(|oldest| at < oldest);
        let too_new = now.checked_add_signed(max_age).is_some_and(|newest| at > newest);
        if too_old || too_new {
            return Err(ValidationError::StaleMessage(at.to_rfc3339()));
        }
        Ok(())
    }
}
