//! Canonical messages: the exact text a wallet signs for each action.
//!
//! The formats are a wire contract shared with the browser client:
//!
//! ```text
//! {add|remove} vote for post {post_id} at {timestamp}
//! Vote for comment: {comment_id}
//! Create {comment|post}: {content} at {timestamp}
//! ```
//!
//! Timestamps are ISO-8601 UTC with millisecond precision and a `Z` suffix,
//! the format a browser's `Date.toISOString()` produces. The comment-vote
//! message carries no timestamp.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::action::{Action, VoteAction};
use crate::error::CoreError;
use crate::types::{CommentId, PostId};

/// Separator between the message body and its timestamp.
const AT: &str = " at ";

/// Format a timestamp the way the client embeds it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an embedded timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("{s:?}: {e}")))
}

/// Message for adding or removing a vote on a post.
pub fn post_vote_message(action: VoteAction, post_id: &PostId, at: DateTime<Utc>) -> String {
    format!(
        "{} vote for post {}{AT}{}",
        action.as_str(),
        post_id,
        format_timestamp(at)
    )
}

/// Message for voting on a comment. Used for both add and remove.
pub fn comment_vote_message(comment_id: &CommentId) -> String {
    format!("Vote for comment: {comment_id}")
}

/// Message for creating a comment.
pub fn create_comment_message(content: &str, at: DateTime<Utc>) -> String {
    format!("Create comment: {content}{AT}{}", format_timestamp(at))
}

/// Message for creating a post. The post title is the signed content.
pub fn create_post_message(title: &str, at: DateTime<Utc>) -> String {
    format!("Create post: {title}{AT}{}", format_timestamp(at))
}

/// Build the canonical message for an action on a subject id.
///
/// `subject` is the post id for post votes, the comment id for comment
/// votes, and the content (comment text or post title) for creations.
pub fn canonicalize(action: Action, subject: &str, at: DateTime<Utc>) -> String {
    match action {
        Action::AddVote | Action::RemoveVote => {
            let verb = if action == Action::AddVote {
                VoteAction::Add
            } else {
                VoteAction::Remove
            };
            format!(
                "{} vote for post {subject}{AT}{}",
                verb.as_str(),
                format_timestamp(at)
            )
        }
        Action::CommentVote => format!("Vote for comment: {subject}"),
        Action::CreateComment => create_comment_message(subject, at),
        Action::CreatePost => create_post_message(subject, at),
    }
}

/// Extract the timestamp embedded after the last ` at ` of a message.
///
/// Returns `None` when the message has no parseable suffix.
pub fn embedded_timestamp(message: &str) -> Option<DateTime<Utc>> {
    let (_, suffix) = message.rsplit_once(AT)?;
    parse_timestamp(suffix).ok()
}
