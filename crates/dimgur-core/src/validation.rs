//! Request validation: wire payloads in, typed signed actions out.
//!
//! Every field on the wire is optional so that a missing field surfaces as
//! a [`ValidationError`] rather than a decoder rejection. Nothing here checks
//! signatures; it only establishes that the request is well-formed.

use serde::{Deserialize, Serialize};

use crate::action::{Action, SignedAction, VoteAction};
use crate::crypto::{WalletAddress, WalletSignature};
use crate::error::ValidationError;
use crate::types::{CommentId, PostId};

/// Size limits applied to user content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_title_len: usize,
    pub max_comment_len: usize,
    pub max_tags: usize,
    pub max_tag_len: usize,
    pub max_url_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_len: 200,
            max_comment_len: 2_000,
            max_tags: 10,
            max_tag_len: 32,
            max_url_len: 2_048,
        }
    }
}

/// `POST /api/votes` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub post_id: Option<String>,
    pub voter_address: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
    pub action: Option<String>,
}

/// `POST /api/comment-votes` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentVoteRequest {
    pub comment_id: Option<String>,
    pub voter_address: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
    pub action: Option<String>,
}

/// `POST /api/comments` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<String>,
    pub author_address: Option<String>,
    pub content: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
}

/// `POST /api/posts` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author_address: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
}

/// A well-formed vote on a post.
#[derive(Debug, Clone)]
pub struct PostVote {
    pub post_id: PostId,
    pub action: VoteAction,
    pub signed: SignedAction,
}

/// A well-formed vote on a comment.
#[derive(Debug, Clone)]
pub struct CommentVote {
    pub comment_id: CommentId,
    pub action: VoteAction,
    pub signed: SignedAction,
}

/// A well-formed comment creation.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
    pub signed: SignedAction,
}

/// A well-formed post creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub signed: SignedAction,
}

fn required<'a>(
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// The message is taken verbatim: its exact bytes are what was signed.
fn required_message(value: &Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(m) if !m.trim().is_empty() => Ok(m.clone()),
        _ => Err(ValidationError::MissingField("message")),
    }
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn signed_parts(
    address_field: &'static str,
    address: &Option<String>,
    signature: &Option<String>,
    message: &Option<String>,
) -> Result<(WalletAddress, WalletSignature, String), ValidationError> {
    let address = WalletAddress::parse(required(address_field, address)?)?;
    let signature = WalletSignature::parse(required("signature", signature)?)?;
    let message = required_message(message)?;
    Ok((address, signature, message))
}

fn parse_id<T>(
    field: &'static str,
    value: &Option<String>,
    parse: impl FnOnce(&str) -> Result<T, crate::error::CoreError>,
) -> Result<T, ValidationError> {
    let raw = required(field, value)?;
    parse(raw).map_err(|e| ValidationError::invalid(field, e.to_string()))
}

fn vote_action(value: &Option<String>) -> Result<VoteAction, ValidationError> {
    required("action", value)?.parse()
}

/// Validate a post vote request.
pub fn validate_vote(req: &VoteRequest) -> Result<PostVote, ValidationError> {
    let post_id = parse_id("postId", &req.post_id, |s| PostId::parse(s))?;
    let action = vote_action(&req.action)?;
    let (voter, signature, message) =
        signed_parts("voterAddress", &req.voter_address, &req.signature, &req.message)?;
    let kind = match action {
        VoteAction::Add => Action::AddVote,
        VoteAction::Remove => Action::RemoveVote,
    };
    Ok(PostVote {
        post_id,
        action,
        signed: SignedAction::new(voter, kind, message, signature),
    })
}

/// Validate a comment vote request.
pub fn validate_comment_vote(req: &CommentVoteRequest) -> Result<CommentVote, ValidationError> {
    let comment_id = parse_id("commentId", &req.comment_id, |s| CommentId::parse(s))?;
    let action = vote_action(&req.action)?;
    let (voter, signature, message) =
        signed_parts("voterAddress", &req.voter_address, &req.signature, &req.message)?;
    Ok(CommentVote {
        comment_id,
        action,
        signed: SignedAction::new(voter, Action::CommentVote, message, signature),
    })
}

/// Validate a comment creation request.
pub fn validate_comment(
    req: &CreateCommentRequest,
    limits: &Limits,
) -> Result<NewComment, ValidationError> {
    let post_id = parse_id("postId", &req.post_id, |s| PostId::parse(s))?;
    let content = required("content", &req.content)?;
    bounded("content", content, limits.max_comment_len)?;
    let (author, signature, message) =
        signed_parts("authorAddress", &req.author_address, &req.signature, &req.message)?;
    Ok(NewComment {
        post_id,
        content: content.to_string(),
        signed: SignedAction::new(author, Action::CreateComment, message, signature),
    })
}

/// Validate a post creation request.
pub fn validate_post(req: &CreatePostRequest, limits: &Limits) -> Result<NewPost, ValidationError> {
    let title = required("title", &req.title)?;
    bounded("title", title, limits.max_title_len)?;

    let image_url = required("imageUrl", &req.image_url)?;
    bounded("imageUrl", image_url, limits.max_url_len)?;
    if !(image_url.starts_with("https://") || image_url.starts_with("http://")) {
        return Err(ValidationError::invalid("imageUrl", "must be an http(s) url"));
    }

    if req.tags.len() > limits.max_tags {
        return Err(ValidationError::TooLong {
            field: "tags",
            max: limits.max_tags,
        });
    }
    let mut tags = Vec::with_capacity(req.tags.len());
    for tag in &req.tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return Err(ValidationError::invalid("tags", "empty tag"));
        }
        bounded("tags", &tag, limits.max_tag_len)?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let (author, signature, message) =
        signed_parts("authorAddress", &req.author_address, &req.signature, &req.message)?;
    Ok(NewPost {
        title: title.to_string(),
        image_url: image_url.to_string(),
        tags,
        signed: SignedAction::new(author, Action::CreatePost, message, signature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::error::CoreError;

    fn keypair() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    fn vote_request() -> VoteRequest {
        let kp = keypair();
        let message = "add vote for post P1 at 2024-05-01T12:00:00.000Z".to_string();
        VoteRequest {
            post_id: Some("P1".into()),
            voter_address: Some(kp.address().to_base58()),
            signature: Some(kp.sign(message.as_bytes()).to_base58()),
            message: Some(message),
            action: Some("add".into()),
        }
    }

    #[test]
    fn test_valid_vote() {
        let vote = validate_vote(&vote_request()).unwrap();
        assert_eq!(vote.post_id.as_str(), "P1");
        assert_eq!(vote.action, VoteAction::Add);
        assert_eq!(vote.signed.action, Action::AddVote);
        assert!(vote.signed.verify().unwrap());
    }

    #[test]
    fn test_missing_fields() {
        let mut req = vote_request();
        req.post_id = None;
        assert_eq!(
            validate_vote(&req).unwrap_err(),
            ValidationError::MissingField("postId")
        );

        let mut req = vote_request();
        req.message = Some("   ".into());
        assert_eq!(
            validate_vote(&req).unwrap_err(),
            ValidationError::MissingField("message")
        );

        let mut req = vote_request();
        req.signature = None;
        assert_eq!(
            validate_vote(&req).unwrap_err(),
            ValidationError::MissingField("signature")
        );
    }

    #[test]
    fn test_bad_address_and_action() {
        let mut req = vote_request();
        req.voter_address = Some("not an address".into());
        assert!(matches!(
            validate_vote(&req),
            Err(ValidationError::Core(CoreError::InvalidAddress(_)))
        ));

        let mut req = vote_request();
        req.action = Some("upvote".into());
        assert!(matches!(
            validate_vote(&req),
            Err(ValidationError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_comment_vote() {
        let kp = keypair();
        let req = CommentVoteRequest {
            comment_id: Some("C1".into()),
            voter_address: Some(kp.address().to_base58()),
            signature: Some(kp.sign(b"Vote for comment: C1").to_base58()),
            message: Some("Vote for comment: C1".into()),
            action: Some("remove".into()),
        };
        let vote = validate_comment_vote(&req).unwrap();
        assert_eq!(vote.action, VoteAction::Remove);
        assert_eq!(vote.signed.action, Action::CommentVote);
    }

    #[test]
    fn test_comment_length_limit() {
        let kp = keypair();
        let limits = Limits {
            max_comment_len: 5,
            ..Limits::default()
        };
        let req = CreateCommentRequest {
            post_id: Some("P1".into()),
            author_address: Some(kp.address().to_base58()),
            content: Some("too long".into()),
            signature: Some(kp.sign(b"x").to_base58()),
            message: Some("x".into()),
        };
        assert_eq!(
            validate_comment(&req, &limits).unwrap_err(),
            ValidationError::TooLong {
                field: "content",
                max: 5
            }
        );
    }

    #[test]
    fn test_post_tags_normalized() {
        let kp = keypair();
        let req = CreatePostRequest {
            title: Some("sunset".into()),
            image_url: Some("https://gateway.example/ipfs/abc".into()),
            tags: vec!["Beach".into(), "beach".into(), " sky ".into()],
            author_address: Some(kp.address().to_base58()),
            signature: Some(kp.sign(b"Create post: sunset").to_base58()),
            message: Some("Create post: sunset".into()),
        };
        let post = validate_post(&req, &Limits::default()).unwrap();
        assert_eq!(post.tags, vec!["beach".to_string(), "sky".to_string()]);
    }

    #[test]
    fn test_post_rejects_non_http_url() {
        let kp = keypair();
        let req = CreatePostRequest {
            title: Some("sunset".into()),
            image_url: Some("javascript:alert(1)".into()),
            tags: vec![],
            author_address: Some(kp.address().to_base58()),
            signature: Some(kp.sign(b"m").to_base58()),
            message: Some("m".into()),
        };
        assert!(matches!(
            validate_post(&req, &Limits::default()),
            Err(ValidationError::InvalidField { field: "imageUrl", .. })
        ));
    }
}
