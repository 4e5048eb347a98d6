//! Posts and comments: the two kinds of votable subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::SignedAction;
use crate::crypto::{WalletAddress, WalletSignature};
use crate::types::{CommentId, ContentId, PostId};

/// An image post. The image itself lives with the storage provider; only
/// its URL is kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub author: WalletAddress,
    /// Kept as proof of authorship; never written to responses.
    #[serde(skip_serializing)]
    pub signature: WalletSignature,
    pub vote_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Build a new post from a verified creation. The id is derived from the
    /// signed creation, so replaying it yields the same id.
    pub fn from_signed(
        signed: &SignedAction,
        title: String,
        image_url: String,
        tags: Vec<String>,
    ) -> Self {
        let id = ContentId::derive(
            "post",
            signed.actor.as_bytes(),
            &signed.message,
            signed.signature.as_bytes(),
        );
        Self {
            id: PostId::from_content(id),
            title,
            image_url,
            tags,
            author: signed.actor,
            signature: signed.signature,
            vote_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: WalletAddress,
    pub content: String,
    #[serde(skip_serializing)]
    pub signature: WalletSignature,
    pub vote_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_signed(signed: &SignedAction, post_id: PostId, content: String) -> Self {
        let id = ContentId::derive(
            "comment",
            signed.actor.as_bytes(),
            &signed.message,
            signed.signature.as_bytes(),
        );
        Self {
            id: CommentId::from_content(id),
            post_id,
            author: signed.actor,
            content,
            signature: signed.signature,
            vote_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::crypto::Keypair;

    #[test]
    fn test_replayed_creation_has_same_id() {
        let keypair = Keypair::from_seed(&[9; 32]);
        let signed = SignedAction::sign(
            &keypair,
            Action::CreateComment,
            "Create comment: hi at 2024-05-01T12:00:00.000Z".into(),
        );
        let post = PostId::parse("P1").unwrap();
        let a = Comment::from_signed(&signed, post.clone(), "hi".into());
        let b = Comment::from_signed(&signed, post, "hi".into());
        assert_eq!(a.id, b.id);
        assert_eq!(a.vote_count, 0);
    }

    #[test]
    fn test_post_serializes_camel_case() {
        let keypair = Keypair::from_seed(&[9; 32]);
        let signed = SignedAction::sign(&keypair, Action::CreatePost, "Create post: t".into());
        let post = Post::from_signed(&signed, "t".into(), "https://img/x.png".into(), vec![]);
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["voteCount"], 0);
        assert_eq!(json["imageUrl"], "https://img/x.png");
        assert_eq!(json["author"], keypair.address().to_base58());
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn test_comment_signature_not_serialized() {
        let keypair = Keypair::from_seed(&[9; 32]);
        let signed =
            SignedAction::sign(&keypair, Action::CreateComment, "Create comment: hi".into());
        let comment = Comment::from_signed(&signed, PostId::parse("P1").unwrap(), "hi".into());
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["postId"], "P1");
        assert!(json.get("signature").is_none());
    }
}
