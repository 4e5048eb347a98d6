//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: wallets that sign requests the
//! way the browser client does, and a service with a post already seeded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dimgur::{Policy, VoteService};
use dimgur_core::{
    comment_vote_message, create_comment_message, create_post_message, post_vote_message, Comment,
    CommentId, CommentVoteRequest, CreateCommentRequest, CreatePostRequest, Keypair, Post, PostId,
    VoteAction, VoteRequest,
};
use dimgur_store::{MemoryStore, SqliteStore, Store};

/// A wallet that signs requests.
pub struct Wallet {
    pub keypair: Keypair,
}

impl Wallet {
    /// A wallet with a random key.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
        }
    }

    /// A wallet with a deterministic key.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
        }
    }

    /// The base58 address the client would send.
    pub fn address(&self) -> String {
        self.keypair.address().to_base58()
    }

    fn sign(&self, message: &str) -> String {
        self.keypair.sign(message.as_bytes()).to_base58()
    }

    /// A signed post vote request, stamped `at`.
    pub fn vote_at(&self, post_id: &PostId, action: VoteAction, at: DateTime<Utc>) -> VoteRequest {
        let message = post_vote_message(action, post_id, at);
        VoteRequest {
            post_id: Some(post_id.to_string()),
            voter_address: Some(self.address()),
            signature: Some(self.sign(&message)),
            message: Some(message),
            action: Some(action.to_string()),
        }
    }

    /// A signed post vote request, stamped now.
    pub fn vote(&self, post_id: &PostId, action: VoteAction) -> VoteRequest {
        self.vote_at(post_id, action, Utc::now())
    }

    /// A signed comment vote request.
    pub fn comment_vote(&self, comment_id: &CommentId, action: VoteAction) -> CommentVoteRequest {
        let message = comment_vote_message(comment_id);
        CommentVoteRequest {
            comment_id: Some(comment_id.to_string()),
            voter_address: Some(self.address()),
            signature: Some(self.sign(&message)),
            message: Some(message),
            action: Some(action.to_string()),
        }
    }

    /// A signed post creation request.
    pub fn create_post(&self, title: &str, image_url: &str, tags: &[&str]) -> CreatePostRequest {
        let message = create_post_message(title, Utc::now());
        CreatePostRequest {
            title: Some(title.to_string()),
            image_url: Some(image_url.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author_address: Some(self.address()),
            signature: Some(self.sign(&message)),
            message: Some(message),
        }
    }

    /// A signed comment creation request.
    pub fn create_comment(&self, post_id: &PostId, content: &str) -> CreateCommentRequest {
        let message = create_comment_message(content, Utc::now());
        CreateCommentRequest {
            post_id: Some(post_id.to_string()),
            author_address: Some(self.address()),
            content: Some(content.to_string()),
            signature: Some(self.sign(&message)),
            message: Some(message),
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Create several wallets with distinct deterministic keys.
pub fn wallets(count: usize) -> Vec<Wallet> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_le_bytes());
            seed[31] = 0xd1;
            Wallet::with_seed(seed)
        })
        .collect()
}

/// A service plus an author wallet for seeding content.
pub struct TestFixture<S: Store> {
    pub service: Arc<VoteService<S>>,
    pub author: Wallet,
}

impl TestFixture<MemoryStore> {
    /// A fixture over an in-memory store with the default policy.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), Policy::default())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture<SqliteStore> {
    /// A fixture over an in-memory SQLite database.
    pub fn sqlite() -> Self {
        let store = SqliteStore::open_memory().expect("in-memory sqlite");
        Self::with_store(store, Policy::default())
    }
}

impl<S: Store> TestFixture<S> {
    pub fn with_store(store: S, policy: Policy) -> Self {
        Self {
            service: Arc::new(VoteService::new(store, policy)),
            author: Wallet::new(),
        }
    }

    /// Create a post signed by the fixture's author.
    pub async fn post(&self, title: &str) -> Post {
        let req = self
            .author
            .create_post(title, "https://gateway.example/ipfs/fixture", &["test"]);
        self.service.create_post(&req).await.expect("create post")
    }

    /// Create a comment signed by the fixture's author.
    pub async fn comment(&self, post_id: &PostId, content: &str) -> Comment {
        let req = self.author.create_comment(post_id, content);
        self.service
            .create_comment(&req)
            .await
            .expect("create comment")
    }
}
