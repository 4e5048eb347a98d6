//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence. Each vote procedure
//! runs under one write lock, which gives it the same all-or-nothing
//! behaviour as a transaction.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use dimgur_core::{Comment, CommentId, Post, PostId, Subject, Vote, WalletAddress};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store, VoteInsert, VoteRemoval};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
    /// Both ledgers. The `Subject` variant keeps post and comment votes apart.
    votes: HashMap<(Subject, WalletAddress), Vote>,
}

impl MemoryStoreInner {
    fn counter_mut(&mut self, subject: &Subject) -> Option<&mut u64> {
        match subject {
            Subject::Post(id) => self.posts.get_mut(id).map(|p| &mut p.vote_count),
            Subject::Comment(id) => self.comments.get_mut(id).map(|c| &mut c.vote_count),
        }
    }

    fn counter(&self, subject: &Subject) -> Option<u64> {
        match subject {
            Subject::Post(id) => self.posts.get(id).map(|p| p.vote_count),
            Subject::Comment(id) => self.comments.get(id).map(|c| c.vote_count),
        }
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if inner.posts.contains_key(&post.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.posts.insert(post.id.clone(), post.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        Ok(self.read()?.posts.get(id).cloned())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if !inner.posts.contains_key(&comment.post_id) {
            return Ok(InsertResult::ParentNotFound);
        }
        if inner.comments.contains_key(&comment.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.comments.insert(comment.id.clone(), comment.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_comment(&self, id: &CommentId) -> Result<Option<Comment>> {
        Ok(self.read()?.comments.get(id).cloned())
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let inner = self.read()?;
        let mut comments: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| &c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn has_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<bool> {
        Ok(self
            .read()?
            .votes
            .contains_key(&(subject.clone(), *voter)))
    }

    async fn create_vote(&self, vote: &Vote) -> Result<VoteInsert> {
        let mut inner = self.write()?;
        if inner.counter(&vote.subject).is_none() {
            return Ok(VoteInsert::SubjectNotFound);
        }
        let key = (vote.subject.clone(), vote.voter);
        if inner.votes.contains_key(&key) {
            return Ok(VoteInsert::AlreadyVoted);
        }
        inner.votes.insert(key, vote.clone());
        let Some(count) = inner.counter_mut(&vote.subject) else {
            return Ok(VoteInsert::SubjectNotFound);
        };
        *count += 1;
        Ok(VoteInsert::Recorded { vote_count: *count })
    }

    async fn remove_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<VoteRemoval> {
        let mut inner = self.write()?;
        if inner.votes.remove(&(subject.clone(), *voter)).is_none() {
            return Ok(VoteRemoval::NoExistingVote);
        }
        let vote_count = match inner.counter_mut(subject) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        Ok(VoteRemoval::Removed { vote_count })
    }

    async fn vote_count(&self, subject: &Subject) -> Result<Option<u64>> {
        Ok(self.read()?.counter(subject))
    }

    async fn count_vote_rows(&self, subject: &Subject) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.votes.keys().filter(|(s, _)| s == subject).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimgur_core::{Action, Keypair, SignedAction};

    fn make_post(keypair: &Keypair, title: &str) -> Post {
        let message = format!("Create post: {title}");
        let signed = SignedAction::sign(keypair, Action::CreatePost, message);
        Post::from_signed(&signed, title.into(), "https://img.example/a.png".into(), vec![])
    }

    fn vote_on(subject: Subject, voter: &Keypair) -> Vote {
        let sig = voter.sign(format!("add vote for {subject}").as_bytes());
        Vote::new(subject, voter.address(), sig)
    }

    #[tokio::test]
    async fn test_memory_store_post_roundtrip() {
        let store = MemoryStore::new();
        let keypair = Keypair::generate();
        let post = make_post(&keypair, "sunset");

        assert_eq!(store.insert_post(&post).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_post(&post).await.unwrap(),
            InsertResult::AlreadyExists
        );
        let got = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(got.title, "sunset");
    }

    #[tokio::test]
    async fn test_memory_store_vote_toggle() {
        let store = MemoryStore::new();
        let author = Keypair::generate();
        let voter = Keypair::generate();
        let post = make_post(&author, "p");
        store.insert_post(&post).await.unwrap();
        let subject = Subject::Post(post.id.clone());

        let r1 = store.create_vote(&vote_on(subject.clone(), &voter)).await.unwrap();
        assert_eq!(r1, VoteInsert::Recorded { vote_count: 1 });

        let r2 = store.create_vote(&vote_on(subject.clone(), &voter)).await.unwrap();
        assert_eq!(r2, VoteInsert::AlreadyVoted);
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(1));

        let r3 = store.remove_vote(&subject, &voter.address()).await.unwrap();
        assert_eq!(r3, VoteRemoval::Removed { vote_count: 0 });

        let r4 = store.remove_vote(&subject, &voter.address()).await.unwrap();
        assert_eq!(r4, VoteRemoval::NoExistingVote);
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_memory_store_vote_on_missing_subject() {
        let store = MemoryStore::new();
        let voter = Keypair::generate();
        let subject = Subject::Post(PostId::parse("nope").unwrap());
        let r = store.create_vote(&vote_on(subject.clone(), &voter)).await.unwrap();
        assert_eq!(r, VoteInsert::SubjectNotFound);
        assert_eq!(store.count_vote_rows(&subject).await.unwrap(), 0);
    }
}
