//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for dimgur. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! The four vote procedures (`create_vote`, `remove_vote`,
//! `create_comment_vote`, `remove_comment_vote`) each run inside one
//! `IMMEDIATE` transaction, so the vote row and the subject's counter change
//! together or not at all.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use dimgur_core::{
    Comment, CommentId, Post, PostId, Subject, SubjectKind, Vote, WalletAddress, WalletSignature,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Procedure, Store, VoteInsert, VoteRemoval};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

/// Table names for one vote ledger.
struct LedgerTables {
    votes: &'static str,
    subject_column: &'static str,
    subjects: &'static str,
}

const POST_LEDGER: LedgerTables = LedgerTables {
    votes: "votes",
    subject_column: "post_id",
    subjects: "posts",
};

const COMMENT_LEDGER: LedgerTables = LedgerTables {
    votes: "comment_votes",
    subject_column: "comment_id",
    subjects: "comments",
};

fn tables(kind: SubjectKind) -> &'static LedgerTables {
    match kind {
        SubjectKind::Post => &POST_LEDGER,
        SubjectKind::Comment => &COMMENT_LEDGER,
    }
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn millis_to_time(table: &'static str, ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::invalid(table, format!("timestamp {ms} out of range")))
}

fn decode_count(table: &'static str, raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| StoreError::invalid(table, format!("negative vote_count {raw}")))
}

fn decode_address(table: &'static str, raw: &str) -> Result<WalletAddress> {
    WalletAddress::parse(raw).map_err(|e| StoreError::invalid(table, e.to_string()))
}

fn decode_signature(table: &'static str, raw: Vec<u8>) -> Result<WalletSignature> {
    let bytes: [u8; 64] = raw
        .try_into()
        .map_err(|v: Vec<u8>| {
            StoreError::invalid(table, format!("signature is {} bytes", v.len()))
        })?;
    Ok(WalletSignature::from_bytes(bytes))
}

struct PostRow {
    id: String,
    title: String,
    image_url: String,
    tags: String,
    author: String,
    signature: Vec<u8>,
    vote_count: i64,
    created_at: i64,
}

impl PostRow {
    const COLUMNS: &'static str =
        "id, title, image_url, tags, author, signature, vote_count, created_at";

    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            image_url: row.get("image_url")?,
            tags: row.get("tags")?,
            author: row.get("author")?,
            signature: row.get("signature")?,
            vote_count: row.get("vote_count")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self> {
        const T: &str = "posts";
        Ok(Post {
            id: PostId::parse(row.id).map_err(|e| StoreError::invalid(T, e.to_string()))?,
            title: row.title,
            image_url: row.image_url,
            tags: serde_json::from_str(&row.tags)
                .map_err(|e| StoreError::invalid(T, format!("tags: {e}")))?,
            author: decode_address(T, &row.author)?,
            signature: decode_signature(T, row.signature)?,
            vote_count: decode_count(T, row.vote_count)?,
            created_at: millis_to_time(T, row.created_at)?,
        })
    }
}

struct CommentRow {
    id: String,
    post_id: String,
    author: String,
    content: String,
    signature: Vec<u8>,
    vote_count: i64,
    created_at: i64,
}

impl CommentRow {
    const COLUMNS: &'static str =
        "id, post_id, author, content, signature, vote_count, created_at";

    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            post_id: row.get("post_id")?,
            author: row.get("author")?,
            content: row.get("content")?,
            signature: row.get("signature")?,
            vote_count: row.get("vote_count")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl TryFrom<CommentRow> for Comment {
    type Error = StoreError;

    fn try_from(row: CommentRow) -> Result<Self> {
        const T: &str = "comments";
        Ok(Comment {
            id: CommentId::parse(row.id).map_err(|e| StoreError::invalid(T, e.to_string()))?,
            post_id: PostId::parse(row.post_id)
                .map_err(|e| StoreError::invalid(T, e.to_string()))?,
            author: decode_address(T, &row.author)?,
            content: row.content,
            signature: decode_signature(T, row.signature)?,
            vote_count: decode_count(T, row.vote_count)?,
            created_at: millis_to_time(T, row.created_at)?,
        })
    }
}

fn read_count(conn: &Connection, t: &LedgerTables, id: &str) -> Result<Option<u64>> {
    let raw: Option<i64> = conn
        .query_row(
            &format!("SELECT vote_count FROM {} WHERE id = ?1", t.subjects),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|c| decode_count(t.subjects, c)).transpose()
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_post(&self, post: &Post) -> Result<InsertResult> {
        let post = post.clone();
        let tags = serde_json::to_string(&post.tags)
            .map_err(|e| StoreError::invalid("posts", format!("tags: {e}")))?;

        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO posts (id, title, image_url, tags, author, signature, vote_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    post.id.as_str(),
                    post.title,
                    post.image_url,
                    tags,
                    post.author.to_base58(),
                    post.signature.as_bytes().as_slice(),
                    post.vote_count as i64,
                    post.created_at.timestamp_millis(),
                ],
            )?;
            Ok(if inserted == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM posts WHERE id = ?1", PostRow::COLUMNS),
                    params![id.as_str()],
                    PostRow::read,
                )
                .optional()?;
            row.map(Post::try_from).transpose()
        })
        .await
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<InsertResult> {
        let comment = comment.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let parent: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                params![comment.post_id.as_str()],
                |row| row.get(0),
            )?;
            if !parent {
                return Ok(InsertResult::ParentNotFound);
            }
            let inserted = tx.execute(
                "INSERT INTO comments (id, post_id, author, content, signature, vote_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    comment.id.as_str(),
                    comment.post_id.as_str(),
                    comment.author.to_base58(),
                    comment.content,
                    comment.signature.as_bytes().as_slice(),
                    comment.vote_count as i64,
                    comment.created_at.timestamp_millis(),
                ],
            )?;
            tx.commit()?;
            Ok(if inserted == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_comment(&self, id: &CommentId) -> Result<Option<Comment>> {
        let id = id.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM comments WHERE id = ?1", CommentRow::COLUMNS),
                    params![id.as_str()],
                    CommentRow::read,
                )
                .optional()?;
            row.map(Comment::try_from).transpose()
        })
        .await
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let post_id = post_id.clone();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
                CommentRow::COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![post_id.as_str()], CommentRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(Comment::try_from).collect()
        })
        .await
    }

    async fn has_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<bool> {
        let t = tables(subject.kind());
        let id = subject.id().to_string();
        let voter = voter.to_base58();
        self.blocking(move |conn| {
            let found: bool = conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND voter_address = ?2)",
                    t.votes, t.subject_column
                ),
                params![id, voter],
                |row| row.get(0),
            )?;
            Ok(found)
        })
        .await
    }

    async fn create_vote(&self, vote: &Vote) -> Result<VoteInsert> {
        let procedure = Procedure::create(vote.subject.kind());
        let t = tables(vote.subject.kind());
        let id = vote.subject.id().to_string();
        let voter = vote.voter.to_base58();
        let signature = vote.signature;
        let created_at = vote.created_at.timestamp_millis();

        let result = self
            .blocking(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let exists: bool = tx.query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", t.subjects),
                    params![id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Ok(VoteInsert::SubjectNotFound);
                }

                let inserted = tx.execute(
                    &format!(
                        "INSERT INTO {} ({}, voter_address, signature, created_at)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT DO NOTHING",
                        t.votes, t.subject_column
                    ),
                    params![id, voter, signature.as_bytes().as_slice(), created_at],
                )?;
                if inserted == 0 {
                    return Ok(VoteInsert::AlreadyVoted);
                }

                tx.execute(
                    &format!(
                        "UPDATE {} SET vote_count = vote_count + 1 WHERE id = ?1",
                        t.subjects
                    ),
                    params![id],
                )?;
                let vote_count = read_count(&tx, t, &id)?.unwrap_or(0);
                tx.commit()?;
                Ok(VoteInsert::Recorded { vote_count })
            })
            .await;

        if let Err(e) = &result {
            tracing::error!(%procedure, error = %e, "vote procedure failed");
        }
        result
    }

    async fn remove_vote(&self, subject: &Subject, voter: &WalletAddress) -> Result<VoteRemoval> {
        let procedure = Procedure::remove(subject.kind());
        let t = tables(subject.kind());
        let id = subject.id().to_string();
        let voter = voter.to_base58();

        let result = self
            .blocking(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let deleted = tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1 AND voter_address = ?2",
                        t.votes, t.subject_column
                    ),
                    params![id, voter],
                )?;
                if deleted == 0 {
                    return Ok(VoteRemoval::NoExistingVote);
                }

                tx.execute(
                    &format!(
                        "UPDATE {} SET vote_count = MAX(vote_count - 1, 0) WHERE id = ?1",
                        t.subjects
                    ),
                    params![id],
                )?;
                let vote_count = read_count(&tx, t, &id)?.unwrap_or(0);
                tx.commit()?;
                Ok(VoteRemoval::Removed { vote_count })
            })
            .await;

        if let Err(e) = &result {
            tracing::error!(%procedure, error = %e, "vote procedure failed");
        }
        result
    }

    async fn vote_count(&self, subject: &Subject) -> Result<Option<u64>> {
        let t = tables(subject.kind());
        let id = subject.id().to_string();
        self.blocking(move |conn| read_count(conn, t, &id)).await
    }

    async fn count_vote_rows(&self, subject: &Subject) -> Result<u64> {
        let t = tables(subject.kind());
        let id = subject.id().to_string();
        self.blocking(move |conn| {
            let n: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                    t.votes, t.subject_column
                ),
                params![id],
                |row| row.get(0),
            )?;
            decode_count(t.votes, n)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimgur_core::{Action, Keypair, SignedAction};

    fn make_post(author: &Keypair, title: &str) -> Post {
        let message = format!("Create post: {title}");
        let signed = SignedAction::sign(author, Action::CreatePost, message);
        Post::from_signed(
            &signed,
            title.into(),
            "https://img.example/a.png".into(),
            vec!["sky".into(), "beach".into()],
        )
    }

    fn make_comment(author: &Keypair, post: &Post, content: &str) -> Comment {
        let signed = SignedAction::sign(
            author,
            Action::CreateComment,
            format!("Create comment: {content}"),
        );
        Comment::from_signed(&signed, post.id.clone(), content.into())
    }

    fn vote_on(subject: &Subject, voter: &Keypair) -> Vote {
        let sig = voter.sign(format!("vote for {subject}").as_bytes());
        Vote::new(subject.clone(), voter.address(), sig)
    }

    #[tokio::test]
    async fn test_insert_and_get_post() {
        let store = SqliteStore::open_memory().unwrap();
        let author = Keypair::generate();
        let post = make_post(&author, "sunset");

        assert_eq!(store.insert_post(&post).await.unwrap(), InsertResult::Inserted);
        let got = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(got.id, post.id);
        assert_eq!(got.tags, post.tags);
        assert_eq!(got.author, author.address());
        assert_eq!(got.signature, post.signature);
        assert_eq!(
            got.created_at.timestamp_millis(),
            post.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_idempotent_insert() {
        let store = SqliteStore::open_memory().unwrap();
        let post = make_post(&Keypair::generate(), "again");

        assert_eq!(store.insert_post(&post).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_post(&post).await.unwrap(),
            InsertResult::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_comment_requires_post() {
        let store = SqliteStore::open_memory().unwrap();
        let author = Keypair::generate();
        let post = make_post(&author, "orphan");
        let comment = make_comment(&author, &post, "hi");

        assert_eq!(
            store.insert_comment(&comment).await.unwrap(),
            InsertResult::ParentNotFound
        );
        store.insert_post(&post).await.unwrap();
        assert_eq!(
            store.insert_comment(&comment).await.unwrap(),
            InsertResult::Inserted
        );
        let listed = store.list_comments(&post.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "hi");
    }

    #[tokio::test]
    async fn test_vote_procedures() {
        let store = SqliteStore::open_memory().unwrap();
        let post = make_post(&Keypair::generate(), "p");
        store.insert_post(&post).await.unwrap();
        let subject = Subject::Post(post.id.clone());
        let voter = Keypair::generate();

        assert!(!store.has_vote(&subject, &voter.address()).await.unwrap());
        assert_eq!(
            store.create_vote(&vote_on(&subject, &voter)).await.unwrap(),
            VoteInsert::Recorded { vote_count: 1 }
        );
        assert!(store.has_vote(&subject, &voter.address()).await.unwrap());
        assert_eq!(
            store.create_vote(&vote_on(&subject, &voter)).await.unwrap(),
            VoteInsert::AlreadyVoted
        );
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(1));
        assert_eq!(store.count_vote_rows(&subject).await.unwrap(), 1);

        assert_eq!(
            store.remove_vote(&subject, &voter.address()).await.unwrap(),
            VoteRemoval::Removed { vote_count: 0 }
        );
        assert_eq!(
            store.remove_vote(&subject, &voter.address()).await.unwrap(),
            VoteRemoval::NoExistingVote
        );
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_ledgers_are_independent() {
        let store = SqliteStore::open_memory().unwrap();
        let author = Keypair::generate();
        let post = make_post(&author, "p");
        store.insert_post(&post).await.unwrap();
        let comment = make_comment(&author, &post, "c");
        store.insert_comment(&comment).await.unwrap();

        let voter = Keypair::generate();
        let on_comment = Subject::Comment(comment.id.clone());
        let on_post = Subject::Post(post.id.clone());

        store.create_vote(&vote_on(&on_comment, &voter)).await.unwrap();
        assert!(!store.has_vote(&on_post, &voter.address()).await.unwrap());
        assert_eq!(store.vote_count(&on_post).await.unwrap(), Some(0));
        assert_eq!(store.vote_count(&on_comment).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_vote_on_missing_subject() {
        let store = SqliteStore::open_memory().unwrap();
        let subject = Subject::Comment(CommentId::parse("ghost").unwrap());
        assert_eq!(
            store
                .create_vote(&vote_on(&subject, &Keypair::generate()))
                .await
                .unwrap(),
            VoteInsert::SubjectNotFound
        );
        assert_eq!(store.vote_count(&subject).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decrement_floors_at_zero() {
        let store = SqliteStore::open_memory().unwrap();
        let post = make_post(&Keypair::generate(), "drift");
        store.insert_post(&post).await.unwrap();
        let subject = Subject::Post(post.id.clone());
        let voter = Keypair::generate();
        store.create_vote(&vote_on(&subject, &voter)).await.unwrap();

        // Simulate counter drift below the row count.
        store
            .blocking(|conn| {
                conn.execute("UPDATE posts SET vote_count = 0", [])?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            store.remove_vote(&subject, &voter.address()).await.unwrap(),
            VoteRemoval::Removed { vote_count: 0 }
        );
    }

    #[tokio::test]
    async fn test_corrupt_row_is_invalid_data() {
        let store = SqliteStore::open_memory().unwrap();
        let post = make_post(&Keypair::generate(), "bad");
        store.insert_post(&post).await.unwrap();
        store
            .blocking(|conn| {
                conn.execute("UPDATE posts SET signature = x'0102'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.get_post(&post.id).await,
            Err(StoreError::InvalidData { table: "posts", .. })
        ));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimgur.db");
        let post = make_post(&Keypair::generate(), "durable");
        let voter = Keypair::generate();
        let subject = Subject::Post(post.id.clone());

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_post(&post).await.unwrap();
            store.create_vote(&vote_on(&subject, &voter)).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.has_vote(&subject, &voter.address()).await.unwrap());
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_distinct_voters() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let post = make_post(&Keypair::generate(), "busy");
        store.insert_post(&post).await.unwrap();
        let subject = Subject::Post(post.id.clone());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let subject = subject.clone();
            handles.push(tokio::spawn(async move {
                store.create_vote(&vote_on(&subject, &Keypair::generate())).await
            }));
        }
        for h in handles {
            assert!(matches!(
                h.await.unwrap().unwrap(),
                VoteInsert::Recorded { .. }
            ));
        }
        assert_eq!(store.vote_count(&subject).await.unwrap(), Some(16));
        assert_eq!(store.count_vote_rows(&subject).await.unwrap(), 16);
    }
}
