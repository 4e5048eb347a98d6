//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: posts, comments and the two vote ledgers.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE posts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            image_url TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
            author TEXT NOT NULL,             -- base58 wallet address
            signature BLOB NOT NULL,          -- 64 bytes, Ed25519 signature
            vote_count INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
            created_at INTEGER NOT NULL       -- Unix ms
        );

        CREATE TABLE comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author TEXT NOT NULL,
            content TEXT NOT NULL,
            signature BLOB NOT NULL,
            vote_count INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
            created_at INTEGER NOT NULL
        );

        -- At most one row per (post, voter)
        CREATE TABLE votes (
            post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            voter_address TEXT NOT NULL,
            signature BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (post_id, voter_address)
        );

        -- At most one row per (comment, voter)
        CREATE TABLE comment_votes (
            comment_id TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            voter_address TEXT NOT NULL,
            signature BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (comment_id, voter_address)
        );

        CREATE INDEX idx_comments_post ON comments(post_id, created_at);
        CREATE INDEX idx_posts_author ON posts(author);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables = tables(&conn);
        for name in ["posts", "comments", "votes", "comment_votes", "schema_migrations"] {
            assert!(tables.contains(&name.to_string()), "missing table {name}");
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_vote_uniqueness_enforced_by_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO posts (id, title, image_url, author, signature, created_at)
             VALUES ('p1', 't', 'https://x', 'a', x'00', 0)",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO votes (post_id, voter_address, signature, created_at)
                      VALUES ('p1', 'v1', x'00', 0)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO posts (id, title, image_url, author, signature, created_at)
             VALUES ('p1', 't', 'https://x', 'a', x'00', 0)",
            [],
        )
        .unwrap();
        assert!(conn
            .execute("UPDATE posts SET vote_count = -1 WHERE id = 'p1'", [])
            .is_err());
    }

    #[test]
    fn test_newer_schema_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
