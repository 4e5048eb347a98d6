//! Strong type definitions for dimgur.
//!
//! Post and comment identifiers are opaque strings on the wire. They are
//! newtypes here so a comment id can never be handed to the post ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Longest identifier accepted from a client.
pub const MAX_ID_LEN: usize = 128;

fn check_id(raw: &str) -> Result<(), CoreError> {
    if raw.is_empty() {
        return Err(CoreError::InvalidId("empty identifier".into()));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(CoreError::InvalidId(format!(
            "identifier longer than {MAX_ID_LEN} bytes"
        )));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::InvalidId(format!("unexpected character in {raw:?}")));
    }
    Ok(())
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting empty or non-url-safe input.
            pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
                let raw = raw.into();
                check_id(&raw)?;
                Ok(Self(raw))
            }

            /// Build an identifier from a content hash.
            pub fn from_content(id: ContentId) -> Self {
                Self(id.to_hex())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

opaque_id!(
    /// Identifier of an image post.
    PostId
);

opaque_id!(
    /// Identifier of a comment on a post.
    CommentId
);

/// Anything that can receive votes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Post(PostId),
    Comment(CommentId),
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Subject::Post(id) => id.as_str(),
            Subject::Comment(id) => id.as_str(),
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Post(_) => SubjectKind::Post,
            Subject::Comment(_) => SubjectKind::Comment,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Post,
    Comment,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Post => f.write_str("post"),
            SubjectKind::Comment => f.write_str("comment"),
        }
    }
}

/// A 32-byte content identifier, computed as Blake3 over a signed creation.
///
/// Two creations with the same author, message and signature get the same
/// id, so a replayed creation lands on the existing row.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(pub [u8; 32]);

impl ContentId {
    /// Derive the id of a signed creation.
    pub fn derive(domain: &str, author: &[u8], message: &str, signature: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"dimgur-content-v1:");
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        hasher.update(author);
        hasher.update(b":");
        hasher.update(message.as_bytes());
        hasher.update(b":");
        hasher.update(signature);
        Self(*hasher.finalize().as_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", &self.to_hex()[..16])
    }
}
