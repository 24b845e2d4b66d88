use std::fmt;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub const GENERAL_TIMESTAMP: f64 = -1.0;

pub const INTERNAL_MARKER: &str = "internal";

const ID_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        Self(id.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CommentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    Public,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub timestamp: f64,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub has_drawing: bool,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_general(&self) -> bool {
        self.timestamp < 0.0
    }

    pub fn is_time_anchored(&self) -> bool {
        !self.is_general()
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    // Classification is inferred from the body text. Any comment whose text
    // contains the word "internal" is treated as internal.
    pub fn kind(&self) -> CommentKind {
        if self.text.contains(INTERNAL_MARKER) {
            CommentKind::Internal
        } else {
            CommentKind::Public
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewComment {
    pub text: String,
    pub author: String,
    pub timestamp: f64,
    pub attachments: Vec<Attachment>,
    pub has_drawing: bool,
}

impl NewComment {
    pub fn new<T: Into<String>, A: Into<String>>(text: T, author: A, timestamp: f64) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp,
            ..Self::default()
        }
    }

    pub fn general<T: Into<String>, A: Into<String>>(text: T, author: A) -> Self {
        Self::new(text, author, GENERAL_TIMESTAMP)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    pub fn into_comment(self, id: CommentId, parent_id: Option<CommentId>) -> Comment {
        Comment {
            id,
            parent_id,
            text: self.text,
            author: self.author,
            created_at: Utc::now(),
            timestamp: self.timestamp,
            attachments: self.attachments,
            has_drawing: self.has_drawing,
        }
    }
}
