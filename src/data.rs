use anyhow::{bail, Result};
use log::info;
use parking_lot::RwLock;

use crate::comment::{Comment, CommentId, NewComment};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("comment {0} not found")]
    NotFound(CommentId),
    #[error("comment {0} is a reply; replies cannot have replies")]
    NestedReply(CommentId),
    #[error("comment {0} already exists")]
    Duplicate(CommentId),
    #[error("comment text is required")]
    EmptyText,
}

pub trait CommentStore: Send + Sync {
    fn comments(&self) -> Result<Vec<Comment>>;
    fn get(&self, id: &CommentId) -> Result<Option<Comment>>;
    fn add(&self, comment: NewComment) -> Result<Comment>;
    // Replies inherit the parent's timestamp.
    fn reply(&self, parent: &CommentId, comment: NewComment) -> Result<Comment>;
    fn delete(&self, id: &CommentId) -> Result<usize>;
    fn import(&self, comment: Comment) -> Result<()>;
}

pub fn ensure_reply_target(parent: Option<&Comment>, parent_id: &CommentId) -> Result<f64> {
    let Some(parent) = parent else {
        bail!(StoreError::NotFound(parent_id.clone()));
    };
    if parent.is_reply() {
        bail!(StoreError::NestedReply(parent_id.clone()));
    }
    Ok(parent.timestamp)
}

pub fn ensure_import_target(parent: Option<&Comment>, comment: &Comment) -> Result<()> {
    if let Some(parent_id) = &comment.parent_id {
        ensure_reply_target(parent, parent_id)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    comments: RwLock<Vec<Comment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comments(comments: Vec<Comment>) -> Self {
        Self {
            comments: RwLock::new(comments),
        }
    }
}

impl CommentStore for MemoryStore {
    fn comments(&self) -> Result<Vec<Comment>> {
        Ok(self.comments.read().clone())
    }

    fn get(&self, id: &CommentId) -> Result<Option<Comment>> {
        Ok(self.comments.read().iter().find(|c| &c.id == id).cloned())
    }

    fn add(&self, comment: NewComment) -> Result<Comment> {
        if comment.is_blank() {
            bail!(StoreError::EmptyText);
        }
        let comment = comment.into_comment(CommentId::generate(), None);
        self.comments.write().push(comment.clone());
        info!("added comment {}", comment.id);
        Ok(comment)
    }

    fn reply(&self, parent: &CommentId, mut comment: NewComment) -> Result<Comment> {
        if comment.is_blank() {
            bail!(StoreError::EmptyText);
        }
        let mut comments = self.comments.write();
        comment.timestamp =
            ensure_reply_target(comments.iter().find(|c| &c.id == parent), parent)?;
        let reply = comment.into_comment(CommentId::generate(), Some(parent.clone()));
        comments.push(reply.clone());
        info!("added reply {} to {}", reply.id, parent);
        Ok(reply)
    }

    fn delete(&self, id: &CommentId) -> Result<usize> {
        let mut comments = self.comments.write();
        if !comments.iter().any(|c| &c.id == id) {
            bail!(StoreError::NotFound(id.clone()));
        }
        let before = comments.len();
        comments.retain(|c| &c.id != id && c.parent_id.as_ref() != Some(id));
        let removed = before - comments.len();
        info!("deleted comment {id} ({removed} records)");
        Ok(removed)
    }

    fn import(&self, comment: Comment) -> Result<()> {
        let mut comments = self.comments.write();
        if comments.iter().any(|c| c.id == comment.id) {
            bail!(StoreError::Duplicate(comment.id));
        }
        let parent = comment
            .parent_id
            .as_ref()
            .and_then(|pid| comments.iter().find(|c| &c.id == pid));
        ensure_import_target(parent, &comment)?;
        comments.push(comment);
        Ok(())
    }
}
