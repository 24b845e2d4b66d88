use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{TimeZone, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::comment::{Attachment, Comment, CommentId, NewComment};
use crate::data::{ensure_import_target, ensure_reply_target, CommentStore, StoreError};

const COMMENT_COLUMNS: &str =
    "id, parent_id, text, author, created_at, timestamp, has_drawing";

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "foreign_keys", &"ON")
            .context("storage: enable foreign keys")?;
        conn.pragma_update(None, "busy_timeout", &5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;
        debug!("storage: opened {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    fn load_one(conn: &Connection, id: &CommentId) -> Result<Option<Comment>> {
        let comment = conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id.as_str()],
                comment_from_row,
            )
            .optional()
            .context("storage: query comment by id")?;
        let Some(mut comment) = comment else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            r#"
SELECT comment_id, url, mime, name
FROM attachments
WHERE comment_id = ?1
ORDER BY position ASC
"#,
        )?;
        comment.attachments = stmt
            .query_map(params![id.as_str()], attachment_from_row)?
            .map(|row| row.map(|(_, attachment)| attachment))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(comment))
    }

    fn write(&self, comment: &Comment) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin transaction")?;
        insert_comment(&tx, comment)?;
        tx.commit().context("storage: commit comment")?;
        Ok(())
    }
}

impl CommentStore for Store {
    fn comments(&self) -> Result<Vec<Comment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments ORDER BY seq ASC"
        ))?;
        let mut comments = stmt
            .query_map([], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("storage: list comments")?;

        let mut stmt = conn.prepare(
            r#"
SELECT comment_id, url, mime, name
FROM attachments
ORDER BY comment_id ASC, position ASC
"#,
        )?;
        let mut attachments: HashMap<String, Vec<Attachment>> = HashMap::new();
        for row in stmt.query_map([], attachment_from_row)? {
            let (comment_id, attachment) = row.context("storage: list attachments")?;
            attachments.entry(comment_id).or_default().push(attachment);
        }
        for comment in &mut comments {
            if let Some(found) = attachments.remove(comment.id.as_str()) {
                comment.attachments = found;
            }
        }
        debug!("storage: loaded {} comments", comments.len());
        Ok(comments)
    }

    fn get(&self, id: &CommentId) -> Result<Option<Comment>> {
        let conn = self.conn.lock();
        Self::load_one(&conn, id)
    }

    fn add(&self, comment: NewComment) -> Result<Comment> {
        if comment.is_blank() {
            bail!(StoreError::EmptyText);
        }
        let comment = comment.into_comment(CommentId::generate(), None);
        self.write(&comment)?;
        info!("storage: added comment {}", comment.id);
        Ok(comment)
    }

    fn reply(&self, parent: &CommentId, mut comment: NewComment) -> Result<Comment> {
        if comment.is_blank() {
            bail!(StoreError::EmptyText);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin transaction")?;
        let target = Self::load_one(&tx, parent)?;
        comment.timestamp = ensure_reply_target(target.as_ref(), parent)?;
        let reply = comment.into_comment(CommentId::generate(), Some(parent.clone()));
        insert_comment(&tx, &reply)?;
        tx.commit().context("storage: commit reply")?;
        info!("storage: added reply {} to {}", reply.id, parent);
        Ok(reply)
    }

    fn delete(&self, id: &CommentId) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin transaction")?;
        let affected: i64 = tx.query_row(
            "SELECT COUNT(*) FROM comments WHERE id = ?1 OR parent_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        if affected == 0 {
            bail!(StoreError::NotFound(id.clone()));
        }
        tx.execute("DELETE FROM comments WHERE id = ?1", params![id.as_str()])
            .context("storage: delete comment")?;
        tx.commit().context("storage: commit delete")?;
        info!("storage: deleted comment {id} ({affected} records)");
        Ok(affected as usize)
    }

    fn import(&self, comment: Comment) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin transaction")?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)",
            params![comment.id.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            bail!(StoreError::Duplicate(comment.id));
        }
        let parent = match &comment.parent_id {
            Some(parent_id) => Self::load_one(&tx, parent_id)?,
            None => None,
        };
        ensure_import_target(parent.as_ref(), &comment)?;
        insert_comment(&tx, &comment)
            .with_context(|| format!("storage: import comment {}", comment.id))?;
        tx.commit().context("storage: commit import")?;
        Ok(())
    }
}

fn insert_comment(tx: &Transaction<'_>, comment: &Comment) -> Result<()> {
    tx.execute(
        r#"
INSERT INTO comments (id, parent_id, text, author, created_at, timestamp, has_drawing)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#,
        params![
            comment.id.as_str(),
            comment.parent_id.as_ref().map(CommentId::as_str),
            comment.text,
            comment.author,
            comment.created_at.timestamp_millis(),
            comment.timestamp,
            comment.has_drawing,
        ],
    )
    .context("storage: insert comment")?;

    for (position, attachment) in comment.attachments.iter().enumerate() {
        tx.execute(
            r#"
INSERT INTO attachments (comment_id, position, url, mime, name)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
            params![
                comment.id.as_str(),
                position as i64,
                attachment.url,
                attachment.mime,
                attachment.name,
            ],
        )
        .context("storage: insert attachment")?;
    }
    Ok(())
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let id: String = row.get(0)?;
    let parent_id: Option<String> = row.get(1)?;
    let created: i64 = row.get(4)?;
    let created_at = Utc
        .timestamp_millis_opt(created)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, created))?;
    Ok(Comment {
        id: id.into(),
        parent_id: parent_id.map(CommentId::from),
        text: row.get(2)?,
        author: row.get(3)?,
        created_at,
        timestamp: row.get(5)?,
        attachments: Vec::new(),
        has_drawing: row.get(6)?,
    })
}

fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<(String, Attachment)> {
    Ok((
        row.get(0)?,
        Attachment {
            url: row.get(1)?,
            mime: row.get(2)?,
            name: row.get(3)?,
        },
    ))
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("storage: apply migration {version}"))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![r#"
CREATE TABLE IF NOT EXISTS comments (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  id TEXT NOT NULL UNIQUE,
  parent_id TEXT REFERENCES comments(id) ON DELETE CASCADE,
  text TEXT NOT NULL,
  author TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  timestamp REAL NOT NULL,
  has_drawing INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS attachments (
  comment_id TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
  position INTEGER NOT NULL,
  url TEXT NOT NULL,
  mime TEXT NOT NULL,
  name TEXT NOT NULL,
  PRIMARY KEY (comment_id, position)
);

CREATE INDEX IF NOT EXISTS idx_comments_parent_id ON comments(parent_id);
"#]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("review-notes").join("comments.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view;
    use crate::query::Query;
    use tempfile::tempdir;

    fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(Options {
            path: Some(dir.path().join("comments.db")),
        })
        .unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("comments.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn comments_keep_creation_order_and_attachments() {
        let (_dir, store) = open_temp();
        let mut first = NewComment::new("grade is off", "amy", 30.0);
        first.attachments = vec![
            Attachment {
                url: "file:///tmp/b.png".into(),
                mime: "image/png".into(),
                name: "b.png".into(),
            },
            Attachment {
                url: "file:///tmp/a.mov".into(),
                mime: "video/quicktime".into(),
                name: "a.mov".into(),
            },
        ];
        first.has_drawing = true;
        let first = store.add(first).unwrap();
        let second = store.add(NewComment::general("overall fine", "bob")).unwrap();

        let all = store.comments().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].attachments[0].name, "b.png");
        assert_eq!(all[0].attachments[1].mime, "video/quicktime");
        assert!(all[0].has_drawing);
        assert_eq!(all[1].id, second.id);
        assert!(all[1].is_general());
        assert_eq!(
            all[0].created_at.timestamp_millis(),
            first.created_at.timestamp_millis()
        );
    }

    #[test]
    fn delete_cascades_to_replies() {
        let (_dir, store) = open_temp();
        let parent = store.add(NewComment::new("cut", "amy", 4.0)).unwrap();
        let reply = store
            .reply(&parent.id, NewComment::general("yes", "bob"))
            .unwrap();
        assert_eq!(reply.timestamp, 4.0);
        let other = store.add(NewComment::new("keep", "cy", 8.0)).unwrap();

        assert_eq!(store.delete(&parent.id).unwrap(), 2);
        let remaining = store.comments().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, other.id);
        assert!(store.get(&reply.id).unwrap().is_none());

        let err = store.delete(&parent.id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn nested_replies_are_rejected() {
        let (_dir, store) = open_temp();
        let parent = store.add(NewComment::new("cut", "amy", 4.0)).unwrap();
        let reply = store
            .reply(&parent.id, NewComment::general("yes", "bob"))
            .unwrap();
        let err = store
            .reply(&reply.id, NewComment::general("no", "cy"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NestedReply(_))
        ));
    }

    #[test]
    fn import_preserves_ids_and_feeds_the_view() {
        let (_dir, store) = open_temp();
        let parent = NewComment::new("hello", "Bob", 5.0).into_comment("1".into(), None);
        let note = NewComment::new("internal note", "Amy", 2.0).into_comment("2".into(), None);
        let reply = NewComment::new("ok", "Cy", 5.0).into_comment("3".into(), Some("1".into()));
        for comment in [parent, note, reply] {
            store.import(comment).unwrap();
        }
        assert!(store
            .import(NewComment::new("dup", "x", 1.0).into_comment("1".into(), None))
            .is_err());

        let all = store.comments().unwrap();
        let derived = view::derive_view(&all, &Query::default());
        let order: Vec<_> = derived
            .threads
            .iter()
            .map(|t| (t.comment.comment.id.to_string(), t.comment.number))
            .collect();
        assert_eq!(
            order,
            vec![("2".to_string(), Some(1)), ("1".to_string(), Some(2))]
        );
        assert_eq!(derived.threads[1].replies.len(), 1);
    }

    #[test]
    fn import_rejects_nested_and_orphan_replies() {
        let (_dir, store) = open_temp();
        let parent = NewComment::new("cut", "amy", 4.0).into_comment("p".into(), None);
        let reply = NewComment::new("yes", "bob", 4.0).into_comment("r".into(), Some("p".into()));
        store.import(parent).unwrap();
        store.import(reply).unwrap();

        let nested = NewComment::new("no", "cy", 4.0).into_comment("n".into(), Some("r".into()));
        let err = store.import(nested).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NestedReply(_))
        ));

        let orphan =
            NewComment::new("lost", "cy", 3.0).into_comment("o".into(), Some("gone".into()));
        let err = store.import(orphan).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
        assert_eq!(store.comments().unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_created_at_is_an_error() {
        let (_dir, store) = open_temp();
        store.add(NewComment::new("fine", "amy", 1.0)).unwrap();
        store
            .conn
            .lock()
            .execute("UPDATE comments SET created_at = ?1", params![i64::MAX])
            .unwrap();
        assert!(store.comments().is_err());
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("comments.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        store.add(NewComment::new("persist", "amy", 1.0)).unwrap();
        store.close().unwrap();

        let store = Store::open(Options { path: Some(path) }).unwrap();
        assert_eq!(store.comments().unwrap().len(), 1);
    }
}
