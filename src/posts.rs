use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::record::{sealed, Record, RecordMeta};
use crate::row_helpers;

/// One publishable article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub meta: RecordMeta,
    pub title: String,
    pub content: String,
    pub published: bool,
}

impl Post {
    pub fn new(title: impl Into<String>, content: impl Into<String>, published: bool) -> Self {
        Self {
            meta: RecordMeta::default(),
            title: title.into(),
            content: content.into(),
            published,
        }
    }
}

impl sealed::Sealed for Post {}

impl Record for Post {
    const TABLE: &'static str = "posts";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn insert(&self, conn: &Connection, now: DateTime<Utc>) -> Result<i64, StoreError> {
        conn.execute(
            "INSERT INTO posts (created_at, updated_at, title, content, published)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                now.to_rfc3339(),
                now.to_rfc3339(),
                self.title,
                self.content,
                self.published,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn overwrite(&self, conn: &Connection, now: DateTime<Utc>) -> Result<usize, StoreError> {
        conn.execute(
            "UPDATE posts SET title = ?1, content = ?2, published = ?3, updated_at = ?4
             WHERE id = ?5 AND deleted_at IS NULL",
            rusqlite::params![
                self.title,
                self.content,
                self.published,
                now.to_rfc3339(),
                self.meta.id,
            ],
        )
        .map_err(StoreError::from)
    }
}

fn post_from_row(row: &rusqlite::Row<'_>) -> Result<Post, StoreError> {
    let created_at: String = row_helpers::get(row, 1, "posts", "created_at")?;
    let updated_at: String = row_helpers::get(row, 2, "posts", "updated_at")?;
    let deleted_at: Option<String> = row_helpers::get_opt(row, 3, "posts", "deleted_at")?;

    Ok(Post {
        meta: RecordMeta {
            id: row_helpers::get(row, 0, "posts", "id")?,
            created_at: Some(row_helpers::parse_timestamp(&created_at, "posts", "created_at")?),
            updated_at: Some(row_helpers::parse_timestamp(&updated_at, "posts", "updated_at")?),
            deleted_at: deleted_at
                .map(|raw| row_helpers::parse_timestamp(&raw, "posts", "deleted_at"))
                .transpose()?,
        },
        title: row_helpers::get(row, 4, "posts", "title")?,
        content: row_helpers::get(row, 5, "posts", "content")?,
        published: row_helpers::get(row, 6, "posts", "published")?,
    })
}

const POST_COLUMNS: &str = "id, created_at, updated_at, deleted_at, title, content, published";

impl Database {
    /// Get the live (non-soft-deleted) post with the given id.
    #[instrument(skip(self))]
    pub fn post_by_id(&self, id: i64) -> Result<Post, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE id = ?1 AND deleted_at IS NULL"
            ))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => post_from_row(row),
                None => Err(StoreError::NotFound(format!("post {id}"))),
            }
        })
    }

    /// List all live posts, newest first.
    #[instrument(skip(self))]
    pub fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE deleted_at IS NULL ORDER BY id DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut posts = Vec::new();
            while let Some(row) = rows.next()? {
                posts.push(post_from_row(row)?);
            }
            Ok(posts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn create_assigns_id() {
        let db = test_db();
        let mut post = Post::new("Test Post", "This is a test post content", true);
        db.create(&mut post).unwrap();
        assert_ne!(post.meta.id, 0);
        assert!(post.meta.created_at.is_some());
        assert!(post.meta.updated_at.is_some());
    }

    #[test]
    fn created_ids_are_unique_and_increasing() {
        let db = test_db();
        let mut first = Post::new("One", "1", false);
        let mut second = Post::new("Two", "2", false);
        db.create(&mut first).unwrap();
        db.create(&mut second).unwrap();
        assert!(second.meta.id > first.meta.id);
    }

    #[test]
    fn create_then_fetch_roundtrips() {
        let db = test_db();
        let mut post = Post::new("A", "B", true);
        db.create(&mut post).unwrap();

        let fetched = db.post_by_id(post.meta.id).unwrap();
        assert_eq!(fetched.meta.id, post.meta.id);
        assert_eq!(fetched.title, "A");
        assert_eq!(fetched.content, "B");
        assert!(fetched.published);
    }

    #[test]
    fn fetch_nonexistent_fails() {
        let db = test_db();
        let result = db.post_by_id(99999);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn empty_strings_are_accepted() {
        // SQLite does not reject empty strings for NOT NULL columns
        let db = test_db();
        let mut post = Post::new("", "", true);
        db.create(&mut post).unwrap();
        assert_ne!(post.meta.id, 0);
    }

    #[test]
    fn update_overwrites_all_fields() {
        let db = test_db();
        let mut post = Post::new("Original Title", "Original Content", false);
        db.create(&mut post).unwrap();

        post.title = "Updated Title".into();
        post.content = "Updated Content".into();
        post.published = true;
        db.update(&mut post).unwrap();

        let fetched = db.post_by_id(post.meta.id).unwrap();
        assert_eq!(fetched.title, "Updated Title");
        assert_eq!(fetched.content, "Updated Content");
        assert!(fetched.published);
    }

    #[test]
    fn update_unknown_id_fails() {
        let db = test_db();
        let mut post = Post::new("Ghost", "No row", false);
        post.meta.id = 99999;
        assert!(matches!(db.update(&mut post), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_then_fetch_fails() {
        let db = test_db();
        let mut post = Post::new("Post to Delete", "This will be deleted", true);
        db.create(&mut post).unwrap();
        let id = post.meta.id;

        db.delete(&mut post).unwrap();
        assert!(post.meta.is_deleted());
        assert!(matches!(db.post_by_id(id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_twice_fails() {
        let db = test_db();
        let mut post = Post::new("Once", "Only", false);
        db.create(&mut post).unwrap();
        db.delete(&mut post).unwrap();
        assert!(matches!(db.delete(&mut post), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_deleted_post_fails() {
        let db = test_db();
        let mut post = Post::new("Gone", "Soon", false);
        db.create(&mut post).unwrap();
        db.delete(&mut post).unwrap();

        post.title = "Resurrected".into();
        assert!(matches!(db.update(&mut post), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_excludes_deleted_and_orders_newest_first() {
        let db = test_db();
        let mut first = Post::new("Post 1", "Content 1", true);
        let mut second = Post::new("Post 2", "Content 2", false);
        let mut third = Post::new("Post 3", "Content 3", true);
        db.create(&mut first).unwrap();
        db.create(&mut second).unwrap();
        db.create(&mut third).unwrap();

        db.delete(&mut second).unwrap();

        let posts = db.list_posts().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Post 3");
        assert_eq!(posts[1].title, "Post 1");
    }
}
