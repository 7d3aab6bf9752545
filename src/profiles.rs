use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::record::{sealed, Record, RecordMeta};
use crate::row_helpers;

/// The local user of the platform. The system assumes at most one live
/// row; the schema does not enforce this, so [`Database::profile`]
/// deterministically returns the first-created live row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub meta: RecordMeta,
    pub name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            meta: RecordMeta::default(),
            name: name.into(),
            bio: bio.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

impl sealed::Sealed for Profile {}

impl Record for Profile {
    const TABLE: &'static str = "profiles";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn insert(&self, conn: &Connection, now: DateTime<Utc>) -> Result<i64, StoreError> {
        conn.execute(
            "INSERT INTO profiles (created_at, updated_at, name, bio, avatar_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                now.to_rfc3339(),
                now.to_rfc3339(),
                self.name,
                self.bio,
                self.avatar_url,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn overwrite(&self, conn: &Connection, now: DateTime<Utc>) -> Result<usize, StoreError> {
        conn.execute(
            "UPDATE profiles SET name = ?1, bio = ?2, avatar_url = ?3, updated_at = ?4
             WHERE id = ?5 AND deleted_at IS NULL",
            rusqlite::params![
                self.name,
                self.bio,
                self.avatar_url,
                now.to_rfc3339(),
                self.meta.id,
            ],
        )
        .map_err(StoreError::from)
    }
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> Result<Profile, StoreError> {
    let created_at: String = row_helpers::get(row, 1, "profiles", "created_at")?;
    let updated_at: String = row_helpers::get(row, 2, "profiles", "updated_at")?;
    let deleted_at: Option<String> = row_helpers::get_opt(row, 3, "profiles", "deleted_at")?;

    Ok(Profile {
        meta: RecordMeta {
            id: row_helpers::get(row, 0, "profiles", "id")?,
            created_at: Some(row_helpers::parse_timestamp(&created_at, "profiles", "created_at")?),
            updated_at: Some(row_helpers::parse_timestamp(&updated_at, "profiles", "updated_at")?),
            deleted_at: deleted_at
                .map(|raw| row_helpers::parse_timestamp(&raw, "profiles", "deleted_at"))
                .transpose()?,
        },
        name: row_helpers::get(row, 4, "profiles", "name")?,
        bio: row_helpers::get(row, 5, "profiles", "bio")?,
        avatar_url: row_helpers::get_opt(row, 6, "profiles", "avatar_url")?,
    })
}

impl Database {
    /// Get the live profile row.
    ///
    /// If more than one live row exists the first-created one (lowest
    /// id) wins.
    #[instrument(skip(self))]
    pub fn profile(&self) -> Result<Profile, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, updated_at, deleted_at, name, bio, avatar_url
                 FROM profiles WHERE deleted_at IS NULL ORDER BY id ASC LIMIT 1",
            )?;
            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => profile_from_row(row),
                None => Err(StoreError::NotFound("profile".into())),
            }
        })
    }
}
