use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Store-managed audit fields shared by every persistable entity.
/// Composed by value into each model rather than promoted implicitly.
///
/// `id` is the SQLite rowid; zero means the record has not been
/// persisted yet. `deleted_at` being set marks a soft-deleted row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The closed set of persistable entities. Sealed so the set is fixed
/// at compile time; implemented by `Post` and `Profile` only.
///
/// Entity-specific SQL lives in the implementations; the generic
/// lifecycle (id assignment, timestamp stamping, soft delete, zero-rows
/// detection) lives in [`Database`](crate::Database).
pub trait Record: sealed::Sealed {
    const TABLE: &'static str;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Insert all columns as a new row stamped with `now`; returns the
    /// generated rowid.
    fn insert(&self, conn: &Connection, now: DateTime<Utc>) -> Result<i64, StoreError>;

    /// Overwrite all mutable columns of the live row matching this
    /// record's id, restamping `updated_at` with `now`; returns the
    /// number of rows affected.
    fn overwrite(&self, conn: &Connection, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
