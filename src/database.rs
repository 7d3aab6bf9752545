use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::StoreError;
use crate::record::Record;
use crate::schema;

/// SQLite connection wrapper.
/// Uses parking_lot::Mutex for synchronous access (rusqlite is not Send).
///
/// The handle has two lifecycle states: open after a successful
/// [`Database::open`], closed after [`Database::close`]. Every operation
/// on a closed handle fails with [`StoreError::NotOpen`].
pub struct Database {
    conn: Arc<Mutex<Option<Connection>>>,
    path: PathBuf,
}

impl Database {
    /// Open or create a database file at the given path.
    ///
    /// Fails with [`StoreError::Connection`] if the file cannot be
    /// opened, e.g. when the containing directory does not exist. Does
    /// not create tables; call [`Database::migrate`] afterwards.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Connection(format!("pragmas: {e}")))?;

        info!(path = %path.display(), "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: path.to_owned(),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Connection(format!("pragmas: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Synchronize the schema: create any missing tables.
    ///
    /// All DDL is `IF NOT EXISTS`, so re-running against an
    /// already-matching schema is a no-op.
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(|e| StoreError::Schema(e.to_string()))
        })?;
        info!("schema synchronized");
        Ok(())
    }

    /// Release the underlying file handle.
    ///
    /// Fails with [`StoreError::Close`] if the handle was already
    /// closed, or if the driver refuses to release it (the handle then
    /// stays open).
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.conn.lock();
        match guard.take() {
            None => Err(StoreError::Close("handle already closed".into())),
            Some(conn) => match conn.close() {
                Ok(()) => {
                    info!(path = %self.path.display(), "database closed");
                    Ok(())
                }
                Err((conn, e)) => {
                    *guard = Some(conn);
                    Err(StoreError::Close(e.to_string()))
                }
            },
        }
    }

    /// Execute a closure with the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::NotOpen)?;
        f(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new row for the record.
    ///
    /// Stamps `created_at`/`updated_at` and writes the generated id back
    /// into the record. A non-null constraint violation surfaces as
    /// [`StoreError::Constraint`].
    #[instrument(skip(self, rec), fields(table = R::TABLE))]
    pub fn create<R: Record>(&self, rec: &mut R) -> Result<(), StoreError> {
        let now = Utc::now();
        let id = self.with_conn(|conn| rec.insert(conn, now))?;

        let meta = rec.meta_mut();
        meta.id = id;
        meta.created_at = Some(now);
        meta.updated_at = Some(now);
        Ok(())
    }

    /// Overwrite all mutable columns of the row matching the record's id.
    ///
    /// Full-record overwrite, no partial-field patch semantics. Fails
    /// with [`StoreError::NotFound`] if no live row has that id.
    #[instrument(skip(self, rec), fields(table = R::TABLE, id = rec.meta().id))]
    pub fn update<R: Record>(&self, rec: &mut R) -> Result<(), StoreError> {
        let id = rec.meta().id;
        let now = Utc::now();
        let affected = self.with_conn(|conn| rec.overwrite(conn, now))?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("{} {id}", R::TABLE)));
        }
        rec.meta_mut().updated_at = Some(now);
        Ok(())
    }

    /// Soft-delete the row matching the record's id.
    ///
    /// Sets `deleted_at`; the row stays physically present but is
    /// excluded from all reads. Fails with [`StoreError::NotFound`] if
    /// no live row has that id.
    #[instrument(skip(self, rec), fields(table = R::TABLE, id = rec.meta().id))]
    pub fn delete<R: Record>(&self, rec: &mut R) -> Result<(), StoreError> {
        let id = rec.meta().id;
        let now = Utc::now();
        let affected = self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "UPDATE {} SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                    R::TABLE
                ),
                rusqlite::params![now.to_rfc3339(), id],
            )
            .map_err(StoreError::from)
        })?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("{} {id}", R::TABLE)));
        }
        rec.meta_mut().deleted_at = Some(now);
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}
