//! Embedded SQLite persistence for a self-hosted, single-user
//! publishing platform.
//!
//! The surface is a [`Database`] handle plus two entity models:
//! [`Post`] and [`Profile`]. Both compose the store-managed audit
//! fields in [`RecordMeta`] and participate in the sealed [`Record`]
//! trait, which fixes the set of persistable entities at compile time.
//!
//! All operations are synchronous and block on file I/O. The handle is
//! `Clone` and internally mutex-guarded, so sharing it across threads
//! serializes every operation; no further coordination is added.
//!
//! ```no_run
//! use quill_store::{Database, Post};
//!
//! # fn main() -> Result<(), quill_store::StoreError> {
//! let db = Database::open(std::path::Path::new("quill.db"))?;
//! db.migrate()?;
//!
//! let mut post = Post::new("Hello", "First post", true);
//! db.create(&mut post)?;
//! let fetched = db.post_by_id(post.meta.id)?;
//! assert_eq!(fetched.title, "Hello");
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod posts;
pub mod profiles;
pub mod record;
pub mod row_helpers;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use posts::Post;
pub use profiles::Profile;
pub use record::{Record, RecordMeta};
