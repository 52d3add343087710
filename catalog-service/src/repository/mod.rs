//! Entity persistence on top of a [`DocumentStore`](crate::store::DocumentStore)
//!
//! A [`Collection`] pairs one entity [`Schema`](crate::schema::Schema)
//! with the shared store and owns the CRUD rules: validation, identity,
//! timestamps, derived fields and partial-update merging. Every failure
//! comes back as a [`RepositoryError`].

mod collection;
mod error;

pub use collection::Collection;
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
