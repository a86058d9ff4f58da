//! Repository implementations for database access
//!
//! Each repository borrows the pool and follows these patterns:
//! - Natural-key duplicates are reported as `DbError::Duplicate`
//! - Missing ids are reported as `DbError::NotFound`
//! - Cascades run inside the deleting transaction

pub mod associations;
pub mod insects;
pub mod trees;

pub use associations::{
    Association, AssociationRepo, InsectRef, InsectWithTrees, TreeRef, TreeWithInsects,
};
pub use insects::{Insect, InsectRepo, InsectSummary};
pub use trees::{Tree, TreeRepo, TreeSummary};

use chrono::{SecondsFormat, Utc};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("{resource} with this name already exists")]
    Duplicate { resource: &'static str, name: String },

    #[error("tree {tree_id} is already associated with insect {insect_id}")]
    AlreadyAssociated { tree_id: i64, insect_id: i64 },
}

/// RFC 3339 timestamp for `created_at` / `updated_at` columns.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Pattern for a literal substring match with `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("oak"), "%oak%");
        assert_eq!(like_pattern("50%_x"), "%50\\%\\_x%");
    }

    #[test]
    fn not_found_message() {
        let err = DbError::NotFound {
            resource: "Tree",
            id: 4,
        };
        assert_eq!(err.to_string(), "Tree not found");
    }
}
