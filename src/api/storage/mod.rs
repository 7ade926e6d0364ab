//! SQL storage for accounts and owner-scoped resources.
//!
//! Every comic/character query filters by `owner_id`. Rows are never deleted;
//! they move through the `lifecycle` column instead.

pub mod characters;
pub mod comics;
pub mod users;

use tracing::{info_span, Span};

/// Tombstone state shared by comics and characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Archived,
    Removed,
}

impl Lifecycle {
    /// Returns the value stored in the `lifecycle` column.
    /// Must match the `CHECK` constraint in `sql/schema.sql`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Removed => "removed",
        }
    }

    #[must_use]
    pub const fn from_archived(archived: bool) -> Self {
        if archived {
            Self::Archived
        } else {
            Self::Active
        }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}
