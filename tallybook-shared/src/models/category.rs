/// Category model and tree validation
///
/// Categories form a self-referential tree within a book. The relational
/// schema does not enforce acyclicity or same-book parentage, so both are
/// validated here at write time: the book's categories are loaded as an
/// arena of nodes indexed by id and the parent chain is walked explicitly.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE category (
///     id BIGSERIAL PRIMARY KEY,
///     book_id BIGINT NOT NULL REFERENCES book(id),
///     name VARCHAR(255) NOT NULL,
///     parent_category_id BIGINT REFERENCES category(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A category within a book's tree
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique category id
    pub id: i64,

    /// Owning book
    pub book_id: i64,

    /// Display name
    pub name: String,

    /// Optional parent within the same book
    pub parent_category_id: Option<i64>,

    /// When the category was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategory {
    /// Owning book
    pub book_id: i64,

    /// Display name
    pub name: String,

    /// Optional parent, validated before insert
    pub parent_category_id: Option<i64>,
}

/// Rejections produced by category-tree validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CategoryTreeError {
    /// The parent id does not exist in the book snapshot
    #[error("parent category not found")]
    ParentNotFound,

    /// The parent belongs to a different book
    #[error("parent category belongs to a different book")]
    CrossBookParent,

    /// A category cannot be its own parent
    #[error("category cannot be its own parent")]
    SelfParent,

    /// The new parent is a descendant of the category being moved
    #[error("category parent would create a cycle")]
    Cycle,
}

/// Validates a parent assignment against the book's category snapshot
///
/// `snapshot` must hold the categories of `book_id` (rows from other books
/// are tolerated and treated as cross-book). `child_id` is `None` for a
/// fresh insert and `Some(id)` when re-parenting an existing category.
///
/// Checks, in order:
/// 1. the parent exists,
/// 2. the parent belongs to `book_id`,
/// 3. the parent is not the child itself,
/// 4. walking the parent chain upward never reaches the child (no cycle).
///
/// The walk is bounded by the snapshot size, so a pre-existing corrupt
/// cycle in legacy data terminates as `Cycle` instead of looping.
pub fn validate_parent(
    snapshot: &[Category],
    book_id: i64,
    parent_id: i64,
    child_id: Option<i64>,
) -> Result<(), CategoryTreeError> {
    let arena: HashMap<i64, &Category> = snapshot.iter().map(|c| (c.id, c)).collect();

    let parent = arena.get(&parent_id).ok_or(CategoryTreeError::ParentNotFound)?;
    if parent.book_id != book_id {
        return Err(CategoryTreeError::CrossBookParent);
    }

    let child_id = match child_id {
        Some(id) => id,
        None => return Ok(()), // a fresh node cannot close a cycle
    };
    if parent_id == child_id {
        return Err(CategoryTreeError::SelfParent);
    }

    // Walk upward from the new parent; reaching the child means the parent
    // sits inside the child's subtree.
    let mut cursor = Some(parent_id);
    let mut steps = 0usize;
    while let Some(id) = cursor {
        if id == child_id {
            return Err(CategoryTreeError::Cycle);
        }
        steps += 1;
        if steps > snapshot.len() {
            return Err(CategoryTreeError::Cycle);
        }
        cursor = arena.get(&id).and_then(|c| c.parent_category_id);
    }

    Ok(())
}
