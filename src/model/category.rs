//! Category model.
//!
//! Categories group projects through a many-to-many link. The `name` is the
//! stable natural key used to match categories across stores.

use serde::{Deserialize, Serialize};

/// A category in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Surrogate identifier (`cat_` prefix).
    pub id: String,

    /// Unique, stable key.
    pub name: String,

    /// Human-facing label.
    pub display_name: String,

    pub is_published: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Category {
    /// Create a new category with a fresh id.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, is_published: bool) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("cat"),
            name: name.into(),
            display_name: display_name.into(),
            is_published,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category() {
        let category = Category::new("wood", "Wood", true);

        assert!(category.id.starts_with("cat_"));
        assert_eq!(category.id.len(), "cat_".len() + 12);
        assert_eq!(category.name, "wood");
        assert!(category.is_published);
        assert_eq!(category.created_at, category.updated_at);
    }
}
