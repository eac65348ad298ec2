//! Catalog entity: a collectible figure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A collectible in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Product line the piece belongs to.
    pub category: Category,
    /// Retail price.
    pub price: f64,
    /// Release date.
    pub released_on: NaiveDate,
}

/// Product line of a collectible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Film,
    Series,
    Anime,
    Sports,
    Other,
}

impl Category {
    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Series => "series",
            Self::Anime => "anime",
            Self::Sports => "sports",
            Self::Other => "other",
        }
    }

    /// Parse the stored string form back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "film" => Some(Self::Film),
            "series" => Some(Self::Series),
            "anime" => Some(Self::Anime),
            "sports" => Some(Self::Sports),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_storage_roundtrip() {
        for cat in [
            Category::Film,
            Category::Series,
            Category::Anime,
            Category::Sports,
            Category::Other,
        ] {
            assert_eq!(Category::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(Category::parse("funko"), None);
    }
}
