use serde::{Deserialize, Serialize};

/// Категории товаров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    Sports,
}

impl Category {
    /// Значение, которое хранится в документах
    pub fn label(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Books => "Books",
            Category::HomeAndGarden => "Home & Garden",
            Category::Sports => "Sports",
        }
    }

    pub fn all() -> Vec<Category> {
        vec![
            Category::Electronics,
            Category::Clothing,
            Category::Books,
            Category::HomeAndGarden,
            Category::Sports,
        ]
    }

    /// Разбор из сохраненного значения
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip_through_serde() {
        let json = serde_json::to_string(&Category::HomeAndGarden).unwrap();
        assert_eq!(json, "\"Home & Garden\"");
        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Category::HomeAndGarden);
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Category::from_label("Books"), Some(Category::Books));
        assert_eq!(Category::from_label("books"), None);
        assert_eq!(Category::all().len(), 5);
    }
}
