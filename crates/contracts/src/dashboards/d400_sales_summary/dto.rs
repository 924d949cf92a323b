use serde::{Deserialize, Serialize};

/// Общие показатели по всему набору
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub record_count: u64,
    pub total_revenue: f64,
    /// NaN for an empty dataset
    pub avg_price: f64,
    /// NaN for an empty dataset
    pub avg_quantity: f64,
}

/// Строка сводки по группе.
///
/// `key` holds one value per grouping dimension (one for category/region/quarter,
/// two for category x region).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: Vec<String>,
    pub count: u64,
    /// Sum of `total_revenue`
    pub total_sales: f64,
    pub total_quantity: u64,
    /// NaN when `count == 0`
    pub avg_price: f64,
    /// NaN when `count == 0`
    pub avg_quantity: f64,
}

impl GroupSummary {
    /// Key rendered for display ("Electronics", "Books / North")
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

/// Результат одного прохода анализа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSummary {
    pub global: GlobalStats,
    /// Ordered by `total_sales` descending
    pub by_category: Vec<GroupSummary>,
    /// Ordered by `total_sales` descending
    pub by_region: Vec<GroupSummary>,
    /// Ordered Q1..Q4
    pub by_quarter: Vec<GroupSummary>,
    /// Category x region, ordered by `total_sales` descending
    pub by_category_region: Vec<GroupSummary>,
}
