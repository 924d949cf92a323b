use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::enums::{Category, Region};

/// Период продажи, вычисленный из `sale_date`.
///
/// Создается только из даты, поэтому `month`/`quarter`/`year` всегда
/// соответствуют дате продажи.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePeriod {
    month: String,
    quarter: String,
    year: String,
}

impl SalePeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            month: format!("{:02}", month),
            quarter: format!("Q{}", (month + 2) / 3),
            year: format!("{:04}", date.year()),
        }
    }

    /// `01`..`12`
    pub fn month(&self) -> &str {
        &self.month
    }

    /// `Q1`..`Q4`
    pub fn quarter(&self) -> &str {
        &self.quarter
    }

    pub fn year(&self) -> &str {
        &self.year
    }
}

/// Документ продажи в коллекции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Document identity assigned by the store
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub product_id: String,
    pub product_name: String,
    pub category: Category,
    pub price: f64,
    pub quantity_sold: u32,
    pub region: Region,
    pub sale_date: NaiveDate,

    /// Должно быть равно `price * quantity_sold`; хранилище это не проверяет
    pub total_revenue: f64,

    #[serde(flatten)]
    period: SalePeriod,
}

impl SalesRecord {
    /// Field names in document order
    pub const FIELD_NAMES: [&'static str; 12] = [
        "_id",
        "product_id",
        "product_name",
        "category",
        "price",
        "quantity_sold",
        "region",
        "sale_date",
        "total_revenue",
        "month",
        "quarter",
        "year",
    ];

    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        category: Category,
        region: Region,
        price: f64,
        quantity_sold: u32,
        sale_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            product_id: product_id.into(),
            product_name: product_name.into(),
            category,
            price,
            quantity_sold,
            region,
            sale_date,
            total_revenue: price * quantity_sold as f64,
            period: SalePeriod::from_date(sale_date),
        }
    }

    pub fn period(&self) -> &SalePeriod {
        &self.period
    }

    pub fn month(&self) -> &str {
        self.period.month()
    }

    pub fn quarter(&self) -> &str {
        self.period.quarter()
    }

    pub fn year(&self) -> &str {
        self.period.year()
    }

    /// Выручка по текущей цене и количеству
    pub fn expected_revenue(&self) -> f64 {
        self.price * self.quantity_sold as f64
    }

    /// True when the stored revenue matches `price * quantity_sold` within `tolerance`
    pub fn has_consistent_revenue(&self, tolerance: f64) -> bool {
        (self.total_revenue - self.expected_revenue()).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_quarters() {
        assert_eq!(SalePeriod::from_date(date(2023, 1, 15)).quarter(), "Q1");
        assert_eq!(SalePeriod::from_date(date(2023, 3, 31)).quarter(), "Q1");
        assert_eq!(SalePeriod::from_date(date(2023, 4, 1)).quarter(), "Q2");
        assert_eq!(SalePeriod::from_date(date(2023, 9, 30)).quarter(), "Q3");
        assert_eq!(SalePeriod::from_date(date(2023, 12, 31)).quarter(), "Q4");
        assert_eq!(SalePeriod::from_date(date(2023, 7, 4)).month(), "07");
        assert_eq!(SalePeriod::from_date(date(2023, 7, 4)).year(), "2023");
    }

    #[test]
    fn test_new_computes_revenue() {
        let r = SalesRecord::new(
            "P0001",
            "Product 1",
            Category::Electronics,
            Region::North,
            12.5,
            4,
            date(2023, 5, 2),
        );
        assert_eq!(r.total_revenue, 50.0);
        assert!(r.has_consistent_revenue(1e-9));
        assert_eq!(r.month(), "05");
        assert_eq!(r.quarter(), "Q2");
    }

    #[test]
    fn test_document_shape() {
        let mut r = SalesRecord::new(
            "P0002",
            "Product 2",
            Category::HomeAndGarden,
            Region::Central,
            10.0,
            3,
            date(2023, 11, 20),
        );
        r.id = Some("abc".to_string());

        let value = serde_json::to_value(&r).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, SalesRecord::FIELD_NAMES.to_vec());
        assert_eq!(value["category"], "Home & Garden");
        assert_eq!(value["sale_date"], "2023-11-20");
        assert_eq!(value["quarter"], "Q4");

        let back: SalesRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_inconsistent_revenue_detected() {
        let mut r = SalesRecord::new(
            "P0003",
            "Product 3",
            Category::Books,
            Region::East,
            20.0,
            5,
            date(2023, 2, 1),
        );
        r.price *= 0.9;
        assert!(!r.has_consistent_revenue(1e-6));
    }
}
