//! Запросы, pipeline агрегации и индексы для демонстрации.
//!
//! Здесь только чистые функции; в хранилище их отправляет executor.

use contracts::enums::Category;
use serde_json::{json, Value};

use crate::shared::docstore::FindOptions;

/// Топ-5 записей по выручке (только название и выручка)
pub fn top_revenue() -> (Value, FindOptions) {
    (
        json!({}),
        FindOptions::default()
            .projection(json!({"product_name": 1, "total_revenue": 1}))
            .sort(json!({"total_revenue": -1}))
            .limit(5),
    )
}

pub fn count_by_category() -> Vec<Value> {
    vec![
        json!({"$group": {"_id": "$category", "count": {"$sum": 1}}}),
        json!({"$sort": {"count": -1}}),
    ]
}

pub fn avg_price_by_region() -> Vec<Value> {
    vec![
        json!({"$group": {"_id": "$region", "avg_price": {"$avg": "$price"}}}),
        json!({"$sort": {"avg_price": -1}}),
    ]
}

/// Выручка по месяцам, `01`..`12`
pub fn revenue_by_month() -> Vec<Value> {
    vec![
        json!({"$group": {"_id": "$month", "total_revenue": {"$sum": "$total_revenue"}}}),
        json!({"$sort": {"_id": 1}}),
    ]
}

pub fn category_region_index() -> Value {
    json!({"category": 1, "region": 1})
}

/// 10 лучших пар category/region по выручке
pub fn category_region_matrix() -> Vec<Value> {
    vec![
        json!({"$group": {
            "_id": {"category": "$category", "region": "$region"},
            "total_revenue": {"$sum": "$total_revenue"},
            "avg_quantity": {"$avg": "$quantity_sold"}
        }}),
        json!({"$sort": {"total_revenue": -1}}),
        json!({"$limit": 10}),
    ]
}

/// Записи `category` с ценой строго выше `min_price`
pub fn premium_products(category: Category, min_price: f64) -> (Value, FindOptions) {
    (
        json!({"category": category.label(), "price": {"$gt": min_price}}),
        FindOptions::default().projection(json!({"product_name": 1, "price": 1})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_filter_shape() {
        let (filter, options) = premium_products(Category::Electronics, 500.0);
        assert_eq!(filter, json!({"category": "Electronics", "price": {"$gt": 500.0}}));
        assert_eq!(options.limit, None);
        assert_eq!(options.projection, Some(json!({"product_name": 1, "price": 1})));
    }

    #[test]
    fn test_top_revenue_options() {
        let (filter, options) = top_revenue();
        assert_eq!(filter, json!({}));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.sort, Some(json!({"total_revenue": -1})));
    }

    #[test]
    fn test_matrix_limits_to_ten() {
        let pipeline = category_region_matrix();
        assert_eq!(pipeline.last(), Some(&json!({"$limit": 10})));
        assert_eq!(
            pipeline[0]["$group"]["_id"],
            json!({"category": "$category", "region": "$region"})
        );
    }
}
