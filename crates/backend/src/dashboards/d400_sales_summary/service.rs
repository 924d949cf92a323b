//! Сводки по группам, рассчитанные по загруженным записям.
//!
//! Все функции чистые, от `&[SalesRecord]`; хранилище не используется,
//! поэтому цифры проверяются без БД.

use contracts::dashboards::d400_sales_summary::{GlobalStats, GroupSummary, SalesSummary};
use contracts::domain::a001_sales_record::SalesRecord;
use contracts::enums::{Category, Region};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Поле группировки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Category,
    Region,
    Quarter,
}

impl Dimension {
    pub fn value(&self, record: &SalesRecord) -> String {
        match self {
            Dimension::Category => record.category.label().to_string(),
            Dimension::Region => record.region.label().to_string(),
            Dimension::Quarter => record.quarter().to_string(),
        }
    }
}

const QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    count: u64,
    total_sales: f64,
    price_sum: f64,
    quantity_sum: u64,
}

impl GroupAccumulator {
    fn add(&mut self, record: &SalesRecord) {
        self.count += 1;
        self.total_sales += record.total_revenue;
        self.price_sum += record.price;
        self.quantity_sum += u64::from(record.quantity_sold);
    }

    fn finish(self, key: Vec<String>) -> GroupSummary {
        GroupSummary {
            key,
            count: self.count,
            total_sales: self.total_sales,
            total_quantity: self.quantity_sum,
            avg_price: mean(self.price_sum, self.count),
            avg_quantity: mean(self.quantity_sum as f64, self.count),
        }
    }
}

/// Строка для пустой группы: нулевые суммы, средние NaN
pub fn empty_group(key: Vec<String>) -> GroupSummary {
    GroupAccumulator::default().finish(key)
}

/// Группировка `records` по `dimensions`; строки в порядке появления ключа
pub fn group_by(records: &[SalesRecord], dimensions: &[Dimension]) -> Vec<GroupSummary> {
    let mut groups: Vec<(Vec<String>, GroupAccumulator)> = Vec::new();
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();

    for record in records {
        let key: Vec<String> = dimensions.iter().map(|d| d.value(record)).collect();
        let index = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push((key, GroupAccumulator::default()));
            groups.len() - 1
        });
        groups[index].1.add(record);
    }

    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key))
        .collect()
}

/// Добавить пустые строки для значений без записей
fn with_all_labels(mut rows: Vec<GroupSummary>, labels: &[&str]) -> Vec<GroupSummary> {
    for label in labels {
        if !rows.iter().any(|row| row.key.len() == 1 && row.key[0] == *label) {
            rows.push(empty_group(vec![label.to_string()]));
        }
    }
    rows
}

/// Стабильная сортировка по `total_sales` по убыванию
pub fn sort_by_sales_desc(rows: &mut [GroupSummary]) {
    rows.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(Ordering::Equal)
    });
}

pub fn global_stats(records: &[SalesRecord]) -> GlobalStats {
    let count = records.len() as u64;
    let total_revenue: f64 = records.iter().map(|r| r.total_revenue).sum();
    let price_sum: f64 = records.iter().map(|r| r.price).sum();
    let quantity_sum: f64 = records.iter().map(|r| r.quantity_sold as f64).sum();

    GlobalStats {
        record_count: count,
        total_revenue,
        avg_price: mean(price_sum, count),
        avg_quantity: mean(quantity_sum, count),
    }
}

/// По категориям: продажи, средняя цена, количество; по убыванию продаж
pub fn summarize_by_category(records: &[SalesRecord]) -> Vec<GroupSummary> {
    let labels: Vec<&str> = Category::all().iter().map(|c| c.label()).collect();
    let mut rows = with_all_labels(group_by(records, &[Dimension::Category]), &labels);
    sort_by_sales_desc(&mut rows);
    rows
}

/// По регионам: продажи, среднее количество; по убыванию продаж
pub fn summarize_by_region(records: &[SalesRecord]) -> Vec<GroupSummary> {
    let labels: Vec<&str> = Region::all().iter().map(|r| r.label()).collect();
    let mut rows = with_all_labels(group_by(records, &[Dimension::Region]), &labels);
    sort_by_sales_desc(&mut rows);
    rows
}

/// По кварталам, Q1..Q4
pub fn summarize_by_quarter(records: &[SalesRecord]) -> Vec<GroupSummary> {
    let mut rows = with_all_labels(group_by(records, &[Dimension::Quarter]), &QUARTERS);
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

/// Пары category x region из данных, по убыванию продаж
pub fn summarize_by_category_region(records: &[SalesRecord]) -> Vec<GroupSummary> {
    let mut rows = group_by(records, &[Dimension::Category, Dimension::Region]);
    sort_by_sales_desc(&mut rows);
    rows
}

/// Полный анализ
pub fn analyze(records: &[SalesRecord]) -> SalesSummary {
    SalesSummary {
        global: global_stats(records),
        by_category: summarize_by_category(records),
        by_region: summarize_by_region(records),
        by_quarter: summarize_by_quarter(records),
        by_category_region: summarize_by_category_region(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_sales_record::generator::{generate, SampleSpec};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(category: Category, region: Region, price: f64, qty: u32, month: u32) -> SalesRecord {
        SalesRecord::new(
            "P",
            "Product",
            category,
            region,
            price,
            qty,
            NaiveDate::from_ymd_opt(2023, month, 10).unwrap(),
        )
    }

    fn scenario() -> Vec<SalesRecord> {
        vec![
            record(Category::Electronics, Region::North, 100.0, 10, 11),
            record(Category::Books, Region::South, 20.0, 5, 2),
            record(Category::Electronics, Region::North, 50.0, 2, 5),
        ]
    }

    fn row<'a>(rows: &'a [GroupSummary], key: &str) -> &'a GroupSummary {
        rows.iter().find(|r| r.key == vec![key.to_string()]).unwrap()
    }

    #[test]
    fn test_category_scenario() {
        let rows = summarize_by_category(&scenario());
        let electronics = row(&rows, "Electronics");
        assert_eq!(electronics.total_sales, 1100.0);
        assert_eq!(electronics.avg_price, 75.0);
        assert_eq!(electronics.total_quantity, 12);
        assert_eq!(electronics.count, 2);
        assert_eq!(rows[0].key, vec!["Electronics".to_string()]);
        assert_eq!(rows[1].key, vec!["Books".to_string()]);
    }

    #[test]
    fn test_zero_member_groups() {
        let rows = summarize_by_category(&scenario());
        assert_eq!(rows.len(), 5);
        let sports = row(&rows, "Sports");
        assert_eq!(sports.count, 0);
        assert_eq!(sports.total_sales, 0.0);
        assert!(sports.avg_price.is_nan());
        assert!(sports.avg_quantity.is_nan());

        let stats = global_stats(&[]);
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert!(stats.avg_price.is_nan());
    }

    #[test]
    fn test_quarter_order_independent_of_input() {
        let rows = summarize_by_quarter(&scenario());
        let keys: Vec<_> = rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["Q1", "Q2", "Q3", "Q4"]);
        assert_eq!(rows[0].total_sales, 100.0);
        assert_eq!(rows[1].total_sales, 100.0);
        assert_eq!(rows[2].count, 0);
        assert_eq!(rows[3].total_sales, 1000.0);
    }

    #[test]
    fn test_partition_completeness_on_generated_data() {
        let records = generate(&SampleSpec::default(), &mut StdRng::seed_from_u64(42));
        let summary = analyze(&records);

        let total = summary.global.total_revenue;
        let by_category: f64 = summary.by_category.iter().map(|r| r.total_sales).sum();
        let by_region: f64 = summary.by_region.iter().map(|r| r.total_sales).sum();
        let by_quarter: f64 = summary.by_quarter.iter().map(|r| r.total_sales).sum();
        let by_pair: f64 = summary.by_category_region.iter().map(|r| r.total_sales).sum();
        for partial in [by_category, by_region, by_quarter, by_pair] {
            assert!((partial - total).abs() < 1e-6 * total);
        }

        assert!(summary
            .by_category
            .windows(2)
            .all(|w| w[0].total_sales >= w[1].total_sales));
        assert!(summary
            .by_region
            .windows(2)
            .all(|w| w[0].total_sales >= w[1].total_sales));
        assert_eq!(
            summary.by_category.iter().map(|r| r.count).sum::<u64>(),
            summary.global.record_count
        );
    }

    #[test]
    fn test_two_key_grouping() {
        let rows = summarize_by_category_region(&scenario());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, vec!["Electronics".to_string(), "North".to_string()]);
        assert_eq!(rows[0].avg_quantity, 6.0);
        assert_eq!(rows[0].label(), "Electronics / North");
    }

    #[test]
    fn test_global_stats() {
        let stats = global_stats(&scenario());
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.total_revenue, 1200.0);
        assert!((stats.avg_price - 170.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_quantity - 17.0 / 3.0).abs() < 1e-9);
    }
}
