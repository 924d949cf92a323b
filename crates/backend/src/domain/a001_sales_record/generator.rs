use chrono::{Duration, NaiveDate};
use contracts::domain::a001_sales_record::SalesRecord;
use contracts::enums::{Category, Region};
use rand::Rng;

const SAMPLE_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(date) => date,
    None => panic!("invalid sample epoch"),
};

/// Параметры синтетического набора данных
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub count: usize,
    pub price_min: f64,
    pub price_max: f64,
    pub quantity_min: u32,
    pub quantity_max: u32,
    pub start_date: NaiveDate,
    pub window_days: i64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            count: 500,
            price_min: 10.0,
            price_max: 1000.0,
            quantity_min: 1,
            quantity_max: 50,
            start_date: SAMPLE_EPOCH,
            window_days: 365,
        }
    }
}

impl SampleSpec {
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Генерация `spec.count` записей с последовательными product_id.
///
/// Категория, регион, цена, количество и дата выбираются равномерно;
/// выручка и период вычисляются для каждой записи.
pub fn generate<R: Rng>(spec: &SampleSpec, rng: &mut R) -> Vec<SalesRecord> {
    let categories = Category::all();
    let regions = Region::all();

    (0..spec.count)
        .map(|i| {
            let category = categories[rng.gen_range(0..categories.len())];
            let region = regions[rng.gen_range(0..regions.len())];
            let price = round2(rng.gen_range(spec.price_min..=spec.price_max));
            let quantity = rng.gen_range(spec.quantity_min..=spec.quantity_max);
            let sale_date = spec.start_date + Duration::days(rng.gen_range(0..spec.window_days));

            SalesRecord::new(
                format!("P{:04}", i + 1),
                format!("Product {}", i + 1),
                category,
                region,
                price,
                quantity,
                sale_date,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_generates_valid_records() {
        let spec = SampleSpec::default();
        let mut rng = StdRng::seed_from_u64(7);
        let records = generate(&spec, &mut rng);

        assert_eq!(records.len(), 500);
        let end = spec.start_date + Duration::days(spec.window_days);
        for r in &records {
            assert!((r.total_revenue - r.price * r.quantity_sold as f64).abs() < 1e-9);
            assert!(r.price >= 10.0 && r.price <= 1000.0);
            assert_eq!(r.price, round2(r.price));
            assert!((1..=50).contains(&r.quantity_sold));
            assert!(r.sale_date >= spec.start_date && r.sale_date < end);
            assert_eq!(r.year(), "2023");
            assert!(["Q1", "Q2", "Q3", "Q4"].contains(&r.quarter()));
        }

        let ids: HashSet<_> = records.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids.len(), records.len());
        assert_eq!(records[0].product_id, "P0001");
        assert_eq!(records[499].product_id, "P0500");
    }

    #[test]
    fn test_all_labels_appear() {
        let mut rng = StdRng::seed_from_u64(11);
        let records = generate(&SampleSpec::default(), &mut rng);
        let categories: HashSet<_> = records.iter().map(|r| r.category).collect();
        let regions: HashSet<_> = records.iter().map(|r| r.region).collect();
        assert_eq!(categories.len(), 5);
        assert_eq!(regions.len(), 5);
    }

    #[test]
    fn test_same_seed_same_data() {
        let spec = SampleSpec::with_count(20);
        let a = generate(&spec, &mut StdRng::seed_from_u64(3));
        let b = generate(&spec, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
