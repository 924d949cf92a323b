//! Скидка на категорию в две фазы.
//!
//! Фаза 1 умножает `price` одним массовым обновлением; фаза 2 заново читает
//! категорию и пересчитывает `total_revenue` по одному документу. Фазы -
//! отдельные вызовы хранилища: сбой между ними оставляет документы с новой
//! ценой и старой выручкой, их находит `find_revenue_drift`.

use anyhow::{Context, Result};
use contracts::domain::a001_sales_record::SalesRecord;
use contracts::enums::Category;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u503_discount_category::{DiscountReport, DiscountRequest};
use serde_json::{json, Value};

use crate::domain::a001_sales_record::repository;
use crate::shared::docstore::{DocumentStore, UpdateOutcome};

/// Допустимое расхождение `total_revenue` и `price * quantity_sold`
pub const REVENUE_TOLERANCE: f64 = 1e-6;

pub struct DiscountCategory;

impl UseCaseMetadata for DiscountCategory {
    fn usecase_index() -> &'static str {
        "u503"
    }

    fn usecase_name() -> &'static str {
        "discount_category"
    }

    fn display_name() -> &'static str {
        "Discount category"
    }

    fn description() -> &'static str {
        "Scale prices of one category and recompute revenue"
    }
}

fn category_filter(category: Category) -> Value {
    json!({ "category": category.label() })
}

/// Фаза 1: умножить `price` всех записей `category` на `factor`
pub async fn apply_price_factor(
    store: &dyn DocumentStore,
    category: Category,
    factor: f64,
) -> Result<UpdateOutcome> {
    let outcome = store
        .update_many(
            &category_filter(category),
            &json!({"$mul": {"price": factor}}),
        )
        .await
        .with_context(|| format!("price update for {} failed", category))?;
    tracing::info!(
        "{}: {} matched, {} modified (price x {})",
        category,
        outcome.matched,
        outcome.modified,
        factor
    );
    Ok(outcome)
}

/// Фаза 2: пересчитать `total_revenue` по текущей цене и количеству.
///
/// `budget` ограничивает число обновляемых документов; `None` - все.
pub async fn recompute_revenue(
    store: &dyn DocumentStore,
    category: Category,
    budget: Option<usize>,
) -> Result<u64> {
    let records = repository::list_by_category(store, category).await?;
    let budget = budget.unwrap_or(records.len());

    let mut recomputed = 0;
    for record in records.into_iter().take(budget) {
        let id = record
            .id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("sales document {} has no _id", record.product_id))?;
        let outcome = store
            .update_one(
                &json!({ "_id": id }),
                &json!({"$set": {"total_revenue": record.expected_revenue()}}),
            )
            .await
            .with_context(|| format!("revenue update for {} failed", id))?;
        recomputed += outcome.matched;
    }
    Ok(recomputed)
}

/// Записи по `filter`, у которых выручка не равна цена x количество
pub async fn find_revenue_drift(
    store: &dyn DocumentStore,
    filter: &Value,
    tolerance: f64,
) -> Result<Vec<SalesRecord>> {
    let records = repository::list_where(store, filter).await?;
    Ok(records
        .into_iter()
        .filter(|record| !record.has_consistent_revenue(tolerance))
        .collect())
}

/// Обе фазы и проверка расхождений
pub async fn run(store: &dyn DocumentStore, request: &DiscountRequest) -> Result<DiscountReport> {
    request.validate().map_err(anyhow::Error::msg)?;
    tracing::info!(
        "{}: {} x {}",
        DiscountCategory::full_name(),
        request.category,
        request.factor
    );

    let outcome = apply_price_factor(store, request.category, request.factor).await?;
    let recomputed = recompute_revenue(store, request.category, None).await?;
    let drift = find_revenue_drift(
        store,
        &category_filter(request.category),
        REVENUE_TOLERANCE,
    )
    .await?;

    if !drift.is_empty() {
        tracing::warn!(
            "{} {} records still have inconsistent total_revenue",
            drift.len(),
            request.category
        );
    }

    Ok(DiscountReport {
        matched: outcome.matched,
        modified: outcome.modified,
        recomputed,
        drifted: drift.len() as u64,
    })
}
