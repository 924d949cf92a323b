use anyhow::{Context, Result};
use contracts::enums::Category;
use contracts::usecases::common::UseCaseMetadata;
use serde_json::Value;

use super::queries;
use crate::shared::docstore::{Document, DocumentStore};
use crate::shared::format::{format_amount, format_number};

pub struct QueryShowcase;

impl UseCaseMetadata for QueryShowcase {
    fn usecase_index() -> &'static str {
        "u502"
    }

    fn usecase_name() -> &'static str {
        "query_showcase"
    }

    fn display_name() -> &'static str {
        "Query showcase"
    }

    fn description() -> &'static str {
        "Read-only queries and aggregations against the sales collection"
    }
}

pub async fn top_revenue(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    let (filter, options) = queries::top_revenue();
    store
        .find(&filter, options)
        .await
        .context("top revenue query failed")
}

pub async fn count_by_category(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    store
        .aggregate(&queries::count_by_category())
        .await
        .context("count by category failed")
}

pub async fn avg_price_by_region(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    store
        .aggregate(&queries::avg_price_by_region())
        .await
        .context("average price by region failed")
}

pub async fn revenue_by_month(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    store
        .aggregate(&queries::revenue_by_month())
        .await
        .context("revenue by month failed")
}

/// Идемпотентно; возвращает имя индекса
pub async fn ensure_category_region_index(store: &dyn DocumentStore) -> Result<String> {
    store
        .create_index(&queries::category_region_index(), None)
        .await
        .context("cannot create category/region index")
}

pub async fn category_region_matrix(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    store
        .aggregate(&queries::category_region_matrix())
        .await
        .context("category/region matrix failed")
}

pub async fn premium_products(
    store: &dyn DocumentStore,
    category: Category,
    min_price: f64,
) -> Result<Vec<Document>> {
    let (filter, options) = queries::premium_products(category, min_price);
    store
        .find(&filter, options)
        .await
        .context("premium products query failed")
}

/// Топ-5, количество по категориям, средняя цена по регионам, выручка по месяцам
pub async fn run_basic(store: &dyn DocumentStore) -> Result<()> {
    tracing::info!("{}: basic queries", QueryShowcase::full_name());

    print_rows(
        "Top 5 products by revenue",
        &top_revenue(store).await?,
        &["product_name", "total_revenue"],
    );
    print_rows(
        "Records per category",
        &count_by_category(store).await?,
        &["_id", "count"],
    );
    print_rows(
        "Average price per region",
        &avg_price_by_region(store).await?,
        &["_id", "avg_price"],
    );
    print_rows(
        "Revenue per month",
        &revenue_by_month(store).await?,
        &["_id", "total_revenue"],
    );
    Ok(())
}

/// Составной индекс, матрица category/region, фильтр дорогих товаров.
///
/// Возвращает строки матрицы для сверки с локальной группировкой.
pub async fn run_advanced(store: &dyn DocumentStore, min_price: f64) -> Result<Vec<Document>> {
    tracing::info!("{}: advanced queries", QueryShowcase::full_name());

    let index = ensure_category_region_index(store).await?;
    println!("\nIndex ready: {}", index);

    let matrix = category_region_matrix(store).await?;
    print_rows(
        "Top category/region pairs",
        &matrix,
        &["_id", "total_revenue", "avg_quantity"],
    );

    let premium = premium_products(store, Category::Electronics, min_price).await?;
    print_rows(
        &format!(
            "Electronics priced above {} ({} found)",
            format_amount(min_price),
            premium.len()
        ),
        &premium,
        &["product_name", "price"],
    );
    Ok(matrix)
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "n/a".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(u) => format_number(u),
            None => format_amount(n.as_f64().unwrap_or(f64::NAN)),
        },
        // составные ключи группировки
        Some(Value::Object(map)) => map
            .values()
            .map(|v| display_value(Some(v)))
            .collect::<Vec<_>>()
            .join(" / "),
        Some(other) => other.to_string(),
    }
}

fn print_rows(title: &str, rows: &[Document], columns: &[&str]) {
    println!("\n{}", title);
    if rows.is_empty() {
        println!("  (no results)");
        return;
    }
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| display_value(row.get(*column)))
            .collect();
        println!("  {}", cells.join(" | "));
    }
}
