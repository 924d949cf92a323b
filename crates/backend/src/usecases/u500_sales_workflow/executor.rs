use anyhow::{Context, Result};
use contracts::dashboards::d400_sales_summary::{GroupSummary, SalesSummary};
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u503_discount_category::{DiscountReport, DiscountRequest};
use std::path::Path;

use crate::dashboards::d400_sales_summary::{report, service};
use crate::dashboards::d401_sales_charts::renderer::{
    self, ChartRenderer, ConsoleChartRenderer, JsonChartRenderer,
};
use crate::dashboards::d401_sales_charts::service::build_charts;
use crate::domain::a001_sales_record::generator::SampleSpec;
use crate::domain::a001_sales_record::repository;
use crate::shared::config::PipelineConfig;
use crate::shared::docstore::{Document, DocumentStore};
use crate::shared::format::format_number;
use crate::usecases::{
    u501_seed_sample_data, u502_query_showcase, u503_discount_category, u504_export_csv,
};

pub struct SalesWorkflow;

impl UseCaseMetadata for SalesWorkflow {
    fn usecase_index() -> &'static str {
        "u500"
    }

    fn usecase_name() -> &'static str {
        "sales_workflow"
    }

    fn display_name() -> &'static str {
        "Sales analytics workflow"
    }

    fn description() -> &'static str {
        "Seed, analyze, chart, query, discount, re-analyze and export"
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub seeded: usize,
    pub charts: usize,
    /// Строки category/region из хранилища, не совпавшие с локальной группировкой
    pub matrix_mismatches: usize,
    pub discount: DiscountReport,
    pub exported: usize,
}

async fn analyze_and_print(store: &dyn DocumentStore, heading: &str) -> Result<SalesSummary> {
    let records = repository::list_all(store)
        .await
        .context("cannot load sales records")?;
    let summary = service::analyze(&records);
    report::print_summary(heading, &summary);
    Ok(summary)
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

/// Сверка группировки category x region из хранилища с локальной.
///
/// Для каждой строки хранилища должна быть локальная группа с тем же ключом,
/// `total_revenue` и `avg_quantity`. Возвращает число несовпадений.
pub fn cross_check_matrix(store_rows: &[Document], local: &[GroupSummary], tolerance: f64) -> usize {
    let mut mismatches = 0;
    for row in store_rows {
        let key: Vec<String> = ["category", "region"]
            .iter()
            .map(|field| {
                row.get("_id")
                    .and_then(|id| id.get(*field))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        let store_revenue = row.get("total_revenue").and_then(|v| v.as_f64());
        let store_quantity = row.get("avg_quantity").and_then(|v| v.as_f64());

        let consistent = match (local.iter().find(|g| g.key == key), store_revenue, store_quantity) {
            (Some(group), Some(revenue), Some(quantity)) => {
                close(group.total_sales, revenue, tolerance)
                    && close(group.avg_quantity, quantity, tolerance)
            }
            _ => false,
        };
        if !consistent {
            tracing::warn!(
                "Category/region {} differs between store and local analysis: store revenue {:?}, avg quantity {:?}",
                key.join(" / "),
                store_revenue,
                store_quantity
            );
            mismatches += 1;
        }
    }
    mismatches
}

/// Выполнить все шаги по порядку; первая ошибка останавливает процесс
pub async fn run(store: &dyn DocumentStore, config: &PipelineConfig) -> Result<WorkflowReport> {
    tracing::info!(
        "{} started against {}",
        SalesWorkflow::full_name(),
        store.describe()
    );

    let seeded = u501_seed_sample_data::seed_if_empty(
        store,
        &SampleSpec::with_count(config.sample_size),
        config.seed,
    )
    .await?;

    let summary = analyze_and_print(store, "Sales analysis").await?;

    let charts = build_charts(&summary);
    let console = ConsoleChartRenderer::default();
    let json = JsonChartRenderer::new(&config.charts_dir);
    let renderers: [&dyn ChartRenderer; 2] = [&console, &json];
    renderer::render_all(&renderers, &charts).context("chart rendering failed")?;

    u502_query_showcase::run_basic(store).await?;
    let matrix =
        u502_query_showcase::run_advanced(store, config.premium_price_threshold).await?;
    let matrix_mismatches = cross_check_matrix(
        &matrix,
        &summary.by_category_region,
        u503_discount_category::executor::REVENUE_TOLERANCE,
    );

    let discount = u503_discount_category::run(
        store,
        &DiscountRequest::new(config.discount_category, config.discount_factor),
    )
    .await?;
    println!(
        "\nDiscount on {}: {} matched, {} modified, {} revenues recomputed",
        config.discount_category,
        format_number(discount.matched),
        format_number(discount.modified),
        format_number(discount.recomputed)
    );

    analyze_and_print(store, "Sales analysis after discount").await?;

    let exported =
        u504_export_csv::export_collection(store, Path::new(&config.export_path)).await?;
    println!(
        "\nExported {} records to {}",
        format_number(exported as u64),
        config.export_path
    );

    tracing::info!("{} finished", SalesWorkflow::full_name());
    Ok(WorkflowReport {
        seeded,
        charts: charts.len(),
        matrix_mismatches,
        discount,
        exported,
    })
}
