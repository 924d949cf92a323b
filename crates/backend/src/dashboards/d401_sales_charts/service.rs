use contracts::dashboards::d400_sales_summary::{GroupSummary, SalesSummary};
use contracts::dashboards::d401_sales_charts::{ChartKind, ChartPoint, ChartSpec};
use std::cmp::Ordering;

/// Точки для `rows`; нечисловые значения (средние пустых групп) отбрасываются
fn points(rows: &[GroupSummary], value: impl Fn(&GroupSummary) -> f64) -> Vec<ChartPoint> {
    rows.iter()
        .filter_map(|row| {
            let v = value(row);
            if v.is_finite() {
                Some(ChartPoint {
                    label: row.label(),
                    value: v,
                })
            } else {
                tracing::debug!("Skipping non-finite chart value for '{}'", row.label());
                None
            }
        })
        .collect()
}

fn descending(mut points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    points.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    points
}

fn bar_chart(id: &str, title: &str, x_label: &str, rows: &[GroupSummary]) -> ChartSpec {
    ChartSpec {
        id: id.to_string(),
        title: title.to_string(),
        kind: ChartKind::Bar,
        x_label: x_label.to_string(),
        y_label: "Total Sales".to_string(),
        points: descending(points(rows, |r| r.total_sales)),
    }
}

pub fn category_sales_chart(rows: &[GroupSummary]) -> ChartSpec {
    bar_chart("category_sales", "Total Sales by Category", "Category", rows)
}

pub fn region_sales_chart(rows: &[GroupSummary]) -> ChartSpec {
    bar_chart("region_sales", "Total Sales by Region", "Region", rows)
}

/// Линейный график с точками по кварталам
pub fn quarterly_sales_chart(rows: &[GroupSummary]) -> ChartSpec {
    let mut points = points(rows, |r| r.total_sales);
    points.sort_by(|a, b| a.label.cmp(&b.label));
    ChartSpec {
        id: "quarterly_sales".to_string(),
        title: "Quarterly Sales Trend".to_string(),
        kind: ChartKind::LinePoint,
        x_label: "Quarter".to_string(),
        y_label: "Total Sales".to_string(),
        points,
    }
}

/// Три графика дашборда в порядке вывода
pub fn build_charts(summary: &SalesSummary) -> Vec<ChartSpec> {
    vec![
        category_sales_chart(&summary.by_category),
        region_sales_chart(&summary.by_region),
        quarterly_sales_chart(&summary.by_quarter),
    ]
}
