use anyhow::{Context, Result};
use contracts::dashboards::d401_sales_charts::{ChartKind, ChartSpec};
use std::path::PathBuf;

use crate::shared::format::format_amount;

/// Отрисовка описания графика
pub trait ChartRenderer {
    fn render(&self, chart: &ChartSpec) -> Result<()>;
}

/// Пишет `<dir>/<chart id>.json` для внешнего построения графиков
pub struct JsonChartRenderer {
    dir: PathBuf,
}

impl JsonChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, chart: &ChartSpec) -> PathBuf {
        self.dir.join(format!("{}.json", chart.id))
    }
}

impl ChartRenderer for JsonChartRenderer {
    fn render(&self, chart: &ChartSpec) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create chart directory {}", self.dir.display()))?;
        let path = self.path_for(chart);
        let json = serde_json::to_string_pretty(chart)?;
        std::fs::write(&path, json)
            .with_context(|| format!("cannot write chart {}", path.display()))?;
        tracing::info!("Chart '{}' written to {}", chart.title, path.display());
        Ok(())
    }
}

/// Текстовый вывод в stdout
pub struct ConsoleChartRenderer {
    width: usize,
}

impl Default for ConsoleChartRenderer {
    fn default() -> Self {
        Self { width: 40 }
    }
}

impl ConsoleChartRenderer {
    /// Строка на точку; длина столбца пропорциональна максимуму
    pub fn lines(&self, chart: &ChartSpec) -> Vec<String> {
        let max = chart.max_value().filter(|m| *m > 0.0).unwrap_or(1.0);
        let label_width = chart
            .points
            .iter()
            .map(|p| p.label.chars().count())
            .max()
            .unwrap_or(0);

        chart
            .points
            .iter()
            .map(|point| {
                let len = ((point.value.max(0.0) / max) * self.width as f64).round() as usize;
                let mark = match chart.kind {
                    ChartKind::Bar => "#".repeat(len),
                    ChartKind::LinePoint => format!("{}o", "-".repeat(len.saturating_sub(1))),
                };
                format!(
                    "  {:<lw$} | {:<w$} {}",
                    point.label,
                    mark,
                    format_amount(point.value),
                    lw = label_width,
                    w = self.width
                )
            })
            .collect()
    }
}

impl ChartRenderer for ConsoleChartRenderer {
    fn render(&self, chart: &ChartSpec) -> Result<()> {
        println!("\n{} ({} vs {})", chart.title, chart.x_label, chart.y_label);
        for line in self.lines(chart) {
            println!("{}", line);
        }
        Ok(())
    }
}

/// Отрисовать все графики всеми renderer-ами
pub fn render_all(renderers: &[&dyn ChartRenderer], charts: &[ChartSpec]) -> Result<()> {
    for chart in charts {
        for renderer in renderers {
            renderer.render(chart)?;
        }
    }
    Ok(())
}
