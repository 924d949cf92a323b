use anyhow::{Context, Result};
use contracts::domain::a001_sales_record::SalesRecord;
use contracts::usecases::common::UseCaseMetadata;
use serde_json::{json, Value};
use std::path::Path;

use crate::shared::docstore::{Document, DocumentStore, FindOptions};

pub struct ExportCsv;

impl UseCaseMetadata for ExportCsv {
    fn usecase_index() -> &'static str {
        "u504"
    }

    fn usecase_name() -> &'static str {
        "export_csv"
    }

    fn display_name() -> &'static str {
        "Export CSV"
    }

    fn description() -> &'static str {
        "Write the whole collection to a CSV file"
    }
}

/// Сначала поля записи, затем остальные поля в порядке появления
fn header(docs: &[Document]) -> Vec<String> {
    let mut columns: Vec<String> = SalesRecord::FIELD_NAMES
        .iter()
        .map(|f| f.to_string())
        .collect();
    for doc in docs {
        for key in doc.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Выгрузить все документы в `path` (файл перезаписывается). Возвращает число строк.
pub async fn export_collection(store: &dyn DocumentStore, path: &Path) -> Result<usize> {
    let docs = store
        .find(&json!({}), FindOptions::default())
        .await
        .context("cannot read collection for export")?;
    let columns = header(&docs);

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    writer.write_record(&columns)?;
    for doc in &docs {
        writer.write_record(columns.iter().map(|c| cell(doc.get(c))))?;
    }
    writer.flush()?;

    tracing::info!(
        "{}: {} rows written to {}",
        ExportCsv::full_name(),
        docs.len(),
        path.display()
    );
    Ok(docs.len())
}
