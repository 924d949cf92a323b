use anyhow::{Context, Result};
use contracts::domain::a001_sales_record::SalesRecord;
use contracts::enums::Category;
use serde_json::{json, Value};

use crate::shared::docstore::{Document, DocumentStore, FindOptions};

pub fn to_document(record: &SalesRecord) -> Result<Document> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("sales record serialized to a non-document: {}", other),
    }
}

pub fn from_document(doc: Document) -> Result<SalesRecord> {
    let id = doc.get("_id").cloned();
    serde_json::from_value(serde_json::Value::Object(doc))
        .with_context(|| format!("malformed sales document {:?}", id))
}

pub async fn count(store: &dyn DocumentStore) -> Result<u64> {
    Ok(store.count_documents(&json!({})).await?)
}

pub async fn insert_all(store: &dyn DocumentStore, records: &[SalesRecord]) -> Result<Vec<String>> {
    let docs = records.iter().map(to_document).collect::<Result<Vec<_>>>()?;
    let ids = store.insert_many(docs).await?;
    Ok(ids)
}

/// Записи по `filter`, в порядке вставки
pub async fn list_where(store: &dyn DocumentStore, filter: &Value) -> Result<Vec<SalesRecord>> {
    let docs = store.find(filter, FindOptions::default()).await?;
    docs.into_iter().map(from_document).collect()
}

/// Вся коллекция в порядке вставки
pub async fn list_all(store: &dyn DocumentStore) -> Result<Vec<SalesRecord>> {
    list_where(store, &json!({})).await
}

pub async fn list_by_category(
    store: &dyn DocumentStore,
    category: Category,
) -> Result<Vec<SalesRecord>> {
    list_where(store, &json!({ "category": category.label() })).await
}
