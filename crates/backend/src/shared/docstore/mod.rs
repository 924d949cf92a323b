//! Хранилище документов.
//!
//! Каждый компонент получает хранилище явно, как `&dyn DocumentStore`;
//! глобального подключения нет.

pub mod error;
pub mod memory;
pub mod pipeline;
pub mod query;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::shared::config::StoreConfig;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Document, FindOptions};
pub use sqlite::SqliteStore;

/// Результат `update_one` / `update_many`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Операции документной БД, нужные конвейеру.
///
/// Вызовы выполняются последовательно; реализация гарантирует только
/// атомарность одного документа и одного массового обновления.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Location string for logs, e.g. `sqlite://target/db/sales_db.db#sales_data`
    fn describe(&self) -> String;

    async fn count_documents(&self, filter: &Value) -> StoreResult<u64>;

    /// Вставка документов; `_id` (UUID) назначается при отсутствии. Возвращает id
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<String>>;

    async fn find(&self, filter: &Value, options: FindOptions) -> StoreResult<Vec<Document>>;

    /// Применить `update` ко всем документам по `filter`
    async fn update_many(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome>;

    /// Применить `update` к первому документу по `filter`
    async fn update_one(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome>;

    async fn aggregate(&self, pipeline: &[Value]) -> StoreResult<Vec<Document>>;

    /// Создать индекс по `keys` (`{field: 1 | -1}`); такой же существующий индекс не трогаем
    async fn create_index(&self, keys: &Value, name: Option<&str>) -> StoreResult<String>;

    /// Имена индексов, первым идет неявный `_id_`
    async fn list_indexes(&self) -> StoreResult<Vec<String>>;
}

/// Validated index key list
pub(crate) fn index_keys(keys: &Value) -> StoreResult<Vec<(String, i64)>> {
    let map = query::expect_object("index keys", keys)?;
    if map.is_empty() {
        return Err(StoreError::invalid("index needs at least one key"));
    }
    map.iter()
        .map(|(field, direction)| match direction.as_i64() {
            Some(d @ (1 | -1)) => Ok((field.clone(), d)),
            _ => Err(StoreError::invalid(format!(
                "index direction for '{}' must be 1 or -1",
                field
            ))),
        })
        .collect()
}

/// Default index name: `category_1_region_1`
pub fn default_index_name(keys: &[(String, i64)]) -> String {
    keys.iter()
        .map(|(field, direction)| format!("{}_{}", field, direction))
        .collect::<Vec<_>>()
        .join("_")
}

/// Ensure `_id` is present and first; returns the id as a string
pub(crate) fn assign_id(doc: Document) -> (String, Document) {
    match doc.get("_id") {
        Some(Value::String(id)) => (id.clone(), doc),
        Some(other) => (other.to_string(), doc),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            let mut out = Map::with_capacity(doc.len() + 1);
            out.insert("_id".to_string(), Value::String(id.clone()));
            out.extend(doc);
            (id, out)
        }
    }
}

/// Открыть хранилище по `config.url`.
///
/// * `memory://` - коллекция в памяти процесса
/// * `sqlite://<dir>` - файл `<dir>/<database>.db`, таблица `<collection>`
pub async fn open(config: &StoreConfig) -> StoreResult<Box<dyn DocumentStore>> {
    if config.url.starts_with("memory://") {
        return Ok(Box::new(MemoryStore::new(
            &config.database,
            &config.collection,
        )));
    }
    if let Some(dir) = config.url.strip_prefix("sqlite://") {
        let dir = if dir.is_empty() { "." } else { dir };
        let store =
            SqliteStore::open(&PathBuf::from(dir), &config.database, &config.collection).await?;
        return Ok(Box::new(store));
    }
    Err(StoreError::UnsupportedUrl(config.url.clone()))
}
