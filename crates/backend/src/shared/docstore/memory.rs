use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::error::{StoreError, StoreResult};
use super::query::{self, Document, FindOptions};
use super::{assign_id, default_index_name, index_keys, pipeline, DocumentStore, UpdateOutcome};

#[derive(Debug, Default)]
struct MemoryState {
    docs: Vec<Document>,
    indexes: Vec<(String, Vec<(String, i64)>)>,
}

/// Коллекция в памяти процесса, документы в порядке вставки
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(database: &str, collection: &str) -> Self {
        Self {
            namespace: format!("{}.{}", database, collection),
            state: Mutex::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn describe(&self) -> String {
        format!("memory://{}", self.namespace)
    }

    async fn count_documents(&self, filter: &Value) -> StoreResult<u64> {
        let state = self.state.lock().await;
        let filter = query::expect_object("filter", filter)?;
        let mut count = 0;
        for doc in &state.docs {
            if query::matches_document(doc, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let mut existing: HashSet<String> = state
            .docs
            .iter()
            .filter_map(|d| d.get("_id"))
            .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
            .collect();

        let mut prepared = Vec::with_capacity(docs.len());
        for doc in docs {
            let (id, doc) = assign_id(doc);
            if !existing.insert(id.clone()) {
                return Err(StoreError::DuplicateKey(id));
            }
            prepared.push((id, doc));
        }

        let ids = prepared.iter().map(|(id, _)| id.clone()).collect();
        state.docs.extend(prepared.into_iter().map(|(_, doc)| doc));
        Ok(ids)
    }

    async fn find(&self, filter: &Value, options: FindOptions) -> StoreResult<Vec<Document>> {
        let state = self.state.lock().await;
        query::find_in(&state.docs, filter, &options)
    }

    async fn update_many(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome> {
        let mut state = self.state.lock().await;
        let filter = query::expect_object("filter", filter)?;
        // изменения на копиях, записываем только если все документы обновились
        let mut outcome = UpdateOutcome::default();
        let mut staged = Vec::new();
        for (index, doc) in state.docs.iter().enumerate() {
            if query::matches_document(doc, filter)? {
                outcome.matched += 1;
                let mut updated = doc.clone();
                if query::apply_update(&mut updated, update)? {
                    outcome.modified += 1;
                    staged.push((index, updated));
                }
            }
        }
        for (index, doc) in staged {
            state.docs[index] = doc;
        }
        Ok(outcome)
    }

    async fn update_one(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome> {
        let mut state = self.state.lock().await;
        let filter = query::expect_object("filter", filter)?;
        for doc in state.docs.iter_mut() {
            if query::matches_document(doc, filter)? {
                let mut updated = doc.clone();
                let modified = query::apply_update(&mut updated, update)?;
                *doc = updated;
                return Ok(UpdateOutcome {
                    matched: 1,
                    modified: u64::from(modified),
                });
            }
        }
        Ok(UpdateOutcome::default())
    }

    async fn aggregate(&self, pipeline: &[Value]) -> StoreResult<Vec<Document>> {
        let docs = self.state.lock().await.docs.clone();
        pipeline::run_pipeline(docs, pipeline)
    }

    async fn create_index(&self, keys: &Value, name: Option<&str>) -> StoreResult<String> {
        let keys = index_keys(keys)?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_index_name(&keys));

        let mut state = self.state.lock().await;
        match state.indexes.iter().find(|(existing, _)| *existing == name) {
            Some((_, existing_keys)) if *existing_keys == keys => Ok(name),
            Some(_) => Err(StoreError::IndexConflict { name }),
            None => {
                state.indexes.push((name.clone(), keys));
                Ok(name)
            }
        }
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut names = vec!["_id_".to_string()];
        names.extend(state.indexes.iter().map(|(name, _)| name.clone()));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    fn store() -> MemoryStore {
        MemoryStore::new("sales_db", "sales_data")
    }

    #[tokio::test]
    async fn test_insert_count_find() {
        let store = store();
        assert_eq!(store.count_documents(&json!({})).await.unwrap(), 0);

        let ids = store
            .insert_many(vec![
                doc(json!({"category": "Books", "price": 20.0})),
                doc(json!({"category": "Electronics", "price": 100.0})),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        assert_eq!(store.count_documents(&json!({})).await.unwrap(), 2);
        assert_eq!(
            store
                .count_documents(&json!({"category": "Books"}))
                .await
                .unwrap(),
            1
        );

        let found = store
            .find(&json!({"_id": ids[1]}), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found[0]["category"], "Electronics");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_without_partial_insert() {
        let store = store();
        store
            .insert_many(vec![doc(json!({"_id": "a"}))])
            .await
            .unwrap();
        let err = store
            .insert_many(vec![doc(json!({"_id": "b"})), doc(json!({"_id": "a"}))])
            .await;
        assert!(matches!(err, Err(StoreError::DuplicateKey(id)) if id == "a"));
        assert_eq!(store.count_documents(&json!({})).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_many_and_one() {
        let store = store();
        store
            .insert_many(vec![
                doc(json!({"_id": "1", "category": "Electronics", "price": 100.0})),
                doc(json!({"_id": "2", "category": "Books", "price": 20.0})),
                doc(json!({"_id": "3", "category": "Electronics", "price": 50.0})),
            ])
            .await
            .unwrap();

        let outcome = store
            .update_many(&json!({"category": "Electronics"}), &json!({"$mul": {"price": 0.9}}))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 2, modified: 2 });

        let outcome = store
            .update_one(&json!({"_id": "2"}), &json!({"$set": {"price": 20.0}}))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });

        let outcome = store
            .update_one(&json!({"_id": "missing"}), &json!({"$set": {"price": 1.0}}))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());

        let books = store
            .find(&json!({"_id": "2"}), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(books[0]["price"], json!(20.0));
    }

    #[tokio::test]
    async fn test_failed_bulk_update_changes_nothing() {
        let store = store();
        store
            .insert_many(vec![
                doc(json!({"_id": "1", "price": 10.0})),
                doc(json!({"_id": "2", "price": "n/a"})),
                doc(json!({"_id": "3", "price": 30.0})),
            ])
            .await
            .unwrap();

        let result = store
            .update_many(&json!({}), &json!({"$mul": {"price": 2}}))
            .await;
        assert!(result.is_err());

        let all = store.find(&json!({}), FindOptions::default()).await.unwrap();
        assert_eq!(all[0]["price"], json!(10.0));
        assert_eq!(all[2]["price"], json!(30.0));
    }

    #[tokio::test]
    async fn test_create_index_is_idempotent() {
        let store = store();
        let keys = json!({"category": 1, "region": 1});
        let first = store.create_index(&keys, None).await.unwrap();
        let second = store.create_index(&keys, None).await.unwrap();
        assert_eq!(first, "category_1_region_1");
        assert_eq!(first, second);
        assert_eq!(
            store.list_indexes().await.unwrap(),
            vec!["_id_".to_string(), "category_1_region_1".to_string()]
        );

        let conflict = store
            .create_index(&json!({"region": 1}), Some("category_1_region_1"))
            .await;
        assert!(matches!(conflict, Err(StoreError::IndexConflict { .. })));
    }
}
