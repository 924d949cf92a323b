use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, FromQueryResult, SqlErr, Statement,
    TransactionTrait,
};
use serde_json::Value;
use std::path::Path;

use super::error::{StoreError, StoreResult};
use super::query::{self, Document, FindOptions};
use super::{assign_id, default_index_name, index_keys, pipeline, DocumentStore, UpdateOutcome};
use crate::shared::data::db;

/// Каталог созданных индексов (общий для всех коллекций файла БД)
const INDEX_TABLE: &str = "_salesflow_indexes";

#[derive(Debug, FromQueryResult)]
struct DocumentRow {
    id: String,
    body: String,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    cnt: i64,
}

#[derive(Debug, FromQueryResult)]
struct IndexRow {
    name: String,
    keys: String,
}

fn validate_name(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn validate_field_path(path: &str) -> StoreResult<()> {
    path.split('.').try_for_each(validate_name)
}

/// Id of a filter that is a plain `{"_id": "<id>"}` equality
fn id_equality(filter: &Document) -> Option<&str> {
    if filter.len() != 1 {
        return None;
    }
    filter.get("_id")?.as_str()
}

fn stmt(sql: &str, values: Vec<sea_orm::Value>) -> Statement {
    Statement::from_sql_and_values(DatabaseBackend::Sqlite, sql, values)
}

/// Коллекция в таблице SQLite: одна строка = один JSON документ.
///
/// Фильтры и pipeline вычисляются в процессе общим evaluator-ом;
/// SQLite отвечает за хранение, транзакции массовых обновлений и
/// индексы по выражениям.
pub struct SqliteStore {
    conn: DatabaseConnection,
    location: String,
    collection: String,
}

impl SqliteStore {
    pub async fn open(dir: &Path, database: &str, collection: &str) -> StoreResult<Self> {
        validate_name(database)?;
        validate_name(collection)?;

        let db_file = db::resolve_db_path(&dir.join(format!("{}.db", database)));
        let conn = db::connect(&db_file).await?;

        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (
                    id TEXT PRIMARY KEY NOT NULL,
                    body TEXT NOT NULL
                );"#,
                collection
            ),
        ))
        .await?;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (
                    collection TEXT NOT NULL,
                    name TEXT NOT NULL,
                    keys TEXT NOT NULL,
                    PRIMARY KEY (collection, name)
                );"#,
                INDEX_TABLE
            ),
        ))
        .await?;

        tracing::info!(
            "Opened SQLite collection '{}' in {}",
            collection,
            db_file.display()
        );

        Ok(Self {
            conn,
            location: format!("sqlite://{}#{}", db_file.display(), collection),
            collection: collection.to_string(),
        })
    }

    async fn load<C: ConnectionTrait>(&self, conn: &C) -> StoreResult<Vec<(String, Document)>> {
        let rows = DocumentRow::find_by_statement(stmt(
            &format!(r#"SELECT id, body FROM "{}" ORDER BY rowid"#, self.collection),
            vec![],
        ))
        .all(conn)
        .await?;

        rows.into_iter()
            .map(|row| {
                let doc: Document = serde_json::from_str(&row.body)?;
                Ok((row.id, doc))
            })
            .collect()
    }

    /// Кандидаты для `filter`: поиск по первичному ключу для `_id`, иначе вся таблица
    async fn candidates<C: ConnectionTrait>(
        &self,
        conn: &C,
        filter: &Document,
    ) -> StoreResult<Vec<(String, Document)>> {
        let Some(id) = id_equality(filter) else {
            return self.load(conn).await;
        };
        let row = DocumentRow::find_by_statement(stmt(
            &format!(r#"SELECT id, body FROM "{}" WHERE id = ?"#, self.collection),
            vec![id.to_string().into()],
        ))
        .one(conn)
        .await?;

        match row {
            Some(row) => {
                let doc: Document = serde_json::from_str(&row.body)?;
                Ok(vec![(row.id, doc)])
            }
            None => Ok(Vec::new()),
        }
    }

    async fn update_matching<C: ConnectionTrait>(
        &self,
        conn: &C,
        filter: &Document,
        update: &Value,
    ) -> StoreResult<UpdateOutcome> {
        let mut outcome = UpdateOutcome::default();
        for (id, mut doc) in self.load(conn).await? {
            if !query::matches_document(&doc, filter)? {
                continue;
            }
            outcome.matched += 1;
            if query::apply_update(&mut doc, update)? {
                self.write_body(conn, &id, &doc).await?;
                outcome.modified += 1;
            }
        }
        Ok(outcome)
    }

    async fn write_body<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        doc: &Document,
    ) -> StoreResult<()> {
        conn.execute(stmt(
            &format!(r#"UPDATE "{}" SET body = ? WHERE id = ?"#, self.collection),
            vec![serde_json::to_string(doc)?.into(), id.to_string().into()],
        ))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn describe(&self) -> String {
        self.location.clone()
    }

    async fn count_documents(&self, filter: &Value) -> StoreResult<u64> {
        let filter = query::expect_object("filter", filter)?;
        if filter.is_empty() {
            let row = CountRow::find_by_statement(stmt(
                &format!(r#"SELECT COUNT(*) AS cnt FROM "{}""#, self.collection),
                vec![],
            ))
            .one(&self.conn)
            .await?;
            return Ok(row.map(|r| r.cnt.max(0) as u64).unwrap_or(0));
        }

        let mut count = 0;
        for (_, doc) in self.load(&self.conn).await? {
            if query::matches_document(&doc, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<String>> {
        let txn = self.conn.begin().await?;
        let sql = format!(r#"INSERT INTO "{}" (id, body) VALUES (?, ?)"#, self.collection);
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let (id, doc) = assign_id(doc);
            let body = serde_json::to_string(&doc)?;
            if let Err(err) = txn
                .execute(stmt(&sql, vec![id.clone().into(), body.into()]))
                .await
            {
                txn.rollback().await?;
                return Err(match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey(id),
                    _ => err.into(),
                });
            }
            ids.push(id);
        }
        txn.commit().await?;
        Ok(ids)
    }

    async fn find(&self, filter: &Value, options: FindOptions) -> StoreResult<Vec<Document>> {
        let docs: Vec<Document> = self
            .candidates(&self.conn, query::expect_object("filter", filter)?)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        query::find_in(&docs, filter, &options)
    }

    async fn update_many(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome> {
        let filter = query::expect_object("filter", filter)?;
        let txn = self.conn.begin().await?;
        match self.update_matching(&txn, filter, update).await {
            Ok(outcome) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn update_one(&self, filter: &Value, update: &Value) -> StoreResult<UpdateOutcome> {
        let filter = query::expect_object("filter", filter)?;
        for (id, mut doc) in self.candidates(&self.conn, filter).await? {
            if query::matches_document(&doc, filter)? {
                let modified = query::apply_update(&mut doc, update)?;
                if modified {
                    self.write_body(&self.conn, &id, &doc).await?;
                }
                return Ok(UpdateOutcome {
                    matched: 1,
                    modified: u64::from(modified),
                });
            }
        }
        Ok(UpdateOutcome::default())
    }

    async fn aggregate(&self, pipeline: &[Value]) -> StoreResult<Vec<Document>> {
        let docs = self
            .load(&self.conn)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        pipeline::run_pipeline(docs, pipeline)
    }

    async fn create_index(&self, keys: &Value, name: Option<&str>) -> StoreResult<String> {
        let keys = index_keys(keys)?;
        for (field, _) in &keys {
            validate_field_path(field)?;
        }
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_index_name(&keys));
        let keys_json = serde_json::to_string(&keys)?;

        let existing = IndexRow::find_by_statement(stmt(
            &format!(
                r#"SELECT name, keys FROM "{}" WHERE collection = ? AND name = ?"#,
                INDEX_TABLE
            ),
            vec![self.collection.clone().into(), name.clone().into()],
        ))
        .one(&self.conn)
        .await?;

        if let Some(row) = existing {
            if row.keys == keys_json {
                tracing::debug!("Index '{}' already exists on {}", row.name, self.collection);
                return Ok(name);
            }
            return Err(StoreError::IndexConflict { name });
        }

        let columns = keys
            .iter()
            .map(|(field, direction)| {
                format!(
                    "json_extract(body, '$.{}') {}",
                    field,
                    if *direction < 0 { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let txn = self.conn.begin().await?;
        txn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                r#"CREATE INDEX IF NOT EXISTS "{}__{}" ON "{}" ({});"#,
                self.collection,
                name.replace('"', ""),
                self.collection,
                columns
            ),
        ))
        .await?;
        txn.execute(stmt(
            &format!(
                r#"INSERT INTO "{}" (collection, name, keys) VALUES (?, ?, ?)"#,
                INDEX_TABLE
            ),
            vec![
                self.collection.clone().into(),
                name.clone().into(),
                keys_json.into(),
            ],
        ))
        .await?;
        txn.commit().await?;

        Ok(name)
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        let rows = IndexRow::find_by_statement(stmt(
            &format!(
                r#"SELECT name, keys FROM "{}" WHERE collection = ? ORDER BY rowid"#,
                INDEX_TABLE
            ),
            vec![self.collection.clone().into()],
        ))
        .all(&self.conn)
        .await?;

        let mut names = vec!["_id_".to_string()];
        names.extend(rows.into_iter().map(|row| row.name));
        Ok(names)
    }
}
