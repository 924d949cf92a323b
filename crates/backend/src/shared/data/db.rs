use sea_orm::{Database, DatabaseConnection};
use std::path::{Path, PathBuf};

use crate::shared::docstore::StoreResult;

/// Путь к файлу БД
///
/// Абсолютный путь используется как есть, относительный разрешается от
/// директории исполняемого файла (там же лежит config.toml).
pub fn resolve_db_path(db_file: &Path) -> PathBuf {
    if db_file.is_absolute() {
        return db_file.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join(db_file);
        }
    }

    // Fallback: относительно текущей директории
    db_file.to_path_buf()
}

/// Открыть (создав при необходимости) SQLite файл `db_file`
pub async fn connect(db_file: &Path) -> StoreResult<DatabaseConnection> {
    let db_path = resolve_db_path(db_file);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let absolute_path = if db_path.is_absolute() {
        db_path
    } else {
        std::env::current_dir()?.join(db_path)
    };
    // Нормализуем разделители и формируем корректный URL для Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);

    tracing::debug!("Connecting to {}", db_url);
    let conn = Database::connect(&db_url).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("sales_db.db");
        assert_eq!(resolve_db_path(&absolute), absolute);

        let relative = Path::new("target/db/sales_db.db");
        let exe_dir = std::env::current_exe()
            .unwrap()
            .parent()
            .unwrap()
            .to_path_buf();
        assert_eq!(resolve_db_path(relative), exe_dir.join(relative));
    }
}
