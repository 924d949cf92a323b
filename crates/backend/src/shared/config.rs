use contracts::enums::Category;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
}

/// Где хранится коллекция
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `memory://` or `sqlite://<directory>`
    pub url: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Сколько записей генерировать в пустую коллекцию
    pub sample_size: usize,
    /// Фиксированный seed для воспроизводимых данных
    #[serde(default)]
    pub seed: Option<u64>,
    pub discount_category: Category,
    pub discount_factor: f64,
    /// Порог цены для составного фильтра
    pub premium_price_threshold: f64,
    pub export_path: String,
    pub charts_dir: String,
}

/// Конфигурация по умолчанию (встроена в бинарник)
const DEFAULT_CONFIG: &str = r#"
[store]
url = "sqlite://target/db"
database = "sales_db"
collection = "sales_data"

[pipeline]
sample_size = 500
discount_category = "Electronics"
discount_factor = 0.9
premium_price_threshold = 500.0
export_path = "sales_data_export.csv"
charts_dir = "target/charts"
"#;

/// Загрузка конфигурации из config.toml
///
/// Порядок поиска:
/// 1. Рядом с исполняемым файлом (для production)
/// 2. Встроенная конфигурация по умолчанию
///
/// Переменные окружения `SALESFLOW_*` переопределяют хранилище и путь экспорта.
pub fn load_config() -> anyhow::Result<Config> {
    let config = read_config_file()?;
    let config = apply_overrides(config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn read_config_file() -> anyhow::Result<Config> {
    // Ищем config.toml рядом с исполняемым файлом
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    // Используем конфигурацию по умолчанию
    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(url) = lookup("SALESFLOW_STORE_URL") {
        config.store.url = url;
    }
    if let Some(database) = lookup("SALESFLOW_DATABASE") {
        config.store.database = database;
    }
    if let Some(collection) = lookup("SALESFLOW_COLLECTION") {
        config.store.collection = collection;
    }
    if let Some(path) = lookup("SALESFLOW_EXPORT_PATH") {
        config.pipeline.export_path = path;
    }
    config
}

fn validate(config: &Config) -> anyhow::Result<()> {
    if config.store.database.trim().is_empty() {
        anyhow::bail!("store.database must not be empty");
    }
    if config.store.collection.trim().is_empty() {
        anyhow::bail!("store.collection must not be empty");
    }
    if config.pipeline.export_path.trim().is_empty() {
        anyhow::bail!("pipeline.export_path must not be empty");
    }
    let factor = config.pipeline.discount_factor;
    if !factor.is_finite() || factor < 0.0 {
        anyhow::bail!("pipeline.discount_factor must be finite and >= 0, got {}", factor);
    }
    Ok(())
}
