use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Ошибки реализаций хранилища документов
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid query document: {0}")]
    InvalidQuery(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("duplicate _id '{0}'")]
    DuplicateKey(String),

    #[error("index '{name}' already exists with different keys")]
    IndexConflict { name: String },

    #[error("invalid name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidName(String),

    #[error("unsupported store url '{0}'")]
    UnsupportedUrl(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidQuery(message.into())
    }
}
