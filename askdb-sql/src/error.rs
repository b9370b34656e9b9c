use askdb_core::AskDbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlToolsError {
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("query failed: {source} (sql: {sql})")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
    #[error("unsupported database type '{0}'")]
    UnsupportedDialect(String),
    #[error("failed to render result: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<SqlToolsError> for AskDbError {
    fn from(error: SqlToolsError) -> Self {
        AskDbError::Database(error.to_string())
    }
}
