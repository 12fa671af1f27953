use thiserror::Error;

/// Startup and I/O failures outside the request path.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("logging setup failed: {0}")]
    Telemetry(String),
    #[error("setting `{key}` is missing or invalid")]
    Configuration { key: &'static str },
}

impl InfraError {
    pub fn configuration(key: &'static str) -> Self {
        Self::Configuration { key }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}
