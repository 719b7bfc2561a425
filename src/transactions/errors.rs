use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("DATABASE_URL is not set")]
    NotConfigured,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
