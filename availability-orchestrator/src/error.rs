use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session construction failed: {0}")]
    Session(#[from] common_http::SessionError),
}
