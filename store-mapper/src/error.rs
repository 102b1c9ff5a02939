use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreMapperError {
    #[error("platform lookup failed: {0}")]
    Platform(#[from] platform_client::PlatformError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
