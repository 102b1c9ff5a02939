use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogSyncError {
    #[error("platform call failed: {0}")]
    Platform(#[from] platform_client::PlatformError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
