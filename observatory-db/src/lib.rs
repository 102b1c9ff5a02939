pub mod models;
pub mod repo;

pub use sqlx::PgPool;

/// Runs the crate's own migrations against `pool`. Separate from any
/// external schema-migration tooling -- this only creates the tables this
/// crate owns (see `migrations/`).
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../migrations").run(pool).await
}
