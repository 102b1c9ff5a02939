//! DB-backed check of the category-sync idempotence property from
//! SPEC_FULL.md §8 (scenario 4): re-running the two-pass upsert against the
//! same 3-node tree leaves the row count at 3 and resolves `parent_db_id`
//! correctly on both runs.
//!
//! Requires a reachable Postgres at `DATABASE_URL`; not run by default.

use observatory_db::repo;
use sqlx::postgres::PgPoolOptions;

async fn test_pool() -> sqlx::PgPool {
    let dsn = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this ignored test");
    let pool = PgPoolOptions::new().connect(&dsn).await.expect("connect to test database");
    observatory_db::run_migrations(&pool).await.expect("apply migrations");
    pool
}

async fn sync_three_node_tree(pool: &sqlx::PgPool, host: &str) {
    let root = repo::catalog::upsert_category(pool, host, 1, "root", None).await.unwrap();
    repo::catalog::upsert_category(pool, host, 2, "child-a", Some(1)).await.unwrap();
    repo::catalog::upsert_category(pool, host, 3, "child-b", Some(1)).await.unwrap();
    repo::catalog::relink_parent_db_id(pool, host, 2, root).await.unwrap();
    repo::catalog::relink_parent_db_id(pool, host, 3, root).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn resyncing_identical_tree_is_idempotent() {
    let pool = test_pool().await;
    let host = "https://idempotence-test.example/";

    sync_three_node_tree(&pool, host).await;
    let first_pass = repo::catalog::list_categories_for_host(&pool, host).await.unwrap();
    assert_eq!(first_pass.len(), 3);

    sync_three_node_tree(&pool, host).await;
    let second_pass = repo::catalog::list_categories_for_host(&pool, host).await.unwrap();
    assert_eq!(second_pass.len(), 3, "re-running sync must not create duplicate category rows");

    let root_db_id = second_pass
        .iter()
        .find(|c| c.external_category_id == 1)
        .expect("root category present")
        .id;
    for external_id in [2, 3] {
        let node = second_pass.iter().find(|c| c.external_category_id == external_id).unwrap();
        assert_eq!(node.parent_db_id, Some(root_db_id));
    }
}
