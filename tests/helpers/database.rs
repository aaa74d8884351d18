use sqlx::SqlitePool;

use proctor::adapters::sqlite::create_migrated_test_pool;

/// Create an in-memory SQLite database for testing
///
/// Creates a fresh in-memory database with all embedded migrations
/// applied through the crate's own migration runner, so each test also
/// exercises the schema bootstrap path.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Teardown test database
///
/// Closes the connection pool and cleans up resources.
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}
