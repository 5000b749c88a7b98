#![allow(dead_code)]

use std::path::PathBuf;

use booking::repos::Store;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;

pub mod api_app;
pub mod calendar_mock;

static MIGRATIONS_APPLIED: OnceCell<()> = OnceCell::const_new();

/// Store backed by `DATABASE_URL`, or `None` when no database is configured
/// so postgres-backed tests can bail out early.
pub async fn test_store() -> Option<Store> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping postgres-backed test");
        return None;
    };
    apply_migrations_once(&database_url).await;

    let store = Store::connect(&database_url, 10)
        .await
        .expect("test store connection should succeed");
    reset_database(store.pool()).await;
    Some(store)
}

pub async fn reset_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE appointments, chat_sessions")
        .execute(pool)
        .await
        .expect("database reset should succeed");
}

async fn apply_migrations_once(database_url: &str) {
    MIGRATIONS_APPLIED
        .get_or_init(|| async move {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(database_url)
                .await
                .expect("migration pool connection should succeed");

            let migrations_dir =
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations");
            let migrator = sqlx::migrate::Migrator::new(migrations_dir)
                .await
                .expect("migrations should load");
            migrator
                .run(&pool)
                .await
                .expect("migrations should apply successfully");
        })
        .await;
}
