//! Helpers for the `DATABASE_URL`-gated Postgres tests.
//!
//! Tests sharing the database serialize through [`test_lock`]: the schema
//! lifecycle tests drop and recreate the shared table, which would race with
//! concurrent data tests otherwise.

use std::sync::OnceLock;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;

use netroles_application::RoleAssignmentRepository;

use crate::PostgresRoleAssignmentRepository;

pub(crate) fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Connects to `DATABASE_URL`, or returns `None` to skip the test when the
/// environment provides no database.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    Some(pool)
}

/// Creates the index schema and empties every table the tests touch.
pub(crate) async fn prepare_index(pool: &PgPool) -> PostgresRoleAssignmentRepository {
    let repository = PostgresRoleAssignmentRepository::new(pool.clone());
    if let Err(error) = repository.create_schema().await {
        panic!("failed to create index schema for test: {error}");
    }

    for statement in [
        "DELETE FROM user_role_index",
        "DELETE FROM role_index_state WHERE key LIKE 'migration.complete.%'",
    ] {
        if let Err(error) = sqlx::query(statement).execute(pool).await {
            panic!("failed to reset index tables for test: {error}");
        }
    }

    repository
}

/// Creates and empties the host-platform tables the directory reads.
pub(crate) async fn prepare_platform_tables(pool: &PgPool) {
    for statement in [
        "CREATE TABLE IF NOT EXISTS platform_users (
            id bigint PRIMARY KEY,
            login varchar(191) NOT NULL UNIQUE
        )",
        "CREATE TABLE IF NOT EXISTS platform_memberships (
            user_id bigint NOT NULL,
            site_id bigint NOT NULL,
            role varchar(191) NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS platform_sites (
            id bigint PRIMARY KEY,
            network_id bigint NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS platform_network_admins (
            network_id bigint NOT NULL,
            login varchar(191) NOT NULL
        )",
        "DELETE FROM platform_network_admins",
        "DELETE FROM platform_memberships",
        "DELETE FROM platform_sites",
        "DELETE FROM platform_users",
    ] {
        if let Err(error) = sqlx::query(statement).execute(pool).await {
            panic!("failed to prepare platform tables for test: {error}");
        }
    }
}

pub(crate) async fn seed_user(pool: &PgPool, id: i64, login: &str) {
    let insert = sqlx::query("INSERT INTO platform_users (id, login) VALUES ($1, $2)")
        .bind(id)
        .bind(login)
        .execute(pool)
        .await;
    assert!(insert.is_ok());
}

pub(crate) async fn seed_site(pool: &PgPool, id: i64, network_id: i64) {
    let insert = sqlx::query("INSERT INTO platform_sites (id, network_id) VALUES ($1, $2)")
        .bind(id)
        .bind(network_id)
        .execute(pool)
        .await;
    assert!(insert.is_ok());
}

pub(crate) async fn seed_membership(pool: &PgPool, user_id: i64, site_id: i64, role: &str) {
    let insert = sqlx::query(
        "INSERT INTO platform_memberships (user_id, site_id, role) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(site_id)
    .bind(role)
    .execute(pool)
    .await;
    assert!(insert.is_ok());
}

pub(crate) async fn seed_network_admin(pool: &PgPool, network_id: i64, login: &str) {
    let insert = sqlx::query(
        "INSERT INTO platform_network_admins (network_id, login) VALUES ($1, $2)",
    )
    .bind(network_id)
    .bind(login)
    .execute(pool)
    .await;
    assert!(insert.is_ok());
}
