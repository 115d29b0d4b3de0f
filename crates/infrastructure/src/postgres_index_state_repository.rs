//! Persisted activation markers backing the query-rewriter gate.

use async_trait::async_trait;
use sqlx::PgPool;

use netroles_application::IndexStateRepository;
use netroles_core::{AppError, AppResult, NetworkId};

/// Marker key storing the current schema version.
pub(crate) const SCHEMA_VERSION_KEY: &str = "schema.version";

/// Prefix shared by all per-network migration-complete markers.
pub(crate) const MIGRATION_MARKER_PREFIX: &str = "migration.complete.";

/// Marker key recording that a network finished its bulk migration.
pub(crate) fn migration_marker_key(network_id: NetworkId) -> String {
    format!("{MIGRATION_MARKER_PREFIX}{}", network_id.as_i64())
}

/// PostgreSQL-backed activation markers, one key-value row per marker.
#[derive(Clone)]
pub struct PostgresIndexStateRepository {
    pool: PgPool,
}

impl PostgresIndexStateRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IndexStateRepository for PostgresIndexStateRepository {
    async fn is_migration_complete(&self, network_id: NetworkId) -> AppResult<bool> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value
            FROM role_index_state
            WHERE key = $1
            "#,
        )
        .bind(migration_marker_key(network_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to read migration marker: {error}"))
        })?;

        Ok(value.as_deref() == Some("1"))
    }

    async fn mark_migration_complete(&self, network_id: NetworkId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_index_state (key, value)
            VALUES ($1, '1')
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(migration_marker_key(network_id))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to write migration marker: {error}"))
        })?;

        Ok(())
    }
}
