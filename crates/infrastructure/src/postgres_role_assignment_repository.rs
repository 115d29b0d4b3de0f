//! PostgreSQL-backed persistence for the derived role-assignment table.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use netroles_application::{RoleAssignmentRepository, SchemaStatus};
use netroles_core::{AppError, AppResult, AssignmentId, NetworkId, SiteId, UserId};
use netroles_domain::{
    AssignmentFilter, ROLE_NAME_MAX_LENGTH, RoleAssignment, RoleCounts, RoleName,
    SUPER_ADMIN_ROLE,
};

use crate::postgres_index_state_repository::{MIGRATION_MARKER_PREFIX, SCHEMA_VERSION_KEY};


/// Version string written to the schema marker after DDL runs.
const SCHEMA_VERSION: &str = "1.0.0";

const SELECT_COLUMNS: &str = "id, site_id, network_id, user_id, role";

/// PostgreSQL-backed repository owning the `user_role_index` table.
///
/// The four-tuple invariant is backed by a UNIQUE index; the check-then-insert
/// in [`insert_if_absent`](RoleAssignmentRepository::insert_if_absent) is only
/// the fast path.
#[derive(Clone)]
pub struct PostgresRoleAssignmentRepository {
    pool: PgPool,
}

impl PostgresRoleAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_state_table(&self) -> AppResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS role_index_state (
                key varchar({ROLE_NAME_MAX_LENGTH}) PRIMARY KEY,
                value text NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to ensure marker table: {error}"))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: i64,
    site_id: i64,
    network_id: i64,
    user_id: i64,
    role: String,
}

fn assignment_from_row(row: AssignmentRow) -> AppResult<RoleAssignment> {
    let role = RoleName::new(row.role)
        .map_err(|error| AppError::Internal(format!("stored role label is invalid: {error}")))?;

    Ok(RoleAssignment {
        id: AssignmentId::new(row.id),
        user_id: UserId::new(row.user_id),
        site_id: SiteId::new(row.site_id),
        network_id: NetworkId::new(row.network_id),
        role,
    })
}

fn push_filter_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &AssignmentFilter) {
    let mut first = true;
    if let Some(user_id) = filter.user_id {
        builder.push(" WHERE user_id = ");
        builder.push_bind(user_id.as_i64());
        first = false;
    }
    if let Some(role) = &filter.role {
        builder.push(if first { " WHERE " } else { " AND " });
        builder.push("role = ");
        builder.push_bind(role.as_str().to_owned());
        first = false;
    }
    if let Some(site_id) = filter.site_id {
        builder.push(if first { " WHERE " } else { " AND " });
        builder.push("site_id = ");
        builder.push_bind(site_id.as_i64());
        first = false;
    }
    if let Some(network_id) = filter.network_id {
        builder.push(if first { " WHERE " } else { " AND " });
        builder.push("network_id = ");
        builder.push_bind(network_id.as_i64());
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleAssignmentRepository {
    async fn insert_if_absent(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<RoleAssignment> {
        if let Some(existing) = self.find(user_id, role, site_id, network_id).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, AssignmentRow>(
            r#"
            INSERT INTO user_role_index (user_id, site_id, network_id, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, role, site_id, network_id) DO NOTHING
            RETURNING id, site_id, network_id, user_id, role
            "#,
        )
        .bind(user_id.as_i64())
        .bind(site_id.as_i64())
        .bind(network_id.as_i64())
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to insert role assignment: {error}"))
        })?;

        match inserted {
            Some(row) => assignment_from_row(row),
            // Lost the insert race; the winner's row is the result.
            None => self
                .find(user_id, role, site_id, network_id)
                .await?
                .ok_or_else(|| {
                    AppError::Persistence(
                        "role row missing after conflicting insert".to_owned(),
                    )
                }),
        }
    }

    async fn find(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<Option<RoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {SELECT_COLUMNS}
            FROM user_role_index
            WHERE user_id = $1 AND role = $2 AND site_id = $3 AND network_id = $4"
        ))
        .bind(user_id.as_i64())
        .bind(role.as_str())
        .bind(site_id.as_i64())
        .bind(network_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to look up role assignment: {error}"))
        })?;

        row.map(assignment_from_row).transpose()
    }

    async fn remove(&self, filter: &AssignmentFilter) -> AppResult<u64> {
        if filter.is_empty() {
            return Err(AppError::Validation(
                "assignment filter must set at least one field".to_owned(),
            ));
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("DELETE FROM user_role_index");
        push_filter_conditions(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await.map_err(|error| {
            AppError::Persistence(format!("failed to delete role assignments: {error}"))
        })?;

        Ok(result.rows_affected())
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        site_id: SiteId,
        network_id: NetworkId,
        roles: &BTreeSet<RoleName>,
    ) -> AppResult<()> {
        let keep: Vec<String> = roles.iter().map(|role| role.as_str().to_owned()).collect();

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Persistence(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM user_role_index
            WHERE user_id = $1
              AND site_id = $2
              AND (role <> ALL($3) OR network_id <> $4)
            "#,
        )
        .bind(user_id.as_i64())
        .bind(site_id.as_i64())
        .bind(&keep)
        .bind(network_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to remove stale role rows: {error}"))
        })?;

        for role in roles {
            sqlx::query(
                r#"
                INSERT INTO user_role_index (user_id, site_id, network_id, role)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, role, site_id, network_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_i64())
            .bind(site_id.as_i64())
            .bind(network_id.as_i64())
            .bind(role.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to insert role row: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Persistence(format!("failed to commit transaction: {error}"))
        })
    }

    async fn replace_super_admins(
        &self,
        network_id: NetworkId,
        user_ids: &[UserId],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Persistence(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM user_role_index
            WHERE network_id = $1 AND role = $2
            "#,
        )
        .bind(network_id.as_i64())
        .bind(SUPER_ADMIN_ROLE)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to clear super-admin rows: {error}"))
        })?;

        for user_id in user_ids {
            sqlx::query(
                r#"
                INSERT INTO user_role_index (user_id, site_id, network_id, role)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, role, site_id, network_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_i64())
            .bind(SiteId::GLOBAL.as_i64())
            .bind(network_id.as_i64())
            .bind(SUPER_ADMIN_ROLE)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to insert super-admin row: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Persistence(format!("failed to commit transaction: {error}"))
        })
    }

    async fn move_site(&self, site_id: SiteId, new_network_id: NetworkId) -> AppResult<u64> {
        // One statement: readers never observe a partially moved site.
        let result = sqlx::query(
            r#"
            UPDATE user_role_index
            SET network_id = $2
            WHERE site_id = $1
            "#,
        )
        .bind(site_id.as_i64())
        .bind(new_network_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to move site rows: {error}"))
        })?;

        Ok(result.rows_affected())
    }

    async fn count_site_roles(&self, site_id: SiteId) -> AppResult<RoleCounts> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT user_id)
            FROM user_role_index
            WHERE site_id = $1
            "#,
        )
        .bind(site_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to count site users: {error}"))
        })?;

        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT role, COUNT(*)
            FROM user_role_index
            WHERE site_id = $1
            GROUP BY role
            ORDER BY role
            "#,
        )
        .bind(site_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to count site roles: {error}"))
        })?;

        let by_role: BTreeMap<String, u64> = rows
            .into_iter()
            .map(|(role, count)| (role, count.max(0) as u64))
            .collect();

        Ok(RoleCounts {
            total_users: total.max(0) as u64,
            by_role,
        })
    }

    async fn create_schema(&self) -> AppResult<SchemaStatus> {
        self.ensure_state_table().await?;

        let version = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value
            FROM role_index_state
            WHERE key = $1
            "#,
        )
        .bind(SCHEMA_VERSION_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to read schema version: {error}"))
        })?;

        if version.as_deref() == Some(SCHEMA_VERSION) {
            return Ok(SchemaStatus::AlreadyExists);
        }

        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS user_role_index (
                    id bigserial PRIMARY KEY,
                    site_id bigint NOT NULL DEFAULT 0,
                    network_id bigint NOT NULL DEFAULT 0,
                    user_id bigint NOT NULL DEFAULT 0,
                    role varchar({ROLE_NAME_MAX_LENGTH}) NOT NULL
                )"
            ),
            "CREATE UNIQUE INDEX IF NOT EXISTS user_role_index_tuple
                ON user_role_index (user_id, role, site_id, network_id)"
                .to_owned(),
            "CREATE INDEX IF NOT EXISTS user_role_index_site_id
                ON user_role_index (site_id)"
                .to_owned(),
            "CREATE INDEX IF NOT EXISTS user_role_index_network_id
                ON user_role_index (network_id)"
                .to_owned(),
            "CREATE INDEX IF NOT EXISTS user_role_index_user_id
                ON user_role_index (user_id)"
                .to_owned(),
            "CREATE INDEX IF NOT EXISTS user_role_index_role
                ON user_role_index (role)"
                .to_owned(),
        ];

        for statement in statements {
            sqlx::query(&statement).execute(&self.pool).await.map_err(|error| {
                AppError::Persistence(format!("failed to create index schema: {error}"))
            })?;
        }

        sqlx::query(
            r#"
            INSERT INTO role_index_state (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(SCHEMA_VERSION_KEY)
        .bind(SCHEMA_VERSION)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to write schema version: {error}"))
        })?;

        Ok(SchemaStatus::Created)
    }

    async fn drop_schema(&self) -> AppResult<()> {
        sqlx::query("DROP TABLE IF EXISTS user_role_index")
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to drop index table: {error}"))
            })?;

        self.ensure_state_table().await?;
        sqlx::query(
            r#"
            DELETE FROM role_index_state
            WHERE key = $1 OR key LIKE $2
            "#,
        )
        .bind(SCHEMA_VERSION_KEY)
        .bind(format!("{MIGRATION_MARKER_PREFIX}%"))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to clear index markers: {error}"))
        })?;

        Ok(())
    }
}
