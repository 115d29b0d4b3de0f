//! Read-only adapter over the hosting platform's user and tenancy tables.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use netroles_application::{TenantDirectory, UserDirectory};
use netroles_core::{AppError, AppResult, NetworkId, SiteId, UserId};
use netroles_domain::RoleName;

/// PostgreSQL-backed view of the host platform's directories.
///
/// Reads the host-owned `platform_users`, `platform_memberships`,
/// `platform_sites` and `platform_network_admins` tables; never writes them.
#[derive(Clone)]
pub struct PostgresPlatformDirectory {
    pool: PgPool,
}

impl PostgresPlatformDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresPlatformDirectory {
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<UserId>> {
        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM platform_users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to resolve login '{login}': {error}"))
        })?;

        Ok(user_id.map(UserId::new))
    }

    async fn roles_at(&self, user_id: UserId, site_id: SiteId) -> AppResult<BTreeSet<RoleName>> {
        let labels = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM platform_memberships
            WHERE user_id = $1 AND site_id = $2
            "#,
        )
        .bind(user_id.as_i64())
        .bind(site_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to read membership roles: {error}"))
        })?;

        labels.into_iter().map(RoleName::new).collect()
    }

    async fn list_user_ids(&self) -> AppResult<Vec<UserId>> {
        let user_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM platform_users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to list platform users: {error}"))
        })?;

        Ok(user_ids.into_iter().map(UserId::new).collect())
    }

    async fn site_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<SiteId>> {
        let site_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT site_id
            FROM platform_memberships
            WHERE user_id = $1
            ORDER BY site_id
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to list user sites: {error}"))
        })?;

        Ok(site_ids.into_iter().map(SiteId::new).collect())
    }
}

#[async_trait]
impl TenantDirectory for PostgresPlatformDirectory {
    async fn network_of(&self, site_id: SiteId) -> AppResult<NetworkId> {
        let network_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT network_id
            FROM platform_sites
            WHERE id = $1
            "#,
        )
        .bind(site_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to resolve site network: {error}"))
        })?;

        // A site the host never registered belongs to the single-tenant
        // default network.
        Ok(network_id.map(NetworkId::new).unwrap_or_default())
    }

    async fn list_network_ids(&self) -> AppResult<Vec<NetworkId>> {
        let network_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT network_id FROM platform_sites
            UNION
            SELECT network_id FROM platform_network_admins
            ORDER BY network_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to list networks: {error}"))
        })?;

        Ok(network_ids.into_iter().map(NetworkId::new).collect())
    }

    async fn admin_logins(&self, network_id: NetworkId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT login
            FROM platform_network_admins
            WHERE network_id = $1
            ORDER BY login
            "#,
        )
        .bind(network_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to list network admins: {error}"))
        })
    }
}
