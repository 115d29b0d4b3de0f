//! Ports the role index consumes: its own persistence, the persisted
//! activation markers, and the read-only directories of the hosting platform.

use std::collections::BTreeSet;

use async_trait::async_trait;

use netroles_core::{AppResult, NetworkId, SiteId, UserId};
use netroles_domain::{AssignmentFilter, RoleAssignment, RoleCounts, RoleName};

/// Outcome of an idempotent schema-creation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The table was created at the current schema version.
    Created,
    /// The table already existed at the current schema version.
    AlreadyExists,
}

/// Persistence port for the derived role-assignment table.
///
/// Implementations must back the four-tuple invariant with a storage-level
/// uniqueness guarantee: the check-then-insert in [`insert_if_absent`] is
/// insufficient alone under concurrent calls for the same tuple.
///
/// [`insert_if_absent`]: RoleAssignmentRepository::insert_if_absent
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Inserts a row unless the exact four-tuple already exists; returns the
    /// existing or newly created row. A duplicate is a success no-op.
    async fn insert_if_absent(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<RoleAssignment>;

    /// Exact four-tuple lookup; a miss is `Ok(None)`, never an error.
    async fn find(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<Option<RoleAssignment>>;

    /// Deletes every row matching all present filter fields; returns the
    /// number of rows removed. The empty filter is rejected.
    async fn remove(&self, filter: &AssignmentFilter) -> AppResult<u64>;

    /// Transactionally reconciles one user's rows at one site with a role
    /// snapshot: stale rows go, missing rows are added. Idempotent.
    async fn replace_user_roles(
        &self,
        user_id: UserId,
        site_id: SiteId,
        network_id: NetworkId,
        roles: &BTreeSet<RoleName>,
    ) -> AppResult<()>;

    /// Transactionally replaces a network's super-admin rows with one row per
    /// given user. Readers never observe the mid-replace empty set.
    async fn replace_super_admins(
        &self,
        network_id: NetworkId,
        user_ids: &[UserId],
    ) -> AppResult<()>;

    /// Reassigns every row of a site to a new network in one bulk update;
    /// returns the number of rows updated.
    async fn move_site(&self, site_id: SiteId, new_network_id: NetworkId) -> AppResult<u64>;

    /// Membership counts for one site scope, computed from the index.
    async fn count_site_roles(&self, site_id: SiteId) -> AppResult<RoleCounts>;

    /// Idempotently creates the index schema, keyed on the persisted
    /// schema-version marker. Safe to call on every process start.
    async fn create_schema(&self) -> AppResult<SchemaStatus>;

    /// Drops the index table and clears the schema-version and
    /// migration-complete markers.
    async fn drop_schema(&self) -> AppResult<()>;
}

/// Persisted activation markers gating the query rewriter.
#[async_trait]
pub trait IndexStateRepository: Send + Sync {
    /// Whether the bulk migration has finished backfilling this network.
    async fn is_migration_complete(&self, network_id: NetworkId) -> AppResult<bool>;

    /// Records that the bulk migration finished backfilling this network.
    async fn mark_migration_complete(&self, network_id: NetworkId) -> AppResult<()>;
}

/// Read-only view of the hosting platform's user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a login name to a user identity, if the login exists.
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<UserId>>;

    /// The user's current role set at one site, read from the authoritative
    /// (unindexed) source of truth.
    async fn roles_at(&self, user_id: UserId, site_id: SiteId) -> AppResult<BTreeSet<RoleName>>;

    /// Every user identity known to the platform, for bulk migration.
    async fn list_user_ids(&self) -> AppResult<Vec<UserId>>;

    /// Every site a user belongs to, for bulk migration.
    async fn site_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<SiteId>>;
}

/// Read-only view of the hosting platform's tenancy layout.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolves the network a site belongs to. A site unknown to the
    /// directory resolves to the single-tenant default network.
    async fn network_of(&self, site_id: SiteId) -> AppResult<NetworkId>;

    /// Every known network, for bulk migration.
    async fn list_network_ids(&self) -> AppResult<Vec<NetworkId>>;

    /// The configured administrator logins of a network.
    async fn admin_logins(&self, network_id: NetworkId) -> AppResult<Vec<String>>;
}
