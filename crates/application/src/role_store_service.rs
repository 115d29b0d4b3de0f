//! The role store: owns the derived table and keeps it in sync with the
//! authoritative per-user role assignments.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use netroles_core::{AppError, AppResult, NetworkId, SiteId, UserId};
use netroles_domain::{AssignmentFilter, RoleAssignment, RoleName};

use crate::ports::{RoleAssignmentRepository, SchemaStatus, TenantDirectory, UserDirectory};


/// Service owning the derived role-assignment table.
///
/// All operations are idempotent and individually retryable, so bulk callers
/// can count per-item failures and continue instead of aborting.
pub struct RoleStoreService {
    repository: Arc<dyn RoleAssignmentRepository>,
    users: Arc<dyn UserDirectory>,
    tenants: Arc<dyn TenantDirectory>,
}

impl RoleStoreService {
    /// Creates the service over its persistence and directory ports.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleAssignmentRepository>,
        users: Arc<dyn UserDirectory>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            repository,
            users,
            tenants,
        }
    }

    /// Records that a user holds a role at a scope.
    ///
    /// Inserting an already-present four-tuple is a success no-op returning
    /// the existing row.
    pub async fn add_role(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<RoleAssignment> {
        if !user_id.is_valid() {
            return Err(AppError::Validation(format!(
                "user id {user_id} is below the platform minimum"
            )));
        }

        let assignment = self
            .repository
            .insert_if_absent(user_id, role, site_id, network_id)
            .await?;
        debug!(
            user = user_id.as_i64(),
            role = role.as_str(),
            site = site_id.as_i64(),
            network = network_id.as_i64(),
            "role assignment recorded"
        );

        Ok(assignment)
    }

    /// Deletes every row matching all present filter fields.
    ///
    /// Omitted fields are wildcards; zero rows removed is a valid result.
    pub async fn remove_roles(&self, filter: &AssignmentFilter) -> AppResult<u64> {
        if filter.is_empty() {
            return Err(AppError::Validation(
                "assignment filter must set at least one field".to_owned(),
            ));
        }

        self.repository.remove(filter).await
    }

    /// Exact four-tuple lookup; a miss is `Ok(None)`.
    pub async fn get_role(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<Option<RoleAssignment>> {
        self.repository.find(user_id, role, site_id, network_id).await
    }

    /// Reconciles the store with a fresh snapshot of one user's roles at one
    /// site: stale rows are removed, missing rows are added, as a unit.
    pub async fn sync_user_roles(
        &self,
        user_id: UserId,
        site_id: SiteId,
        network_id: NetworkId,
        roles: &BTreeSet<RoleName>,
    ) -> AppResult<()> {
        if !user_id.is_valid() {
            return Err(AppError::Validation(format!(
                "user id {user_id} is below the platform minimum"
            )));
        }

        self.repository
            .replace_user_roles(user_id, site_id, network_id, roles)
            .await
    }

    /// Replaces a network's super-admin set with the users behind the given
    /// logins. Last write wins; the previous set is not diffed against.
    ///
    /// Unresolvable logins are skipped, not errors. Returns the number of
    /// resolved users.
    pub async fn sync_super_admins(
        &self,
        network_id: NetworkId,
        logins: &[String],
    ) -> AppResult<usize> {
        let mut user_ids = Vec::with_capacity(logins.len());
        for login in logins {
            match self.users.find_user_by_login(login).await? {
                Some(user_id) => user_ids.push(user_id),
                None => warn!(
                    login = login.as_str(),
                    network = network_id.as_i64(),
                    "skipping unresolvable super-admin login"
                ),
            }
        }

        self.repository
            .replace_super_admins(network_id, &user_ids)
            .await?;
        info!(
            network = network_id.as_i64(),
            admins = user_ids.len(),
            "super-admin set replaced"
        );

        Ok(user_ids.len())
    }

    /// Reassigns every row of a site to a new network. A move onto the same
    /// network is a no-op. Returns the number of rows updated.
    pub async fn move_site(
        &self,
        site_id: SiteId,
        old_network_id: NetworkId,
        new_network_id: NetworkId,
    ) -> AppResult<u64> {
        if old_network_id == new_network_id {
            return Ok(0);
        }

        let moved = self.repository.move_site(site_id, new_network_id).await?;
        info!(
            site = site_id.as_i64(),
            from = old_network_id.as_i64(),
            to = new_network_id.as_i64(),
            rows = moved,
            "site reassigned to new network"
        );

        Ok(moved)
    }

    /// Bulk delete for lifecycle teardown (user purged, site or network
    /// deleted). Same semantics as [`remove_roles`](Self::remove_roles).
    pub async fn delete_scope(&self, filter: &AssignmentFilter) -> AppResult<u64> {
        let removed = self.remove_roles(filter).await?;
        info!(rows = removed, "scope removed from role index");
        Ok(removed)
    }

    /// Reads the user's current role set at a site from the directory and
    /// reconciles the store with it. The primitive behind "profile saved /
    /// registered" and "migrate one user".
    pub async fn refresh_user(&self, user_id: UserId, site_id: SiteId) -> AppResult<()> {
        let network_id = self.tenants.network_of(site_id).await?;
        let roles = self.users.roles_at(user_id, site_id).await?;
        self.sync_user_roles(user_id, site_id, network_id, &roles)
            .await
    }

    /// Idempotently creates the index schema; safe on every process start.
    pub async fn create_schema(&self) -> AppResult<SchemaStatus> {
        self.repository.create_schema().await
    }

    /// Drops the index table and clears the persisted markers.
    pub async fn drop_schema(&self) -> AppResult<()> {
        self.repository.drop_schema().await
    }
}
