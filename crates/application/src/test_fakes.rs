//! In-memory port implementations shared by the service tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use netroles_core::{AppError, AppResult, AssignmentId, NetworkId, SiteId, UserId};
use netroles_domain::{
    AssignmentFilter, RoleAssignment, RoleCounts, RoleName, SUPER_ADMIN_ROLE,
};

use crate::ports::{
    IndexStateRepository, RoleAssignmentRepository, SchemaStatus, TenantDirectory, UserDirectory,
};

/// Vec-backed assignment repository upholding the four-tuple invariant.
#[derive(Default)]
pub(crate) struct FakeRoleRepository {
    pub rows: Mutex<Vec<RoleAssignment>>,
    next_id: AtomicI64,
    schema_exists: Mutex<bool>,
}

impl FakeRoleRepository {
    pub async fn rows_matching(&self, filter: &AssignmentFilter) -> Vec<RoleAssignment> {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoleAssignmentRepository for FakeRoleRepository {
    async fn insert_if_absent(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<RoleAssignment> {
        let mut rows = self.rows.lock().await;
        if let Some(existing) = rows.iter().find(|row| {
            row.user_id == user_id
                && &row.role == role
                && row.site_id == site_id
                && row.network_id == network_id
        }) {
            return Ok(existing.clone());
        }

        let assignment = RoleAssignment {
            id: AssignmentId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id,
            site_id,
            network_id,
            role: role.clone(),
        };
        rows.push(assignment.clone());
        Ok(assignment)
    }

    async fn find(
        &self,
        user_id: UserId,
        role: &RoleName,
        site_id: SiteId,
        network_id: NetworkId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| {
                row.user_id == user_id
                    && &row.role == role
                    && row.site_id == site_id
                    && row.network_id == network_id
            })
            .cloned())
    }

    async fn remove(&self, filter: &AssignmentFilter) -> AppResult<u64> {
        if filter.is_empty() {
            return Err(AppError::Validation(
                "assignment filter must set at least one field".to_owned(),
            ));
        }

        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        site_id: SiteId,
        network_id: NetworkId,
        roles: &BTreeSet<RoleName>,
    ) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        rows.retain(|row| {
            !(row.user_id == user_id
                && row.site_id == site_id
                && (!roles.contains(&row.role) || row.network_id != network_id))
        });

        for role in roles {
            let present = rows.iter().any(|row| {
                row.user_id == user_id
                    && row.site_id == site_id
                    && row.network_id == network_id
                    && &row.role == role
            });
            if !present {
                rows.push(RoleAssignment {
                    id: AssignmentId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                    user_id,
                    site_id,
                    network_id,
                    role: role.clone(),
                });
            }
        }

        Ok(())
    }

    async fn replace_super_admins(
        &self,
        network_id: NetworkId,
        user_ids: &[UserId],
    ) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        rows.retain(|row| {
            !(row.network_id == network_id && row.role.as_str() == SUPER_ADMIN_ROLE)
        });

        for user_id in user_ids {
            rows.push(RoleAssignment {
                id: AssignmentId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                user_id: *user_id,
                site_id: SiteId::GLOBAL,
                network_id,
                role: RoleName::super_admin(),
            });
        }

        Ok(())
    }

    async fn move_site(&self, site_id: SiteId, new_network_id: NetworkId) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut moved = 0;
        for row in rows.iter_mut().filter(|row| row.site_id == site_id) {
            row.network_id = new_network_id;
            moved += 1;
        }
        Ok(moved)
    }

    async fn count_site_roles(&self, site_id: SiteId) -> AppResult<RoleCounts> {
        let rows = self.rows.lock().await;
        let mut users = BTreeSet::new();
        let mut by_role: BTreeMap<String, u64> = BTreeMap::new();
        for row in rows.iter().filter(|row| row.site_id == site_id) {
            users.insert(row.user_id);
            *by_role.entry(row.role.as_str().to_owned()).or_default() += 1;
        }

        Ok(RoleCounts {
            total_users: users.len() as u64,
            by_role,
        })
    }

    async fn create_schema(&self) -> AppResult<SchemaStatus> {
        let mut exists = self.schema_exists.lock().await;
        if *exists {
            return Ok(SchemaStatus::AlreadyExists);
        }
        *exists = true;
        Ok(SchemaStatus::Created)
    }

    async fn drop_schema(&self) -> AppResult<()> {
        *self.schema_exists.lock().await = false;
        self.rows.lock().await.clear();
        Ok(())
    }
}

/// Set-backed activation markers.
#[derive(Default)]
pub(crate) struct FakeIndexState {
    migrated: Mutex<BTreeSet<i64>>,
}

impl FakeIndexState {
    pub async fn migrate(&self, network_id: NetworkId) {
        self.migrated.lock().await.insert(network_id.as_i64());
    }
}

#[async_trait]
impl IndexStateRepository for FakeIndexState {
    async fn is_migration_complete(&self, network_id: NetworkId) -> AppResult<bool> {
        Ok(self.migrated.lock().await.contains(&network_id.as_i64()))
    }

    async fn mark_migration_complete(&self, network_id: NetworkId) -> AppResult<()> {
        self.migrate(network_id).await;
        Ok(())
    }
}

/// Map-backed host platform directory.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    pub logins: Mutex<BTreeMap<String, UserId>>,
    pub roles: Mutex<BTreeMap<(i64, i64), BTreeSet<RoleName>>>,
    pub site_networks: Mutex<BTreeMap<i64, i64>>,
    pub network_admins: Mutex<BTreeMap<i64, Vec<String>>>,
}

impl FakeDirectory {
    pub async fn add_login(&self, login: &str, user_id: UserId) {
        self.logins.lock().await.insert(login.to_owned(), user_id);
    }

    pub async fn set_roles(&self, user_id: UserId, site_id: SiteId, roles: &[RoleName]) {
        self.roles
            .lock()
            .await
            .insert((user_id.as_i64(), site_id.as_i64()), roles.iter().cloned().collect());
    }

    pub async fn set_network(&self, site_id: SiteId, network_id: NetworkId) {
        self.site_networks
            .lock()
            .await
            .insert(site_id.as_i64(), network_id.as_i64());
    }

    pub async fn set_admin_logins(&self, network_id: NetworkId, logins: &[&str]) {
        self.network_admins.lock().await.insert(
            network_id.as_i64(),
            logins.iter().map(|login| (*login).to_owned()).collect(),
        );
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<UserId>> {
        Ok(self.logins.lock().await.get(login).copied())
    }

    async fn roles_at(&self, user_id: UserId, site_id: SiteId) -> AppResult<BTreeSet<RoleName>> {
        Ok(self
            .roles
            .lock()
            .await
            .get(&(user_id.as_i64(), site_id.as_i64()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_user_ids(&self) -> AppResult<Vec<UserId>> {
        let roles = self.roles.lock().await;
        let mut user_ids: Vec<i64> = roles.keys().map(|(user_id, _)| *user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        Ok(user_ids.into_iter().map(UserId::new).collect())
    }

    async fn site_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<SiteId>> {
        Ok(self
            .roles
            .lock()
            .await
            .keys()
            .filter(|(candidate, _)| *candidate == user_id.as_i64())
            .map(|(_, site_id)| SiteId::new(*site_id))
            .collect())
    }
}

#[async_trait]
impl TenantDirectory for FakeDirectory {
    async fn network_of(&self, site_id: SiteId) -> AppResult<NetworkId> {
        Ok(self
            .site_networks
            .lock()
            .await
            .get(&site_id.as_i64())
            .copied()
            .map(NetworkId::new)
            .unwrap_or_default())
    }

    async fn list_network_ids(&self) -> AppResult<Vec<NetworkId>> {
        let site_networks = self.site_networks.lock().await;
        let mut network_ids: Vec<i64> = site_networks.values().copied().collect();
        network_ids.sort_unstable();
        network_ids.dedup();
        Ok(network_ids.into_iter().map(NetworkId::new).collect())
    }

    async fn admin_logins(&self, network_id: NetworkId) -> AppResult<Vec<String>> {
        Ok(self
            .network_admins
            .lock()
            .await
            .get(&network_id.as_i64())
            .cloned()
            .unwrap_or_default())
    }
}
