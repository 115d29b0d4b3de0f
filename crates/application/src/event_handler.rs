//! Maps platform lifecycle events onto role store operations.

use std::sync::Arc;

use netroles_core::{AppResult, SiteId};
use netroles_domain::{AssignmentFilter, PlatformEvent, RoleName};

use crate::ports::TenantDirectory;
use crate::role_store_service::RoleStoreService;


/// Listener the hosting platform registers for lifecycle events.
///
/// Constructed once at bootstrap and handed to the host's event source; each
/// event maps to exactly one store operation. Network scope is always
/// resolved from the site through the tenant directory, never taken from a
/// caller-supplied sentinel.
pub struct RoleIndexEventHandler {
    store: Arc<RoleStoreService>,
    tenants: Arc<dyn TenantDirectory>,
}

impl RoleIndexEventHandler {
    /// Creates the handler over the store and the tenant directory.
    #[must_use]
    pub fn new(store: Arc<RoleStoreService>, tenants: Arc<dyn TenantDirectory>) -> Self {
        Self { store, tenants }
    }

    /// Applies one lifecycle event to the index.
    pub async fn handle(&self, event: PlatformEvent) -> AppResult<()> {
        match event {
            PlatformEvent::RoleAdded {
                user_id,
                role,
                site_id,
            }
            | PlatformEvent::UserAddedToSite {
                user_id,
                role,
                site_id,
            } => {
                let network_id = self.tenants.network_of(site_id).await?;
                self.store
                    .add_role(user_id, &role, site_id, network_id)
                    .await?;
            }
            PlatformEvent::RoleRemoved {
                user_id,
                role,
                site_id,
            } => {
                self.store
                    .remove_roles(
                        &AssignmentFilter::for_user(user_id)
                            .with_role(role)
                            .with_site(site_id),
                    )
                    .await?;
            }
            PlatformEvent::RolesReplaced {
                user_id,
                new_role,
                site_id,
            } => {
                let network_id = self.tenants.network_of(site_id).await?;
                self.store
                    .remove_roles(
                        &AssignmentFilter::for_user(user_id)
                            .with_site(site_id)
                            .with_network(network_id),
                    )
                    .await?;
                if let Some(role) = new_role {
                    self.store
                        .add_role(user_id, &role, site_id, network_id)
                        .await?;
                }
            }
            PlatformEvent::UserRemovedFromSite { user_id, site_id }
            | PlatformEvent::UserDeleted { user_id, site_id } => {
                self.store
                    .remove_roles(&AssignmentFilter::for_user(user_id).with_site(site_id))
                    .await?;
            }
            PlatformEvent::UserSaved { user_id, site_id } => {
                self.store.refresh_user(user_id, site_id).await?;
            }
            PlatformEvent::UserPurged { user_id } => {
                self.store
                    .delete_scope(&AssignmentFilter::for_user(user_id))
                    .await?;
            }
            PlatformEvent::SuperAdminGranted {
                user_id,
                network_id,
            } => {
                self.store
                    .add_role(user_id, &RoleName::super_admin(), SiteId::GLOBAL, network_id)
                    .await?;
            }
            PlatformEvent::SuperAdminRevoked {
                user_id,
                network_id,
            } => {
                self.store
                    .remove_roles(
                        &AssignmentFilter::for_user(user_id)
                            .with_role(RoleName::super_admin())
                            .with_network(network_id),
                    )
                    .await?;
            }
            PlatformEvent::SuperAdminListReplaced { network_id, logins } => {
                self.store.sync_super_admins(network_id, &logins).await?;
            }
            PlatformEvent::NetworkCreated { network_id } => {
                let logins = self.tenants.admin_logins(network_id).await?;
                self.store.sync_super_admins(network_id, &logins).await?;
            }
            PlatformEvent::NetworkDeleted { network_id } => {
                self.store
                    .delete_scope(&AssignmentFilter::for_network(network_id))
                    .await?;
            }
            PlatformEvent::SiteMoved {
                site_id,
                old_network_id,
                new_network_id,
            } => {
                self.store
                    .move_site(site_id, old_network_id, new_network_id)
                    .await?;
            }
            PlatformEvent::SiteDeleted { site_id } => {
                self.store
                    .delete_scope(&AssignmentFilter::for_site(site_id))
                    .await?;
            }
        }

        Ok(())
    }
}
