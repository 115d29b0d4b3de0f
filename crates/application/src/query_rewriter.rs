//! Rewrites role-membership queries to run against the index.

use std::sync::Arc;

use tracing::debug;

use netroles_core::{AppResult, NetworkId, SiteId};
use netroles_domain::{RoleCounts, SearchRewrite, UserSearchQuery, plan_role_rewrite};

use crate::ports::{IndexStateRepository, RoleAssignmentRepository, TenantDirectory};


/// Intercepts the host's generic user-search and user-count paths.
///
/// Both interception points are gated on the per-network migration-complete
/// marker: before the bulk migration has backfilled the index, querying it
/// would silently return zero rows, so the request passes through unmodified
/// (`Ok(None)`) and the host keeps its unindexed path.
pub struct QueryRewriter {
    repository: Arc<dyn RoleAssignmentRepository>,
    state: Arc<dyn IndexStateRepository>,
    tenants: Arc<dyn TenantDirectory>,
}

impl QueryRewriter {
    /// Creates the rewriter over the index and the activation markers.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleAssignmentRepository>,
        state: Arc<dyn IndexStateRepository>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            repository,
            state,
            tenants,
        }
    }

    /// Plans the index-backed rewrite of a user search.
    ///
    /// Returns `Ok(None)` when the network has not finished migrating, or
    /// when the query carries nothing the index can answer. Non-role filters,
    /// pagination and ordering are never touched.
    pub async fn rewrite_search(
        &self,
        network_id: NetworkId,
        query: &UserSearchQuery,
    ) -> AppResult<Option<SearchRewrite>> {
        if !self.state.is_migration_complete(network_id).await? {
            debug!(
                network = network_id.as_i64(),
                "role index not yet migrated; passing search through"
            );
            return Ok(None);
        }

        Ok(plan_role_rewrite(query))
    }

    /// Computes role-membership counts for a site directly from the index,
    /// bypassing the host's generic counting path.
    ///
    /// Returns `Ok(None)` when the site's network has not finished migrating.
    pub async fn count_users(&self, site_id: SiteId) -> AppResult<Option<RoleCounts>> {
        let network_id = self.tenants.network_of(site_id).await?;
        if !self.state.is_migration_complete(network_id).await? {
            debug!(
                site = site_id.as_i64(),
                network = network_id.as_i64(),
                "role index not yet migrated; passing count through"
            );
            return Ok(None);
        }

        self.repository.count_site_roles(site_id).await.map(Some)
    }
}
