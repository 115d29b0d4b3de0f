//! Role assignment rows and the partial-match filters used to delete them.

use netroles_core::{AppError, AppResult, AssignmentId, NetworkId, SiteId, UserId};
use serde::{Deserialize, Serialize};

/// Storage table holding one row per (user, role, site, network).
pub const ROLE_INDEX_TABLE: &str = "user_role_index";

/// Key-value table holding the schema-version and migration markers.
pub const ROLE_INDEX_STATE_TABLE: &str = "role_index_state";

/// Network-wide administrator role label, stored with site scope `0`.
pub const SUPER_ADMIN_ROLE: &str = "super-admin";

/// Maximum stored length of a role label.
pub const ROLE_NAME_MAX_LENGTH: usize = 191;

/// A validated role label.
///
/// Labels are opaque to the store: no enumeration or hierarchy is enforced,
/// only that the label fits the storage column.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role label.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role label must not be empty or whitespace".to_owned(),
            ));
        }

        if trimmed.len() > ROLE_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "role label must not exceed {ROLE_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the network-wide administrator role label.
    #[must_use]
    pub fn super_admin() -> Self {
        Self(SUPER_ADMIN_ROLE.to_owned())
    }

    /// Returns the underlying label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

/// One row of the derived index: a user holds a role at a (site, network)
/// scope. The four-tuple (user, role, site, network) is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Surrogate identity assigned by the store on insert.
    pub id: AssignmentId,
    /// The subject holding the role.
    pub user_id: UserId,
    /// Site scope; [`SiteId::GLOBAL`] for network-wide roles.
    pub site_id: SiteId,
    /// Tenant-group the site belongs to.
    pub network_id: NetworkId,
    /// Opaque role label.
    pub role: RoleName,
}

/// Partial match on the four-tuple; `None` fields are wildcards.
///
/// Used for bulk removal: every row matching all present fields is affected.
/// The all-wildcard filter is rejected by the store rather than interpreted
/// as "delete everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    /// Match rows for this user.
    pub user_id: Option<UserId>,
    /// Match rows carrying this role label.
    pub role: Option<RoleName>,
    /// Match rows at this site scope.
    pub site_id: Option<SiteId>,
    /// Match rows in this network.
    pub network_id: Option<NetworkId>,
}

impl AssignmentFilter {
    /// Filter matching every row of one user, across all scopes.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Filter matching every row at one site.
    #[must_use]
    pub fn for_site(site_id: SiteId) -> Self {
        Self {
            site_id: Some(site_id),
            ..Self::default()
        }
    }

    /// Filter matching every row in one network.
    #[must_use]
    pub fn for_network(network_id: NetworkId) -> Self {
        Self {
            network_id: Some(network_id),
            ..Self::default()
        }
    }

    /// Narrows the filter to one role label.
    #[must_use]
    pub fn with_role(mut self, role: RoleName) -> Self {
        self.role = Some(role);
        self
    }

    /// Narrows the filter to one site scope.
    #[must_use]
    pub fn with_site(mut self, site_id: SiteId) -> Self {
        self.site_id = Some(site_id);
        self
    }

    /// Narrows the filter to one network.
    #[must_use]
    pub fn with_network(mut self, network_id: NetworkId) -> Self {
        self.network_id = Some(network_id);
        self
    }

    /// Whether every field is a wildcard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.role.is_none()
            && self.site_id.is_none()
            && self.network_id.is_none()
    }

    /// Whether a row satisfies every present field.
    #[must_use]
    pub fn matches(&self, row: &RoleAssignment) -> bool {
        self.user_id.is_none_or(|user_id| row.user_id == user_id)
            && self.role.as_ref().is_none_or(|role| &row.role == role)
            && self.site_id.is_none_or(|site_id| row.site_id == site_id)
            && self
                .network_id
                .is_none_or(|network_id| row.network_id == network_id)
    }
}

#[cfg(test)]
mod tests {
    use netroles_core::{AssignmentId, NetworkId, SiteId, UserId};
    use proptest::prelude::*;

    use super::{AssignmentFilter, ROLE_NAME_MAX_LENGTH, RoleAssignment, RoleName};

    fn role(label: &str) -> RoleName {
        RoleName::new(label).unwrap_or_else(|_| panic!("valid role label"))
    }

    fn row(user: i64, label: &str, site: i64, network: i64) -> RoleAssignment {
        RoleAssignment {
            id: AssignmentId::new(1),
            user_id: UserId::new(user),
            site_id: SiteId::new(site),
            network_id: NetworkId::new(network),
            role: role(label),
        }
    }

    #[test]
    fn role_label_is_trimmed() {
        assert_eq!(role(" author ").as_str(), "author");
    }

    #[test]
    fn empty_role_label_is_rejected() {
        assert!(RoleName::new("   ").is_err());
    }

    #[test]
    fn oversized_role_label_is_rejected() {
        let label = "r".repeat(ROLE_NAME_MAX_LENGTH + 1);
        assert!(RoleName::new(label).is_err());
    }

    #[test]
    fn max_length_role_label_is_accepted() {
        let label = "r".repeat(ROLE_NAME_MAX_LENGTH);
        assert!(RoleName::new(label).is_ok());
    }

    #[test]
    fn default_filter_is_empty_and_matches_everything() {
        let filter = AssignmentFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&row(3, "editor", 2, 1)));
    }

    #[test]
    fn site_filter_ignores_other_fields() {
        let filter = AssignmentFilter::for_site(SiteId::new(2));
        assert!(filter.matches(&row(3, "editor", 2, 1)));
        assert!(filter.matches(&row(9, "author", 2, 4)));
        assert!(!filter.matches(&row(3, "editor", 5, 1)));
    }

    #[test]
    fn narrowed_filter_requires_all_present_fields() {
        let filter = AssignmentFilter::for_user(UserId::new(3))
            .with_role(role("editor"))
            .with_site(SiteId::new(2));
        assert!(filter.matches(&row(3, "editor", 2, 1)));
        assert!(!filter.matches(&row(3, "author", 2, 1)));
        assert!(!filter.matches(&row(4, "editor", 2, 1)));
    }

    proptest! {
        #[test]
        fn filter_matches_iff_every_present_field_agrees(
            user in 1_i64..50,
            site in 0_i64..10,
            network in 0_i64..5,
            filter_user in proptest::option::of(1_i64..50),
            filter_site in proptest::option::of(0_i64..10),
            filter_network in proptest::option::of(0_i64..5),
        ) {
            let stored = row(user, "author", site, network);
            let filter = AssignmentFilter {
                user_id: filter_user.map(UserId::new),
                role: None,
                site_id: filter_site.map(SiteId::new),
                network_id: filter_network.map(NetworkId::new),
            };

            let expected = filter_user.is_none_or(|value| value == user)
                && filter_site.is_none_or(|value| value == site)
                && filter_network.is_none_or(|value| value == network);
            prop_assert_eq!(filter.matches(&stored), expected);
        }
    }
}
