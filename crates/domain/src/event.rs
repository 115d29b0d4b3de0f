//! Lifecycle events the hosting platform pushes at the index.
//!
//! The host registers one handler for these at bootstrap; each variant maps
//! to exactly one store operation. Getting a scope wrong here silently
//! corrupts the index, so the mapping is part of the public contract.

use netroles_core::{NetworkId, SiteId, UserId};
use serde::{Deserialize, Serialize};

use crate::assignment::RoleName;

/// A platform lifecycle event affecting role membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformEvent {
    /// A role was granted to a user at a site.
    RoleAdded {
        /// Subject the role was granted to.
        user_id: UserId,
        /// Granted role label.
        role: RoleName,
        /// Site the grant applies to.
        site_id: SiteId,
    },
    /// A role was revoked from a user at a site.
    RoleRemoved {
        /// Subject the role was revoked from.
        user_id: UserId,
        /// Revoked role label.
        role: RoleName,
        /// Site the revocation applies to.
        site_id: SiteId,
    },
    /// A user's role set at a site was replaced wholesale.
    RolesReplaced {
        /// Subject whose roles were replaced.
        user_id: UserId,
        /// The new role, or `None` when the user keeps no role at the site.
        new_role: Option<RoleName>,
        /// Site the replacement applies to.
        site_id: SiteId,
    },
    /// A user joined a site with an initial role.
    UserAddedToSite {
        /// Subject added to the site.
        user_id: UserId,
        /// Initial role at the site.
        role: RoleName,
        /// Site the user joined.
        site_id: SiteId,
    },
    /// A user was removed from a site.
    UserRemovedFromSite {
        /// Subject removed from the site.
        user_id: UserId,
        /// Site the user left.
        site_id: SiteId,
    },
    /// A user profile was saved or a new user registered at a site.
    UserSaved {
        /// Subject whose profile changed.
        user_id: UserId,
        /// Site the save happened on.
        site_id: SiteId,
    },
    /// A user account was deleted on a single site.
    UserDeleted {
        /// Deleted subject.
        user_id: UserId,
        /// Site the deletion happened on.
        site_id: SiteId,
    },
    /// A user account was torn down across the whole platform.
    UserPurged {
        /// Purged subject.
        user_id: UserId,
    },
    /// A user was promoted to network-wide administrator.
    SuperAdminGranted {
        /// Promoted subject.
        user_id: UserId,
        /// Network the promotion applies to.
        network_id: NetworkId,
    },
    /// A user's network-wide administrator role was revoked.
    SuperAdminRevoked {
        /// Demoted subject.
        user_id: UserId,
        /// Network the revocation applies to.
        network_id: NetworkId,
    },
    /// A network's administrator login list was overwritten.
    SuperAdminListReplaced {
        /// Network whose administrator list changed.
        network_id: NetworkId,
        /// The complete new login list.
        logins: Vec<String>,
    },
    /// A new tenant group was created.
    NetworkCreated {
        /// The new network.
        network_id: NetworkId,
    },
    /// A tenant group was deleted.
    NetworkDeleted {
        /// The deleted network.
        network_id: NetworkId,
    },
    /// A site was reassigned to a different tenant group.
    SiteMoved {
        /// The moved site.
        site_id: SiteId,
        /// Network the site belonged to.
        old_network_id: NetworkId,
        /// Network the site now belongs to.
        new_network_id: NetworkId,
    },
    /// A site was deleted.
    SiteDeleted {
        /// The deleted site.
        site_id: SiteId,
    },
}
