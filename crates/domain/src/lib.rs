//! Domain types and pure planning logic for the role index.

#![forbid(unsafe_code)]

mod assignment;
mod event;
mod query;

pub use assignment::{
    AssignmentFilter, ROLE_INDEX_STATE_TABLE, ROLE_INDEX_TABLE, ROLE_NAME_MAX_LENGTH,
    RoleAssignment, RoleName, SUPER_ADMIN_ROLE,
};
pub use event::PlatformEvent;
pub use query::{
    JoinClause, JoinTarget, ROLE_JOIN_ALIAS, RoleCounts, SearchRewrite, UserSearchQuery,
    plan_role_rewrite,
};
