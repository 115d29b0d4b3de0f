//! User-search query specifications and the role-rewrite planner.
//!
//! The host platform's generic user search is modeled as an immutable
//! [`UserSearchQuery`]; [`plan_role_rewrite`] turns its role/scope portion
//! into a [`SearchRewrite`] backed by the index table. Applying the plan to
//! an executable query is the persistence layer's concern; everything here is
//! pure data.

use std::collections::BTreeMap;

use netroles_core::{SiteId, UserId};
use serde::{Deserialize, Serialize};

use crate::assignment::{ROLE_INDEX_TABLE, RoleName};

/// Alias the planner uses when it adds the index join itself.
pub const ROLE_JOIN_ALIAS: &str = "user_roles";

/// A join the base query carries against a per-user table.
///
/// Joined tables are keyed on user identity by platform convention, so the
/// table name alone decides whether an existing join is compatible with the
/// rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Joined table name.
    pub table: String,
    /// Alias the table is joined under.
    pub alias: String,
}

/// A generic "find users matching filters" request.
///
/// Role filters carry the platform's three membership modes: `role_all`
/// (must hold every listed role), `role_any` (must hold at least one),
/// `role_none` (must hold none). Everything else is left untouched by the
/// rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchQuery {
    /// Roles the user must hold all of.
    pub role_all: Vec<RoleName>,
    /// Roles the user must hold at least one of.
    pub role_any: Vec<RoleName>,
    /// Roles the user must hold none of.
    pub role_none: Vec<RoleName>,
    /// Optional site scope for the membership filters.
    pub site: Option<SiteId>,
    /// Restrict results to these user identities (non-role filter).
    pub include_user_ids: Vec<UserId>,
    /// Joins the base query already carries.
    pub joins: Vec<JoinClause>,
    /// Maximum result count.
    pub limit: Option<u32>,
    /// Offset into the result set.
    pub offset: u32,
}

impl UserSearchQuery {
    /// Whether any role-membership filter is present.
    #[must_use]
    pub fn has_role_filters(&self) -> bool {
        !self.role_all.is_empty() || !self.role_any.is_empty() || !self.role_none.is_empty()
    }
}

/// How the rewritten query reaches the index table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinTarget {
    /// The base query already joins the index table; reuse that join.
    Existing {
        /// Alias of the compatible pre-existing join.
        alias: String,
    },
    /// Add this INNER JOIN on user identity.
    Added(JoinClause),
}

/// The rewritten role/scope portion of a user search.
///
/// The join plus `site` is the membership existence check; the three role
/// lists are ANDed on top of it. `all_of` deliberately keeps one entry per
/// required role so "holds A and B" is enforced by independent membership
/// probes instead of degenerating to a single-row `IN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRewrite {
    /// Index join to add or reuse.
    pub join: JoinTarget,
    /// Site scope every membership condition is narrowed to.
    pub site: Option<SiteId>,
    /// Joined row must carry one of these labels (`IN`).
    pub any_of: Vec<RoleName>,
    /// One independent membership probe per label.
    pub all_of: Vec<RoleName>,
    /// No row at the scope may carry one of these labels (anti-join).
    pub none_of: Vec<RoleName>,
}

impl SearchRewrite {
    /// Alias the role predicates are evaluated against.
    #[must_use]
    pub fn alias(&self) -> &str {
        match &self.join {
            JoinTarget::Existing { alias } => alias.as_str(),
            JoinTarget::Added(join) => join.alias.as_str(),
        }
    }
}

/// Plans the index-backed rewrite of a user search.
///
/// Returns `None` when the query carries neither role filters nor a site
/// scope; the request then has nothing to gain from the index and must pass
/// through unmodified. A scope without role filters still rewrites: the join
/// alone is the "has any row at this scope" existence check.
#[must_use]
pub fn plan_role_rewrite(query: &UserSearchQuery) -> Option<SearchRewrite> {
    if !query.has_role_filters() && query.site.is_none() {
        return None;
    }

    let join = query
        .joins
        .iter()
        .find(|join| join.table == ROLE_INDEX_TABLE)
        .map(|join| JoinTarget::Existing {
            alias: join.alias.clone(),
        })
        .unwrap_or_else(|| {
            JoinTarget::Added(JoinClause {
                table: ROLE_INDEX_TABLE.to_owned(),
                alias: ROLE_JOIN_ALIAS.to_owned(),
            })
        });

    let mut any_of = query.role_any.clone();
    let mut all_of = query.role_all.clone();

    // A single must-have role needs no independent probe; it rides the join.
    if any_of.is_empty() && all_of.len() == 1 {
        any_of = all_of;
        all_of = Vec::new();
    }

    Some(SearchRewrite {
        join,
        site: query.site,
        any_of,
        all_of,
        none_of: query.role_none.clone(),
    })
}

/// Role-membership counts for one site scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    /// Distinct users holding at least one role at the scope.
    pub total_users: u64,
    /// Row count per role label at the scope.
    pub by_role: BTreeMap<String, u64>,
}
