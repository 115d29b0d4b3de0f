//! Renders user-search plans into bound SQL and executes them.

use sqlx::{PgPool, Postgres, QueryBuilder};

use netroles_core::{AppError, AppResult, SiteId, UserId};
use netroles_domain::{JoinTarget, RoleName, SearchRewrite, UserSearchQuery};


/// Executes the host's user search against either the role index (with a
/// rewrite plan) or the unindexed membership source (pass-through).
///
/// Only the role/scope portion of the request differs between the two paths;
/// identity includes, ordering and pagination render identically.
#[derive(Clone)]
pub struct PostgresUserSearch {
    pool: PgPool,
}

impl PostgresUserSearch {
    /// Creates an executor with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns matching user identities in stable identity order.
    pub async fn search(
        &self,
        query: &UserSearchQuery,
        rewrite: Option<&SearchRewrite>,
    ) -> AppResult<Vec<UserId>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT DISTINCT u.id FROM platform_users u");

        // Joins the base query already carries pass through unchanged;
        // joined tables are keyed on user identity by platform convention.
        for join in &query.joins {
            builder.push(" JOIN ");
            builder.push(join.table.as_str());
            builder.push(" ");
            builder.push(join.alias.as_str());
            builder.push(" ON ");
            builder.push(join.alias.as_str());
            builder.push(".user_id = u.id");
        }

        let mut has_where = false;
        match rewrite {
            Some(plan) => push_indexed_conditions(&mut builder, plan, &mut has_where),
            None => push_fallback_conditions(&mut builder, query, &mut has_where),
        }

        if !query.include_user_ids.is_empty() {
            let ids: Vec<i64> = query
                .include_user_ids
                .iter()
                .map(|user_id| user_id.as_i64())
                .collect();
            push_connector(&mut builder, &mut has_where);
            builder.push("u.id = ANY(");
            builder.push_bind(ids);
            builder.push(")");
        }

        builder.push(" ORDER BY u.id");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(limit));
        }
        if query.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(i64::from(query.offset));
        }

        let user_ids = builder
            .build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to execute user search: {error}"))
            })?;

        Ok(user_ids.into_iter().map(UserId::new).collect())
    }
}

fn push_connector(builder: &mut QueryBuilder<'_, Postgres>, has_where: &mut bool) {
    builder.push(if *has_where { " AND " } else { " WHERE " });
    *has_where = true;
}

fn push_role_in(builder: &mut QueryBuilder<'_, Postgres>, column: &str, roles: &[RoleName]) {
    builder.push(column);
    builder.push(" IN (");
    for (index, role) in roles.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push_bind(role.as_str().to_owned());
    }
    builder.push(")");
}

/// One membership probe against the index table, scoped to the plan's site.
fn push_index_probe(
    builder: &mut QueryBuilder<'_, Postgres>,
    site: Option<SiteId>,
    negated: bool,
    roles: &[RoleName],
) {
    if negated {
        builder.push("NOT ");
    }
    builder.push("EXISTS (SELECT 1 FROM user_role_index probe WHERE probe.user_id = u.id");
    if let Some(site) = site {
        builder.push(" AND probe.site_id = ");
        builder.push_bind(site.as_i64());
    }
    builder.push(" AND ");
    push_role_in(builder, "probe.role", roles);
    builder.push(")");
}

fn push_indexed_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    plan: &SearchRewrite,
    has_where: &mut bool,
) {
    let alias = plan.alias().to_owned();
    if let JoinTarget::Added(join) = &plan.join {
        builder.push(" JOIN ");
        builder.push(join.table.as_str());
        builder.push(" ");
        builder.push(join.alias.as_str());
        builder.push(" ON ");
        builder.push(join.alias.as_str());
        builder.push(".user_id = u.id");
    }

    if let Some(site) = plan.site {
        push_connector(builder, has_where);
        builder.push(alias.as_str());
        builder.push(".site_id = ");
        builder.push_bind(site.as_i64());
    }

    if !plan.any_of.is_empty() {
        push_connector(builder, has_where);
        push_role_in(builder, &format!("{alias}.role"), &plan.any_of);
    }

    for required in &plan.all_of {
        push_connector(builder, has_where);
        push_index_probe(builder, plan.site, false, std::slice::from_ref(required));
    }

    if !plan.none_of.is_empty() {
        push_connector(builder, has_where);
        push_index_probe(builder, plan.site, true, &plan.none_of);
    }
}

/// One membership probe against the host's unindexed membership source.
fn push_membership_probe(
    builder: &mut QueryBuilder<'_, Postgres>,
    site: Option<SiteId>,
    negated: bool,
    roles: Option<&[RoleName]>,
) {
    if negated {
        builder.push("NOT ");
    }
    builder.push("EXISTS (SELECT 1 FROM platform_memberships m WHERE m.user_id = u.id");
    if let Some(site) = site {
        builder.push(" AND m.site_id = ");
        builder.push_bind(site.as_i64());
    }
    if let Some(roles) = roles {
        builder.push(" AND ");
        push_role_in(builder, "m.role", roles);
    }
    builder.push(")");
}

fn push_fallback_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &UserSearchQuery,
    has_where: &mut bool,
) {
    // Positive role probes imply site membership; with none present the
    // scope itself must be asserted or excluded-role filters would match
    // users outside the site entirely.
    let has_positive_filter = !query.role_all.is_empty() || !query.role_any.is_empty();
    if query.site.is_some() && !has_positive_filter {
        push_connector(builder, has_where);
        push_membership_probe(builder, query.site, false, None);
    }

    for required in &query.role_all {
        push_connector(builder, has_where);
        push_membership_probe(builder, query.site, false, Some(std::slice::from_ref(required)));
    }

    if !query.role_any.is_empty() {
        push_connector(builder, has_where);
        push_membership_probe(builder, query.site, false, Some(&query.role_any));
    }

    if !query.role_none.is_empty() {
        push_connector(builder, has_where);
        push_membership_probe(builder, query.site, true, Some(&query.role_none));
    }
}
