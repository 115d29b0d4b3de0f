//! netroles maintenance commands: schema lifecycle, bulk migration and
//! status reporting for the role index.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use netroles_application::{
    IndexStateRepository, RoleStoreService, SchemaStatus, TenantDirectory, UserDirectory,
};
use netroles_core::{AppError, AppResult, NetworkId};
use netroles_infrastructure::{
    PostgresIndexStateRepository, PostgresPlatformDirectory, PostgresRoleAssignmentRepository,
};

const USAGE: &str = "usage: netroles-admin <create-table|drop-table|migrate|migrate-super-admins|status>";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let Some(command) = env::args().nth(1) else {
        eprintln!("{USAGE}");
        return Err(AppError::Validation("missing command".to_owned()));
    };

    let database_url = required_env("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url.as_str())
        .await
        .map_err(|error| AppError::Persistence(format!("failed to connect: {error}")))?;

    let repository = Arc::new(PostgresRoleAssignmentRepository::new(pool.clone()));
    let state = Arc::new(PostgresIndexStateRepository::new(pool.clone()));
    let directory = Arc::new(PostgresPlatformDirectory::new(pool.clone()));
    let store = RoleStoreService::new(repository, directory.clone(), directory.clone());

    match command.as_str() {
        "create-table" => create_table(&store).await,
        "drop-table" => drop_table(&store).await,
        "migrate" => migrate(&store, directory.as_ref(), state.as_ref()).await,
        "migrate-super-admins" => migrate_super_admins(&store, directory.as_ref()).await,
        "status" => status(&pool, directory.as_ref(), state.as_ref()).await,
        other => {
            eprintln!("{USAGE}");
            Err(AppError::Validation(format!("unknown command '{other}'")))
        }
    }
}

async fn create_table(store: &RoleStoreService) -> AppResult<()> {
    match store.create_schema().await? {
        SchemaStatus::Created => info!("role index table created"),
        SchemaStatus::AlreadyExists => info!("role index table already up to date"),
    }
    Ok(())
}

async fn drop_table(store: &RoleStoreService) -> AppResult<()> {
    store.drop_schema().await?;
    info!("role index table dropped and markers cleared");
    Ok(())
}

/// Backfills the index from the authoritative per-user role assignments:
/// every user, at every site they belong to, through the same reconcile
/// primitive the save/register events use.
///
/// Per-item failures are counted and reported in aggregate; the per-network
/// migration-complete markers are only written after a clean run, since the
/// query rewriter activates on them.
async fn migrate(
    store: &RoleStoreService,
    directory: &PostgresPlatformDirectory,
    state: &PostgresIndexStateRepository,
) -> AppResult<()> {
    store.create_schema().await?;

    let user_ids = directory.list_user_ids().await?;
    let total = user_ids.len();
    let mut migrated = 0_usize;
    let mut failed = 0_usize;

    for (index, user_id) in user_ids.iter().enumerate() {
        let mut user_failed = false;
        match directory.site_ids_for_user(*user_id).await {
            Ok(site_ids) => {
                for site_id in site_ids {
                    if let Err(error) = store.refresh_user(*user_id, site_id).await {
                        warn!(
                            user = user_id.as_i64(),
                            site = site_id.as_i64(),
                            %error,
                            "failed to migrate user at site"
                        );
                        user_failed = true;
                    }
                }
            }
            Err(error) => {
                warn!(user = user_id.as_i64(), %error, "failed to list user sites");
                user_failed = true;
            }
        }

        if user_failed {
            failed += 1;
        } else {
            migrated += 1;
        }
        if (index + 1) % 100 == 0 {
            info!(processed = index + 1, total, "migration progress");
        }
    }

    info!(migrated, failed, total, "user migration finished");

    if failed > 0 {
        warn!(failed, "not marking migration complete; re-run after fixing failures");
        return Ok(());
    }

    for network_id in directory.list_network_ids().await? {
        state.mark_migration_complete(network_id).await?;
    }
    // Single-tenant installs have no registered networks; the default
    // network still needs its marker for the rewriter to activate.
    state.mark_migration_complete(NetworkId::default()).await?;
    info!("migration markers written; query rewriting active");

    Ok(())
}

async fn migrate_super_admins(
    store: &RoleStoreService,
    directory: &PostgresPlatformDirectory,
) -> AppResult<()> {
    let network_ids = directory.list_network_ids().await?;
    for network_id in &network_ids {
        let logins = directory.admin_logins(*network_id).await?;
        let resolved = store.sync_super_admins(*network_id, &logins).await?;
        info!(
            network = network_id.as_i64(),
            configured = logins.len(),
            resolved,
            "super-admin set migrated"
        );
    }
    info!(networks = network_ids.len(), "super-admin migration finished");
    Ok(())
}

async fn status(
    pool: &PgPool,
    directory: &PostgresPlatformDirectory,
    state: &PostgresIndexStateRepository,
) -> AppResult<()> {
    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_role_index")
        .fetch_one(pool)
        .await
        .map_err(|error| AppError::Persistence(format!("failed to count rows: {error}")))?;

    let mut networks = serde_json::Map::new();
    let mut network_ids = directory.list_network_ids().await?;
    if network_ids.is_empty() {
        network_ids.push(NetworkId::default());
    }
    for network_id in network_ids {
        let complete = state.is_migration_complete(network_id).await?;
        networks.insert(
            network_id.to_string(),
            serde_json::json!({ "migration_complete": complete }),
        );
    }

    let report = serde_json::json!({
        "rows": rows,
        "networks": networks,
    });
    println!("{report:#}");

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
