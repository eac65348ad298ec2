//! Curio server entry point.
//!
//! Wires configuration, the connection pool, the query executor, the auth
//! services, and the catalog together, then runs the TCP server until
//! shutdown.

mod server;

use tracing_subscriber::{EnvFilter, fmt};

use curio_auth::{AuthService, CredentialHasher, TokenService};
use curio_core::config::AppConfig;
use curio_database::connection::SqliteFactory;
use curio_database::executor::QueryExecutor;
use curio_database::pool::{Pool, PoolConfig};
use curio_database::repositories::{CollectibleRepository, CredentialRepository};
use curio_database::schema::ensure_schema;
use curio_service::{CatalogService, Dispatcher};

#[tokio::main]
async fn main() {
    let env = std::env::var("CURIO_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("starting curio v{}", env!("CARGO_PKG_VERSION"));

    ensure_database_dir(&config.database.url).await?;
    let factory = SqliteFactory::new(&config.database)?;
    let pool = Pool::connect(factory, PoolConfig::from(&config.database)).await?;
    let executor = QueryExecutor::new(pool.clone(), &config.database);
    ensure_schema(&executor).await?;

    let hasher = CredentialHasher::new(&config.auth)?;
    let tokens = TokenService::new(&config.auth);
    let auth = AuthService::new(
        CredentialRepository::new(executor.clone()),
        hasher,
        tokens,
    )?;

    seed_bootstrap_user(&auth, &config).await?;

    let catalog = CatalogService::new(CollectibleRepository::new(executor), &config.cache);
    let dispatcher = Dispatcher::new(auth, catalog);

    server::run(&config.server, dispatcher).await?;

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Creates the directory a file-backed database URL points into.
async fn ensure_database_dir(url: &str) -> std::io::Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Seeds the configured bootstrap user into an empty credential table so a
/// fresh deployment has someone who can log in.
async fn seed_bootstrap_user(
    auth: &AuthService,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(username), Some(password)) = (
        config.auth.bootstrap_username.as_deref(),
        config.auth.bootstrap_password.as_deref(),
    ) else {
        return Ok(());
    };

    if auth.is_empty().await? {
        auth.create_user(username, password).await?;
        tracing::info!(username, "bootstrap user created");
    }
    Ok(())
}
