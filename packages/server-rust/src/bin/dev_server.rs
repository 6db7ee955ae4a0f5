//! Foreman development server.
//!
//! Wires the composition root: configuration from flags/environment, the
//! connection factory, the tenant registry (populated before traffic is
//! accepted), and the network module. Runs until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use foreman_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use foreman_server::tenancy::{ConnectionFactory, DatabaseConfig, TenantRegistry};

#[derive(Parser, Debug)]
#[command(name = "dev-server", about = "Foreman multi-tenant facility backend")]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "8080", env = "FOREMAN_PORT")]
    port: u16,

    /// PostgreSQL server URL without a database path
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://foreman@localhost:5432"
    )]
    database_url: String,

    /// Name of the admin database holding tenant records
    #[arg(long, env = "FOREMAN_ADMIN_DB", default_value = "foreman_admin")]
    admin_db: String,

    /// Allowed CORS origin (repeatable; defaults to any)
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Maximum request duration in seconds
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,

    /// Path to a TLS certificate (PEM); requires --tls-key
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// Path to a TLS private key (PEM); requires --tls-cert
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let db_config = DatabaseConfig {
        server_url: cli.database_url,
        admin_db_name: cli.admin_db,
        ..DatabaseConfig::default()
    };
    let registry = Arc::new(TenantRegistry::new(ConnectionFactory::new(db_config)));

    // Startup contract: populate the registry before accepting traffic.
    // Failure is not fatal to the process; tenant routes fail closed until
    // a restart with a reachable admin database.
    match registry.connect_all().await {
        Ok(count) => info!(tenants = count, "tenant registry ready"),
        Err(e) => error!(error = %e, "tenant registry population failed, tenant routes will fail closed"),
    }

    let tls = match (cli.tls_cert, cli.tls_key) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        _ => None,
    };

    let network_config = NetworkConfig {
        host: cli.host,
        port: cli.port,
        tls,
        cors_origins: if cli.cors_origins.is_empty() {
            vec!["*".to_string()]
        } else {
            cli.cors_origins
        },
        request_timeout: Duration::from_secs(cli.request_timeout_secs),
        ..NetworkConfig::default()
    };

    let mut module = NetworkModule::new(network_config, registry);
    let port = module.start().await?;
    info!(port, "foreman server accepting connections");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
