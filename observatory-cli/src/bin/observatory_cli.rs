use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{body::Body, Router};
use clap::{Parser, Subcommand};
use common_config::ObservatoryConfig;
use common_http::{ProxyConfig, SessionConfig, SessionLayer};
use common_observability::ObservatoryMetrics;
use observatory_db::repo;
use platform_client::PlatformClient;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "observatory-cli", about = "Multi-retailer availability observatory operator CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs discovery, store mapping, and probing for every enabled retailer (or one, via --host)
    RunFullProcess {
        #[arg(long)]
        host: Option<String>,
    },
    /// Syncs the category tree and full product catalog for one retailer
    SweepCatalog {
        #[arg(long)]
        host: String,
        #[arg(long)]
        sc: Option<i32>,
    },
    /// Targeted discovery of tracked products by exact EAN
    ScrapeByEan {
        #[arg(long)]
        host: String,
    },
    /// Targeted discovery of tracked products grouped by brand prefix
    ScrapeByBrand {
        #[arg(long)]
        host: String,
    },
    /// Maps physical stores to platform pickup points
    MapStores {
        #[arg(long)]
        host: String,
    },
    /// Probes every known SKU for a retailer, without the tracked-EAN filter
    ProbeAll {
        #[arg(long)]
        host: String,
    },
    /// Probes only tracked-and-mapped EANs for a retailer
    ProbeEans {
        #[arg(long)]
        host: String,
        #[arg(long)]
        min_batch: Option<usize>,
        #[arg(long)]
        max_batch: Option<usize>,
        #[arg(long)]
        parallelism: Option<usize>,
    },
    /// Applies pending SQL migrations against the configured database
    Migrate,
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(metrics): State<ObservatoryMetrics>) -> Response {
    match metrics.render() {
        Ok(body) => Response::builder().status(StatusCode::OK).body(Body::from(body)).expect("valid response"),
        Err(err) => {
            warn!(error = %err, "failed to render metrics");
            Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::from("metrics unavailable")).expect("valid response")
        }
    }
}

fn spawn_metrics_server(port: u16, metrics: ObservatoryMetrics) {
    tokio::spawn(async move {
        let app = Router::new().route("/healthz", get(health)).route("/metrics", get(metrics_endpoint)).with_state(metrics);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "metrics server listening");
                if let Err(err) = axum::serve(listener, app).await {
                    error!(error = %err, "metrics server exited");
                }
            }
            Err(err) => error!(error = %err, port, "failed to bind metrics server"),
        }
    });
}

fn session_config(config: &ObservatoryConfig) -> SessionConfig {
    let proxy = config.proxy_url.clone().map(|url| ProxyConfig {
        url,
        username: config.proxy_username.clone(),
        password: config.proxy_password.clone(),
    });
    SessionConfig { request_timeout: Duration::from_secs(config.http_request_timeout_secs), proxy }
}

fn probe_settings(config: &ObservatoryConfig) -> availability_orchestrator::ProbeSettings {
    availability_orchestrator::ProbeSettings {
        sales_channel: 1,
        country: "AR".to_string(),
        min_batch_size: config.min_batch_size,
        max_batch_size: config.max_batch_size,
        degree_of_parallelism: config.degree_of_parallelism,
        commit_flush_size: 200,
        commit_flush_interval: Duration::from_secs(10),
        batch_timeout: Duration::from_secs(config.batch_timeout_secs),
        session: session_config(config),
    }
}

async fn sales_channels_for_host(pool: &PgPool, host: &str) -> anyhow::Result<Vec<i32>> {
    let retailers = repo::retailers::load_enabled(pool, Some(host)).await?;
    let Some(retailer) = retailers.into_iter().next() else {
        anyhow::bail!("no enabled retailer config found for host {host}");
    };
    Ok(retailer.sales_channel_list())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).init();

    let cli = Cli::parse();
    let config = ObservatoryConfig::from_env()?;
    let pool = PgPool::connect(&config.database_url).await.context("failed to connect to database")?;
    let metrics = ObservatoryMetrics::new();
    info!(proxy = config.proxy_configured(), "observatory starting");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("shutdown signal received, cancelling in-flight work");
                cancel.cancel();
            }
        });
    }

    if let Some(port) = config.metrics_port {
        spawn_metrics_server(port, metrics.clone());
    }

    let session_cfg = session_config(&config);

    match cli.command {
        Commands::Migrate => {
            observatory_db::run_migrations(&pool).await.context("migration failed")?;
            info!("migrations applied");
        }
        Commands::RunFullProcess { host } => {
            let settings = probe_settings(&config);
            let retailer_timeout = Duration::from_secs(config.retailer_run_timeout_secs);
            observatory_cli::master::run_full_process(&pool, &session_cfg, metrics, host.as_deref(), &settings, retailer_timeout, cancel).await?;
        }
        Commands::SweepCatalog { host, sc } => {
            let session = SessionLayer::new(host.clone(), &session_cfg, metrics).context("failed to build session")?;
            let client = PlatformClient::new(&session);
            let categories = catalog_sync::sync_categories(&pool, &client, &host, config.category_tree_depth).await?;
            info!(host, categories, "category sync complete");
            let products = catalog_sync::sync_products(&pool, &client, &host, None, config.page_size, None, sc).await?;
            info!(host, products, "product sync complete");
        }
        Commands::ScrapeByEan { host } => {
            let result = catalog_sync::tasks::spawn_by_ean(pool.clone(), host.clone(), session_cfg, metrics).await?;
            let matched = result.context("targeted discovery by EAN failed")?;
            info!(host, matched, "targeted discovery by EAN complete");
        }
        Commands::ScrapeByBrand { host } => {
            let result = catalog_sync::tasks::spawn_by_brand(pool.clone(), host.clone(), session_cfg, metrics).await?;
            let matched = result.context("targeted discovery by brand prefix failed")?;
            info!(host, matched, "targeted discovery by brand prefix complete");
        }
        Commands::MapStores { host } => {
            let sales_channels = sales_channels_for_host(&pool, &host).await?;
            let session = SessionLayer::new(host.clone(), &session_cfg, metrics).context("failed to build session")?;
            let mapped = store_mapper::map_all(&pool, &session, &host, &sales_channels).await?;
            info!(host, mapped, "store mapping complete");
        }
        Commands::ProbeAll { host } => {
            let settings = probe_settings(&config);
            let stats = availability_orchestrator::probe_all(&pool, &host, metrics, &settings, cancel).await?;
            info!(host, committed = stats.committed, work_units = stats.work_units, "probe-all complete");
        }
        Commands::ProbeEans { host, min_batch, max_batch, parallelism } => {
            let mut settings = probe_settings(&config);
            if let Some(min_batch) = min_batch {
                settings.min_batch_size = min_batch;
            }
            if let Some(max_batch) = max_batch {
                settings.max_batch_size = max_batch;
            }
            if let Some(parallelism) = parallelism {
                settings.degree_of_parallelism = parallelism;
            }
            let stats = availability_orchestrator::probe_ean_list(&pool, &host, metrics, &settings, cancel).await?;
            info!(host, committed = stats.committed, work_units = stats.work_units, "probe-eans complete");
        }
    }

    Ok(())
}
