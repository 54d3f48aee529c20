#![warn(clippy::all)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use checker::config::Config;
use checker::ingestion::HttpIngestion;
use checker::monitoring::{MonitoringExecutor, MonitoringScheduler};
use checker::orchestrator::HttpOrchestrator;
use checker::{HealthStatus, Monitor, MonitorKind};
use clap::{Parser, Subcommand, ValueEnum};
use probe::Executor;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "checker", version, about = "Synthetic monitoring checker")]
struct Cli {
    /// Path to the config file (default: $XDG_CONFIG_HOME/checker/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the scheduler until interrupted (default)
    Run,
    /// Print the effective configuration
    Config,
    /// Probe a single target once and print the result as JSON
    Check {
        kind: ProbeKind,
        /// URL, host:port or domain
        target: String,
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProbeKind {
    Http,
    Tcp,
    Dns,
}

impl From<ProbeKind> for MonitorKind {
    fn from(kind: ProbeKind) -> Self {
        match kind {
            ProbeKind::Http => MonitorKind::Http,
            ProbeKind::Tcp => MonitorKind::Tcp,
            ProbeKind::Dns => MonitorKind::Dns,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_env_overrides();
    logger::init(&config.logging);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Config => {
            print!("{config}");
            Ok(())
        }
        Command::Check { kind, target, method, timeout_ms } => {
            check(&config, kind.into(), target, method, timeout_ms).await
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate().context("invalid configuration")?;
    info!("Starting checker\n{config}");

    let prober = Executor::new(&config.probe.user_agent).context("failed to create probe executor")?;
    let orchestrator = Arc::new(
        HttpOrchestrator::new(
            config.orchestrator.url.clone(),
            config.orchestrator.token.clone(),
            config.scheduler.region.clone(),
        )
        .context("failed to create orchestrator client")?,
    );
    let ingestion = Arc::new(
        HttpIngestion::new(config.ingestion.url.clone(), config.ingestion.token.clone())
            .context("failed to create ingestion client")?,
    );

    let executor = Arc::new(MonitoringExecutor::new(
        Arc::new(prober),
        orchestrator.clone(),
        ingestion,
        config.retry.policy(),
        config.executor_settings(),
    ));
    let scheduler = Arc::new(MonitoringScheduler::new(
        executor,
        orchestrator,
        config.reconcile_interval(),
    ));

    let shutdown = scheduler.shutdown_token();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for running monitors");
    shutdown.cancel();
    handle.await.context("scheduler task failed")?;

    Ok(())
}

async fn check(
    config: &Config,
    kind: MonitorKind,
    target: String,
    method: String,
    timeout_ms: u64,
) -> Result<()> {
    let monitor = Monitor {
        id: "adhoc".to_string(),
        workspace_id: String::new(),
        kind,
        target,
        method,
        headers: Vec::new(),
        body: None,
        timeout_ms,
        max_retries: 1,
        periodicity: "1m".to_string(),
        degraded_after_ms: 0,
        assertions: Vec::new(),
        status: HealthStatus::Active,
        follow_redirects: true,
    };
    let request = monitor.probe_request()?;

    let executor = Executor::new(&config.probe.user_agent).context("failed to create probe executor")?;
    let result = executor.execute(&request).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
