//! `aperture-daemon` — standalone binary wiring every subsystem into a
//! running capability-acquisition daemon (spec §2 "Control loop").
//!
//! Boot order mirrors the dependency graph: storage first (everything else
//! persists through it), then the Registry and Supervisor (nothing routes
//! or restarts without them), then the Orchestrator (which owns Discovery,
//! the Installer, and the Sandbox), then the Router, the Variety Engine, and
//! finally the Scheduler that drives the whole loop forward.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod adapters;
mod admin;
mod variety_tick;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aperture_admin::AdminApi;
use aperture_audit::AuditLog;
use aperture_config::{Config, ConfigHandle};
use aperture_discovery::{CatalogAdapter, DiscoveryEngine, HttpCatalogAdapter};
use aperture_events::EventBus;
use aperture_installer::{InstallPolicy, Installer};
use aperture_oracle::OracleConfig;
use aperture_orchestrator::{NoProbes, Orchestrator, OrchestratorDeps};
use aperture_registry::{Registry, Router, RouterConfig};
use aperture_resilience::{BreakerConfig, DeadLetterQueue, PoolConfig, RateLimitConfig, RetryPolicy};
use aperture_sandbox::{Sandbox, SandboxLimits};
use aperture_scheduler::Scheduler;
use aperture_storage::{KvStore, SurrealKvStore};
use aperture_supervisor::{Supervisor, SupervisorConfig};
use aperture_telemetry::{LogConfig, LogFormat as TelemetryLogFormat};
use aperture_variety::{VarietyEngine, VarietyEngineConfig};
use clap::Parser;
use tracing::info;

use crate::adapters::{InstallerReinstaller, RegistryVarietySource, SupervisorSessionProvider};
use crate::admin::DaemonAdmin;
use crate::variety_tick::VarietyTickHandler;

/// `aperture-daemon` — autonomous capability-acquisition daemon.
#[derive(Parser)]
#[command(name = "aperture-daemon")]
#[command(author, version, about = "Aperture capability-acquisition daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "aperture.toml")]
    config: PathBuf,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_handle = aperture_config::load_and_watch(&args.config).context("loading configuration")?;
    let config = config_handle.get();

    let level = if args.verbose { "debug" } else { config.logging.level.as_str() };
    let mut log_config = LogConfig::new(level).with_format(match config.logging.format {
        aperture_config::LogFormat::Pretty => TelemetryLogFormat::Pretty,
        aperture_config::LogFormat::Json => TelemetryLogFormat::Json,
    });
    for directive in &config.logging.directives {
        log_config = log_config.with_directive(directive.clone());
    }
    if let Err(err) = aperture_telemetry::setup_logging(&log_config) {
        eprintln!("failed to initialize logging: {err}");
    }

    info!(config_path = %args.config.display(), "starting aperture-daemon");

    std::fs::create_dir_all(&config.gateway.install_root)
        .with_context(|| format!("creating install root {}", config.gateway.install_root.display()))?;
    std::fs::create_dir_all(&config.gateway.state_dir)
        .with_context(|| format!("creating state dir {}", config.gateway.state_dir.display()))?;

    let store: Arc<dyn KvStore> = Arc::new(
        SurrealKvStore::open(&config.gateway.state_dir).context("opening state store")?,
    );

    let audit = Arc::new(AuditLog::open(Arc::clone(&store)).await.context("opening audit log")?);
    let dlq = Arc::new(
        DeadLetterQueue::open(Arc::clone(&store), config.limits.dlq_capacity)
            .await
            .context("opening dead-letter queue")?,
    );

    let events = EventBus::new();
    let registry = Arc::new(Registry::new(events.clone()));

    let installer = Arc::new(Installer::new(
        config.gateway.install_root.clone(),
        config.timeouts.install_deadline(),
        InstallPolicy {
            package_whitelist: config.policies.package_whitelist.clone(),
            dangerous_name_blacklist: config.policies.dangerous_name_blacklist.clone(),
        },
    ));

    let supervisor = Supervisor::with_reinstaller(
        SupervisorConfig::from(&config),
        events.clone(),
        Arc::clone(&audit),
        Some(Arc::new(InstallerReinstaller::new(Arc::clone(&installer)))),
    );

    let sandbox = Arc::new(Sandbox::new(SandboxLimits {
        memory_mb: config.limits.sandbox_memory_mb,
        cpu_percent: config.limits.sandbox_cpu_percent,
        allow_network: false,
        wall_clock_timeout: config.timeouts.verify_deadline(),
        call_timeout: config.timeouts.default_method_timeout(),
    }));

    let catalog_adapters: Vec<Arc<dyn CatalogAdapter>> = config
        .endpoints
        .catalog_urls
        .iter()
        .enumerate()
        .map(|(index, url)| {
            Arc::new(HttpCatalogAdapter::new(format!("catalog-{index}"), url.clone())) as Arc<dyn CatalogAdapter>
        })
        .collect();
    let discovery = Arc::new(DiscoveryEngine::new(catalog_adapters));

    let orchestrator = Orchestrator::new(OrchestratorDeps {
        config: config_handle.clone(),
        events: events.clone(),
        audit: Arc::clone(&audit),
        discovery,
        installer: Arc::clone(&installer),
        sandbox,
        supervisor: supervisor.clone(),
        registry: Arc::clone(&registry),
        oracle: None,
        oracle_config: OracleConfig::default(),
        probes: Arc::new(NoProbes),
    });

    let router = Arc::new(Router::new(
        Arc::clone(&registry),
        Arc::new(SupervisorSessionProvider::new(supervisor.clone())),
        events.clone(),
        RouterConfig {
            pool: PoolConfig {
                base_size: config.limits.pool_base_size,
                max_overflow: config.limits.max_overflow,
                acquire_deadline: config.timeouts.pool_acquire_deadline(),
            },
            breaker: BreakerConfig {
                failure_threshold: config.thresholds.breaker_failure_threshold,
                success_threshold: config.thresholds.breaker_success_threshold,
                open_timeout: Duration::from_millis(config.thresholds.breaker_open_timeout_ms),
            },
            retry: RetryPolicy {
                max_attempts: config.thresholds.retry_max_attempts,
                initial_delay: Duration::from_millis(config.thresholds.retry_initial_delay_ms),
                max_delay: Duration::from_secs(10),
                backoff_factor: config.thresholds.retry_backoff_factor,
                jitter: config.thresholds.retry_jitter,
            },
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(config.thresholds.rate_limit_window_ms),
                max_requests: config.thresholds.rate_limit_max_requests,
            },
            call_timeout: config.timeouts.default_method_timeout(),
        },
        Some(Arc::clone(&dlq)),
    ));

    let variety_engine = Arc::new(VarietyEngine::new(
        VarietyEngineConfig::from(&config),
        events.clone(),
        Arc::new(RegistryVarietySource::new(Arc::clone(&registry))),
    ));

    let admin = Arc::new(DaemonAdmin::new(
        orchestrator.clone(),
        supervisor.clone(),
        Arc::clone(&registry),
        Arc::clone(&router),
        Arc::clone(&variety_engine),
        Arc::clone(&dlq),
        args.config.clone(),
        config_handle.clone(),
    ));
    // The admin surface has no bound wire protocol in this binary (spec §6);
    // it is exercised directly by `aperture-integration-tests` and is the
    // seam a REST/WebSocket layer would wrap. Keeping it alive here so
    // `cargo` does not warn about an otherwise-unread `Arc`.
    let _admin: Arc<dyn AdminApi> = admin;

    let scheduler = Scheduler::new();
    scheduler
        .register(
            "variety",
            config.timeouts.health_interval(),
            Arc::new(VarietyTickHandler::new(
                Arc::clone(&variety_engine),
                orchestrator.clone(),
                config.policies.default_restart_policy,
            )),
        )
        .context("registering variety tick")?;

    info!("aperture-daemon ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
    }

    scheduler.stop_all();
    supervisor.stop_all(true).await;

    info!("aperture-daemon stopped");
    Ok(())
}
