//! The typed configuration tree (spec §6 "Configuration surface").
//!
//! Every section implements [`Default`] so a bare (or absent) config file still
//! produces a working daemon; operators only need to override what they care
//! about. Durations are stored as milliseconds (`_ms` suffix) rather than
//! `std::time::Duration` directly so the struct round-trips cleanly through TOML;
//! accessor methods on [`Config`] hand back real `Duration`s.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration tree. See module docs for the section breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Deadlines for network and subprocess operations.
    pub timeouts: TimeoutsConfig,
    /// Capacity ceilings (pools, children, queues).
    pub limits: LimitsConfig,
    /// Watermarks and backoff parameters that drive control-loop decisions.
    pub thresholds: ThresholdsConfig,
    /// Restart, whitelist, and DLQ opt-in policy.
    pub policies: PoliciesConfig,
    /// External service addresses (catalog adapters).
    pub endpoints: EndpointsConfig,
    /// Structured logging configuration.
    pub logging: LoggingConfig,
    /// Daemon-wide runtime paths and lifecycle knobs.
    pub gateway: GatewayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeouts: TimeoutsConfig::default(),
            limits: LimitsConfig::default(),
            thresholds: ThresholdsConfig::default(),
            policies: PoliciesConfig::default(),
            endpoints: EndpointsConfig::default(),
            logging: LoggingConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Deadlines, in milliseconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Time allowed for the MCP `initialize` handshake to complete.
    pub init_timeout_ms: u64,
    /// Default per-method request deadline when no override applies.
    pub default_method_timeout_ms: u64,
    /// Interval between health-check ticks.
    pub health_interval_ms: u64,
    /// Deadline for an individual health probe.
    pub health_probe_timeout_ms: u64,
    /// Maximum time a caller will block acquiring a pooled session.
    pub pool_acquire_deadline_ms: u64,
    /// Overall deadline for one Discovery fan-out.
    pub discovery_deadline_ms: u64,
    /// Wall-clock deadline for one Installer run.
    pub install_deadline_ms: u64,
    /// Wall-clock deadline for the entire Sandbox verification run.
    pub verify_deadline_ms: u64,
    /// Grace period given to a child on graceful stop before it is killed.
    pub stop_grace_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 3_000,
            default_method_timeout_ms: 10_000,
            health_interval_ms: 15_000,
            health_probe_timeout_ms: 2_000,
            pool_acquire_deadline_ms: 5_000,
            discovery_deadline_ms: 8_000,
            install_deadline_ms: 120_000,
            verify_deadline_ms: 30_000,
            stop_grace_ms: 5_000,
        }
    }
}

impl TimeoutsConfig {
    /// The `initialize` handshake deadline as a [`Duration`].
    #[must_use]
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// The default per-method deadline as a [`Duration`].
    #[must_use]
    pub fn default_method_timeout(&self) -> Duration {
        Duration::from_millis(self.default_method_timeout_ms)
    }

    /// The health-tick interval as a [`Duration`].
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    /// The pool-acquire deadline as a [`Duration`].
    #[must_use]
    pub fn pool_acquire_deadline(&self) -> Duration {
        Duration::from_millis(self.pool_acquire_deadline_ms)
    }

    /// The Discovery fan-out deadline as a [`Duration`].
    #[must_use]
    pub fn discovery_deadline(&self) -> Duration {
        Duration::from_millis(self.discovery_deadline_ms)
    }

    /// The Installer phase deadline as a [`Duration`].
    #[must_use]
    pub fn install_deadline(&self) -> Duration {
        Duration::from_millis(self.install_deadline_ms)
    }

    /// The Sandbox verification phase deadline as a [`Duration`].
    #[must_use]
    pub fn verify_deadline(&self) -> Duration {
        Duration::from_millis(self.verify_deadline_ms)
    }

    /// The graceful-stop grace period as a [`Duration`].
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Capacity ceilings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of concurrently-supervised child processes.
    pub max_children: usize,
    /// Base (non-overflow) session count per server in the transport pool.
    pub pool_base_size: usize,
    /// Additional burst sessions allowed per server beyond `pool_base_size`.
    pub max_overflow: usize,
    /// Maximum number of entries retained in the dead-letter queue.
    pub dlq_capacity: usize,
    /// Sandbox memory ceiling, in megabytes.
    pub sandbox_memory_mb: u64,
    /// Sandbox CPU ceiling, as a percentage of one core.
    pub sandbox_cpu_percent: u32,
    /// Maximum number of ranked candidates Discovery returns per requirement.
    pub discovery_top_k: usize,
    /// Maximum number of `VarietySample`s retained in the ring buffer.
    pub variety_sample_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_children: 32,
            pool_base_size: 2,
            max_overflow: 4,
            dlq_capacity: 1_000,
            sandbox_memory_mb: 256,
            sandbox_cpu_percent: 100,
            discovery_top_k: 5,
            variety_sample_capacity: 500,
        }
    }
}

/// Watermarks and backoff parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Ratio below which the Variety Engine considers the gap unacceptable.
    pub variety_low_watermark: f64,
    /// Number of consecutive low samples required before a trigger fires.
    pub variety_sustained_samples: u32,
    /// Width of the sliding window over which recent demand signals are counted, in milliseconds.
    pub variety_demand_window_ms: u64,
    /// Consecutive routing failures for one capability before a trigger fires.
    pub variety_routing_failure_streak: u32,
    /// Consecutive failures before a circuit breaker opens.
    pub breaker_failure_threshold: u32,
    /// Consecutive half-open successes before a circuit breaker closes.
    pub breaker_success_threshold: u32,
    /// Time an open breaker waits before admitting a probe call, in milliseconds.
    pub breaker_open_timeout_ms: u64,
    /// Maximum retry attempts before a call is exhausted.
    pub retry_max_attempts: u32,
    /// Initial retry delay, in milliseconds.
    pub retry_initial_delay_ms: u64,
    /// Retry backoff multiplier applied per attempt.
    pub retry_backoff_factor: f64,
    /// Full-jitter fraction applied to the retry delay, in `[0, 1]`.
    pub retry_jitter: f64,
    /// Rate limiter sliding window width, in milliseconds.
    pub rate_limit_window_ms: u64,
    /// Maximum calls admitted per `(server_id, method)` within the window.
    pub rate_limit_max_requests: u32,
    /// Restart backoff ceiling for the Supervisor, in milliseconds.
    pub supervisor_max_backoff_ms: u64,
    /// Sustained-healthy interval after which restart backoff resets, in milliseconds.
    pub supervisor_backoff_reset_ms: u64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            variety_low_watermark: 0.70,
            variety_sustained_samples: 3,
            variety_demand_window_ms: 60_000,
            variety_routing_failure_streak: 5,
            breaker_failure_threshold: 5,
            breaker_success_threshold: 2,
            breaker_open_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 200,
            retry_backoff_factor: 2.0,
            retry_jitter: 0.2,
            rate_limit_window_ms: 1_000,
            rate_limit_max_requests: 50,
            supervisor_max_backoff_ms: 60_000,
            supervisor_backoff_reset_ms: 120_000,
        }
    }
}

/// Restart policy for a supervised child (spec §4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Always restart, regardless of exit reason.
    Permanent,
    /// Restart only on an abnormal exit.
    Transient,
    /// Never restart.
    Temporary,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::Transient
    }
}

/// Per-priority ranking weight table (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingWeights {
    /// Weight applied to the capability-match score.
    pub capability_match: f64,
    /// Weight applied to the quality/popularity signal.
    pub quality: f64,
    /// Weight applied to the maintenance-recency signal.
    pub recency: f64,
    /// Weight applied to the source-trust signal.
    pub source_trust: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            capability_match: 0.45,
            quality: 0.25,
            recency: 0.15,
            source_trust: 0.15,
        }
    }
}

/// Policy knobs for discovery, installation, and the DLQ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoliciesConfig {
    /// Restart policy applied to newly-registered servers unless overridden.
    pub default_restart_policy: RestartPolicy,
    /// If non-empty, only packages matching one of these names may be installed.
    pub package_whitelist: Vec<String>,
    /// Package names that are always refused, even if whitelisted.
    pub dangerous_name_blacklist: Vec<String>,
    /// Whether a Router call opts into the DLQ on terminal failure by default.
    pub dlq_opt_in_default: bool,
    /// Default ranking weights.
    pub ranking_weights: RankingWeights,
    /// Ranking weights used when a requirement's priority is `security_critical`.
    pub security_critical_weights: RankingWeights,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            default_restart_policy: RestartPolicy::default(),
            package_whitelist: Vec::new(),
            dangerous_name_blacklist: vec!["rm".into(), "sudo".into(), "curl".into()],
            dlq_opt_in_default: true,
            ranking_weights: RankingWeights::default(),
            security_critical_weights: RankingWeights {
                capability_match: 0.30,
                quality: 0.15,
                recency: 0.10,
                source_trust: 0.45,
            },
        }
    }
}

/// External catalog endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Catalog adapter base URLs, consulted in parallel by Discovery.
    pub catalog_urls: Vec<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self { catalog_urls: Vec::new() }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// Newline-delimited JSON, for ingestion by a log pipeline.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

/// Structured logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` level filter, e.g. `info`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Additional per-crate/per-target `EnvFilter` directives, e.g. `aperture_mcp=debug`.
    pub directives: Vec<String>,
    /// Config field names to redact before logging a `Config` debug dump.
    pub redact_fields: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directives: Vec::new(),
            redact_fields: vec!["catalog_urls".to_string()],
        }
    }
}

/// Daemon-wide runtime paths and lifecycle knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Root directory under which Installation directories are created.
    pub install_root: PathBuf,
    /// Root directory for daemon state: audit log, DLQ log, variety snapshots.
    pub state_dir: PathBuf,
    /// Whether the config file is watched for changes and hot-reloaded.
    pub hot_reload_enabled: bool,
    /// Grace period given to the whole daemon on shutdown, in milliseconds.
    pub shutdown_grace_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("./var/installs"),
            state_dir: PathBuf::from("./var/state"),
            hot_reload_enabled: true,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    /// The shutdown grace period as a [`Duration`].
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
