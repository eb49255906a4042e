//! Verification inputs and the output verdict (spec §4.12).

use std::collections::HashMap;
use std::time::Duration;

use aperture_core::CapabilityName;
use aperture_mcp::ToolDescriptor;
use serde_json::Value;

/// Resource ceilings and the wall-clock budget for one verification run.
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    /// Memory ceiling enforced on the sandboxed process, in megabytes.
    pub memory_mb: u64,
    /// CPU ceiling as a percentage of one core; informational, enforced by
    /// flagging outliers in the behavioural scan rather than a hard kill.
    pub cpu_percent: u32,
    /// Whether outbound network access is permitted inside the sandbox.
    pub allow_network: bool,
    /// Overall deadline for the whole verification pipeline.
    pub wall_clock_timeout: Duration,
    /// Deadline applied to each individual JSON-RPC call made during verification.
    pub call_timeout: Duration,
}

/// One canonical tool invocation used to probe a declared capability.
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    /// The capability this probe exercises.
    pub capability: CapabilityName,
    /// The tool to call.
    pub tool_name: String,
    /// Benign arguments for the call.
    pub arguments: Value,
    /// Top-level keys the tool's result object must contain to count as a pass.
    pub required_result_keys: Vec<String>,
}

/// One resource-usage observation taken during the behavioural scan.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    /// Milliseconds since the sandboxed process was spawned.
    pub at_ms: u64,
    /// Resident set size, in kilobytes, if it could be read.
    pub rss_kb: Option<u64>,
}

/// The result of one verification run (spec §4.12 "Output").
#[derive(Debug, Clone)]
pub struct VerificationVerdict {
    /// Whether every stage passed.
    pub passed: bool,
    /// Per-capability probe outcome.
    pub capability_map: HashMap<CapabilityName, bool>,
    /// The tools the server advertised via `tools/list`.
    pub tool_descriptors: Vec<ToolDescriptor>,
    /// Resource-usage samples taken during the behavioural scan.
    pub performance_samples: Vec<ResourceSample>,
    /// Samples flagged as exceeding the configured ceilings.
    pub resource_outliers: Vec<String>,
}
