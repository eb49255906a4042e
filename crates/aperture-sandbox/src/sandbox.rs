//! Runs a freshly installed server through its verification pipeline
//! (spec §4.12).

use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use aperture_core::ServerId;
use aperture_installer::{Installation, LaunchSpec};
use aperture_mcp::{ClientCapabilities, McpClient};
use aperture_transport::Transport;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::{SandboxError, SandboxResult};
use crate::isolation;
use crate::resources::sample_rss_kb;
use crate::types::{CapabilityProbe, ResourceSample, SandboxLimits, VerificationVerdict};

/// Verifies one [`Installation`] in isolation before it is handed to the
/// Supervisor for promotion.
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    /// Build a sandbox enforcing `limits` on every run.
    #[must_use]
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// Run the full verification pipeline against `installation`, probing
    /// every capability in `probes`.
    ///
    /// Verification artifacts (the scratch directory) are left in place on
    /// failure for diagnosis and removed on success.
    ///
    /// # Errors
    /// Returns the first [`SandboxError`] encountered; stages run strictly
    /// in order and a failure in one aborts the rest.
    pub async fn verify(&self, installation: &Installation, probes: &[CapabilityProbe]) -> SandboxResult<VerificationVerdict> {
        match tokio::time::timeout(self.limits.wall_clock_timeout, self.run_pipeline(installation, probes)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(SandboxError::DeadlineExceeded),
        }
    }

    async fn run_pipeline(&self, installation: &Installation, probes: &[CapabilityProbe]) -> SandboxResult<VerificationVerdict> {
        let scratch = tempfile::tempdir().map_err(|e| SandboxError::SpawnFailed(format!("failed to create scratch dir: {e}")))?;

        let mut child = self.spawn(&installation.launch_spec, &installation.install_dir, scratch.path())?;
        let pid = child.id();
        let started_at = Instant::now();

        let transport: Arc<dyn Transport> = Arc::new(
            aperture_transport::stdio::open(&mut child)
                .map_err(|e| SandboxError::SpawnFailed(format!("failed to open sandboxed stdio: {e}")))?,
        );
        let client = McpClient::new(ServerId::new(), Arc::clone(&transport));
        client.start();

        let verdict = self.run_stages(&client, probes, pid, started_at).await;

        client.close().await;
        let _ = child.kill().await;
        let _ = child.wait().await;

        match &verdict {
            Ok(_) => {
                drop(scratch);
            }
            Err(err) => {
                let kept = scratch.into_path();
                warn!(error = %err, artifacts = %kept.display(), "verification failed, retaining sandbox artifacts");
            }
        }

        verdict
    }

    fn spawn(&self, launch_spec: &LaunchSpec, install_dir: &std::path::Path, scratch_dir: &std::path::Path) -> SandboxResult<Child> {
        let mut base = Command::new(&launch_spec.command);
        base.args(&launch_spec.args);
        base.current_dir(&launch_spec.working_dir);
        for (key, value) in &launch_spec.env {
            base.env(key, value);
        }
        base.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let mut wrapped = isolation::wrap(&base, install_dir, scratch_dir, self.limits.allow_network, self.limits.memory_mb);
        wrapped.kill_on_drop(true);
        wrapped.spawn().map_err(|e| SandboxError::SpawnFailed(e.to_string()))
    }

    async fn run_stages(
        &self,
        client: &McpClient,
        probes: &[CapabilityProbe],
        pid: Option<u32>,
        started_at: Instant,
    ) -> SandboxResult<VerificationVerdict> {
        // Stage 1: protocol compliance.
        client
            .initialize(&ClientCapabilities::default(), self.limits.call_timeout)
            .await
            .map_err(SandboxError::ProtocolFailure)?;
        let tool_descriptors = client.tools_list(self.limits.call_timeout).await.map_err(SandboxError::ProtocolFailure)?;
        info!(tool_count = tool_descriptors.len(), "protocol compliance check passed");

        // Stage 2: capability probes.
        let mut capability_map = std::collections::HashMap::new();
        for probe in probes {
            let result = client.tools_call(&probe.tool_name, probe.arguments.clone(), self.limits.call_timeout).await;
            match result {
                Ok(value) if required_keys_present(&value, &probe.required_result_keys) => {
                    capability_map.insert(probe.capability.clone(), true);
                }
                Ok(_) => {
                    return Err(SandboxError::CapabilityProbeFailed {
                        capability: probe.capability.clone(),
                        reason: "response missing required fields".to_string(),
                    });
                }
                Err(err) => {
                    return Err(SandboxError::CapabilityProbeFailed { capability: probe.capability.clone(), reason: err.to_string() });
                }
            }
        }

        // Stage 3: negative tests.
        self.check_unknown_method(client).await?;
        self.check_malformed_request(client).await?;

        // Stage 4: behavioural scan.
        let mut performance_samples = Vec::new();
        let mut resource_outliers = Vec::new();
        let memory_ceiling_kb = self.limits.memory_mb.saturating_mul(1024);
        for _ in 0..3 {
            if let Some(pid) = pid {
                let rss_kb = sample_rss_kb(pid);
                if let Some(rss) = rss_kb {
                    if memory_ceiling_kb > 0 && rss > memory_ceiling_kb {
                        resource_outliers.push(format!("rss {rss}kB exceeded ceiling {memory_ceiling_kb}kB"));
                    }
                }
                performance_samples.push(ResourceSample { at_ms: started_at.elapsed().as_millis() as u64, rss_kb });
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        Ok(VerificationVerdict {
            passed: true,
            capability_map,
            tool_descriptors,
            performance_samples,
            resource_outliers,
        })
    }

    async fn check_unknown_method(&self, client: &McpClient) -> SandboxResult<()> {
        match client.call("sandbox/__nonexistent_method__", None, self.limits.call_timeout).await {
            Err(err) if err.kind() == aperture_core::ErrorKind::MethodNotFound => Ok(()),
            Err(err) => Err(SandboxError::NegativeTestFailed { case: "unknown_method", reason: err.to_string() }),
            Ok(_) => Err(SandboxError::NegativeTestFailed {
                case: "unknown_method",
                reason: "server accepted an undeclared method".to_string(),
            }),
        }
    }

    async fn check_malformed_request(&self, client: &McpClient) -> SandboxResult<()> {
        match client.tools_call("__aperture_sandbox_unknown_tool__", serde_json::json!({}), self.limits.call_timeout).await {
            Err(_) => Ok(()),
            Ok(_) => Err(SandboxError::NegativeTestFailed {
                case: "malformed_request",
                reason: "server accepted a call to an undeclared tool".to_string(),
            }),
        }
    }
}

fn required_keys_present(value: &serde_json::Value, required: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    let Some(object) = value.as_object() else { return false };
    required.iter().all(|key| object.contains_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_present_accepts_empty_requirement() {
        assert!(required_keys_present(&serde_json::json!({}), &[]));
    }

    #[test]
    fn required_keys_present_checks_every_key() {
        let value = serde_json::json!({ "content": [], "isError": false });
        assert!(required_keys_present(&value, &["content".to_string()]));
        assert!(!required_keys_present(&value, &["missing".to_string()]));
    }
}
