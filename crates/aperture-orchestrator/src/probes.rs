//! The capability-probe seam consulted during `verifying` (spec §4.12,
//! §4.16).

use aperture_core::CapabilityName;
use aperture_sandbox::CapabilityProbe;

/// Supplies the Sandbox with the probes to run for one capability.
///
/// A dependency-inversion seam, the same shape as
/// [`aperture_variety::OperationalVarietySource`]: the Orchestrator does not
/// need to know where probe definitions come from (an operator-authored
/// manifest, a bundled default set), only that it can ask for them.
pub trait ProbeCatalog: Send + Sync {
    /// Probes to run against `capability` during verification. An empty
    /// result is valid: the Sandbox's protocol-compliance and negative-test
    /// stages still run, only the capability-specific probe stage is skipped.
    fn probes_for(&self, capability: &CapabilityName) -> Vec<CapabilityProbe>;
}

/// A [`ProbeCatalog`] with no probes configured for any capability.
///
/// The safe default when an operator has not authored a probe manifest:
/// verification still exercises protocol compliance and the negative tests,
/// it just cannot assert anything about the capability's actual behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbes;

impl ProbeCatalog for NoProbes {
    fn probes_for(&self, _capability: &CapabilityName) -> Vec<CapabilityProbe> {
        Vec::new()
    }
}
