//! Bridges the Clock's `variety` tick to the Orchestrator (spec §2 "Clock ->
//! Variety Engine -> (trigger) -> Orchestrator").

use std::sync::Arc;

use aperture_config::RestartPolicy;
use aperture_core::CapabilityName;
use aperture_orchestrator::{AcquisitionRequest, Orchestrator, Priority};
use aperture_scheduler::TickHandler;
use aperture_variety::{TriggerPriority, VarietyEngine};
use async_trait::async_trait;
use tracing::{debug, warn};

/// The reserved capability name the Variety Engine uses for a sustained
/// low-ratio trigger not tied to any one capability (spec §4.15 "use
/// operational judgement").
const WILDCARD_CAPABILITY: &str = "*";

/// On every `variety` tick, runs [`VarietyEngine::tick`] and forwards each
/// emitted trigger to the Orchestrator as an [`AcquisitionRequest`].
///
/// The wildcard, not-tied-to-one-capability trigger (spec §9 Open Question:
/// "its actual effect... is not explicit") is deliberately not submitted to
/// the Orchestrator — there is no concrete capability for Discovery to
/// search for — and is instead logged as an operator-facing signal that
/// overall operational variety is systemically low.
pub struct VarietyTickHandler {
    engine: Arc<VarietyEngine>,
    orchestrator: Orchestrator,
    default_restart_policy: RestartPolicy,
}

impl VarietyTickHandler {
    /// Build a handler driving `orchestrator` from `engine`'s triggers.
    #[must_use]
    pub fn new(engine: Arc<VarietyEngine>, orchestrator: Orchestrator, default_restart_policy: RestartPolicy) -> Self {
        Self { engine, orchestrator, default_restart_policy }
    }
}

#[async_trait]
impl TickHandler for VarietyTickHandler {
    async fn on_tick(&self) {
        let triggers = match self.engine.tick() {
            Ok(triggers) => triggers,
            Err(err) => {
                warn!(error = %err, "variety tick failed to compute a sample");
                return;
            }
        };

        for trigger in triggers {
            if trigger.capability.as_str() == WILDCARD_CAPABILITY {
                warn!(
                    shortfall = trigger.shortfall,
                    "sustained low operational/environmental variety ratio with no specific capability to acquire"
                );
                continue;
            }

            let priority = match trigger.priority {
                TriggerPriority::Normal => Priority::Normal,
                TriggerPriority::High => Priority::High,
            };
            let request = AcquisitionRequest::new(trigger.capability.clone(), self.default_restart_policy)
                .with_priority(priority);
            let job_id = self.orchestrator.submit(request);
            debug!(capability = %trigger.capability, %job_id, reason = ?trigger.reason, "variety trigger submitted to orchestrator");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_capability_constant_matches_variety_engine_convention() {
        assert_eq!(CapabilityName::new(WILDCARD_CAPABILITY).as_str(), "*");
    }
}
