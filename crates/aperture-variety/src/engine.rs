//! Gap computation and trigger emission (spec §4.15).

use std::collections::VecDeque;

use aperture_core::{CapabilityName, Timestamp};
use aperture_events::{ApertureEvent, EventBus};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::VarietyEngineConfig;
use crate::error::{VarietyError, VarietyResult};
use crate::types::{
    OperationalSnapshot, OperationalVarietySource, TriggerPriority, TriggerReason, VarietySample,
    VarietyTrigger,
};

/// Per-capability routing-failure streak, reset on any success.
#[derive(Debug, Default)]
struct FailureStreak {
    consecutive: u32,
}

/// Computes `operational_variety` from the Registry and `environmental_variety`
/// from recent demand signals, pushes samples into a bounded ring buffer, and
/// emits [`VarietyTrigger`]s when the gap crosses a configured threshold
/// (spec §4.15).
///
/// Triggers are deduplicated by capability: once a trigger fires for a
/// capability it is considered in-flight and will not fire again until the
/// Orchestrator reports the job settled via [`VarietyEngine::clear_in_flight`].
pub struct VarietyEngine {
    config: VarietyEngineConfig,
    events: EventBus,
    source: std::sync::Arc<dyn OperationalVarietySource>,
    samples: Mutex<VecDeque<VarietySample>>,
    consecutive_low: Mutex<u32>,
    demand_signals: DashMap<CapabilityName, VecDeque<Timestamp>>,
    routing_failures: DashMap<CapabilityName, FailureStreak>,
    in_flight: DashMap<CapabilityName, Timestamp>,
}

impl VarietyEngine {
    /// Construct an engine reading Registry shape from `source` and
    /// publishing samples on `events`.
    #[must_use]
    pub fn new(
        config: VarietyEngineConfig,
        events: EventBus,
        source: std::sync::Arc<dyn OperationalVarietySource>,
    ) -> Self {
        Self {
            config,
            events,
            source,
            samples: Mutex::new(VecDeque::new()),
            consecutive_low: Mutex::new(0),
            demand_signals: DashMap::new(),
            routing_failures: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Record that a task requested a capability with no bound server
    /// (spec §4.15 trigger condition (b)).
    pub fn record_unavailable_request(&self, capability: &CapabilityName) {
        let now = Timestamp::now();
        let mut entry = self.demand_signals.entry(capability.clone()).or_default();
        entry.push_back(now);
        prune_window(&mut entry, now, self.config.demand_window);
    }

    /// Record a routing outcome for `capability`, extending or resetting its
    /// failure streak (spec §4.15 trigger condition (c)).
    pub fn record_routing_outcome(&self, capability: &CapabilityName, succeeded: bool) {
        let mut streak = self.routing_failures.entry(capability.clone()).or_default();
        if succeeded {
            streak.consecutive = 0;
        } else {
            streak.consecutive += 1;
        }
    }

    /// Clear the in-flight marker for `capability`, allowing future samples
    /// to trigger acquisition for it again. Called once the Orchestrator's
    /// job for that capability reaches `done` or `failed`.
    pub fn clear_in_flight(&self, capability: &CapabilityName) {
        self.in_flight.remove(capability);
    }

    /// Compute one [`VarietySample`] from the current snapshot and demand
    /// history, push it into the ring buffer, publish it, and return any
    /// triggers the new sample produced.
    ///
    /// # Errors
    /// Returns [`VarietyError::DegenerateEnvironment`] if environmental
    /// variety computed to a non-positive value.
    pub fn tick(&self) -> VarietyResult<Vec<VarietyTrigger>> {
        let snapshot = self.source.snapshot();
        let operational = operational_variety(&snapshot);
        let environmental = self.environmental_variety();
        if environmental <= 0.0 {
            return Err(VarietyError::DegenerateEnvironment(environmental));
        }
        let ratio = operational / environmental;
        let now = Timestamp::now();
        let sample = VarietySample { at: now, operational, environmental, ratio };
        self.push_sample(sample);
        self.events.publish(ApertureEvent::VarietySampleRecorded {
            at: now,
            operational,
            environmental,
            ratio,
        });

        let mut triggers = Vec::new();
        self.evaluate_low_ratio(ratio, now, &mut triggers);
        self.evaluate_unavailable_demand(now, &mut triggers);
        self.evaluate_routing_streaks(now, &mut triggers);

        for trigger in &triggers {
            debug!(
                capability = %trigger.capability,
                reason = ?trigger.reason,
                shortfall = trigger.shortfall,
                "variety trigger fired"
            );
        }
        Ok(triggers)
    }

    /// A read-only copy of the retained samples, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<VarietySample> {
        self.samples.lock().iter().copied().collect()
    }

    fn push_sample(&self, sample: VarietySample) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.config.ring_capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    fn environmental_variety(&self) -> f64 {
        let recent_demand: usize = self
            .demand_signals
            .iter()
            .map(|entry| entry.value().len())
            .sum();
        self.config.baseline_environmental + recent_demand as f64
    }

    fn try_emit(&self, capability: &CapabilityName, reason: TriggerReason, shortfall: f64, priority: TriggerPriority, at: Timestamp, out: &mut Vec<VarietyTrigger>) {
        if self.in_flight.contains_key(capability) {
            return;
        }
        self.in_flight.insert(capability.clone(), at);
        out.push(VarietyTrigger {
            capability: capability.clone(),
            reason,
            shortfall,
            priority,
            at,
        });
    }

    fn evaluate_low_ratio(&self, ratio: f64, at: Timestamp, out: &mut Vec<VarietyTrigger>) {
        let mut consecutive = self.consecutive_low.lock();
        if ratio < self.config.low_watermark {
            *consecutive += 1;
        } else {
            *consecutive = 0;
        }
        if *consecutive >= self.config.sustained_samples {
            *consecutive = 0;
            // A sustained-low-ratio trigger is not tied to one capability; the
            // Orchestrator's demand backlog decides what to acquire next. We
            // surface it under a reserved wildcard capability the Orchestrator
            // treats as "use operational judgement".
            let shortfall = self.config.low_watermark - ratio;
            self.try_emit(
                &CapabilityName::new("*"),
                TriggerReason::LowRatio,
                shortfall,
                TriggerPriority::Normal,
                at,
                out,
            );
        }
    }

    fn evaluate_unavailable_demand(&self, at: Timestamp, out: &mut Vec<VarietyTrigger>) {
        for mut entry in self.demand_signals.iter_mut() {
            let capability = entry.key().clone();
            prune_window(entry.value_mut(), at, self.config.demand_window);
            if entry.value().is_empty() {
                continue;
            }
            let shortfall = entry.value().len() as f64;
            self.try_emit(&capability, TriggerReason::UnavailableCapabilityRequested, shortfall, TriggerPriority::High, at, out);
        }
    }

    fn evaluate_routing_streaks(&self, at: Timestamp, out: &mut Vec<VarietyTrigger>) {
        for entry in self.routing_failures.iter() {
            let capability = entry.key().clone();
            let streak = entry.value().consecutive;
            if streak >= self.config.routing_failure_streak {
                let shortfall = f64::from(streak);
                self.try_emit(&capability, TriggerReason::RoutingFailureStreak, shortfall, TriggerPriority::Normal, at, out);
            }
        }
    }
}

fn prune_window(signals: &mut VecDeque<Timestamp>, now: Timestamp, window: std::time::Duration) {
    while let Some(front) = signals.front() {
        if front.elapsed_until(now) > window {
            signals.pop_front();
        } else {
            break;
        }
    }
}

/// `log2` of a function of bound capabilities, tool counts, and server
/// count (spec §4.15): richer registries read as higher operational variety.
fn operational_variety(snapshot: &OperationalSnapshot) -> f64 {
    let raw = 1.0
        + snapshot.capability_count as f64
        + 0.5 * snapshot.server_count as f64
        + 0.1 * snapshot.tool_count as f64;
    raw.log2().max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_core::CapabilityName;
    use std::sync::Arc;

    struct FixedSource(OperationalSnapshot);

    impl OperationalVarietySource for FixedSource {
        fn snapshot(&self) -> OperationalSnapshot {
            self.0
        }
    }

    fn engine_with(snapshot: OperationalSnapshot, config: VarietyEngineConfig) -> VarietyEngine {
        VarietyEngine::new(config, EventBus::new(), Arc::new(FixedSource(snapshot)))
    }

    #[test]
    fn tick_pushes_a_bounded_ring_buffer() {
        let config = VarietyEngineConfig { ring_capacity: 2, ..VarietyEngineConfig::default() };
        let engine = engine_with(OperationalSnapshot { capability_count: 1, server_count: 1, tool_count: 1 }, config);
        for _ in 0..5 {
            engine.tick().unwrap();
        }
        assert_eq!(engine.samples().len(), 2);
    }

    #[test]
    fn sustained_low_ratio_triggers_once_then_coalesces() {
        let config = VarietyEngineConfig {
            low_watermark: 100.0, // operational variety can never exceed this
            sustained_samples: 2,
            baseline_environmental: 1.0,
            ..VarietyEngineConfig::default()
        };
        let engine = engine_with(OperationalSnapshot { capability_count: 1, server_count: 1, tool_count: 1 }, config);

        let first = engine.tick().unwrap();
        assert!(first.is_empty(), "needs two sustained samples first");
        let second = engine.tick().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].reason, TriggerReason::LowRatio);

        // Already in-flight: further low ratios do not refire.
        let third = engine.tick().unwrap();
        assert!(third.is_empty());

        engine.clear_in_flight(&CapabilityName::new("*"));
        let fourth = engine.tick().unwrap();
        assert_eq!(fourth.len(), 1);
    }

    #[test]
    fn unavailable_capability_request_triggers_and_expires_out_of_window() {
        let config = VarietyEngineConfig {
            demand_window: std::time::Duration::from_millis(0),
            ..VarietyEngineConfig::default()
        };
        let engine = engine_with(OperationalSnapshot::default(), config);
        let capability = CapabilityName::new("filesystem");
        engine.record_unavailable_request(&capability);
        let triggers = engine.tick().unwrap();
        assert!(triggers.iter().any(|t| t.capability == capability && t.reason == TriggerReason::UnavailableCapabilityRequested));
    }

    #[test]
    fn routing_failure_streak_triggers_after_threshold_and_resets_on_success() {
        let config = VarietyEngineConfig { routing_failure_streak: 3, ..VarietyEngineConfig::default() };
        let engine = engine_with(OperationalSnapshot::default(), config);
        let capability = CapabilityName::new("filesystem");
        for _ in 0..2 {
            engine.record_routing_outcome(&capability, false);
        }
        assert!(engine.tick().unwrap().is_empty());
        engine.record_routing_outcome(&capability, false);
        let triggers = engine.tick().unwrap();
        assert!(triggers.iter().any(|t| t.capability == capability && t.reason == TriggerReason::RoutingFailureStreak));

        engine.clear_in_flight(&capability);
        engine.record_routing_outcome(&capability, true);
        for _ in 0..2 {
            engine.record_routing_outcome(&capability, false);
        }
        assert!(engine.tick().unwrap().is_empty(), "success should have reset the streak");
    }

    #[test]
    fn degenerate_environment_is_rejected() {
        let config = VarietyEngineConfig { baseline_environmental: 0.0, ..VarietyEngineConfig::default() };
        let engine = engine_with(OperationalSnapshot::default(), config);
        assert!(matches!(engine.tick(), Err(VarietyError::DegenerateEnvironment(_))));
    }
}
