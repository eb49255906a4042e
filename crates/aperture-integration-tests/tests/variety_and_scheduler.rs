//! The Scheduler drives the Variety Engine's tick; a sustained low
//! operational/environmental ratio surfaces as a wildcard trigger, not tied
//! to one capability (spec §4.1, §4.15, §9 "use operational judgement").

use std::sync::Arc;
use std::time::Duration;

use aperture_core::CapabilityName;
use aperture_events::EventBus;
use aperture_scheduler::{Scheduler, TickHandler};
use aperture_variety::{OperationalSnapshot, OperationalVarietySource, VarietyEngine, VarietyEngineConfig};
use async_trait::async_trait;
use parking_lot::Mutex;

struct EmptySource;

impl OperationalVarietySource for EmptySource {
    fn snapshot(&self) -> OperationalSnapshot {
        OperationalSnapshot { capability_count: 0, server_count: 0, tool_count: 0 }
    }
}

struct CollectingHandler {
    engine: Arc<VarietyEngine>,
    seen: Arc<Mutex<Vec<CapabilityName>>>,
}

#[async_trait]
impl TickHandler for CollectingHandler {
    async fn on_tick(&self) {
        if let Ok(triggers) = self.engine.tick() {
            let mut seen = self.seen.lock();
            for trigger in triggers {
                seen.push(trigger.capability);
            }
        }
    }
}

async fn wait_for<F: Fn() -> bool>(predicate: F) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn sustained_low_ratio_surfaces_as_a_wildcard_trigger_through_the_scheduler() {
    let config = VarietyEngineConfig { sustained_samples: 2, ..VarietyEngineConfig::default() };
    let engine = Arc::new(VarietyEngine::new(config, EventBus::new(), Arc::new(EmptySource)));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let scheduler = Scheduler::new();
    scheduler
        .register(
            "variety",
            Duration::from_secs(3600),
            Arc::new(CollectingHandler { engine: Arc::clone(&engine), seen: Arc::clone(&seen) }),
        )
        .unwrap();

    // Two sustained-low ticks are required before a trigger fires.
    scheduler.fire_now("variety").unwrap();
    wait_for(|| !engine.samples().is_empty()).await;
    scheduler.fire_now("variety").unwrap();
    wait_for(|| seen.lock().len() == 1).await;

    let triggers = seen.lock().clone();
    assert_eq!(triggers, vec![CapabilityName::new("*")]);

    // The wildcard trigger is now in-flight; further low-ratio ticks do not
    // re-emit it until the caller clears it.
    scheduler.fire_now("variety").unwrap();
    scheduler.fire_now("variety").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().len(), 1);

    engine.clear_in_flight(&CapabilityName::new("*"));
    scheduler.fire_now("variety").unwrap();
    scheduler.fire_now("variety").unwrap();
    wait_for(|| seen.lock().len() == 2).await;
    assert_eq!(seen.lock().len(), 2);

    scheduler.stop_all();
}
