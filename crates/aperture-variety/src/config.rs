//! Tunables for the Variety Engine, mirrored from [`aperture_config::Config`].

use std::time::Duration;

/// Thresholds and sizing the Variety Engine applies on every tick.
#[derive(Debug, Clone, Copy)]
pub struct VarietyEngineConfig {
    /// Ratio below which the gap is considered unacceptable.
    pub low_watermark: f64,
    /// Consecutive low samples required before the ratio-based trigger fires.
    pub sustained_samples: u32,
    /// Consecutive routing failures for one capability before it triggers.
    pub routing_failure_streak: u32,
    /// Width of the sliding window recent demand signals are counted over.
    pub demand_window: Duration,
    /// Maximum samples retained in the ring buffer.
    pub ring_capacity: usize,
    /// Environmental variety floor, present even with zero recorded demand.
    pub baseline_environmental: f64,
}

impl Default for VarietyEngineConfig {
    fn default() -> Self {
        Self {
            low_watermark: 0.70,
            sustained_samples: 3,
            routing_failure_streak: 5,
            demand_window: Duration::from_secs(60),
            ring_capacity: 500,
            baseline_environmental: 1.0,
        }
    }
}

impl From<&aperture_config::Config> for VarietyEngineConfig {
    fn from(config: &aperture_config::Config) -> Self {
        Self {
            low_watermark: config.thresholds.variety_low_watermark,
            sustained_samples: config.thresholds.variety_sustained_samples,
            routing_failure_streak: config.thresholds.variety_routing_failure_streak,
            demand_window: Duration::from_millis(config.thresholds.variety_demand_window_ms),
            ring_capacity: config.limits.variety_sample_capacity,
            baseline_environmental: VarietyEngineConfig::default().baseline_environmental,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_aperture_config_carries_every_threshold_field() {
        let root = aperture_config::Config::default();
        let config = VarietyEngineConfig::from(&root);
        assert_eq!(config.low_watermark, root.thresholds.variety_low_watermark);
        assert_eq!(config.sustained_samples, root.thresholds.variety_sustained_samples);
        assert_eq!(config.routing_failure_streak, root.thresholds.variety_routing_failure_streak);
        assert_eq!(config.ring_capacity, root.limits.variety_sample_capacity);
    }
}
