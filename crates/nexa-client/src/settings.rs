//! Tunables of the client-side stores.
//!
//! Defaults reproduce the product's behaviour; tests and the headless driver
//! override them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use nexa_shared::constants::{
    AI_DELAY_MS, SEND_DELAY_MS, SIMULATOR_MAX_DELAY_SECS, SIMULATOR_MESSAGE_PROBABILITY,
    SIMULATOR_MIN_DELAY_SECS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Artificial latency of `send_message`.
    pub send_delay_ms: u64,
    /// Artificial latency of `trigger_ai`.
    pub ai_delay_ms: u64,
    pub simulator: SimulatorSettings,
}

impl ClientSettings {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }

    pub fn ai_delay(&self) -> Duration {
        Duration::from_millis(self.ai_delay_ms)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            send_delay_ms: SEND_DELAY_MS,
            ai_delay_ms: AI_DELAY_MS,
            simulator: SimulatorSettings::default(),
        }
    }
}

/// Timing of the inbound-message simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Chance in `[0, 1]` that a wake-up produces a message.
    pub message_probability: f64,
}

impl SimulatorSettings {
    /// Bounds as an ordered, non-empty range; swapped bounds are tolerated.
    pub fn delay_bounds(&self) -> (Duration, Duration) {
        let lo = self.min_delay_secs.min(self.max_delay_secs);
        let hi = self.min_delay_secs.max(self.max_delay_secs);
        (Duration::from_secs(lo), Duration::from_secs(hi))
    }

    /// Probability clamped into `[0, 1]`; NaN counts as zero.
    pub fn probability(&self) -> f64 {
        if self.message_probability.is_nan() {
            return 0.0;
        }
        self.message_probability.clamp(0.0, 1.0)
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            min_delay_secs: SIMULATOR_MIN_DELAY_SECS,
            max_delay_secs: SIMULATOR_MAX_DELAY_SECS,
            message_probability: SIMULATOR_MESSAGE_PROBABILITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_timings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.send_delay(), Duration::from_millis(500));
        assert_eq!(settings.ai_delay(), Duration::from_secs(2));
        assert_eq!(
            settings.simulator.delay_bounds(),
            (Duration::from_secs(30), Duration::from_secs(90))
        );
        assert_eq!(settings.simulator.probability(), 0.3);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"simulator":{"message_probability":1.5}}"#).unwrap();
        assert_eq!(settings.send_delay_ms, 500);
        assert_eq!(settings.simulator.min_delay_secs, 30);
        assert_eq!(settings.simulator.probability(), 1.0);
    }

    #[test]
    fn swapped_bounds_are_reordered() {
        let sim = SimulatorSettings {
            min_delay_secs: 9,
            max_delay_secs: 3,
            message_probability: 0.5,
        };
        assert_eq!(sim.delay_bounds(), (Duration::from_secs(3), Duration::from_secs(9)));
    }
}
