//! Tuning for the particle simulation.
//!
//! Keep this separate from runtime/server configuration (ports, tick rates, buffer sizes).
pub mod emitter;
pub mod force;

pub use emitter::EmitterTuning;
pub use force::ForceTuning;

use serde::Deserialize;
use thiserror::Error;

/// Size of the simulated region; the boundary constraint is rebuilt from it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SimulationTuning {
    pub emitter: EmitterTuning,
    pub force: ForceTuning,
    pub world: WorldTuning,
    /// Fixed seed for emitter charges and bounce jitter; entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("charge range {min}..{max} is empty")]
    EmptyChargeRange { min: f32, max: f32 },
    #[error("radius_min {min} exceeds radius_max {max}")]
    RadiusRange { min: f32, max: f32 },
    #[error("world size {width}x{height} must be positive")]
    WorldSize { width: f32, height: f32 },
}

impl SimulationTuning {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), TuningError> {
        let emitter = &self.emitter;
        let charge_span = emitter.charge_max - emitter.charge_min;
        if !(emitter.charge_min < emitter.charge_max && charge_span.is_finite()) {
            return Err(TuningError::EmptyChargeRange {
                min: emitter.charge_min,
                max: emitter.charge_max,
            });
        }
        if !(emitter.radius_min <= emitter.radius_max) || !emitter.radius_min.is_finite() {
            return Err(TuningError::RadiusRange {
                min: emitter.radius_min,
                max: emitter.radius_max,
            });
        }
        let world = &self.world;
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(TuningError::WorldSize {
                width: world.width,
                height: world.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_tuning_is_default_then_it_validates() {
        assert_eq!(SimulationTuning::default().validate(), Ok(()));
    }

    #[test]
    fn when_charge_range_is_empty_then_validate_fails() {
        let mut tuning = SimulationTuning::default();
        tuning.emitter.charge_min = 0.5;
        tuning.emitter.charge_max = 0.5;

        assert_eq!(
            tuning.validate(),
            Err(TuningError::EmptyChargeRange { min: 0.5, max: 0.5 })
        );
    }

    #[test]
    fn when_radius_min_exceeds_max_then_validate_fails() {
        let mut tuning = SimulationTuning::default();
        tuning.emitter.radius_min = 60.0;

        assert!(matches!(tuning.validate(), Err(TuningError::RadiusRange { .. })));
    }

    #[test]
    fn when_world_has_no_area_then_validate_fails() {
        let mut tuning = SimulationTuning::default();
        tuning.world.height = 0.0;

        assert!(matches!(tuning.validate(), Err(TuningError::WorldSize { .. })));
    }
}
