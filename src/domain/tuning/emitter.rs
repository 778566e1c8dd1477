//! Tuning for individual emitters.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmitterTuning {
    /// Baseline radius every emitter is created with and relaxes back to.
    pub radius_min: f32,

    /// Radius growth stops once an emitter reaches this size.
    pub radius_max: f32,

    /// Radius added per chunk received from the emitter's peer.
    pub radius_step: f32,

    /// Fraction of the excess radius kept per tick.
    pub radius_damping: f32,

    /// Fraction of velocity kept per tick.
    pub velocity_damping: f32,

    /// Charges are drawn uniformly from `charge_min..charge_max`.
    pub charge_min: f32,
    pub charge_max: f32,
}

impl Default for EmitterTuning {
    fn default() -> Self {
        Self {
            radius_min: 10.0,
            radius_max: 50.0,
            radius_step: 0.1,
            radius_damping: 0.975,
            velocity_damping: 0.975,
            charge_min: 0.35,
            charge_max: 0.75,
        }
    }
}
