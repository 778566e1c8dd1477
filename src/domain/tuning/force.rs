//! Tuning for repulsion and attractor forces.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceTuning {
    /// Magnitude of the session-wide repulsion force.
    pub repulsion: f32,

    /// Pairs interact within `multiplier * (r_i + r_j)`.
    pub repulsion_radius_multiplier: f32,

    /// Attractors push back inside this radius and pull outside it.
    pub attraction_radius: f32,

    pub attraction_magnitude: f32,

    /// Seconds until a new attractor's lifespan reaches zero.
    pub attraction_duration: f32,

    /// Gain applied to the push-back inside the attraction radius.
    pub attraction_push_gain: f32,

    /// Upper bound on any single force term.
    pub max_force: f32,

    /// Squared distances at or below this never interact.
    pub min_distance_sq: f32,
}

impl Default for ForceTuning {
    fn default() -> Self {
        Self {
            repulsion: 10.0,
            repulsion_radius_multiplier: 1.5,
            attraction_radius: 50.0,
            attraction_magnitude: 10.0,
            attraction_duration: 2.0,
            attraction_push_gain: 100.0,
            max_force: 50.0,
            min_distance_sq: 0.1,
        }
    }
}
