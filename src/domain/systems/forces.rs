use crate::domain::state::{EmitterId, Emitters, ForceKind};
use crate::domain::tuning::ForceTuning;
use crate::domain::Emitter;
use glam::Vec3;

/// Id-addressable contributor to emitter acceleration.
#[derive(Debug, Clone, PartialEq)]
pub enum Force {
    Repulsion(Repulsion),
    IdAttractor(IdAttractor),
}

impl Force {
    pub fn kind(&self) -> ForceKind {
        match self {
            Force::Repulsion(_) => ForceKind::Repulsion,
            Force::IdAttractor(_) => ForceKind::IdAttractor,
        }
    }

    pub fn magnitude(&self) -> f32 {
        match self {
            Force::Repulsion(r) => r.magnitude,
            Force::IdAttractor(a) => a.magnitude,
        }
    }

    pub fn set_magnitude(&mut self, magnitude: f32) {
        match self {
            Force::Repulsion(r) => r.magnitude = magnitude,
            Force::IdAttractor(a) => a.magnitude = magnitude,
        }
    }

    /// Adds this force's contribution to emitter accelerations.
    pub fn apply(&self, emitters: &mut Emitters, tuning: &ForceTuning) {
        match self {
            Force::Repulsion(r) => r.apply(emitters.as_mut_slice(), tuning),
            Force::IdAttractor(a) => a.apply(emitters, tuning),
        }
    }

    pub fn as_attractor(&self) -> Option<&IdAttractor> {
        match self {
            Force::IdAttractor(a) => Some(a),
            Force::Repulsion(_) => None,
        }
    }
}

/// Pairwise, mass-scaled repulsion between every pair of emitters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repulsion {
    pub magnitude: f32,
}

impl Repulsion {
    pub fn new(magnitude: f32) -> Self {
        Self { magnitude }
    }

    pub fn apply(&self, emitters: &mut [Emitter], tuning: &ForceTuning) {
        // Naive O(n^2) over unordered pairs.
        for i in 0..emitters.len() {
            let (head, tail) = emitters.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                if let Some(push) = repulsion_push(a, b, self.magnitude, tuning) {
                    a.acceleration += push * a.inv_mass;
                    b.acceleration -= push * b.inv_mass;
                }
            }
        }
    }
}

/// Push on `a` away from `b` before inverse-mass scaling, or `None` when out of range.
pub fn repulsion_push(a: &Emitter, b: &Emitter, magnitude: f32, tuning: &ForceTuning) -> Option<Vec3> {
    let delta = a.position - b.position;
    let dist_sq = delta.length_squared();
    let reach = (a.radius + b.radius) * tuning.repulsion_radius_multiplier;
    let coupling = a.mass * b.mass * a.charge * b.charge;
    let strength = repulsion_strength(dist_sq, reach * reach, coupling, tuning)?;
    Some(delta.normalize_or_zero() * strength * magnitude)
}

/// Clamped repulsion strength with linear falloff; zero band at both thresholds.
pub fn repulsion_strength(
    dist_sq: f32,
    reach_sq: f32,
    coupling: f32,
    tuning: &ForceTuning,
) -> Option<f32> {
    if dist_sq <= tuning.min_distance_sq || dist_sq >= reach_sq {
        return None;
    }
    let falloff = 1.0 - dist_sq / reach_sq;
    let energy = coupling / dist_sq;
    Some(energy.min(tuning.max_force) * falloff)
}

/// Pulls a single emitter toward `location`, fading out with `lifespan`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdAttractor {
    pub magnitude: f32,
    pub target_id: EmitterId,
    pub location: Vec3,
    /// In `[0, 1]`; scales the effective strength.
    pub lifespan: f32,
    /// Seconds for `lifespan` to run from 1 to 0.
    pub duration: f32,
}

impl IdAttractor {
    pub fn new(magnitude: f32, duration: f32, location: Vec3, target_id: EmitterId) -> Self {
        Self {
            magnitude,
            target_id,
            location,
            lifespan: 1.0,
            duration,
        }
    }

    pub fn apply(&self, emitters: &mut Emitters, tuning: &ForceTuning) {
        let Some(emitter) = emitters.get_mut(self.target_id) else {
            return;
        };
        if let Some(acc) = self.acceleration_for(emitter, tuning) {
            emitter.acceleration += acc;
        }
    }

    /// Acceleration this attractor would add to `emitter`.
    pub fn acceleration_for(&self, emitter: &Emitter, tuning: &ForceTuning) -> Option<Vec3> {
        let delta = self.location - emitter.position;
        let dist_sq = delta.length_squared();
        if dist_sq <= tuning.min_distance_sq {
            return None;
        }

        let dir = delta.normalize_or_zero();
        let gate = self.magnitude * self.lifespan;
        let reach_sq = tuning.attraction_radius * tuning.attraction_radius;

        if dist_sq < reach_sq {
            // Inside the radius: push back out, harder the deeper it gets.
            let falloff = 1.0 - dist_sq / reach_sq;
            let force = (emitter.charge / dist_sq * emitter.inv_mass).min(tuning.max_force);
            Some(-dir * force * falloff * tuning.attraction_push_gain * gate)
        } else {
            let force = (emitter.charge * emitter.inv_mass).min(tuning.max_force);
            Some(dir * force * gate)
        }
    }

    /// Advances the lifespan by `elapsed` seconds of timeline.
    pub fn decay(&mut self, elapsed: f32) {
        self.lifespan = if self.duration > 0.0 {
            (self.lifespan - elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.lifespan <= 0.0 {
            self.magnitude = 0.0;
        }
    }

    pub fn is_expired(&self) -> bool {
        self.lifespan <= 0.0
    }
}
