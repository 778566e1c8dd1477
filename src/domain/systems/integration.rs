use crate::domain::tuning::EmitterTuning;
use crate::domain::Emitter;
use glam::Vec3;

pub fn integrate(emitters: &mut [Emitter], tuning: &EmitterTuning) {
    for e in emitters.iter_mut() {
        step_emitter(e, tuning);
    }
}

/// Explicit Euler step followed by damping; clears the accumulated acceleration.
pub fn step_emitter(e: &mut Emitter, tuning: &EmitterTuning) {
    e.velocity += e.acceleration;
    e.position += e.velocity;

    e.velocity *= tuning.velocity_damping;
    e.acceleration = Vec3::ZERO;
    // Only the drawn radius relaxes; mass keeps the last grown size.
    e.radius = tuning.radius_min + (e.radius - tuning.radius_min) * tuning.radius_damping;
}
