use crate::domain::Emitter;
use glam::Vec3;
use rand::Rng;
use std::ops::Range;

/// Velocity factor applied on a bounce; randomized so bounces never settle into resonance.
pub const BOUNCE_FACTOR: Range<f32> = -0.5..-0.1;

/// Axis-aligned boundary clamp, shrunk by each emitter's radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Axes (x, y, z) the clamp applies to.
    pub axes: [bool; 3],
    pub min: Vec3,
    pub max: Vec3,
}

impl Constraint {
    pub fn new(axes: [bool; 3], min: Vec3, max: Vec3) -> Self {
        Self { axes, min, max }
    }

    /// Planar bounds covering a `width` x `height` world anchored at the origin.
    pub fn world_bounds(width: f32, height: f32) -> Self {
        Self::new(
            [true, true, false],
            Vec3::ZERO,
            Vec3::new(width, height, 0.0),
        )
    }

    pub fn apply<R: Rng>(&self, emitters: &mut [Emitter], rng: &mut R) {
        for e in emitters.iter_mut() {
            let bounce = rng.gen_range(BOUNCE_FACTOR);
            let min_lim = self.min + Vec3::splat(e.radius);
            let max_lim = self.max - Vec3::splat(e.radius);

            for axis in 0..3 {
                if !self.axes[axis] {
                    continue;
                }
                if e.position[axis] < min_lim[axis] {
                    e.position[axis] = min_lim[axis];
                    e.velocity[axis] *= bounce;
                } else if e.position[axis] > max_lim[axis] {
                    e.position[axis] = max_lim[axis];
                    e.velocity[axis] *= bounce;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn when_emitter_passes_min_then_it_is_clamped_and_bounced() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let constraint = Constraint::world_bounds(100.0, 100.0);
        let mut emitters = [Emitter::new(
            0,
            Vec3::new(-3.0, 50.0, 0.0),
            Vec3::new(-4.0, 1.0, 0.0),
            5.0,
            0.5,
        )];

        constraint.apply(&mut emitters, &mut rng);

        let e = &emitters[0];
        assert_eq!(e.position.x, 5.0);
        let factor = e.velocity.x / -4.0;
        assert!(BOUNCE_FACTOR.contains(&factor), "factor {factor}");
        assert!(e.velocity.x > 0.0);
        assert_eq!(e.velocity.y, 1.0);
    }

    #[test]
    fn when_emitter_passes_max_then_it_is_clamped_to_max_minus_radius() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let constraint = Constraint::world_bounds(100.0, 80.0);
        let mut emitters = [Emitter::new(
            0,
            Vec3::new(50.0, 90.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            5.0,
            0.5,
        )];

        constraint.apply(&mut emitters, &mut rng);

        assert_eq!(emitters[0].position.y, 75.0);
        assert!(emitters[0].velocity.y < 0.0);
    }

    #[test]
    fn when_axis_is_disabled_then_it_is_left_alone() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let constraint = Constraint::world_bounds(100.0, 100.0);
        let mut emitters = [Emitter::new(
            0,
            Vec3::new(50.0, 50.0, -40.0),
            Vec3::new(0.0, 0.0, -1.0),
            5.0,
            0.5,
        )];

        constraint.apply(&mut emitters, &mut rng);

        assert_eq!(emitters[0].position.z, -40.0);
        assert_eq!(emitters[0].velocity.z, -1.0);
    }
}
