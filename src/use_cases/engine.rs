// N-body force simulation over id-addressed emitters and forces.

use crate::domain::systems::{Constraint, Force, IdAttractor, Repulsion, integration};
use crate::domain::{
    Emitter, EmitterId, EmitterSnapshot, Emitters, ForceId, ForceSnapshot, SimulationTuning,
};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Owns all emitter and force state; advanced once per tick.
///
/// Knows nothing about torrents or chunks; callers translate domain events
/// into emitter and force operations.
#[derive(Debug)]
pub struct SimulationEngine {
    tuning: SimulationTuning,
    emitters: Emitters,
    forces: BTreeMap<ForceId, Force>,
    constraints: Vec<Constraint>,
    next_force_id: ForceId,
    rng: ChaCha8Rng,
}

impl SimulationEngine {
    pub fn new(tuning: SimulationTuning) -> Self {
        let rng = match tuning.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let constraints = vec![Constraint::world_bounds(
            tuning.world.width,
            tuning.world.height,
        )];
        Self {
            tuning,
            emitters: Emitters::new(),
            forces: BTreeMap::new(),
            constraints,
            next_force_id: 1,
            rng,
        }
    }

    pub fn tuning(&self) -> &SimulationTuning {
        &self.tuning
    }

    /// Applies a scoped change to the tuning; world bounds are rebuilt if they moved.
    pub fn retune<F>(&mut self, change: F)
    where
        F: FnOnce(&mut SimulationTuning),
    {
        let world = self.tuning.world;
        change(&mut self.tuning);
        if self.tuning.world != world {
            self.set_world_bounds(self.tuning.world.width, self.tuning.world.height);
        }
    }

    /// Replaces the boundary constraints with a single planar world box.
    pub fn set_world_bounds(&mut self, width: f32, height: f32) {
        self.tuning.world.width = width;
        self.tuning.world.height = height;
        self.constraints.clear();
        self.constraints
            .push(Constraint::world_bounds(width, height));
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Adds an emitter under the next free id.
    pub fn add_emitter(&mut self, position: Vec3, velocity: Vec3) -> EmitterId {
        let id = self.emitters.next_id();
        self.insert_emitter(id, position, velocity);
        id
    }

    /// Adds an emitter under an explicit id; false if the id is already taken.
    pub fn insert_emitter(&mut self, id: EmitterId, position: Vec3, velocity: Vec3) -> bool {
        if self.emitters.contains(id) {
            return false;
        }
        let emitter_tuning = &self.tuning.emitter;
        let (min, max) = (emitter_tuning.charge_min, emitter_tuning.charge_max);
        // An empty or unbounded range cannot be sampled; fall back to the minimum.
        let charge = if min < max && (max - min).is_finite() {
            self.rng.gen_range(min..max)
        } else {
            min
        };
        let emitter = Emitter::new(id, position, velocity, emitter_tuning.radius_min, charge);
        self.emitters.insert(emitter)
    }

    /// Grows the emitter by one radius step while it is below the maximum.
    pub fn grow_emitter(&mut self, id: EmitterId) -> bool {
        let tuning = self.tuning.emitter;
        let Some(emitter) = self.emitters.get_mut(id) else {
            return false;
        };
        if emitter.radius >= tuning.radius_max {
            return false;
        }
        emitter.set_radius(emitter.radius + tuning.radius_step);
        true
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.get(id)
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.emitters.get_mut(id)
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Read-only view of emitters in creation order.
    pub fn emitters(&self) -> impl Iterator<Item = EmitterSnapshot> + '_ {
        self.emitters.iter().map(EmitterSnapshot::from)
    }

    /// Picks a uniformly random existing emitter.
    pub fn random_emitter_id(&mut self) -> Option<EmitterId> {
        if self.emitters.is_empty() {
            return None;
        }
        let nth = self.rng.gen_range(0..self.emitters.len());
        self.emitters.id_at(nth)
    }

    pub fn add_repulsion(&mut self, magnitude: f32) -> ForceId {
        self.insert_force(Force::Repulsion(Repulsion::new(magnitude)))
    }

    pub fn add_id_attractor(
        &mut self,
        magnitude: f32,
        duration: f32,
        location: Vec3,
        target_id: EmitterId,
    ) -> ForceId {
        self.insert_force(Force::IdAttractor(IdAttractor::new(
            magnitude, duration, location, target_id,
        )))
    }

    /// Removes a force; unknown ids are ignored since removals may race.
    pub fn remove_force(&mut self, id: ForceId) -> bool {
        let removed = self.forces.remove(&id).is_some();
        if removed {
            debug!(force_id = id, "force removed");
        }
        removed
    }

    /// Mutable handle for live retuning.
    pub fn get_force(&mut self, id: ForceId) -> Option<&mut Force> {
        self.forces.get_mut(&id)
    }

    pub fn force(&self, id: ForceId) -> Option<&Force> {
        self.forces.get(&id)
    }

    /// Read-only view of forces in ascending id order.
    pub fn forces(&self) -> impl Iterator<Item = ForceSnapshot> + '_ {
        self.forces.iter().map(|(&id, force)| ForceSnapshot {
            id,
            kind: force.kind(),
            magnitude: force.magnitude(),
        })
    }

    /// Decays attractor lifespans by wall/simulation time, independent of tick count.
    pub fn advance_timeline(&mut self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f32();
        for force in self.forces.values_mut() {
            if let Force::IdAttractor(attractor) = force {
                attractor.decay(seconds);
            }
        }
    }

    /// Runs `steps` fixed integration steps.
    pub fn update(&mut self, steps: u32) {
        for _ in 0..steps {
            self.step();
        }
    }

    fn step(&mut self) {
        for force in self.forces.values() {
            force.apply(&mut self.emitters, &self.tuning.force);
        }

        integration::integrate(self.emitters.as_mut_slice(), &self.tuning.emitter);

        for constraint in &self.constraints {
            constraint.apply(self.emitters.as_mut_slice(), &mut self.rng);
        }
    }

    /// Drops every emitter and force; force ids restart at 1.
    pub fn reset(&mut self) {
        self.emitters.clear();
        self.forces.clear();
        self.next_force_id = 1;
    }

    fn insert_force(&mut self, force: Force) -> ForceId {
        let id = self.next_force_id;
        self.next_force_id += 1;
        debug!(force_id = id, kind = ?force.kind(), magnitude = force.magnitude(), "force added");
        self.forces.insert(id, force);
        id
    }
}
