// Simulation entities and the read-only snapshots handed to presentation.

use glam::Vec3;
use std::collections::HashMap;
use std::f32::consts::PI;

/// Emitter ids share the peer id namespace.
pub type EmitterId = u32;
/// Force ids start at 1 and are never reused within a session.
pub type ForceId = u32;

/// A particle standing in for one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    pub id: EmitterId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub inv_mass: f32,
    pub charge: f32,
}

impl Emitter {
    pub fn new(id: EmitterId, position: Vec3, velocity: Vec3, radius: f32, charge: f32) -> Self {
        let mut emitter = Self {
            id,
            position,
            velocity,
            acceleration: Vec3::ZERO,
            radius,
            mass: 0.0,
            inv_mass: 0.0,
            charge,
        };
        emitter.set_radius(radius);
        emitter
    }

    /// Sets the radius and derives mass from the disc area.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.mass = radius * radius * PI;
        self.inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
    }
}

/// Emitters in creation order, addressable by id.
#[derive(Debug, Clone, Default)]
pub struct Emitters {
    items: Vec<Emitter>,
    index: HashMap<EmitterId, usize>,
}

impl Emitters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an emitter; returns false and keeps the existing one if the id is taken.
    pub fn insert(&mut self, emitter: Emitter) -> bool {
        if self.index.contains_key(&emitter.id) {
            return false;
        }
        self.index.insert(emitter.id, self.items.len());
        self.items.push(emitter);
        true
    }

    /// Smallest id above every id in use.
    pub fn next_id(&self) -> EmitterId {
        self.items
            .iter()
            .map(|e| e.id.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    pub fn contains(&self, id: EmitterId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EmitterId) -> Option<&Emitter> {
        self.index.get(&id).map(|&slot| &self.items[slot])
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        let slot = *self.index.get(&id)?;
        self.items.get_mut(slot)
    }

    /// Id of the emitter at creation-order position `nth`.
    pub fn id_at(&self, nth: usize) -> Option<EmitterId> {
        self.items.get(nth).map(|e| e.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Emitter> {
        self.items.iter()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Emitter] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceKind {
    Repulsion,
    IdAttractor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSnapshot {
    pub id: EmitterId,
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForceSnapshot {
    pub id: ForceId,
    pub kind: ForceKind,
    pub magnitude: f32,
}

impl From<&Emitter> for EmitterSnapshot {
    fn from(e: &Emitter) -> Self {
        Self {
            id: e.id,
            position: e.position,
            radius: e.radius,
        }
    }
}
