// Translates swarm events into simulation commands for the tick context.

use super::simulation::CommandSender;
use super::types::{SimCommand, SwarmEvent};
use crate::domain::tuning::WorldTuning;
use crate::domain::{Chunk, EmitterId, Peer};
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::f32::consts::TAU;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Where a chunk's attractor pulls its emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkPlacement {
    /// Torrent position mapped onto a horizontal line across the world centre.
    #[default]
    Linear,
}

impl ChunkPlacement {
    pub fn target(&self, chunk: &Chunk, world: &WorldTuning) -> Vec3 {
        let centre = Vec3::new(world.width / 2.0, world.height / 2.0, 0.0);
        match self {
            ChunkPlacement::Linear => {
                let Some(info) = chunk.file.torrent() else {
                    return centre;
                };
                if info.total_size <= 0 {
                    return centre;
                }
                let fraction = chunk.torrent_midpoint() / f64::from(info.total_size);
                Vec3::new(world.width * fraction as f32, centre.y, 0.0)
            }
        }
    }
}

/// Which emitter a chunk's attractor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelection {
    #[default]
    TriggeringPeer,
    /// Uniform draw in `[0, known peers)`, regardless of who sent the chunk.
    RandomKnownPeer,
}

/// Spawn point for a peer: a fixed distance from the centre, rotated by bearing.
pub fn spawn_position(bearing: f32, world: &WorldTuning) -> Vec3 {
    let centre = Vec2::new(world.width / 2.0, world.height / 2.0);
    let offset = Vec2::from_angle(bearing * TAU).rotate(Vec2::new(world.width * 0.1, 0.0));
    (centre + offset).extend(0.0)
}

pub struct SwarmPolicy {
    commands: CommandSender,
    shutdown: Arc<Notify>,
    world: WorldTuning,
    placement: ChunkPlacement,
    selection: TargetSelection,
    known_peers: HashSet<i32>,
    rng: ChaCha8Rng,
}

impl SwarmPolicy {
    pub fn new(commands: CommandSender, shutdown: Arc<Notify>, world: WorldTuning) -> Self {
        Self {
            commands,
            shutdown,
            world,
            placement: ChunkPlacement::default(),
            selection: TargetSelection::default(),
            known_peers: HashSet::new(),
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_placement(mut self, placement: ChunkPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_selection(mut self, selection: TargetSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn handle(&mut self, event: &SwarmEvent) {
        match event {
            SwarmEvent::TorrentReceived(_) | SwarmEvent::SessionReset => {
                self.known_peers.clear();
                self.post(SimCommand::ResetSession);
            }
            SwarmEvent::FileReceived(_) => {}
            SwarmEvent::PeerReceived(peer) => self.on_peer(peer),
            SwarmEvent::ChunkReceived(chunk) => self.on_chunk(chunk),
            SwarmEvent::SegmentReceived(segment) => {
                debug!(
                    segment_id = segment.id,
                    peer_id = segment.peer_id,
                    duration = segment.duration,
                    "segment received"
                );
            }
            SwarmEvent::ShutdownRequested => self.shutdown.notify_one(),
        }
    }

    /// Wraps the policy as a closure for `SessionRegistry::subscribe`.
    pub fn into_subscriber(mut self) -> impl FnMut(&SwarmEvent) + Send + 'static {
        move |event: &SwarmEvent| self.handle(event)
    }

    fn on_peer(&mut self, peer: &Peer) {
        let Some(id) = emitter_id(peer.id) else {
            return;
        };
        self.known_peers.insert(peer.id);
        self.post(SimCommand::SpawnEmitter {
            id,
            position: spawn_position(peer.bearing, &self.world),
        });
    }

    fn on_chunk(&mut self, chunk: &Chunk) {
        if let Some(id) = emitter_id(chunk.peer_id) {
            self.post(SimCommand::GrowEmitter { id });
        }

        let target = match self.selection {
            TargetSelection::TriggeringPeer => emitter_id(chunk.peer_id),
            TargetSelection::RandomKnownPeer => {
                if self.known_peers.is_empty() {
                    None
                } else {
                    Some(self.rng.gen_range(0..self.known_peers.len()) as EmitterId)
                }
            }
        };
        let Some(target_id) = target else {
            return;
        };

        self.post(SimCommand::AddAttractor {
            target_id,
            location: self.placement.target(chunk, &self.world),
        });
    }

    fn post(&self, command: SimCommand) {
        self.commands.post(command);
    }
}

fn emitter_id(peer_id: i32) -> Option<EmitterId> {
    match EmitterId::try_from(peer_id) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(peer_id, "negative peer id has no emitter");
            None
        }
    }
}
