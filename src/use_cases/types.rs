// Use-case level events, tick commands and frame outputs.

use crate::domain::{
    Chunk, EmitterId, EmitterSnapshot, File, ForceId, ForceSnapshot, Peer, Segment, SimulationTuning,
    TorrentInfo,
};
use glam::Vec3;
use std::sync::Arc;

/// Validated protocol events, fanned out to subscribers in registration order.
#[derive(Debug, Clone)]
pub enum SwarmEvent {
    TorrentReceived(Arc<TorrentInfo>),
    FileReceived(Arc<File>),
    ChunkReceived(Chunk),
    SegmentReceived(Segment),
    PeerReceived(Arc<Peer>),
    SessionReset,
    ShutdownRequested,
}

/// Mutations posted from the network context, applied at the start of the next tick.
#[derive(Debug, Clone)]
pub enum SimCommand {
    /// Drop every emitter and force and install a fresh repulsion force.
    ResetSession,
    SpawnEmitter { id: EmitterId, position: Vec3 },
    GrowEmitter { id: EmitterId },
    AddAttractor { target_id: EmitterId, location: Vec3 },
    /// Attract a uniformly chosen existing emitter.
    AttractRandom { location: Vec3 },
    RemoveForce { id: ForceId },
    Retune(SimulationTuning),
}

impl SimCommand {
    /// Per-chunk visual effects; everything else changes session structure
    /// and must reach the tick context.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            SimCommand::GrowEmitter { .. } | SimCommand::AddAttractor { .. }
        )
    }
}

/// State published after every tick for presentation.
#[derive(Debug, Clone, Default)]
pub struct FrameUpdate {
    pub tick: u64,
    pub emitters: Vec<EmitterSnapshot>,
    pub forces: Vec<ForceSnapshot>,
}
