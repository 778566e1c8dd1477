// Domain layer: swarm entities and the particle simulation rules.

pub mod errors;
pub mod state;
pub mod swarm;
pub mod systems;
pub mod tuning;

pub use errors::ProtocolDesyncError;
pub use state::{
    Emitter, EmitterId, EmitterSnapshot, Emitters, ForceId, ForceKind, ForceSnapshot,
};
pub use swarm::{Chunk, ChunkReport, File, Peer, Segment, SegmentReport, Torrent, TorrentInfo};
pub use tuning::{SimulationTuning, TuningError};
