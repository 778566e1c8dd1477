// Per-session entity registry: validates causal ordering and fans events out.

use super::types::SwarmEvent;
use crate::domain::{
    Chunk, ChunkReport, File, Peer, ProtocolDesyncError, Segment, SegmentReport, Torrent,
    TorrentInfo,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback invoked synchronously for every validated event.
pub type Subscriber = Box<dyn FnMut(&SwarmEvent) + Send>;

/// Owns the current session and the ordered subscriber list.
///
/// Handlers run on the network context; subscribers must not touch simulation
/// state directly and instead post commands to the tick context.
#[derive(Default)]
pub struct SessionRegistry {
    torrent: Option<Torrent>,
    subscribers: Vec<Subscriber>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber; subscribers are notified in registration order.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&SwarmEvent) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn torrent(&self) -> Option<&Torrent> {
        self.torrent.as_ref()
    }

    pub fn file(&self, file_num: i32) -> Option<&Arc<File>> {
        self.torrent.as_ref()?.file(file_num)
    }

    pub fn peer(&self, id: i32) -> Option<&Arc<Peer>> {
        self.torrent.as_ref()?.peer(id)
    }

    pub fn num_peers(&self) -> usize {
        self.torrent.as_ref().map_or(0, Torrent::num_peers)
    }

    /// Discards any prior session and starts a new one with empty file slots.
    pub fn on_session_start(
        &mut self,
        num_files: usize,
        download_duration: f32,
        total_size: i32,
    ) -> Arc<TorrentInfo> {
        self.clear();
        let torrent = Torrent::new(num_files, download_duration, total_size);
        let info = Arc::clone(torrent.info());
        self.torrent = Some(torrent);

        info!(num_files, download_duration, total_size, "session started");
        self.notify(SwarmEvent::TorrentReceived(Arc::clone(&info)));
        info
    }

    pub fn on_file_declared(
        &mut self,
        file_num: i32,
        offset: i32,
        length: i32,
    ) -> Result<Arc<File>, ProtocolDesyncError> {
        let file = match self.torrent.as_mut() {
            Some(torrent) => torrent.declare_file(file_num, offset, length)?,
            None => {
                return Err(ProtocolDesyncError::UndeclaredFile {
                    file_num,
                    num_files: 0,
                });
            }
        };

        debug!(file_num, offset, length, "file declared");
        self.notify(SwarmEvent::FileReceived(Arc::clone(&file)));
        Ok(file)
    }

    pub fn on_chunk(&mut self, report: ChunkReport) -> Result<(), ProtocolDesyncError> {
        let file = self.file(report.file_num).cloned().ok_or(
            ProtocolDesyncError::ChunkFromUndeclaredFile {
                chunk_id: report.id,
                file_num: report.file_num,
            },
        )?;

        self.notify(SwarmEvent::ChunkReceived(Chunk::resolve(&report, file)));
        Ok(())
    }

    pub fn on_segment(&mut self, report: SegmentReport) -> Result<(), ProtocolDesyncError> {
        let chunk = &report.report;
        let file = self.file(chunk.file_num).cloned().ok_or(
            ProtocolDesyncError::SegmentFromUndeclaredFile {
                segment_id: chunk.id,
                file_num: chunk.file_num,
            },
        )?;

        self.notify(SwarmEvent::SegmentReceived(Segment::resolve(&report, file)));
        Ok(())
    }

    /// Installs or overwrites the peer at `id`.
    pub fn on_peer(&mut self, id: i32, address: String, bearing: f32, location: String) -> Arc<Peer> {
        let peer = match self.torrent.as_mut() {
            Some(torrent) => torrent.insert_peer(id, address, bearing, location),
            None => {
                warn!(peer_id = id, "peer arrived outside a session; not recorded");
                Arc::new(Peer::detached(id, address, bearing, location))
            }
        };

        info!(peer_id = id, address = %peer.address, location = %peer.location, "peer arrived");
        self.notify(SwarmEvent::PeerReceived(Arc::clone(&peer)));
        peer
    }

    /// Clears the session; the transport stays connected.
    pub fn on_session_reset(&mut self) {
        self.clear();
        info!("session reset");
        self.notify(SwarmEvent::SessionReset);
    }

    pub fn on_shutdown(&mut self) {
        info!("shutdown requested");
        self.notify(SwarmEvent::ShutdownRequested);
    }

    fn clear(&mut self) {
        self.torrent = None;
    }

    fn notify(&mut self, event: SwarmEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
    }
}
