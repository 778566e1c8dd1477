// Value entities describing a monitored file-distribution session.

use super::errors::ProtocolDesyncError;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Session header announced by a session-start event.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentInfo {
    pub num_files: usize,
    /// Seconds the remote download took, as reported by the server.
    pub download_duration: f32,
    pub total_size: i32,
}

/// One session: its header, the file slots and the peers seen so far.
///
/// File slots are bounded by `num_files` but only stored once declared.
#[derive(Debug)]
pub struct Torrent {
    info: Arc<TorrentInfo>,
    files: BTreeMap<usize, Arc<File>>,
    peers: BTreeMap<i32, Arc<Peer>>,
}

impl Torrent {
    pub fn new(num_files: usize, download_duration: f32, total_size: i32) -> Self {
        Self {
            info: Arc::new(TorrentInfo {
                num_files,
                download_duration,
                total_size,
            }),
            files: BTreeMap::new(),
            peers: BTreeMap::new(),
        }
    }

    pub fn info(&self) -> &Arc<TorrentInfo> {
        &self.info
    }

    pub fn num_files(&self) -> usize {
        self.info.num_files
    }

    /// Declared files in slot order.
    pub fn files(&self) -> impl Iterator<Item = &Arc<File>> {
        self.files.values()
    }

    /// Returns the declared file in slot `file_num`, if any.
    pub fn file(&self, file_num: i32) -> Option<&Arc<File>> {
        let slot = usize::try_from(file_num).ok()?;
        self.files.get(&slot)
    }

    /// Installs a file into its slot, replacing any earlier declaration.
    pub fn declare_file(
        &mut self,
        file_num: i32,
        offset: i32,
        length: i32,
    ) -> Result<Arc<File>, ProtocolDesyncError> {
        let num_files = self.info.num_files;
        let slot = usize::try_from(file_num)
            .ok()
            .filter(|slot| *slot < num_files)
            .ok_or(ProtocolDesyncError::UndeclaredFile {
                file_num,
                num_files,
            })?;

        let file = Arc::new(File {
            file_num,
            offset,
            length,
            torrent: Arc::downgrade(&self.info),
        });
        self.files.insert(slot, Arc::clone(&file));
        Ok(file)
    }

    /// Installs or overwrites the peer at `id`.
    pub fn insert_peer(
        &mut self,
        id: i32,
        address: String,
        bearing: f32,
        location: String,
    ) -> Arc<Peer> {
        let peer = Arc::new(Peer {
            id,
            address,
            bearing,
            location,
            torrent: Arc::downgrade(&self.info),
        });
        self.peers.insert(id, Arc::clone(&peer));
        peer
    }

    pub fn peer(&self, id: i32) -> Option<&Arc<Peer>> {
        self.peers.get(&id)
    }

    pub fn peers(&self) -> impl Iterator<Item = &Arc<Peer>> {
        self.peers.values()
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }
}

#[derive(Debug, Clone)]
pub struct File {
    pub file_num: i32,
    /// Byte offset of the file inside the torrent.
    pub offset: i32,
    pub length: i32,
    torrent: Weak<TorrentInfo>,
}

impl File {
    /// Session this file was declared in; `None` once that session is gone.
    pub fn torrent(&self) -> Option<Arc<TorrentInfo>> {
        self.torrent.upgrade()
    }
}

#[derive(Debug, Clone)]
pub struct Peer {
    pub id: i32,
    pub address: String,
    /// Direction of the peer as a fraction of a full turn.
    pub bearing: f32,
    pub location: String,
    torrent: Weak<TorrentInfo>,
}

impl Peer {
    /// Builds a peer that is not attached to any session.
    pub fn detached(id: i32, address: String, bearing: f32, location: String) -> Self {
        Self {
            id,
            address,
            bearing,
            location,
            torrent: Weak::new(),
        }
    }

    pub fn torrent(&self) -> Option<Arc<TorrentInfo>> {
        self.torrent.upgrade()
    }
}

/// Raw chunk arrival as reported on the wire, before file resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkReport {
    pub id: i32,
    /// Torrent-absolute byte position of the chunk.
    pub torrent_position: i32,
    pub byte_size: i32,
    pub file_num: i32,
    pub peer_id: i32,
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentReport {
    pub report: ChunkReport,
    pub duration: f32,
}

/// A chunk resolved against its file; `begin`/`end` are file-relative.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: i32,
    pub begin: i64,
    pub end: i64,
    pub byte_size: i64,
    pub file_num: i32,
    pub file: Arc<File>,
    pub peer_id: i32,
    pub time: f32,
}

impl Chunk {
    pub fn resolve(report: &ChunkReport, file: Arc<File>) -> Self {
        let begin = i64::from(report.torrent_position) - i64::from(file.offset);
        let end = begin + i64::from(report.byte_size);
        Self {
            id: report.id,
            begin,
            end,
            byte_size: end - begin,
            file_num: file.file_num,
            file,
            peer_id: report.peer_id,
            time: report.time,
        }
    }

    /// Torrent-absolute position of the chunk's first byte.
    pub fn torrent_begin(&self) -> i64 {
        self.begin + i64::from(self.file.offset)
    }

    /// Torrent-absolute position of the chunk's midpoint.
    pub fn torrent_midpoint(&self) -> f64 {
        0.5 * (self.begin + self.end) as f64 + f64::from(self.file.offset)
    }
}

/// A chunk that also carries a playback duration.
#[derive(Debug, Clone)]
pub struct Segment {
    pub chunk: Chunk,
    pub duration: f32,
}

impl Segment {
    pub fn resolve(report: &SegmentReport, file: Arc<File>) -> Self {
        Self {
            chunk: Chunk::resolve(&report.report, file),
            duration: report.duration,
        }
    }
}

impl Deref for Segment {
    type Target = Chunk;

    fn deref(&self) -> &Chunk {
        &self.chunk
    }
}
