// Domain-level errors raised when the event stream breaks causal ordering.

/// The telemetry stream referenced an entity the current session never declared.
///
/// These are fatal to the session: the stream is out of sync with the remote
/// server and there is no local way to recover the missing declarations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolDesyncError {
    #[error("file {file_num} is outside the {num_files} slots of the current session")]
    UndeclaredFile { file_num: i32, num_files: usize },

    #[error("chunk {chunk_id} references undeclared file {file_num}")]
    ChunkFromUndeclaredFile { chunk_id: i32, file_num: i32 },

    #[error("segment {segment_id} references undeclared file {file_num}")]
    SegmentFromUndeclaredFile { segment_id: i32, file_num: i32 },
}
