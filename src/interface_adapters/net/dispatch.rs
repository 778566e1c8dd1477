use crate::domain::ProtocolDesyncError;
use crate::interface_adapters::protocol::InboundMessage;
use crate::use_cases::SessionRegistry;

use tokio::sync::mpsc;
use tracing::{debug, error};

/// Routes one decoded message into the registry.
pub fn apply_message(
    registry: &mut SessionRegistry,
    message: InboundMessage,
) -> Result<(), ProtocolDesyncError> {
    match message {
        InboundMessage::SessionStart {
            num_files,
            download_duration,
            total_size,
        } => {
            registry.on_session_start(num_files, download_duration, total_size);
        }
        InboundMessage::FileDeclared {
            file_num,
            offset,
            length,
        } => {
            registry.on_file_declared(file_num, offset, length)?;
        }
        InboundMessage::Chunk(report) => registry.on_chunk(report)?,
        InboundMessage::Segment(report) => registry.on_segment(report)?,
        InboundMessage::Peer {
            id,
            address,
            bearing,
            location,
        } => {
            registry.on_peer(id, address, bearing, location);
        }
        InboundMessage::Reset => registry.on_session_reset(),
        InboundMessage::Shutdown => registry.on_shutdown(),
    }
    Ok(())
}

/// Drains the message queue in arrival order; a desync ends the task.
pub async fn dispatch_task(
    mut registry: SessionRegistry,
    mut message_rx: mpsc::Receiver<InboundMessage>,
) -> Result<(), ProtocolDesyncError> {
    while let Some(message) = message_rx.recv().await {
        let address = message.address();
        if let Err(e) = apply_message(&mut registry, message) {
            error!(error = %e, address, "protocol desync");
            return Err(e);
        }
    }
    debug!("message queue closed; dispatcher exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkReport;

    fn chunk(file_num: i32) -> InboundMessage {
        InboundMessage::Chunk(ChunkReport {
            id: 1,
            torrent_position: 500,
            byte_size: 100,
            file_num,
            peer_id: 7,
            time: 0.0,
        })
    }

    #[test]
    fn when_messages_follow_session_order_then_registry_is_populated() {
        let mut registry = SessionRegistry::new();

        apply_message(
            &mut registry,
            InboundMessage::SessionStart {
                num_files: 3,
                download_duration: 10.0,
                total_size: 3000,
            },
        )
        .expect("session start");
        apply_message(
            &mut registry,
            InboundMessage::FileDeclared {
                file_num: 0,
                offset: 0,
                length: 1000,
            },
        )
        .expect("file 0");
        apply_message(&mut registry, chunk(0)).expect("chunk in file 0");

        assert!(registry.file(0).is_some());
        assert_eq!(
            apply_message(&mut registry, chunk(1)),
            Err(ProtocolDesyncError::ChunkFromUndeclaredFile {
                chunk_id: 1,
                file_num: 1
            })
        );
    }

    #[tokio::test]
    async fn when_desync_occurs_then_dispatch_task_returns_the_error() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(dispatch_task(SessionRegistry::new(), rx));

        tx.send(chunk(0)).await.expect("dispatcher running");

        let result = task.await.expect("task should not panic");
        assert!(matches!(
            result,
            Err(ProtocolDesyncError::ChunkFromUndeclaredFile { .. })
        ));
    }

    #[tokio::test]
    async fn when_queue_closes_then_dispatch_task_ends_cleanly() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(dispatch_task(SessionRegistry::new(), rx));

        tx.send(InboundMessage::Reset).await.expect("dispatcher running");
        drop(tx);

        assert_eq!(task.await.expect("task should not panic"), Ok(()));
    }
}
