use super::ConnectionError;
use crate::interface_adapters::osc::{self, DecodeError};
use crate::interface_adapters::protocol::InboundMessage;

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

pub async fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ConnectionError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ConnectionError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!(%addr, "listener bound");
    Ok(listener)
}

/// Accepts telemetry connections until the message queue closes.
pub async fn accept_loop(listener: TcpListener, message_tx: mpsc::Sender<InboundMessage>) {
    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            },
            _ = message_tx.closed() => {
                debug!("message queue closed; listener exiting");
                return;
            }
        };

        let span = info_span!("conn", %peer_addr);
        tokio::spawn(read_connection(stream, message_tx.clone()).instrument(span));
    }
}

async fn read_connection(mut stream: TcpStream, message_tx: mpsc::Sender<InboundMessage>) {
    info!("telemetry connection opened");

    loop {
        let packet = match osc::read_frame(&mut stream).await {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                info!("telemetry connection closed");
                return;
            }
            Err(DecodeError::Io(e)) => {
                warn!(error = %e, "telemetry connection failed");
                return;
            }
            Err(e) => {
                // Framing is lost once the length prefix is unusable.
                warn!(error = %e, "unreadable frame; dropping connection");
                return;
            }
        };

        let messages = match osc::decode_packet(&packet) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, len = packet.len(), "malformed packet skipped");
                continue;
            }
        };

        for message in messages {
            let summary = message.to_string();
            let inbound = match InboundMessage::try_from(message) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(error = %e, message = %summary, "unrecognized message skipped");
                    continue;
                }
            };
            if message_tx.send(inbound).await.is_err() {
                debug!("dispatcher gone; closing connection");
                return;
            }
        }
    }
}
