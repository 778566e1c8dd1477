use super::ConnectionError;
use crate::interface_adapters::osc::{self, OscMessage};
use crate::interface_adapters::protocol::register_message;

use std::io;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Outbound OSC connection to the telemetry server.
#[derive(Debug)]
pub struct OscClient {
    stream: TcpStream,
    addr: String,
}

impl OscClient {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ConnectionError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::Connect {
                addr: addr.clone(),
                source,
            })?;
        debug!(%addr, "connected to telemetry server");
        Ok(Self { stream, addr })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn send(&mut self, message: &OscMessage) -> io::Result<()> {
        osc::write_message(&mut self.stream, message).await
    }

    /// Announces the port our listener accepts telemetry on.
    pub async fn register(&mut self, listener_port: u16) -> Result<(), ConnectionError> {
        self.send(&register_message(listener_port))
            .await
            .map_err(|source| ConnectionError::Handshake {
                addr: self.addr.clone(),
                source,
            })?;
        info!(addr = %self.addr, listener_port, "registration sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::osc::{OscArg, decode_packet, read_frame};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn when_registering_then_server_receives_listener_port() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = server.local_addr().expect("local addr").port();

        let mut client = OscClient::connect("127.0.0.1", port)
            .await
            .expect("connect");
        let (mut accepted, _) = server.accept().await.expect("accept");
        client.register(12110).await.expect("register");

        let frame = read_frame(&mut accepted)
            .await
            .expect("read")
            .expect("frame");
        let messages = decode_packet(&frame).expect("decode");
        assert_eq!(messages[0].address, "/register");
        assert_eq!(messages[0].args, vec![OscArg::Int(12110)]);
    }

    #[tokio::test]
    async fn when_nothing_listens_then_connect_fails() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = server.local_addr().expect("local addr").port();
        drop(server);

        let result = OscClient::connect("127.0.0.1", port).await;

        assert!(matches!(result, Err(ConnectionError::Connect { .. })));
    }
}
