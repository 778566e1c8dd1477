// Network adapters: inbound telemetry listener, outbound registration client,
// and the dispatcher feeding decoded messages into the session registry.

pub mod client;
pub mod dispatch;
pub mod listener;

pub use client::OscClient;
pub use dispatch::{apply_message, dispatch_task};
pub use listener::{accept_loop, bind_listener};

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("registration handshake with {addr} failed")]
    Handshake {
        addr: String,
        #[source]
        source: io::Error,
    },
}
