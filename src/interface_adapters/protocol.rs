// Typed telemetry messages and their OSC address/signature mapping.

use crate::domain::{ChunkReport, SegmentReport};
use crate::interface_adapters::osc::{OscArg, OscMessage};
use thiserror::Error;

pub const TORRENT: &str = "/torrent";
pub const FILE: &str = "/file";
pub const CHUNK: &str = "/chunk";
pub const SEGMENT: &str = "/segment";
pub const PEER: &str = "/peer";
pub const RESET: &str = "/reset";
pub const SHUTDOWN: &str = "/shutdown";
pub const REGISTER: &str = "/register";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("unknown address {0}")]
    UnknownAddress(String),
    #[error("{address} expects ,{expected} but got ,{actual}")]
    SignatureMismatch {
        address: String,
        expected: &'static str,
        actual: String,
    },
    #[error("{address} carries a negative count {value}")]
    NegativeCount { address: String, value: i32 },
}

/// Messages the telemetry server pushes to the listener.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    SessionStart {
        num_files: usize,
        download_duration: f32,
        total_size: i32,
    },
    FileDeclared {
        file_num: i32,
        offset: i32,
        length: i32,
    },
    Chunk(ChunkReport),
    Segment(SegmentReport),
    Peer {
        id: i32,
        address: String,
        bearing: f32,
        location: String,
    },
    Reset,
    Shutdown,
}

impl InboundMessage {
    pub fn address(&self) -> &'static str {
        match self {
            InboundMessage::SessionStart { .. } => TORRENT,
            InboundMessage::FileDeclared { .. } => FILE,
            InboundMessage::Chunk(_) => CHUNK,
            InboundMessage::Segment(_) => SEGMENT,
            InboundMessage::Peer { .. } => PEER,
            InboundMessage::Reset => RESET,
            InboundMessage::Shutdown => SHUTDOWN,
        }
    }
}

fn signature(address: &str) -> Option<&'static str> {
    match address {
        TORRENT => Some("ifi"),
        FILE => Some("iii"),
        CHUNK => Some("iiiiif"),
        SEGMENT => Some("iiiiiff"),
        PEER => Some("isfs"),
        RESET | SHUTDOWN => Some(""),
        _ => None,
    }
}

impl TryFrom<OscMessage> for InboundMessage {
    type Error = MessageError;

    fn try_from(message: OscMessage) -> Result<Self, Self::Error> {
        use OscArg::{Float, Int, Str};

        let Some(expected) = signature(&message.address) else {
            return Err(MessageError::UnknownAddress(message.address));
        };

        let parsed = match (message.address.as_str(), message.args.as_slice()) {
            (TORRENT, &[Int(num_files), Float(download_duration), Int(total_size)]) => {
                let num_files = usize::try_from(num_files).map_err(|_| {
                    MessageError::NegativeCount {
                        address: TORRENT.to_owned(),
                        value: num_files,
                    }
                })?;
                Some(InboundMessage::SessionStart {
                    num_files,
                    download_duration,
                    total_size,
                })
            }
            (FILE, &[Int(file_num), Int(offset), Int(length)]) => {
                Some(InboundMessage::FileDeclared {
                    file_num,
                    offset,
                    length,
                })
            }
            (
                CHUNK,
                &[Int(id), Int(torrent_position), Int(byte_size), Int(file_num), Int(peer_id), Float(time)],
            ) => Some(InboundMessage::Chunk(ChunkReport {
                id,
                torrent_position,
                byte_size,
                file_num,
                peer_id,
                time,
            })),
            (
                SEGMENT,
                &[
                    Int(id),
                    Int(torrent_position),
                    Int(byte_size),
                    Int(file_num),
                    Int(peer_id),
                    Float(time),
                    Float(duration),
                ],
            ) => Some(InboundMessage::Segment(SegmentReport {
                report: ChunkReport {
                    id,
                    torrent_position,
                    byte_size,
                    file_num,
                    peer_id,
                    time,
                },
                duration,
            })),
            (PEER, [Int(id), Str(address), Float(bearing), Str(location)]) => {
                Some(InboundMessage::Peer {
                    id: *id,
                    address: address.clone(),
                    bearing: *bearing,
                    location: location.clone(),
                })
            }
            (RESET, []) => Some(InboundMessage::Reset),
            (SHUTDOWN, []) => Some(InboundMessage::Shutdown),
            _ => None,
        };

        parsed.ok_or_else(|| MessageError::SignatureMismatch {
            actual: message.type_tags(),
            address: message.address,
            expected,
        })
    }
}

impl From<&InboundMessage> for OscMessage {
    fn from(message: &InboundMessage) -> Self {
        let osc = OscMessage::new(message.address());
        match message {
            InboundMessage::SessionStart {
                num_files,
                download_duration,
                total_size,
            } => osc
                .with_arg(i32::try_from(*num_files).unwrap_or(i32::MAX))
                .with_arg(*download_duration)
                .with_arg(*total_size),
            InboundMessage::FileDeclared {
                file_num,
                offset,
                length,
            } => osc.with_arg(*file_num).with_arg(*offset).with_arg(*length),
            InboundMessage::Chunk(report) => with_chunk_args(osc, report),
            InboundMessage::Segment(segment) => {
                with_chunk_args(osc, &segment.report).with_arg(segment.duration)
            }
            InboundMessage::Peer {
                id,
                address,
                bearing,
                location,
            } => osc
                .with_arg(*id)
                .with_arg(address.as_str())
                .with_arg(*bearing)
                .with_arg(location.as_str()),
            InboundMessage::Reset | InboundMessage::Shutdown => osc,
        }
    }
}

fn with_chunk_args(osc: OscMessage, report: &ChunkReport) -> OscMessage {
    osc.with_arg(report.id)
        .with_arg(report.torrent_position)
        .with_arg(report.byte_size)
        .with_arg(report.file_num)
        .with_arg(report.peer_id)
        .with_arg(report.time)
}

/// Handshake announcing the port the listener accepts telemetry on.
pub fn register_message(listener_port: u16) -> OscMessage {
    OscMessage::new(REGISTER).with_arg(i32::from(listener_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_chunk_message_matches_signature_then_report_is_built() {
        let osc = OscMessage::new(CHUNK)
            .with_arg(1)
            .with_arg(500)
            .with_arg(100)
            .with_arg(0)
            .with_arg(7)
            .with_arg(0.0f32);

        let message = InboundMessage::try_from(osc).expect("valid chunk");

        assert_eq!(
            message,
            InboundMessage::Chunk(ChunkReport {
                id: 1,
                torrent_position: 500,
                byte_size: 100,
                file_num: 0,
                peer_id: 7,
                time: 0.0,
            })
        );
    }

    #[test]
    fn when_peer_message_arrives_then_strings_are_kept() {
        let osc = OscMessage::new(PEER)
            .with_arg(2)
            .with_arg("192.168.1.2")
            .with_arg(0.75f32)
            .with_arg("Lisbon");

        let message = InboundMessage::try_from(osc).expect("valid peer");

        assert_eq!(
            message,
            InboundMessage::Peer {
                id: 2,
                address: "192.168.1.2".into(),
                bearing: 0.75,
                location: "Lisbon".into(),
            }
        );
    }

    #[test]
    fn when_signature_differs_then_returns_mismatch() {
        let osc = OscMessage::new(TORRENT).with_arg(3).with_arg(10).with_arg(3000);

        let result = InboundMessage::try_from(osc);

        assert_eq!(
            result,
            Err(MessageError::SignatureMismatch {
                address: TORRENT.into(),
                expected: "ifi",
                actual: "iii".into(),
            })
        );
    }

    #[test]
    fn when_address_is_unknown_then_returns_unknown_address() {
        let result = InboundMessage::try_from(OscMessage::new("/ping"));

        assert_eq!(result, Err(MessageError::UnknownAddress("/ping".into())));
    }

    #[test]
    fn when_file_count_is_negative_then_returns_negative_count() {
        let osc = OscMessage::new(TORRENT)
            .with_arg(-1)
            .with_arg(1.0f32)
            .with_arg(10);

        assert!(matches!(
            InboundMessage::try_from(osc),
            Err(MessageError::NegativeCount { value: -1, .. })
        ));
    }

    #[test]
    fn when_segment_is_converted_to_osc_then_it_parses_back() {
        let message = InboundMessage::Segment(SegmentReport {
            report: ChunkReport {
                id: 9,
                torrent_position: 10,
                byte_size: 20,
                file_num: 1,
                peer_id: 4,
                time: 1.5,
            },
            duration: 0.25,
        });

        let osc = OscMessage::from(&message);

        assert_eq!(osc.type_tags(), "iiiiiff");
        assert_eq!(InboundMessage::try_from(osc), Ok(message));
    }

    #[test]
    fn when_register_message_is_built_then_it_carries_the_port() {
        let osc = register_message(12110);

        assert_eq!(osc.address, REGISTER);
        assert_eq!(osc.args, vec![OscArg::Int(12110)]);
    }
}
