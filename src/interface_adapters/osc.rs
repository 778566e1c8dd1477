// OSC 1.0 packet codec with int32 length-prefixed stream framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{fmt, io, str};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest packet accepted from the stream.
pub const MAX_PACKET_LEN: usize = 64 * 1024;

/// Bundles nested deeper than this are rejected.
pub const MAX_BUNDLE_DEPTH: usize = 8;

const BUNDLE_TAG: &[u8] = b"#bundle\0";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("string is missing its NUL terminator")]
    MissingTerminator,
    #[error("type tag string {0:?} does not start with ','")]
    BadTypeTags(String),
    #[error("unsupported argument type '{0}'")]
    UnsupportedTag(char),
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] str::Utf8Error),
    #[error("invalid packet length {0}")]
    InvalidLength(i64),
    #[error("bundles nested more than {0} deep")]
    BundleTooDeep(usize),
    #[error("stream read failed")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl OscArg {
    pub fn tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::Str(_) => 's',
        }
    }
}

impl From<i32> for OscArg {
    fn from(value: i32) -> Self {
        OscArg::Int(value)
    }
}

impl From<f32> for OscArg {
    fn from(value: f32) -> Self {
        OscArg::Float(value)
    }
}

impl From<String> for OscArg {
    fn from(value: String) -> Self {
        OscArg::Str(value)
    }
}

impl From<&str> for OscArg {
    fn from(value: &str) -> Self {
        OscArg::Str(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<OscArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Argument signature without the leading ',' (e.g. `"isfs"`).
    pub fn type_tags(&self) -> String {
        self.args.iter().map(OscArg::tag).collect()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        put_string(&mut buf, &self.address);
        put_string(&mut buf, &format!(",{}", self.type_tags()));
        for arg in &self.args {
            match arg {
                OscArg::Int(v) => buf.put_i32(*v),
                OscArg::Float(v) => buf.put_f32(*v),
                OscArg::Str(v) => put_string(&mut buf, v),
            }
        }
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, DecodeError> {
        let address = read_string(&mut buf)?;
        let tags = read_string(&mut buf)?;
        let Some(tags) = tags.strip_prefix(',') else {
            return Err(DecodeError::BadTypeTags(tags));
        };

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let arg = match tag {
                'i' => {
                    ensure(buf, 4)?;
                    OscArg::Int(buf.get_i32())
                }
                'f' => {
                    ensure(buf, 4)?;
                    OscArg::Float(buf.get_f32())
                }
                's' => OscArg::Str(read_string(&mut buf)?),
                other => return Err(DecodeError::UnsupportedTag(other)),
            };
            args.push(arg);
        }

        Ok(Self { address, args })
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ,{}", self.address, self.type_tags())
    }
}

/// Decodes a message or bundle; bundle elements are flattened in order and
/// time tags are ignored.
pub fn decode_packet(packet: &[u8]) -> Result<Vec<OscMessage>, DecodeError> {
    let mut messages = Vec::new();
    decode_into(packet, 0, &mut messages)?;
    Ok(messages)
}

fn decode_into(packet: &[u8], depth: usize, out: &mut Vec<OscMessage>) -> Result<(), DecodeError> {
    let Some(mut rest) = packet.strip_prefix(BUNDLE_TAG) else {
        out.push(OscMessage::decode(packet)?);
        return Ok(());
    };
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(DecodeError::BundleTooDeep(MAX_BUNDLE_DEPTH));
    }

    ensure(rest, 8)?;
    rest.advance(8);
    while rest.has_remaining() {
        ensure(rest, 4)?;
        let size = element_len(rest.get_i32())?;
        ensure(rest, size)?;
        decode_into(&rest[..size], depth + 1, out)?;
        rest.advance(size);
    }
    Ok(())
}

/// Prefixes the encoded message with its big-endian length.
///
/// Fails for packets a reader would refuse as longer than `MAX_PACKET_LEN`.
pub fn encode_frame(message: &OscMessage) -> io::Result<Bytes> {
    let body = message.encode();
    let len = i32::try_from(body.len())
        .ok()
        .filter(|_| body.len() <= MAX_PACKET_LEN)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("packet of {} bytes exceeds {MAX_PACKET_LEN}", body.len()),
            )
        })?;
    let mut buf = BytesMut::with_capacity(4 + body.len());
    buf.put_i32(len);
    buf.put(body);
    Ok(buf.freeze())
}

/// Reads one length-prefixed packet; `None` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Bytes>, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_i32().await {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let len = element_len(len)?;
    if len > MAX_PACKET_LEN {
        return Err(DecodeError::InvalidLength(len as i64));
    }

    let mut packet = vec![0; len];
    reader.read_exact(&mut packet).await?;
    Ok(Some(Bytes::from(packet)))
}

pub async fn write_message<W>(writer: &mut W, message: &OscMessage) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await
}

fn element_len(len: i32) -> Result<usize, DecodeError> {
    usize::try_from(len).map_err(|_| DecodeError::InvalidLength(i64::from(len)))
}

fn ensure(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

// NUL-terminated, zero-padded to a 4-byte boundary.
fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_slice(value.as_bytes());
    let padded = padded_len(value.len());
    buf.put_bytes(0, padded - value.len());
}

fn read_string(buf: &mut &[u8]) -> Result<String, DecodeError> {
    let end = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or(DecodeError::MissingTerminator)?;
    let value = str::from_utf8(&buf[..end])?.to_owned();
    let padded = padded_len(end);
    ensure(buf, padded)?;
    buf.advance(padded);
    Ok(value)
}

fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}
