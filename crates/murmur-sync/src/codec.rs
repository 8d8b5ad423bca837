//! Message encoding and stream framing.
//!
//! A [`Codec`] turns a [`GossipMessage`] into bytes and back. Framing is
//! independent of the codec: every message travels as a 4-byte big-endian
//! length followed by the encoded body.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SyncError};
use crate::messages::{limits, GossipMessage};

/// Serialization capability for gossip messages.
pub trait Codec: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Encode a message body.
    fn encode(&self, message: &GossipMessage) -> Result<Bytes>;

    /// Decode a message body.
    fn decode(&self, bytes: &[u8]) -> Result<GossipMessage>;
}

/// CBOR encoding via ciborium. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn name(&self) -> &'static str {
        "cbor"
    }

    fn encode(&self, message: &GossipMessage) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(message, &mut buf)
            .map_err(|e| SyncError::Codec(format!("CBOR encode failed: {e}")))?;
        Ok(Bytes::from(buf))
    }

    fn decode(&self, bytes: &[u8]) -> Result<GossipMessage> {
        ciborium::from_reader(bytes)
            .map_err(|e| SyncError::Codec(format!("CBOR decode failed: {e}")))
    }
}

/// JSON encoding via serde_json. Handy when inspecting traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, message: &GossipMessage) -> Result<Bytes> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| SyncError::Codec(format!("JSON encode failed: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<GossipMessage> {
        serde_json::from_slice(bytes)
            .map_err(|e| SyncError::Codec(format!("JSON decode failed: {e}")))
    }
}

/// Which codec a node speaks. Both ends of a connection must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Cbor,
    Json,
}

impl CodecKind {
    /// Instantiate the codec.
    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            CodecKind::Cbor => Arc::new(CborCodec),
            CodecKind::Json => Arc::new(JsonCodec),
        }
    }
}

/// Encode `message` and write it as one length-prefixed frame, then flush.
pub async fn write_frame<W>(
    writer: &mut W,
    codec: &dyn Codec,
    message: &GossipMessage,
    max_frame_bytes: usize,
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let body = codec.encode(message)?;
    if body.len() > max_frame_bytes {
        return Err(SyncError::FrameTooLarge {
            len: body.len(),
            max: max_frame_bytes,
        });
    }
    let len = u32::try_from(body.len()).map_err(|_| SyncError::FrameTooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = BytesMut::with_capacity(limits::FRAME_HEADER_BYTES + body.len());
    frame.put_u32(len);
    frame.put_slice(&body);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and decode it.
///
/// Returns `Ok(None)` if the stream ended before a new frame started.
pub async fn read_frame<R>(
    reader: &mut R,
    codec: &dyn Codec,
    max_frame_bytes: usize,
) -> Result<Option<GossipMessage>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > max_frame_bytes {
        return Err(SyncError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    codec.decode(&body).map(Some)
}
