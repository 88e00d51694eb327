// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The binder transaction frame, ported from `Mindroid.cpp`'s
//! connection reader/writer: an endless sequence of framed messages on
//! one socket, per spec §4.8/§6.
//!
//! ```text
//! int32 type | utf8 uri | int32 transactionId | int32 what |
//! int32 payload-size | payload bytes
//! ```
//!
//! The `uri` field has no width specified for its length prefix in the
//! distilled spec; this codec reuses the same 2-byte-length
//! modified-UTF-8 string convention as [`crate::parcel::Parcel`] for it,
//! for one consistent string encoding across the wire crate.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parcel::ParcelError;

/// A generous ceiling on a single frame's payload, supplementing the
/// original (which trusts the peer): without it a malicious or buggy
/// peer could claim an arbitrarily large `payload-size` and force an
/// unbounded allocation before any bytes are even read.
pub const MAX_PAYLOAD_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unknown frame type {0}")]
    InvalidFrameType(i32),
    #[error("frame payload of {0} bytes exceeds the {MAX_PAYLOAD_BYTES} byte limit")]
    PayloadTooLarge(u32),
    #[error(transparent)]
    Parcel(#[from] ParcelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Transaction = 1,
    Exception = 2,
}

impl TryFrom<i32> for FrameType {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameType::Transaction),
            2 => Ok(FrameType::Exception),
            other => Err(ProtocolError::InvalidFrameType(other)),
        }
    }
}

/// One framed message on a binder transaction connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub uri: String,
    pub transaction_id: i32,
    pub what: i32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn transaction(uri: impl Into<String>, transaction_id: i32, what: i32, payload: Vec<u8>) -> Self {
        Self { frame_type: FrameType::Transaction, uri: uri.into(), transaction_id, what, payload }
    }

    pub fn exception(uri: impl Into<String>, transaction_id: i32, what: i32, payload: Vec<u8>) -> Self {
        Self { frame_type: FrameType::Exception, uri: uri.into(), transaction_id, what, payload }
    }
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError> {
    if frame.payload.len() as u64 > MAX_PAYLOAD_BYTES as u64 {
        return Err(ProtocolError::PayloadTooLarge(frame.payload.len() as u32));
    }

    let uri_bytes = crate::parcel::encode_modified_utf8(&frame.uri);
    if uri_bytes.len() > u16::MAX as usize {
        return Err(ProtocolError::Parcel(ParcelError::StringTooLong(uri_bytes.len())));
    }

    writer.write_i32(frame.frame_type as i32).await?;
    writer.write_u16(uri_bytes.len() as u16).await?;
    writer.write_all(&uri_bytes).await?;
    writer.write_i32(frame.transaction_id).await?;
    writer.write_i32(frame.what).await?;
    writer.write_u32(frame.payload.len() as u32).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, ProtocolError> {
    let frame_type = FrameType::try_from(reader.read_i32().await?)?;

    let uri_len = reader.read_u16().await?;
    let mut uri_bytes = vec![0u8; uri_len as usize];
    reader.read_exact(&mut uri_bytes).await?;
    let uri = crate::parcel::decode_modified_utf8(&uri_bytes)?;

    let transaction_id = reader.read_i32().await?;
    let what = reader.read_i32().await?;

    let payload_len = reader.read_u32().await?;
    if payload_len > MAX_PAYLOAD_BYTES {
        return Err(ProtocolError::PayloadTooLarge(payload_len));
    }
    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;

    Ok(Frame { frame_type, uri, transaction_id, what, payload })
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
