// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The primitive wire codec for RPC payloads, ported from
//! `mindroid/os/Parcel`: a single growable byte buffer that flips
//! between a writable output mode and a readable input mode.
//!
//! Strings use the modified-UTF-8 convention from `DataInput.readUTF`:
//! identical to standard UTF-8 except `NUL` is encoded as the two-byte
//! sequence `0xC0 0x80` so that no embedded byte is zero. Characters
//! outside the Basic Multilingual Plane are encoded with ordinary
//! 4-byte UTF-8 rather than the original's CESU-8 surrogate pairs — a
//! simplification recorded in `DESIGN.md`, since Mindroid's own
//! payloads (URIs, interface descriptors, bundle keys) never carry
//! supplementary-plane characters.

use thiserror::Error;

use mindroid_core::{Bundle, Uri, UriError};

#[derive(Debug, Error)]
pub enum ParcelError {
    #[error("parcel is in input mode; cannot write")]
    NotInOutputMode,
    #[error("parcel is in output mode; cannot read")]
    NotInInputMode,
    #[error("short read: needed {needed} bytes, {available} available")]
    ShortRead { needed: usize, available: usize },
    #[error("string of {0} encoded bytes exceeds the 65535 byte length prefix")]
    StringTooLong(usize),
    #[error("malformed modified-UTF-8 string")]
    InvalidString,
    #[error(transparent)]
    Uri(#[from] UriError),
    #[error(transparent)]
    Bundle(#[from] serde_json::Error),
}

enum Mode {
    Output(Vec<u8>),
    Input { bytes: Vec<u8>, pos: usize },
}

/// A bidirectional byte buffer with an input/output mode flip, per
/// spec §4.5. Output mode appends; input mode reads from a cursor.
pub struct Parcel {
    mode: Mode,
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}

impl Parcel {
    pub fn new() -> Self {
        Self { mode: Mode::Output(Vec::new()) }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { mode: Mode::Input { bytes, pos: 0 } }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.mode, Mode::Input { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self.mode, Mode::Output(_))
    }

    /// Flips to input mode, rewinding the read cursor to the start of
    /// whatever has been written so far.
    pub fn as_input(self) -> Self {
        match self.mode {
            Mode::Output(bytes) => Self { mode: Mode::Input { bytes, pos: 0 } },
            input => Self { mode: input },
        }
    }

    /// Flips back to output mode, discarding the read cursor; further
    /// writes append after whatever bytes are already in the buffer.
    pub fn as_output(self) -> Self {
        match self.mode {
            Mode::Input { bytes, .. } => Self { mode: Mode::Output(bytes) },
            output => Self { mode: output },
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self.mode {
            Mode::Output(bytes) | Mode::Input { bytes, .. } => bytes,
        }
    }

    /// Clones the underlying bytes without consuming the parcel.
    /// Needed wherever only a shared reference is available — a
    /// transport reply delivered through a [`mindroid_core::Promise`]
    /// is an `Arc<Parcel>`, never uniquely owned.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.mode {
            Mode::Output(bytes) | Mode::Input { bytes, .. } => bytes.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.mode {
            Mode::Output(bytes) => bytes.len(),
            Mode::Input { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn output_buf(&mut self) -> Result<&mut Vec<u8>, ParcelError> {
        match &mut self.mode {
            Mode::Output(bytes) => Ok(bytes),
            Mode::Input { .. } => Err(ParcelError::NotInOutputMode),
        }
    }

    fn take(&mut self, len: usize) -> Result<&[u8], ParcelError> {
        match &mut self.mode {
            Mode::Input { bytes, pos } => {
                if *pos + len > bytes.len() {
                    return Err(ParcelError::ShortRead { needed: len, available: bytes.len() - *pos });
                }
                let slice = &bytes[*pos..*pos + len];
                *pos += len;
                Ok(slice)
            }
            Mode::Output(_) => Err(ParcelError::NotInInputMode),
        }
    }

    // ---- primitives, big-endian, type-tagged by position ----

    pub fn write_bool(&mut self, value: bool) -> Result<(), ParcelError> {
        self.output_buf()?.push(value as u8);
        Ok(())
    }

    pub fn read_bool(&mut self) -> Result<bool, ParcelError> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), ParcelError> {
        self.output_buf()?.push(value);
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, ParcelError> {
        Ok(self.take(1)?[0])
    }

    pub fn write_char(&mut self, value: u16) -> Result<(), ParcelError> {
        self.output_buf()?.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_char(&mut self) -> Result<u16, ParcelError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn write_short(&mut self, value: i16) -> Result<(), ParcelError> {
        self.output_buf()?.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_short(&mut self) -> Result<i16, ParcelError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn write_int(&mut self, value: i32) -> Result<(), ParcelError> {
        self.output_buf()?.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_int(&mut self) -> Result<i32, ParcelError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn write_long(&mut self, value: i64) -> Result<(), ParcelError> {
        self.output_buf()?.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_long(&mut self) -> Result<i64, ParcelError> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    pub fn write_float(&mut self, value: f32) -> Result<(), ParcelError> {
        self.write_int(value.to_bits() as i32)
    }

    pub fn read_float(&mut self) -> Result<f32, ParcelError> {
        Ok(f32::from_bits(self.read_int()? as u32))
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), ParcelError> {
        self.write_long(value.to_bits() as i64)
    }

    pub fn read_double(&mut self) -> Result<f64, ParcelError> {
        Ok(f64::from_bits(self.read_long()? as u64))
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), ParcelError> {
        let bytes = encode_modified_utf8(value);
        if bytes.len() > u16::MAX as usize {
            return Err(ParcelError::StringTooLong(bytes.len()));
        }
        self.output_buf()?.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        self.output_buf()?.extend_from_slice(&bytes);
        Ok(())
    }

    pub fn read_string(&mut self) -> Result<String, ParcelError> {
        let len_bytes = self.take(2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let bytes = self.take(len)?.to_vec();
        decode_modified_utf8(&bytes)
    }

    /// Raw bytes: no length prefix. The caller frames the length
    /// externally, matching the original's `writeByteArray` contract.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), ParcelError> {
        self.output_buf()?.extend_from_slice(data);
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, ParcelError> {
        Ok(self.take(len)?.to_vec())
    }

    /// A binder reference is serialized as its URI string:
    /// `scheme://<authority>/if=<interface-descriptor>`.
    pub fn write_binder_uri(&mut self, uri: &Uri) -> Result<(), ParcelError> {
        self.write_string(&uri.to_string())
    }

    pub fn read_binder_uri(&mut self) -> Result<Uri, ParcelError> {
        let s = self.read_string()?;
        Ok(Uri::parse(&s)?)
    }

    /// The optional untyped-extras side channel, length-prefixed JSON.
    pub fn write_bundle(&mut self, bundle: &Bundle) -> Result<(), ParcelError> {
        let json = serde_json::to_vec(bundle)?;
        self.write_int(json.len() as i32)?;
        self.output_buf()?.extend_from_slice(&json);
        Ok(())
    }

    pub fn read_bundle(&mut self) -> Result<Bundle, ParcelError> {
        let len = self.read_int()?.max(0) as usize;
        let bytes = self.take(len)?.to_vec();
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub(crate) fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '\0' {
            buf.extend_from_slice(&[0xC0, 0x80]);
        } else {
            let mut tmp = [0u8; 4];
            buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
        }
    }
    buf
}

pub(crate) fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ParcelError> {
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0xC0 && bytes.get(i + 1) == Some(&0x80) {
            decoded.push(0u8);
            i += 2;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| ParcelError::InvalidString)
}

#[cfg(test)]
#[path = "parcel_tests.rs"]
mod tests;
