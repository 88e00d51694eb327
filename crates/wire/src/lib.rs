// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire encoding for Mindroid: the [`parcel`] primitive codec used to
//! marshal transaction arguments/replies, and the [`frame`] transport
//! envelope that carries a Parcel's bytes between nodes.

pub mod frame;
pub mod parcel;

pub use frame::{read_frame, write_frame, Frame, FrameType, ProtocolError, MAX_PAYLOAD_BYTES};
pub use parcel::{Parcel, ParcelError};
