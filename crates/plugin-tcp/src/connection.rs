// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared per-socket writer plumbing, common to the server's
//! per-connection handling ([`crate::server`]) and the client's
//! per-node connection ([`crate::client`]): a background task draining
//! an unbounded `Frame` channel in order, paired with a
//! [`CancellationToken`] that ties the writer's lifetime to its
//! connection's reader. This is the async-idiomatic replacement for
//! the original's `Thread`/`ReentrantLock`/`Condition` writer queue
//! (`Mindroid.cpp`'s `Connection::Writer::run`).

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mindroid_wire::{write_frame, Frame};

/// A handle to a running writer task. Cloning and sending from many
/// places is safe and preserves per-sender order relative to itself;
/// frames from different senders interleave in send order.
#[derive(Clone)]
pub(crate) struct Writer {
    tx: mpsc::UnboundedSender<Frame>,
}

impl Writer {
    /// Queues `frame` for writing. Silently dropped if the writer task
    /// has already exited (the connection is being torn down).
    pub(crate) fn send(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }
}

/// Spawns the writer task over `socket` and returns a handle to feed
/// it. The task exits when every [`Writer`] clone is dropped (the
/// channel closes) or `cancel` fires, whichever happens first; a write
/// failure also fires `cancel` so a dead socket doesn't leave the
/// paired reader blocked forever.
pub(crate) fn spawn_writer<W>(mut socket: W, cancel: CancellationToken) -> Writer
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = rx.recv() => frame,
                _ = cancel.cancelled() => None,
            };
            let Some(frame) = frame else { break };
            if let Err(error) = write_frame(&mut socket, &frame).await {
                tracing::warn!(%error, "mindroid-plugin-tcp write failed, closing connection");
                cancel.cancel();
                break;
            }
        }
    });
    Writer { tx }
}
