// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inbound half of the `mindroid` TCP transport, ported from
//! `Mindroid.cpp`'s `Server`/`Connection`/`Reader`: one listen socket,
//! one reader task per accepted connection, dispatching each inbound
//! transaction frame to the local [`Runtime`] and queuing the reply
//! frame onto that connection's [`Writer`] once the Binder's reply
//! Promise completes. Unlike the original's blocking reader thread,
//! the reply is registered as a dependent Promise action rather than
//! awaited inline, so one connection's in-flight transactions never
//! serialize behind each other.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mindroid_core::Uri;
use mindroid_runtime::{Resolved, Runtime};
use mindroid_wire::{read_frame, Frame, Parcel};

use crate::connection::{spawn_writer, Writer};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid server uri {0:?}")]
    InvalidUri(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A running listen server. [`Server::shutdown`] cancels the accept
/// loop and every spawned connection's reader/writer pair.
pub(crate) struct Server {
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
    local_addr: std::net::SocketAddr,
}

impl Server {
    pub(crate) async fn bind(server_uri: &str, runtime: Arc<Runtime>) -> Result<Self, ServerError> {
        let addr = parse_tcp_authority(server_uri)?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(listener, runtime, cancel.clone()));
        Ok(Self { cancel, accept_task, local_addr })
    }

    /// The socket's actual bound address, useful when `server_uri` asks
    /// for an ephemeral port (`:0`) — tests in particular need this to
    /// discover the port a client should dial.
    pub(crate) fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.accept_task.await;
    }
}

async fn accept_loop(listener: TcpListener, runtime: Arc<Runtime>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((socket, addr)) => {
                        tracing::debug!(%addr, "mindroid-plugin-tcp accepted connection");
                        let runtime = runtime.clone();
                        let conn_cancel = cancel.child_token();
                        tokio::spawn(handle_connection(socket, runtime, conn_cancel));
                    }
                    Err(error) => tracing::warn!(%error, "mindroid-plugin-tcp accept failed"),
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

async fn handle_connection(socket: TcpStream, runtime: Arc<Runtime>, cancel: CancellationToken) {
    let (mut reader, write_half) = socket.into_split();
    let writer = spawn_writer(write_half, cancel.clone());

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame,
            _ = cancel.cancelled() => break,
        };
        match frame {
            Ok(frame) => handle_frame(frame, &runtime, &writer),
            Err(error) => {
                tracing::debug!(%error, "mindroid-plugin-tcp connection closed");
                break;
            }
        }
    }
    cancel.cancel();
}

/// Resolves one inbound frame to a local Binder and dispatches the
/// transaction, queuing a TRANSACTION or EXCEPTION reply frame once the
/// Binder's reply Promise settles.
fn handle_frame(frame: Frame, runtime: &Arc<Runtime>, writer: &Writer) {
    let Frame { uri: uri_str, transaction_id, what, payload, .. } = frame;

    let uri = match Uri::parse(&uri_str) {
        Ok(uri) => uri,
        Err(error) => {
            writer.send(Frame::exception(uri_str, transaction_id, what, error.to_string().into_bytes()));
            return;
        }
    };

    let binder = match runtime.resolve(&uri) {
        Ok(Resolved::Local(binder)) => binder,
        Ok(Resolved::Remote(_)) => {
            writer.send(Frame::exception(
                uri.to_string(),
                transaction_id,
                what,
                b"uri does not resolve to a local binder".to_vec(),
            ));
            return;
        }
        Err(error) => {
            writer.send(Frame::exception(uri.to_string(), transaction_id, what, error.to_string().into_bytes()));
            return;
        }
    };

    let reply = match binder.transact(what, Parcel::from_bytes(payload), true) {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(error) => {
            writer.send(Frame::exception(uri.to_string(), transaction_id, what, error.to_string().into_bytes()));
            return;
        }
    };

    let reply_uri = uri.to_string();
    let writer = writer.clone();
    reply.then_apply_both(move |value, exception| {
        let frame = match (value, exception) {
            (Some(obj), _) => match obj.downcast::<Parcel>() {
                Ok(parcel) => Frame::transaction(reply_uri, transaction_id, what, parcel.to_bytes()),
                Err(_) => Frame::exception(reply_uri, transaction_id, what, b"reply was not a Parcel".to_vec()),
            },
            (None, Some(exception)) => Frame::exception(reply_uri, transaction_id, what, exception.to_string().into_bytes()),
            (None, None) => Frame::exception(
                reply_uri,
                transaction_id,
                what,
                b"binder transaction produced neither a value nor an exception".to_vec(),
            ),
        };
        writer.send(frame);
    });
}

/// Parses the `tcp://host:port` form used by [`mindroid_runtime::PluginConfig::server_uri`].
fn parse_tcp_authority(server_uri: &str) -> Result<std::net::SocketAddr, ServerError> {
    let authority = server_uri.strip_prefix("tcp://").unwrap_or(server_uri);
    authority.parse().map_err(|_| ServerError::InvalidUri(server_uri.to_string()))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
