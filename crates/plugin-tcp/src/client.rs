// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outbound half of the `mindroid` TCP transport, ported from
//! `Mindroid.cpp`'s `Client`/`Connection`: one lazily-connected TCP
//! socket per remote node, a monotonic transaction id, and an
//! outstanding-reply table keyed by that id. Any transport failure —
//! connect failure, write failure, or peer disconnect — fails every
//! outstanding transaction on this client with a `RemoteException`,
//! matching `Client::shutdown`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use mindroid_core::ids::NodeId;
use mindroid_core::{Exception, Promise};
use mindroid_runtime::{Runtime, MINDROID_SCHEME};
use mindroid_wire::{read_frame, Frame, FrameType, Parcel};

use crate::connection::{spawn_writer, Writer};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("node {0} has no configured mindroid server address")]
    NoAddress(u32),
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct Connected {
    writer: Writer,
    cancel: CancellationToken,
}

/// A remote node's lazily-connected client connection, shared by every
/// [`mindroid_runtime::Proxy`] pointing at that node. `connected` is
/// cleared (not just torn down) whenever the socket dies, so the next
/// `transact` after a server restart opens a fresh connection instead
/// of queuing onto a dead writer forever.
pub(crate) struct Client {
    node_id: NodeId,
    connected: AsyncMutex<Option<Connected>>,
    next_tx_id: AtomicI32,
    transactions: Mutex<HashMap<i32, Promise<Arc<Parcel>>>>,
    proxy_refs: AtomicUsize,
}

impl Client {
    pub(crate) fn new(node_id: NodeId) -> Arc<Self> {
        Arc::new(Self {
            node_id,
            connected: AsyncMutex::new(None),
            next_tx_id: AtomicI32::new(1),
            transactions: Mutex::new(HashMap::new()),
            proxy_refs: AtomicUsize::new(0),
        })
    }

    pub(crate) fn note_proxy_attached(&self) {
        self.proxy_refs.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns `true` once the proxy that just detached was the last one.
    pub(crate) fn note_proxy_detached(&self) -> bool {
        self.proxy_refs.fetch_sub(1, Ordering::SeqCst) == 1
    }

    /// Routes a transact call onto this client's connection, connecting
    /// lazily on the first call. Never blocks the caller: the connect
    /// (if needed) and the write both happen on a spawned task, and the
    /// returned Promise is completed from there.
    pub(crate) fn transact(self: &Arc<Self>, runtime: Arc<Runtime>, uri: String, what: i32, data: Parcel) -> Promise<Arc<Parcel>> {
        let reply = Promise::new();

        let this = self.clone();
        let reply_clone = reply.clone();
        tokio::spawn(async move {
            let mut guard = this.connected.lock().await;
            if guard.is_none() {
                let addr = match this.resolve_addr(&runtime) {
                    Ok(addr) => addr,
                    Err(error) => {
                        reply_clone.complete_with_exception(Exception::remote(error.to_string()));
                        return;
                    }
                };
                let connected = match open_connection(this.clone(), addr).await {
                    Ok(connected) => connected,
                    Err(error) => {
                        reply_clone.complete_with_exception(Exception::remote(error.to_string()));
                        return;
                    }
                };
                *guard = Some(connected);
            }
            let Some(connected) = guard.as_ref() else { return };
            this.send_transaction(connected, uri, what, data, reply_clone);
        });

        reply
    }

    fn send_transaction(&self, connected: &Connected, uri: String, what: i32, data: Parcel, reply: Promise<Arc<Parcel>>) {
        let transaction_id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        self.transactions.lock().insert(transaction_id, reply);
        connected.writer.send(Frame::transaction(uri, transaction_id, what, data.into_bytes()));
    }

    fn resolve_addr(&self, runtime: &Arc<Runtime>) -> Result<SocketAddr, ClientError> {
        let server_uri = runtime
            .configuration()
            .and_then(|config| config.node(self.node_id))
            .and_then(|node| node.plugins.get(MINDROID_SCHEME))
            .and_then(|plugin| plugin.server_uri.as_deref())
            .ok_or(ClientError::NoAddress(self.node_id.get()))?;
        let authority = server_uri.strip_prefix("tcp://").unwrap_or(server_uri);
        authority.parse().map_err(|_| ClientError::InvalidAddress(server_uri.to_string()))
    }

    fn complete_transaction(&self, frame: Frame) {
        let Some(reply) = self.transactions.lock().remove(&frame.transaction_id) else { return };
        match frame.frame_type {
            FrameType::Transaction => {
                reply.complete(Arc::new(Parcel::from_bytes(frame.payload)));
            }
            FrameType::Exception => {
                let message = String::from_utf8_lossy(&frame.payload).into_owned();
                reply.complete_with_exception(Exception::remote(message));
            }
        }
    }

    fn fail_all_outstanding(&self) {
        let outstanding: Vec<_> = self.transactions.lock().drain().collect();
        for (_, reply) in outstanding {
            reply.complete_with_exception(Exception::remote("Binder transaction failure"));
        }
    }

    /// Clears the connection slot so the next `transact` opens a fresh
    /// socket, matching the original's "a dead connection is retried,
    /// never resurrected" behavior.
    async fn clear_connection(&self) {
        *self.connected.lock().await = None;
    }

    /// Closes the connection (if any) and fails every outstanding
    /// transaction, matching `Client::shutdown`.
    pub(crate) async fn shutdown(&self) {
        let guard = self.connected.lock().await;
        if let Some(connected) = guard.as_ref() {
            connected.cancel.cancel();
        }
        drop(guard);
        self.fail_all_outstanding();
    }
}

async fn open_connection(client: Arc<Client>, addr: SocketAddr) -> Result<Connected, ClientError> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, write_half) = stream.into_split();
    let cancel = CancellationToken::new();
    let writer = spawn_writer(write_half, cancel.clone());
    tokio::spawn(reader_loop(client, read_half, cancel.clone()));
    Ok(Connected { writer, cancel })
}

async fn reader_loop(client: Arc<Client>, mut reader: OwnedReadHalf, cancel: CancellationToken) {
    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame,
            _ = cancel.cancelled() => break,
        };
        match frame {
            Ok(frame) => client.complete_transaction(frame),
            Err(error) => {
                tracing::debug!(%error, node_id = client.node_id.get(), "mindroid-plugin-tcp client connection closed");
                break;
            }
        }
    }
    cancel.cancel();
    client.fail_all_outstanding();
    client.clear_connection().await;
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
