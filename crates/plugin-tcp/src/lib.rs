// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mindroid-plugin-tcp: the TCP wire transport for the `mindroid`
//! scheme, ported from `mindroid/runtime/system/plugins/Mindroid.cpp`.
//!
//! One [`TcpPlugin`] owns a single inbound [`server::Server`] (bound
//! from this node's configured `server_uri`, if any) and a pool of
//! lazily-connected per-remote-node [`client::Client`]s. Both sides
//! frame their traffic with [`mindroid_wire::frame`]; replies are
//! delivered through `mindroid-core`'s Promise rather than blocking the
//! caller, so one connection's in-flight transactions never serialize
//! behind each other the way the original's single reader/writer
//! thread pair would.

mod client;
mod connection;
mod server;

pub use client::ClientError;
pub use server::ServerError;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::Mutex;

use mindroid_core::ids::{BinderId, NodeId};
use mindroid_core::{Exception, Promise};
use mindroid_runtime::{Plugin, Proxy, Runtime, RuntimeError, MINDROID_SCHEME};
use mindroid_wire::Parcel;

use client::Client;
use server::Server;

struct State {
    runtime: OnceLock<Arc<Runtime>>,
    server: Mutex<Option<Server>>,
    clients: Mutex<HashMap<NodeId, Arc<Client>>>,
}

/// The `mindroid` scheme's TCP transport: a listen server for inbound
/// transactions plus a pool of lazily-connected per-node clients.
pub struct TcpPlugin {
    state: Arc<State>,
}

impl Default for TcpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpPlugin {
    pub fn new() -> Self {
        Self {
            state: Arc::new(State { runtime: OnceLock::new(), server: Mutex::new(None), clients: Mutex::new(HashMap::new()) }),
        }
    }

    /// `None` before [`Plugin::set_up`] has run.
    fn runtime(&self) -> Option<Arc<Runtime>> {
        self.state.runtime.get().cloned()
    }

    fn client_for(&self, node_id: NodeId) -> Arc<Client> {
        self.state.clients.lock().entry(node_id).or_insert_with(|| Client::new(node_id)).clone()
    }

    /// The listen socket's actual bound address, once [`Plugin::start`]
    /// has brought up a server. `None` before start, or if this node
    /// has no configured `server_uri` (client-only).
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.state.server.lock().as_ref().map(|server| server.local_addr())
    }
}

#[async_trait]
impl Plugin for TcpPlugin {
    fn set_up(&self, runtime: Arc<Runtime>) {
        let _ = self.state.runtime.set(runtime);
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        let Some(runtime) = self.runtime() else {
            return Err(RuntimeError::PluginStartFailure("TcpPlugin::start called before Plugin::set_up".to_string()));
        };
        let Some(configuration) = runtime.configuration() else { return Ok(()) };
        let Some(node) = configuration.node(runtime.node_id()) else { return Ok(()) };
        let Some(plugin_config) = node.plugins.get(MINDROID_SCHEME) else { return Ok(()) };
        let Some(server_uri) = &plugin_config.server_uri else { return Ok(()) };

        let server = Server::bind(server_uri, runtime.clone()).await.map_err(|error| RuntimeError::PluginStartFailure(error.to_string()))?;
        *self.state.server.lock() = Some(server);
        Ok(())
    }

    async fn stop(&self) -> Result<(), RuntimeError> {
        if let Some(server) = self.state.server.lock().take() {
            server.shutdown().await;
        }
        let clients: Vec<Arc<Client>> = self.state.clients.lock().drain().map(|(_, client)| client).collect();
        for client in clients {
            client.shutdown().await;
        }
        Ok(())
    }

    fn attach_proxy(&self, _proxy_id: u64, proxy: Arc<Proxy>) {
        self.client_for(proxy.binder_id().node_id()).note_proxy_attached();
    }

    fn detach_proxy(&self, _proxy_id: u64, binder_id: u64) {
        let Some(node_id) = BinderId::from_raw(binder_id).map(BinderId::node_id) else { return };
        let removed = {
            let mut clients = self.state.clients.lock();
            match clients.get(&node_id) {
                Some(client) if client.note_proxy_detached() => clients.remove(&node_id),
                _ => None,
            }
        };
        if let Some(client) = removed {
            tokio::spawn(async move { client.shutdown().await });
        }
    }

    fn transact(&self, proxy: Arc<Proxy>, what: i32, data: Parcel) -> Promise<Arc<Parcel>> {
        let Some(runtime) = self.runtime() else {
            return Promise::failed(Exception::remote("TcpPlugin::transact called before Plugin::set_up"));
        };
        let client = self.client_for(proxy.binder_id().node_id());
        client.transact(runtime, proxy.uri().to_string(), what, data)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
