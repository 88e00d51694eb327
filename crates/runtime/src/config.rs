// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime's configuration model, shaped 1:1 from spec §6's XML
//! schema but deserialized from TOML (see `DESIGN.md`'s Open Question
//! resolution: `spec.md` treats the configuration parser itself as an
//! external collaborator, so no XML dependency is introduced — the core
//! just consumes this already-deserialized struct).
//!
//! ```toml
//! [nodes.1]
//! [nodes.1.plugins.mindroid]
//! class = "mindroid-plugin-tcp"
//! server_uri = "tcp://0.0.0.0:1234"
//!
//! [services.svc]
//! node_id = 1
//! id = 42
//! name = "mindroid://svc"
//! [services.svc.announcements]
//! mindroid = "mindroid://interfaces/pkg/Foo"
//! ```

use std::collections::HashMap;

use mindroid_core::ids::NodeId;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfiguration {
    /// Keyed by the raw node id rather than [`NodeId`] itself: TOML/JSON
    /// map keys deserialize as plain strings, and routing that through
    /// `NodeId`'s nonzero validation on every config load is no better
    /// than validating once here via `node()`.
    #[serde(default)]
    pub nodes: HashMap<u32, NodeConfig>,
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
}

impl RuntimeConfiguration {
    pub fn node(&self, node_id: NodeId) -> Option<&NodeConfig> {
        self.nodes.get(&node_id.get())
    }

    /// Finds a configured service by its directory name (the `services`
    /// table key, e.g. `svc` for `mindroid://svc`).
    pub fn service_named(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub plugins: HashMap<String, PluginConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// A free-form identifier for the plugin implementation, carried
    /// from the original's `class` attribute though this port has no
    /// runtime class loader: `mindroid-cli` matches it against a small
    /// built-in set (currently just `mindroid-plugin-tcp`).
    pub class: String,
    pub server_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub node_id: NodeId,
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub announcements: HashMap<String, String>,
}

/// The node/id/interface-descriptor triple needed to build a Proxy URI,
/// once a [`ServiceConfig`] has been matched against a transport scheme.
pub struct ResolvedService {
    pub node_id: NodeId,
    pub id: u32,
    pub interface_descriptor: String,
}

impl ServiceConfig {
    /// The interface descriptor announced for the given scheme, used
    /// to build a Proxy URI in `Runtime::resolve_service`.
    pub fn resolved_for(&self, scheme: &str) -> Option<ResolvedService> {
        self.announcements
            .get(scheme)
            .map(|descriptor| ResolvedService { node_id: self.node_id, id: self.id, interface_descriptor: descriptor.clone() })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
