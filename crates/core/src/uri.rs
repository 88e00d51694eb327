// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Mindroid URI grammar used on the wire and in the service directory.
//!
//! ```text
//! scheme ':' '//' authority [ '/' key '=' value {',' key '=' value} ] [ '?' query ]
//! authority = node-id '.' local-id   |   service-name
//! ```
//!
//! Authority-splitting and query parsing are delegated to the [`url`]
//! crate; the `/key=value,key=value` path grammar is specific to
//! Mindroid and is parsed by hand.

use std::fmt;

use thiserror::Error;

use crate::ids::{BinderId, NodeId};

/// The recognized path key carrying the interface-contract descriptor.
pub const INTERFACE_DESCRIPTOR_KEY: &str = "if";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("uri {0:?} is missing a scheme")]
    MissingScheme(String),
    #[error("uri {0:?} is missing the '//' authority marker")]
    MissingAuthorityMarker(String),
    #[error("uri {0:?} has an empty authority")]
    EmptyAuthority(String),
    #[error("path segment {0:?} is not a key=value pair")]
    MalformedPathPair(String),
}

/// The authority component of a Mindroid URI: either a node-qualified
/// binder endpoint (`<node-id>.<local-id>`) or an opaque service name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Authority {
    Endpoint { node_id: NodeId, local_id: u32 },
    ServiceName(String),
}

impl Authority {
    pub fn parse(s: &str) -> Self {
        if let Some((node_part, local_part)) = s.split_once('.') {
            if let (Ok(raw_node), Ok(local_id)) = (node_part.parse::<u32>(), local_part.parse::<u32>()) {
                if let Some(node_id) = NodeId::new(raw_node) {
                    return Authority::Endpoint { node_id, local_id };
                }
            }
        }
        Authority::ServiceName(s.to_string())
    }

    pub fn binder_id(&self) -> Option<BinderId> {
        match self {
            Authority::Endpoint { node_id, local_id } => Some(BinderId::new(*node_id, *local_id)),
            Authority::ServiceName(_) => None,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Endpoint { node_id, local_id } => write!(f, "{node_id}.{local_id}"),
            Authority::ServiceName(name) => write!(f, "{name}"),
        }
    }
}

/// A parsed Mindroid URI: `scheme://authority[/k=v,k=v][?query]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: String,
    pub authority: Authority,
    pub path_pairs: Vec<(String, String)>,
    pub query: Option<String>,
}

impl Uri {
    pub fn new(scheme: impl Into<String>, authority: Authority) -> Self {
        Self { scheme: scheme.into(), authority, path_pairs: Vec::new(), query: None }
    }

    /// Builds the `mindroid://<node>.<local_id>` form for a local
    /// binder's self-registration URI.
    pub fn for_binder(scheme: impl Into<String>, binder_id: BinderId) -> Self {
        Self::new(scheme, Authority::Endpoint { node_id: binder_id.node_id(), local_id: binder_id.local_id() })
    }

    pub fn with_path_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_pairs.push((key.into(), value.into()));
        self
    }

    pub fn with_interface_descriptor(self, descriptor: impl Into<String>) -> Self {
        self.with_path_pair(INTERFACE_DESCRIPTOR_KEY, descriptor)
    }

    pub fn interface_descriptor(&self) -> Option<&str> {
        self.path_pairs
            .iter()
            .find(|(k, _)| k == INTERFACE_DESCRIPTOR_KEY)
            .map(|(_, v)| v.as_str())
    }

    pub fn path_pair(&self, key: &str) -> Option<&str> {
        self.path_pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn parse(s: &str) -> Result<Self, UriError> {
        let url = url::Url::parse(s).map_err(|_| UriError::MissingScheme(s.to_string()))?;

        let authority_str = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ if url.cannot_be_a_base() => return Err(UriError::MissingAuthorityMarker(s.to_string())),
            _ => return Err(UriError::EmptyAuthority(s.to_string())),
        };

        let path = url.path().strip_prefix('/').unwrap_or_else(|| url.path());
        let mut path_pairs = Vec::new();
        if !path.is_empty() {
            for segment in path.split(',') {
                let (key, value) = segment
                    .split_once('=')
                    .ok_or_else(|| UriError::MalformedPathPair(segment.to_string()))?;
                path_pairs.push((key.to_string(), value.to_string()));
            }
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority: Authority::parse(authority_str),
            path_pairs,
            query: url.query().map(str::to_string),
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)?;
        if !self.path_pairs.is_empty() {
            write!(f, "/")?;
            for (i, (k, v)) in self.path_pairs.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{k}={v}")?;
            }
        }
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "uri_tests.rs"]
mod tests;
