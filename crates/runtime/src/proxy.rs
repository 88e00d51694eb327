// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A remote RPC reference, ported from `mindroid::Binder::Proxy`.
//!
//! Constructed from a node-qualified URI whose authority parses as
//! `<node-id>.<local-id>`; `Runtime::resolve` only ever builds one when
//! the authority does *not* name the current node, collapsing same-node
//! references to the local `Binder` directly (spec §4.6).

use std::sync::{Arc, OnceLock};

use mindroid_core::ids::BinderId;
use mindroid_core::{Promise, Uri};
use mindroid_wire::Parcel;

use crate::runtime::Runtime;
use crate::RuntimeError;

struct ProxyInner {
    binder_id: BinderId,
    descriptor: String,
    uri: Uri,
    runtime: Arc<Runtime>,
    proxy_id: OnceLock<u64>,
}

/// A handle to a Binder hosted on another node (or reachable only
/// through a transport scheme's own addressing, e.g. a bridged stub).
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.inner.binder_id == other.inner.binder_id
    }
}
impl Eq for Proxy {}

impl Proxy {
    /// Parses `uri` and registers a Proxy with the Runtime, which
    /// allocates a proxy id and notifies the scheme's plugin
    /// (`Plugin::attach_proxy`), matching `Binder::Proxy::create`. The
    /// full `uri` — including its `/if=` interface descriptor and any
    /// query string — is retained verbatim: it is what gets sent over
    /// the wire, and it must match the exact string the target Binder
    /// registered under (spec §4.6: "preserved end-to-end").
    pub fn create(uri: &Uri, runtime: Arc<Runtime>) -> Result<Arc<Self>, RuntimeError> {
        let binder_id = uri.authority.binder_id().ok_or_else(|| RuntimeError::InvalidProxyUri(uri.to_string()))?;
        let descriptor = uri
            .interface_descriptor()
            .ok_or_else(|| RuntimeError::InvalidProxyUri(uri.to_string()))?
            .to_string();

        let proxy = Arc::new(Self {
            inner: Arc::new(ProxyInner { binder_id, descriptor, uri: uri.clone(), runtime: runtime.clone(), proxy_id: OnceLock::new() }),
        });
        let proxy_id = runtime.attach_proxy(&proxy);
        let _ = proxy.inner.proxy_id.set(proxy_id);
        Ok(proxy)
    }

    pub fn binder_id(&self) -> BinderId {
        self.inner.binder_id
    }

    pub fn interface_descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Routes a transact call through the Runtime to whichever plugin
    /// owns this proxy's scheme.
    pub fn transact(self: &Arc<Self>, what: i32, data: Parcel) -> Result<Promise<Arc<Parcel>>, RuntimeError> {
        self.inner.runtime.transact(self.clone(), what, data)
    }
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if let Some(proxy_id) = self.proxy_id.get() {
            self.runtime.detach_proxy(self.binder_id, &self.uri, *proxy_id);
        }
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
