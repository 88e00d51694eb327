// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transport plugin contract, ported from the abstract plugin
//! dispatch implied by `Runtime.cpp` and
//! `runtime/system/plugins/Mindroid.cpp`: one plugin per URI scheme,
//! responsible for getting a transact call onto (or off of) the wire.

use std::sync::Arc;

use async_trait::async_trait;
use mindroid_core::{Exception, Promise};
use mindroid_wire::Parcel;

use crate::binder::Binder;
use crate::proxy::Proxy;
use crate::RuntimeError;

/// What a scheme plugin (e.g. `mindroid-plugin-tcp`) must implement to
/// be installed into a [`crate::runtime::Runtime`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Binds the plugin to its owning runtime; called once before `start`.
    fn set_up(&self, runtime: Arc<crate::runtime::Runtime>);

    /// Brings up the plugin's transport (e.g. binds a listen socket).
    async fn start(&self) -> Result<(), RuntimeError>;

    /// Tears down the plugin's transport, failing any outstanding work.
    async fn stop(&self) -> Result<(), RuntimeError>;

    /// A local binder was registered under a URI of this plugin's
    /// scheme; the plugin may want to track it (e.g. to route inbound
    /// frames addressed to it).
    fn attach_binder(&self, _binder: Arc<Binder>) {}

    /// The binder with this id is no longer registered.
    fn detach_binder(&self, _id: u64) {}

    /// A proxy targeting a remote endpoint of this plugin's scheme was
    /// created; the plugin is told so it can prepare a connection.
    fn attach_proxy(&self, _proxy_id: u64, _proxy: Arc<Proxy>) {}

    /// The last strong reference to a proxy was dropped.
    fn detach_proxy(&self, _proxy_id: u64, _binder_id: u64) {}

    /// Routes a transact call for `proxy` onto the wire. Returns
    /// immediately with a Promise that the plugin completes later (from
    /// whatever background task owns the connection) with the reply
    /// Parcel, or fails with a [`Exception::remote`] on transport
    /// failure. Not `async`: the point of the Promise is that the
    /// caller never blocks here, it only registers interest in the
    /// eventual reply.
    fn transact(&self, proxy: Arc<Proxy>, what: i32, data: Parcel) -> Promise<Arc<Parcel>>;

    /// Produces a stub Binder that bridges a local Binder registered
    /// under the base `mindroid` scheme onto this plugin's scheme, for
    /// cross-scheme service announcement (spec §4.7 item 5). Plugins
    /// that never bridge (the base `mindroid` scheme itself) return
    /// `None`.
    fn stub(&self, _binder: Arc<Binder>) -> Option<Arc<Binder>> {
        None
    }
}

/// A convenience used by plugins to fail a pending reply Promise the
/// same way `Runtime::transact` does when no plugin is installed.
pub fn binder_transaction_failure() -> Exception {
    Exception::remote("Binder transaction failure")
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
