// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mindroid-runtime: the Binder/Proxy identity-preserving RPC layer and
//! the process registry that resolves URIs to local Binders or remote
//! Proxies, dispatches to scheme plugins, and tracks service topology.

pub mod binder;
pub mod config;
pub mod plugin;
pub mod proxy;
pub mod runtime;

pub use binder::{Binder, BinderService};
pub use config::{NodeConfig, PluginConfig, ResolvedService, RuntimeConfiguration, ServiceConfig};
pub use plugin::{binder_transaction_failure, Plugin};
pub use proxy::Proxy;
pub use runtime::{Resolved, Runtime, RuntimeError, MINDROID_SCHEME};
