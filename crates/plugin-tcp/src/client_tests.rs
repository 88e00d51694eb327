// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mindroid_runtime::{NodeConfig, PluginConfig, RuntimeConfiguration};
use std::collections::HashMap;

#[test]
fn resolve_addr_fails_when_the_node_has_no_mindroid_plugin_configured() {
    let runtime = Runtime::new(NodeId::new(1).unwrap(), None).unwrap();
    let client = Client::new(NodeId::new(2).unwrap());
    let err = client.resolve_addr(&runtime).unwrap_err();
    assert!(matches!(err, ClientError::NoAddress(2)));
}

#[test]
fn resolve_addr_returns_the_configured_tcp_socket_addr() {
    let mut nodes = HashMap::new();
    nodes.insert(
        2,
        NodeConfig {
            plugins: HashMap::from([(
                MINDROID_SCHEME.to_string(),
                PluginConfig { class: "mindroid-plugin-tcp".to_string(), server_uri: Some("tcp://127.0.0.1:4242".to_string()) },
            )]),
        },
    );
    let runtime = Runtime::new(NodeId::new(1).unwrap(), Some(RuntimeConfiguration { nodes, services: HashMap::new() })).unwrap();
    let client = Client::new(NodeId::new(2).unwrap());
    let addr = client.resolve_addr(&runtime).unwrap();
    assert_eq!(addr, "127.0.0.1:4242".parse().unwrap());
}

// `Client::transact` completes `reply` from a spawned task; `reply.get()`
// below blocks the calling thread synchronously, so this needs a worker
// thread free to drive that task or the test deadlocks on itself.
#[tokio::test(flavor = "multi_thread")]
async fn transact_fails_immediately_when_the_node_is_unconfigured() {
    let runtime = Runtime::new(NodeId::new(1).unwrap(), None).unwrap();
    let client = Client::new(NodeId::new(2).unwrap());
    let reply = client.transact(runtime, "mindroid://2.1/if=x".to_string(), 1, Parcel::new());
    assert!(reply.get().is_err());
}

#[tokio::test]
async fn shutdown_fails_any_outstanding_transaction() {
    let client = Client::new(NodeId::new(2).unwrap());
    let reply = Promise::new();
    client.transactions.lock().insert(1, reply.clone());
    client.shutdown().await;
    assert!(reply.get().is_err());
}

#[test]
fn proxy_refcounting_reports_the_last_detach() {
    let client = Client::new(NodeId::new(2).unwrap());
    client.note_proxy_attached();
    client.note_proxy_attached();
    assert!(!client.note_proxy_detached());
    assert!(client.note_proxy_detached());
}
