// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mindroid_core::ids::NodeId;
use mindroid_core::{Authority, Exception, Looper, Uri};
use mindroid_plugin_tcp::TcpPlugin;
use mindroid_runtime::{Binder, BinderService, NodeConfig, PluginConfig, Resolved, Runtime, RuntimeConfiguration, MINDROID_SCHEME};
use mindroid_wire::Parcel;

struct EchoService;

impl BinderService for EchoService {
    fn on_transact(&self, _what: i32, data: Parcel) -> Result<Parcel, Exception> {
        Ok(data)
    }
}

fn tcp_node_config(server_uri: impl Into<String>) -> NodeConfig {
    NodeConfig {
        plugins: HashMap::from([(MINDROID_SCHEME.to_string(), PluginConfig { class: "mindroid-plugin-tcp".to_string(), server_uri: Some(server_uri.into()) })]),
    }
}

/// Node 1 listens on `tcp://127.0.0.1:PORT`; node 2 with matching
/// configuration invokes the same interface. The reply arrives and
/// `get(5000)` succeeds.
#[tokio::test(flavor = "multi_thread")]
async fn remote_transact_round_trips_and_completes_within_the_deadline() {
    let node1 = NodeId::new(1).unwrap();
    let node2 = NodeId::new(2).unwrap();

    let node1_config = RuntimeConfiguration { nodes: HashMap::from([(node1.get(), tcp_node_config("tcp://127.0.0.1:0"))]), services: HashMap::new() };
    let runtime1 = Runtime::new(node1, Some(node1_config)).unwrap();
    let plugin1 = Arc::new(TcpPlugin::new());
    runtime1.install_plugin(MINDROID_SCHEME, plugin1.clone());
    runtime1.start().await.unwrap();
    let node1_addr = plugin1.local_addr().unwrap();

    let (l1, l1_join) = Looper::spawn("spec-remote-transact-l1").unwrap();
    let binder = Binder::with_looper(Arc::new(EchoService), runtime1.clone(), l1.clone()).unwrap();
    binder.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();
    let binder_local_id = binder.id().local_id();

    let node2_config = RuntimeConfiguration { nodes: HashMap::from([(node1.get(), tcp_node_config(format!("tcp://{node1_addr}")))]), services: HashMap::new() };
    let runtime2 = Runtime::new(node2, Some(node2_config)).unwrap();
    let plugin2 = Arc::new(TcpPlugin::new());
    runtime2.install_plugin(MINDROID_SCHEME, plugin2);
    runtime2.start().await.unwrap();

    let uri = Uri::new(MINDROID_SCHEME, Authority::Endpoint { node_id: node1, local_id: binder_local_id }).with_interface_descriptor("mindroid://interfaces/test/IEcho");
    let proxy = match runtime2.resolve(&uri).unwrap() {
        Resolved::Remote(proxy) => proxy,
        Resolved::Local(_) => panic!("expected a remote proxy for a different node"),
    };

    let mut parcel = Parcel::new();
    parcel.write_string("hi").unwrap();
    let reply = proxy.transact(1, parcel).unwrap();
    let value = reply.get_timeout(Duration::from_millis(5000)).unwrap();
    let mut payload = Parcel::from_bytes(value.to_bytes());
    assert_eq!(payload.read_string().unwrap(), "hi");

    runtime1.shutdown().await.unwrap();
    runtime2.shutdown().await.unwrap();
    l1.quit();
    l1_join.join().unwrap();
}

/// Restart the server and observe that a transact attempted while it
/// is down fails with a `RemoteException`, then a fresh transact
/// issued once it is back up (at the same address, same binder local
/// id) succeeds. `Client`'s connection slot only ever holds one
/// socket per remote node, so this also exercises the "never
/// resurrect a dead connection" reconnect path in
/// `mindroid-plugin-tcp`.
#[tokio::test(flavor = "multi_thread")]
async fn remote_transact_fails_while_the_server_is_down_and_recovers_after_restart() {
    let node1 = NodeId::new(1).unwrap();
    let node2 = NodeId::new(2).unwrap();

    let node1_config = RuntimeConfiguration { nodes: HashMap::from([(node1.get(), tcp_node_config("tcp://127.0.0.1:0"))]), services: HashMap::new() };
    let runtime1 = Runtime::new(node1, Some(node1_config)).unwrap();
    let plugin1 = Arc::new(TcpPlugin::new());
    runtime1.install_plugin(MINDROID_SCHEME, plugin1.clone());
    runtime1.start().await.unwrap();
    let node1_addr = plugin1.local_addr().unwrap();

    let (l1, l1_join) = Looper::spawn("spec-remote-transact-restart-l1").unwrap();
    let binder = Binder::with_looper(Arc::new(EchoService), runtime1.clone(), l1.clone()).unwrap();
    binder.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();
    let binder_local_id = binder.id().local_id();
    assert_eq!(binder_local_id, 1, "this test relies on the first binder on a fresh Runtime getting local id 1");

    let node2_config = RuntimeConfiguration { nodes: HashMap::from([(node1.get(), tcp_node_config(format!("tcp://{node1_addr}")))]), services: HashMap::new() };
    let runtime2 = Runtime::new(node2, Some(node2_config)).unwrap();
    let plugin2 = Arc::new(TcpPlugin::new());
    runtime2.install_plugin(MINDROID_SCHEME, plugin2);
    runtime2.start().await.unwrap();

    let uri = Uri::new(MINDROID_SCHEME, Authority::Endpoint { node_id: node1, local_id: binder_local_id }).with_interface_descriptor("mindroid://interfaces/test/IEcho");
    let proxy = match runtime2.resolve(&uri).unwrap() {
        Resolved::Remote(proxy) => proxy,
        Resolved::Local(_) => panic!("expected a remote proxy for a different node"),
    };

    // Establish the connection and confirm it works before the restart.
    let mut parcel = Parcel::new();
    parcel.write_string("before-restart").unwrap();
    proxy.transact(1, parcel).unwrap().get().unwrap();

    // Stop node 1 (closes the listener and every accepted connection),
    // then give node 2's client time to notice the socket died.
    runtime1.shutdown().await.unwrap();
    l1.quit();
    l1_join.join().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let parcel = Parcel::new();
    let reply_while_down = proxy.transact(2, parcel).unwrap();
    assert!(reply_while_down.get().is_err(), "transact while the server is down must fail");

    // Restart node 1 at the same address with the same binder local id.
    let node1b_config = RuntimeConfiguration { nodes: HashMap::from([(node1.get(), tcp_node_config(format!("tcp://{node1_addr}")))]), services: HashMap::new() };
    let runtime1b = Runtime::new(node1, Some(node1b_config)).unwrap();
    let plugin1b = Arc::new(TcpPlugin::new());
    runtime1b.install_plugin(MINDROID_SCHEME, plugin1b);
    runtime1b.start().await.unwrap();

    let (l1b, l1b_join) = Looper::spawn("spec-remote-transact-restart-l1b").unwrap();
    let binder_b = Binder::with_looper(Arc::new(EchoService), runtime1b.clone(), l1b.clone()).unwrap();
    binder_b.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();
    assert_eq!(binder_b.id().local_id(), binder_local_id, "restarted binder must reuse the same local id for the uri to still resolve");

    let mut parcel = Parcel::new();
    parcel.write_string("after-restart").unwrap();
    let reply_after_restart = proxy.transact(3, parcel).unwrap();
    let value = reply_after_restart.get_timeout(Duration::from_millis(5000)).unwrap();
    let mut payload = Parcel::from_bytes(value.to_bytes());
    assert_eq!(payload.read_string().unwrap(), "after-restart");

    runtime1b.shutdown().await.unwrap();
    runtime2.shutdown().await.unwrap();
    l1b.quit();
    l1b_join.join().unwrap();
}
