// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::MINDROID_SCHEME;
use mindroid_core::ids::NodeId;
use mindroid_core::Looper;
use mindroid_wire::Parcel;
use std::sync::Arc;

struct EchoService;

impl BinderService for EchoService {
    fn on_transact(&self, what: i32, data: Parcel) -> Result<Parcel, mindroid_core::Exception> {
        if what == 0 {
            return Err(mindroid_core::Exception::remote("unsupported"));
        }
        Ok(data)
    }
}

fn runtime() -> Arc<Runtime> {
    Runtime::new(NodeId::new(1).unwrap(), None).unwrap()
}

#[test]
fn constructing_without_a_prepared_looper_fails() {
    std::thread::spawn(|| {
        let err = Binder::new(Arc::new(EchoService), runtime()).unwrap_err();
        assert!(matches!(err, RuntimeError::Looper(mindroid_core::LooperError::NotPrepared)));
    })
    .join()
    .unwrap();
}

#[test]
fn two_binders_are_equal_iff_ids_are_equal() {
    let (looper, join) = Looper::spawn("binder-test-identity").unwrap();
    let rt = runtime();
    let a = Binder::with_looper(Arc::new(EchoService), rt.clone(), looper.clone()).unwrap();
    let b = Binder::with_looper(Arc::new(EchoService), rt, looper.clone()).unwrap();

    assert_eq!(a, a);
    assert_ne!(a, b);

    looper.quit();
    join.join().unwrap();
}

#[test]
fn attach_interface_registers_uri_and_is_resolvable() {
    let (looper, join) = Looper::spawn("binder-test-attach").unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt.clone(), looper.clone()).unwrap();

    binder.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();

    let uri = binder.uri().unwrap();
    assert_eq!(uri.interface_descriptor(), Some("mindroid://interfaces/test/IEcho"));

    match rt.resolve(&uri).unwrap() {
        crate::runtime::Resolved::Local(resolved) => assert_eq!(resolved, binder),
        crate::runtime::Resolved::Remote(_) => panic!("expected a local resolution"),
    }

    looper.quit();
    join.join().unwrap();
}

#[test]
fn attach_interface_twice_under_the_same_uri_is_rejected() {
    let (looper, join) = Looper::spawn("binder-test-duplicate").unwrap();
    let rt = runtime();
    let a = Binder::with_looper(Arc::new(EchoService), rt.clone(), looper.clone()).unwrap();
    a.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();

    // Force the second binder to the same id-bearing URI by overwriting the
    // registry entry directly isn't possible from the outside; instead
    // exercise the duplicate path with a hand-built URI at the same authority.
    let uri = a.uri().unwrap();
    let err = rt.attach_binder_uri(uri, &a).unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateBinderUri(_)));

    looper.quit();
    join.join().unwrap();
}

#[test]
fn transact_without_reply_returns_none_and_still_dispatches() {
    let (looper, join) = Looper::spawn("binder-test-oneway").unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt, looper.clone()).unwrap();

    let mut parcel = Parcel::new();
    parcel.write_string("hi").unwrap();
    let reply = binder.transact(1, parcel, false).unwrap();
    assert!(reply.is_none());

    looper.quit();
    join.join().unwrap();
}

#[test]
fn transact_with_reply_round_trips_the_parcel() {
    let (looper, join) = Looper::spawn("binder-test-transact").unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt, looper.clone()).unwrap();

    let mut parcel = Parcel::new();
    parcel.write_string("hi").unwrap();
    let reply = binder.transact(1, parcel, true).unwrap().unwrap();

    let value = reply.get().unwrap();
    let parcel = value.downcast::<Parcel>().unwrap();
    let mut parcel = Parcel::from_bytes(parcel.to_bytes());
    assert_eq!(parcel.read_string().unwrap(), "hi");

    looper.quit();
    join.join().unwrap();
}

#[test]
fn transact_failure_completes_reply_with_remote_exception() {
    let (looper, join) = Looper::spawn("binder-test-failure").unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt, looper.clone()).unwrap();

    let parcel = Parcel::new();
    let reply = binder.transact(0, parcel, true).unwrap().unwrap();
    assert!(reply.get().is_err());

    looper.quit();
    join.join().unwrap();
}

#[test]
fn transact_from_the_binders_own_looper_thread_bypasses_the_queue() {
    // No `Looper::run()` pump here at all: if this synchronously completes
    // without a dispatch loop draining the queue, the transact went through
    // `Handler::dispatch_now`, not `send_message`.
    let looper = Looper::prepare().unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt, looper).unwrap();

    let mut parcel = Parcel::new();
    parcel.write_string("direct").unwrap();
    let reply = binder.transact(1, parcel, true).unwrap().unwrap();

    assert!(reply.is_done(), "current-thread transact must complete inline, not via the queue");
    let value = reply.get().unwrap();
    let parcel = value.downcast::<Parcel>().unwrap();
    let mut parcel = Parcel::from_bytes(parcel.to_bytes());
    assert_eq!(parcel.read_string().unwrap(), "direct");
}

#[test]
fn with_configured_id_registers_at_the_given_id() {
    let (looper, join) = Looper::spawn("binder-test-configured-id").unwrap();
    let rt = runtime();
    let id = mindroid_core::ids::BinderId::new(NodeId::new(1).unwrap(), 42);
    let binder = Binder::with_configured_id(Arc::new(EchoService), rt.clone(), looper.clone(), id).unwrap();

    assert_eq!(binder.id(), id);
    assert_eq!(rt.binder_for_id(id), Some(binder));

    looper.quit();
    join.join().unwrap();
}

#[test]
fn with_configured_id_rejects_an_id_already_in_use() {
    let (looper, join) = Looper::spawn("binder-test-configured-id-conflict").unwrap();
    let rt = runtime();
    let id = mindroid_core::ids::BinderId::new(NodeId::new(1).unwrap(), 42);
    let _first = Binder::with_configured_id(Arc::new(EchoService), rt.clone(), looper.clone(), id).unwrap();

    let err = Binder::with_configured_id(Arc::new(EchoService), rt, looper.clone(), id).unwrap_err();
    assert!(matches!(err, RuntimeError::BinderIdInUse(conflicting) if conflicting == id));

    looper.quit();
    join.join().unwrap();
}

#[test]
fn dropping_the_last_binder_reference_deregisters_it() {
    let (looper, join) = Looper::spawn("binder-test-drop").unwrap();
    let rt = runtime();
    let binder = Binder::with_looper(Arc::new(EchoService), rt.clone(), looper.clone()).unwrap();
    let id = binder.id();
    assert!(rt.binder_for_id(id).is_some());

    drop(binder);
    assert!(rt.binder_for_id(id).is_none());

    looper.quit();
    join.join().unwrap();
}
