// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use mindroid_core::ids::NodeId;
use mindroid_core::{Exception, Looper};
use mindroid_runtime::{Binder, BinderService, Resolved, Runtime, MINDROID_SCHEME};
use mindroid_wire::Parcel;

struct EchoService;

impl BinderService for EchoService {
    fn on_transact(&self, _what: i32, data: Parcel) -> Result<Parcel, Exception> {
        Ok(data)
    }
}

/// A Binder bound to Looper L1, interface descriptor
/// `mindroid://interfaces/test/IEcho`. From L2, `resolve(uri)` then
/// `transact(1, parcel("hi"), 0)` returns a parcel whose first string
/// is `"hi"`.
///
/// `Runtime::resolve` collapses a same-node reference straight to the
/// local `Binder` rather than a `Proxy` (spec §4.6); L2 here is this
/// test's own thread, distinct from L1's dedicated Looper thread.
#[test]
fn local_transact_across_two_loopers_round_trips_the_parcel() {
    let runtime = Runtime::new(NodeId::new(1).unwrap(), None).unwrap();

    let (l1, l1_join) = Looper::spawn("spec-local-transact-l1").unwrap();
    let binder = Binder::with_looper(Arc::new(EchoService), runtime.clone(), l1.clone()).unwrap();
    binder.attach_interface(MINDROID_SCHEME, "mindroid://interfaces/test/IEcho").unwrap();
    let uri = binder.uri().unwrap();

    // From L2 (this thread): resolve and transact.
    let resolved = runtime.resolve(&uri).unwrap();
    let target = match resolved {
        Resolved::Local(binder) => binder,
        Resolved::Remote(_) => panic!("same-node uri must resolve locally"),
    };

    let mut parcel = Parcel::new();
    parcel.write_string("hi").unwrap();
    let reply = target.transact(1, parcel, true).unwrap().unwrap();

    let value = reply.get().unwrap();
    let parcel = value.downcast::<Parcel>().unwrap();
    let mut parcel = Parcel::from_bytes(parcel.to_bytes());
    assert_eq!(parcel.read_string().unwrap(), "hi");

    l1.quit();
    l1_join.join().unwrap();
}
