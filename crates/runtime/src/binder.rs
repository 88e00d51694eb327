// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local RPC endpoint, ported line-for-line from `mindroid/os/Binder.cpp`.
//!
//! A `Binder` is constructed on (and forever dispatches through) one
//! Looper thread. `attach_interface` additionally registers it under a
//! node-qualified URI so remote peers (and local `Proxy`s) can address
//! it. One simplification from the original: the original also offers
//! an executor-backed `Messenger` variant (`Binder(Executor)`); this
//! port's `Message::target` is `Handler`-only (see `mindroid-core`), so
//! only the Looper-bound constructors are provided — recorded in
//! `DESIGN.md`.

use std::sync::Arc;

use mindroid_core::ids::BinderId;
use mindroid_core::{Exception, Handler, HandlerCallback, Looper, LooperError, Message, Obj, Promise, Uri};
use mindroid_wire::Parcel;
use parking_lot::Mutex;

use crate::runtime::Runtime;
use crate::RuntimeError;

/// The message `what` sentinel marking a transact delivery, distinct
/// from any application-level `what` code (carried in `arg1`).
const TRANSACTION: i32 = 1;

/// User-supplied transaction handling, the overridable half of the
/// original's `virtual void onTransact(...)`.
pub trait BinderService: Send + Sync {
    /// Handles one transaction and produces the reply Parcel, or an
    /// [`Exception`] (surfaced to the caller as the Promise's
    /// rejection, matching the original's catch-and-complete-with
    /// `RemoteException` behavior).
    fn on_transact(&self, what: i32, data: Parcel) -> Result<Parcel, Exception>;
}

struct TransactCallback {
    service: Arc<dyn BinderService>,
}

impl HandlerCallback for TransactCallback {
    fn handle_message(&self, message: Message) {
        if message.what != TRANSACTION {
            return;
        }
        let mut message = message;
        let what = message.arg1;
        let result = message.result.take();
        let obj = message.obj.take();

        let outcome = match obj.and_then(|obj| obj.downcast::<Parcel>().ok()) {
            Some(parcel) => match Arc::try_unwrap(parcel) {
                Ok(parcel) => self.service.on_transact(what, parcel),
                Err(_shared) => Err(Exception::remote("Binder transaction Parcel has more than one owner")),
            },
            None => Err(Exception::remote("Binder transaction missing Parcel payload")),
        };

        if let Some(result) = result {
            match outcome {
                Ok(parcel) => {
                    let reply: Obj = Arc::new(parcel);
                    result.complete(reply);
                }
                Err(exception) => {
                    result.complete_with_exception(exception);
                }
            }
        } else if let Err(exception) = outcome {
            tracing::warn!(%exception, "Binder transaction failure");
        }
    }
}

struct BinderInner {
    id: BinderId,
    uri: Mutex<Option<Uri>>,
    handler: Handler,
    service: Arc<dyn BinderService>,
    runtime: Arc<Runtime>,
}

/// A local RPC endpoint, identified by a 64-bit [`BinderId`] and
/// (optionally) a node-qualified URI.
#[derive(Clone)]
pub struct Binder {
    inner: Arc<BinderInner>,
}

impl PartialEq for Binder {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}
impl Eq for Binder {}

impl Binder {
    /// Constructs a Binder dispatching on the calling thread's Looper.
    /// The calling thread must have called `Looper::prepare()`.
    pub fn new(service: Arc<dyn BinderService>, runtime: Arc<Runtime>) -> Result<Arc<Self>, RuntimeError> {
        let looper = Looper::my_looper().ok_or(LooperError::NotPrepared)?;
        Self::with_looper(service, runtime, looper)
    }

    /// Constructs a Binder dispatching on an explicit Looper.
    pub fn with_looper(service: Arc<dyn BinderService>, runtime: Arc<Runtime>, looper: Looper) -> Result<Arc<Self>, RuntimeError> {
        let id = runtime.alloc_binder_id();
        Self::construct(service, runtime, looper, id)
    }

    /// Constructs a Binder at a caller-chosen id instead of allocating
    /// one, so a named service can come up already addressable as
    /// `<node>.<id>` per spec §4.7's "Service registration with
    /// topology" (see [`Runtime::configured_service_binder_id`]).
    /// Fails if `id` is already registered.
    pub fn with_configured_id(service: Arc<dyn BinderService>, runtime: Arc<Runtime>, looper: Looper, id: BinderId) -> Result<Arc<Self>, RuntimeError> {
        runtime.reserve_binder_id(id)?;
        Self::construct(service, runtime, looper, id)
    }

    fn construct(service: Arc<dyn BinderService>, runtime: Arc<Runtime>, looper: Looper, id: BinderId) -> Result<Arc<Self>, RuntimeError> {
        let callback = Arc::new(TransactCallback { service: service.clone() });
        let handler = Handler::with_callback(looper, callback);
        let binder = Arc::new(Self {
            inner: Arc::new(BinderInner { id, uri: Mutex::new(None), handler, service, runtime: runtime.clone() }),
        });
        runtime.register_binder(id, &binder);
        Ok(binder)
    }

    pub fn id(&self) -> BinderId {
        self.inner.id
    }

    pub fn uri(&self) -> Option<Uri> {
        self.inner.uri.lock().clone()
    }

    /// Registers this Binder under `mindroid://<node>.<local_id>` with
    /// the given interface descriptor, so remote Proxys can reach it.
    pub fn attach_interface(self: &Arc<Self>, scheme: impl Into<String>, interface_descriptor: impl Into<String>) -> Result<(), RuntimeError> {
        let uri = Uri::for_binder(scheme, self.inner.id).with_interface_descriptor(interface_descriptor);
        self.inner.runtime.attach_binder_uri(uri.clone(), self)?;
        *self.inner.uri.lock() = Some(uri);
        Ok(())
    }

    /// Delivers a transaction. `oneway` callers that don't need the
    /// reply pass `want_reply = false` and get `None` back immediately.
    ///
    /// When the calling thread is this Binder's own Looper thread
    /// (spec §4.6's "current-thread optimization", used by the
    /// optimized Stub-Proxy bypass), the call is dispatched directly
    /// instead of round-tripping through the message queue.
    pub fn transact(&self, what: i32, mut data: Parcel, want_reply: bool) -> Result<Option<Promise<Obj>>, RuntimeError> {
        data = data.as_input();
        let obj: Obj = Arc::new(data);
        let result = if want_reply { Some(Promise::new()) } else { None };

        let mut message = Message::new(TRANSACTION).with_args(what, 0).with_obj(obj);
        message.result = result.clone();
        message.target = Some(self.inner.handler.clone());

        if self.inner.handler.is_current_thread() {
            self.inner.handler.dispatch_now(message);
        } else {
            self.inner.handler.send_message(message).map_err(|_| RuntimeError::TransactionFailure)?;
        }
        Ok(result)
    }
}

impl Drop for BinderInner {
    fn drop(&mut self) {
        self.runtime.detach_binder(self.id, self.uri.lock().take());
    }
}

#[cfg(test)]
#[path = "binder_tests.rs"]
mod tests;
