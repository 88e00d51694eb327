// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-thread message dispatch loop, ported from `mindroid/os/Looper`.
//!
//! A Looper owns exactly one [`MessageQueue`] and is affine to the
//! thread that called [`Looper::prepare`]. The per-thread mapping
//! (spec §9's "Looper-per-thread map is process-wide... keep the
//! per-thread Looper via a thread-local abstraction") is a `thread_local!`,
//! which is the equivalent Rust idiom.

use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::clock::SystemClock;
use crate::message::Message;
use crate::message_queue::MessageQueue;

thread_local! {
    static CURRENT_LOOPER: RefCell<Option<Looper>> = const { RefCell::new(None) };
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LooperError {
    #[error("a Looper is already prepared for this thread")]
    AlreadyPrepared,
    #[error("no Looper is prepared for this thread")]
    NotPrepared,
}

struct LooperInner {
    queue: MessageQueue<SystemClock>,
    thread_id: std::thread::ThreadId,
    thread_name: Option<String>,
}

/// A cheaply cloneable handle to a thread's message loop. Equality is
/// by identity (the same underlying loop), matching Binder's
/// "same Looper" fast-path check.
#[derive(Clone)]
pub struct Looper {
    inner: Arc<LooperInner>,
}

impl PartialEq for Looper {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Looper {}

impl Looper {
    /// Binds a new Looper to the calling thread. Fails if one is already
    /// prepared here, matching the original's one-Looper-per-thread rule.
    pub fn prepare() -> Result<Looper, LooperError> {
        CURRENT_LOOPER.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_some() {
                return Err(LooperError::AlreadyPrepared);
            }
            let looper = Looper {
                inner: Arc::new(LooperInner {
                    queue: MessageQueue::new(SystemClock::default()),
                    thread_id: std::thread::current().id(),
                    thread_name: std::thread::current().name().map(str::to_string),
                }),
            };
            *slot = Some(looper.clone());
            Ok(looper)
        })
    }

    /// Returns the calling thread's Looper, if one has been prepared.
    pub fn my_looper() -> Option<Looper> {
        CURRENT_LOOPER.with(|cell| cell.borrow().clone())
    }

    /// Spawns a dedicated, named OS thread, prepares a Looper on it, and
    /// runs it until `quit()`. Mirrors the original's `HandlerThread`.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<(Looper, std::thread::JoinHandle<()>)> {
        let name = name.into();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::Builder::new().name(name).spawn(move || {
            let looper = match Looper::prepare() {
                Ok(looper) => looper,
                Err(_) => return,
            };
            let _ = tx.send(looper.clone());
            looper.run();
        })?;
        let looper = rx.recv().map_err(|_| std::io::Error::other("looper thread exited before preparing"))?;
        Ok((looper, handle))
    }

    pub fn queue(&self) -> &MessageQueue<SystemClock> {
        &self.inner.queue
    }

    pub fn thread_id(&self) -> std::thread::ThreadId {
        self.inner.thread_id
    }

    pub fn is_current_thread(&self) -> bool {
        self.inner.thread_id == std::thread::current().id()
    }

    /// Blocking dequeue/dispatch pump. Returns once `quit()` has been
    /// called and the queue is drained of anything still in flight.
    pub fn run(&self) {
        while let Some(message) = self.inner.queue.dequeue() {
            self.dispatch(message);
        }
    }

    fn dispatch(&self, message: Message) {
        let what = message.what;
        let target = message.target.clone();
        let callback = message.callback.clone();

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(callback) = callback {
                callback();
            } else if let Some(target) = target {
                target.dispatch_message(message);
            }
        }));

        if let Err(panic) = result {
            let name = self.inner.thread_name.as_deref().unwrap_or("<unnamed>");
            error!(looper.thread = name, message.what = what, ?panic, "message dispatch panicked; looper continues");
        }
    }

    /// Flips the queue's quitting flag and wakes the dequeue waiter.
    pub fn quit(&self) {
        self.inner.queue.quit();
    }

    pub fn is_quitting(&self) -> bool {
        self.inner.queue.is_quitting()
    }
}

#[cfg(test)]
#[path = "looper_tests.rs"]
mod tests;
