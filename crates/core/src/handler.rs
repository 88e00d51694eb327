// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A sender/receiver bound to a [`Looper`], ported from
//! `mindroid/os/Handler`.

use std::sync::Arc;

use thiserror::Error;

use crate::executor::Executor;
use crate::looper::{Looper, LooperError};
use crate::message::{Message, Obj, Runnable};
use crate::message_queue::MessageQueueError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no Looper is prepared for the current thread")]
    NoCurrentLooper(#[from] LooperError),
    #[error(transparent)]
    Queue(#[from] MessageQueueError),
}

/// User code invoked when a `Handler`-targeted message is dispatched.
/// The Binder type in `mindroid-runtime` implements this to route
/// `TRANSACTION` messages into `onTransact`.
pub trait HandlerCallback: Send + Sync {
    fn handle_message(&self, message: Message);
}

struct HandlerInner {
    looper: Looper,
    callback: Option<Arc<dyn HandlerCallback>>,
}

/// A cheaply cloneable sender/receiver bound to a `Looper`. Equality is
/// by identity, used by `removeMessages`/`hasMessages`'s `target` match.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Handler {}

impl Handler {
    pub fn new(looper: Looper) -> Self {
        Self { inner: Arc::new(HandlerInner { looper, callback: None }) }
    }

    pub fn with_callback(looper: Looper, callback: Arc<dyn HandlerCallback>) -> Self {
        Self { inner: Arc::new(HandlerInner { looper, callback: Some(callback) }) }
    }

    /// Binds to the calling thread's current Looper.
    pub fn for_current_thread() -> Result<Self, HandlerError> {
        let looper = Looper::my_looper().ok_or(LooperError::NotPrepared)?;
        Ok(Self::new(looper))
    }

    pub fn looper(&self) -> &Looper {
        &self.inner.looper
    }

    pub fn obtain_message(&self, what: i32) -> Message {
        Message::new(what).with_target(self.clone())
    }

    pub fn send_message(&self, message: Message) -> Result<(), HandlerError> {
        self.send_message_delayed(message, 0)
    }

    pub fn send_message_delayed(&self, mut message: Message, delay_ms: u64) -> Result<(), HandlerError> {
        if message.target.is_none() {
            message.target = Some(self.clone());
        }
        let when = self.inner.looper.queue().clock_uptime().saturating_add(delay_ms);
        self.enqueue(message, when)
    }

    pub fn send_message_at_time(&self, mut message: Message, when: u64) -> Result<(), HandlerError> {
        if message.target.is_none() {
            message.target = Some(self.clone());
        }
        self.enqueue(message, when)
    }

    pub fn post(&self, runnable: Runnable) -> Result<(), HandlerError> {
        self.post_delayed(runnable, 0)
    }

    pub fn post_delayed(&self, runnable: Runnable, delay_ms: u64) -> Result<(), HandlerError> {
        let mut message = Message::from_runnable(runnable);
        message.target = Some(self.clone());
        let when = self.inner.looper.queue().clock_uptime().saturating_add(delay_ms);
        self.enqueue(message, when)
    }

    fn enqueue(&self, message: Message, when: u64) -> Result<(), HandlerError> {
        self.inner.looper.queue().enqueue(message, when).map_err(HandlerError::from)
    }

    pub fn has_messages(&self, what: i32, obj: Option<&Obj>) -> bool {
        self.inner.looper.queue().has_messages(self, Some(what), obj)
    }

    pub fn remove_messages(&self, what: i32, obj: Option<&Obj>) {
        self.inner.looper.queue().remove_messages(self, Some(what), obj);
    }

    pub fn remove_callbacks(&self, runnable: &Runnable, obj: Option<&Obj>) {
        self.inner.looper.queue().remove_callbacks(self, runnable, obj);
    }

    pub fn remove_callbacks_and_messages(&self, obj: Option<&Obj>) {
        self.inner.looper.queue().remove_callbacks_and_messages(self, obj);
    }

    /// Invoked by the owning Looper when a message targeting this
    /// Handler is dispatched.
    pub(crate) fn dispatch_message(&self, message: Message) {
        if let Some(callback) = &self.inner.callback {
            callback.handle_message(message);
        }
    }

    /// `true` if the calling thread is this Handler's Looper thread,
    /// the precondition for [`Handler::dispatch_now`]'s queue bypass.
    pub fn is_current_thread(&self) -> bool {
        self.inner.looper.is_current_thread()
    }

    /// Delivers `message` straight to [`HandlerCallback::handle_message`]
    /// without touching the Looper's queue. Callers must only use this
    /// when [`Handler::is_current_thread`] is true — used by Binder's
    /// current-thread transact optimization (spec §4.6).
    pub fn dispatch_now(&self, message: Message) {
        self.dispatch_message(message);
    }

    /// An `Executor` whose `execute(r)` is `post(r)`.
    pub fn as_executor(&self) -> Executor {
        Executor::handler(self.clone())
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
