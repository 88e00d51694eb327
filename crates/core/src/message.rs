// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A deliverable unit of work, queued on a [`crate::message_queue::MessageQueue`]
//! and dispatched by a [`crate::looper::Looper`] to a
//! [`crate::handler::Handler`].

use std::any::Any;
use std::sync::Arc;

use crate::bundle::Bundle;
use crate::handler::Handler;
use crate::promise::Promise;

/// A boxed, shared, identity-comparable payload. `Arc` gives the
/// `removeMessages`/`removeCallbacks` family object-identity matching
/// (`Arc::ptr_eq`) without requiring `obj` to be `Eq`.
pub type Obj = Arc<dyn Any + Send + Sync>;

/// A runnable posted via `Handler::post`/`postDelayed`. Held in an `Arc`
/// for the same identity-matching reason as [`Obj`].
pub type Runnable = Arc<dyn Fn() + Send + Sync>;

/// The reply slot for a transact-style message: the target's
/// `onTransact` completes this with the call's result, type-erased
/// since `mindroid-core` has no notion of `Parcel`.
pub type ReplyPromise = Promise<Arc<dyn Any + Send + Sync>>;

/// A time-ordered deliverable unit. See `mindroid-core`'s module docs
/// for the full invariant list; enforced by
/// [`crate::message_queue::MessageQueue`], not by this type itself.
pub struct Message {
    pub what: i32,
    pub arg1: i32,
    pub arg2: i32,
    pub obj: Option<Obj>,
    pub data: Option<Bundle>,
    /// Absolute uptime (ms) of earliest delivery. `0` means head-of-queue.
    pub when: u64,
    pub target: Option<Handler>,
    pub callback: Option<Runnable>,
    pub result: Option<ReplyPromise>,
    pub(crate) in_use: bool,
}

impl Message {
    pub fn new(what: i32) -> Self {
        Self {
            what,
            arg1: 0,
            arg2: 0,
            obj: None,
            data: None,
            when: 0,
            target: None,
            callback: None,
            result: None,
            in_use: false,
        }
    }

    pub fn with_args(mut self, arg1: i32, arg2: i32) -> Self {
        self.arg1 = arg1;
        self.arg2 = arg2;
        self
    }

    pub fn with_obj(mut self, obj: Obj) -> Self {
        self.obj = Some(obj);
        self
    }

    pub fn with_data(mut self, data: Bundle) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_target(mut self, target: Handler) -> Self {
        self.target = Some(target);
        self
    }

    pub fn from_runnable(runnable: Runnable) -> Self {
        let mut message = Self::new(0);
        message.callback = Some(runnable);
        message
    }

    /// Clears all fields, matching the original's `recycleUnchecked`:
    /// a recycled message carries no references forward.
    pub(crate) fn recycle(&mut self) {
        self.what = 0;
        self.arg1 = 0;
        self.arg2 = 0;
        self.obj = None;
        self.data = None;
        self.when = 0;
        self.target = None;
        self.callback = None;
        self.result = None;
        self.in_use = false;
    }

    pub fn matches_obj(&self, obj: Option<&Obj>) -> bool {
        match obj {
            None => true,
            Some(obj) => self.obj.as_ref().is_some_and(|o| Arc::ptr_eq(o, obj)),
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("what", &self.what)
            .field("arg1", &self.arg1)
            .field("arg2", &self.arg2)
            .field("when", &self.when)
            .field("has_obj", &self.obj.is_some())
            .field("has_callback", &self.callback.is_some())
            .field("has_result", &self.result.is_some())
            .finish()
    }
}
