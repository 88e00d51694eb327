// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A time-ordered queue of [`Message`]s, ported from
//! `mindroid/os/MessageQueue.cpp`.
//!
//! The original uses an intrusive doubly-linked list so that
//! `removeMessages`/`removeCallbacks` can unlink in O(1) once a match is
//! found. The workspace forbids `unsafe_code`, so this keeps a
//! `VecDeque<Message>` sorted ascending by `when` instead — insertion is
//! O(n) in the worst case (same as the original's tail-backward scan for
//! any insertion that isn't at an endpoint), but every externally
//! observable ordering and removal invariant is identical. See
//! `DESIGN.md` for the full rationale.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::clock::Clock;
use crate::handler::Handler;
use crate::message::{Message, Obj, Runnable};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MessageQueueError {
    #[error("message has no target handler")]
    NoTarget,
    #[error("message is already in use (enqueued twice)")]
    AlreadyInUse,
    #[error("message queue is quitting")]
    Quitting,
}

struct Inner {
    messages: VecDeque<Message>,
    quitting: bool,
}

/// A time-ordered FIFO-among-equals queue of messages, guarded by one
/// mutex and condvar as required by spec §5.
pub struct MessageQueue<C: Clock> {
    clock: C,
    inner: Mutex<Inner>,
    not_empty: Condvar,
}

impl<C: Clock> MessageQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner { messages: VecDeque::new(), quitting: false }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues `message`, computing `when` as `now + delay_ms` if
    /// `at_time` is `None`, or using the absolute `when` given.
    pub fn enqueue(&self, mut message: Message, when: u64) -> Result<(), MessageQueueError> {
        if message.target.is_none() {
            return Err(MessageQueueError::NoTarget);
        }
        if message.in_use {
            return Err(MessageQueueError::AlreadyInUse);
        }

        let mut inner = self.inner.lock();
        if inner.quitting {
            message.recycle();
            return Err(MessageQueueError::Quitting);
        }

        message.when = when;
        message.in_use = true;

        let needs_wake = match inner.messages.front() {
            None => true,
            Some(head) => when == 0 || when < head.when,
        };

        let insert_at = match inner.messages.binary_search_by(|m| {
            if m.when <= when { std::cmp::Ordering::Less } else { std::cmp::Ordering::Greater }
        }) {
            Ok(i) | Err(i) => i,
        };
        inner.messages.insert(insert_at, message);

        if needs_wake {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Blocks until the earliest-due message is ready, or returns `None`
    /// if the queue has been told to quit.
    pub fn dequeue(&self) -> Option<Message> {
        let mut inner = self.inner.lock();
        loop {
            if inner.quitting {
                return None;
            }

            match inner.messages.front() {
                None => {
                    self.not_empty.wait(&mut inner);
                }
                Some(head) => {
                    let now = self.clock.uptime_millis();
                    let when = head.when;
                    if now >= when {
                        // The lock has been held continuously since `front()`
                        // matched `Some` above, so the queue cannot have
                        // emptied out from under us.
                        if let Some(mut message) = inner.messages.pop_front() {
                            message.in_use = false;
                            return Some(message);
                        }
                    } else {
                        let delta = (when - now).min(i32::MAX as u64);
                        self.not_empty.wait_for(&mut inner, Duration::from_millis(delta));
                    }
                }
            }
        }
    }

    /// Flips the quitting flag and wakes the dequeue waiter. In-flight
    /// dispatch already popped from the queue runs to completion; this
    /// only prevents further progress.
    pub fn quit(&self) {
        let mut inner = self.inner.lock();
        inner.quitting = true;
        if !inner.messages.is_empty() {
            for mut message in inner.messages.drain(..) {
                message.recycle();
            }
        }
        drop(inner);
        self.not_empty.notify_all();
    }

    pub fn is_quitting(&self) -> bool {
        self.inner.lock().quitting
    }

    /// The queue's clock's current uptime, used by `Handler` to turn a
    /// relative delay into an absolute `when`.
    pub fn clock_uptime(&self) -> u64 {
        self.clock.uptime_millis()
    }

    pub fn has_messages(&self, target: &Handler, what: Option<i32>, obj: Option<&Obj>) -> bool {
        let inner = self.inner.lock();
        inner.messages.iter().any(|m| matches(m, target, what, obj))
    }

    pub fn has_callbacks(&self, target: &Handler, runnable: &Runnable, obj: Option<&Obj>) -> bool {
        let inner = self.inner.lock();
        inner
            .messages
            .iter()
            .any(|m| matches_target(m, target) && matches_callback(m, runnable) && m.matches_obj(obj))
    }

    pub fn remove_messages(&self, target: &Handler, what: Option<i32>, obj: Option<&Obj>) {
        self.retain_unmatched(|m| matches(m, target, what, obj));
    }

    pub fn remove_callbacks(&self, target: &Handler, runnable: &Runnable, obj: Option<&Obj>) {
        self.retain_unmatched(|m| matches_target(m, target) && matches_callback(m, runnable) && m.matches_obj(obj));
    }

    pub fn remove_callbacks_and_messages(&self, target: &Handler, obj: Option<&Obj>) {
        self.retain_unmatched(|m| matches_target(m, target) && m.matches_obj(obj));
    }

    /// Drops every message for which `predicate` returns true, recycling
    /// it first. A `VecDeque::retain` sweep is the safe-Rust equivalent
    /// of the original's split head/after-head unlink loops: both visit
    /// every node once and leave survivors' relative order untouched.
    fn retain_unmatched(&self, predicate: impl Fn(&Message) -> bool) {
        let mut inner = self.inner.lock();
        let mut removed = Vec::new();
        inner.messages.retain_mut(|m| {
            if predicate(m) {
                removed.push(std::mem::replace(m, Message::new(0)));
                false
            } else {
                true
            }
        });
        drop(inner);
        for mut message in removed {
            message.recycle();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_target(message: &Message, target: &Handler) -> bool {
    message.target.as_ref().is_some_and(|t| t == target)
}

fn matches_callback(message: &Message, runnable: &Runnable) -> bool {
    message.callback.as_ref().is_some_and(|c| Arc::ptr_eq(c, runnable))
}

fn matches(message: &Message, target: &Handler, what: Option<i32>, obj: Option<&Obj>) -> bool {
    matches_target(message, target)
        && what.is_none_or(|w| message.what == w)
        && message.matches_obj(obj)
}

#[cfg(test)]
#[path = "message_queue_tests.rs"]
mod tests;
