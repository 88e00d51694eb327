// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide timeout scheduler backing `orTimeout`/
//! `completeOnTimeout`/`await`: a dedicated Looper thread (spec §5) that
//! runs delayed callbacks and whose pending entries can be cancelled.

use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::handler::Handler;
use crate::looper::Looper;
use crate::message::Runnable;

fn scheduler_handler() -> Option<&'static Handler> {
    static HANDLER: OnceLock<Option<Handler>> = OnceLock::new();
    HANDLER
        .get_or_init(|| match Looper::spawn("mindroid-timeout-scheduler") {
            Ok((looper, _join)) => Some(Handler::new(looper)),
            Err(error) => {
                error!(%error, "failed to start timeout scheduler thread; timeouts will never fire");
                None
            }
        })
        .as_ref()
}

/// A handle to a scheduled timeout callback, usable to cancel it before
/// it fires (spec §5: "cancellation of a pending timeout removes the
/// callback from that Looper's queue").
pub struct TimeoutHandle {
    runnable: Option<Runnable>,
}

impl TimeoutHandle {
    pub fn cancel(&self) {
        if let (Some(handler), Some(runnable)) = (scheduler_handler(), &self.runnable) {
            handler.remove_callbacks(runnable, None);
        }
    }
}

/// Schedules `callback` to run after `delay_ms` on the timeout
/// scheduler's Looper. Returns a handle that cancels the callback if it
/// hasn't fired yet.
pub fn schedule(delay_ms: u64, callback: impl Fn() + Send + Sync + 'static) -> TimeoutHandle {
    let runnable: Runnable = Arc::new(callback);
    match scheduler_handler() {
        Some(handler) => {
            let _ = handler.post_delayed(runnable.clone(), delay_ms);
            TimeoutHandle { runnable: Some(runnable) }
        }
        None => TimeoutHandle { runnable: None },
    }
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
