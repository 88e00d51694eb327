// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Thenable/Promise composition engine, ported from
//! `mindroid/util/concurrent/Promise.h` (itself a port of
//! `java.util.concurrent.CompletableFuture`).
//!
//! A Promise's completed value is shared with every dependent Action
//! fanned out from it; since Rust has no implicit reference semantics
//! for arbitrary `T`, this requires `T: Clone` — the one departure from
//! a literal port, recorded in `DESIGN.md`.

mod exception;
mod timeout;

pub use exception::Exception;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar};
use std::time::Duration;

use parking_lot::Mutex;

use crate::executor::Executor;
use crate::message::Runnable;

/// The bound every Promise's value type must satisfy: shareable with
/// every fanned-out dependent Action, movable across executor threads.
pub trait PromiseValue: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> PromiseValue for T {}

type DependentAction<T> = Box<dyn FnOnce(Result<T, Exception>) + Send>;

enum State<T: PromiseValue> {
    Pending(Vec<(DependentAction<T>, Option<Executor>)>),
    Fulfilled(T),
    Rejected(Exception),
}

struct Shared<T: PromiseValue> {
    state: Mutex<State<T>>,
    condvar: Condvar,
    default_executor: Option<Executor>,
}

/// A completion state plus its dependent-action graph.
pub struct Promise<T: PromiseValue> {
    shared: Arc<Shared<T>>,
}

impl<T: PromiseValue> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T: PromiseValue> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PromiseValue> Promise<T> {
    pub fn new() -> Self {
        Self::with_default_executor(None)
    }

    pub fn with_default_executor(executor: Option<Executor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Pending(Vec::new())),
                condvar: Condvar::new(),
                default_executor: executor,
            }),
        }
    }

    pub fn completed(value: T) -> Self {
        Self { shared: Arc::new(Shared { state: Mutex::new(State::Fulfilled(value)), condvar: Condvar::new(), default_executor: None }) }
    }

    pub fn failed(exception: Exception) -> Self {
        Self { shared: Arc::new(Shared { state: Mutex::new(State::Rejected(exception)), condvar: Condvar::new(), default_executor: None }) }
    }

    /// Completes with `value`. Returns `false` if already terminal.
    pub fn complete(&self, value: T) -> bool {
        self.finish(Ok(value))
    }

    /// Completes exceptionally. Returns `false` if already terminal.
    pub fn complete_with_exception(&self, exception: Exception) -> bool {
        self.finish(Err(exception))
    }

    /// Relays another Promise's eventual completion into this one.
    pub fn complete_with(&self, source: &Promise<T>) {
        let this = self.clone();
        source.register(None, move |result| {
            this.finish(result);
        });
    }

    /// Completes with a cancellation. Returns `true` if this call
    /// performed the transition, or if the Promise is already cancelled.
    pub fn cancel(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        self.complete_with_exception(Exception::cancelled())
    }

    fn finish(&self, result: Result<T, Exception>) -> bool {
        let mut state = self.shared.state.lock();
        let pending_actions = match &mut *state {
            State::Pending(actions) => std::mem::take(actions),
            _ => return false,
        };
        *state = match &result {
            Ok(value) => State::Fulfilled(value.clone()),
            Err(exception) => State::Rejected(exception.clone()),
        };
        drop(state);
        self.shared.condvar.notify_all();
        for (action, executor) in pending_actions {
            dispatch(action, result.clone(), executor);
        }
        true
    }

    pub fn is_done(&self) -> bool {
        !matches!(&*self.shared.state.lock(), State::Pending(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Rejected(e) if e.is_cancelled())
    }

    pub fn is_completed_exceptionally(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Rejected(_))
    }

    /// Blocks indefinitely until completion.
    pub fn get(&self) -> Result<T, Exception> {
        let mut state = self.shared.state.lock();
        loop {
            match &*state {
                State::Pending(_) => self.shared.condvar.wait(&mut state),
                State::Fulfilled(value) => return Ok(value.clone()),
                State::Rejected(exception) => return Err(exception.clone().unwrap_for_get()),
            }
        }
    }

    /// Blocks until completion or `timeout` elapses.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, Exception> {
        let mut state = self.shared.state.lock();
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match &*state {
                State::Fulfilled(value) => return Ok(value.clone()),
                State::Rejected(exception) => return Err(exception.clone().unwrap_for_get()),
                State::Pending(_) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return Err(Exception::timeout().unwrap_for_get());
                    }
                    let remaining = deadline - now;
                    let timed_out = self.shared.condvar.wait_for(&mut state, remaining).timed_out();
                    if timed_out && matches!(&*state, State::Pending(_)) {
                        return Err(Exception::timeout().unwrap_for_get());
                    }
                }
            }
        }
    }

    /// Registers a dependent action, dispatching immediately (subject to
    /// the caller's own claim discipline) if already terminal.
    fn register(&self, executor: Option<Executor>, action: impl FnOnce(Result<T, Exception>) + Send + 'static) {
        let boxed: DependentAction<T> = Box::new(action);
        let mut state = self.shared.state.lock();
        match &mut *state {
            State::Pending(actions) => actions.push((boxed, executor)),
            State::Fulfilled(value) => {
                let value = value.clone();
                drop(state);
                dispatch(boxed, Ok(value), executor);
            }
            State::Rejected(exception) => {
                let exception = exception.clone();
                drop(state);
                dispatch(boxed, Err(exception), executor);
            }
        }
    }

    fn resolved_executor(&self, executor: Option<Executor>) -> Option<Executor> {
        executor.or_else(|| self.shared.default_executor.clone())
    }

    // ---- operators -------------------------------------------------

    pub fn then_apply<U>(&self, f: impl FnOnce(T) -> U + Send + 'static) -> Promise<U>
    where
        U: PromiseValue,
    {
        self.then_apply_on(f, None)
    }

    pub fn then_apply_on<U>(&self, f: impl FnOnce(T) -> U + Send + 'static, executor: Option<Executor>) -> Promise<U>
    where
        U: PromiseValue,
    {
        let executor = self.resolved_executor(executor);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| match result {
            Ok(value) => {
                child_clone.complete(f(value));
            }
            Err(exception) => {
                child_clone.complete_with_exception(exception.normalize_for_dependent());
            }
        });
        child
    }

    /// `thenApply(fn: (T, Exception?) -> U)`: invoked on both outcomes.
    pub fn then_apply_both<U>(&self, f: impl FnOnce(Option<T>, Option<Exception>) -> U + Send + 'static) -> Promise<U>
    where
        U: PromiseValue,
    {
        let executor = self.resolved_executor(None);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| {
            let value = match &result {
                Ok(v) => (Some(v.clone()), None),
                Err(e) => (None, Some(e.clone().normalize_for_dependent())),
            };
            child_clone.complete(f(value.0, value.1));
        });
        child
    }

    pub fn then_compose<U>(&self, f: impl FnOnce(T) -> Promise<U> + Send + 'static) -> Promise<U>
    where
        U: PromiseValue,
    {
        let executor = self.resolved_executor(None);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| match result {
            Ok(value) => child_clone.complete_with(&f(value)),
            Err(exception) => {
                child_clone.complete_with_exception(exception.normalize_for_dependent());
            }
        });
        child
    }

    pub fn then_accept(&self, f: impl FnOnce(T) + Send + 'static) -> Promise<T> {
        self.then_apply(move |value| {
            f(value.clone());
            value
        })
    }

    pub fn then_accept_both(&self, f: impl FnOnce(Option<T>, Option<Exception>) + Send + 'static) -> Promise<T> {
        let executor = self.resolved_executor(None);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| {
            match &result {
                Ok(v) => f(Some(v.clone()), None),
                Err(e) => f(None, Some(e.clone().normalize_for_dependent())),
            }
            match result {
                Ok(value) => {
                    child_clone.complete(value);
                }
                Err(exception) => {
                    child_clone.complete_with_exception(exception.normalize_for_dependent());
                }
            }
        });
        child
    }

    pub fn then_run(&self, f: impl FnOnce() + Send + 'static) -> Promise<T> {
        self.then_accept(move |_| f())
    }

    /// Invoked only on an exceptional source; recovers with a value of
    /// the same type (a non-exceptional source's value passes through
    /// unchanged).
    pub fn catch_exception(&self, f: impl FnOnce(Exception) -> T + Send + 'static) -> Promise<T> {
        let executor = self.resolved_executor(None);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| match result {
            Ok(value) => {
                child_clone.complete(value);
            }
            Err(exception) => {
                child_clone.complete(f(exception.normalize_for_dependent()));
            }
        });
        child
    }

    /// A recovery observer: runs only on an exceptional source, then
    /// propagates the original exception onward.
    pub fn catch_exception_observe(&self, f: impl FnOnce(Exception) + Send + 'static) -> Promise<T> {
        let executor = self.resolved_executor(None);
        let child = Promise::with_default_executor(executor.clone());
        let child_clone = child.clone();
        self.register(executor, move |result| match result {
            Ok(value) => {
                child_clone.complete(value);
            }
            Err(exception) => {
                let exception = exception.normalize_for_dependent();
                f(exception.clone());
                child_clone.complete_with_exception(exception);
            }
        });
        child
    }

    // ---- time operators ---------------------------------------------

    /// Completes exceptionally with a `TimeoutException` if still
    /// pending after `delay_ms`.
    pub fn or_timeout(&self, delay_ms: u64) -> Promise<T> {
        let child = self.then_apply(|v| v);
        let timeout_target = child.clone();
        let handle = timeout::schedule(delay_ms, move || {
            timeout_target.complete_with_exception(Exception::timeout());
        });
        child.register(None, move |_| handle.cancel());
        child
    }

    /// Completes with `value` if still pending after `delay_ms`.
    pub fn complete_on_timeout(&self, value: T, delay_ms: u64) -> Promise<T> {
        let child = self.then_apply(|v| v);
        let timeout_target = child.clone();
        let handle = timeout::schedule(delay_ms, move || {
            timeout_target.complete(value.clone());
        });
        child.register(None, move |_| handle.cancel());
        child
    }

    /// Starts a `complete_on_timeout`-style delay once the source
    /// completes, returning a Promise that resolves `delay_ms` after
    /// this one does (with the same value).
    pub fn await_delay(&self, delay_ms: u64) -> Promise<T> {
        let result_promise = Promise::new();
        let result_clone = result_promise.clone();
        self.register(None, move |result| match result {
            Ok(value) => {
                let target = result_clone.clone();
                timeout::schedule(delay_ms, move || {
                    target.complete(value.clone());
                });
            }
            Err(exception) => {
                result_clone.complete_with_exception(exception.normalize_for_dependent());
            }
        });
        result_promise
    }
}

fn dispatch<T: PromiseValue>(action: DependentAction<T>, result: Result<T, Exception>, executor: Option<Executor>) {
    match executor {
        Some(executor) => {
            let runnable = once_runnable(move || action(result));
            if executor.execute(runnable).is_err() {
                tracing::error!("promise dependent action dropped: executor is shut down");
            }
        }
        None => action(result),
    }
}

/// Adapts a `FnOnce` into the `Fn() + Send + Sync` shape `Executor`
/// expects, via interior mutability. Called exactly once.
fn once_runnable(f: impl FnOnce() + Send + 'static) -> Runnable {
    let cell = Mutex::new(Some(Box::new(f) as Box<dyn FnOnce() + Send>));
    Arc::new(move || {
        if let Some(f) = cell.lock().take() {
            f();
        }
    })
}

// ---- combinators -----------------------------------------------------

/// `allOf(promises)`: completes with `()` when every input completes;
/// the first exception observed wins. Implemented as a flat fan-in with
/// an atomic remaining-count and a claim latch on the exception path,
/// rather than the original's balanced binary AND-tree of BiRelay nodes
/// — the tree shape is an internal fanout-depth optimization in the
/// source, not part of the observable contract in spec §8.
pub fn all_of<T: PromiseValue>(promises: Vec<Promise<T>>) -> Promise<()> {
    if promises.is_empty() {
        return Promise::completed(());
    }

    let result = Promise::new();
    let remaining = Arc::new(AtomicUsize::new(promises.len()));
    let claimed = Arc::new(AtomicBool::new(false));

    for promise in promises {
        let result = result.clone();
        let remaining = remaining.clone();
        let claimed = claimed.clone();
        promise.register(None, move |outcome| match outcome {
            Ok(_) => {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1
                    && claimed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) == Ok(false)
                {
                    result.complete(());
                }
            }
            Err(exception) => {
                if claimed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) == Ok(false) {
                    result.complete_with_exception(exception.normalize_for_dependent());
                }
            }
        });
    }

    result
}

/// `anyOf(promises)`: the first input to complete wins via a claim
/// latch; later completions are no-ops. `anyOf([])` is forever pending.
pub fn any_of<T: PromiseValue>(promises: Vec<Promise<T>>) -> Promise<T> {
    let result = Promise::new();
    let claimed = Arc::new(AtomicBool::new(false));

    for promise in promises {
        let result = result.clone();
        let claimed = claimed.clone();
        promise.register(None, move |outcome| {
            if claimed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) == Ok(false) {
                match outcome {
                    Ok(value) => {
                        result.complete(value);
                    }
                    Err(exception) => {
                        result.complete_with_exception(exception.normalize_for_dependent());
                    }
                }
            }
        });
    }

    result
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
