// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor abstractions, ported from `mindroid/os/SerialExecutor.h`,
//! `Executors.cpp` and `Executor.h`: `Handler`-backed, `SerialExecutor`
//! (a private single-thread `Looper`), `ThreadPoolExecutor` (a fixed
//! worker set draining a blocking FIFO), and `InlineExecutor` — the
//! supplemented equivalent of the original's
//! `Executors::SYNCHRONOUS_EXECUTOR`, used as Binder's default
//! completion executor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::error;

use crate::handler::Handler;
use crate::looper::Looper;
use crate::message::Runnable;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("executor has been shut down")]
    ShutDown,
}

struct SerialExecutorInner {
    handler: Handler,
    join: Mutex<Option<std::thread::JoinHandle<()>>>,
    shutdown_allowed: bool,
}

struct ThreadPoolQueue {
    runnables: Mutex<VecDeque<Runnable>>,
    not_empty: Condvar,
    shutting_down: AtomicBool,
}

struct ThreadPoolInner {
    queue: Arc<ThreadPoolQueue>,
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,
    shutdown_allowed: bool,
}

/// A destination for posted work. Cloning is cheap; all variants share
/// their underlying dispatch target.
#[derive(Clone)]
pub enum Executor {
    /// Posts to a Handler's queue; serial with respect to that queue.
    Handler(Handler),
    /// A private single-thread Looper, for off-loading long work while
    /// preserving FIFO semantics for one logical actor.
    Serial(Arc<SerialExecutorInner>),
    /// A fixed-size worker pool draining a blocking FIFO of runnables.
    ThreadPool(Arc<ThreadPoolInner>),
    /// Runs `execute` inline, on the calling thread. The default
    /// completion executor for synchronous-looking transact paths.
    Inline,
}

impl Executor {
    pub fn handler(handler: Handler) -> Self {
        Executor::Handler(handler)
    }

    pub fn inline() -> Self {
        Executor::Inline
    }

    /// Spawns a dedicated named thread running a private Looper.
    pub fn serial(name: impl Into<String>, shutdown_allowed: bool) -> std::io::Result<Self> {
        let (looper, join) = Looper::spawn(name)?;
        let handler = Handler::new(looper);
        Ok(Executor::Serial(Arc::new(SerialExecutorInner {
            handler,
            join: Mutex::new(Some(join)),
            shutdown_allowed,
        })))
    }

    /// Spawns `size` named worker threads draining a shared FIFO.
    pub fn thread_pool(name: impl Into<String>, size: usize, shutdown_allowed: bool) -> Self {
        let name = name.into();
        let queue = Arc::new(ThreadPoolQueue {
            runnables: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            shutting_down: AtomicBool::new(false),
        });

        let workers = (0..size)
            .filter_map(|i| {
                let queue = queue.clone();
                std::thread::Builder::new()
                    .name(format!("{name}-{i}"))
                    .spawn(move || thread_pool_worker_loop(queue))
                    .ok()
            })
            .collect();

        Executor::ThreadPool(Arc::new(ThreadPoolInner { queue, workers: Mutex::new(workers), shutdown_allowed }))
    }

    /// Submits `runnable` for execution. Never blocks the caller beyond
    /// acquiring the destination's lock.
    pub fn execute(&self, runnable: Runnable) -> Result<(), ExecutorError> {
        match self {
            Executor::Handler(handler) => handler.post(runnable).map_err(|_| ExecutorError::ShutDown),
            Executor::Serial(inner) => inner.handler.post(runnable).map_err(|_| ExecutorError::ShutDown),
            Executor::ThreadPool(inner) => {
                if inner.queue.shutting_down.load(Ordering::Acquire) {
                    return Err(ExecutorError::ShutDown);
                }
                inner.queue.runnables.lock().push_back(runnable);
                inner.queue.not_empty.notify_one();
                Ok(())
            }
            Executor::Inline => {
                runnable();
                Ok(())
            }
        }
    }

    /// Removes `runnable` if it is still queued and has not yet started
    /// running. No preemption of in-flight work.
    pub fn cancel(&self, runnable: &Runnable) -> bool {
        match self {
            Executor::Handler(handler) => {
                let was_queued = handler.has_messages(0, None);
                handler.remove_callbacks(runnable, None);
                was_queued
            }
            Executor::Serial(inner) => {
                let was_queued = inner.handler.has_messages(0, None);
                inner.handler.remove_callbacks(runnable, None);
                was_queued
            }
            Executor::ThreadPool(inner) => {
                let mut runnables = inner.queue.runnables.lock();
                let before = runnables.len();
                runnables.retain(|r| !Arc::ptr_eq(r, runnable));
                runnables.len() != before
            }
            Executor::Inline => false,
        }
    }

    /// Shuts the executor down, if its construction allowed it. A
    /// disallowed shutdown is a no-op, matching singleton pools in the
    /// original that must outlive any one caller.
    pub fn shutdown(&self) {
        match self {
            Executor::Handler(_) | Executor::Inline => {}
            Executor::Serial(inner) => {
                if !inner.shutdown_allowed {
                    return;
                }
                inner.handler.looper().quit();
                if let Some(join) = inner.join.lock().take() {
                    if join.join().is_err() {
                        error!("serial executor thread panicked during shutdown");
                    }
                }
            }
            Executor::ThreadPool(inner) => {
                if !inner.shutdown_allowed {
                    return;
                }
                inner.queue.shutting_down.store(true, Ordering::Release);
                inner.queue.not_empty.notify_all();
                for join in inner.workers.lock().drain(..) {
                    if join.join().is_err() {
                        error!("thread pool worker panicked during shutdown");
                    }
                }
            }
        }
    }
}

fn thread_pool_worker_loop(queue: Arc<ThreadPoolQueue>) {
    loop {
        let runnable = {
            let mut runnables = queue.runnables.lock();
            loop {
                if let Some(runnable) = runnables.pop_front() {
                    break Some(runnable);
                }
                if queue.shutting_down.load(Ordering::Acquire) {
                    break None;
                }
                queue.not_empty.wait(&mut runnables);
            }
        };
        match runnable {
            Some(runnable) => {
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runnable())).is_err() {
                    error!("thread pool runnable panicked");
                }
            }
            None => break,
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
