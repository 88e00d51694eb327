// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The exception type carried by a rejected [`super::Promise`], with the
//! normalization rules from spec §4.4/§7: a dependent stage always sees
//! a `CompletionException` (unless the cause is itself a cancellation),
//! and blocking `get()` unwraps that into an `ExecutionException`.

use std::fmt;
use std::sync::Arc;

/// A cheaply cloneable, type-erased exception. Clonability is what lets
/// the same rejection reach every dependent Action fanned out from one
/// Promise.
#[derive(Clone)]
pub struct Exception(Arc<Kind>);

enum Kind {
    Cancelled,
    Timeout,
    Remote(String),
    User(Box<dyn std::error::Error + Send + Sync>),
    Completion(Exception),
    Execution(Exception),
}

impl Exception {
    pub fn cancelled() -> Self {
        Exception(Arc::new(Kind::Cancelled))
    }

    pub fn timeout() -> Self {
        Exception(Arc::new(Kind::Timeout))
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Exception(Arc::new(Kind::Remote(message.into())))
    }

    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Exception(Arc::new(Kind::User(Box::new(error))))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.0, Kind::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        match &*self.0 {
            Kind::Timeout => true,
            Kind::Completion(cause) | Kind::Execution(cause) => cause.is_timeout(),
            _ => false,
        }
    }

    /// Wraps in `CompletionException` unless already one, or unless this
    /// is a cancellation (which propagates as-is per spec §4.4/§5).
    pub fn normalize_for_dependent(self) -> Self {
        match &*self.0 {
            Kind::Cancelled | Kind::Completion(_) => self,
            _ => Exception(Arc::new(Kind::Completion(self))),
        }
    }

    /// `get()`'s unwrap: a `CompletionException` becomes an
    /// `ExecutionException` around the same cause; a cancellation is
    /// re-raised as-is; anything else (shouldn't normally reach `get()`
    /// unwrapped) is wrapped directly.
    pub fn unwrap_for_get(self) -> Self {
        match &*self.0 {
            Kind::Cancelled => self,
            Kind::Completion(cause) => Exception(Arc::new(Kind::Execution(cause.clone()))),
            _ => Exception(Arc::new(Kind::Execution(self))),
        }
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Kind::Cancelled => write!(f, "cancelled"),
            Kind::Timeout => write!(f, "timed out"),
            Kind::Remote(message) => write!(f, "remote exception: {message}"),
            Kind::User(error) => write!(f, "{error}"),
            Kind::Completion(cause) => write!(f, "completion exception: {cause}"),
            Kind::Execution(cause) => write!(f, "execution exception: {cause}"),
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.0 {
            Kind::Completion(cause) | Kind::Execution(cause) => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "exception_tests.rs"]
mod tests;
