// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mindroid-core: Message/MessageQueue/Looper/Handler/Executor and the
//! Thenable/Promise composition engine — the concurrency core of the
//! Mindroid runtime, with no networking and no registry.

pub mod bundle;
pub mod clock;
pub mod executor;
pub mod handler;
pub mod ids;
pub mod looper;
pub mod message;
pub mod message_queue;
pub mod promise;
pub mod uri;

pub use bundle::{Bundle, BundleValue};
pub use clock::{Clock, FakeClock, SystemClock};
pub use executor::{Executor, ExecutorError};
pub use handler::{Handler, HandlerCallback, HandlerError};
pub use ids::{BinderId, InvalidNodeId, LocalIdAllocator, NodeId};
pub use looper::{Looper, LooperError};
pub use message::{Message, Obj, ReplyPromise, Runnable};
pub use message_queue::{MessageQueue, MessageQueueError};
pub use promise::{all_of, any_of, Exception, Promise, PromiseValue};
pub use uri::{Authority, Uri, UriError, INTERFACE_DESCRIPTOR_KEY};
