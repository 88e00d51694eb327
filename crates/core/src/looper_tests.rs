// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::handler::{Handler, HandlerCallback};
use crate::message::Message;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

#[test]
fn prepare_binds_current_thread_looper() {
    std::thread::spawn(|| {
        assert!(Looper::my_looper().is_none());
        let looper = Looper::prepare().unwrap();
        assert_eq!(Looper::my_looper(), Some(looper));
    })
    .join()
    .unwrap();
}

#[test]
fn prepare_twice_on_same_thread_fails() {
    std::thread::spawn(|| {
        Looper::prepare().unwrap();
        assert_eq!(Looper::prepare().unwrap_err(), LooperError::AlreadyPrepared);
    })
    .join()
    .unwrap();
}

#[test]
fn spawn_returns_a_usable_looper() {
    let (looper, join) = Looper::spawn("looper-test-spawn").unwrap();
    assert!(!looper.is_current_thread());
    looper.quit();
    join.join().unwrap();
}

struct CountingCallback(Arc<AtomicI32>);
impl HandlerCallback for CountingCallback {
    fn handle_message(&self, message: Message) {
        self.0.fetch_add(message.what, Ordering::SeqCst);
    }
}

#[test]
fn run_dispatches_messages_in_order_then_stops_on_quit() {
    let (looper, join) = Looper::spawn("looper-test-dispatch").unwrap();
    let total = Arc::new(AtomicI32::new(0));
    let handler = Handler::with_callback(looper.clone(), Arc::new(CountingCallback(total.clone())));

    handler.send_message(Message::new(1).with_target(handler.clone())).unwrap();
    handler.send_message(Message::new(2).with_target(handler.clone())).unwrap();
    handler.post(Arc::new(move || {})).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));
    looper.quit();
    join.join().unwrap();

    assert_eq!(total.load(Ordering::SeqCst), 3);
}

#[test]
fn panicking_callback_does_not_kill_the_looper() {
    let (looper, join) = Looper::spawn("looper-test-panic").unwrap();
    let survived = Arc::new(AtomicI32::new(0));
    let survived_clone = survived.clone();
    let handler = Handler::new(looper.clone());

    handler.post(Arc::new(|| panic!("boom"))).unwrap();
    handler.post(Arc::new(move || {
        survived_clone.store(1, Ordering::SeqCst);
    }))
    .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));
    looper.quit();
    join.join().unwrap();

    assert_eq!(survived.load(Ordering::SeqCst), 1);
}

#[test]
fn quit_makes_is_quitting_true() {
    let (looper, join) = Looper::spawn("looper-test-quit").unwrap();
    assert!(!looper.is_quitting());
    looper.quit();
    assert!(looper.is_quitting());
    join.join().unwrap();
}
