// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::handler::Handler;
use crate::looper::Looper;
use std::sync::Arc;

fn test_handler() -> Handler {
    let (looper, _join) = Looper::spawn("mq-test").unwrap();
    Handler::new(looper)
}

#[test]
fn enqueue_rejects_message_with_no_target() {
    let queue = MessageQueue::new(FakeClock::new());
    let message = Message::new(1);
    assert_eq!(queue.enqueue(message, 0), Err(MessageQueueError::NoTarget));
}

#[test]
fn enqueue_rejects_in_use_message() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    let mut message = Message::new(1).with_target(target);
    message.in_use = true;
    assert_eq!(queue.enqueue(message, 0), Err(MessageQueueError::AlreadyInUse));
}

#[test]
fn quitting_queue_rejects_and_recycles() {
    let queue = MessageQueue::new(FakeClock::new());
    queue.quit();
    let target = test_handler();
    let message = Message::new(1).with_target(target);
    assert_eq!(queue.enqueue(message, 0), Err(MessageQueueError::Quitting));
}

#[test]
fn head_has_smallest_when() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target.clone()), 100).unwrap();
    queue.enqueue(Message::new(2).with_target(target.clone()), 50).unwrap();
    queue.enqueue(Message::new(3).with_target(target), 200).unwrap();

    let head = queue.dequeue().unwrap();
    assert_eq!(head.what, 2);
}

#[test]
fn fifo_among_equal_when() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target.clone()), 10).unwrap();
    queue.enqueue(Message::new(2).with_target(target.clone()), 10).unwrap();
    queue.enqueue(Message::new(3).with_target(target), 10).unwrap();

    assert_eq!(queue.dequeue().unwrap().what, 1);
    assert_eq!(queue.dequeue().unwrap().what, 2);
    assert_eq!(queue.dequeue().unwrap().what, 3);
}

#[test]
fn when_zero_inserts_at_head() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target.clone()), 10).unwrap();
    queue.enqueue(Message::new(2).with_target(target), 0).unwrap();

    assert_eq!(queue.dequeue().unwrap().what, 2);
}

#[test]
fn remove_messages_matches_what_and_wildcard_obj() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target.clone()), 1_000).unwrap();
    queue.enqueue(Message::new(2).with_target(target.clone()), 2_000).unwrap();
    queue.enqueue(Message::new(1).with_target(target.clone()), 3_000).unwrap();

    queue.remove_messages(&target, Some(1), None);
    assert_eq!(queue.len(), 1);
}

#[test]
fn remove_messages_with_obj_is_identity_match() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    let obj_a: Obj = Arc::new(1i32);
    let obj_b: Obj = Arc::new(2i32);
    queue.enqueue(Message::new(1).with_target(target.clone()).with_obj(obj_a.clone()), 1_000).unwrap();
    queue.enqueue(Message::new(1).with_target(target.clone()).with_obj(obj_b.clone()), 2_000).unwrap();

    queue.remove_messages(&target, Some(1), Some(&obj_a));
    assert_eq!(queue.len(), 1);
    let remaining = queue.dequeue();
    assert!(remaining.is_none() || remaining.unwrap().matches_obj(Some(&obj_b)));
}

#[test]
fn has_messages_does_not_mutate() {
    let queue = MessageQueue::new(FakeClock::new());
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target.clone()), 1_000).unwrap();
    assert!(queue.has_messages(&target, Some(1), None));
    assert_eq!(queue.len(), 1);
}

#[test]
fn dequeue_returns_none_after_quit() {
    let queue = MessageQueue::new(FakeClock::new());
    queue.quit();
    assert!(queue.dequeue().is_none());
}

#[test]
fn dequeue_waits_for_due_time() {
    let clock = FakeClock::new();
    let queue = Arc::new(MessageQueue::new(clock.clone()));
    let target = test_handler();
    queue.enqueue(Message::new(1).with_target(target), 50).unwrap();

    let queue_clone = queue.clone();
    let handle = std::thread::spawn(move || queue_clone.dequeue());

    std::thread::sleep(std::time::Duration::from_millis(10));
    clock.advance(std::time::Duration::from_millis(60));

    let message = handle.join().unwrap();
    assert_eq!(message.unwrap().what, 1);
}
