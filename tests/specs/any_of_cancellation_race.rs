// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use mindroid_core::{any_of, Promise};

/// Four promises, one completes with value 42 immediately;
/// `anyOf(..).get() == 42`; the other three, completed later, do not
/// affect the consumer.
#[test]
fn any_of_resolves_to_the_first_completion_and_ignores_the_rest() {
    let immediate: Promise<i32> = Promise::completed(42);
    let slow_a: Promise<i32> = Promise::new();
    let slow_b: Promise<i32> = Promise::new();
    let slow_c: Promise<i32> = Promise::new();

    for (promise, value, delay_ms) in [(slow_a.clone(), 1, 20), (slow_b.clone(), 2, 30), (slow_c.clone(), 3, 40)] {
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay_ms));
            promise.complete(value);
        });
    }

    let result = any_of(vec![immediate, slow_a.clone(), slow_b.clone(), slow_c.clone()]).get().unwrap();
    assert_eq!(result, 42);

    // Give the late completions a chance to run; the already-resolved
    // consumer must be unaffected.
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(slow_a.get().unwrap(), 1);
    assert_eq!(slow_b.get().unwrap(), 2);
    assert_eq!(slow_c.get().unwrap(), 3);
}

/// `anyOf([])` is forever pending.
#[test]
fn any_of_empty_never_completes() {
    let result: Promise<()> = any_of(Vec::<Promise<()>>::new());
    assert!(!result.is_done());
    assert!(result.get_timeout(Duration::from_millis(50)).is_err());
}

/// The first exception among the inputs also wins the claim latch.
#[test]
fn any_of_can_resolve_exceptionally() {
    let p1: Promise<i32> = Promise::new();
    let p2: Promise<i32> = Promise::new();
    p1.complete_with_exception(mindroid_core::Exception::remote("first"));
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        p2.complete(7);
    });

    let result = any_of(vec![p1, p2]).get();
    assert!(result.is_err());
}
