// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::{Duration, Instant};

use mindroid_core::{all_of, Promise};

/// `p1` completes at T+10ms with 1, `p2` at T+30ms with 2, `p3` at
/// T+20ms with 3. `allOf([p1,p2,p3]).get()` returns at T+30ms ±
/// scheduling — i.e. not before the slowest input completes.
#[test]
fn all_of_waits_for_the_slowest_input() {
    let p1: Promise<i32> = Promise::new();
    let p2: Promise<i32> = Promise::new();
    let p3: Promise<i32> = Promise::new();

    complete_after(p1.clone(), 1, 10);
    complete_after(p2.clone(), 2, 30);
    complete_after(p3.clone(), 3, 20);

    let start = Instant::now();
    all_of(vec![p1, p2, p3]).get().unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(30), "allOf returned before its slowest input: {elapsed:?}");
}

/// `allOf([])` completes with `Unit` synchronously.
#[test]
fn all_of_empty_completes_immediately() {
    let result: Promise<()> = all_of(Vec::<Promise<()>>::new());
    assert!(result.is_done());
    result.get().unwrap();
}

/// The first exception observed among the inputs wins; a later,
/// successful completion among the others does not overwrite it.
#[test]
fn all_of_fails_on_the_first_exception() {
    let p1: Promise<i32> = Promise::new();
    let p2: Promise<i32> = Promise::new();

    complete_after(p2.clone(), 2, 20);
    p1.complete_with_exception(mindroid_core::Exception::remote("boom"));

    let result = all_of(vec![p1, p2]).get();
    assert!(result.is_err());
}

fn complete_after(promise: Promise<i32>, value: i32, delay_ms: u64) {
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(delay_ms));
        promise.complete(value);
    });
}
