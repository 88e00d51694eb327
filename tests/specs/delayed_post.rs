// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mindroid_core::{Handler, Looper};

/// Create Handler on new Looper. `postDelayed(r, 50)`. `r` runs at
/// `t >= 50ms` and `t < 100ms`. `quit()` after `r` returns; thread joins.
#[test]
fn delayed_runnable_fires_within_its_scheduled_window() {
    let (looper, join) = Looper::spawn("spec-delayed-post").unwrap();
    let handler = Handler::new(looper.clone());

    let start = Instant::now();
    let fired_at_ms = Arc::new(AtomicU64::new(0));
    let fired_at_ms_clone = fired_at_ms.clone();

    handler
        .post_delayed(
            Arc::new(move || {
                fired_at_ms_clone.store(start.elapsed().as_millis() as u64, Ordering::SeqCst);
            }),
            50,
        )
        .unwrap();

    // Long enough that the 50ms-delayed runnable has certainly already
    // dispatched before quit() tears the queue down.
    std::thread::sleep(Duration::from_millis(80));
    looper.quit();
    join.join().unwrap();

    let fired_at = fired_at_ms.load(Ordering::SeqCst);
    assert!(fired_at > 0, "runnable never ran");
    assert!(fired_at >= 50, "runnable fired too early, at {fired_at}ms");
    assert!(fired_at < 100, "runnable fired too late, at {fired_at}ms");
}

/// Posting after `quit()` is a no-op error, not a panic, and the
/// looper thread still joins cleanly.
#[test]
fn quit_stops_the_looper_thread() {
    let (looper, join) = Looper::spawn("spec-delayed-post-quit").unwrap();
    assert!(!looper.is_quitting());
    looper.quit();
    join.join().unwrap();
    assert!(looper.is_quitting());
}
