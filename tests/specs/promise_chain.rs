// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mindroid_core::Promise;

/// `Promise(1).thenApply(x -> x + 1).thenApply(x -> x * 2).get() == 4`.
#[test]
fn then_apply_chain_computes_in_order() {
    let result = Promise::completed(1).then_apply(|x| x + 1).then_apply(|x| x * 2).get().unwrap();
    assert_eq!(result, 4);
}

/// An exception raised partway through a chain propagates to the end
/// without running the intervening `then_apply` steps.
#[test]
fn an_exception_short_circuits_the_rest_of_the_chain() {
    let ran_after_failure = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran_after_failure_clone = ran_after_failure.clone();

    let source: Promise<i32> = Promise::failed(mindroid_core::Exception::remote("boom"));
    let result = source
        .then_apply(move |x| {
            ran_after_failure_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            x * 2
        })
        .get();

    assert!(result.is_err());
    assert!(!ran_after_failure.load(std::sync::atomic::Ordering::SeqCst));
}
