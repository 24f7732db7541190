// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::{BreakerState, CircuitBreaker};

fn breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(threshold, Duration::from_millis(cooldown_ms))
}

// ── state derivation ──────────────────────────────────────────────────────

#[test]
fn starts_closed() {
    let b = breaker(5, 1000);
    assert_eq!(b.state(), BreakerState::Closed);
    assert!(!b.is_open());
    assert!(!b.is_half_open());
}

#[test]
fn stays_closed_below_threshold() {
    let b = breaker(5, 1000);
    for _ in 0..4 {
        b.record_failure();
    }
    assert_eq!(b.state(), BreakerState::Closed);
    assert_eq!(b.failures(), 4);
}

#[test]
fn opens_at_threshold() {
    let b = breaker(5, 1000);
    for _ in 0..5 {
        b.record_failure();
    }
    assert_eq!(b.state(), BreakerState::Open);
    assert!(b.is_open());
}

#[test]
fn half_open_after_cooldown() {
    let b = breaker(2, 20);
    b.record_failure();
    b.record_failure();
    assert_eq!(b.state(), BreakerState::Open);

    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(b.state(), BreakerState::HalfOpen);
    assert!(b.is_half_open());
}

// ── transitions ───────────────────────────────────────────────────────────

#[test]
fn success_closes_from_any_state() {
    let b = breaker(2, 1000);
    b.record_failure();
    b.record_failure();
    assert!(b.is_open());

    b.record_success();
    assert_eq!(b.state(), BreakerState::Closed);
    assert_eq!(b.failures(), 0);
}

#[test]
fn failure_while_tripped_restarts_cooldown() {
    let b = breaker(2, 40);
    b.record_failure();
    b.record_failure();

    // Wait into half-open, then fail the probe: cooldown restarts.
    std::thread::sleep(Duration::from_millis(50));
    assert!(b.is_half_open());
    b.record_failure();
    assert_eq!(b.state(), BreakerState::Open);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(b.state(), BreakerState::HalfOpen);
}

#[test]
fn success_resets_failure_count_entirely() {
    let b = breaker(3, 1000);
    b.record_failure();
    b.record_failure();
    b.record_success();
    b.record_failure();
    b.record_failure();
    // Two failures after a reset: still below threshold.
    assert_eq!(b.state(), BreakerState::Closed);
}
