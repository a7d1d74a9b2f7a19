//! Tests for SerialQueue
//!
//! These tests verify:
//! - FIFO execution per lane
//! - At most one running operation per lane
//! - Independence of different lanes
//! - Recovery after failing or panicking operations
//! - Every submitted operation completes under contention

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::bounded;
use flatdoc::queue::SerialQueue;
use flatdoc::FlatDocError;
use parking_lot::Mutex;

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_same_lane_runs_in_submission_order() {
    let queue = SerialQueue::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let pending: Vec<_> = (0..100)
        .map(|i| {
            let log = Arc::clone(&log);
            queue
                .enqueue("orders", move || {
                    log.lock().push(i);
                    Ok(i)
                })
                .unwrap()
        })
        .collect();

    for (i, p) in pending.into_iter().enumerate() {
        assert_eq!(p.wait().unwrap(), i);
    }

    assert_eq!(*log.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_same_lane_never_overlaps() {
    let queue = Arc::new(SerialQueue::new());
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            thread::spawn(move || {
                for _ in 0..10 {
                    let active = Arc::clone(&active);
                    let max_active = Arc::clone(&max_active);
                    queue
                        .run("users", move || {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_active.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(200));
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Lane Independence Tests
// =============================================================================

#[test]
fn test_different_lanes_run_concurrently() {
    let queue = SerialQueue::new();
    let (tx, rx) = bounded::<()>(1);

    // Lane "a" can only finish once lane "b" has run
    let waiting = queue
        .enqueue("a", move || {
            rx.recv_timeout(Duration::from_secs(5))
                .map_err(|_| FlatDocError::Config("lane b never ran".to_string()))
        })
        .unwrap();

    queue
        .run("b", move || {
            tx.send(()).unwrap();
            Ok(())
        })
        .unwrap();

    waiting.wait().unwrap();
    assert_eq!(queue.lane_count(), 2);
}

// =============================================================================
// Failure Recovery Tests
// =============================================================================

#[test]
fn test_error_does_not_block_lane() {
    let queue = SerialQueue::new();

    let failed = queue.enqueue("coupons", || -> flatdoc::Result<()> {
        Err(FlatDocError::InvalidDocument("boom".to_string()))
    });
    let next = queue.enqueue("coupons", || Ok("next")).unwrap();

    assert!(failed.unwrap().wait().is_err());
    assert_eq!(next.wait().unwrap(), "next");
}

#[test]
fn test_panic_is_reported_and_lane_continues() {
    let queue = SerialQueue::new();

    let panicked = queue
        .enqueue("carts", || -> flatdoc::Result<()> { panic!("operation blew up") })
        .unwrap();
    let next = queue.enqueue("carts", || Ok(1 + 1)).unwrap();

    match panicked.wait() {
        Err(FlatDocError::OperationPanicked(lane)) => assert_eq!(lane, "carts"),
        other => panic!("expected OperationPanicked, got {:?}", other),
    }
    assert_eq!(next.wait().unwrap(), 2);
}

#[test]
fn test_dropped_pending_still_runs() {
    let queue = SerialQueue::new();
    let counter = Arc::new(AtomicUsize::new(0));

    {
        let counter = Arc::clone(&counter);
        let _ = queue.enqueue("payments", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    // Anything queued behind it only runs after it
    let seen = {
        let counter = Arc::clone(&counter);
        queue
            .run("payments", move || Ok(counter.load(Ordering::SeqCst)))
            .unwrap()
    };
    assert_eq!(seen, 1);
}

// =============================================================================
// Contention Tests
// =============================================================================

#[test]
fn test_concurrent_submitters_all_complete() {
    let queue = Arc::new(SerialQueue::new());
    let total = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..10)
        .map(|t| {
            let queue = Arc::clone(&queue);
            let total = Arc::clone(&total);
            thread::spawn(move || {
                let lane = if t % 2 == 0 { "even" } else { "odd" };
                for _ in 0..50 {
                    let total = Arc::clone(&total);
                    queue
                        .run(lane, move || {
                            total.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), 500);
}
