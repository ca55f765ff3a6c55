//! Stress tests for the context lifecycle

use compute_context::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_cycles() {
    let mgr = ComputeContextManager::new(FakeBackend::new().with_platform(0).with_platform(4));

    for _ in 0..10_000 {
        mgr.initialize().unwrap();
        mgr.teardown();
    }

    assert_eq!(mgr.backend().live_handles(), 0);
    assert_eq!(mgr.backend().acquired(), 30_000);
}

#[test]
#[ignore]
fn stress_test_readers_during_cycles() {
    let mgr = ComputeContextManager::new(FakeBackend::new().with_platform(1));
    let seen = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    if let Some(ctx) = mgr.get() {
                        // A published context is always complete.
                        assert_eq!(
                            mgr.backend().queue_binding(ctx.queue()).map(|(d, _)| d),
                            Some(ctx.device())
                        );
                        seen.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }

        s.spawn(|| {
            for _ in 0..1_000 {
                mgr.initialize().unwrap();
                mgr.teardown();
            }
        });
    });

    assert!(mgr.get().is_none());
    assert_eq!(mgr.backend().live_handles(), 0);
    println!("reads that observed a live context: {}", seen.load(Ordering::Relaxed));
}
