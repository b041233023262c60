//! Bounded batch runner tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vidcover::{BatchRunner, VidcoverError};

#[test]
fn zero_limit_is_rejected() {
    let result = BatchRunner::new(0);
    assert!(matches!(result, Err(VidcoverError::InvalidConcurrency(0))));
}

#[tokio::test]
async fn twenty_three_items_run_in_three_waves() {
    let runner = BatchRunner::new(10).unwrap();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let outcome = runner
        .run((0..23).collect(), |item: usize| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(running, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                item * 10
            }
        })
        .await;

    assert_eq!(outcome.wave_sizes, vec![10, 10, 3]);
    assert_eq!(peak.load(Ordering::SeqCst), 10);
    assert_eq!(outcome.outputs, (0..23).map(|item| item * 10).collect::<Vec<_>>());
}

#[tokio::test]
async fn failures_do_not_abort_the_batch() {
    let runner = BatchRunner::new(10).unwrap();
    let settled = AtomicUsize::new(0);

    let outcome = runner
        .run((0..23).collect(), |item: usize| {
            let settled = &settled;
            async move {
                tokio::task::yield_now().await;
                settled.fetch_add(1, Ordering::SeqCst);
                Err::<(), String>(format!("item {item} failed"))
            }
        })
        .await;

    assert_eq!(settled.load(Ordering::SeqCst), 23);
    assert_eq!(outcome.wave_sizes, vec![10, 10, 3]);
    assert_eq!(outcome.outputs.len(), 23);
    assert!(outcome.outputs.iter().all(Result::is_err));
    assert_eq!(outcome.outputs[22], Err("item 22 failed".to_string()));
}

#[tokio::test]
async fn empty_input_runs_no_waves() {
    let runner = BatchRunner::new(4).unwrap();
    let outcome = runner.run(Vec::<u8>::new(), |item| async move { item }).await;
    assert!(outcome.outputs.is_empty());
    assert!(outcome.wave_sizes.is_empty());
}

#[tokio::test]
async fn a_wave_starts_only_after_the_previous_one_settles() {
    let runner = BatchRunner::new(3).unwrap();
    let finished = Arc::new(AtomicUsize::new(0));

    // Each action sees how many actions had finished when it started.
    let outcome = runner
        .run((0..7).collect(), |_: usize| {
            let finished = Arc::clone(&finished);
            async move {
                let seen = finished.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                finished.fetch_add(1, Ordering::SeqCst);
                seen
            }
        })
        .await;

    assert_eq!(outcome.outputs, vec![0, 0, 0, 3, 3, 3, 6]);
}
