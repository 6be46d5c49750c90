//! Batch dispatch over stub engines: ordering, round-robin and partial failure.

mod helpers;

use helpers::stub_engine::{StubPool, en, probe};
use sentipool::{ClientError, PoolError, PoolState, ScoreResult, WorkerPool};

#[test]
fn batch_results_follow_input_order_round_robin() {
    let stub = StubPool::new(20300, 3).flags(&["--echo-port"]);
    let mut pool = WorkerPool::new(en(), stub.config.clone()).unwrap();
    pool.start_all();

    let items: Vec<String> = (0..7).map(|i| format!("item {i}")).collect();
    let scores = pool.run_batch(&items).unwrap();

    let ports: Vec<i32> = scores.iter().map(|s| s.positive).collect();
    assert_eq!(ports, vec![20300, 20301, 20302, 20300, 20301, 20302, 20300]);
    pool.stop_all().unwrap();
}

#[test]
fn first_batch_starts_pool_lazily() {
    let stub = StubPool::new(20310, 2);
    let mut pool = WorkerPool::new(en(), stub.config.clone()).unwrap();
    assert_eq!(pool.status(), PoolState::Uninitialized);

    let scores = pool
        .run_batch(&["what a great day", "this is awful", "the sky"])
        .unwrap();

    assert_eq!(pool.status(), PoolState::Running(2));
    assert_eq!(
        scores,
        vec![
            ScoreResult::new(2, -1, 1),
            ScoreResult::new(1, -2, -1),
            ScoreResult::new(1, -1, 0),
        ]
    );
    pool.stop_all().unwrap();
}

#[test]
fn text_survives_encoding_round_trip() {
    let stub = StubPool::new(20320, 1);
    let mut pool = WorkerPool::new(en(), stub.config.clone()).unwrap();

    // Reserved characters and non-ASCII must reach the engine intact
    let score = pool.score("good? bad&sad #1 / 100% café").unwrap();

    assert_eq!(score, ScoreResult::new(2, -3, -1));
    pool.stop_all().unwrap();
}

#[test]
fn concurrency_cap_does_not_change_results() {
    let mut stub = StubPool::new(20330, 3).flags(&["--echo-port"]);
    stub.config.concurrency = Some(1);
    let mut pool = WorkerPool::new(en(), stub.config.clone()).unwrap();

    let items = vec!["x"; 5];
    let ports: Vec<i32> = pool
        .run_batch(&items)
        .unwrap()
        .iter()
        .map(|s| s.positive)
        .collect();

    assert_eq!(ports, vec![20330, 20331, 20332, 20330, 20331]);
    pool.stop_all().unwrap();
}

#[cfg(unix)]
#[test]
fn externally_killed_worker_fails_only_its_items() {
    let stub = StubPool::new(20340, 2).flags(&["--echo-port"]);
    let mut pool = WorkerPool::new(en(), stub.config.clone()).unwrap();
    assert_eq!(pool.start_all(), 2);

    let victim = pool
        .workers()
        .find(|w| w.port() == 20341)
        .and_then(|w| w.pid())
        .unwrap();
    helpers::stub_engine::kill_group(victim);
    assert!(helpers::wait_until(
        std::time::Duration::from_secs(5),
        || !probe().exists(20341)
    ));

    let items = ["a", "b", "c", "d"];
    let outcomes = pool.run_batch_outcomes(&items).unwrap();

    assert_eq!(outcomes.len(), 4);
    for (i, outcome) in outcomes.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(outcome.as_ref().unwrap().positive, 20340);
        } else {
            let err = outcome.as_ref().unwrap_err();
            assert!(err.is_unreachable(), "{err:?}");
            assert_eq!(err.port(), 20341);
        }
    }

    let err = pool.run_batch(&items).unwrap_err();
    assert!(
        matches!(
            err,
            PoolError::Item {
                index: 1,
                source: ClientError::Unreachable { port: 20341, .. }
            }
        ),
        "{err:?}"
    );

    // The dead handle still goes away cleanly
    pool.stop_all().unwrap();
    assert_eq!(pool.status(), PoolState::Stopped);
}
