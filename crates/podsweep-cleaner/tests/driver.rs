//! Driver modes and cache sync handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use podsweep_cleaner::{CleanerError, Driver, PodCleaner, RunMode};
use podsweep_cluster::MemoryCluster;
use podsweep_core::{Labels, PolicyConfig, WorkloadInstance};

fn failed_pod(name: &str) -> WorkloadInstance {
    WorkloadInstance {
        namespace: "default".to_string(),
        name: name.to_string(),
        uid: format!("uid-{name}"),
        phase: "Failed".to_string(),
        reason: String::new(),
        message: String::new(),
        start_time: None,
        labels: Labels::new(),
    }
}

fn driver(cluster: &MemoryCluster, mode: RunMode) -> Driver {
    let config = PolicyConfig {
        check_delay_seconds: 1,
        ..PolicyConfig::default()
    };
    let cleaner = PodCleaner::new(Arc::new(cluster.clone()), Arc::new(cluster.clone()), &config);
    Driver::new(cleaner, mode)
}

#[tokio::test(start_paused = true)]
async fn one_shot_runs_single_cycle() {
    let cluster = MemoryCluster::new();
    cluster.insert(failed_pod("a"));
    let (_tx, rx) = watch::channel(false);

    let cycles = driver(&cluster, RunMode::OneShot).run(rx).await.unwrap();

    assert_eq!(cycles, 1);
    assert_eq!(cluster.deleted(), vec!["default/a"]);
    assert_eq!(cluster.full_list_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn interval_runs_until_shutdown() {
    let cluster = MemoryCluster::new();
    let (tx, rx) = watch::channel(false);
    let driver = driver(&cluster, RunMode::Interval(Duration::from_secs(10)));

    let handle = tokio::spawn(async move { driver.run(rx).await });

    // Ticks at 0s, 10s and 20s.
    tokio::time::sleep(Duration::from_secs(25)).await;
    tx.send(true).unwrap();

    let cycles = handle.await.unwrap().unwrap();
    assert_eq!(cycles, 3);
    assert_eq!(cluster.full_list_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn interval_picks_up_new_pods() {
    let cluster = MemoryCluster::new();
    let (tx, rx) = watch::channel(false);
    let driver = driver(&cluster, RunMode::Interval(Duration::from_secs(10)));

    let handle = tokio::spawn(async move { driver.run(rx).await });

    tokio::time::sleep(Duration::from_secs(5)).await;
    cluster.insert(failed_pod("late"));
    tokio::time::sleep(Duration::from_secs(10)).await;
    tx.send(true).unwrap();

    handle.await.unwrap().unwrap();
    assert_eq!(cluster.deleted(), vec!["default/late"]);
}

#[tokio::test(start_paused = true)]
async fn waits_for_cache_sync() {
    let cluster = MemoryCluster::unsynced();
    cluster.insert(failed_pod("a"));
    let (_tx, rx) = watch::channel(false);

    let syncer = cluster.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        syncer.set_synced(true);
    });

    let started = tokio::time::Instant::now();
    let cycles = driver(&cluster, RunMode::OneShot).run(rx).await.unwrap();

    assert_eq!(cycles, 1);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(cluster.deleted(), vec!["default/a"]);
}

#[tokio::test(start_paused = true)]
async fn sync_timeout_is_fatal() {
    let cluster = MemoryCluster::unsynced();
    cluster.insert(failed_pod("a"));
    let (_tx, rx) = watch::channel(false);

    let err = driver(&cluster, RunMode::OneShot)
        .with_sync_timeout(Duration::from_secs(3))
        .run(rx)
        .await
        .unwrap_err();

    assert!(matches!(err, CleanerError::CacheSync(_)));
    assert_eq!(cluster.full_list_count(), 0);
    assert!(cluster.contains("default", "a"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_sync_is_fatal() {
    let cluster = MemoryCluster::unsynced();
    let (tx, rx) = watch::channel(false);
    let driver = driver(&cluster, RunMode::Interval(Duration::from_secs(10)));

    let handle = tokio::spawn(async move { driver.run(rx).await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(true).unwrap();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, CleanerError::CacheSync(_)));
    assert_eq!(cluster.full_list_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_already_requested_runs_nothing() {
    let cluster = MemoryCluster::new();
    cluster.insert(failed_pod("a"));
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let result = driver(&cluster, RunMode::OneShot).run(rx).await;

    assert!(result.is_err());
    assert!(cluster.deleted().is_empty());
}
