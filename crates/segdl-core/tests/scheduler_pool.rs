//! Integration tests for the scheduler: resumability, failure isolation, and
//! interrupt drain, driven by fake tool executables.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use segdl_core::config::SegdlConfig;
use segdl_core::control::ShutdownFlag;
use segdl_core::manifest::SegmentRequest;
use segdl_core::paths::{self, SegmentPaths};
use segdl_core::resolve::StreamResolver;
use segdl_core::scheduler::{run_all, RunStats};

/// Resolver that fails for one id and must never be called when every
/// segment is already on disk.
struct StubResolver {
    fail_id: Option<String>,
}

impl StreamResolver for StubResolver {
    fn resolve(&self, external_id: &str) -> Result<String> {
        if self.fail_id.as_deref() == Some(external_id) {
            anyhow::bail!("simulated permanent resolution failure");
        }
        Ok("https://cdn.example/stream".to_string())
    }
}

struct PanicResolver;

impl StreamResolver for PanicResolver {
    fn resolve(&self, external_id: &str) -> Result<String> {
        panic!("resolver called for {external_id} during a fully resumed run");
    }
}

fn request(id: &str, start_secs: f64) -> SegmentRequest {
    SegmentRequest {
        external_id: id.to_string(),
        start_secs,
    }
}

fn tool_config(tools: &std::path::Path, workers: usize) -> (SegdlConfig, PathBuf) {
    let argv_log = tools.join("argv.log");
    let mut cfg = SegdlConfig::default();
    cfg.ffmpeg_path = common::fake_ffmpeg_ok(tools, &argv_log);
    cfg.ffprobe_path = common::fake_ffprobe_10s(tools);
    cfg.max_attempts = 2;
    cfg.workers = workers;
    (cfg, argv_log)
}

#[tokio::test]
async fn fully_resumed_run_issues_zero_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    paths::ensure_layout(&root).unwrap();

    let cfg = SegdlConfig::default();
    let requests = vec![
        request("aaaaaaaaaaa", 0.0),
        request("bbbbbbbbbbb", 30.0),
        request("ccccccccccc", 60.0),
    ];
    for req in &requests {
        let p = SegmentPaths::for_request(&root, req, "wav", "mp4");
        fs::write(&p.audio, b"a").unwrap();
        fs::write(&p.video, b"v").unwrap();
        fs::write(&p.muxed, b"m").unwrap();
    }

    let stats = run_all(
        requests,
        root,
        cfg,
        Arc::new(PanicResolver),
        ShutdownFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        stats,
        RunStats {
            submitted: 0,
            skipped: 3,
            completed: 0,
            failed: 0
        }
    );
}

#[tokio::test]
async fn one_permanent_failure_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tools = dir.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let (cfg, _argv_log) = tool_config(&tools, 2);

    let requests = vec![
        request("aaaaaaaaaaa", 0.0),
        request("bbbbbbbbbbb", 10.0),
        request("ccccccccccc", 20.0),
        request("ddddddddddd", 30.0),
        request("eeeeeeeeeee", 40.0),
    ];
    let resolver = Arc::new(StubResolver {
        fail_id: Some("ccccccccccc".to_string()),
    });

    let stats = run_all(
        requests.clone(),
        root.clone(),
        cfg,
        resolver,
        ShutdownFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 0);

    for req in &requests {
        let p = SegmentPaths::for_request(&root, req, "wav", "mp4");
        let expect = req.external_id != "ccccccccccc";
        assert_eq!(p.all_exist(), expect, "ledger state for {}", req.external_id);
    }
}

#[tokio::test]
async fn completed_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tools = dir.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let (cfg, argv_log) = tool_config(&tools, 2);

    let requests = vec![request("aaaaaaaaaaa", 0.0), request("bbbbbbbbbbb", 10.0)];
    let resolver = Arc::new(StubResolver { fail_id: None });

    let first = run_all(
        requests.clone(),
        root.clone(),
        cfg.clone(),
        Arc::clone(&resolver) as Arc<dyn StreamResolver>,
        ShutdownFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.completed, 2);
    let invocations_after_first = fs::read_to_string(&argv_log).unwrap().lines().count();
    // Three stages per segment.
    assert_eq!(invocations_after_first, 6);

    let second = run_all(requests, root, cfg, resolver, ShutdownFlag::new())
        .await
        .unwrap();
    assert_eq!(second.submitted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.completed, 0);
    let invocations_after_second = fs::read_to_string(&argv_log).unwrap().lines().count();
    assert_eq!(invocations_after_second, invocations_after_first);
}

#[tokio::test]
async fn tripped_shutdown_dispatches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tools = dir.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let (cfg, _argv_log) = tool_config(&tools, 2);

    let shutdown = ShutdownFlag::new();
    shutdown.trigger();

    let stats = run_all(
        vec![request("aaaaaaaaaaa", 0.0), request("bbbbbbbbbbb", 10.0)],
        root,
        cfg,
        Arc::new(PanicResolver),
        shutdown,
    )
    .await
    .unwrap();

    assert_eq!(stats, RunStats::default());
}

#[tokio::test]
async fn malformed_id_counts_as_skip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tools = dir.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let (cfg, argv_log) = tool_config(&tools, 2);

    let stats = run_all(
        vec![request("short", 0.0)],
        root,
        cfg,
        Arc::new(StubResolver { fail_id: None }),
        ShutdownFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.failed, 0);
    assert!(!argv_log.exists(), "no invocation may run for a bad id");
}

#[tokio::test]
async fn interrupt_mid_run_drains_in_flight_and_stops_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tools = dir.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let argv_log = tools.join("argv.log");
    let started = tools.join("first-invocation");
    let mut cfg = SegdlConfig::default();
    cfg.ffmpeg_path = common::fake_ffmpeg_slow_first(&tools, &argv_log, &started);
    cfg.ffprobe_path = common::fake_ffprobe_10s(&tools);
    cfg.max_attempts = 2;
    cfg.workers = 1;

    let shutdown = ShutdownFlag::new();
    let handle = tokio::spawn(run_all(
        vec![request("aaaaaaaaaaa", 0.0), request("bbbbbbbbbbb", 10.0)],
        root.clone(),
        cfg,
        Arc::new(StubResolver { fail_id: None }),
        shutdown.clone(),
    ));

    // Wait until the first job's first invocation is actually in flight,
    // then interrupt while it sleeps.
    for _ in 0..100 {
        if started.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(started.exists(), "first invocation never started");
    shutdown.trigger();

    let stats = handle.await.unwrap().unwrap();
    // The in-flight job finished; the queued one was never dispatched.
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.skipped, 0);

    let argv_lines = fs::read_to_string(&argv_log).unwrap();
    assert_eq!(argv_lines.lines().count(), 3, "three stages for one segment");
    assert!(argv_lines
        .lines()
        .all(|line| line.contains("aaaaaaaaaaa_0_10000")));
    let first = SegmentPaths::for_request(&root, &request("aaaaaaaaaaa", 0.0), "wav", "mp4");
    assert!(first.all_exist());
    let second = SegmentPaths::for_request(&root, &request("bbbbbbbbbbb", 10.0), "wav", "mp4");
    assert!(!second.all_exist());
}
