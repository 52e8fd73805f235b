//! Job scheduler: skip already-acquired segments, run the rest over a
//! bounded pool of concurrent workers.
//!
//! Keeps up to `workers` jobs in flight at once; when one finishes, the next
//! request is started until the list is empty. Every job failure is contained
//! at the job boundary so sibling jobs continue unaffected. A tripped
//! shutdown flag stops new dispatch; in-flight jobs are drained and joined.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::acquire::{acquire_segment, Acquisition};
use crate::config::SegdlConfig;
use crate::control::ShutdownFlag;
use crate::manifest::SegmentRequest;
use crate::paths::{self, SegmentPaths};
use crate::resolve::StreamResolver;

/// Counters summarizing one scheduler run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Requests dispatched to the worker pool.
    pub submitted: u64,
    /// Requests whose artifacts already existed, plus malformed-id no-ops.
    pub skipped: u64,
    /// Jobs that produced all three artifacts.
    pub completed: u64,
    /// Jobs that exhausted retries or hit a job-fatal error.
    pub failed: u64,
}

enum JobResult {
    Completed,
    Skipped,
    Failed,
}

/// Run every request to completion, at most `cfg.workers` concurrently.
///
/// Returns `Err` only for run-fatal conditions (unsupported codec, output
/// layout not creatable). Individual job failures are logged and counted.
pub async fn run_all(
    requests: Vec<SegmentRequest>,
    root: PathBuf,
    cfg: SegdlConfig,
    resolver: Arc<dyn StreamResolver>,
    shutdown: ShutdownFlag,
) -> Result<RunStats> {
    cfg.video.ensure_supported()?;
    paths::ensure_layout(&root)?;

    let workers = cfg.workers.max(1);
    let cfg = Arc::new(cfg);
    let root = Arc::new(root);

    let mut stats = RunStats::default();
    let mut queue = requests.into_iter();
    let mut join_set: JoinSet<JobResult> = JoinSet::new();

    loop {
        while join_set.len() < workers && !shutdown.is_triggered() {
            let Some(req) = queue.next() else {
                break;
            };
            let segment_paths = SegmentPaths::for_request(
                &root,
                &req,
                &cfg.audio.container,
                &cfg.video.container,
            );
            if segment_paths.all_exist() {
                tracing::info!(
                    id = %req.external_id,
                    start = req.start_secs,
                    end = req.end_secs(),
                    "already downloaded; skipping"
                );
                stats.skipped += 1;
                continue;
            }

            let cfg = Arc::clone(&cfg);
            let root = Arc::clone(&root);
            let resolver = Arc::clone(&resolver);
            stats.submitted += 1;
            join_set.spawn_blocking(move || run_one_job(&req, &root, &cfg, resolver.as_ref()));
        }

        if join_set.is_empty() {
            // Queue drained or shutdown requested with nothing in flight.
            break;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok(JobResult::Completed) => stats.completed += 1,
            Ok(JobResult::Skipped) => stats.skipped += 1,
            Ok(JobResult::Failed) => stats.failed += 1,
            Err(join_err) => {
                tracing::error!(error = %join_err, "worker task panicked");
                stats.failed += 1;
            }
        }
    }

    if shutdown.is_triggered() {
        tracing::info!("drained worker pool after interrupt");
    }
    Ok(stats)
}

/// The per-job boundary: everything raised out of one acquisition is caught,
/// logged with the job's identifier, and never propagated.
fn run_one_job(
    req: &SegmentRequest,
    root: &Path,
    cfg: &SegdlConfig,
    resolver: &dyn StreamResolver,
) -> JobResult {
    tracing::info!(
        id = %req.external_id,
        start = req.start_secs,
        end = req.end_secs(),
        "attempting to download segment"
    );
    match acquire_segment(req, root, cfg, resolver) {
        Ok(Acquisition::Complete(_)) => JobResult::Completed,
        Ok(Acquisition::Skipped) => JobResult::Skipped,
        Ok(Acquisition::Abandoned) => JobResult::Failed,
        Err(e) => {
            tracing::error!(
                id = %req.external_id,
                "error while processing segment: {:#}",
                e
            );
            JobResult::Failed
        }
    }
}
