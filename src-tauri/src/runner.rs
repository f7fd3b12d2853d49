//! Batch job runner: drives the conversion tool once per selected image
//! and aggregates the outcome into a single report.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::params::{GenParams, OutputFormat, Strength};
use crate::tool::ConversionTool;

/// One unit of work, fixed at batch start.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub source: PathBuf,
    pub strength: Strength,
    pub format: OutputFormat,
}

impl ImageJob {
    /// Builds the job list from the selected sources and a parameter
    /// snapshot, preserving selection order.
    pub fn build(sources: &[PathBuf], params: GenParams) -> Vec<ImageJob> {
        sources
            .iter()
            .map(|source| ImageJob {
                source: source.clone(),
                strength: params.strength,
                format: params.format,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub source: PathBuf,
    pub reason: String,
}

/// Aggregate outcome of one batch, handed to the UI as the `batch_done`
/// event payload once every job has settled.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub successes: Vec<PathBuf>,
    pub failures: Vec<FailedJob>,
    pub tool_missing: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: String,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_total_failure(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }

    fn finish(
        successes: Vec<PathBuf>,
        failures: Vec<FailedJob>,
        tool_missing: bool,
        started_at: DateTime<Utc>,
    ) -> BatchReport {
        let summary = summarize(&successes, &failures, tool_missing);
        BatchReport {
            successes,
            failures,
            tool_missing,
            started_at,
            finished_at: Utc::now(),
            summary,
        }
    }
}

fn summarize(successes: &[PathBuf], failures: &[FailedJob], tool_missing: bool) -> String {
    if tool_missing {
        return "Conversion tool is not installed; no images were processed".to_string();
    }
    let total = successes.len() + failures.len();
    if failures.is_empty() {
        format!("Generated {total} normal map(s)")
    } else if successes.is_empty() {
        format!("All {total} image(s) failed")
    } else {
        format!(
            "Generated {} of {total} normal map(s), {} failed",
            successes.len(),
            failures.len()
        )
    }
}

/// Runs every job in order through the tool. A failing job never stops
/// the jobs after it; an absent tool fails the whole batch up front
/// without attempting anything. Every submitted job ends up in exactly
/// one of the two report buckets.
pub fn run_batch(jobs: &[ImageJob], tool: &dyn ConversionTool) -> BatchReport {
    let started_at = Utc::now();

    if !tool.is_available() {
        warn!("conversion tool missing, aborting batch of {}", jobs.len());
        let failures = jobs
            .iter()
            .map(|job| FailedJob {
                source: job.source.clone(),
                reason: "conversion tool is missing".to_string(),
            })
            .collect();
        return BatchReport::finish(Vec::new(), failures, true, started_at);
    }

    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for job in jobs {
        match tool.convert(&job.source, job.strength, job.format) {
            Ok(output) => {
                info!(source = %job.source.display(), output = %output.display(), "job succeeded");
                successes.push(output);
            }
            Err(err) => {
                warn!(source = %job.source.display(), error = %err, "job failed");
                failures.push(FailedJob {
                    source: job.source.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    debug_assert_eq!(successes.len() + failures.len(), jobs.len());

    BatchReport::finish(successes, failures, false, started_at)
}

/// Per-batch state machine: `Idle -> Running -> Idle`. The gate is the
/// only mechanism preventing concurrent batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Idle,
    Running,
}

#[derive(Debug)]
pub struct BatchGate(Mutex<BatchState>);

impl Default for BatchGate {
    fn default() -> Self {
        BatchGate(Mutex::new(BatchState::Idle))
    }
}

impl BatchGate {
    /// Claims the gate. Returns false when a batch is already running.
    pub fn try_start(&self) -> bool {
        let mut state = self.0.lock().unwrap();
        if *state == BatchState::Running {
            return false;
        }
        *state = BatchState::Running;
        true
    }

    pub fn finish(&self) {
        *self.0.lock().unwrap() = BatchState::Idle;
    }

    pub fn is_running(&self) -> bool {
        *self.0.lock().unwrap() == BatchState::Running
    }
}
