use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Point-in-time view of one task's progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    /// 0..=100
    pub percentage: f64,
    pub elapsed: Duration,
    /// Unknown until some progress has been made
    pub eta: Option<Duration>,
    /// Units of work per wall-clock second
    pub throughput: Option<f64>,
}

/// Derives percentage, ETA and throughput from raw completed/total counts.
///
/// The clock for a task starts at its first update.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    started: HashMap<String, Instant>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, task_id: &str, completed: f64, total: f64) -> ProgressSnapshot {
        self.update_at(task_id, completed, total, Instant::now())
    }

    pub fn update_at(
        &mut self,
        task_id: &str,
        completed: f64,
        total: f64,
        now: Instant,
    ) -> ProgressSnapshot {
        let started = *self.started.entry(task_id.to_string()).or_insert(now);
        let elapsed = now.saturating_duration_since(started);

        let percentage = if total > 0.0 && completed.is_finite() {
            (100.0 * completed / total).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let (eta, throughput) = if percentage > 0.0 && elapsed_secs > 0.0 {
            let estimated_total = elapsed_secs * 100.0 / percentage;
            let eta = Duration::try_from_secs_f64(estimated_total - elapsed_secs).ok();
            (eta, Some(completed / elapsed_secs))
        } else {
            (None, None)
        };

        ProgressSnapshot {
            percentage,
            elapsed,
            eta,
            throughput,
        }
    }

    pub fn finish(&mut self, task_id: &str) {
        self.started.remove(task_id);
    }

    pub fn is_tracking(&self, task_id: &str) -> bool {
        self.started.contains_key(task_id)
    }
}
