//! Warmup run statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the most recent warmup run
///
/// Counters are reset when a run starts; `duration_ms` and `last_run` are
/// written when it finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub duration_ms: u64,
    pub last_run: DateTime<Utc>,
    pub run_id: Option<Uuid>,
}

impl Default for WarmupStats {
    fn default() -> Self {
        Self {
            total_tasks: 0,
            completed_tasks: 0,
            failed_tasks: 0,
            duration_ms: 0,
            last_run: Utc::now(),
            run_id: None,
        }
    }
}

impl WarmupStats {
    /// `completed / total`, 1.0 when no task ran
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            1.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64
        }
    }

    pub(crate) fn begin(&mut self, run_id: Uuid, total_tasks: usize) {
        self.run_id = Some(run_id);
        self.total_tasks = total_tasks;
        self.completed_tasks = 0;
        self.failed_tasks = 0;
    }

    pub(crate) fn finish(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        self.last_run = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = WarmupStats::default();
        assert_eq!(stats.success_rate(), 1.0);

        stats.begin(Uuid::new_v4(), 4);
        stats.completed_tasks = 3;
        stats.failed_tasks = 1;
        assert_eq!(stats.success_rate(), 0.75);
    }

    #[test]
    fn test_begin_resets_counters() {
        let mut stats = WarmupStats {
            completed_tasks: 5,
            failed_tasks: 2,
            ..WarmupStats::default()
        };
        let run_id = Uuid::new_v4();
        stats.begin(run_id, 3);
        assert_eq!((stats.total_tasks, stats.completed_tasks, stats.failed_tasks), (3, 0, 0));
        assert_eq!(stats.run_id, Some(run_id));
    }
}
