//! Task execution wrapper: timing plus outcome classification.
//!
//! [`run_task`] never fails its caller. A task failure is captured as the
//! log message (with the `err: ` marker) instead of propagating, so every
//! execution converges to exactly one [`TaskLogEntry`].

use std::future::Future;
use std::time::Instant;

use chrono::Utc;

use kyukou_shared::{Result, TaskLogEntry, TaskOutcome};

/// Execute `task`, measure wall time, and classify the outcome.
///
/// The entry is returned to the caller for persistence; the runner itself
/// never writes to storage.
pub async fn run_task<F, Fut>(task: F) -> TaskLogEntry
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<TaskOutcome>>,
{
    let time = Utc::now();
    let start = Instant::now();

    let outcome = match task().await {
        Ok(outcome) => outcome,
        Err(e) => TaskOutcome::from_message(format!("err: {e}")),
    };

    let elapsed = start.elapsed();
    // Seconds and nanoseconds combined, keeping sub-millisecond precision.
    let elapsed_ms = elapsed.as_secs() as f64 * 1e3 + f64::from(elapsed.subsec_nanos()) * 1e-6;

    TaskLogEntry {
        message: outcome.message,
        level: outcome.severity.level(),
        time,
        elapsed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kyukou_shared::{KyukouError, Severity};

    #[tokio::test]
    async fn unmarked_message_logs_at_info() {
        let before = Utc::now();
        let entry =
            run_task(|| async { Ok(TaskOutcome::from_message("msg: test")) }).await;

        assert_eq!(entry.message, "msg: test");
        assert_eq!(entry.level, 1);
        assert!(entry.elapsed_ms >= 0.0);
        assert!(entry.time >= before - Duration::seconds(1));
        assert!(entry.time <= Utc::now());
    }

    #[tokio::test]
    async fn task_failure_resolves_to_error_entry() {
        let entry = run_task(|| async {
            Err::<TaskOutcome, _>(KyukouError::Network("test".into()))
        })
        .await;

        assert!(entry.message.contains("err: "));
        assert_eq!(entry.level, 4);
    }

    #[tokio::test]
    async fn typed_outcome_sets_the_level() {
        let entry = run_task(|| async {
            Ok(TaskOutcome::new(Severity::Warning, "law: 1 failed row"))
        })
        .await;

        assert_eq!(entry.level, 3);
        assert_eq!(entry.message, "wrn: law: 1 failed row");
    }

    #[tokio::test]
    async fn elapsed_time_tracks_the_task() {
        let entry = run_task(|| async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(TaskOutcome::from_message("done"))
        })
        .await;

        assert!(entry.elapsed_ms >= 10.0, "elapsed {}ms", entry.elapsed_ms);
    }
}
