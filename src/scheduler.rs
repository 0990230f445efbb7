use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::dtos::{NewActivityLog, SchedulePatch};
use crate::error::StorageError;
use crate::scheduling::calculate_next_run;
use crate::storage::{ActivityLogExt, ScheduleExt, Storage};

/// Fire every enabled schedule whose `next_run` has arrived.
///
/// Each due schedule is first stamped with `last_run = now` and a fresh
/// `next_run`, then gets an activity log entry. A failed stamp leaves the
/// schedule due for the next tick without a log line, so nothing is logged
/// twice. A schedule that can't be advanced (bad stored cadence or time)
/// is skipped with an error log and does not hold up the others.
///
/// Generating and publishing the issue happens outside this service.
/// Returns how many schedules fired.
pub async fn run_due_schedules(
    storage: &dyn Storage,
    now: DateTime<Utc>,
) -> Result<usize, StorageError> {
    let due: Vec<_> = storage
        .get_enabled_schedules()
        .await?
        .into_iter()
        .filter(|s| s.next_run.is_some_and(|next_run| next_run <= now))
        .collect();

    let mut fired = 0;
    for schedule in &due {
        let next_run = match calculate_next_run(&schedule.frequency, &schedule.time, now) {
            Ok(next_run) => next_run,
            Err(e) => {
                tracing::error!(schedule_id = schedule.id, error = %e, "Skipping schedule that can't be advanced");
                continue;
            }
        };

        let stamped = storage
            .update_schedule(
                schedule.id,
                SchedulePatch {
                    last_run: Some(Some(now)),
                    next_run: Some(Some(next_run)),
                    ..Default::default()
                },
            )
            .await;
        match stamped {
            Ok(Some(_)) => {}
            // deleted since the list was read
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(schedule_id = schedule.id, error = %e, "Failed to advance schedule");
                continue;
            }
        }

        let logged = storage
            .create_activity_log(
                NewActivityLog::new(format!("Scheduled run triggered: {}", schedule.name), "schedule")
                    .with_details(json!({
                        "scheduleId": schedule.id,
                        "newsSourceUrl": schedule.news_source_url,
                        "maxArticles": schedule.max_articles,
                        "autoApprove": schedule.auto_approve,
                    })),
            )
            .await;
        if let Err(e) = logged {
            tracing::warn!(schedule_id = schedule.id, error = %e, "Schedule fired but activity log failed");
        }

        fired += 1;
        tracing::info!(schedule_id = schedule.id, name = %schedule.name, %next_run, "Schedule fired");
    }

    Ok(fired)
}

/// Start the once-a-minute schedule runner.
///
/// The returned scheduler must be kept alive for the job to keep running.
pub async fn start_schedule_runner(
    storage: Arc<dyn Storage>,
) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async("0 * * * * *", move |uuid, _l| {
        let storage = storage.clone();
        Box::pin(async move {
            match run_due_schedules(storage.as_ref(), Utc::now()).await {
                Ok(0) => tracing::debug!(job = %uuid, "No schedules due"),
                Ok(fired) => tracing::info!(job = %uuid, fired, "Schedule runner finished"),
                Err(e) => tracing::error!(job = %uuid, error = %e, "Schedule runner failed"),
            }
        })
    })?;

    sched.add(job).await?;
    // Runs on its own task; does not block.
    sched.start().await?;

    Ok(sched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::NewSchedule;
    use crate::models::Schedule;
    use crate::storage::MemStorage;
    use chrono::Duration;

    fn new_schedule(name: &str, enabled: bool) -> NewSchedule {
        NewSchedule {
            name: name.to_string(),
            frequency: "daily".to_string(),
            time: "09:00".to_string(),
            news_source_url: "https://example.com/feed".to_string(),
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_nothing_due_before_next_run() {
        let storage = MemStorage::new();
        storage.create_schedule(new_schedule("daily", true)).await.unwrap();

        let fired = run_due_schedules(&storage, Utc::now()).await.unwrap();
        assert_eq!(fired, 0);
        assert!(storage.get_activity_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_schedule_fires_and_advances() {
        let storage = MemStorage::new();
        let created = storage.create_schedule(new_schedule("daily", true)).await.unwrap();
        storage.create_schedule(new_schedule("paused", false)).await.unwrap();

        // a day past the next run: both schedules are overdue, only one is enabled
        let now = created.next_run.unwrap() + Duration::days(1);
        let fired = run_due_schedules(&storage, now).await.unwrap();
        assert_eq!(fired, 1);

        let updated = storage.get_schedule(created.id).await.unwrap().unwrap();
        assert_eq!(updated.last_run, Some(now));
        assert!(updated.next_run.unwrap() > now);

        let logs = storage.get_activity_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].log_type, "schedule");
        assert!(logs[0].message.contains("daily"));

        // already advanced, so a second pass at the same instant is a no-op
        assert_eq!(run_due_schedules(&storage, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_broken_schedule_does_not_block_the_rest() {
        let storage = MemStorage::new();
        let good = storage.create_schedule(new_schedule("b-good", true)).await.unwrap();

        // sorts ahead of the good one and can never be advanced
        let broken = storage
            .insert_schedule_row(Schedule {
                name: "a-broken".to_string(),
                frequency: "hourly".to_string(),
                ..good.clone()
            })
            .await;

        let now = good.next_run.unwrap() + Duration::days(1);
        let fired = run_due_schedules(&storage, now).await.unwrap();
        assert_eq!(fired, 1);

        let updated = storage.get_schedule(good.id).await.unwrap().unwrap();
        assert_eq!(updated.last_run, Some(now));

        let untouched = storage.get_schedule(broken.id).await.unwrap().unwrap();
        assert_eq!(untouched.last_run, None);

        let logs = storage.get_activity_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("b-good"));
    }
}
