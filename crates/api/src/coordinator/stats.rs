//! Aggregate statistics and the dashboard payload.

use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use serde::Serialize;
use visage_core::job::JobKind;
use visage_core::stats::{
    average_secs_per_image, speedup_factor, success_rate, throughput_per_hour,
    RECENT_DURATION_WINDOW,
};
use visage_core::worker_pool::WorkerDescriptor;
use visage_db::models::ledger::{DailyCount, HourlyCount, LedgerStatus};
use visage_db::repositories::ledger_repo::DAY_FORMAT;
use visage_db::repositories::{LedgerRepo, QueueRepo};

use crate::coordinator::census::{live_worker_count, queue_depth, worker_census};
use crate::error::AppResult;
use crate::state::AppState;

/// Days of history in the dashboard's daily series, today included.
const DAILY_HISTORY_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Whole-ledger figures for detection jobs.
#[derive(Debug, Serialize)]
pub struct StatsView {
    pub total_processed: i64,
    pub successful: i64,
    pub failed: i64,
    pub total_faces: i64,
    /// Mean duration of successful jobs in seconds.
    pub average_duration: f64,
    /// Percentage of successful jobs, one decimal.
    pub success_rate: f64,
    pub active_workers: i64,
}

pub async fn stats(state: &AppState) -> AppResult<StatsView> {
    let totals = LedgerRepo::totals(&state.pool, JobKind::Detect.name()).await?;
    let active_workers = live_worker_count(state).await?;

    Ok(StatsView {
        total_processed: totals.total,
        successful: totals.successes,
        failed: totals.errors,
        total_faces: totals.total_faces,
        average_duration: round2(totals.avg_duration.unwrap_or(0.0)),
        success_rate: success_rate(totals.successes, totals.total),
        active_workers,
    })
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WorkerPanel {
    pub total: usize,
    pub busy: usize,
    pub idle: usize,
    pub details: Vec<WorkerDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct TaskPanel {
    /// Jobs currently claimed by some worker.
    pub active: usize,
    /// Jobs waiting in any queue.
    pub queued: i64,
    pub completed_today: i64,
    pub failed_today: i64,
}

#[derive(Debug, Serialize)]
pub struct PerformancePanel {
    /// Mean seconds per image over the most recent successful jobs.
    pub avg_time_per_image: f64,
    pub throughput_per_hour: u64,
    pub speedup: usize,
    /// Seconds a single worker would need for `speedup` images.
    pub estimated_sequential_time: f64,
    /// Number of recent jobs the average is based on.
    pub samples: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub workers: WorkerPanel,
    pub tasks: TaskPanel,
    pub performance: PerformancePanel,
    /// Successful detections per hour of the current UTC day, all 24 hours.
    pub hourly: Vec<HourlyCount>,
    /// Successful detections per day over the last week.
    pub daily: Vec<DailyCount>,
}

pub async fn dashboard(state: &AppState) -> AppResult<DashboardView> {
    let kind = JobKind::Detect.name();
    let now = Utc::now();
    let today = now.format(DAY_FORMAT).to_string();
    let midnight = now.date_naive().and_time(NaiveTime::default()).and_utc();
    let week_start = (now - ChronoDuration::days(DAILY_HISTORY_DAYS - 1))
        .format(DAY_FORMAT)
        .to_string();

    let details = worker_census(state).await?;
    let claimed = QueueRepo::list_claimed(&state.pool).await?;
    let depth = queue_depth(state).await?;
    let completed_today =
        LedgerRepo::count_on_day(&state.pool, kind, LedgerStatus::Success, &today).await?;
    let failed_today =
        LedgerRepo::count_on_day(&state.pool, kind, LedgerStatus::Error, &today).await?;
    let durations =
        LedgerRepo::recent_durations(&state.pool, kind, RECENT_DURATION_WINDOW).await?;
    let hourly = LedgerRepo::hourly_counts(&state.pool, kind, midnight).await?;
    let daily = LedgerRepo::daily_counts(&state.pool, kind, &week_start).await?;

    let busy = details.iter().filter(|w| w.busy).count();
    let workers = WorkerPanel {
        total: details.len(),
        busy,
        idle: details.len() - busy,
        details,
    };

    let avg = average_secs_per_image(&durations);
    let speedup = speedup_factor(workers.total);
    let performance = PerformancePanel {
        avg_time_per_image: round2(avg),
        throughput_per_hour: throughput_per_hour(avg, workers.total),
        speedup,
        estimated_sequential_time: round2(avg * speedup as f64),
        samples: durations.len(),
    };

    Ok(DashboardView {
        workers,
        tasks: TaskPanel {
            active: claimed.len(),
            queued: depth.total,
            completed_today,
            failed_today,
        },
        performance,
        hourly: fill_hours(hourly),
        daily,
    })
}

/// Expand sparse hourly counts to all 24 hours of the day.
fn fill_hours(sparse: Vec<HourlyCount>) -> Vec<HourlyCount> {
    let mut hours: Vec<HourlyCount> = (0..24).map(|hour| HourlyCount { hour, count: 0 }).collect();
    for bucket in sparse {
        if let Some(slot) = usize::try_from(bucket.hour)
            .ok()
            .and_then(|h| hours.get_mut(h))
        {
            slot.count = bucket.count;
        }
    }
    hours
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_hours_covers_the_whole_day() {
        let filled = fill_hours(vec![
            HourlyCount { hour: 3, count: 2 },
            HourlyCount { hour: 23, count: 5 },
        ]);
        assert_eq!(filled.len(), 24);
        assert_eq!(filled[3].count, 2);
        assert_eq!(filled[23].count, 5);
        assert_eq!(filled.iter().map(|h| h.count).sum::<i64>(), 7);
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.0), 0.0);
    }
}
