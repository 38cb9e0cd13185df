//! Dashboard arithmetic over ledger aggregates.

/// Average assumed when no successful job has been recorded yet.
pub const DEFAULT_SECS_PER_IMAGE: f64 = 3.0;

/// Number of recent successful jobs the performance panel averages over.
pub const RECENT_DURATION_WINDOW: i64 = 50;

/// Upper bound on the parallel speed-up reported for a worker pool.
pub const MAX_REPORTED_SPEEDUP: usize = 4;

/// Success rate as a percentage with one decimal. Zero when nothing ran.
pub fn success_rate(successes: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    ((successes as f64 / total as f64) * 1000.0).round() / 10.0
}

/// Mean of `durations`, or [`DEFAULT_SECS_PER_IMAGE`] when empty.
pub fn average_secs_per_image(durations: &[f64]) -> f64 {
    if durations.is_empty() {
        return DEFAULT_SECS_PER_IMAGE;
    }
    durations.iter().sum::<f64>() / durations.len() as f64
}

/// Images per hour the pool can sustain at `secs_per_image` each.
pub fn throughput_per_hour(secs_per_image: f64, workers: usize) -> u64 {
    if secs_per_image <= 0.0 {
        return 0;
    }
    (3600.0 / secs_per_image * workers as f64) as u64
}

/// Speed-up over a single worker, capped at [`MAX_REPORTED_SPEEDUP`].
pub fn speedup_factor(workers: usize) -> usize {
    workers.clamp(1, MAX_REPORTED_SPEEDUP)
}
