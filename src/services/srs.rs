use chrono::{DateTime, Duration, Utc};

use crate::db::operations::UserProgress;

/// Review interval in days per mastery bucket.
const INTERVAL_TABLE: [(u8, i64); 5] = [(1, 1), (2, 3), (3, 7), (4, 14), (5, 30)];

pub const MIN_BUCKET: u8 = 1;
pub const MAX_BUCKET: u8 = 5;

pub fn mastery_bucket(mastery_level: f64) -> u8 {
    if !mastery_level.is_finite() || mastery_level <= 0.0 {
        return MIN_BUCKET;
    }
    let raw = (mastery_level * 5.0).floor() as i64 + 1;
    raw.clamp(MIN_BUCKET as i64, MAX_BUCKET as i64) as u8
}

pub fn interval_days(bucket: u8) -> i64 {
    let bucket = bucket.clamp(MIN_BUCKET, MAX_BUCKET);
    INTERVAL_TABLE
        .iter()
        .find(|(b, _)| *b == bucket)
        .map(|(_, days)| *days)
        .unwrap_or(1)
}

pub fn next_review_at(progress: &UserProgress) -> Option<DateTime<Utc>> {
    let last = progress.last_studied_at?;
    let days = interval_days(mastery_bucket(progress.mastery_level));
    Some(last + Duration::days(days))
}

pub fn is_due(progress: &UserProgress, now: DateTime<Utc>) -> bool {
    next_review_at(progress).is_some_and(|at| at <= now)
}

/// How long the word has been due; `None` when it is not due yet.
pub fn overdue_by(progress: &UserProgress, now: DateTime<Utc>) -> Option<Duration> {
    let at = next_review_at(progress)?;
    if at <= now {
        Some(now - at)
    } else {
        None
    }
}
