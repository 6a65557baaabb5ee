use chrono::{DateTime, Utc};

use crate::db::operations::UserProgress;

pub const CORRECT_DELTA: f64 = 0.1;
pub const INCORRECT_DELTA: f64 = 0.05;
pub const MASTERED_THRESHOLD: f64 = 0.8;

/// Clamps to [0, 1] and rounds to four decimals so repeated fixed deltas
/// land exactly on bucket boundaries (eight correct answers give 0.8).
pub fn clamp_mastery(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    ((value * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

/// Returns the progress after one answer. Counts only move up and the
/// mastery level stays inside [0, 1].
pub fn apply_answer(progress: &UserProgress, correct: bool, now: DateTime<Utc>) -> UserProgress {
    let mut next = progress.clone();
    next.study_count = next.study_count.saturating_add(1);

    if correct {
        next.correct_count = next.correct_count.saturating_add(1);
        next.mastery_level = clamp_mastery(next.mastery_level + CORRECT_DELTA);
    } else {
        next.incorrect_count = next.incorrect_count.saturating_add(1);
        next.mastery_level = clamp_mastery(next.mastery_level - INCORRECT_DELTA);
    }

    next.last_studied_at = Some(now);
    next
}

pub fn is_mastered(progress: &UserProgress) -> bool {
    progress.mastery_level >= MASTERED_THRESHOLD
}
