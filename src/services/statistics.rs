use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::operations::{CategorySummary, ProgressEntry, StudySessionRecord};
use crate::services::{mastery, srs};

const RECENT_ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatistics {
    pub category: String,
    pub total_words: i64,
    pub studied_words: i64,
    pub mastered_words: i64,
    pub average_mastery: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub sessions: i64,
    pub words_studied: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStatistics {
    pub total_words: i64,
    pub studied_words: i64,
    pub mastered_words: i64,
    pub favorite_words: i64,
    pub review_list_size: i64,
    pub due_for_review: i64,
    pub total_correct: i64,
    pub total_incorrect: i64,
    pub accuracy: f64,
    pub average_mastery: f64,
    pub categories: Vec<CategoryStatistics>,
    /// Studied words per mastery bucket, index 0 is bucket 1.
    pub mastery_distribution: [i64; 5],
    pub sessions_completed: i64,
    pub current_streak_days: i64,
    pub recent_activity: Vec<DailyActivity>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(sum: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

pub fn aggregate(
    progress: &[ProgressEntry],
    catalog: &[CategorySummary],
    review_list_size: i64,
    sessions: &[StudySessionRecord],
    now: DateTime<Utc>,
) -> StudyStatistics {
    let mut per_category: BTreeMap<&str, (i64, i64, f64)> = BTreeMap::new();
    let mut distribution = [0_i64; 5];
    let (mut studied, mut mastered, mut favorites, mut due) = (0, 0, 0, 0);
    let (mut total_correct, mut total_incorrect) = (0_i64, 0_i64);
    let mut mastery_sum = 0.0;

    for entry in progress {
        let p = &entry.progress;
        if p.is_favorite {
            favorites += 1;
        }
        if !p.is_studied() {
            continue;
        }

        studied += 1;
        mastery_sum += p.mastery_level;
        total_correct += p.correct_count;
        total_incorrect += p.incorrect_count;
        if srs::is_due(p, now) {
            due += 1;
        }
        let bucket = srs::mastery_bucket(p.mastery_level) as usize;
        distribution[bucket - 1] += 1;

        let stats = per_category.entry(entry.word.category.as_str()).or_default();
        stats.0 += 1;
        stats.2 += p.mastery_level;
        if mastery::is_mastered(p) {
            mastered += 1;
            stats.1 += 1;
        }
    }

    let answers = total_correct + total_incorrect;
    let accuracy = if answers == 0 {
        0.0
    } else {
        round2(total_correct as f64 / answers as f64)
    };

    let categories = catalog
        .iter()
        .map(|summary| {
            let (studied_words, mastered_words, sum) = per_category
                .get(summary.category.as_str())
                .copied()
                .unwrap_or_default();
            CategoryStatistics {
                category: summary.category.clone(),
                total_words: summary.word_count,
                studied_words,
                mastered_words,
                average_mastery: mean(sum, studied_words),
            }
        })
        .collect();

    StudyStatistics {
        total_words: catalog.iter().map(|c| c.word_count).sum(),
        studied_words: studied,
        mastered_words: mastered,
        favorite_words: favorites,
        review_list_size,
        due_for_review: due,
        total_correct,
        total_incorrect,
        accuracy,
        average_mastery: mean(mastery_sum, studied),
        categories,
        mastery_distribution: distribution,
        sessions_completed: sessions.len() as i64,
        current_streak_days: current_streak(sessions, now),
        recent_activity: recent_activity(sessions, now),
    }
}

/// Consecutive UTC days with at least one completed session, counting back
/// from today. A streak that last ran yesterday is still current.
pub fn current_streak(sessions: &[StudySessionRecord], now: DateTime<Utc>) -> i64 {
    let days: HashSet<NaiveDate> = sessions.iter().map(|s| s.completed_at.date_naive()).collect();
    let today = now.date_naive();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// One entry per day for the last week, oldest first, including empty days.
pub fn recent_activity(sessions: &[StudySessionRecord], now: DateTime<Utc>) -> Vec<DailyActivity> {
    let today = now.date_naive();
    (0..RECENT_ACTIVITY_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let mut activity = DailyActivity {
                date,
                sessions: 0,
                words_studied: 0,
                correct_count: 0,
                incorrect_count: 0,
            };
            for session in sessions.iter().filter(|s| s.completed_at.date_naive() == date) {
                activity.sessions += 1;
                activity.words_studied += session.words_studied;
                activity.correct_count += session.correct_count;
                activity.incorrect_count += session.incorrect_count;
            }
            activity
        })
        .collect()
}
