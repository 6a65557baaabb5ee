use std::collections::HashSet;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::operations::Word;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizDirection {
    /// Show the headword, pick the translation.
    #[default]
    WordToTranslation,
    /// Show the translation, pick the headword.
    TranslationToWord,
}

impl FromStr for QuizDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "word_to_translation" | "word-to-translation" => Ok(Self::WordToTranslation),
            "translation_to_word" | "translation-to-word" => Ok(Self::TranslationToWord),
            other => Err(format!("unknown quiz direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub word_id: i64,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub direction: QuizDirection,
}

impl QuizQuestion {
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

fn prompt_text(word: &Word, direction: QuizDirection) -> &str {
    match direction {
        QuizDirection::WordToTranslation => &word.headword,
        QuizDirection::TranslationToWord => &word.translation,
    }
}

fn answer_text(word: &Word, direction: QuizDirection) -> &str {
    match direction {
        QuizDirection::WordToTranslation => &word.translation,
        QuizDirection::TranslationToWord => &word.headword,
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Builds one multiple-choice question for `target`. Distractors come from
/// `pool`; candidates that would read the same as the answer or as another
/// chosen option are skipped, so a small pool yields fewer options rather
/// than duplicates.
pub fn build_question<R: Rng + ?Sized>(
    target: &Word,
    pool: &[Word],
    option_count: usize,
    direction: QuizDirection,
    rng: &mut R,
) -> QuizQuestion {
    let answer = answer_text(target, direction).trim().to_string();

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize(&answer));

    let mut candidates: Vec<&str> = pool
        .iter()
        .filter(|word| word.id != target.id)
        .map(|word| answer_text(word, direction).trim())
        .filter(|text| !text.is_empty())
        .collect();
    shuffle(&mut candidates, rng);

    let wanted = option_count.max(1) - 1;
    let mut options: Vec<String> = Vec::with_capacity(wanted + 1);
    options.push(answer);
    for candidate in candidates {
        if options.len() > wanted {
            break;
        }
        if seen.insert(normalize(candidate)) {
            options.push(candidate.to_string());
        }
    }

    let mut order: Vec<usize> = (0..options.len()).collect();
    shuffle(&mut order, rng);
    let correct_index = order.iter().position(|&i| i == 0).unwrap_or(0);
    let options = order.into_iter().map(|i| options[i].clone()).collect();

    QuizQuestion {
        word_id: target.id,
        prompt: prompt_text(target, direction).trim().to_string(),
        options,
        correct_index,
        direction,
    }
}

/// Picks up to `count` targets in random order and builds a question for
/// each, drawing distractors from `pool`.
pub fn generate_quiz<R: Rng + ?Sized>(
    targets: &[Word],
    pool: &[Word],
    count: usize,
    option_count: usize,
    direction: QuizDirection,
    rng: &mut R,
) -> Vec<QuizQuestion> {
    let mut picked: Vec<&Word> = targets.iter().collect();
    shuffle(&mut picked, rng);
    picked
        .into_iter()
        .take(count)
        .map(|target| build_question(target, pool, option_count, direction, rng))
        .collect()
}
