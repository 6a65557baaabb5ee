use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::db::operations::Word;
use crate::services::data_provider::DataProvider;
use crate::services::quiz::{self, QuizDirection};
use crate::services::study_session::{Card, StudyMode};

/// Due words pulled into a review deck after the review list.
const REVIEW_DUE_LIMIT: usize = 50;

/// Where a session draws its words from.
#[derive(Debug, Clone, Default)]
pub struct DeckSource {
    pub category: Option<String>,
    pub section: Option<i64>,
    pub direction: QuizDirection,
}

/// Builds the cards for a new session. An empty result means there is
/// nothing to study.
pub async fn build_deck(
    provider: &DataProvider,
    user_id: &str,
    mode: StudyMode,
    source: &DeckSource,
    option_count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Card>, sqlx::Error> {
    match mode {
        StudyMode::Flashcard => {
            let words = category_words(provider, source).await?;
            Ok(words.into_iter().map(Card::flashcard).collect())
        }
        StudyMode::Quiz => {
            let words = category_words(provider, source).await?;
            if words.is_empty() {
                return Ok(Vec::new());
            }
            let pool = distractor_pool(provider, source, option_count).await?;
            let mut rng = rand::rng();
            let questions = quiz::generate_quiz(
                &words,
                &pool,
                words.len(),
                option_count,
                source.direction,
                &mut rng,
            );
            Ok(questions
                .into_iter()
                .filter_map(|question| {
                    let word = words.iter().find(|w| w.id == question.word_id)?.clone();
                    Some(Card::quiz(word, question))
                })
                .collect())
        }
        StudyMode::Review => {
            let mut seen = HashSet::new();
            let mut cards = Vec::new();

            for entry in provider.list_review(user_id).await? {
                if seen.insert(entry.word.id) {
                    cards.push(Card::flashcard(entry.word));
                }
            }
            for due in provider.due_words(user_id, now, REVIEW_DUE_LIMIT).await? {
                if seen.insert(due.entry.word.id) {
                    cards.push(Card::flashcard(due.entry.word));
                }
            }
            Ok(cards)
        }
    }
}

async fn category_words(provider: &DataProvider, source: &DeckSource) -> Result<Vec<Word>, sqlx::Error> {
    match source.category.as_deref() {
        Some(category) => provider.list_words(category, source.section).await,
        None => Ok(Vec::new()),
    }
}

/// Distractors come from the whole category; a category too small to fill
/// the options borrows from the full catalog.
pub async fn distractor_pool(
    provider: &DataProvider,
    source: &DeckSource,
    option_count: usize,
) -> Result<Vec<Word>, sqlx::Error> {
    if let Some(category) = source.category.as_deref() {
        let words = provider.list_words(category, None).await?;
        if words.len() >= option_count {
            return Ok(words);
        }
    }
    provider.list_all_words().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::db::operations::NewWord;
    use crate::db::Database;
    use chrono::Duration;

    async fn provider() -> DataProvider {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let provider = DataProvider::new(
            db,
            CacheLayer::memory(),
            std::time::Duration::from_secs(60),
            std::time::Duration::from_secs(60),
        );
        let words = [
            ("one", "uno", "numbers", 1),
            ("two", "dos", "numbers", 1),
            ("three", "tres", "numbers", 2),
            ("red", "rojo", "colors", 1),
            ("blue", "azul", "colors", 1),
        ]
        .iter()
        .map(|(h, t, c, s)| NewWord {
            headword: h.to_string(),
            translation: t.to_string(),
            phonetic: None,
            examples: Vec::new(),
            category: c.to_string(),
            section: *s,
            audio_file: None,
        })
        .collect::<Vec<_>>();
        provider.import_words(&words).await.unwrap();
        provider
    }

    fn source(category: &str, section: Option<i64>) -> DeckSource {
        DeckSource {
            category: Some(category.to_string()),
            section,
            direction: QuizDirection::WordToTranslation,
        }
    }

    #[tokio::test]
    async fn flashcards_follow_catalog_order() {
        let provider = provider().await;
        let deck = build_deck(&provider, "u1", StudyMode::Flashcard, &source("numbers", None), 4, Utc::now())
            .await
            .unwrap();
        let heads: Vec<&str> = deck.iter().map(|c| c.word.headword.as_str()).collect();
        assert_eq!(heads, vec!["one", "two", "three"]);

        let deck = build_deck(&provider, "u1", StudyMode::Flashcard, &source("numbers", Some(2)), 4, Utc::now())
            .await
            .unwrap();
        assert_eq!(deck.len(), 1);
    }

    #[tokio::test]
    async fn quiz_cards_borrow_distractors_from_catalog() {
        let provider = provider().await;
        let deck = build_deck(&provider, "u1", StudyMode::Quiz, &source("numbers", Some(1)), 4, Utc::now())
            .await
            .unwrap();
        assert_eq!(deck.len(), 2);
        for card in &deck {
            let question = card.question.as_ref().unwrap();
            assert_eq!(question.options.len(), 4);
            assert_eq!(question.correct_answer(), card.word.translation);
        }
    }

    #[tokio::test]
    async fn review_deck_merges_list_and_due_words() {
        let provider = provider().await;
        let words = provider.list_all_words().await.unwrap();
        let now = Utc::now();

        provider.add_review("u1", words[0].id, now).await.unwrap();
        provider
            .record_answer("u1", words[0].id, false, now - Duration::days(3))
            .await
            .unwrap();
        provider
            .record_answer("u1", words[1].id, false, now - Duration::days(3))
            .await
            .unwrap();

        let deck = build_deck(&provider, "u1", StudyMode::Review, &DeckSource::default(), 4, now)
            .await
            .unwrap();
        let ids: Vec<i64> = deck.iter().map(|c| c.word.id).collect();
        assert_eq!(ids, vec![words[0].id, words[1].id]);

        let other = build_deck(&provider, "u2", StudyMode::Review, &DeckSource::default(), 4, now)
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
