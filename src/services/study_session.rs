use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::operations::{StudySessionRecord, Word};
use crate::services::quiz::QuizQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Flashcard,
    Quiz,
    Review,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcard => "flashcard",
            Self::Quiz => "quiz",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown study mode '{0}'")]
pub struct ParseStudyModeError(String);

impl FromStr for StudyMode {
    type Err = ParseStudyModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flashcard" => Ok(Self::Flashcard),
            "quiz" => Ok(Self::Quiz),
            "review" => Ok(Self::Review),
            other => Err(ParseStudyModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Main,
    Retry,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("study session not found")]
    NotFound,
    #[error("no words available for this study session")]
    Empty,
    #[error("study session is already finished")]
    Finished,
    #[error("choice {choice} is out of range for {options} options")]
    InvalidChoice { choice: usize, options: usize },
    #[error("{0}")]
    InvalidAnswer(String),
    #[error("the previous answer is still being recorded")]
    AnswerPending,
}

/// One card of a deck. Quiz cards carry their question.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub word: Word,
    pub question: Option<QuizQuestion>,
}

impl Card {
    pub fn flashcard(word: Word) -> Self {
        Self { word, question: None }
    }

    pub fn quiz(word: Word, question: QuizQuestion) -> Self {
        Self {
            word,
            question: Some(question),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerInput {
    Known(bool),
    Choice(usize),
}

/// Request body of the answer endpoint: `{"known": bool}` or `{"choice": n}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerRequest {
    pub known: Option<bool>,
    pub choice: Option<usize>,
}

impl TryFrom<AnswerRequest> for AnswerInput {
    type Error = SessionError;

    fn try_from(request: AnswerRequest) -> Result<Self, Self::Error> {
        match (request.known, request.choice) {
            (Some(known), None) => Ok(Self::Known(known)),
            (None, Some(choice)) => Ok(Self::Choice(choice)),
            (Some(_), Some(_)) => Err(SessionError::InvalidAnswer(
                "send either 'known' or 'choice', not both".to_string(),
            )),
            (None, None) => Err(SessionError::InvalidAnswer(
                "answer requires 'known' or 'choice'".to_string(),
            )),
        }
    }
}

/// A graded answer for the current card that has not been applied yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAnswer {
    pub word_id: i64,
    pub correct: bool,
    correct_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub word_id: i64,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
    pub phase: SessionPhase,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub word_id: i64,
    pub prompt: String,
    /// Hidden on quiz cards until the answer is shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
    pub show_answer: bool,
    pub position: usize,
    pub deck_size: usize,
    pub remaining: usize,
    pub round: u32,
    pub phase: SessionPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub mode: StudyMode,
    pub category: Option<String>,
    pub section: Option<i64>,
    pub phase: SessionPhase,
    pub round: u32,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub words_studied: i64,
    pub retry_count: usize,
    pub started_at: DateTime<Utc>,
    pub current: Option<CardView>,
}

/// In-memory state of one learning run.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    id: String,
    user_id: String,
    mode: StudyMode,
    category: Option<String>,
    section: Option<i64>,
    deck: Vec<Card>,
    current_index: usize,
    show_answer: bool,
    retry_list: Vec<Card>,
    round: u32,
    phase: SessionPhase,
    correct_count: i64,
    incorrect_count: i64,
    studied: HashSet<i64>,
    answer_pending: bool,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        mode: StudyMode,
        category: Option<String>,
        section: Option<i64>,
        deck: Vec<Card>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if deck.is_empty() {
            return Err(SessionError::Empty);
        }
        if mode == StudyMode::Quiz && deck.iter().any(|card| card.question.is_none()) {
            return Err(SessionError::InvalidAnswer(
                "quiz decks need a question on every card".to_string(),
            ));
        }

        Ok(Self {
            id: id.into(),
            user_id: user_id.into(),
            mode,
            category,
            section,
            deck,
            current_index: 0,
            show_answer: false,
            retry_list: Vec::new(),
            round: 1,
            phase: SessionPhase::Main,
            correct_count: 0,
            incorrect_count: 0,
            studied: HashSet::new(),
            answer_pending: false,
            started_at: now,
            last_activity_at: now,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn current(&self) -> Option<CardView> {
        if self.is_finished() {
            return None;
        }
        let card = self.deck.get(self.current_index)?;

        let (prompt, options, correct_index, word) = match &card.question {
            Some(question) => (
                question.prompt.clone(),
                Some(question.options.clone()),
                self.show_answer.then_some(question.correct_index),
                self.show_answer.then(|| card.word.clone()),
            ),
            None => (card.word.headword.clone(), None, None, Some(card.word.clone())),
        };

        Some(CardView {
            word_id: card.word.id,
            prompt,
            word,
            options,
            correct_index,
            show_answer: self.show_answer,
            position: self.current_index + 1,
            deck_size: self.deck.len(),
            remaining: self.deck.len() - self.current_index,
            round: self.round,
            phase: self.phase,
        })
    }

    pub fn reveal(&mut self, now: DateTime<Utc>) -> Result<CardView, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        self.show_answer = true;
        self.last_activity_at = now;
        self.current().ok_or(SessionError::Finished)
    }

    /// Scores the current card, queues it for retry when missed and moves on.
    /// The caller is responsible for recording the mastery change.
    pub fn answer(
        &mut self,
        input: AnswerInput,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.answer_pending {
            return Err(SessionError::AnswerPending);
        }
        let graded = self.grade(input)?;
        Ok(self.apply(graded, now))
    }

    /// Grades the current card and holds it until [`commit_answer`] or
    /// [`cancel_answer`]. Other answers are refused in between, so the
    /// mastery write can happen before the session moves on.
    ///
    /// [`commit_answer`]: Self::commit_answer
    /// [`cancel_answer`]: Self::cancel_answer
    pub fn begin_answer(&mut self, input: AnswerInput) -> Result<PendingAnswer, SessionError> {
        if self.answer_pending {
            return Err(SessionError::AnswerPending);
        }
        let graded = self.grade(input)?;
        self.answer_pending = true;
        Ok(graded)
    }

    pub fn commit_answer(&mut self, pending: PendingAnswer, now: DateTime<Utc>) -> AnswerOutcome {
        self.answer_pending = false;
        self.apply(pending, now)
    }

    pub fn cancel_answer(&mut self) {
        self.answer_pending = false;
    }

    pub fn is_answer_pending(&self) -> bool {
        self.answer_pending
    }

    fn grade(&self, input: AnswerInput) -> Result<PendingAnswer, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        let card = self
            .deck
            .get(self.current_index)
            .ok_or(SessionError::Finished)?;

        let (correct, correct_index) = match (&card.question, input) {
            (Some(question), AnswerInput::Choice(choice)) => {
                if choice >= question.options.len() {
                    return Err(SessionError::InvalidChoice {
                        choice,
                        options: question.options.len(),
                    });
                }
                (question.is_correct(choice), Some(question.correct_index))
            }
            (None, AnswerInput::Known(known)) => (known, None),
            (Some(_), AnswerInput::Known(_)) => {
                return Err(SessionError::InvalidAnswer(
                    "quiz sessions expect a 'choice'".to_string(),
                ))
            }
            (None, AnswerInput::Choice(_)) => {
                return Err(SessionError::InvalidAnswer(format!(
                    "{} sessions expect 'known'",
                    self.mode
                )))
            }
        };

        Ok(PendingAnswer {
            word_id: card.word.id,
            correct,
            correct_index,
        })
    }

    fn apply(&mut self, graded: PendingAnswer, now: DateTime<Utc>) -> AnswerOutcome {
        let word_id = graded.word_id;
        self.studied.insert(word_id);
        if graded.correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
            if !self.retry_list.iter().any(|c| c.word.id == word_id) {
                if let Some(card) = self.deck.get(self.current_index) {
                    self.retry_list.push(card.clone());
                }
            }
        }

        self.show_answer = false;
        self.last_activity_at = now;
        self.advance();

        AnswerOutcome {
            word_id,
            correct: graded.correct,
            correct_index: graded.correct_index,
            phase: self.phase,
            round: self.round,
        }
    }

    fn advance(&mut self) {
        self.current_index += 1;
        if self.current_index < self.deck.len() {
            return;
        }

        if self.retry_list.is_empty() {
            self.phase = SessionPhase::Finished;
        } else {
            self.deck = std::mem::take(&mut self.retry_list);
            self.current_index = 0;
            self.round += 1;
            self.phase = SessionPhase::Retry;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            mode: self.mode,
            category: self.category.clone(),
            section: self.section,
            phase: self.phase,
            round: self.round,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            words_studied: self.studied.len() as i64,
            retry_count: self.retry_list.len(),
            started_at: self.started_at,
            current: self.current(),
        }
    }

    /// The record persisted when the session ends.
    pub fn summary(&self, now: DateTime<Utc>) -> StudySessionRecord {
        StudySessionRecord {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            mode: self.mode,
            category: self.category.clone(),
            section: self.section,
            words_studied: self.studied.len() as i64,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            started_at: self.started_at,
            completed_at: now,
            duration_seconds: (now - self.started_at).num_seconds().max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quiz::{build_question, QuizDirection};
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn word(id: i64, headword: &str, translation: &str) -> Word {
        Word {
            id,
            headword: headword.to_string(),
            translation: translation.to_string(),
            phonetic: None,
            examples: Vec::new(),
            category: "animals".to_string(),
            section: 1,
            audio_file: None,
            created_at: Utc::now(),
        }
    }

    fn words() -> Vec<Word> {
        vec![word(1, "cat", "gato"), word(2, "dog", "perro"), word(3, "bird", "pájaro")]
    }

    fn flashcards(now: DateTime<Utc>) -> ActiveSession {
        let deck = words().into_iter().map(Card::flashcard).collect();
        ActiveSession::new("s1", "u1", StudyMode::Flashcard, Some("animals".into()), None, deck, now)
            .unwrap()
    }

    fn quiz(now: DateTime<Utc>) -> ActiveSession {
        let pool = words();
        let mut rng = StdRng::seed_from_u64(5);
        let deck = pool
            .iter()
            .map(|w| {
                let question = build_question(w, &pool, 3, QuizDirection::WordToTranslation, &mut rng);
                Card::quiz(w.clone(), question)
            })
            .collect();
        ActiveSession::new("s2", "u1", StudyMode::Quiz, None, None, deck, now).unwrap()
    }

    #[test]
    fn empty_deck_is_rejected() {
        let err = ActiveSession::new("s", "u", StudyMode::Review, None, None, Vec::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn flashcards_walk_through_deck_and_finish() {
        let now = Utc::now();
        let mut session = flashcards(now);

        let first = session.current().unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(first.remaining, 3);
        assert!(!first.show_answer);

        assert!(session.reveal(now).unwrap().show_answer);
        session.answer(AnswerInput::Known(true), now).unwrap();
        assert!(!session.current().unwrap().show_answer);
        session.answer(AnswerInput::Known(true), now).unwrap();
        let outcome = session.answer(AnswerInput::Known(true), now).unwrap();

        assert_eq!(outcome.phase, SessionPhase::Finished);
        assert!(session.current().is_none());
        assert_eq!(session.answer(AnswerInput::Known(true), now), Err(SessionError::Finished));
        assert_eq!(session.reveal(now).unwrap_err(), SessionError::Finished);
    }

    #[test]
    fn missed_cards_come_back_in_a_retry_round() {
        let now = Utc::now();
        let mut session = flashcards(now);

        session.answer(AnswerInput::Known(false), now).unwrap();
        session.answer(AnswerInput::Known(true), now).unwrap();
        let outcome = session.answer(AnswerInput::Known(false), now).unwrap();
        assert_eq!(outcome.phase, SessionPhase::Retry);
        assert_eq!(outcome.round, 2);

        let card = session.current().unwrap();
        assert_eq!(card.word_id, 1);
        assert_eq!(card.deck_size, 2);

        session.answer(AnswerInput::Known(true), now).unwrap();
        session.answer(AnswerInput::Known(false), now).unwrap();
        assert_eq!(session.phase(), SessionPhase::Retry);
        assert_eq!(session.current().unwrap().word_id, 3);
        assert_eq!(session.snapshot().round, 3);

        session.answer(AnswerInput::Known(true), now).unwrap();
        assert!(session.is_finished());

        let record = session.summary(now + Duration::seconds(90));
        assert_eq!(record.words_studied, 3);
        assert_eq!(record.correct_count, 3);
        assert_eq!(record.incorrect_count, 3);
        assert_eq!(record.duration_seconds, 90);
        assert_eq!(record.category.as_deref(), Some("animals"));
    }

    #[test]
    fn quiz_cards_hide_answer_until_revealed() {
        let now = Utc::now();
        let mut session = quiz(now);
        let card = session.current().unwrap();
        assert!(card.word.is_none());
        assert!(card.correct_index.is_none());
        assert_eq!(card.options.as_ref().unwrap().len(), 3);

        let card = session.reveal(now).unwrap();
        assert!(card.word.is_some());
        assert!(card.correct_index.is_some());
    }

    #[test]
    fn quiz_scores_choices_and_validates_input() {
        let now = Utc::now();
        let mut session = quiz(now);

        assert_eq!(
            session.answer(AnswerInput::Choice(7), now),
            Err(SessionError::InvalidChoice { choice: 7, options: 3 })
        );
        assert!(matches!(
            session.answer(AnswerInput::Known(true), now),
            Err(SessionError::InvalidAnswer(_))
        ));

        let answer = session.deck[0].question.as_ref().unwrap().correct_index;
        let outcome = session.answer(AnswerInput::Choice(answer), now).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.correct_index, Some(answer));

        let wrong = (session.deck[1].question.as_ref().unwrap().correct_index + 1) % 3;
        assert!(!session.answer(AnswerInput::Choice(wrong), now).unwrap().correct);
        assert_eq!(session.snapshot().retry_count, 1);
    }

    #[test]
    fn flashcards_reject_choices() {
        let now = Utc::now();
        let mut session = flashcards(now);
        assert!(matches!(
            session.answer(AnswerInput::Choice(0), now),
            Err(SessionError::InvalidAnswer(_))
        ));
        assert_eq!(session.current().unwrap().position, 1);
    }

    #[test]
    fn pending_answer_holds_the_card_until_committed() {
        let now = Utc::now();
        let mut session = flashcards(now);

        let pending = session.begin_answer(AnswerInput::Known(false)).unwrap();
        assert_eq!(pending.word_id, 1);
        assert_eq!(
            session.begin_answer(AnswerInput::Known(true)).unwrap_err(),
            SessionError::AnswerPending
        );
        assert_eq!(
            session.answer(AnswerInput::Known(true), now).unwrap_err(),
            SessionError::AnswerPending
        );
        assert_eq!(session.current().unwrap().position, 1);

        session.cancel_answer();
        assert!(!session.is_answer_pending());
        assert_eq!(session.snapshot().incorrect_count, 0);
        assert_eq!(session.current().unwrap().word_id, 1);

        let pending = session.begin_answer(AnswerInput::Known(false)).unwrap();
        let outcome = session.commit_answer(pending, now);
        assert!(!outcome.correct);
        assert_eq!(session.current().unwrap().word_id, 2);
        assert_eq!(session.snapshot().retry_count, 1);
    }

    #[test]
    fn answer_request_needs_exactly_one_field() {
        let known = AnswerRequest { known: Some(true), choice: None };
        assert_eq!(AnswerInput::try_from(known), Ok(AnswerInput::Known(true)));
        assert!(AnswerInput::try_from(AnswerRequest::default()).is_err());
        let both = AnswerRequest { known: Some(false), choice: Some(1) };
        assert!(AnswerInput::try_from(both).is_err());
    }

    #[test]
    fn mode_round_trips_through_text() {
        for mode in [StudyMode::Flashcard, StudyMode::Quiz, StudyMode::Review] {
            assert_eq!(mode.as_str().parse::<StudyMode>().unwrap(), mode);
        }
        assert!("cram".parse::<StudyMode>().is_err());
    }
}
