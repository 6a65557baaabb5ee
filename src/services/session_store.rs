use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::services::study_session::{ActiveSession, AnswerInput, PendingAnswer, SessionError};

/// Active study sessions keyed by id. Every lookup is scoped to the owning
/// user; another user's id behaves like a missing session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ActiveSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: ActiveSession) {
        self.sessions
            .lock()
            .insert(session.id().to_string(), session);
    }

    /// Runs `f` against the user's session while holding the lock.
    pub fn with_session<R>(
        &self,
        session_id: &str,
        user_id: &str,
        f: impl FnOnce(&mut ActiveSession) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(session_id) {
            Some(session) if session.user_id() == user_id => Ok(f(session)),
            _ => Err(SessionError::NotFound),
        }
    }

    pub fn remove(&self, session_id: &str, user_id: &str) -> Result<ActiveSession, SessionError> {
        let mut sessions = self.sessions.lock();
        let owned = sessions
            .get(session_id)
            .is_some_and(|session| session.user_id() == user_id);
        if !owned {
            return Err(SessionError::NotFound);
        }
        sessions.remove(session_id).ok_or(SessionError::NotFound)
    }

    /// Grades the current card of the user's session and holds it until the
    /// returned guard is committed.
    pub fn begin_answer(
        self: &Arc<Self>,
        session_id: &str,
        user_id: &str,
        input: AnswerInput,
    ) -> Result<(PendingAnswer, AnswerGuard), SessionError> {
        let pending = self.with_session(session_id, user_id, |s| s.begin_answer(input))??;
        let guard = AnswerGuard {
            store: Arc::clone(self),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            armed: true,
        };
        Ok((pending, guard))
    }

    /// Removes sessions with no activity for longer than `idle` and hands
    /// them back.
    pub fn sweep_idle(&self, now: DateTime<Utc>, idle: Duration) -> Vec<ActiveSession> {
        let mut sessions = self.sessions.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| now - session.last_activity_at() > idle)
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases a session's pending answer on drop unless it was committed, so
/// a failed or abandoned request leaves the card unanswered.
#[must_use]
pub struct AnswerGuard {
    store: Arc<SessionStore>,
    session_id: String,
    user_id: String,
    armed: bool,
}

impl AnswerGuard {
    /// Applies the pending answer. Fails only when the session was removed
    /// meanwhile.
    pub fn commit<R>(
        mut self,
        f: impl FnOnce(&mut ActiveSession) -> R,
    ) -> Result<R, SessionError> {
        self.armed = false;
        self.store.with_session(&self.session_id, &self.user_id, f)
    }
}

impl Drop for AnswerGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .store
                .with_session(&self.session_id, &self.user_id, |s| s.cancel_answer());
        }
    }
}
