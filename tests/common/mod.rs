#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use vocab_study_backend::auth::sign_token;
use vocab_study_backend::config::Config;
use vocab_study_backend::db::operations::NewWord;
use vocab_study_backend::state::AppState;
use vocab_study_backend::{build_state, create_app};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn word(headword: &str, translation: &str, category: &str, section: i64) -> NewWord {
    NewWord {
        headword: headword.to_string(),
        translation: translation.to_string(),
        phonetic: None,
        examples: vec![format!("An example with {headword}.")],
        category: category.to_string(),
        section,
        audio_file: None,
    }
}

pub fn sample_words() -> Vec<NewWord> {
    vec![
        word("apple", "manzana", "food", 1),
        word("bread", "pan", "food", 1),
        word("cheese", "queso", "food", 1),
        word("milk", "leche", "food", 2),
        word("water", "agua", "food", 2),
        word("train", "tren", "travel", 1),
        word("ticket", "billete", "travel", 1),
        word("airport", "aeropuerto", "travel", 1),
    ]
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(Config::in_memory(TEST_SECRET)).await
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let state = build_state(config).await.unwrap();
    state.provider().import_words(&sample_words()).await.unwrap();
    TestApp {
        router: create_app(state.clone()),
        state,
    }
}

pub fn token_for(user_id: &str) -> String {
    sign_token(user_id, TEST_SECRET, chrono::Duration::hours(1)).unwrap()
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Runs a statement directly against the app's database.
    pub async fn execute_sql(&self, sql: &str) {
        sqlx::query(sql)
            .execute(self.state.provider().db().pool())
            .await
            .unwrap();
    }

    pub async fn word_id(&self, headword: &str) -> i64 {
        let (_, body) = self
            .get(&format!("/api/words/search?q={headword}&limit=1"), None)
            .await;
        body["data"][0]["id"].as_i64().unwrap()
    }
}
