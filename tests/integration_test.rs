use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

use common::{create_test_app, create_test_app_with, token_for};
use vocab_study_backend::config::Config;

#[tokio::test]
async fn test_health_root() {
    let app = create_test_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_live_and_info() {
    let app = create_test_app().await;
    let (status, _) = app.get("/health/live", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/health/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "vocab-study-backend");
    assert_eq!(body["cacheBackend"], "memory");
    assert_eq!(body["cacheHealthy"], true);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = create_test_app().await;
    let (status, body) = app.get("/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_categories_and_sections() {
    let app = create_test_app().await;
    let (status, body) = app.get("/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let categories = body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["category"], "food");
    assert_eq!(categories[0]["wordCount"], 5);
    assert_eq!(categories[0]["sectionCount"], 2);

    let (status, body) = app.get("/api/categories/food/sections", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][1]["section"], 2);
    assert_eq!(body["data"][1]["wordCount"], 2);

    let (status, body) = app.get("/api/categories/space/sections", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CATEGORY_NOT_FOUND");
}

#[tokio::test]
async fn test_words_listing_and_lookup() {
    let app = create_test_app().await;
    let (status, body) = app.get("/api/words?category=food&section=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let words = body["data"].as_array().unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0]["headword"], "milk");

    let id = app.word_id("train").await;
    let (status, body) = app.get(&format!("/api/words/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["translation"], "tren");
    assert_eq!(body["data"]["examples"][0], "An example with train.");

    let (status, _) = app.get("/api/words/99999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/words?section=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_ranks_and_validates() {
    let app = create_test_app().await;
    let (status, body) = app.get("/api/words/search?q=a", None).await;
    assert_eq!(status, StatusCode::OK);
    let words = body["data"].as_array().unwrap();
    // Prefix matches on the headword come before plain substring matches.
    assert_eq!(words[0]["headword"], "airport");
    assert_eq!(words[1]["headword"], "apple");

    let (status, body) = app.get("/api/words/search?q=queso", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["headword"], "cheese");

    let (status, body) = app.get("/api/words/search?q=%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_QUERY");

    let (_, body) = app.get("/api/words/search?q=e&limit=0", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_without_token() {
    let app = create_test_app().await;
    let (status, body) = app.get("/api/progress", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/statistics", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_secret_is_service_unavailable() {
    let mut config = Config::in_memory("unused");
    config.jwt_secret = None;
    let app = create_test_app_with(config).await;

    let (status, body) = app.get("/api/review", Some(&token_for("u1"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "AUTH_UNAVAILABLE");
}

#[tokio::test]
async fn test_progress_answers_and_favorites() {
    let app = create_test_app().await;
    let token = token_for("alice");
    let id = app.word_id("bread").await;

    let (status, body) = app.get(&format!("/api/progress/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["studyCount"], 0);

    for _ in 0..3 {
        let (status, _) = app
            .post(&format!("/api/progress/{id}/answer"), Some(&token), json!({"correct": true}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = app
        .post(&format!("/api/progress/{id}/answer"), Some(&token), json!({"correct": false}))
        .await;
    assert_eq!(body["data"]["studyCount"], 4);
    assert_eq!(body["data"]["correctCount"], 3);
    assert_eq!(body["data"]["incorrectCount"], 1);
    assert_eq!(body["data"]["masteryLevel"], 0.25);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/progress/{id}/favorite"),
            Some(&token),
            Some(json!({"favorite": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isFavorite"], true);
    assert_eq!(body["data"]["studyCount"], 4);

    let (_, body) = app.get("/api/progress/favorites", Some(&token)).await;
    assert_eq!(body["data"][0]["word"]["headword"], "bread");

    let (_, body) = app.get("/api/progress?category=travel", Some(&token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = app.get("/api/progress", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post("/api/progress/99999/answer", Some(&token), json!({"correct": true}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/progress", Some(&token_for("bob"))).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_review_list_lifecycle() {
    let app = create_test_app().await;
    let token = token_for("alice");
    let apple = app.word_id("apple").await;
    let milk = app.word_id("milk").await;

    let (status, body) = app.post("/api/review", Some(&token), json!({"wordId": apple})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], true);
    let (_, body) = app.post("/api/review", Some(&token), json!({"wordId": apple})).await;
    assert_eq!(body["data"]["added"], false);
    app.post("/api/review", Some(&token), json!({"wordId": milk})).await;

    let (status, _) = app.post("/api/review", Some(&token), json!({"wordId": 99999})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/review", Some(&token)).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["word"]["headword"], "milk");

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/review/{apple}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);
    let (_, body) = app
        .request(Method::DELETE, &format!("/api/review/{apple}"), Some(&token), None)
        .await;
    assert_eq!(body["data"]["removed"], false);

    let (status, body) = app.get("/api/review/due", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_quiz_endpoint() {
    let app = create_test_app().await;
    let (status, body) = app
        .get("/api/quiz?category=food&count=3&direction=translation_to_word", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let questions = body["data"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    for question in questions {
        let options = question["options"].as_array().unwrap();
        assert_eq!(options.len(), 4);
        let index = question["correctIndex"].as_u64().unwrap() as usize;
        assert!(index < options.len());
        assert_eq!(question["direction"], "translation_to_word");
    }

    let (status, _) = app.get("/api/quiz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/quiz?category=food&direction=up", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/quiz?category=space", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
