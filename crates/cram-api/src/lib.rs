//! JSON REST API for Cram.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`StudyStore`] and [`ReviewSource`], plus a [`MaterialGenerator`] for new
//! topics. Authentication, TLS and transport
//! concerns are the caller's responsibility; the caller identity arrives in
//! the `X-User-Id` header (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cram_api::api_router(store, generator, ReviewConfig::default()))
//! ```

pub mod auth;
pub mod error;
pub mod folders;
pub mod review;
pub mod topics;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use cram_core::{
  generate::MaterialGenerator,
  review::{DEFAULT_WEAK_TOPIC_LIMIT, ReviewSelector, ReviewSource},
  store::StudyStore,
  topic::{Folder, Topic},
};
use serde::Deserialize;
use uuid::Uuid;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Intelligent-review tuning, usually read from the `[review]` table of the
/// server config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
  /// How many of the weakest topics a review draws from.
  pub weak_topic_limit:       usize,
  /// Used when a request does not say how many flashcards it wants.
  pub default_flashcards:     usize,
  pub default_test_questions: usize,
}

impl Default for ReviewConfig {
  fn default() -> Self {
    Self {
      weak_topic_limit:       DEFAULT_WEAK_TOPIC_LIMIT,
      default_flashcards:     10,
      default_test_questions: 5,
    }
  }
}

// ─── State ────────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, G> {
  pub store:     Arc<S>,
  pub generator: Arc<G>,
  pub review:    ReviewConfig,
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      generator: Arc::clone(&self.generator),
      review:    self.review,
    }
  }
}

impl<S, G> ApiState<S, G> {
  pub fn selector(&self) -> ReviewSelector {
    ReviewSelector::new(self.review.weak_topic_limit)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`, generating material
/// for new topics with `generator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(
  store: Arc<S>,
  generator: Arc<G>,
  review: ReviewConfig,
) -> Router<()>
where
  S: StudyStore + ReviewSource + 'static,
  G: MaterialGenerator + 'static,
{
  Router::new()
    // Topics
    .route("/topics", get(topics::list::<S, G>).post(topics::create::<S, G>))
    .route("/topics/{id}", get(topics::get_one::<S, G>).delete(topics::delete::<S, G>))
    .route("/topics/{id}/summary", put(topics::update_summary::<S, G>))
    .route("/topics/{id}/archive", post(topics::archive::<S, G>))
    .route("/topics/{id}/restore", post(topics::restore::<S, G>))
    .route("/topics/{id}/attempts", post(topics::record_attempt::<S, G>))
    // Folders
    .route("/folders", get(folders::list::<S, G>).post(folders::create::<S, G>))
    .route("/folders/{id}", put(folders::update::<S, G>))
    .route("/order", post(folders::reorder::<S, G>))
    // Review
    .route("/review/topics", post(review::topics::<S, G>))
    .route("/review/intelligent", post(review::intelligent::<S, G>))
    .with_state(ApiState { store, generator, review })
}

// ─── Ownership checks ─────────────────────────────────────────────────────────

/// Fetch a topic owned by `user_id`. Someone else's topic is reported as
/// missing.
pub(crate) async fn owned_topic<S: StudyStore>(
  store: &S,
  id: Uuid,
  user_id: &str,
) -> Result<Topic, ApiError> {
  store
    .get_topic(id)
    .await
    .map_err(ApiError::store)?
    .filter(|t| t.user_id == user_id)
    .ok_or_else(|| ApiError::NotFound(format!("topic {id} not found")))
}

/// Fetch a folder owned by `user_id`. Someone else's folder is reported as
/// missing.
pub(crate) async fn owned_folder<S: StudyStore>(
  store: &S,
  id: Uuid,
  user_id: &str,
) -> Result<Folder, ApiError> {
  store
    .get_folder(id)
    .await
    .map_err(ApiError::store)?
    .filter(|f| f.user_id == user_id)
    .ok_or_else(|| ApiError::NotFound(format!("folder {id} not found")))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use cram_core::{
    generate::GenerationError,
    topic::{NewFlashcard, NewTestQuestion, QuestionKind},
  };
  use cram_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  /// Stands in for the language-model service: two flashcards and two
  /// questions per text, and a moderation refusal for anything mentioning
  /// "forbidden".
  struct FakeGenerator;

  impl FakeGenerator {
    fn screen(text: &str) -> Result<(), GenerationError> {
      if text.contains("forbidden") {
        return Err(GenerationError::Refused("finish reason SAFETY".into()));
      }
      Ok(())
    }
  }

  impl MaterialGenerator for FakeGenerator {
    async fn summarize(&self, text: &str) -> Result<String, GenerationError> {
      Self::screen(text)?;
      Ok(format!("**Summary:** {text}"))
    }

    async fn flashcards(&self, text: &str) -> Result<Vec<NewFlashcard>, GenerationError> {
      Self::screen(text)?;
      Ok(vec![
        NewFlashcard {
          question: "What is a cell?".into(),
          answer:   "A unit of life".into(),
          example:  String::new(),
        },
        NewFlashcard {
          question: "Who found cells?".into(),
          answer:   "Hooke".into(),
          example:  "Cork under a microscope".into(),
        },
      ])
    }

    async fn test_questions(
      &self,
      text: &str,
    ) -> Result<Vec<NewTestQuestion>, GenerationError> {
      Self::screen(text)?;
      Ok(vec![
        NewTestQuestion {
          kind:     QuestionKind::MultipleChoice,
          question: "Cells are...".into(),
          options:  vec!["big".into(), "small".into()],
          answer:   "small".into(),
        },
        NewTestQuestion {
          kind:     QuestionKind::TrueFalse,
          question: "Cells exist.".into(),
          options:  Vec::new(),
          answer:   "true".into(),
        },
      ])
    }
  }

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), Arc::new(FakeGenerator), ReviewConfig::default())
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(auth::USER_ID_HEADER, user);
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = app
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn topic_body(title: &str) -> Value {
    json!({
      "title": title,
      "tags": "science, cells ,",
      "content": "The cell is the basic unit of life."
    })
  }

  async fn create_topic(app: &Router, user: &str, title: &str) -> String {
    let (status, body) =
      send(app, "POST", "/topics", Some(user), Some(topic_body(title))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["topic"]["topic_id"].as_str().unwrap().to_owned()
  }

  // ── Identity ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_user_header_is_401() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/topics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
  }

  // ── Topics ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_and_fetch_topic() {
    let app = app().await;
    let id = create_topic(&app, "u1", "Cells").await;

    let (status, body) =
      send(&app, "GET", &format!("/topics/{id}"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic"]["title"], "Cells");
    assert_eq!(body["topic"]["tags"], json!(["science", "cells"]));
    assert_eq!(body["topic"]["status"], "active");
    assert_eq!(
      body["topic"]["summary"],
      "**Summary:** The cell is the basic unit of life."
    );
    assert_eq!(body["flashcards"].as_array().unwrap().len(), 2);
    assert_eq!(body["test_questions"][1]["options"], json!([]));
  }

  #[tokio::test]
  async fn moderation_refusal_is_422_and_stores_nothing() {
    let app = app().await;
    let mut body = topic_body("Cells");
    body["content"] = json!("Some forbidden text.");

    let (status, resp) = send(&app, "POST", "/topics", Some("u1"), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp["error"].as_str().unwrap().contains("safety"));

    let (_, list) = send(&app, "GET", "/topics", Some("u1"), None).await;
    assert!(list.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn blank_content_is_rejected() {
    let app = app().await;
    let mut body = topic_body("Cells");
    body["content"] = json!("   ");
    let (status, _) = send(&app, "POST", "/topics", Some("u1"), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn blank_title_is_rejected() {
    let app = app().await;
    let (status, _) =
      send(&app, "POST", "/topics", Some("u1"), Some(topic_body("  "))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn other_users_topic_is_404() {
    let app = app().await;
    let id = create_topic(&app, "u1", "Cells").await;

    let (status, _) =
      send(&app, "GET", &format!("/topics/{id}"), Some("u2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
      send(&app, "DELETE", &format!("/topics/{id}"), Some("u2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn archive_restore_and_delete() {
    let app = app().await;
    let id = create_topic(&app, "u1", "Cells").await;

    let (status, body) =
      send(&app, "POST", &format!("/topics/{id}/archive"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "archived");

    let (status, _) =
      send(&app, "POST", &format!("/topics/{id}/archive"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) =
      send(&app, "GET", "/topics?status=archived", Some("u1"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = send(&app, "GET", "/topics", Some("u1"), None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) =
      send(&app, "POST", &format!("/topics/{id}/restore"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, _) =
      send(&app, "DELETE", &format!("/topics/{id}"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) =
      send(&app, "GET", &format!("/topics/{id}"), Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn summary_can_be_edited() {
    let app = app().await;
    let id = create_topic(&app, "u1", "Cells").await;

    let (status, body) = send(
      &app,
      "PUT",
      &format!("/topics/{id}/summary"),
      Some("u1"),
      Some(json!({ "summary": "Edited." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "Edited.");
  }

  // ── Folders & ordering ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn folders_and_reorder() {
    let app = app().await;
    let (status, one) = send(
      &app,
      "POST",
      "/folders",
      Some("u1"),
      Some(json!({ "name": "One", "emoji": "📘" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, two) =
      send(&app, "POST", "/folders", Some("u1"), Some(json!({ "name": "Two" }))).await;

    let (status, _) = send(
      &app,
      "POST",
      "/order",
      Some("u1"),
      Some(json!({
        "kind": "folders",
        "items": [
          { "id": one["folder_id"], "position": 1 },
          { "id": two["folder_id"], "position": 0 }
        ]
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, "GET", "/folders", Some("u1"), None).await;
    assert_eq!(list[0]["name"], "Two");
    assert_eq!(list[1]["emoji"], "📘");

    let (status, renamed) = send(
      &app,
      "PUT",
      &format!("/folders/{}", one["folder_id"].as_str().unwrap()),
      Some("u1"),
      Some(json!({ "name": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Renamed");
    assert_eq!(renamed["emoji"], "📘");
  }

  #[tokio::test]
  async fn foreign_folder_and_reorder_are_rejected() {
    let app = app().await;
    let (_, theirs) =
      send(&app, "POST", "/folders", Some("u2"), Some(json!({ "name": "X" }))).await;

    let mut body = topic_body("Cells");
    body["folder_id"] = theirs["folder_id"].clone();
    let (status, _) = send(&app, "POST", "/topics", Some("u1"), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let their_topic = create_topic(&app, "u2", "Theirs").await;
    let (status, _) = send(
      &app,
      "POST",
      "/order",
      Some("u1"),
      Some(json!({
        "kind": "topics",
        "items": [{ "id": their_topic, "position": 3 }]
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Review ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn intelligent_review_without_attempts_reports_not_enough_data() {
    let app = app().await;
    create_topic(&app, "u1", "Cells").await;

    let (status, body) =
      send(&app, "POST", "/review/intelligent", Some("u1"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_enough_data");
    assert_eq!(body["items"], json!([]));
  }

  #[tokio::test]
  async fn intelligent_review_samples_weak_topics() {
    let app = app().await;
    for (title, score) in [("A", 30.0), ("B", 95.0), ("C", 40.0), ("D", 10.0)] {
      let id = create_topic(&app, "u1", title).await;
      let (status, _) = send(
        &app,
        "POST",
        &format!("/topics/{id}/attempts"),
        Some("u1"),
        Some(json!({ "score": score })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
      &app,
      "POST",
      "/review/intelligent",
      Some("u1"),
      Some(json!({ "num_flashcards": 4, "num_test_questions": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let items = body["items"].as_array().unwrap();
    let cards = items.iter().filter(|i| i["kind"] == "flashcard").count();
    let questions = items.iter().filter(|i| i["kind"] == "test_question").count();
    assert_eq!(cards, 4);
    assert_eq!(questions, 3);
    assert!(items.iter().all(|i| i["topic_name"] != "B"));
  }

  #[tokio::test]
  async fn manual_review_skips_foreign_topics() {
    let app = app().await;
    let mine = create_topic(&app, "u1", "Mine").await;
    let theirs = create_topic(&app, "u2", "Theirs").await;

    let (status, body) = send(
      &app,
      "POST",
      "/review/topics",
      Some("u1"),
      Some(json!({ "topic_ids": [mine, theirs] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cards = body["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c["topic_name"] == "Mine"));
  }
}
