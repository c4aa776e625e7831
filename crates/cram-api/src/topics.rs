//! Handlers for `/topics` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/topics` | Optional `?status=active\|archived` |
//! | `POST`   | `/topics` | Body: [`CreateTopicBody`]; 201 + details, 422 if moderation refuses |
//! | `GET`    | `/topics/{id}` | Topic with flashcards and test questions |
//! | `PUT`    | `/topics/{id}/summary` | Body: `{"summary":"..."}` |
//! | `POST`   | `/topics/{id}/archive` | 409 if already archived |
//! | `POST`   | `/topics/{id}/restore` | 409 if not archived |
//! | `DELETE` | `/topics/{id}` | Permanent; 204 |
//! | `POST`   | `/topics/{id}/attempts` | Body: `{"score":72.5}`; returns 201 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cram_core::{
  generate::{MaterialGenerator, generate_material},
  store::StudyStore,
  topic::{NewTopic, TestAttempt, Topic, TopicDetails, TopicFilter, parse_tags},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::UserId, error::ApiError, owned_folder, owned_topic};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub status: TopicFilter,
}

/// `GET /topics[?status=active|archived]`
pub async fn list<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Topic>>, ApiError> {
  let topics = state
    .store
    .list_topics(&user_id, params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topics))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /topics`.
///
/// `tags` is the raw comma-separated string typed by the user. The summary,
/// flashcards and test questions are generated from `content`.
#[derive(Debug, Deserialize)]
pub struct CreateTopicBody {
  pub title:     String,
  #[serde(default)]
  pub tags:      String,
  pub content:   String,
  pub folder_id: Option<Uuid>,
}

/// `POST /topics`: generate study material for `content`, then store the
/// topic with it in one write. Returns 201 + the stored [`TopicDetails`].
pub async fn create<S: StudyStore, G: MaterialGenerator>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Json(body): Json<CreateTopicBody>,
) -> Result<impl IntoResponse, ApiError> {
  let title = body.title.trim();
  if title.is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".into()));
  }
  if let Some(folder_id) = body.folder_id {
    owned_folder(&*state.store, folder_id, &user_id).await?;
  }

  let material = generate_material(&*state.generator, &body.content).await?;

  let input = NewTopic {
    user_id,
    folder_id: body.folder_id,
    title: title.to_owned(),
    tags: parse_tags(&body.tags),
    content: body.content,
    summary: material.summary,
    flashcards: material.flashcards,
    test_questions: material.test_questions,
  };

  let details = state
    .store
    .create_topic(input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    topic_id = %details.topic.topic_id,
    flashcards = details.flashcards.len(),
    test_questions = details.test_questions.len(),
    "topic created"
  );
  Ok((StatusCode::CREATED, Json(details)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /topics/{id}`
pub async fn get_one<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
) -> Result<Json<TopicDetails>, ApiError> {
  let details = state
    .store
    .get_topic_details(id)
    .await
    .map_err(ApiError::store)?
    .filter(|d| d.topic.user_id == user_id)
    .ok_or_else(|| ApiError::NotFound(format!("topic {id} not found")))?;
  Ok(Json(details))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryBody {
  pub summary: String,
}

/// `PUT /topics/{id}/summary`
pub async fn update_summary<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
  Json(body): Json<SummaryBody>,
) -> Result<Json<Topic>, ApiError> {
  owned_topic(&*state.store, id, &user_id).await?;
  let topic = state
    .store
    .update_summary(id, body.summary)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topic))
}

// ─── Archive ──────────────────────────────────────────────────────────────────

/// `POST /topics/{id}/archive`
pub async fn archive<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError> {
  let topic = owned_topic(&*state.store, id, &user_id).await?;
  if !topic.status.is_active() {
    return Err(ApiError::Conflict(format!("topic {id} is already archived")));
  }
  let topic = state
    .store
    .archive_topic(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topic))
}

/// `POST /topics/{id}/restore`
pub async fn restore<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError> {
  let topic = owned_topic(&*state.store, id, &user_id).await?;
  if topic.status.is_active() {
    return Err(ApiError::Conflict(format!("topic {id} is not archived")));
  }
  let topic = state
    .store
    .restore_topic(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topic))
}

/// `DELETE /topics/{id}`: permanent.
pub async fn delete<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  owned_topic(&*state.store, id, &user_id).await?;
  state
    .store
    .delete_topic(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Attempts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttemptBody {
  /// Percentage correct; clamped to `[0, 100]`.
  pub score: f64,
}

/// `POST /topics/{id}/attempts`: returns 201 + the stored [`TestAttempt`].
pub async fn record_attempt<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
  Json(body): Json<AttemptBody>,
) -> Result<(StatusCode, Json<TestAttempt>), ApiError> {
  owned_topic(&*state.store, id, &user_id).await?;
  let attempt = state
    .store
    .record_attempt(id, user_id, body.score)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(attempt)))
}
