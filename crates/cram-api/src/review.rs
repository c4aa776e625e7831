//! Handlers for `/review` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/review/topics` | Body: `{"topic_ids":[...]}`; all material of those topics |
//! | `POST` | `/review/intelligent` | Body: [`IntelligentBody`]; weak-topic sample |

use axum::{Json, extract::State};
use cram_core::{
  review::{ReviewItem, ReviewMaterial, ReviewRequest, ReviewSource},
  store::StudyStore,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, auth::UserId, error::ApiError};

// ─── Manual review ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TopicsBody {
  pub topic_ids: Vec<Uuid>,
}

/// `POST /review/topics`: flashcards and questions of the selected topics.
///
/// Ids that are unknown or belong to another user are skipped.
pub async fn topics<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Json(body): Json<TopicsBody>,
) -> Result<Json<ReviewMaterial>, ApiError> {
  let mut owned = Vec::with_capacity(body.topic_ids.len());
  for id in body.topic_ids {
    let topic = state.store.get_topic(id).await.map_err(ApiError::store)?;
    if topic.is_some_and(|t| t.user_id == user_id) {
      owned.push(id);
    }
  }

  let material = state
    .store
    .review_material(owned)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(material))
}

// ─── Intelligent review ───────────────────────────────────────────────────────

/// JSON body accepted by `POST /review/intelligent`. Missing counts fall back
/// to the configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct IntelligentBody {
  pub num_flashcards:     Option<usize>,
  pub num_test_questions: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
  Ok,
  /// No performance data yet; distinct from an error so clients can prompt
  /// the user to take a practice test first.
  NotEnoughData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
  pub status: ReviewStatus,
  pub items:  Vec<ReviewItem>,
}

/// `POST /review/intelligent`
pub async fn intelligent<S: ReviewSource, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Json(body): Json<IntelligentBody>,
) -> Result<Json<ReviewResponse>, ApiError> {
  let request = ReviewRequest {
    num_flashcards:     body
      .num_flashcards
      .unwrap_or(state.review.default_flashcards),
    num_test_questions: body
      .num_test_questions
      .unwrap_or(state.review.default_test_questions),
  };

  let selection = state
    .selector()
    .select(&*state.store, &user_id, request, &mut StdRng::from_os_rng())
    .await;

  let wanted = request.num_flashcards.saturating_add(request.num_test_questions);
  let status = if selection.is_empty() && wanted > 0 {
    ReviewStatus::NotEnoughData
  } else {
    ReviewStatus::Ok
  };
  tracing::info!(
    user_id = %user_id,
    items = selection.len(),
    ?status,
    "intelligent review served"
  );

  Ok(Json(ReviewResponse { status, items: selection.items }))
}
