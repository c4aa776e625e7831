//! Handlers for `/folders` and `/order`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/folders` | The caller's folders by position |
//! | `POST` | `/folders` | Body: `{"name":"...","color":"#hex","emoji":"📚"}` |
//! | `PUT`  | `/folders/{id}` | Body: [`FolderUpdate`] |
//! | `POST` | `/order` | Body: [`ReorderBody`]; 204 |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use cram_core::{
  store::StudyStore,
  topic::{Folder, FolderUpdate, ItemKind, NewFolder, Placement},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::UserId, error::ApiError, owned_folder, owned_topic};

/// `GET /folders`
pub async fn list<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
) -> Result<Json<Vec<Folder>>, ApiError> {
  let folders = state
    .store
    .list_folders(&user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(folders))
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderBody {
  pub name:  String,
  pub color: Option<String>,
  pub emoji: Option<String>,
}

/// `POST /folders`: returns 201 + the stored [`Folder`].
pub async fn create<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Json(body): Json<CreateFolderBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("folder name must not be empty".into()));
  }

  let folder = state
    .store
    .create_folder(NewFolder {
      user_id,
      name: name.to_owned(),
      color: body.color,
      emoji: body.emoji,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(folder)))
}

/// `PUT /folders/{id}`
pub async fn update<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Path(id): Path<Uuid>,
  Json(body): Json<FolderUpdate>,
) -> Result<Json<Folder>, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("folder name must not be empty".into()));
  }
  owned_folder(&*state.store, id, &user_id).await?;

  let folder = state
    .store
    .update_folder(id, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(folder))
}

/// JSON body accepted by `POST /order`.
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  pub kind:  ItemKind,
  pub items: Vec<Placement>,
}

/// `POST /order`: persist a drag-and-drop reorder of topics or folders.
pub async fn reorder<S: StudyStore, G>(
  State(state): State<ApiState<S, G>>,
  UserId(user_id): UserId,
  Json(body): Json<ReorderBody>,
) -> Result<StatusCode, ApiError> {
  for placement in &body.items {
    match body.kind {
      ItemKind::Topics => {
        owned_topic(&*state.store, placement.id, &user_id).await?;
      }
      ItemKind::Folders => {
        owned_folder(&*state.store, placement.id, &user_id).await?;
      }
    }
  }

  state
    .store
    .reorder(body.kind, body.items)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
