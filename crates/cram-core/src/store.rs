//! The `StudyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `cram-store-sqlite`).
//! Higher layers (`cram-api`) depend on this abstraction, not on any concrete
//! backend. Intelligent review reads through the separate
//! [`ReviewSource`](crate::review::ReviewSource) trait, which backends
//! usually implement alongside this one.

use std::future::Future;

use uuid::Uuid;

use crate::{
  review::ReviewMaterial,
  topic::{
    Folder, FolderUpdate, ItemKind, NewFolder, NewTopic, Placement, TestAttempt,
    Topic, TopicDetails, TopicFilter,
  },
};

/// Abstraction over a Cram study store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StudyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Topics ────────────────────────────────────────────────────────────

  /// Persist a topic with its flashcards and test questions in one
  /// transaction. The topic is appended after the active topics of its
  /// folder.
  fn create_topic(
    &self,
    input: NewTopic,
  ) -> impl Future<Output = Result<TopicDetails, Self::Error>> + Send + '_;

  /// Retrieve a topic by UUID. Returns `None` if not found.
  fn get_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// Retrieve a topic with all of its material. Returns `None` if not found.
  fn get_topic_details(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TopicDetails>, Self::Error>> + Send + '_;

  /// List a user's topics on one side of the archive, ordered by folder then
  /// position.
  fn list_topics<'a>(
    &'a self,
    user_id: &'a str,
    filter: TopicFilter,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + 'a;

  /// Replace a topic's summary.
  fn update_summary(
    &self,
    id: Uuid,
    summary: String,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  // ── Archive ───────────────────────────────────────────────────────────

  /// Move an active topic to the archive.
  ///
  /// Returns an error if the topic is missing or already archived.
  fn archive_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  /// Bring an archived topic back, appended after the active topics of its
  /// folder.
  ///
  /// Returns an error if the topic is missing or not archived.
  fn restore_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  /// Permanently delete a topic, its material and its test attempts.
  fn delete_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Folders ───────────────────────────────────────────────────────────

  /// Create a folder appended after the user's existing folders.
  fn create_folder(
    &self,
    input: NewFolder,
  ) -> impl Future<Output = Result<Folder, Self::Error>> + Send + '_;

  fn get_folder(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Folder>, Self::Error>> + Send + '_;

  fn update_folder(
    &self,
    id: Uuid,
    update: FolderUpdate,
  ) -> impl Future<Output = Result<Folder, Self::Error>> + Send + '_;

  /// List a user's folders by position.
  fn list_folders<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Folder>, Self::Error>> + Send + 'a;

  // ── Ordering ──────────────────────────────────────────────────────────

  /// Apply a drag-and-drop reorder. Either every placement is applied or,
  /// if any id is unknown, none is.
  fn reorder(
    &self,
    kind: ItemKind,
    placements: Vec<Placement>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Practice ──────────────────────────────────────────────────────────

  /// Record a practice-test score (clamped to `[0, 100]`) and mark the
  /// topic as studied.
  fn record_attempt(
    &self,
    topic_id: Uuid,
    user_id: String,
    score: f64,
  ) -> impl Future<Output = Result<TestAttempt, Self::Error>> + Send + '_;

  /// All flashcards and test questions of the given topics, tagged with
  /// the topic title. Unknown ids are skipped.
  fn review_material(
    &self,
    topic_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<ReviewMaterial, Self::Error>> + Send + '_;
}
