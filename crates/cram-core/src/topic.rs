//! Topics, folders, and the study material attached to a topic.
//!
//! A topic is the unit of study: the submitted text, its generated summary,
//! and the flashcards and test questions derived from it. Topics live in at
//! most one folder and are ordered within it by `position`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// Whether a topic is in the active listings or in the archive.
///
/// Archiving is a soft delete: archived topics keep all their material and
/// can be restored until they are permanently deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopicStatus {
  Active,
  Archived { at: DateTime<Utc> },
}

impl TopicStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

/// Which side of the archive a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicFilter {
  #[default]
  Active,
  Archived,
}

// ─── Topic ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:        Uuid,
  /// Identity-provider user id of the owner.
  pub user_id:         String,
  /// `None` means the topic is uncategorised.
  pub folder_id:       Option<Uuid>,
  pub title:           String,
  pub tags:            Vec<String>,
  /// The original text submitted by the user.
  pub content:         String,
  pub summary:         String,
  /// Ordinal within the folder; smaller sorts first.
  pub position:        i64,
  #[serde(flatten)]
  pub status:          TopicStatus,
  pub created_at:      DateTime<Utc>,
  pub last_studied_at: Option<DateTime<Utc>>,
}

// ─── Study material ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
  pub flashcard_id: Uuid,
  pub topic_id:     Uuid,
  pub question:     String,
  pub answer:       String,
  /// A worked example; empty when the generator produced none.
  pub example:      String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  TrueFalse,
}

impl QuestionKind {
  /// The string stored in the `kind` column.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::MultipleChoice => "multiple_choice",
      Self::TrueFalse => "true_false",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "multiple_choice" => Ok(Self::MultipleChoice),
      "true_false" => Ok(Self::TrueFalse),
      other => Err(Error::UnknownQuestionKind(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestQuestion {
  pub question_id: Uuid,
  pub topic_id:    Uuid,
  pub kind:        QuestionKind,
  pub question:    String,
  /// Candidate answers; empty for true/false questions.
  pub options:     Vec<String>,
  pub answer:      String,
}

/// Generated flashcard content, before it is attached to a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlashcard {
  pub question: String,
  pub answer:   String,
  #[serde(default)]
  pub example:  String,
}

/// Generated test-question content, before it is attached to a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestQuestion {
  pub kind:     QuestionKind,
  pub question: String,
  #[serde(default)]
  pub options:  Vec<String>,
  pub answer:   String,
}

// ─── NewTopic ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::StudyStore::create_topic`].
///
/// The summary and material are produced upstream by the LLM service; the
/// store only persists them. `position` and `created_at` are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewTopic {
  pub user_id:        String,
  pub folder_id:      Option<Uuid>,
  pub title:          String,
  pub tags:           Vec<String>,
  pub content:        String,
  pub summary:        String,
  pub flashcards:     Vec<NewFlashcard>,
  pub test_questions: Vec<NewTestQuestion>,
}

impl NewTopic {
  /// Convenience constructor with no folder, tags, summary or material.
  pub fn new(
    user_id: impl Into<String>,
    title: impl Into<String>,
    content: impl Into<String>,
  ) -> Self {
    Self {
      user_id:        user_id.into(),
      folder_id:      None,
      title:          title.into(),
      tags:           Vec::new(),
      content:        content.into(),
      summary:        String::new(),
      flashcards:     Vec::new(),
      test_questions: Vec::new(),
    }
  }
}

/// Split a comma-separated tag string, trimming whitespace and dropping
/// empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
    .collect()
}

/// A topic together with all of its material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDetails {
  pub topic:          Topic,
  pub flashcards:     Vec<Flashcard>,
  pub test_questions: Vec<TestQuestion>,
}

// ─── Folders ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
  pub folder_id:  Uuid,
  pub user_id:    String,
  pub name:       String,
  pub color:      Option<String>,
  pub emoji:      Option<String>,
  pub position:   i64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFolder {
  pub user_id: String,
  pub name:    String,
  pub color:   Option<String>,
  pub emoji:   Option<String>,
}

/// Changes applied by [`crate::store::StudyStore::update_folder`].
///
/// The name is always replaced; colour and emoji only when `Some`.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderUpdate {
  pub name:  String,
  pub color: Option<String>,
  pub emoji: Option<String>,
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The collection a reorder batch applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Topics,
  Folders,
}

/// The new position of one item after a drag-and-drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
  pub id:       Uuid,
  pub position: i64,
}

// ─── Test attempts ───────────────────────────────────────────────────────────

/// A scored practice-test run. Attempts feed the performance scores used by
/// intelligent review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttempt {
  pub attempt_id: Uuid,
  pub topic_id:   Uuid,
  pub user_id:    String,
  /// Percentage correct, in `[0, 100]`.
  pub score:      f64,
  pub taken_at:   DateTime<Utc>,
}

/// Clamp a raw score into `[0, 100]`, rejecting NaN.
pub fn normalize_score(score: f64) -> Result<f64> {
  if score.is_nan() {
    return Err(Error::InvalidScore);
  }
  Ok(score.clamp(0.0, 100.0))
}
