//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. String lists (tags,
//! question options) are stored as compact JSON arrays. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use cram_core::{
  review::{ReviewCard, ReviewQuestion},
  topic::{
    Flashcard, Folder, QuestionKind, TestQuestion, Topic, TopicStatus,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_strings(values: &[String]) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_strings(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

/// Empty examples are stored as `''` and surface as `None` in reviews.
fn non_empty(s: String) -> Option<String> {
  if s.is_empty() { None } else { Some(s) }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawTopic::from_row`].
pub const TOPIC_COLUMNS: &str = "topic_id, user_id, folder_id, title, tags, \
  content, summary, position, archived_at, created_at, last_studied_at";

/// Raw strings read directly from a `topics` row.
pub struct RawTopic {
  pub topic_id:        String,
  pub user_id:         String,
  pub folder_id:       Option<String>,
  pub title:           String,
  pub tags:            String,
  pub content:         String,
  pub summary:         String,
  pub position:        i64,
  pub archived_at:     Option<String>,
  pub created_at:      String,
  pub last_studied_at: Option<String>,
}

impl RawTopic {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:        row.get(0)?,
      user_id:         row.get(1)?,
      folder_id:       row.get(2)?,
      title:           row.get(3)?,
      tags:            row.get(4)?,
      content:         row.get(5)?,
      summary:         row.get(6)?,
      position:        row.get(7)?,
      archived_at:     row.get(8)?,
      created_at:      row.get(9)?,
      last_studied_at: row.get(10)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    let status = match self.archived_at.as_deref() {
      Some(at) => TopicStatus::Archived { at: decode_dt(at)? },
      None => TopicStatus::Active,
    };

    Ok(Topic {
      topic_id: decode_uuid(&self.topic_id)?,
      user_id: self.user_id,
      folder_id: self.folder_id.as_deref().map(decode_uuid).transpose()?,
      title: self.title,
      tags: decode_strings(&self.tags)?,
      content: self.content,
      summary: self.summary,
      position: self.position,
      status,
      created_at: decode_dt(&self.created_at)?,
      last_studied_at: self
        .last_studied_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Column list matching [`RawFolder::from_row`].
pub const FOLDER_COLUMNS: &str =
  "folder_id, user_id, name, color, emoji, position, created_at";

/// Raw strings read directly from a `folders` row.
pub struct RawFolder {
  pub folder_id:  String,
  pub user_id:    String,
  pub name:       String,
  pub color:      Option<String>,
  pub emoji:      Option<String>,
  pub position:   i64,
  pub created_at: String,
}

impl RawFolder {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      folder_id:  row.get(0)?,
      user_id:    row.get(1)?,
      name:       row.get(2)?,
      color:      row.get(3)?,
      emoji:      row.get(4)?,
      position:   row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_folder(self) -> Result<Folder> {
    Ok(Folder {
      folder_id:  decode_uuid(&self.folder_id)?,
      user_id:    self.user_id,
      name:       self.name,
      color:      self.color,
      emoji:      self.emoji,
      position:   self.position,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `flashcards` row.
pub struct RawFlashcard {
  pub flashcard_id: String,
  pub topic_id:     String,
  pub question:     String,
  pub answer:       String,
  pub example:      String,
}

impl RawFlashcard {
  pub fn into_flashcard(self) -> Result<Flashcard> {
    Ok(Flashcard {
      flashcard_id: decode_uuid(&self.flashcard_id)?,
      topic_id:     decode_uuid(&self.topic_id)?,
      question:     self.question,
      answer:       self.answer,
      example:      self.example,
    })
  }
}

/// Raw strings read from a `test_questions` row.
pub struct RawQuestion {
  pub question_id: String,
  pub topic_id:    String,
  pub kind:        String,
  pub question:    String,
  pub options:     String,
  pub answer:      String,
}

impl RawQuestion {
  pub fn into_question(self) -> Result<TestQuestion> {
    Ok(TestQuestion {
      question_id: decode_uuid(&self.question_id)?,
      topic_id:    decode_uuid(&self.topic_id)?,
      kind:        QuestionKind::from_discriminant(&self.kind)?,
      question:    self.question,
      options:     decode_strings(&self.options)?,
      answer:      self.answer,
    })
  }
}

/// A flashcard joined with its topic title, as read for reviews.
pub struct RawReviewCard {
  pub question:   String,
  pub answer:     String,
  pub example:    String,
  pub topic_name: String,
}

impl RawReviewCard {
  pub fn into_card(self) -> ReviewCard {
    ReviewCard {
      question:   self.question,
      answer:     self.answer,
      example:    non_empty(self.example),
      topic_name: self.topic_name,
    }
  }
}

/// A test question joined with its topic title, as read for reviews.
pub struct RawReviewQuestion {
  pub question:   String,
  pub answer:     String,
  pub options:    String,
  pub topic_name: String,
}

impl RawReviewQuestion {
  pub fn into_question(self) -> Result<ReviewQuestion> {
    Ok(ReviewQuestion {
      question:   self.question,
      answer:     self.answer,
      options:    decode_strings(&self.options)?,
      topic_name: self.topic_name,
    })
  }
}
