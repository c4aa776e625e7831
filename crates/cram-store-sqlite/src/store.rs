//! [`SqliteStore`], the SQLite implementation of [`StudyStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use cram_core::{
  review::ReviewMaterial,
  store::StudyStore,
  topic::{
    Flashcard, Folder, FolderUpdate, ItemKind, NewFolder, NewTopic, Placement,
    TestAttempt, TestQuestion, Topic, TopicDetails, TopicFilter, TopicStatus,
    normalize_score,
  },
};

use crate::{
  encode::{
    FOLDER_COLUMNS, RawFlashcard, RawFolder, RawQuestion, RawReviewCard,
    RawReviewQuestion, RawTopic, TOPIC_COLUMNS, encode_dt, encode_strings,
    encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cram study store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_flashcards(&self, topic_id: Uuid) -> Result<Vec<Flashcard>> {
    let id_str = encode_uuid(topic_id);

    let raws: Vec<RawFlashcard> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT flashcard_id, topic_id, question, answer, example
           FROM flashcards WHERE topic_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawFlashcard {
              flashcard_id: row.get(0)?,
              topic_id:     row.get(1)?,
              question:     row.get(2)?,
              answer:       row.get(3)?,
              example:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFlashcard::into_flashcard).collect()
  }

  async fn load_questions(&self, topic_id: Uuid) -> Result<Vec<TestQuestion>> {
    let id_str = encode_uuid(topic_id);

    let raws: Vec<RawQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT question_id, topic_id, kind, question, options, answer
           FROM test_questions WHERE topic_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawQuestion {
              question_id: row.get(0)?,
              topic_id:    row.get(1)?,
              kind:        row.get(2)?,
              question:    row.get(3)?,
              options:     row.get(4)?,
              answer:      row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  /// Fetch a topic or fail with [`Error::TopicNotFound`].
  async fn require_topic(&self, id: Uuid) -> Result<Topic> {
    self.get_topic(id).await?.ok_or(Error::TopicNotFound(id))
  }
}

// ─── StudyStore impl ─────────────────────────────────────────────────────────

impl StudyStore for SqliteStore {
  type Error = Error;

  // ── Topics ────────────────────────────────────────────────────────────────

  async fn create_topic(&self, input: NewTopic) -> Result<TopicDetails> {
    let topic_id   = Uuid::new_v4();
    let created_at = Utc::now();

    let flashcards: Vec<Flashcard> = input
      .flashcards
      .into_iter()
      .map(|c| Flashcard {
        flashcard_id: Uuid::new_v4(),
        topic_id,
        question: c.question,
        answer: c.answer,
        example: c.example,
      })
      .collect();

    let test_questions: Vec<TestQuestion> = input
      .test_questions
      .into_iter()
      .map(|q| TestQuestion {
        question_id: Uuid::new_v4(),
        topic_id,
        kind: q.kind,
        question: q.question,
        options: q.options,
        answer: q.answer,
      })
      .collect();

    let topic_id_str = encode_uuid(topic_id);
    let user_id      = input.user_id.clone();
    let folder_str   = input.folder_id.map(encode_uuid);
    let title        = input.title.clone();
    let tags_str     = encode_strings(&input.tags)?;
    let content      = input.content.clone();
    let summary      = input.summary.clone();
    let created_str  = encode_dt(created_at);

    let card_rows: Vec<(String, String, String, String)> = flashcards
      .iter()
      .map(|c| {
        (
          encode_uuid(c.flashcard_id),
          c.question.clone(),
          c.answer.clone(),
          c.example.clone(),
        )
      })
      .collect();

    let question_rows: Vec<(String, &'static str, String, String, String)> =
      test_questions
        .iter()
        .map(|q| {
          Ok((
            encode_uuid(q.question_id),
            q.kind.discriminant(),
            q.question.clone(),
            encode_strings(&q.options)?,
            q.answer.clone(),
          ))
        })
        .collect::<Result<_>>()?;

    // `None` means the folder does not exist or belongs to someone else.
    let position: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(folder) = &folder_str {
          let owned = tx
            .query_row(
              "SELECT 1 FROM folders WHERE folder_id = ?1 AND user_id = ?2",
              rusqlite::params![folder, user_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if !owned {
            return Ok(None);
          }
        }

        let position: i64 = tx.query_row(
          "SELECT COUNT(*) FROM topics
           WHERE user_id = ?1 AND folder_id IS ?2 AND archived_at IS NULL",
          rusqlite::params![user_id, folder_str],
          |r| r.get(0),
        )?;

        tx.execute(
          "INSERT INTO topics (
             topic_id, user_id, folder_id, title, tags, content, summary,
             position, archived_at, created_at, last_studied_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, NULL)",
          rusqlite::params![
            topic_id_str,
            user_id,
            folder_str,
            title,
            tags_str,
            content,
            summary,
            position,
            created_str,
          ],
        )?;

        {
          let mut stmt = tx.prepare(
            "INSERT INTO flashcards (flashcard_id, topic_id, question, answer, example, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (seq, (id, question, answer, example)) in card_rows.iter().enumerate() {
            stmt.execute(rusqlite::params![
              id,
              topic_id_str,
              question,
              answer,
              example,
              seq as i64,
            ])?;
          }
        }

        {
          let mut stmt = tx.prepare(
            "INSERT INTO test_questions (question_id, topic_id, kind, question, options, answer, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for (seq, (id, kind, question, options, answer)) in
            question_rows.iter().enumerate()
          {
            stmt.execute(rusqlite::params![
              id,
              topic_id_str,
              kind,
              question,
              options,
              answer,
              seq as i64,
            ])?;
          }
        }

        tx.commit()?;
        Ok(Some(position))
      })
      .await?;

    // The closure only reports `None` when a folder was given.
    let Some(position) = position else {
      return Err(Error::FolderNotFound(input.folder_id.unwrap_or_default()));
    };

    tracing::debug!(
      %topic_id,
      flashcards = flashcards.len(),
      test_questions = test_questions.len(),
      "created topic"
    );

    let topic = Topic {
      topic_id,
      user_id: input.user_id,
      folder_id: input.folder_id,
      title: input.title,
      tags: input.tags,
      content: input.content,
      summary: input.summary,
      position,
      status: TopicStatus::Active,
      created_at,
      last_studied_at: None,
    };

    Ok(TopicDetails { topic, flashcards, test_questions })
  }

  async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTopic> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
              rusqlite::params![id_str],
              RawTopic::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTopic::into_topic).transpose()
  }

  async fn get_topic_details(&self, id: Uuid) -> Result<Option<TopicDetails>> {
    let topic = match self.get_topic(id).await? {
      Some(t) => t,
      None    => return Ok(None),
    };

    let flashcards     = self.load_flashcards(id).await?;
    let test_questions = self.load_questions(id).await?;

    Ok(Some(TopicDetails { topic, flashcards, test_questions }))
  }

  async fn list_topics(
    &self,
    user_id: &str,
    filter:  TopicFilter,
  ) -> Result<Vec<Topic>> {
    let user_id = user_id.to_owned();
    let status_clause = match filter {
      TopicFilter::Active => "archived_at IS NULL",
      TopicFilter::Archived => "archived_at IS NOT NULL",
    };

    let raws: Vec<RawTopic> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TOPIC_COLUMNS} FROM topics
           WHERE user_id = ?1 AND {status_clause}
           ORDER BY folder_id, position, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawTopic::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTopic::into_topic).collect()
  }

  async fn update_summary(&self, id: Uuid, summary: String) -> Result<Topic> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topics SET summary = ?2 WHERE topic_id = ?1",
          rusqlite::params![id_str, summary],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::TopicNotFound(id));
    }
    self.require_topic(id).await
  }

  // ── Archive ───────────────────────────────────────────────────────────────

  async fn archive_topic(&self, id: Uuid) -> Result<Topic> {
    let mut topic = self.require_topic(id).await?;
    if !topic.status.is_active() {
      return Err(Error::AlreadyArchived(id));
    }

    let at     = Utc::now();
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE topics SET archived_at = ?2 WHERE topic_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    topic.status = TopicStatus::Archived { at };
    Ok(topic)
  }

  async fn restore_topic(&self, id: Uuid) -> Result<Topic> {
    let mut topic = self.require_topic(id).await?;
    if topic.status.is_active() {
      return Err(Error::NotArchived(id));
    }

    let id_str     = encode_uuid(id);
    let user_id    = topic.user_id.clone();
    let folder_str = topic.folder_id.map(encode_uuid);

    let position: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let position: i64 = tx.query_row(
          "SELECT COUNT(*) FROM topics
           WHERE user_id = ?1 AND folder_id IS ?2 AND archived_at IS NULL",
          rusqlite::params![user_id, folder_str],
          |r| r.get(0),
        )?;
        tx.execute(
          "UPDATE topics SET archived_at = NULL, position = ?2 WHERE topic_id = ?1",
          rusqlite::params![id_str, position],
        )?;
        tx.commit()?;
        Ok(position)
      })
      .await?;

    topic.status   = TopicStatus::Active;
    topic.position = position;
    Ok(topic)
  }

  async fn delete_topic(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM topics WHERE topic_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::TopicNotFound(id));
    }
    tracing::debug!(topic_id = %id, "deleted topic permanently");
    Ok(())
  }

  // ── Folders ───────────────────────────────────────────────────────────────

  async fn create_folder(&self, input: NewFolder) -> Result<Folder> {
    let folder_id  = Uuid::new_v4();
    let created_at = Utc::now();

    let id_str  = encode_uuid(folder_id);
    let at_str  = encode_dt(created_at);
    let user_id = input.user_id.clone();
    let name    = input.name.clone();
    let color   = input.color.clone();
    let emoji   = input.emoji.clone();

    let position: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let position: i64 = tx.query_row(
          "SELECT COUNT(*) FROM folders WHERE user_id = ?1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO folders (folder_id, user_id, name, color, emoji, position, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, user_id, name, color, emoji, position, at_str],
        )?;
        tx.commit()?;
        Ok(position)
      })
      .await?;

    Ok(Folder {
      folder_id,
      user_id: input.user_id,
      name: input.name,
      color: input.color,
      emoji: input.emoji,
      position,
      created_at,
    })
  }

  async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFolder> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE folder_id = ?1"),
              rusqlite::params![id_str],
              RawFolder::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFolder::into_folder).transpose()
  }

  async fn update_folder(&self, id: Uuid, update: FolderUpdate) -> Result<Folder> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE folders
           SET name  = ?2,
               color = COALESCE(?3, color),
               emoji = COALESCE(?4, emoji)
           WHERE folder_id = ?1",
          rusqlite::params![id_str, update.name, update.color, update.emoji],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::FolderNotFound(id));
    }
    self.get_folder(id).await?.ok_or(Error::FolderNotFound(id))
  }

  async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
    let user_id = user_id.to_owned();

    let raws: Vec<RawFolder> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FOLDER_COLUMNS} FROM folders
           WHERE user_id = ?1 ORDER BY position, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawFolder::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFolder::into_folder).collect()
  }

  // ── Ordering ──────────────────────────────────────────────────────────────

  async fn reorder(&self, kind: ItemKind, placements: Vec<Placement>) -> Result<()> {
    let sql = match kind {
      ItemKind::Topics => "UPDATE topics SET position = ?2 WHERE topic_id = ?1",
      ItemKind::Folders => "UPDATE folders SET position = ?2 WHERE folder_id = ?1",
    };
    let rows: Vec<(Uuid, String, i64)> = placements
      .iter()
      .map(|p| (p.id, encode_uuid(p.id), p.position))
      .collect();

    // `Some(id)` names the first unknown item; the transaction is dropped
    // uncommitted in that case.
    let missing: Option<Uuid> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(sql)?;
          for (id, id_str, position) in &rows {
            if stmt.execute(rusqlite::params![id_str, position])? == 0 {
              return Ok(Some(*id));
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match (missing, kind) {
      (None, _) => Ok(()),
      (Some(id), ItemKind::Topics) => Err(Error::TopicNotFound(id)),
      (Some(id), ItemKind::Folders) => Err(Error::FolderNotFound(id)),
    }
  }

  // ── Practice ──────────────────────────────────────────────────────────────

  async fn record_attempt(
    &self,
    topic_id: Uuid,
    user_id:  String,
    score:    f64,
  ) -> Result<TestAttempt> {
    let attempt = TestAttempt {
      attempt_id: Uuid::new_v4(),
      topic_id,
      user_id,
      score: normalize_score(score)?,
      taken_at: Utc::now(),
    };

    let attempt_id_str = encode_uuid(attempt.attempt_id);
    let topic_id_str   = encode_uuid(topic_id);
    let user_id        = attempt.user_id.clone();
    let score          = attempt.score;
    let at_str         = encode_dt(attempt.taken_at);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE topics SET last_studied_at = ?2 WHERE topic_id = ?1",
          rusqlite::params![topic_id_str, at_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO test_attempts (attempt_id, topic_id, user_id, score, taken_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![attempt_id_str, topic_id_str, user_id, score, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::TopicNotFound(topic_id));
    }
    Ok(attempt)
  }

  async fn review_material(&self, topic_ids: Vec<Uuid>) -> Result<ReviewMaterial> {
    let ids: Vec<String> = topic_ids.into_iter().map(encode_uuid).collect();

    let (raw_cards, raw_questions): (Vec<RawReviewCard>, Vec<RawReviewQuestion>) = self
      .conn
      .call(move |conn| {
        let mut cards_stmt = conn.prepare(
          "SELECT f.question, f.answer, f.example, t.title
           FROM flashcards f JOIN topics t ON t.topic_id = f.topic_id
           WHERE t.topic_id = ?1
           ORDER BY f.seq",
        )?;
        let mut questions_stmt = conn.prepare(
          "SELECT q.question, q.answer, q.options, t.title
           FROM test_questions q JOIN topics t ON t.topic_id = q.topic_id
           WHERE t.topic_id = ?1
           ORDER BY q.seq",
        )?;

        let mut cards = Vec::new();
        let mut questions = Vec::new();
        for id in &ids {
          let rows = cards_stmt.query_map(rusqlite::params![id], |row| {
            Ok(RawReviewCard {
              question:   row.get(0)?,
              answer:     row.get(1)?,
              example:    row.get(2)?,
              topic_name: row.get(3)?,
            })
          })?;
          for row in rows {
            cards.push(row?);
          }

          let rows = questions_stmt.query_map(rusqlite::params![id], |row| {
            Ok(RawReviewQuestion {
              question:   row.get(0)?,
              answer:     row.get(1)?,
              options:    row.get(2)?,
              topic_name: row.get(3)?,
            })
          })?;
          for row in rows {
            questions.push(row?);
          }
        }
        Ok((cards, questions))
      })
      .await?;

    Ok(ReviewMaterial {
      flashcards:     raw_cards.into_iter().map(RawReviewCard::into_card).collect(),
      test_questions: raw_questions
        .into_iter()
        .map(RawReviewQuestion::into_question)
        .collect::<Result<_>>()?,
    })
  }
}
