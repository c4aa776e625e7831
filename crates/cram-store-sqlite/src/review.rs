//! [`ReviewSource`] for [`SqliteStore`]: the scoring pipeline and the
//! per-topic samplers used by intelligent review.
//!
//! A topic's score is the mean of its recorded test attempts. Topics that
//! were never tested have no score and are left out, so a user without any
//! test history gets an empty performance record. Archived topics are
//! ignored throughout.

use cram_core::review::{PerformanceRecord, ReviewCard, ReviewQuestion, ReviewSource};

use crate::{
  encode::{RawReviewCard, RawReviewQuestion},
  Error, Result, SqliteStore,
};

impl ReviewSource for SqliteStore {
  type Error = Error;

  async fn performance_data(&self, user_id: &str) -> Result<PerformanceRecord> {
    let user_id = user_id.to_owned();

    let rows: Vec<(String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.title, AVG(a.score)
           FROM test_attempts a
           JOIN topics t ON t.topic_id = a.topic_id
           WHERE t.user_id = ?1
             AND a.user_id = ?1
             AND t.archived_at IS NULL
           GROUP BY t.title",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows.into_iter().collect())
  }

  async fn flashcards_by_topic(
    &self,
    topic_name: &str,
    user_id:    &str,
    count:      usize,
  ) -> Result<Vec<ReviewCard>> {
    let topic_name = topic_name.to_owned();
    let user_id    = user_id.to_owned();
    let limit      = i64::try_from(count).unwrap_or(i64::MAX);

    let raws: Vec<RawReviewCard> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT f.question, f.answer, f.example, t.title
           FROM flashcards f
           JOIN topics t ON t.topic_id = f.topic_id
           WHERE t.user_id = ?1 AND t.title = ?2 AND t.archived_at IS NULL
           ORDER BY RANDOM()
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, topic_name, limit], |row| {
            Ok(RawReviewCard {
              question:   row.get(0)?,
              answer:     row.get(1)?,
              example:    row.get(2)?,
              topic_name: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawReviewCard::into_card).collect())
  }

  async fn test_questions_by_topic(
    &self,
    topic_name: &str,
    user_id:    &str,
    count:      usize,
  ) -> Result<Vec<ReviewQuestion>> {
    let topic_name = topic_name.to_owned();
    let user_id    = user_id.to_owned();
    let limit      = i64::try_from(count).unwrap_or(i64::MAX);

    let raws: Vec<RawReviewQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT q.question, q.answer, q.options, t.title
           FROM test_questions q
           JOIN topics t ON t.topic_id = q.topic_id
           WHERE t.user_id = ?1 AND t.title = ?2 AND t.archived_at IS NULL
           ORDER BY RANDOM()
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, topic_name, limit], |row| {
            Ok(RawReviewQuestion {
              question:   row.get(0)?,
              answer:     row.get(1)?,
              options:    row.get(2)?,
              topic_name: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReviewQuestion::into_question).collect()
  }
}
