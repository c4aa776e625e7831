//! Intelligent review: resampling study material from the weakest topics.
//!
//! The selector ([`ReviewSelector`]) ranks a user's topics by performance
//! score, keeps the few weakest, and draws an evenly distributed sample of
//! flashcards and test questions from them. Data access goes through the
//! injected [`ReviewSource`] so the algorithm stays storage-agnostic.

mod quota;
mod selector;
mod source;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use quota::quota;
pub use selector::{DEFAULT_WEAK_TOPIC_LIMIT, ReviewSelector, rank_weakest};
pub use source::ReviewSource;

// ─── Performance ─────────────────────────────────────────────────────────────

/// Mastery score per topic name, in `[0, 100]`. Lower is weaker.
///
/// Backed by a [`BTreeMap`] so iteration is ordered by topic name; the
/// ranking relies on that for its tie-break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceRecord {
  scores: BTreeMap<String, f64>,
}

impl PerformanceRecord {
  pub fn new() -> Self { Self::default() }

  /// Record `score` for `topic_name`, clamped into `[0, 100]`. NaN scores
  /// are ignored.
  pub fn insert(&mut self, topic_name: impl Into<String>, score: f64) {
    if score.is_nan() {
      return;
    }
    self.scores.insert(topic_name.into(), score.clamp(0.0, 100.0));
  }

  pub fn get(&self, topic_name: &str) -> Option<f64> {
    self.scores.get(topic_name).copied()
  }

  pub fn len(&self) -> usize { self.scores.len() }

  pub fn is_empty(&self) -> bool { self.scores.is_empty() }

  /// Iterate `(topic_name, score)` pairs in topic-name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.scores.iter().map(|(name, score)| (name.as_str(), *score))
  }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PerformanceRecord {
  fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
    let mut record = Self::new();
    for (name, score) in iter {
      record.insert(name, score);
    }
    record
  }
}

// ─── Review items ────────────────────────────────────────────────────────────

/// A flashcard as shown in a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCard {
  pub question:   String,
  pub answer:     String,
  pub example:    Option<String>,
  pub topic_name: String,
}

/// A test question as shown in a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQuestion {
  pub question:   String,
  pub answer:     String,
  /// Empty for true/false questions.
  pub options:    Vec<String>,
  pub topic_name: String,
}

/// One entry of a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewItem {
  Flashcard(ReviewCard),
  TestQuestion(ReviewQuestion),
}

impl ReviewItem {
  pub fn topic_name(&self) -> &str {
    match self {
      Self::Flashcard(card) => &card.topic_name,
      Self::TestQuestion(question) => &question.topic_name,
    }
  }
}

/// How many items of each kind the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewRequest {
  pub num_flashcards:     usize,
  pub num_test_questions: usize,
}

/// The shuffled, size-capped result of an intelligent review.
///
/// An empty selection is a valid outcome meaning there was not enough
/// performance data to pick weak topics from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSelection {
  pub items: Vec<ReviewItem>,
}

impl ReviewSelection {
  pub fn empty() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn len(&self) -> usize { self.items.len() }

  /// The flashcards, in session order.
  pub fn flashcards(&self) -> impl Iterator<Item = &ReviewCard> {
    self.items.iter().filter_map(|item| match item {
      ReviewItem::Flashcard(card) => Some(card),
      ReviewItem::TestQuestion(_) => None,
    })
  }

  /// The test questions, in session order.
  pub fn test_questions(&self) -> impl Iterator<Item = &ReviewQuestion> {
    self.items.iter().filter_map(|item| match item {
      ReviewItem::TestQuestion(question) => Some(question),
      ReviewItem::Flashcard(_) => None,
    })
  }

  /// Split into flashcards and test questions, each keeping session order.
  pub fn into_parts(self) -> (Vec<ReviewCard>, Vec<ReviewQuestion>) {
    let mut cards = Vec::new();
    let mut questions = Vec::new();
    for item in self.items {
      match item {
        ReviewItem::Flashcard(card) => cards.push(card),
        ReviewItem::TestQuestion(question) => questions.push(question),
      }
    }
    (cards, questions)
  }
}

/// All material of an explicit set of topics, for a manual review session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewMaterial {
  pub flashcards:     Vec<ReviewCard>,
  pub test_questions: Vec<ReviewQuestion>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn performance_record_clamps_and_skips_nan() {
    let record: PerformanceRecord =
      [("a", -10.0), ("b", 250.0), ("c", f64::NAN), ("d", 55.0)]
        .into_iter()
        .collect();

    assert_eq!(record.len(), 3);
    assert_eq!(record.get("a"), Some(0.0));
    assert_eq!(record.get("b"), Some(100.0));
    assert_eq!(record.get("c"), None);
    assert_eq!(record.get("d"), Some(55.0));
  }

  #[test]
  fn selection_splits_by_kind_in_order() {
    let card = |q: &str| {
      ReviewItem::Flashcard(ReviewCard {
        question:   q.into(),
        answer:     "a".into(),
        example:    None,
        topic_name: "t".into(),
      })
    };
    let question = |q: &str| {
      ReviewItem::TestQuestion(ReviewQuestion {
        question:   q.into(),
        answer:     "true".into(),
        options:    vec![],
        topic_name: "t".into(),
      })
    };
    let selection = ReviewSelection {
      items: vec![card("c1"), question("q1"), card("c2")],
    };

    let cards: Vec<_> =
      selection.flashcards().map(|c| c.question.as_str()).collect();
    assert_eq!(cards, ["c1", "c2"]);
    assert_eq!(selection.test_questions().count(), 1);

    let (cards, questions) = selection.into_parts();
    assert_eq!(cards.len(), 2);
    assert_eq!(questions[0].question, "q1");
  }

  #[test]
  fn review_item_is_tagged_by_kind() {
    let item = ReviewItem::TestQuestion(ReviewQuestion {
      question:   "2 + 2?".into(),
      answer:     "4".into(),
      options:    vec!["3".into(), "4".into()],
      topic_name: "Arithmetic".into(),
    });
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["kind"], "test_question");
    assert_eq!(json["topic_name"], "Arithmetic");
  }
}
