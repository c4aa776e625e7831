//! Study-material generation.
//!
//! A new topic's summary, flashcards and test questions are produced from the
//! user's source text by an external language-model service, reached through
//! [`MaterialGenerator`]. [`generate_material`] runs the three requests
//! concurrently and folds their outcomes into one result.

use std::future::Future;

use thiserror::Error;
use tracing::debug;

use crate::topic::{NewFlashcard, NewTestQuestion};

/// Why generation did not produce material.
#[derive(Debug, Error)]
pub enum GenerationError {
  /// The service declined the input on content-safety grounds. Retrying the
  /// same text will not help; the user has to revise it.
  #[error("content refused by moderation: {0}")]
  Refused(String),

  #[error("generation failed: {0}")]
  Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GenerationError {
  pub fn failed(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Failed(Box::new(e))
  }

  pub fn is_refusal(&self) -> bool { matches!(self, Self::Refused(_)) }
}

/// Produces study material from source text.
pub trait MaterialGenerator: Send + Sync {
  /// A markdown summary of `text`.
  fn summarize<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<String, GenerationError>> + Send + 'a;

  fn flashcards<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<NewFlashcard>, GenerationError>> + Send + 'a;

  /// A mix of multiple-choice and true/false questions on `text`.
  fn test_questions<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<NewTestQuestion>, GenerationError>> + Send + 'a;
}

/// Everything generated for one topic.
#[derive(Debug, Clone)]
pub struct GeneratedMaterial {
  pub summary:        String,
  pub flashcards:     Vec<NewFlashcard>,
  pub test_questions: Vec<NewTestQuestion>,
}

/// Run all three generators on `text` concurrently.
///
/// Nothing is returned unless all three succeed. A refusal from any of them
/// takes precedence over other failures.
pub async fn generate_material<G: MaterialGenerator>(
  generator: &G,
  text: &str,
) -> Result<GeneratedMaterial, GenerationError> {
  let (summary, flashcards, test_questions) = futures::join!(
    generator.summarize(text),
    generator.flashcards(text),
    generator.test_questions(text),
  );

  match (summary, flashcards, test_questions) {
    (Ok(summary), Ok(flashcards), Ok(test_questions)) => {
      debug!(
        flashcards = flashcards.len(),
        test_questions = test_questions.len(),
        "generated study material"
      );
      Ok(GeneratedMaterial { summary, flashcards, test_questions })
    }
    (summary, flashcards, test_questions) => Err(
      [summary.err(), flashcards.err(), test_questions.err()]
        .into_iter()
        .flatten()
        .reduce(|kept, next| {
          if next.is_refusal() && !kept.is_refusal() { next } else { kept }
        })
        .unwrap_or_else(|| GenerationError::Failed("no generator reported an error".into())),
    ),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::topic::QuestionKind;

  #[derive(Debug, Error)]
  #[error("model timed out")]
  struct Timeout;

  #[derive(Clone, Copy, PartialEq)]
  enum Part {
    Summary,
    Flashcards,
    Questions,
  }

  #[derive(Default)]
  struct FakeGenerator {
    refuse: Option<Part>,
    fail:   Option<Part>,
    calls:  AtomicUsize,
  }

  impl FakeGenerator {
    fn outcome(&self, part: Part) -> Result<(), GenerationError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.refuse == Some(part) {
        return Err(GenerationError::Refused("SAFETY".into()));
      }
      if self.fail == Some(part) {
        return Err(GenerationError::failed(Timeout));
      }
      Ok(())
    }
  }

  impl MaterialGenerator for FakeGenerator {
    async fn summarize(&self, text: &str) -> Result<String, GenerationError> {
      self.outcome(Part::Summary)?;
      Ok(format!("Summary of {text}"))
    }

    async fn flashcards(&self, text: &str) -> Result<Vec<NewFlashcard>, GenerationError> {
      self.outcome(Part::Flashcards)?;
      Ok(vec![NewFlashcard {
        question: format!("What is {text}?"),
        answer:   text.to_owned(),
        example:  String::new(),
      }])
    }

    async fn test_questions(
      &self,
      text: &str,
    ) -> Result<Vec<NewTestQuestion>, GenerationError> {
      self.outcome(Part::Questions)?;
      Ok(vec![NewTestQuestion {
        kind:     QuestionKind::TrueFalse,
        question: format!("{text} is true."),
        options:  Vec::new(),
        answer:   "true".into(),
      }])
    }
  }

  #[tokio::test]
  async fn all_three_parts_are_generated() {
    let generator = FakeGenerator::default();
    let material = generate_material(&generator, "mitosis").await.unwrap();

    assert_eq!(material.summary, "Summary of mitosis");
    assert_eq!(material.flashcards.len(), 1);
    assert_eq!(material.test_questions[0].answer, "true");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn refusal_wins_over_other_failures() {
    let generator = FakeGenerator {
      refuse: Some(Part::Questions),
      fail: Some(Part::Summary),
      ..Default::default()
    };
    let err = generate_material(&generator, "x").await.unwrap_err();
    assert!(err.is_refusal());
    // Every request is still issued; none is cancelled by another's failure.
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn backend_failure_is_reported() {
    let generator = FakeGenerator { fail: Some(Part::Flashcards), ..Default::default() };
    let err = generate_material(&generator, "x").await.unwrap_err();
    assert!(matches!(err, GenerationError::Failed(_)));
    assert_eq!(err.to_string(), "generation failed: model timed out");
  }
}
