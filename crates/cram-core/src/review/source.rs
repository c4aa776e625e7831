use std::future::Future;

use super::{PerformanceRecord, ReviewCard, ReviewQuestion};

/// Data access needed by the review selector.
///
/// Implementations must only return material from topics owned by `user_id`.
/// An unknown topic name is not an error: return an empty list.
pub trait ReviewSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Mastery score per topic name for `user_id`. An empty record means
  /// there is not enough data to pick weak topics.
  fn performance_data<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<PerformanceRecord, Self::Error>> + Send + 'a;

  /// Up to `count` flashcards from the user's topic named `topic_name`.
  fn flashcards_by_topic<'a>(
    &'a self,
    topic_name: &'a str,
    user_id: &'a str,
    count: usize,
  ) -> impl Future<Output = Result<Vec<ReviewCard>, Self::Error>> + Send + 'a;

  /// Up to `count` test questions from the user's topic named `topic_name`.
  fn test_questions_by_topic<'a>(
    &'a self,
    topic_name: &'a str,
    user_id: &'a str,
    count: usize,
  ) -> impl Future<Output = Result<Vec<ReviewQuestion>, Self::Error>> + Send + 'a;
}
