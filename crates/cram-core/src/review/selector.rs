use futures::future::join_all;
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, warn};

use super::{
  PerformanceRecord, ReviewCard, ReviewItem, ReviewQuestion, ReviewRequest,
  ReviewSelection, ReviewSource, quota,
};

/// How many of the weakest topics a review draws from by default.
pub const DEFAULT_WEAK_TOPIC_LIMIT: usize = 3;

/// The `k` weakest topic names, weakest first.
///
/// Equal scores are ordered by topic name.
pub fn rank_weakest(performance: &PerformanceRecord, k: usize) -> Vec<String> {
  // `iter` yields topics in name order and `sort_by` is stable, so ties keep
  // name order.
  let mut ranked: Vec<(&str, f64)> = performance.iter().collect();
  ranked.sort_by(|(_, a), (_, b)| a.total_cmp(b));
  ranked
    .into_iter()
    .take(k)
    .map(|(name, _)| name.to_owned())
    .collect()
}

/// Picks review material from a user's weakest topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSelector {
  weak_topic_limit: usize,
}

impl Default for ReviewSelector {
  fn default() -> Self { Self::new(DEFAULT_WEAK_TOPIC_LIMIT) }
}

impl ReviewSelector {
  /// A selector drawing from the `weak_topic_limit` weakest topics (at
  /// least one).
  pub fn new(weak_topic_limit: usize) -> Self {
    Self { weak_topic_limit: weak_topic_limit.max(1) }
  }

  pub fn weak_topic_limit(&self) -> usize { self.weak_topic_limit }

  /// Build a shuffled review session for `user_id`.
  ///
  /// Never fails: an unavailable performance source yields an empty
  /// selection, and a failing per-topic fetch contributes nothing.
  pub async fn select<S, R>(
    &self,
    source: &S,
    user_id: &str,
    request: ReviewRequest,
    rng: &mut R,
  ) -> ReviewSelection
  where
    S: ReviewSource,
    R: Rng + ?Sized,
  {
    let performance = match source.performance_data(user_id).await {
      Ok(performance) => performance,
      Err(error) => {
        warn!(user_id, %error, "performance data unavailable; returning empty review");
        return ReviewSelection::empty();
      }
    };

    if performance.is_empty() {
      debug!(user_id, "no performance data; returning empty review");
      return ReviewSelection::empty();
    }

    let topics = rank_weakest(&performance, self.weak_topic_limit);
    debug!(user_id, ?topics, "selected weak topics");

    let (cards, questions) = futures::join!(
      gather_flashcards(source, &topics, user_id, request.num_flashcards),
      gather_test_questions(source, &topics, user_id, request.num_test_questions),
    );

    debug!(
      user_id,
      flashcards = cards.len(),
      test_questions = questions.len(),
      "gathered review material"
    );

    let mut items: Vec<ReviewItem> = cards
      .into_iter()
      .map(ReviewItem::Flashcard)
      .chain(questions.into_iter().map(ReviewItem::TestQuestion))
      .collect();
    items.shuffle(rng);

    ReviewSelection { items }
  }
}

/// One pass over `topics`, each asked for the same quota. Results are kept
/// in rank order, then capped at `wanted`.
async fn gather_flashcards<S: ReviewSource>(
  source: &S,
  topics: &[String],
  user_id: &str,
  wanted: usize,
) -> Vec<ReviewCard> {
  let Some(per_topic) = quota(wanted, topics.len()) else {
    return Vec::new();
  };

  let fetches: Vec<_> = topics
    .iter()
    .map(|topic| topic_flashcards(source, topic, user_id, per_topic))
    .collect();

  let mut cards: Vec<ReviewCard> =
    join_all(fetches).await.into_iter().flatten().collect();
  cards.truncate(wanted);
  cards
}

/// Same as [`gather_flashcards`] for test questions.
async fn gather_test_questions<S: ReviewSource>(
  source: &S,
  topics: &[String],
  user_id: &str,
  wanted: usize,
) -> Vec<ReviewQuestion> {
  let Some(per_topic) = quota(wanted, topics.len()) else {
    return Vec::new();
  };

  let fetches: Vec<_> = topics
    .iter()
    .map(|topic| topic_test_questions(source, topic, user_id, per_topic))
    .collect();

  let mut questions: Vec<ReviewQuestion> =
    join_all(fetches).await.into_iter().flatten().collect();
  questions.truncate(wanted);
  questions
}

async fn topic_flashcards<S: ReviewSource>(
  source: &S,
  topic: &str,
  user_id: &str,
  count: usize,
) -> Vec<ReviewCard> {
  match source.flashcards_by_topic(topic, user_id, count).await {
    Ok(cards) => cards,
    Err(error) => {
      warn!(topic, %error, "flashcard fetch failed; topic contributes nothing");
      Vec::new()
    }
  }
}

async fn topic_test_questions<S: ReviewSource>(
  source: &S,
  topic: &str,
  user_id: &str,
  count: usize,
) -> Vec<ReviewQuestion> {
  match source.test_questions_by_topic(topic, user_id, count).await {
    Ok(questions) => questions,
    Err(error) => {
      warn!(topic, %error, "test question fetch failed; topic contributes nothing");
      Vec::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex};

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("backend unavailable")]
  struct Unavailable;

  /// How a fake topic answers a fetch.
  #[derive(Clone, Copy)]
  enum Supply {
    /// Returns exactly what was asked for.
    Unlimited,
    /// Returns at most this many.
    Limited(usize),
    /// Ignores the count and returns this many.
    Fixed(usize),
    Failing,
  }

  #[derive(Default)]
  struct FakeSource {
    owner:       String,
    performance: Option<PerformanceRecord>,
    cards:       HashMap<String, Supply>,
    questions:   HashMap<String, Supply>,
    calls:       Mutex<Vec<(&'static str, String, usize)>>,
  }

  impl FakeSource {
    fn new(scores: &[(&str, f64)]) -> Self {
      Self {
        owner: "u1".into(),
        performance: Some(scores.iter().map(|(n, s)| (*n, *s)).collect()),
        ..Default::default()
      }
    }

    fn unavailable() -> Self {
      Self { owner: "u1".into(), performance: None, ..Default::default() }
    }

    fn cards(mut self, topic: &str, supply: Supply) -> Self {
      self.cards.insert(topic.into(), supply);
      self
    }

    fn questions(mut self, topic: &str, supply: Supply) -> Self {
      self.questions.insert(topic.into(), supply);
      self
    }

    fn calls(&self) -> Vec<(&'static str, String, usize)> {
      self.calls.lock().unwrap().clone()
    }

    fn served(
      &self,
      kind: &'static str,
      supply: Option<Supply>,
      topic: &str,
      user_id: &str,
      count: usize,
    ) -> Result<usize, Unavailable> {
      self.calls.lock().unwrap().push((kind, topic.to_owned(), count));
      if user_id != self.owner {
        return Ok(0);
      }
      match supply.unwrap_or(Supply::Limited(0)) {
        Supply::Unlimited => Ok(count),
        Supply::Limited(max) => Ok(count.min(max)),
        Supply::Fixed(n) => Ok(n),
        Supply::Failing => Err(Unavailable),
      }
    }
  }

  impl ReviewSource for FakeSource {
    type Error = Unavailable;

    async fn performance_data(
      &self,
      user_id: &str,
    ) -> Result<PerformanceRecord, Unavailable> {
      match &self.performance {
        Some(_) if user_id != self.owner => Ok(PerformanceRecord::new()),
        Some(record) => Ok(record.clone()),
        None => Err(Unavailable),
      }
    }

    async fn flashcards_by_topic(
      &self,
      topic_name: &str,
      user_id: &str,
      count: usize,
    ) -> Result<Vec<ReviewCard>, Unavailable> {
      let supply = self.cards.get(topic_name).copied();
      let n = self.served("cards", supply, topic_name, user_id, count)?;
      Ok(
        (0..n)
          .map(|i| ReviewCard {
            question:   format!("{topic_name} card {i}"),
            answer:     format!("answer {i}"),
            example:    None,
            topic_name: topic_name.to_owned(),
          })
          .collect(),
      )
    }

    async fn test_questions_by_topic(
      &self,
      topic_name: &str,
      user_id: &str,
      count: usize,
    ) -> Result<Vec<ReviewQuestion>, Unavailable> {
      let supply = self.questions.get(topic_name).copied();
      let n = self.served("questions", supply, topic_name, user_id, count)?;
      Ok(
        (0..n)
          .map(|i| ReviewQuestion {
            question:   format!("{topic_name} question {i}"),
            answer:     "true".into(),
            options:    vec![],
            topic_name: topic_name.to_owned(),
          })
          .collect(),
      )
    }
  }

  fn request(cards: usize, questions: usize) -> ReviewRequest {
    ReviewRequest { num_flashcards: cards, num_test_questions: questions }
  }

  fn rng() -> StdRng { StdRng::seed_from_u64(7) }

  // ─── Ranking ───────────────────────────────────────────────────────────────

  #[test]
  fn ranks_weakest_first_and_drops_the_rest() {
    let record: PerformanceRecord =
      [("A", 20.0), ("B", 80.0), ("C", 50.0), ("D", 10.0)]
        .into_iter()
        .collect();
    assert_eq!(rank_weakest(&record, 3), ["D", "A", "C"]);
  }

  #[test]
  fn ties_are_broken_by_name() {
    let record: PerformanceRecord =
      [("zeta", 40.0), ("alpha", 40.0), ("mid", 10.0), ("beta", 40.0)]
        .into_iter()
        .collect();
    assert_eq!(rank_weakest(&record, 3), ["mid", "alpha", "beta"]);
  }

  #[test]
  fn fewer_topics_than_limit() {
    let record: PerformanceRecord = [("only", 70.0)].into_iter().collect();
    assert_eq!(rank_weakest(&record, 3), ["only"]);
    assert!(rank_weakest(&PerformanceRecord::new(), 3).is_empty());
  }

  #[test]
  fn limit_is_at_least_one() {
    assert_eq!(ReviewSelector::new(0).weak_topic_limit(), 1);
    assert_eq!(ReviewSelector::default().weak_topic_limit(), 3);
  }

  // ─── Selection ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn empty_performance_makes_no_fetches() {
    let source = FakeSource::new(&[]);
    let selection = ReviewSelector::default()
      .select(&source, "u1", request(10, 5), &mut rng())
      .await;

    assert!(selection.is_empty());
    assert!(source.calls().is_empty());
  }

  #[tokio::test]
  async fn unavailable_performance_degrades_to_empty() {
    let source = FakeSource::unavailable();
    let selection = ReviewSelector::default()
      .select(&source, "u1", request(10, 5), &mut rng())
      .await;

    assert!(selection.is_empty());
    assert!(source.calls().is_empty());
  }

  #[tokio::test]
  async fn each_topic_gets_the_same_quota_and_result_is_capped() {
    let source = FakeSource::new(&[("A", 20.0), ("B", 80.0), ("C", 50.0), ("D", 10.0)])
      .cards("A", Supply::Unlimited)
      .cards("B", Supply::Unlimited)
      .cards("C", Supply::Unlimited)
      .cards("D", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(10, 0), &mut rng())
      .await;

    let mut card_calls: Vec<_> = source
      .calls()
      .into_iter()
      .filter(|(kind, ..)| *kind == "cards")
      .map(|(_, topic, count)| (topic, count))
      .collect();
    card_calls.sort();
    assert_eq!(
      card_calls,
      [("A".to_owned(), 4), ("C".to_owned(), 4), ("D".to_owned(), 4)]
    );

    assert_eq!(selection.flashcards().count(), 10);
    assert!(selection.flashcards().all(|c| c.topic_name != "B"));
  }

  #[tokio::test]
  async fn truncation_keeps_weakest_topics_first() {
    let source = FakeSource::new(&[("A", 20.0), ("C", 50.0), ("D", 10.0)])
      .cards("A", Supply::Unlimited)
      .cards("C", Supply::Unlimited)
      .cards("D", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(10, 0), &mut rng())
      .await;

    let mut per_topic: HashMap<String, usize> = HashMap::new();
    for card in selection.flashcards() {
      *per_topic.entry(card.topic_name.clone()).or_default() += 1;
    }
    // 4 + 4 + 4 gathered in rank order D, A, C; the cap trims C.
    assert_eq!(per_topic["D"], 4);
    assert_eq!(per_topic["A"], 4);
    assert_eq!(per_topic["C"], 2);
  }

  #[tokio::test]
  async fn over_delivering_store_is_capped() {
    let source = FakeSource::new(&[("A", 5.0), ("B", 6.0)])
      .cards("A", Supply::Fixed(50))
      .cards("B", Supply::Fixed(50))
      .questions("A", Supply::Fixed(50))
      .questions("B", Supply::Fixed(50));

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(3, 4), &mut rng())
      .await;

    assert_eq!(selection.flashcards().count(), 3);
    assert_eq!(selection.test_questions().count(), 4);
  }

  #[tokio::test]
  async fn exhausted_topic_shortfall_is_not_redistributed() {
    let source = FakeSource::new(&[("A", 20.0), ("C", 50.0), ("D", 10.0)])
      .cards("D", Supply::Limited(0))
      .cards("A", Supply::Unlimited)
      .cards("C", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(10, 0), &mut rng())
      .await;

    assert_eq!(selection.flashcards().count(), 8);
    assert!(selection.flashcards().all(|c| c.topic_name != "D"));
  }

  #[tokio::test]
  async fn failing_topic_contributes_nothing() {
    let source = FakeSource::new(&[("A", 20.0), ("B", 30.0)])
      .questions("A", Supply::Failing)
      .questions("B", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(0, 6), &mut rng())
      .await;

    assert_eq!(selection.test_questions().count(), 3);
    assert!(selection.test_questions().all(|q| q.topic_name == "B"));
  }

  #[tokio::test]
  async fn zero_requested_never_asks_for_that_kind() {
    let source = FakeSource::new(&[("A", 20.0)])
      .cards("A", Supply::Unlimited)
      .questions("A", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "u1", request(0, 2), &mut rng())
      .await;

    assert_eq!(selection.len(), 2);
    assert!(source.calls().iter().all(|(kind, _, count)| {
      *kind == "questions" && *count > 0
    }));
  }

  #[tokio::test]
  async fn other_users_get_nothing() {
    let source = FakeSource::new(&[("A", 20.0)]).cards("A", Supply::Unlimited);

    let selection = ReviewSelector::default()
      .select(&source, "intruder", request(5, 5), &mut rng())
      .await;

    assert!(selection.is_empty());
  }

  #[tokio::test]
  async fn seeded_shuffle_is_reproducible_permutation() {
    let source = FakeSource::new(&[("A", 20.0), ("B", 30.0), ("C", 40.0)])
      .cards("A", Supply::Unlimited)
      .cards("B", Supply::Unlimited)
      .cards("C", Supply::Unlimited)
      .questions("A", Supply::Unlimited)
      .questions("B", Supply::Unlimited)
      .questions("C", Supply::Unlimited);
    let selector = ReviewSelector::default();

    let first = selector
      .select(&source, "u1", request(9, 6), &mut StdRng::seed_from_u64(42))
      .await;
    let second = selector
      .select(&source, "u1", request(9, 6), &mut StdRng::seed_from_u64(42))
      .await;
    assert_eq!(first, second);

    // Same multiset as the unshuffled gather.
    let mut shuffled: Vec<String> = first
      .items
      .iter()
      .map(|item| match item {
        ReviewItem::Flashcard(c) => c.question.clone(),
        ReviewItem::TestQuestion(q) => q.question.clone(),
      })
      .collect();
    shuffled.sort();

    let mut expected: Vec<String> = ["A", "B", "C"]
      .iter()
      .flat_map(|t| {
        (0..3)
          .map(move |i| format!("{t} card {i}"))
          .chain((0..2).map(move |i| format!("{t} question {i}")))
      })
      .collect();
    expected.sort();

    assert_eq!(shuffled, expected);
  }
}
