/// Per-topic quota for one sampling pass.
///
/// Returns `ceil(needed / topics_remaining)`, or `None` when nothing is
/// needed or there is no topic left to ask. If every topic delivers its full
/// quota, a single pass gathers at least `needed` items.
pub fn quota(needed: usize, topics_remaining: usize) -> Option<usize> {
  if needed == 0 || topics_remaining == 0 {
    return None;
  }
  Some(needed.div_ceil(topics_remaining))
}
