//! Reviewer selection policy
//!
//! Initial assignment is deterministic: the first `MAX_REVIEWERS` candidates
//! in the order storage returns them (user ID order). Replacement picks one
//! candidate uniformly at random from a source that is re-seeded on every
//! call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use reviewer_shared::service::selection::{FixedSource, ReviewerSelector};
//!
//! let selector = ReviewerSelector::new(Arc::new(FixedSource::new(1)));
//! assert!(selector.select_initial(&[]).is_empty());
//! ```

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::error::{ServiceError, ServiceResult};
use crate::models::{User, MAX_REVIEWERS};

/// Source of random indices for replacement picks
pub trait RandomSource: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn index(&self, len: usize) -> usize;
}

/// Production source: fresh OS entropy for every pick
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn index(&self, len: usize) -> usize {
        let mut rng = StdRng::from_entropy();
        rng.gen_range(0..len)
    }
}

/// Deterministic source for tests: always `value % len`
#[derive(Debug, Clone, Copy)]
pub struct FixedSource {
    value: usize,
}

impl FixedSource {
    pub fn new(value: usize) -> Self {
        Self { value }
    }
}

impl RandomSource for FixedSource {
    fn index(&self, len: usize) -> usize {
        self.value % len
    }
}

/// Picks reviewers from a candidate pool
#[derive(Clone)]
pub struct ReviewerSelector {
    random: Arc<dyn RandomSource>,
}

impl ReviewerSelector {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Selector backed by [`EntropySource`]
    pub fn entropy() -> Self {
        Self::new(Arc::new(EntropySource))
    }

    /// First `MAX_REVIEWERS` candidates, in the given order
    ///
    /// An empty pool yields an empty list.
    pub fn select_initial(&self, candidates: &[User]) -> Vec<String> {
        candidates
            .iter()
            .take(MAX_REVIEWERS)
            .map(|user| user.id.clone())
            .collect()
    }

    /// One candidate chosen uniformly at random
    ///
    /// # Errors
    ///
    /// `ServiceError::NoCandidate` if the pool is empty.
    pub fn select_replacement<'a>(&self, candidates: &'a [User]) -> ServiceResult<&'a User> {
        if candidates.is_empty() {
            return Err(ServiceError::NoCandidate);
        }
        let index = self.random.index(candidates.len());
        candidates.get(index).ok_or(ServiceError::NoCandidate)
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(ids: &[&str]) -> Vec<User> {
        ids.iter()
            .map(|id| User {
                id: id.to_string(),
                username: id.to_uppercase(),
                is_active: true,
                team_id: 1,
                team_name: "backend".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_select_initial_takes_first_two() {
        let selector = ReviewerSelector::new(Arc::new(FixedSource::new(0)));

        assert_eq!(selector.select_initial(&users(&["u2", "u3", "u4"])), vec!["u2", "u3"]);
        assert_eq!(selector.select_initial(&users(&["u2"])), vec!["u2"]);
        assert!(selector.select_initial(&[]).is_empty());
    }

    #[test]
    fn test_select_replacement_empty_pool() {
        let selector = ReviewerSelector::entropy();
        let result = selector.select_replacement(&[]);
        assert!(matches!(result, Err(ServiceError::NoCandidate)));
    }

    #[test]
    fn test_select_replacement_uses_source() {
        let pool = users(&["u2", "u3", "u4"]);

        let selector = ReviewerSelector::new(Arc::new(FixedSource::new(4)));
        assert_eq!(selector.select_replacement(&pool).unwrap().id, "u3");
    }

    #[test]
    fn test_entropy_source_in_range() {
        let source = EntropySource;
        for len in 1..20 {
            assert!(source.index(len) < len);
        }
    }
}
