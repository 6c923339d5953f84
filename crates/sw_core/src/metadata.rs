//! Typed session metadata: skipped strategies and importance ratings.
//!
//! Persisted as a `{ "skippedStrategies": [...], "strategyRatings": {...} }`
//! object on the session record; the conversion lives in `sw_io`.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CoreError;
use crate::ids::StrategyId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub skipped_strategy_ids: BTreeSet<StrategyId>,
    /// Importance rating per strategy, `0..=max_strategy_rating`.
    pub strategy_ratings: BTreeMap<StrategyId, u8>,
}

impl SessionMetadata {
    pub fn is_skipped(&self, id: &StrategyId) -> bool {
        self.skipped_strategy_ids.contains(id)
    }

    /// Returns `true` if the set changed.
    pub fn set_skipped(&mut self, id: &StrategyId, skipped: bool) -> bool {
        if skipped {
            self.skipped_strategy_ids.insert(id.clone())
        } else {
            self.skipped_strategy_ids.remove(id)
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_strategy_ids.len()
    }

    pub fn set_rating(&mut self, id: &StrategyId, rating: u8, max: u8) -> Result<(), CoreError> {
        if rating > max {
            return Err(CoreError::RatingOutOfRange);
        }
        self.strategy_ratings.insert(id.clone(), rating);
        Ok(())
    }

    pub fn rating(&self, id: &StrategyId) -> Option<u8> {
        self.strategy_ratings.get(id).copied()
    }
}
