//! Consolidation of submitted first-iteration allocations for one strategy.
//!
//! Averages divide by the number of distinct respondents who submitted
//! anything for the strategy, so not picking an indicator counts as 0.
//! The caller's own rows are hidden from the per-respondent lists but still
//! feed the average.

use std::collections::{BTreeMap, BTreeSet};

use sw_core::ids::{IndicatorId, RespondentId, SessionId};
use sw_core::rounding::round2;

#[cfg(feature = "serde")]
use serde::Serialize;

/// One submitted allocation row joined with its respondent.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedAllocation {
    pub respondent_id: RespondentId,
    pub session_id: SessionId,
    pub indicator_id: IndicatorId,
    pub weight: f64,
    pub threshold: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct IndicatorConsolidation {
    pub indicator_id: IndicatorId,
    /// Other respondents' weights, input order.
    pub weights: Vec<f64>,
    /// Every weight including the caller's.
    pub all_weights: Vec<f64>,
    pub total_count: usize,
    /// Non-empty thresholds from other respondents, input order.
    pub thresholds: Vec<String>,
    pub average: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Consolidated {
    /// Distinct respondents with any submitted row for the strategy.
    pub total_respondents: usize,
    /// Sorted by average descending, then indicator id.
    pub indicators: Vec<IndicatorConsolidation>,
}

impl Consolidated {
    pub fn get(&self, id: &IndicatorId) -> Option<&IndicatorConsolidation> {
        self.indicators.iter().find(|i| &i.indicator_id == id)
    }
}

pub fn consolidate(rows: &[SubmittedAllocation], caller: Option<&RespondentId>) -> Consolidated {
    let respondents: BTreeSet<&RespondentId> = rows.iter().map(|r| &r.respondent_id).collect();
    let total_respondents = respondents.len();

    let mut by_indicator: BTreeMap<&IndicatorId, IndicatorConsolidation> = BTreeMap::new();
    for row in rows {
        let slot = by_indicator
            .entry(&row.indicator_id)
            .or_insert_with(|| IndicatorConsolidation {
                indicator_id: row.indicator_id.clone(),
                weights: Vec::new(),
                all_weights: Vec::new(),
                total_count: 0,
                thresholds: Vec::new(),
                average: 0.0,
            });
        slot.all_weights.push(row.weight);
        if caller != Some(&row.respondent_id) {
            slot.weights.push(row.weight);
            if let Some(t) = row.threshold.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                slot.thresholds.push(t.to_string());
            }
        }
    }

    let mut indicators: Vec<IndicatorConsolidation> = by_indicator
        .into_values()
        .map(|mut c| {
            c.total_count = c.all_weights.len();
            let sum: f64 = c.all_weights.iter().sum();
            c.average = if total_respondents == 0 { 0.0 } else { round2(sum / total_respondents as f64) };
            c
        })
        .collect();

    indicators.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| a.indicator_id.cmp(&b.indicator_id))
    });

    Consolidated { total_respondents, indicators }
}
