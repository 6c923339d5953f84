//! Draft save for one strategy: weights, the "not my expertise" skip, and
//! the optional importance rating.
//!
//! The request carries the full row set for the strategy. Rows not in the
//! request are deleted, zero weights are kept as sent.

use std::collections::BTreeSet;

use tracing::{debug, info};

use sw_algo::first_iteration_status;
use sw_core::{Allocation, IndicatorId, LogEvent};
use sw_io::Store;

use crate::views::{DraftOutcome, DraftRequest, EvaluationMode};
use crate::{ServiceError, ServiceResult, SurveyService};

impl<S: Store> SurveyService<S> {
    pub fn save_draft(&self, session_id: &str, req: &DraftRequest) -> ServiceResult<DraftOutcome> {
        let mut session = self.load_session(session_id)?;
        let strategy = self.load_strategy(&session, req.strategy_id.as_str())?;
        let now = self.clock.now();

        // Validate everything before the first write.
        let mut rows = Vec::with_capacity(req.weights.len());
        if req.evaluation_mode == EvaluationMode::Weighted {
            let mut seen = BTreeSet::new();
            for w in &req.weights {
                if !seen.insert(w.indicator_id.clone()) {
                    return Err(ServiceError::Validation(format!(
                        "indicator {} listed twice",
                        w.indicator_id
                    )));
                }
                self.check_indicator(&w.indicator_id)?;
                self.check_weight(w.indicator_id.as_str(), w.weight)?;
                let threshold = self.check_threshold(w.indicator_id.as_str(), w.threshold.as_deref())?;
                rows.push(Allocation {
                    session_id: session.id.clone(),
                    strategy_id: strategy.id.clone(),
                    indicator_id: w.indicator_id.clone(),
                    weight: w.weight,
                    threshold,
                    updated_at: now,
                });
            }
        }
        if let Some(r) = req.importance_rating {
            session
                .metadata
                .set_rating(&strategy.id, r, self.policy.max_strategy_rating)
                .map_err(|e| ServiceError::Validation(e.to_string()))?;
        }

        let skipped = req.evaluation_mode == EvaluationMode::Skipped;
        session.metadata.set_skipped(&strategy.id, skipped);

        let keep: Vec<IndicatorId> = rows.iter().map(|r| r.indicator_id.clone()).collect();
        let saved = rows.len();
        for row in rows {
            self.store.upsert_allocation(row)?;
        }
        let deleted = self
            .store
            .delete_allocations_where(&session.id, &strategy.id, &keep)?;
        debug!(session = %session.id, strategy = %strategy.id, saved, deleted, "draft rows written");

        if session.current_strategy.as_ref() != Some(&strategy.id) {
            if let Some(prev) = session.current_strategy.take() {
                self.log(&session.id, LogEvent::StrategyExit, &[("strategy", prev.to_string())])?;
            }
            session.current_strategy = Some(strategy.id.clone());
        }

        let roll_up = self.first_iteration_progress(&session)?;
        if !session.is_submitted() {
            session.progress = roll_up.progress;
        }
        session.updated_at = now;
        self.store.update_session(session.clone())?;

        let total = self
            .store
            .group_sum_by_strategy(&session.id)?
            .get(&strategy.id)
            .copied();
        let status = first_iteration_status(skipped, total, self.policy.storage_tolerance);

        let mode = if skipped { "skipped" } else { "weighted" };
        self.log(
            &session.id,
            LogEvent::Autosave,
            &[("strategy", strategy.id.to_string()), ("mode", mode.to_string())],
        )?;
        info!(session = %session.id, strategy = %strategy.id, ?status, "draft saved");

        Ok(DraftOutcome {
            session_id: session.id,
            strategy_id: strategy.id,
            status,
            total_weight: total.unwrap_or(0.0),
            saved,
            deleted,
            progress: session.progress,
        })
    }
}
