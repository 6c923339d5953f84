//! Second iteration: respondents revisit their weights next to the group
//! consolidation, may pick up indicators others chose, and mark each
//! strategy reviewed.
//!
//! Stored rows are seeded from the respondent's first-iteration rows on
//! first access. Indicators only the group picked are shown as unstored
//! rows until the respondent saves them.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use sw_algo::{
    check_review_completion, roll_up_second_iteration, second_iteration_status, AllocationEntry,
    StrategyReviewState,
};
use sw_core::{IndicatorId, LogEvent, RevisedAllocation, Session, Strategy, StrategyId};
use sw_io::Store;

use crate::views::{ResponseRow, ResponsesView, ReviseRequest, SecondIterationProgressView};
use crate::{entries_of, ServiceError, ServiceResult, SurveyService};

fn revised_entries(rows: &[RevisedAllocation]) -> Vec<AllocationEntry> {
    rows.iter()
        .map(|r| AllocationEntry {
            indicator_id: r.indicator_id.clone(),
            weight: r.weight,
            threshold: r.threshold.clone(),
            excluded: r.excluded,
        })
        .collect()
}

impl<S: Store> SurveyService<S> {
    pub fn second_iteration_responses(&self, session_id: &str, strategy_id: &str) -> ServiceResult<ResponsesView> {
        let session = self.load_session(session_id)?;
        let strategy = self.load_reviewable(&session, strategy_id)?;

        let mut revised = self.store.find_revised(&session.id, &strategy.id)?;
        if revised.is_empty() {
            let now = self.clock.now();
            for a in self.store.find_allocations(&session.id, &strategy.id)? {
                revised.push(self.store.upsert_revised(RevisedAllocation {
                    session_id: a.session_id,
                    strategy_id: a.strategy_id,
                    indicator_id: a.indicator_id,
                    weight: a.weight,
                    threshold: a.threshold,
                    excluded: false,
                    is_original: true,
                    reviewed_at: None,
                    updated_at: now,
                })?);
            }
            if !revised.is_empty() {
                debug!(session = %session.id, strategy = %strategy.id, rows = revised.len(), "second iteration seeded");
            }
        }
        self.responses_view(&session, &strategy, revised)
    }

    pub fn save_second_iteration(
        &self,
        session_id: &str,
        strategy_id: &str,
        req: &ReviseRequest,
    ) -> ServiceResult<ResponsesView> {
        let session = self.load_session(session_id)?;
        let strategy = self.load_reviewable(&session, strategy_id)?;
        let now = self.clock.now();

        let mut seen = BTreeSet::new();
        let mut current = Vec::with_capacity(req.responses.len());
        for r in &req.responses {
            if !seen.insert(r.indicator_id.clone()) {
                return Err(ServiceError::Validation(format!("indicator {} listed twice", r.indicator_id)));
            }
            self.check_indicator(&r.indicator_id)?;
            self.check_weight(r.indicator_id.as_str(), r.weight)?;
            current.push(AllocationEntry {
                indicator_id: r.indicator_id.clone(),
                weight: r.weight,
                threshold: self.check_threshold(r.indicator_id.as_str(), r.threshold.as_deref())?,
                excluded: r.excluded,
            });
        }

        let baseline = entries_of(&self.store.find_allocations(&session.id, &strategy.id)?);
        if req.mark_as_reviewed {
            check_review_completion(&current, &baseline, self.policy.ui_tolerance)
                .map_err(ServiceError::ReviewBlocked)?;
        }

        let existing: BTreeMap<IndicatorId, RevisedAllocation> = self
            .store
            .find_revised(&session.id, &strategy.id)?
            .into_iter()
            .map(|r| (r.indicator_id.clone(), r))
            .collect();

        let keep: Vec<IndicatorId> = current.iter().map(|c| c.indicator_id.clone()).collect();
        for c in current {
            let prior = existing.get(&c.indicator_id);
            let is_original = prior
                .map(|p| p.is_original)
                .unwrap_or_else(|| baseline.iter().any(|b| b.indicator_id == c.indicator_id));
            let reviewed_at = if req.mark_as_reviewed { Some(now) } else { prior.and_then(|p| p.reviewed_at) };
            self.store.upsert_revised(RevisedAllocation {
                session_id: session.id.clone(),
                strategy_id: strategy.id.clone(),
                indicator_id: c.indicator_id,
                weight: c.weight,
                threshold: c.threshold,
                excluded: c.excluded,
                is_original,
                reviewed_at,
                updated_at: now,
            })?;
        }
        let deleted = self.store.delete_revised_where(&session.id, &strategy.id, &keep)?;

        self.log(
            &session.id,
            LogEvent::Autosave,
            &[
                ("strategy", strategy.id.to_string()),
                ("iteration", "second".to_string()),
                ("reviewed", req.mark_as_reviewed.to_string()),
            ],
        )?;
        info!(session = %session.id, strategy = %strategy.id, deleted, reviewed = req.mark_as_reviewed, "second iteration saved");

        let revised = self.store.find_revised(&session.id, &strategy.id)?;
        self.responses_view(&session, &strategy, revised)
    }

    pub fn second_iteration_progress(&self, session_id: &str) -> ServiceResult<SecondIterationProgressView> {
        let session = self.load_session(session_id)?;

        let mut baseline: BTreeMap<StrategyId, Vec<AllocationEntry>> = BTreeMap::new();
        for a in self.store.find_session_allocations(&session.id)? {
            baseline.entry(a.strategy_id.clone()).or_default().extend(entries_of(&[a]));
        }
        let mut revised: BTreeMap<StrategyId, Vec<RevisedAllocation>> = BTreeMap::new();
        for r in self.store.find_session_revised(&session.id)? {
            revised.entry(r.strategy_id.clone()).or_default().push(r);
        }

        let items: Vec<StrategyReviewState> = self
            .active_strategies(&session)?
            .into_iter()
            .map(|s| {
                let rows = revised.get(&s.id).map(Vec::as_slice).unwrap_or_default();
                let base = baseline.get(&s.id).map(Vec::as_slice).unwrap_or_default();
                let reviewed = rows.iter().any(|r| r.reviewed_at.is_some());
                StrategyReviewState {
                    skipped: session.metadata.is_skipped(&s.id),
                    status: second_iteration_status(
                        &revised_entries(rows),
                        base,
                        reviewed,
                        self.policy.modification_epsilon,
                    ),
                    strategy_id: s.id,
                }
            })
            .collect();

        Ok(SecondIterationProgressView {
            session_id: session.id,
            progress: roll_up_second_iteration(&items),
        })
    }

    // ----- Helpers -----

    fn load_reviewable(&self, session: &Session, strategy_id: &str) -> ServiceResult<Strategy> {
        let strategy = self.load_strategy(session, strategy_id)?;
        if session.metadata.is_skipped(&strategy.id) {
            return Err(ServiceError::Validation(format!(
                "strategy {} was skipped in the first iteration",
                strategy.id
            )));
        }
        Ok(strategy)
    }

    fn responses_view(
        &self,
        session: &Session,
        strategy: &Strategy,
        revised: Vec<RevisedAllocation>,
    ) -> ServiceResult<ResponsesView> {
        let baseline = entries_of(&self.store.find_allocations(&session.id, &strategy.id)?);
        let current = revised_entries(&revised);
        let reviewed = revised.iter().any(|r| r.reviewed_at.is_some());
        let status = second_iteration_status(&current, &baseline, reviewed, self.policy.modification_epsilon);
        let total_weight = current.iter().map(AllocationEntry::effective_weight).sum();

        let stored: BTreeSet<IndicatorId> = revised.iter().map(|r| r.indicator_id.clone()).collect();
        let mut rows: Vec<ResponseRow> = revised
            .into_iter()
            .map(|r| ResponseRow {
                indicator_id: r.indicator_id,
                weight: r.weight,
                threshold: r.threshold,
                excluded: r.excluded,
                is_original: r.is_original,
                reviewed_at: r.reviewed_at,
                from_consolidation: false,
            })
            .collect();

        let group = self.consolidate_strategy(&strategy.id, Some(&session.respondent_id))?;
        rows.extend(
            group
                .indicators
                .into_iter()
                .filter(|i| !stored.contains(&i.indicator_id))
                .map(|i| ResponseRow {
                    indicator_id: i.indicator_id,
                    weight: 0.0,
                    threshold: None,
                    excluded: false,
                    is_original: false,
                    reviewed_at: None,
                    from_consolidation: true,
                }),
        );

        Ok(ResponsesView {
            session_id: session.id.clone(),
            strategy_id: strategy.id.clone(),
            status,
            total_weight,
            rows,
        })
    }
}
