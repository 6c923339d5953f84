//! First-iteration session summary.

use std::collections::BTreeMap;

use sw_core::StrategyId;
use sw_io::Store;

use crate::views::{AllocationView, SessionSummary, StrategySummary};
use crate::{ServiceResult, SurveyService};

impl<S: Store> SurveyService<S> {
    pub fn session_summary(&self, session_id: &str) -> ServiceResult<SessionSummary> {
        let session = self.load_session(session_id)?;
        let sums = self.store.group_sum_by_strategy(&session.id)?;

        let mut rows: BTreeMap<StrategyId, Vec<AllocationView>> = BTreeMap::new();
        for a in self.store.find_session_allocations(&session.id)? {
            rows.entry(a.strategy_id).or_default().push(AllocationView {
                indicator_id: a.indicator_id,
                weight: a.weight,
                threshold: a.threshold,
            });
        }

        let strategies = self.active_strategies(&session)?;
        let items = self.strategy_progress(&session, &sums)?;
        let roll_up = sw_algo::roll_up_first_iteration(&items);

        let summaries = strategies
            .into_iter()
            .zip(items)
            .map(|(s, p)| StrategySummary {
                rating: session.metadata.rating(&s.id),
                indicators: rows.remove(&s.id).unwrap_or_default(),
                strategy_id: s.id,
                title: s.title,
                order: s.order,
                status: p.status,
                skipped: p.skipped,
                total_weight: p.total_weight,
            })
            .collect();

        Ok(SessionSummary {
            session_id: session.id,
            survey_id: session.survey_id,
            status: session.status,
            progress: session.progress,
            completed: roll_up.completed,
            total: roll_up.total,
            current_strategy: session.current_strategy,
            strategies: summaries,
        })
    }
}
