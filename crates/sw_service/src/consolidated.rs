//! Group view of one strategy: what the submitted respondents allocated.

use sw_algo::{consolidate, Consolidated, SubmittedAllocation};
use sw_core::{RespondentId, StrategyId};
use sw_io::Store;

use crate::views::ConsolidatedView;
use crate::{ServiceResult, SurveyService};

impl<S: Store> SurveyService<S> {
    /// The caller's own weights are left out of the per-indicator lists but
    /// still count toward averages.
    pub fn consolidated(&self, session_id: &str, strategy_id: &str) -> ServiceResult<ConsolidatedView> {
        let session = self.load_session(session_id)?;
        let strategy = self.load_strategy(&session, strategy_id)?;
        let c = self.consolidate_strategy(&strategy.id, Some(&session.respondent_id))?;
        Ok(ConsolidatedView {
            strategy_id: strategy.id,
            total_respondents: c.total_respondents,
            indicators: c.indicators,
        })
    }

    pub(crate) fn consolidate_strategy(
        &self,
        strategy: &StrategyId,
        caller: Option<&RespondentId>,
    ) -> ServiceResult<Consolidated> {
        let rows: Vec<SubmittedAllocation> = self
            .store
            .find_submitted_allocations_for_strategy(strategy)?
            .into_iter()
            .map(|r| SubmittedAllocation {
                respondent_id: r.respondent_id,
                session_id: r.allocation.session_id,
                indicator_id: r.allocation.indicator_id,
                weight: r.allocation.weight,
                threshold: r.allocation.threshold,
            })
            .collect();
        Ok(consolidate(&rows, caller))
    }
}
