//! Administrator views: who is where, and the survey-wide consolidation.

use sw_core::{SessionStatus, SurveyId};
use sw_io::Store;

use crate::views::{ConsolidatedExport, OverviewRow, SessionOverview, StrategyConsolidation};
use crate::{ServiceError, ServiceResult, SurveyService};

impl<S: Store> SurveyService<S> {
    fn load_survey_id(&self, survey_id: &str) -> ServiceResult<SurveyId> {
        let id: SurveyId = survey_id
            .parse()
            .map_err(|_| ServiceError::not_found("survey", survey_id))?;
        match self.store.survey(&id)? {
            Some(_) => Ok(id),
            None => Err(ServiceError::not_found("survey", survey_id)),
        }
    }

    pub fn session_overview(&self, survey_id: &str) -> ServiceResult<SessionOverview> {
        let survey_id = self.load_survey_id(survey_id)?;
        let mut sessions = Vec::new();
        for s in self.store.sessions_for_survey(&survey_id)? {
            let respondent = self
                .store
                .respondent(&s.respondent_id)?
                .ok_or_else(|| ServiceError::not_found("respondent", &s.respondent_id))?;
            sessions.push(OverviewRow {
                skipped_strategies: s.metadata.skipped_count(),
                session_id: s.id,
                respondent_id: s.respondent_id,
                respondent_name: respondent.name,
                email: respondent.email,
                role: respondent.role,
                status: s.status,
                progress: s.progress,
                completed_at: s.completed_at,
            });
        }
        let submitted = sessions.iter().filter(|r| r.status == SessionStatus::Submitted).count();
        Ok(SessionOverview {
            survey_id,
            total_sessions: sessions.len(),
            submitted,
            sessions,
        })
    }

    /// Every active strategy of the survey, averages over all submitted respondents.
    pub fn export_consolidated(&self, survey_id: &str) -> ServiceResult<ConsolidatedExport> {
        let survey_id = self.load_survey_id(survey_id)?;
        let mut strategies = Vec::new();
        for s in self.store.strategies(&survey_id)?.into_iter().filter(|s| s.active) {
            let c = self.consolidate_strategy(&s.id, None)?;
            strategies.push(StrategyConsolidation {
                strategy_id: s.id,
                title: s.title,
                order: s.order,
                total_respondents: c.total_respondents,
                indicators: c.indicators,
            });
        }
        Ok(ConsolidatedExport { survey_id, strategies })
    }
}
