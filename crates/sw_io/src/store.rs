//! The persistence contract.
//!
//! Every method is an independent atomic operation; there are no
//! multi-call transactions. A save that upserts N rows is N calls, so a
//! failure part-way leaves the earlier rows in place.

use std::collections::BTreeMap;

use sw_core::{
    AccessToken, Allocation, Indicator, IndicatorId, Invite, Respondent, RespondentId,
    RevisedAllocation, Session, SessionId, SessionLog, Strategy, StrategyId, Survey, SurveyId,
};

use crate::IoResult;

/// A first-iteration row from a submitted session, joined with its respondent.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedRow {
    pub respondent_id: RespondentId,
    pub allocation: Allocation,
}

pub trait Store: Send + Sync {
    // ----- Reference data -----
    fn survey(&self, id: &SurveyId) -> IoResult<Option<Survey>>;
    fn surveys(&self) -> IoResult<Vec<Survey>>;
    /// Sorted by `(order, id)`.
    fn strategies(&self, survey: &SurveyId) -> IoResult<Vec<Strategy>>;
    fn strategy(&self, id: &StrategyId) -> IoResult<Option<Strategy>>;
    fn indicators(&self) -> IoResult<Vec<Indicator>>;
    fn indicator(&self, id: &IndicatorId) -> IoResult<Option<Indicator>>;

    // ----- Respondents & invites -----
    fn respondent(&self, id: &RespondentId) -> IoResult<Option<Respondent>>;
    fn respondent_by_email(&self, email: &str) -> IoResult<Option<Respondent>>;
    /// Insert or replace by id; another respondent with the same email is a conflict.
    fn upsert_respondent(&self, r: Respondent) -> IoResult<Respondent>;
    fn invite(&self, token: &AccessToken) -> IoResult<Option<Invite>>;
    fn upsert_invite(&self, invite: Invite) -> IoResult<()>;

    // ----- Sessions -----
    fn session(&self, id: &SessionId) -> IoResult<Option<Session>>;
    fn session_by_token(&self, token: &AccessToken) -> IoResult<Option<Session>>;
    /// A respondent has at most one session per survey.
    fn session_for(&self, respondent: &RespondentId, survey: &SurveyId) -> IoResult<Option<Session>>;
    /// Duplicate id, token or (respondent, survey) pair is a conflict.
    fn insert_session(&self, s: Session) -> IoResult<()>;
    /// Unknown id is not-found.
    fn update_session(&self, s: Session) -> IoResult<()>;
    /// Ordered by `(created_at, id)`.
    fn sessions_for_survey(&self, survey: &SurveyId) -> IoResult<Vec<Session>>;

    // ----- First-iteration allocations -----
    fn find_allocations(&self, session: &SessionId, strategy: &StrategyId) -> IoResult<Vec<Allocation>>;
    fn find_session_allocations(&self, session: &SessionId) -> IoResult<Vec<Allocation>>;
    /// Keyed by (session, strategy, indicator).
    fn upsert_allocation(&self, row: Allocation) -> IoResult<Allocation>;
    /// Deletes the strategy's rows whose indicator is not in `keep`; returns the count.
    fn delete_allocations_where(
        &self,
        session: &SessionId,
        strategy: &StrategyId,
        keep: &[IndicatorId],
    ) -> IoResult<usize>;
    /// Strategies with at least one row only.
    fn group_sum_by_strategy(&self, session: &SessionId) -> IoResult<BTreeMap<StrategyId, f64>>;
    /// Rows from sessions with status `submitted`, ordered by
    /// `(session.created_at, session id, indicator id)`.
    fn find_submitted_allocations_for_strategy(&self, strategy: &StrategyId) -> IoResult<Vec<SubmittedRow>>;

    // ----- Second-iteration allocations -----
    fn find_revised(&self, session: &SessionId, strategy: &StrategyId) -> IoResult<Vec<RevisedAllocation>>;
    fn find_session_revised(&self, session: &SessionId) -> IoResult<Vec<RevisedAllocation>>;
    fn upsert_revised(&self, row: RevisedAllocation) -> IoResult<RevisedAllocation>;
    fn delete_revised_where(
        &self,
        session: &SessionId,
        strategy: &StrategyId,
        keep: &[IndicatorId],
    ) -> IoResult<usize>;

    // ----- Audit trail -----
    fn append_log(&self, entry: SessionLog) -> IoResult<()>;
    fn session_logs(&self, session: &SessionId) -> IoResult<Vec<SessionLog>>;
}
