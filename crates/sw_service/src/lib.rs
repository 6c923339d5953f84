//! sw_service: the survey operations, independent of any transport.
//!
//! `SurveyService` owns a `Store`, the `Policy` and a `Clock`. Each public
//! method is one API operation: read what it needs from the store, apply the
//! rules from `sw_algo`, write back, append to the session log.
//!
//! Operations live in one file per area:
//! - `access`            token → session (create or resume)
//! - `summary`           first-iteration session summary
//! - `draft`             draft save (weights, skip, rating)
//! - `submit`            submission gating, role lock, resubmission
//! - `consolidated`      group view of a strategy
//! - `second_iteration`  revised responses, review mark, progress
//! - `admin`             overview and consolidated export
//!
//! `autosave::DebouncedCommit` is the client-side debounce utility.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sw_algo::{
    first_iteration_status, roll_up_first_iteration, AllocationEntry, FirstIterationProgress,
    StrategyProgress,
};
use sw_core::{
    Allocation, CoreError, LogEvent, Policy, Session, SessionId, SessionLog, Strategy, StrategyId,
};
use sw_io::Store;

pub mod autosave;
pub mod clock;
pub mod error;
pub mod views;

mod access;
mod admin;
mod consolidated;
mod draft;
mod second_iteration;
mod submit;
mod summary;

pub use autosave::{DebouncedCommit, SaveStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ServiceError, ServiceResult};
pub use views::*;

pub struct SurveyService<S: Store> {
    store: S,
    policy: Policy,
    clock: Arc<dyn Clock>,
}

impl<S: Store> SurveyService<S> {
    pub fn new(store: S, policy: Policy) -> Self {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, policy: Policy, clock: Arc<dyn Clock>) -> Self {
        Self { store, policy, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    // ----- Shared lookups -----

    pub(crate) fn load_session(&self, id: &str) -> ServiceResult<Session> {
        let sid: SessionId = id.parse().map_err(|_| ServiceError::not_found("session", id))?;
        self.store
            .session(&sid)?
            .ok_or_else(|| ServiceError::not_found("session", id))
    }

    /// Active strategy of the session's survey.
    pub(crate) fn load_strategy(&self, session: &Session, id: &str) -> ServiceResult<Strategy> {
        let st: StrategyId = id.parse().map_err(|_| ServiceError::not_found("strategy", id))?;
        match self.store.strategy(&st)? {
            Some(s) if s.survey_id == session.survey_id && s.active => Ok(s),
            _ => Err(ServiceError::not_found("strategy", id)),
        }
    }

    /// Active strategies of the session's survey, `(order, id)` order.
    pub(crate) fn active_strategies(&self, session: &Session) -> ServiceResult<Vec<Strategy>> {
        Ok(self
            .store
            .strategies(&session.survey_id)?
            .into_iter()
            .filter(|s| s.active)
            .collect())
    }

    pub(crate) fn first_iteration_progress(&self, session: &Session) -> ServiceResult<FirstIterationProgress> {
        let sums = self.store.group_sum_by_strategy(&session.id)?;
        let items = self.strategy_progress(session, &sums)?;
        Ok(roll_up_first_iteration(&items))
    }

    pub(crate) fn strategy_progress(
        &self,
        session: &Session,
        sums: &BTreeMap<StrategyId, f64>,
    ) -> ServiceResult<Vec<StrategyProgress>> {
        Ok(self
            .active_strategies(session)?
            .into_iter()
            .map(|s| {
                let skipped = session.metadata.is_skipped(&s.id);
                let total = sums.get(&s.id).copied();
                StrategyProgress {
                    status: first_iteration_status(skipped, total, self.policy.storage_tolerance),
                    skipped,
                    total_weight: total.unwrap_or(0.0),
                    strategy_id: s.id,
                }
            })
            .collect())
    }

    pub(crate) fn log(&self, session: &SessionId, event: LogEvent, details: &[(&str, String)]) -> ServiceResult<()> {
        self.store.append_log(SessionLog {
            session_id: session.clone(),
            event,
            at: self.clock.now(),
            details: details.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        })?;
        Ok(())
    }

    // ----- Boundary checks -----

    /// Weights are integers in `[0, 100]` at the boundary.
    pub(crate) fn check_weight(&self, indicator: &str, w: f64) -> ServiceResult<()> {
        if w.is_finite() && w.fract() == 0.0 && (0.0..=100.0).contains(&w) {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "{indicator}: {} (integers only), got {w}",
                CoreError::WeightOutOfRange
            )))
        }
    }

    /// Trimmed; empty reads as none; over the cap is rejected.
    pub(crate) fn check_threshold(&self, indicator: &str, t: Option<&str>) -> ServiceResult<Option<String>> {
        let Some(t) = t.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        if t.chars().count() > self.policy.threshold_max_chars {
            return Err(ServiceError::Validation(format!(
                "{indicator}: {} (max {} characters)",
                CoreError::ThresholdTooLong,
                self.policy.threshold_max_chars
            )));
        }
        Ok(Some(t.to_string()))
    }

    pub(crate) fn check_indicator(&self, id: &sw_core::IndicatorId) -> ServiceResult<()> {
        match self.store.indicator(id)? {
            Some(i) if i.active => Ok(()),
            _ => Err(ServiceError::not_found("indicator", id)),
        }
    }
}

pub(crate) fn entries_of(rows: &[Allocation]) -> Vec<AllocationEntry> {
    rows.iter()
        .map(|a| AllocationEntry::new(a.indicator_id.clone(), a.weight, a.threshold.clone()))
        .collect()
}
