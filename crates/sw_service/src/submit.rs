//! Submission: gate on incomplete strategies, lock the respondent role,
//! stamp the session. Submitting again is allowed and reported as a
//! resubmission.

use tracing::info;

use sw_algo::submission_gate;
use sw_core::{LogEvent, SessionStatus};
use sw_io::Store;

use crate::views::{SubmitOutcome, SubmitRequest};
use crate::{ServiceError, ServiceResult, SurveyService};

impl<S: Store> SurveyService<S> {
    pub fn submit(&self, session_id: &str, req: &SubmitRequest) -> ServiceResult<SubmitOutcome> {
        let mut session = self.load_session(session_id)?;
        let roll_up = self.first_iteration_progress(&session)?;
        submission_gate(&roll_up, req.acknowledge_incomplete).map_err(ServiceError::SubmissionBlocked)?;

        let role = req.role.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let mut respondent_update = None;
        if let Some(role) = role {
            let mut respondent = self
                .store
                .respondent(&session.respondent_id)?
                .ok_or_else(|| ServiceError::not_found("respondent", &session.respondent_id))?;
            match respondent.assign_role(role) {
                Ok(true) => respondent_update = Some(respondent),
                Ok(false) => {}
                Err(_) => {
                    return Err(ServiceError::RoleLocked {
                        current: respondent.role.unwrap_or_default(),
                    })
                }
            }
        }

        if let Some(r) = respondent_update {
            self.store.upsert_respondent(r)?;
        }

        let now = self.clock.now();
        let is_resubmission = session.is_submitted();
        session.status = SessionStatus::Submitted;
        session.completed_at = Some(now);
        session.progress = 1.0;
        session.updated_at = now;
        self.store.update_session(session.clone())?;

        self.log(
            &session.id,
            LogEvent::Submit,
            &[
                ("resubmission", is_resubmission.to_string()),
                ("incomplete", roll_up.incomplete.len().to_string()),
            ],
        )?;
        info!(session = %session.id, is_resubmission, "session submitted");

        Ok(SubmitOutcome {
            session_id: session.id,
            status: session.status,
            is_resubmission,
            completed_at: now,
            progress: session.progress,
            incomplete: roll_up.incomplete,
        })
    }
}
