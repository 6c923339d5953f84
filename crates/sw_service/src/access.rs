//! Token access: resume the session bound to a token, or open one from an invite.

use tracing::info;

use sw_core::entities::normalize_email;
use sw_core::{AccessToken, InviteStatus, LogEvent, Respondent, Session};
use sw_io::hasher::sha256_hex;
use sw_io::Store;

use crate::views::AccessOutcome;
use crate::{ServiceError, ServiceResult, SurveyService};

/// Stable id derived from a key: `<prefix>-<16 hex>`.
fn derived_id<T: std::str::FromStr>(prefix: &str, key: &str) -> ServiceResult<T> {
    let hex = sha256_hex(key.as_bytes());
    format!("{prefix}-{}", &hex[..16])
        .parse()
        .map_err(|_| ServiceError::Validation(format!("cannot derive {prefix} id")))
}

impl<S: Store> SurveyService<S> {
    pub fn access(&self, token: &str) -> ServiceResult<AccessOutcome> {
        let token: AccessToken = token
            .trim()
            .parse()
            .map_err(|_| ServiceError::not_found("invite", token))?;
        let now = self.clock.now();
        let invite = self.store.invite(&token)?;

        if let Some(session) = self.store.session_by_token(&token)? {
            if matches!(&invite, Some(i) if i.status == InviteStatus::Revoked) {
                return Err(ServiceError::InviteRejected { reason: "invite revoked".into() });
            }
            self.log(&session.id, LogEvent::Resume, &[])?;
            info!(session = %session.id, "session resumed");
            return Ok(outcome(&session, true));
        }

        let mut invite = invite.ok_or_else(|| ServiceError::not_found("invite", &token))?;
        invite
            .check_usable(now)
            .map_err(|r| ServiceError::InviteRejected { reason: r.to_string() })?;

        match self.store.survey(&invite.survey_id)? {
            Some(s) if s.active => {}
            _ => return Err(ServiceError::not_found("survey", &invite.survey_id)),
        }

        let email = normalize_email(&invite.email)
            .map_err(|_| ServiceError::Validation(format!("invite {token} has an invalid email")))?;
        let respondent = match self.store.respondent_by_email(&email)? {
            Some(r) => r,
            None => {
                let name = invite
                    .name
                    .clone()
                    .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
                self.store.upsert_respondent(Respondent {
                    id: derived_id("resp", &email)?,
                    name,
                    email: email.clone(),
                    role: None,
                    created_at: now,
                })?
            }
        };

        // One session per respondent and survey: a second invite re-opens it.
        if let Some(session) = self.store.session_for(&respondent.id, &invite.survey_id)? {
            invite.status = InviteStatus::Accepted;
            self.store.upsert_invite(invite)?;
            self.log(&session.id, LogEvent::Resume, &[("token", token.to_string())])?;
            info!(session = %session.id, respondent = %respondent.id, "session resumed via another invite");
            return Ok(outcome(&session, true));
        }

        let session = Session::new_draft(
            derived_id("sess", token.as_str())?,
            invite.survey_id.clone(),
            respondent.id.clone(),
            token.clone(),
            now,
        );
        self.store.insert_session(session.clone())?;

        invite.status = InviteStatus::Accepted;
        self.store.upsert_invite(invite)?;

        info!(session = %session.id, respondent = %respondent.id, "session created from invite");
        Ok(outcome(&session, false))
    }
}

fn outcome(s: &Session, resumed: bool) -> AccessOutcome {
    AccessOutcome {
        session_id: s.id.clone(),
        survey_id: s.survey_id.clone(),
        respondent_id: s.respondent_id.clone(),
        resumed,
        status: s.status,
        progress: s.progress,
        current_strategy: s.current_strategy.clone(),
    }
}
