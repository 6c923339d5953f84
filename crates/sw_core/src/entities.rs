//! Reference data and mutable records.
//!
//! Reference data (`Survey`, `Strategy`, `Indicator`) is seeded once and
//! read-only at runtime. Everything else is created and updated by the
//! service layer through the store.

use std::collections::BTreeMap;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::{AccessToken, IndicatorId, RespondentId, SessionId, StrategyId, SurveyId};
use crate::metadata::SessionMetadata;
use crate::Timestamp;

// ----- Reference data -----

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Strategy {
    pub id: StrategyId,
    pub survey_id: SurveyId,
    /// Method text shown as the strategy title.
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub objective: Option<String>,
    /// Display and navigation sequence.
    pub order: u32,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Indicator {
    pub id: IndicatorId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    pub domain: String,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub active: bool,
}

#[cfg(feature = "serde")]
fn default_true() -> bool { true }

// ----- Respondents & invites -----

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Respondent {
    pub id: RespondentId,
    pub name: String,
    /// Unique across respondents; stored normalized (see [`normalize_email`]).
    pub email: String,
    /// Unset until the first submit that names one; immutable afterwards.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: Option<String>,
    pub created_at: Timestamp,
}

impl Respondent {
    /// `Ok(true)` when the role was set now, `Ok(false)` when it already
    /// matched, `Err` when a different role is locked in.
    pub fn assign_role(&mut self, role: &str) -> Result<bool, CoreError> {
        match &self.role {
            None => {
                self.role = Some(role.to_string());
                Ok(true)
            }
            Some(r) if r == role => Ok(false),
            Some(_) => Err(CoreError::RoleLocked),
        }
    }
}

/// Trim and lowercase; requires exactly one `@` with text on both sides.
pub fn normalize_email(raw: &str) -> Result<String, CoreError> {
    let e = raw.trim().to_ascii_lowercase();
    match e.split_once('@') {
        Some((local, host)) if !local.is_empty() && !host.is_empty() && !host.contains('@') => Ok(e),
        _ => Err(CoreError::InvalidEmail),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InviteStatus {
    Pending,
    Accepted,
    Revoked,
}

/// Why an invite cannot open a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InviteRejection {
    Revoked,
    Expired,
}

impl fmt::Display for InviteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteRejection::Revoked => write!(f, "invite revoked"),
            InviteRejection::Expired => write!(f, "invite expired"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Invite {
    pub token: AccessToken,
    pub survey_id: SurveyId,
    pub email: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub status: InviteStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub expires_at: Option<Timestamp>,
}

impl Invite {
    /// An accepted invite stays usable (it re-opens the same session).
    pub fn check_usable(&self, now: Timestamp) -> Result<(), InviteRejection> {
        if self.status == InviteStatus::Revoked {
            return Err(InviteRejection::Revoked);
        }
        match self.expires_at {
            Some(exp) if exp <= now => Err(InviteRejection::Expired),
            _ => Ok(()),
        }
    }
}

// ----- Sessions -----

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionStatus {
    Draft,
    Submitted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub survey_id: SurveyId,
    pub respondent_id: RespondentId,
    pub token: AccessToken,
    pub status: SessionStatus,
    /// Completion ratio in `[0, 1]`.
    pub progress: f64,
    pub current_strategy: Option<StrategyId>,
    pub metadata: SessionMetadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Session {
    pub fn new_draft(
        id: SessionId,
        survey_id: SurveyId,
        respondent_id: RespondentId,
        token: AccessToken,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            survey_id,
            respondent_id,
            token,
            status: SessionStatus::Draft,
            progress: 0.0,
            current_strategy: None,
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == SessionStatus::Submitted
    }
}

// ----- Allocations -----

/// First-iteration allocation row, keyed by (session, strategy, indicator).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Allocation {
    pub session_id: SessionId,
    pub strategy_id: StrategyId,
    pub indicator_id: IndicatorId,
    pub weight: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub threshold: Option<String>,
    pub updated_at: Timestamp,
}

/// Second-iteration allocation row. Seeded from the first iteration with
/// `is_original = true`; rows for indicators other respondents picked are
/// `is_original = false`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RevisedAllocation {
    pub session_id: SessionId,
    pub strategy_id: StrategyId,
    pub indicator_id: IndicatorId,
    pub weight: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub threshold: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub excluded: bool,
    pub is_original: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reviewed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

// ----- Audit trail -----

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LogEvent {
    Autosave,
    StrategyExit,
    Submit,
    Resume,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogEvent::Autosave => "autosave",
            LogEvent::StrategyExit => "strategy_exit",
            LogEvent::Submit => "submit",
            LogEvent::Resume => "resume",
        };
        f.write_str(s)
    }
}

/// Append-only; never mutated after insert.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionLog {
    pub session_id: SessionId,
    pub event: LogEvent,
    pub at: Timestamp,
    #[cfg_attr(feature = "serde", serde(default))]
    pub details: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn invite(status: InviteStatus, expires_at: Option<Timestamp>) -> Invite {
        Invite {
            token: "tok-1".parse().unwrap(),
            survey_id: "dengue".parse().unwrap(),
            email: "a@b.org".into(),
            name: None,
            status,
            expires_at,
        }
    }

    #[test]
    fn invite_usability() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert!(invite(InviteStatus::Pending, None).check_usable(now).is_ok());
        assert!(invite(InviteStatus::Accepted, Some(now + Duration::days(1))).check_usable(now).is_ok());
        assert_eq!(
            invite(InviteStatus::Pending, Some(now)).check_usable(now),
            Err(InviteRejection::Expired)
        );
        assert_eq!(
            invite(InviteStatus::Revoked, None).check_usable(now),
            Err(InviteRejection::Revoked)
        );
    }

    #[test]
    fn role_is_set_once() {
        let mut r = Respondent {
            id: "r1".parse().unwrap(),
            name: "Ana".into(),
            email: "ana@x.org".into(),
            role: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(r.assign_role("epidemiologist"), Ok(true));
        assert_eq!(r.assign_role("epidemiologist"), Ok(false));
        assert!(r.assign_role("entomologist").is_err());
        assert_eq!(r.role.as_deref(), Some("epidemiologist"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ana@Example.ORG ").unwrap(), "ana@example.org");
        for bad in ["", "ana", "@x.org", "ana@", "a@b@c"] {
            assert_eq!(normalize_email(bad), Err(CoreError::InvalidEmail));
        }
    }
}
