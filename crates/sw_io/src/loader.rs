//! Loader: read the seed dataset and the policy file from local JSON,
//! normalize ordering, and reject inconsistent data before it reaches a
//! store. No network I/O.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sw_core::entities::normalize_email;
use sw_core::{
    Allocation, Indicator, Invite, Policy, Respondent, RevisedAllocation, SessionLog, Strategy,
    Survey,
};

use crate::metadata::SessionRecord;
use crate::{IoError, IoResult};

/// Everything a store holds. Also the on-disk snapshot format of a
/// file-backed store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dataset {
    pub surveys: Vec<Survey>,
    pub strategies: Vec<Strategy>,
    pub indicators: Vec<Indicator>,
    pub respondents: Vec<Respondent>,
    pub invites: Vec<Invite>,
    pub sessions: Vec<SessionRecord>,
    pub allocations: Vec<Allocation>,
    pub revised_allocations: Vec<RevisedAllocation>,
    pub logs: Vec<SessionLog>,
}

/// Read, parse, normalize and validate a dataset file.
pub fn load_dataset(path: &Path) -> IoResult<Dataset> {
    let bytes = read_file(path)?;
    let mut ds: Dataset = serde_json::from_slice(&bytes)?;
    ds.normalize()?;
    ds.validate()?;
    debug!(
        path = %path.display(),
        strategies = ds.strategies.len(),
        indicators = ds.indicators.len(),
        sessions = ds.sessions.len(),
        "dataset loaded"
    );
    Ok(ds)
}

/// Read a policy file; missing fields take defaults.
pub fn load_policy(path: &Path) -> IoResult<Policy> {
    let bytes = read_file(path)?;
    let policy: Policy = serde_json::from_slice(&bytes)?;
    policy
        .validate()
        .map_err(|e| IoError::Invalid(format!("policy: {e}")))?;
    Ok(policy)
}

fn read_file(path: &Path) -> IoResult<Vec<u8>> {
    fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))
}

impl Dataset {
    /// Strategies by `(survey, order, id)`, indicators by id, emails normalized.
    pub fn normalize(&mut self) -> IoResult<()> {
        self.strategies.sort_by(|a, b| {
            (&a.survey_id, a.order, &a.id).cmp(&(&b.survey_id, b.order, &b.id))
        });
        self.indicators.sort_by(|a, b| a.id.cmp(&b.id));
        for r in &mut self.respondents {
            r.email = normalize_email(&r.email)
                .map_err(|_| IoError::Invalid(format!("respondent {}: invalid email", r.id)))?;
        }
        for inv in &mut self.invites {
            inv.email = normalize_email(&inv.email)
                .map_err(|_| IoError::Invalid(format!("invite {}: invalid email", inv.token)))?;
        }
        Ok(())
    }

    /// Uniqueness and referential checks.
    pub fn validate(&self) -> IoResult<()> {
        unique("survey", self.surveys.iter().map(|s| s.id.as_str()))?;
        unique("strategy", self.strategies.iter().map(|s| s.id.as_str()))?;
        unique("indicator", self.indicators.iter().map(|i| i.id.as_str()))?;
        unique("respondent", self.respondents.iter().map(|r| r.id.as_str()))?;
        unique("respondent email", self.respondents.iter().map(|r| r.email.as_str()))?;
        unique("invite", self.invites.iter().map(|i| i.token.as_str()))?;
        unique("session", self.sessions.iter().map(|s| s.id.as_str()))?;
        unique("session token", self.sessions.iter().map(|s| s.token.as_str()))?;
        let pairs: Vec<String> =
            self.sessions.iter().map(|s| format!("{}/{}", s.respondent_id, s.survey_id)).collect();
        unique("session for respondent/survey", pairs.iter().map(String::as_str))?;

        let surveys: BTreeSet<&str> = self.surveys.iter().map(|s| s.id.as_str()).collect();
        let strategies: BTreeSet<&str> = self.strategies.iter().map(|s| s.id.as_str()).collect();
        let indicators: BTreeSet<&str> = self.indicators.iter().map(|i| i.id.as_str()).collect();
        let respondents: BTreeSet<&str> = self.respondents.iter().map(|r| r.id.as_str()).collect();
        let sessions: BTreeSet<&str> = self.sessions.iter().map(|s| s.id.as_str()).collect();

        for s in &self.strategies {
            refers("strategy", s.id.as_str(), "survey", s.survey_id.as_str(), &surveys)?;
        }
        for inv in &self.invites {
            refers("invite", inv.token.as_str(), "survey", inv.survey_id.as_str(), &surveys)?;
        }
        for s in &self.sessions {
            refers("session", s.id.as_str(), "survey", s.survey_id.as_str(), &surveys)?;
            refers("session", s.id.as_str(), "respondent", s.respondent_id.as_str(), &respondents)?;
            if !(0.0..=1.0).contains(&s.progress) {
                return Err(IoError::Invalid(format!("session {}: progress out of range", s.id)));
            }
        }
        let rows = self
            .allocations
            .iter()
            .map(|a| (&a.session_id, &a.strategy_id, &a.indicator_id, a.weight))
            .chain(
                self.revised_allocations
                    .iter()
                    .map(|a| (&a.session_id, &a.strategy_id, &a.indicator_id, a.weight)),
            );
        for (session, strategy, indicator, weight) in rows {
            let key = format!("{session}/{strategy}/{indicator}");
            refers("allocation", &key, "session", session.as_str(), &sessions)?;
            refers("allocation", &key, "strategy", strategy.as_str(), &strategies)?;
            refers("allocation", &key, "indicator", indicator.as_str(), &indicators)?;
            if !(0.0..=100.0).contains(&weight) {
                return Err(IoError::Invalid(format!("allocation {key}: weight out of range")));
            }
        }
        for l in &self.logs {
            refers("log", &l.event.to_string(), "session", l.session_id.as_str(), &sessions)?;
        }
        Ok(())
    }
}

fn unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> IoResult<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(IoError::Conflict(format!("duplicate {kind}: {id}")));
        }
    }
    Ok(())
}

fn refers(kind: &str, id: &str, target: &str, target_id: &str, known: &BTreeSet<&str>) -> IoResult<()> {
    if known.contains(target_id) {
        Ok(())
    } else {
        Err(IoError::Invalid(format!("{kind} {id}: unknown {target} {target_id}")))
    }
}
