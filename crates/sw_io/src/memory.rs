//! In-memory `Store`, optionally backed by a canonical JSON file.
//!
//! Tables are `BTreeMap`s so every scan is deterministic. One `RwLock`
//! guards all tables; each trait call takes it once.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard};

use tracing::debug;

use sw_core::{
    AccessToken, Allocation, Indicator, IndicatorId, Invite, Respondent, RespondentId,
    RevisedAllocation, Session, SessionId, SessionLog, SessionStatus, Strategy, StrategyId,
    Survey, SurveyId,
};

use crate::file_store;
use crate::loader::Dataset;
use crate::metadata::SessionRecord;
use crate::store::{Store, SubmittedRow};
use crate::{IoError, IoResult};

type RowKey = (SessionId, StrategyId, IndicatorId);

#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
    surveys: BTreeMap<SurveyId, Survey>,
    strategies: BTreeMap<StrategyId, Strategy>,
    indicators: BTreeMap<IndicatorId, Indicator>,
    respondents: BTreeMap<RespondentId, Respondent>,
    invites: BTreeMap<AccessToken, Invite>,
    sessions: BTreeMap<SessionId, Session>,
    allocations: BTreeMap<RowKey, Allocation>,
    revised: BTreeMap<RowKey, RevisedAllocation>,
    logs: Vec<SessionLog>,
}

impl Tables {
    fn from_dataset(ds: Dataset) -> IoResult<Self> {
        ds.validate()?;
        let mut t = Tables::default();
        t.surveys = ds.surveys.into_iter().map(|s| (s.id.clone(), s)).collect();
        t.strategies = ds.strategies.into_iter().map(|s| (s.id.clone(), s)).collect();
        t.indicators = ds.indicators.into_iter().map(|i| (i.id.clone(), i)).collect();
        t.respondents = ds.respondents.into_iter().map(|r| (r.id.clone(), r)).collect();
        t.invites = ds.invites.into_iter().map(|i| (i.token.clone(), i)).collect();
        for rec in ds.sessions {
            let s = rec.into_session()?;
            t.sessions.insert(s.id.clone(), s);
        }
        for a in ds.allocations {
            let key = (a.session_id.clone(), a.strategy_id.clone(), a.indicator_id.clone());
            if t.allocations.insert(key, a).is_some() {
                return Err(IoError::Conflict("duplicate allocation row".into()));
            }
        }
        for a in ds.revised_allocations {
            let key = (a.session_id.clone(), a.strategy_id.clone(), a.indicator_id.clone());
            if t.revised.insert(key, a).is_some() {
                return Err(IoError::Conflict("duplicate revised allocation row".into()));
            }
        }
        t.logs = ds.logs;
        Ok(t)
    }

    pub(crate) fn to_dataset(&self) -> Dataset {
        let mut strategies: Vec<Strategy> = self.strategies.values().cloned().collect();
        strategies.sort_by(|a, b| (&a.survey_id, a.order, &a.id).cmp(&(&b.survey_id, b.order, &b.id)));
        Dataset {
            surveys: self.surveys.values().cloned().collect(),
            strategies,
            indicators: self.indicators.values().cloned().collect(),
            respondents: self.respondents.values().cloned().collect(),
            invites: self.invites.values().cloned().collect(),
            sessions: self.sessions.values().map(SessionRecord::from_session).collect(),
            allocations: self.allocations.values().cloned().collect(),
            revised_allocations: self.revised.values().cloned().collect(),
            logs: self.logs.clone(),
        }
    }
}

fn strategy_range<'a, V>(
    map: &'a BTreeMap<RowKey, V>,
    session: &SessionId,
    strategy: &StrategyId,
) -> impl Iterator<Item = &'a V> + 'a {
    let session = session.clone();
    let strategy = strategy.clone();
    map.iter()
        .filter(move |((s, st, _), _)| *s == session && *st == strategy)
        .map(|(_, v)| v)
}

fn delete_where<V>(
    map: &mut BTreeMap<RowKey, V>,
    session: &SessionId,
    strategy: &StrategyId,
    keep: &[IndicatorId],
) -> usize {
    let before = map.len();
    map.retain(|(s, st, ind), _| !(s == session && st == strategy && !keep.contains(ind)));
    before - map.len()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// When set, every mutation rewrites this file.
    backing: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(ds: Dataset) -> IoResult<Self> {
        Ok(Self { tables: RwLock::new(Tables::from_dataset(ds)?), backing: None })
    }

    pub(crate) fn with_backing(ds: Dataset, path: PathBuf) -> IoResult<Self> {
        Ok(Self { tables: RwLock::new(Tables::from_dataset(ds)?), backing: Some(path) })
    }

    pub fn backing_path(&self) -> Option<&std::path::Path> {
        self.backing.as_deref()
    }

    /// Point-in-time copy of every table.
    pub fn snapshot(&self) -> IoResult<Dataset> {
        Ok(self.read()?.to_dataset())
    }

    fn read(&self) -> IoResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| IoError::Poisoned)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> IoResult<R>) -> IoResult<R> {
        let mut t = self.tables.write().map_err(|_| IoError::Poisoned)?;
        let out = f(&mut t)?;
        if let Some(path) = &self.backing {
            file_store::persist(path, &t)?;
        }
        Ok(out)
    }
}

impl Store for MemoryStore {
    // ----- Reference data -----

    fn survey(&self, id: &SurveyId) -> IoResult<Option<Survey>> {
        Ok(self.read()?.surveys.get(id).cloned())
    }

    fn surveys(&self) -> IoResult<Vec<Survey>> {
        Ok(self.read()?.surveys.values().cloned().collect())
    }

    fn strategies(&self, survey: &SurveyId) -> IoResult<Vec<Strategy>> {
        let t = self.read()?;
        let mut out: Vec<Strategy> = t.strategies.values().filter(|s| &s.survey_id == survey).cloned().collect();
        out.sort_by(|a, b| (a.order, &a.id).cmp(&(b.order, &b.id)));
        Ok(out)
    }

    fn strategy(&self, id: &StrategyId) -> IoResult<Option<Strategy>> {
        Ok(self.read()?.strategies.get(id).cloned())
    }

    fn indicators(&self) -> IoResult<Vec<Indicator>> {
        Ok(self.read()?.indicators.values().cloned().collect())
    }

    fn indicator(&self, id: &IndicatorId) -> IoResult<Option<Indicator>> {
        Ok(self.read()?.indicators.get(id).cloned())
    }

    // ----- Respondents & invites -----

    fn respondent(&self, id: &RespondentId) -> IoResult<Option<Respondent>> {
        Ok(self.read()?.respondents.get(id).cloned())
    }

    fn respondent_by_email(&self, email: &str) -> IoResult<Option<Respondent>> {
        Ok(self.read()?.respondents.values().find(|r| r.email == email).cloned())
    }

    fn upsert_respondent(&self, r: Respondent) -> IoResult<Respondent> {
        self.write(|t| {
            if t.respondents.values().any(|o| o.email == r.email && o.id != r.id) {
                return Err(IoError::Conflict(format!("respondent email {}", r.email)));
            }
            debug!(respondent = %r.id, "upsert respondent");
            t.respondents.insert(r.id.clone(), r.clone());
            Ok(r)
        })
    }

    fn invite(&self, token: &AccessToken) -> IoResult<Option<Invite>> {
        Ok(self.read()?.invites.get(token).cloned())
    }

    fn upsert_invite(&self, invite: Invite) -> IoResult<()> {
        self.write(|t| {
            debug!(token = %invite.token, status = ?invite.status, "upsert invite");
            t.invites.insert(invite.token.clone(), invite);
            Ok(())
        })
    }

    // ----- Sessions -----

    fn session(&self, id: &SessionId) -> IoResult<Option<Session>> {
        Ok(self.read()?.sessions.get(id).cloned())
    }

    fn session_by_token(&self, token: &AccessToken) -> IoResult<Option<Session>> {
        Ok(self.read()?.sessions.values().find(|s| &s.token == token).cloned())
    }

    fn session_for(&self, respondent: &RespondentId, survey: &SurveyId) -> IoResult<Option<Session>> {
        let t = self.read()?;
        Ok(t.sessions
            .values()
            .find(|s| &s.respondent_id == respondent && &s.survey_id == survey)
            .cloned())
    }

    fn insert_session(&self, s: Session) -> IoResult<()> {
        self.write(|t| {
            if t.sessions.contains_key(&s.id) {
                return Err(IoError::Conflict(format!("session {}", s.id)));
            }
            if t.sessions.values().any(|o| o.token == s.token) {
                return Err(IoError::Conflict(format!("session token {}", s.token)));
            }
            if t.sessions.values().any(|o| o.respondent_id == s.respondent_id && o.survey_id == s.survey_id) {
                return Err(IoError::Conflict(format!(
                    "respondent {} already has a session in survey {}",
                    s.respondent_id, s.survey_id
                )));
            }
            debug!(session = %s.id, "insert session");
            t.sessions.insert(s.id.clone(), s);
            Ok(())
        })
    }

    fn update_session(&self, s: Session) -> IoResult<()> {
        self.write(|t| match t.sessions.get_mut(&s.id) {
            Some(slot) => {
                debug!(session = %s.id, status = ?s.status, progress = s.progress, "update session");
                *slot = s;
                Ok(())
            }
            None => Err(IoError::NotFound { kind: "session", id: s.id.to_string() }),
        })
    }

    fn sessions_for_survey(&self, survey: &SurveyId) -> IoResult<Vec<Session>> {
        let t = self.read()?;
        let mut out: Vec<Session> = t.sessions.values().filter(|s| &s.survey_id == survey).cloned().collect();
        out.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(out)
    }

    // ----- First-iteration allocations -----

    fn find_allocations(&self, session: &SessionId, strategy: &StrategyId) -> IoResult<Vec<Allocation>> {
        let t = self.read()?;
        Ok(strategy_range(&t.allocations, session, strategy).cloned().collect())
    }

    fn find_session_allocations(&self, session: &SessionId) -> IoResult<Vec<Allocation>> {
        let t = self.read()?;
        Ok(t.allocations.values().filter(|a| &a.session_id == session).cloned().collect())
    }

    fn upsert_allocation(&self, row: Allocation) -> IoResult<Allocation> {
        self.write(|t| {
            let key = (row.session_id.clone(), row.strategy_id.clone(), row.indicator_id.clone());
            debug!(session = %row.session_id, strategy = %row.strategy_id, indicator = %row.indicator_id, weight = row.weight, "upsert allocation");
            t.allocations.insert(key, row.clone());
            Ok(row)
        })
    }

    fn delete_allocations_where(
        &self,
        session: &SessionId,
        strategy: &StrategyId,
        keep: &[IndicatorId],
    ) -> IoResult<usize> {
        self.write(|t| {
            let n = delete_where(&mut t.allocations, session, strategy, keep);
            if n > 0 {
                debug!(%session, %strategy, deleted = n, "delete allocations");
            }
            Ok(n)
        })
    }

    fn group_sum_by_strategy(&self, session: &SessionId) -> IoResult<BTreeMap<StrategyId, f64>> {
        let t = self.read()?;
        let mut out: BTreeMap<StrategyId, f64> = BTreeMap::new();
        for a in t.allocations.values().filter(|a| &a.session_id == session) {
            *out.entry(a.strategy_id.clone()).or_insert(0.0) += a.weight;
        }
        Ok(out)
    }

    fn find_submitted_allocations_for_strategy(&self, strategy: &StrategyId) -> IoResult<Vec<SubmittedRow>> {
        let t = self.read()?;
        let mut rows: Vec<(&Session, &Allocation)> = t
            .allocations
            .values()
            .filter(|a| &a.strategy_id == strategy)
            .filter_map(|a| t.sessions.get(&a.session_id).map(|s| (s, a)))
            .filter(|(s, _)| s.status == SessionStatus::Submitted)
            .collect();
        rows.sort_by(|(sa, aa), (sb, ab)| {
            (sa.created_at, &sa.id, &aa.indicator_id).cmp(&(sb.created_at, &sb.id, &ab.indicator_id))
        });
        Ok(rows
            .into_iter()
            .map(|(s, a)| SubmittedRow { respondent_id: s.respondent_id.clone(), allocation: a.clone() })
            .collect())
    }

    // ----- Second-iteration allocations -----

    fn find_revised(&self, session: &SessionId, strategy: &StrategyId) -> IoResult<Vec<RevisedAllocation>> {
        let t = self.read()?;
        Ok(strategy_range(&t.revised, session, strategy).cloned().collect())
    }

    fn find_session_revised(&self, session: &SessionId) -> IoResult<Vec<RevisedAllocation>> {
        let t = self.read()?;
        Ok(t.revised.values().filter(|a| &a.session_id == session).cloned().collect())
    }

    fn upsert_revised(&self, row: RevisedAllocation) -> IoResult<RevisedAllocation> {
        self.write(|t| {
            let key = (row.session_id.clone(), row.strategy_id.clone(), row.indicator_id.clone());
            debug!(session = %row.session_id, strategy = %row.strategy_id, indicator = %row.indicator_id, weight = row.weight, "upsert revised allocation");
            t.revised.insert(key, row.clone());
            Ok(row)
        })
    }

    fn delete_revised_where(
        &self,
        session: &SessionId,
        strategy: &StrategyId,
        keep: &[IndicatorId],
    ) -> IoResult<usize> {
        self.write(|t| Ok(delete_where(&mut t.revised, session, strategy, keep)))
    }

    // ----- Audit trail -----

    fn append_log(&self, entry: SessionLog) -> IoResult<()> {
        self.write(|t| {
            t.logs.push(entry);
            Ok(())
        })
    }

    fn session_logs(&self, session: &SessionId) -> IoResult<Vec<SessionLog>> {
        Ok(self.read()?.logs.iter().filter(|l| &l.session_id == session).cloned().collect())
    }
}
