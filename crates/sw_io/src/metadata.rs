//! Session records as persisted: typed metadata becomes the
//! `{ "skippedStrategies": [...], "strategyRatings": {...} }` blob here and
//! nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use sw_core::{
    AccessToken, Policy, RespondentId, Session, SessionId, SessionMetadata, SessionStatus,
    StrategyId, SurveyId, Timestamp,
};

use crate::{IoError, IoResult};

const SKIPPED_KEY: &str = "skippedStrategies";
const RATINGS_KEY: &str = "strategyRatings";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub survey_id: SurveyId,
    pub respondent_id: RespondentId,
    pub token: AccessToken,
    pub status: SessionStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_strategy: Option<StrategyId>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl SessionRecord {
    pub fn from_session(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            survey_id: s.survey_id.clone(),
            respondent_id: s.respondent_id.clone(),
            token: s.token.clone(),
            status: s.status,
            progress: s.progress,
            current_strategy: s.current_strategy.clone(),
            metadata: metadata_to_blob(&s.metadata),
            created_at: s.created_at,
            updated_at: s.updated_at,
            completed_at: s.completed_at,
        }
    }

    pub fn into_session(self) -> IoResult<Session> {
        let metadata = metadata_from_blob(&self.metadata)
            .map_err(|e| at_pointer(e, &format!("/sessions/{}/metadata", self.id)))?;
        Ok(Session {
            id: self.id,
            survey_id: self.survey_id,
            respondent_id: self.respondent_id,
            token: self.token,
            status: self.status,
            progress: self.progress,
            current_strategy: self.current_strategy,
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

pub fn metadata_to_blob(m: &SessionMetadata) -> Value {
    let ratings: Map<String, Value> = m
        .strategy_ratings
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    let skipped: Vec<Value> = m.skipped_strategy_ids.iter().map(|s| json!(s.as_str())).collect();
    let mut blob = Map::new();
    blob.insert(SKIPPED_KEY.to_string(), Value::Array(skipped));
    blob.insert(RATINGS_KEY.to_string(), Value::Object(ratings));
    Value::Object(blob)
}

/// Missing keys and `null` read as empty; unknown keys are ignored.
pub fn metadata_from_blob(v: &Value) -> IoResult<SessionMetadata> {
    let mut out = SessionMetadata::default();
    let obj = match v {
        Value::Null => return Ok(out),
        Value::Object(o) => o,
        _ => return Err(json_err("/", "metadata must be an object")),
    };

    match obj.get(SKIPPED_KEY) {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let id = item
                    .as_str()
                    .and_then(|s| s.parse::<StrategyId>().ok())
                    .ok_or_else(|| json_err(&format!("/{SKIPPED_KEY}/{i}"), "expected strategy id"))?;
                out.skipped_strategy_ids.insert(id);
            }
        }
        Some(_) => return Err(json_err(&format!("/{SKIPPED_KEY}"), "expected array")),
    }

    match obj.get(RATINGS_KEY) {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            let max = Policy::default().max_strategy_rating;
            for (k, val) in map {
                let ptr = format!("/{RATINGS_KEY}/{k}");
                let id: StrategyId = k.parse().map_err(|_| json_err(&ptr, "expected strategy id"))?;
                let bad_rating = || json_err(&ptr, &format!("expected rating 0..={max}"));
                let rating = val.as_u64().and_then(|n| u8::try_from(n).ok()).ok_or_else(bad_rating)?;
                out.set_rating(&id, rating, max).map_err(|_| bad_rating())?;
            }
        }
        Some(_) => return Err(json_err(&format!("/{RATINGS_KEY}"), "expected object")),
    }

    Ok(out)
}

fn json_err(pointer: &str, msg: &str) -> IoError {
    IoError::Json { pointer: pointer.to_string(), msg: msg.to_string() }
}

fn at_pointer(e: IoError, prefix: &str) -> IoError {
    match e {
        IoError::Json { pointer, msg } => {
            let pointer = if pointer == "/" { prefix.to_string() } else { format!("{prefix}{pointer}") };
            IoError::Json { pointer, msg }
        }
        other => other,
    }
}
