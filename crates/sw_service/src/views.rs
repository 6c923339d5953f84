//! Request and response shapes at the API boundary.

use serde::{Deserialize, Serialize};

use sw_algo::{
    FirstIterationStatus, IncompleteStrategy, IndicatorConsolidation, SecondIterationProgress,
    SecondIterationStatus,
};
use sw_core::{
    IndicatorId, RespondentId, SessionId, SessionStatus, StrategyId, SurveyId, Timestamp,
};

// ----- Access -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccessOutcome {
    pub session_id: SessionId,
    pub survey_id: SurveyId,
    pub respondent_id: RespondentId,
    /// False when this call created the session.
    pub resumed: bool,
    pub status: SessionStatus,
    pub progress: f64,
    pub current_strategy: Option<StrategyId>,
}

// ----- First iteration -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationView {
    pub indicator_id: IndicatorId,
    pub weight: f64,
    pub threshold: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy_id: StrategyId,
    pub title: String,
    pub order: u32,
    pub status: FirstIterationStatus,
    pub skipped: bool,
    pub rating: Option<u8>,
    pub total_weight: f64,
    pub indicators: Vec<AllocationView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub survey_id: SurveyId,
    pub status: SessionStatus,
    /// Stored progress ratio.
    pub progress: f64,
    pub completed: usize,
    pub total: usize,
    pub current_strategy: Option<StrategyId>,
    pub strategies: Vec<StrategySummary>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    Weighted,
    /// "Not my area of expertise": the strategy is skipped.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightInput {
    pub indicator_id: IndicatorId,
    pub weight: f64,
    #[serde(default)]
    pub threshold: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub strategy_id: StrategyId,
    #[serde(default)]
    pub weights: Vec<WeightInput>,
    #[serde(default)]
    pub evaluation_mode: EvaluationMode,
    #[serde(default)]
    pub importance_rating: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DraftOutcome {
    pub session_id: SessionId,
    pub strategy_id: StrategyId,
    pub status: FirstIterationStatus,
    pub total_weight: f64,
    pub saved: usize,
    pub deleted: usize,
    pub progress: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub acknowledge_incomplete: bool,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub is_resubmission: bool,
    pub completed_at: Timestamp,
    pub progress: f64,
    /// Strategies still incomplete at submit time (acknowledged).
    pub incomplete: Vec<IncompleteStrategy>,
}

// ----- Consolidated view -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsolidatedView {
    pub strategy_id: StrategyId,
    pub total_respondents: usize,
    pub indicators: Vec<IndicatorConsolidation>,
}

// ----- Second iteration -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseRow {
    pub indicator_id: IndicatorId,
    pub weight: f64,
    pub threshold: Option<String>,
    pub excluded: bool,
    pub is_original: bool,
    pub reviewed_at: Option<Timestamp>,
    /// Not stored yet; shown because other respondents picked it.
    pub from_consolidation: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponsesView {
    pub session_id: SessionId,
    pub strategy_id: StrategyId,
    pub status: SecondIterationStatus,
    pub total_weight: f64,
    pub rows: Vec<ResponseRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseInput {
    pub indicator_id: IndicatorId,
    pub weight: f64,
    #[serde(default)]
    pub threshold: Option<String>,
    #[serde(default)]
    pub excluded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviseRequest {
    #[serde(default)]
    pub responses: Vec<ResponseInput>,
    #[serde(default)]
    pub mark_as_reviewed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SecondIterationProgressView {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub progress: SecondIterationProgress,
}

// ----- Admin -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverviewRow {
    pub session_id: SessionId,
    pub respondent_id: RespondentId,
    pub respondent_name: String,
    pub email: String,
    pub role: Option<String>,
    pub status: SessionStatus,
    pub progress: f64,
    pub completed_at: Option<Timestamp>,
    pub skipped_strategies: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionOverview {
    pub survey_id: SurveyId,
    pub total_sessions: usize,
    pub submitted: usize,
    pub sessions: Vec<OverviewRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyConsolidation {
    pub strategy_id: StrategyId,
    pub title: String,
    pub order: u32,
    pub total_respondents: usize,
    pub indicators: Vec<IndicatorConsolidation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsolidatedExport {
    pub survey_id: SurveyId,
    pub strategies: Vec<StrategyConsolidation>,
}
