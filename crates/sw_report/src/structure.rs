//! Report model: cover → participation → strategies.
//!
//! Built from the service views only; nothing is recomputed except display
//! strings and the per-indicator min/max.

use std::collections::BTreeMap;

use serde::Serialize;

use sw_core::{Indicator, IndicatorId, SessionId, SessionStatus, StrategyId, Survey, SurveyId, Timestamp};
use sw_service::{ConsolidatedExport, SessionOverview};

use crate::ReportError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportModel {
    pub cover: Cover,
    pub participation: Participation,
    pub strategies: Vec<StrategySection>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cover {
    pub survey_id: SurveyId,
    pub title: String,
    pub generated_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Participation {
    pub total_sessions: usize,
    pub submitted: usize,
    pub drafts: usize,
    /// "66.7%"; "0.0%" with no sessions.
    pub submitted_share: String,
    pub participants: Vec<ParticipantLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParticipantLine {
    pub session_id: SessionId,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub status: SessionStatus,
    pub progress: String,
    pub completed_at: Option<Timestamp>,
    pub skipped_strategies: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategySection {
    pub strategy_id: StrategyId,
    pub title: String,
    pub order: u32,
    pub total_respondents: usize,
    pub indicators: Vec<IndicatorLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndicatorLine {
    pub indicator_id: IndicatorId,
    pub name: String,
    pub domain: String,
    pub average: f64,
    /// Respondents who gave this indicator a row.
    pub respondents: usize,
    pub min: f64,
    pub max: f64,
    pub thresholds: Vec<String>,
}

/// Assemble the model. `indicators` supplies names and domains; unknown ids
/// fall back to the id itself.
pub fn build_model(
    survey: &Survey,
    overview: &SessionOverview,
    export: &ConsolidatedExport,
    indicators: &[Indicator],
    generated_at: Timestamp,
) -> Result<ReportModel, ReportError> {
    if overview.survey_id != export.survey_id || overview.survey_id != survey.id {
        return Err(ReportError::SurveyMismatch {
            overview: overview.survey_id.to_string(),
            export: export.survey_id.to_string(),
        });
    }

    let catalog: BTreeMap<&IndicatorId, &Indicator> = indicators.iter().map(|i| (&i.id, i)).collect();

    let participants = overview
        .sessions
        .iter()
        .map(|row| ParticipantLine {
            session_id: row.session_id.clone(),
            name: row.respondent_name.clone(),
            email: row.email.clone(),
            role: row.role.clone(),
            status: row.status,
            progress: percent_1dp(row.progress),
            completed_at: row.completed_at,
            skipped_strategies: row.skipped_strategies,
        })
        .collect();

    let share = if overview.total_sessions == 0 {
        0.0
    } else {
        overview.submitted as f64 / overview.total_sessions as f64
    };
    let participation = Participation {
        total_sessions: overview.total_sessions,
        submitted: overview.submitted,
        drafts: overview.total_sessions - overview.submitted,
        submitted_share: percent_1dp(share),
        participants,
    };

    let strategies = export
        .strategies
        .iter()
        .map(|s| StrategySection {
            strategy_id: s.strategy_id.clone(),
            title: s.title.clone(),
            order: s.order,
            total_respondents: s.total_respondents,
            indicators: s
                .indicators
                .iter()
                .map(|c| {
                    let meta = catalog.get(&c.indicator_id);
                    IndicatorLine {
                        indicator_id: c.indicator_id.clone(),
                        name: meta.map_or_else(|| c.indicator_id.to_string(), |i| i.name.clone()),
                        domain: meta.map(|i| i.domain.clone()).unwrap_or_default(),
                        average: c.average,
                        respondents: c.total_count,
                        min: bound(&c.all_weights, f64::min),
                        max: bound(&c.all_weights, f64::max),
                        thresholds: c.thresholds.clone(),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(ReportModel {
        cover: Cover {
            survey_id: survey.id.clone(),
            title: survey.title.clone(),
            generated_at,
        },
        participation,
        strategies,
    })
}

fn bound(weights: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    weights.iter().copied().reduce(pick).unwrap_or(0.0)
}

/// Ratio in [0, 1] as a one-decimal percent string.
fn percent_1dp(ratio: f64) -> String {
    let tenths = (ratio.clamp(0.0, 1.0) * 1000.0).round() as u32;
    format!("{}.{}%", tenths / 10, tenths % 10)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sw_algo::IndicatorConsolidation;
    use sw_service::{OverviewRow, StrategyConsolidation};

    pub(crate) fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    pub(crate) fn fixture() -> (Survey, SessionOverview, ConsolidatedExport, Vec<Indicator>) {
        let survey = Survey { id: "dengue".parse().unwrap(), title: "Dengue".into(), active: true };
        let row = |sid: &str, name: &str, status, progress| OverviewRow {
            session_id: sid.parse().unwrap(),
            respondent_id: format!("r-{name}").parse().unwrap(),
            respondent_name: name.into(),
            email: format!("{name}@example.org"),
            role: None,
            status,
            progress,
            completed_at: None,
            skipped_strategies: 0,
        };
        let overview = SessionOverview {
            survey_id: survey.id.clone(),
            total_sessions: 3,
            submitted: 2,
            sessions: vec![
                row("s1", "ana", SessionStatus::Submitted, 1.0),
                row("s2", "ben", SessionStatus::Submitted, 1.0),
                row("s3", "cai", SessionStatus::Draft, 1.0 / 3.0),
            ],
        };
        let export = ConsolidatedExport {
            survey_id: survey.id.clone(),
            strategies: vec![StrategyConsolidation {
                strategy_id: "st-a".parse().unwrap(),
                title: "Vector control".into(),
                order: 1,
                total_respondents: 2,
                indicators: vec![
                    IndicatorConsolidation {
                        indicator_id: "i1".parse().unwrap(),
                        weights: vec![60.0, 50.0],
                        all_weights: vec![60.0, 50.0],
                        total_count: 2,
                        thresholds: vec!["> 5".into()],
                        average: 55.0,
                    },
                    IndicatorConsolidation {
                        indicator_id: "i9".parse().unwrap(),
                        weights: vec![50.0],
                        all_weights: vec![50.0],
                        total_count: 1,
                        thresholds: vec![],
                        average: 25.0,
                    },
                ],
            }],
        };
        let indicators = vec![Indicator {
            id: "i1".parse().unwrap(),
            name: "Breteau index".into(),
            description: None,
            domain: "entomology".into(),
            active: true,
        }];
        (survey, overview, export, indicators)
    }

    #[test]
    fn model_carries_participation_and_strategy_lines() {
        let (survey, overview, export, indicators) = fixture();
        let m = build_model(&survey, &overview, &export, &indicators, at()).unwrap();
        assert_eq!(m.participation.drafts, 1);
        assert_eq!(m.participation.submitted_share, "66.7%");
        assert_eq!(m.participation.participants[2].progress, "33.3%");

        let lines = &m.strategies[0].indicators;
        assert_eq!(lines[0].name, "Breteau index");
        assert_eq!((lines[0].min, lines[0].max), (50.0, 60.0));
        // Unknown indicator keeps its id as name.
        assert_eq!(lines[1].name, "i9");
        assert_eq!(lines[1].domain, "");
    }

    #[test]
    fn mismatched_surveys_are_refused() {
        let (survey, overview, mut export, indicators) = fixture();
        export.survey_id = "zika".parse().unwrap();
        assert!(matches!(
            build_model(&survey, &overview, &export, &indicators, at()),
            Err(ReportError::SurveyMismatch { .. })
        ));
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(percent_1dp(0.0), "0.0%");
        assert_eq!(percent_1dp(1.0), "100.0%");
        assert_eq!(percent_1dp(0.6666), "66.7%");
    }
}
