//! sw_core: Core types, identifiers, session metadata, weight arithmetic and policy.
//!
//! This crate is **I/O-free**. It defines the stable types used across the
//! engine (`sw_algo`, `sw_io`, `sw_service`, `sw_report`, `sw_cli`).
//!
//! - Identifiers: `SurveyId`, `StrategyId`, `IndicatorId`, `RespondentId`,
//!   `SessionId`, `AccessToken`
//! - Reference data: `Survey`, `Strategy`, `Indicator`
//! - Mutable records: `Respondent`, `Session`, `Invite`, `Allocation`,
//!   `RevisedAllocation`, `SessionLog`
//! - Typed session metadata (skipped strategies, importance ratings)
//! - Weight arithmetic (clamp, step rounding, tolerance comparison)
//! - `Policy`: every tunable of the weighting rules with reference defaults
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod entities;
pub mod errors;
pub mod ids;
pub mod metadata;
pub mod rounding;
pub mod variables;

pub use entities::{
    Allocation, Indicator, Invite, InviteRejection, InviteStatus, LogEvent, Respondent, RevisedAllocation,
    Session, SessionLog, SessionStatus, Strategy, Survey,
};
pub use errors::CoreError;
pub use ids::{AccessToken, IndicatorId, RespondentId, SessionId, StrategyId, SurveyId};
pub use metadata::SessionMetadata;
pub use variables::Policy;

/// Timestamps are always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
