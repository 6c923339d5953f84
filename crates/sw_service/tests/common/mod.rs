//! Shared fixture: one dengue survey with three strategies, five indicators
//! and a handful of invites. Time is pinned to 2025-03-01.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use sw_core::Policy;
use sw_io::{Dataset, MemoryStore};
use sw_service::{DraftRequest, EvaluationMode, FixedClock, SubmitRequest, SurveyService, WeightInput};

pub type Service = SurveyService<MemoryStore>;

pub fn dataset() -> Dataset {
    serde_json::from_value(json!({
        "surveys": [{ "id": "dengue", "title": "Dengue surveillance indicators" }],
        "strategies": [
            { "id": "st-a", "survey_id": "dengue", "title": "Vector control", "order": 1 },
            { "id": "st-b", "survey_id": "dengue", "title": "Case management", "order": 2 },
            { "id": "st-c", "survey_id": "dengue", "title": "Community engagement", "order": 3 }
        ],
        "indicators": [
            { "id": "i1", "name": "Breteau index", "domain": "entomology" },
            { "id": "i2", "name": "House index", "domain": "entomology" },
            { "id": "i3", "name": "Incidence rate", "domain": "epidemiology" },
            { "id": "i4", "name": "Lethality", "domain": "epidemiology" },
            { "id": "i5", "name": "Rainfall", "domain": "climate" }
        ],
        "invites": [
            { "token": "tok-ana", "survey_id": "dengue", "email": "Ana@Example.org", "name": "Ana", "status": "pending" },
            { "token": "tok-ana2", "survey_id": "dengue", "email": " ana@example.ORG", "status": "pending" },
            { "token": "tok-ben", "survey_id": "dengue", "email": "ben@example.org", "status": "pending" },
            { "token": "tok-cai", "survey_id": "dengue", "email": "cai@example.org", "status": "pending" },
            { "token": "tok-dan", "survey_id": "dengue", "email": "dan@example.org", "status": "pending" },
            { "token": "tok-rev", "survey_id": "dengue", "email": "rev@example.org", "status": "revoked" },
            { "token": "tok-old", "survey_id": "dengue", "email": "old@example.org", "status": "pending",
              "expires_at": "2025-01-01T00:00:00Z" }
        ]
    }))
    .unwrap()
}

pub fn service() -> (Service, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
    let store = MemoryStore::from_dataset(dataset()).unwrap();
    (SurveyService::with_clock(store, Policy::default(), clock.clone()), clock)
}

pub fn open(svc: &Service, token: &str) -> String {
    svc.access(token).unwrap().session_id.to_string()
}

pub fn weights(rows: &[(&str, f64, Option<&str>)]) -> Vec<WeightInput> {
    rows.iter()
        .map(|(id, w, t)| WeightInput {
            indicator_id: id.parse().unwrap(),
            weight: *w,
            threshold: t.map(str::to_string),
        })
        .collect()
}

pub fn weighted(strategy: &str, rows: &[(&str, f64, Option<&str>)]) -> DraftRequest {
    DraftRequest {
        strategy_id: strategy.parse().unwrap(),
        weights: weights(rows),
        evaluation_mode: EvaluationMode::Weighted,
        importance_rating: None,
    }
}

pub fn skipped(strategy: &str) -> DraftRequest {
    DraftRequest {
        strategy_id: strategy.parse().unwrap(),
        weights: Vec::new(),
        evaluation_mode: EvaluationMode::Skipped,
        importance_rating: None,
    }
}

pub fn ack() -> SubmitRequest {
    SubmitRequest { acknowledge_incomplete: true, role: None }
}
