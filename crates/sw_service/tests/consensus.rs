//! Consolidation, second-iteration review and the admin views.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use sw_algo::SecondIterationStatus;
use sw_core::LogEvent;
use sw_io::Store;
use sw_service::{DebouncedCommit, ResponseInput, ReviseRequest, SaveStatus, ServiceError, ResponsesView};

fn input(id: &str, w: f64, t: Option<&str>) -> ResponseInput {
    ResponseInput { indicator_id: id.parse().unwrap(), weight: w, threshold: t.map(str::to_string), excluded: false }
}

fn revise(rows: Vec<ResponseInput>, mark: bool) -> ReviseRequest {
    ReviseRequest { responses: rows, mark_as_reviewed: mark }
}

fn row<'a>(view: &'a ResponsesView, id: &str) -> &'a sw_service::ResponseRow {
    view.rows.iter().find(|r| r.indicator_id.as_str() == id).unwrap()
}

/// Ana and Ben both weight st-a and submit; Ana skips st-b.
fn two_submitted(svc: &Service) -> (String, String) {
    let ana = open(svc, "tok-ana");
    svc.save_draft(&ana, &weighted("st-a", &[("i1", 60.0, Some("> 5")), ("i2", 40.0, None)]))
        .unwrap();
    svc.save_draft(&ana, &skipped("st-b")).unwrap();
    svc.submit(&ana, &ack()).unwrap();

    let ben = open(svc, "tok-ben");
    svc.save_draft(&ben, &weighted("st-a", &[("i1", 50.0, None), ("i3", 50.0, Some("rising"))]))
        .unwrap();
    svc.submit(&ben, &ack()).unwrap();
    (ana, ben)
}

// ----- Consolidated view -----

#[test]
fn averages_divide_by_all_respondents_of_the_strategy() {
    let (svc, _) = service();
    for (tok, ind) in [("tok-ana", "i1"), ("tok-ben", "i2"), ("tok-cai", "i3")] {
        let sid = open(&svc, tok);
        svc.save_draft(&sid, &weighted("st-a", &[(ind, 100.0, None)])).unwrap();
        svc.submit(&sid, &ack()).unwrap();
    }
    // Drafts never count.
    let dan = open(&svc, "tok-dan");
    svc.save_draft(&dan, &weighted("st-a", &[("i4", 100.0, None)])).unwrap();

    let export = svc.export_consolidated("dengue").unwrap();
    let st_a = &export.strategies[0];
    assert_eq!(st_a.total_respondents, 3);
    let ids: Vec<&str> = st_a.indicators.iter().map(|i| i.indicator_id.as_str()).collect();
    assert_eq!(ids, ["i1", "i2", "i3"]);
    assert!(st_a.indicators.iter().all(|i| i.average == 33.33));
    assert!(export.strategies[1].indicators.is_empty());
}

#[test]
fn caller_is_left_out_of_lists_but_not_averages() {
    let (svc, _) = service();
    let (ana, _) = two_submitted(&svc);
    let view = svc.consolidated(&ana, "st-a").unwrap();
    assert_eq!(view.total_respondents, 2);

    let i1 = view.indicators.iter().find(|i| i.indicator_id.as_str() == "i1").unwrap();
    assert_eq!(i1.weights, vec![50.0]);
    assert_eq!(i1.all_weights.len(), 2);
    assert_eq!(i1.average, 55.0);
    assert!(i1.thresholds.is_empty());

    let i3 = view.indicators.iter().find(|i| i.indicator_id.as_str() == "i3").unwrap();
    assert_eq!(i3.thresholds, vec!["rising".to_string()]);
    assert_eq!(i3.average, 25.0);
}

// ----- Second iteration -----

#[test]
fn responses_are_seeded_and_merged_with_the_group() {
    let (svc, _) = service();
    let (ana, _) = two_submitted(&svc);

    let view = svc.second_iteration_responses(&ana, "st-a").unwrap();
    assert_eq!(view.status, SecondIterationStatus::Incomplete);
    assert_eq!(view.total_weight, 100.0);
    assert!(row(&view, "i1").is_original);
    assert!(!row(&view, "i1").from_consolidation);
    let i3 = row(&view, "i3");
    assert!(i3.from_consolidation);
    assert!(!i3.is_original);
    assert_eq!(i3.weight, 0.0);

    // Group rows are not stored until saved.
    let stored = svc.store().find_revised(&ana.parse().unwrap(), &"st-a".parse().unwrap()).unwrap();
    assert_eq!(stored.len(), 2);
}

#[test]
fn skipped_strategies_are_out_of_the_second_iteration() {
    let (svc, _) = service();
    let (ana, _) = two_submitted(&svc);
    assert!(matches!(svc.second_iteration_responses(&ana, "st-b"), Err(ServiceError::Validation(_))));

    let p = svc.second_iteration_progress(&ana).unwrap().progress;
    assert_eq!(p.total, 3);
    assert_eq!(p.skipped, 1);
    assert_eq!(p.available, 2);
    assert_eq!(p.not_started, 2);
    assert!(p.strategies.iter().all(|(id, _)| id.as_str() != "st-b"));
}

#[test]
fn review_mark_takes_priority_over_modification() {
    let (svc, clock) = service();
    let (ana, _) = two_submitted(&svc);
    svc.second_iteration_responses(&ana, "st-a").unwrap();

    let view = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 70.0, Some("> 5")), input("i2", 30.0, None)], false))
        .unwrap();
    assert_eq!(view.status, SecondIterationStatus::Modified);

    clock.advance(chrono::Duration::minutes(5));
    let view = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 70.0, Some("> 5")), input("i2", 30.0, None)], true))
        .unwrap();
    assert_eq!(view.status, SecondIterationStatus::Reviewed);
    let stamped = row(&view, "i1").reviewed_at;
    assert!(stamped.is_some());

    // Later edits keep the mark.
    clock.advance(chrono::Duration::minutes(5));
    let view = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 60.0, Some("> 5")), input("i2", 40.0, None)], false))
        .unwrap();
    assert_eq!(view.status, SecondIterationStatus::Reviewed);
    assert_eq!(row(&view, "i1").reviewed_at, stamped);

    let p = svc.second_iteration_progress(&ana).unwrap().progress;
    assert_eq!(p.reviewed, 1);
    assert_eq!(p.progress, 0.5);
}

#[test]
fn review_mark_survives_a_store_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let clock = Arc::new(sw_service::FixedClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2025, 3, 1, 9, 0, 0).unwrap(),
    ));
    let store = sw_io::MemoryStore::create_file(&path, dataset()).unwrap();
    let svc = Service::with_clock(store, sw_core::Policy::default(), clock.clone());
    let (ana, _) = two_submitted(&svc);
    svc.second_iteration_responses(&ana, "st-a").unwrap();
    let view = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 70.0, Some("> 5")), input("i2", 30.0, None)], true))
        .unwrap();
    assert_eq!(view.status, SecondIterationStatus::Reviewed);
    let stamped = row(&view, "i1").reviewed_at;
    drop(svc);

    let store = sw_io::MemoryStore::open_file(&path).unwrap();
    let svc = Service::with_clock(store, sw_core::Policy::default(), clock);
    let p = svc.second_iteration_progress(&ana).unwrap().progress;
    let st_a = p.strategies.iter().find(|(id, _)| id.as_str() == "st-a").unwrap();
    assert_eq!(st_a.1, SecondIterationStatus::Reviewed);
    assert_eq!(p.reviewed, 1);

    let view = svc.second_iteration_responses(&ana, "st-a").unwrap();
    assert_eq!(view.status, SecondIterationStatus::Reviewed);
    assert_eq!(row(&view, "i1").reviewed_at, stamped);
}

#[test]
fn new_indicator_needs_a_threshold_before_review() {
    let (svc, _) = service();
    let (ana, _) = two_submitted(&svc);
    svc.second_iteration_responses(&ana, "st-a").unwrap();

    let rows = vec![input("i1", 50.0, Some("> 5")), input("i2", 30.0, None), input("i3", 20.0, None)];
    let err = svc.save_second_iteration(&ana, "st-a", &revise(rows, true)).unwrap_err();
    let ServiceError::ReviewBlocked(block) = &err else { panic!("expected review block, got {err:?}") };
    assert_eq!(block.total, None);
    assert_eq!(block.missing_thresholds.len(), 1);
    assert_eq!(block.missing_thresholds[0].as_str(), "i3");

    // Refused before any write.
    let stored = svc.store().find_revised(&ana.parse().unwrap(), &"st-a".parse().unwrap()).unwrap();
    assert_eq!(stored.len(), 2);

    let rows = vec![input("i1", 50.0, Some("> 5")), input("i2", 30.0, None), input("i3", 20.0, Some("> 2"))];
    let view = svc.save_second_iteration(&ana, "st-a", &revise(rows, true)).unwrap();
    assert_eq!(view.status, SecondIterationStatus::Reviewed);
    let i3 = row(&view, "i3");
    assert!(!i3.is_original);
    assert!(!i3.from_consolidation);
}

#[test]
fn review_requires_a_full_budget_and_excluded_rows_count_zero() {
    let (svc, _) = service();
    let (ana, _) = two_submitted(&svc);

    let mut i2 = input("i2", 40.0, None);
    i2.excluded = true;
    let err = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 60.0, Some("> 5")), i2.clone()], true))
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReviewBlocked(ref b) if b.total == Some(60.0)));

    let view = svc
        .save_second_iteration(&ana, "st-a", &revise(vec![input("i1", 100.0, Some("> 5")), i2], true))
        .unwrap();
    assert_eq!(view.total_weight, 100.0);
    assert!(row(&view, "i2").excluded);
}

// ----- Admin -----

#[test]
fn overview_lists_sessions_in_creation_order() {
    let (svc, clock) = service();
    let (ana, ben) = two_submitted(&svc);
    clock.advance(chrono::Duration::minutes(1));
    let cai = open(&svc, "tok-cai");

    let o = svc.session_overview("dengue").unwrap();
    assert_eq!(o.total_sessions, 3);
    assert_eq!(o.submitted, 2);
    let ids: Vec<String> = o.sessions.iter().map(|r| r.session_id.to_string()).collect();
    assert!(ids.contains(&ana) && ids.contains(&ben));
    assert_eq!(ids[2], cai);
    let ana_row = o.sessions.iter().find(|r| r.session_id.as_str() == ana).unwrap();
    assert_eq!(ana_row.skipped_strategies, 1);
    assert_eq!(ana_row.respondent_name, "Ana");

    assert!(matches!(svc.session_overview("zika"), Err(ServiceError::NotFound { kind: "survey", .. })));
}

// ----- Autosave -----

#[tokio::test(start_paused = true)]
async fn debounced_drafts_reach_the_store_once() {
    let (svc, _) = service();
    let svc = Arc::new(svc);
    let sid = open(&svc, "tok-ana");

    let target = svc.clone();
    let session = sid.clone();
    let saver = DebouncedCommit::spawn(Duration::from_millis(svc.policy().autosave_delay_ms), move |req: sw_service::DraftRequest| {
        target.save_draft(&session, &req).map(|_| ())
    });

    for w in [10.0, 40.0, 100.0] {
        saver.push(weighted("st-a", &[("i1", w, None)]));
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(saver.status(), SaveStatus::Saved);

    let logs = svc.store().session_logs(&sid.parse().unwrap()).unwrap();
    assert_eq!(logs.iter().filter(|l| l.event == LogEvent::Autosave).count(), 1);
    let rows = svc.store().find_allocations(&sid.parse().unwrap(), &"st-a".parse().unwrap()).unwrap();
    assert_eq!(rows[0].weight, 100.0);

    // A refused draft shows up as an error status.
    saver.push(weighted("st-a", &[("i1", 150.0, None)]));
    saver.flush().await;
    assert!(matches!(saver.status(), SaveStatus::Error(_)));
}
