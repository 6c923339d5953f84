//! End-to-end runs of the `sw` binary against a store file in a temp dir.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let seed = json!({
            "surveys": [{ "id": "dengue", "title": "Dengue" }],
            "strategies": [
                { "id": "st-a", "survey_id": "dengue", "title": "Vector control", "order": 1 },
                { "id": "st-b", "survey_id": "dengue", "title": "Case management", "order": 2 }
            ],
            "indicators": [
                { "id": "i1", "name": "Breteau index", "domain": "entomology" },
                { "id": "i2", "name": "Incidence rate", "domain": "epidemiology" }
            ],
            "invites": [
                { "token": "tok-ana", "survey_id": "dengue", "email": "ana@example.org", "status": "pending" },
                { "token": "tok-rev", "survey_id": "dengue", "email": "rev@example.org", "status": "revoked" }
            ]
        });
        std::fs::write(dir.path().join("seed.json"), seed.to_string()).unwrap();
        Env { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, v: Value) -> PathBuf {
        let p = self.path(name);
        std::fs::write(&p, v.to_string()).unwrap();
        p
    }

    fn sw(&self) -> Command {
        let mut cmd = Command::cargo_bin("sw").unwrap();
        cmd.arg("--store").arg(self.path("store.json"));
        cmd
    }

    fn init(&self) {
        self.sw().args(["init", "--dataset"]).arg(self.path("seed.json")).assert().success();
    }

    fn json(&self, args: &[&str]) -> Value {
        let out = self.sw().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&out).unwrap()
    }
}

fn arg(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn full_first_iteration_flow_and_export() {
    let env = Env::new();
    env.init();

    let access = env.json(&["access", "--token", "tok-ana"]);
    let sid = access["session_id"].as_str().unwrap().to_string();
    assert_eq!(access["resumed"], json!(false));

    let w = env.write("w.json", json!([
        { "indicator_id": "i1", "weight": 70, "threshold": "> 5" },
        { "indicator_id": "i2", "weight": 30 }
    ]));
    let draft = env.json(&["draft", "--session", &sid, "--strategy", "st-a", "--weights", arg(&w)]);
    assert_eq!(draft["status"], json!("complete"));

    env.json(&["draft", "--session", &sid, "--strategy", "st-b", "--skip"]);
    let summary = env.json(&["summary", "--session", &sid]);
    assert_eq!(summary["completed"], json!(2));

    let submit = env.json(&["submit", "--session", &sid, "--role", "epidemiologist"]);
    assert_eq!(submit["status"], json!("submitted"));

    let out = env.path("out");
    let export = env.json(&["export", "--survey", "dengue", "--out", arg(&out)]);
    assert_eq!(export["sha256"].as_str().unwrap().len(), 64);
    assert!(out.join("report.json").is_file());
}

#[test]
fn blocked_submit_exits_with_validation_code() {
    let env = Env::new();
    env.init();
    let sid = env.json(&["access", "--token", "tok-ana"])["session_id"].as_str().unwrap().to_string();
    env.sw()
        .args(["submit", "--session", &sid])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("submission blocked"));
}

#[test]
fn rejected_token_and_unknown_session_exit_with_not_found_code() {
    let env = Env::new();
    env.init();
    env.sw().args(["access", "--token", "tok-rev"]).assert().code(3);
    env.sw().args(["summary", "--session", "nope"]).assert().code(3);
}

#[test]
fn missing_store_and_double_init() {
    let env = Env::new();
    env.sw().args(["summary", "--session", "s"]).assert().code(3);
    env.init();
    env.sw()
        .args(["init", "--dataset"])
        .arg(env.path("seed.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn distribute_needs_no_store() {
    let env = Env::new();
    let out = env.json(&["distribute", "--count", "3"]);
    assert_eq!(out["weights"], json!([35.0, 35.0, 30.0]));
    assert_eq!(out["residual"], json!(0.0));
    env.sw().args(["distribute", "--count", "3", "--step", "0"]).assert().code(2);
}
