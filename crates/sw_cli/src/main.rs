// crates/sw_cli/src/main.rs
//
// `sw`: drives the survey service against a JSON store file. Every command
// prints pretty JSON on stdout; logs and errors go to stderr.
//
// Exit codes:
//   0 ok
//   2 validation failures and refused operations (blocked review/submit, role lock)
//   3 unknown ids and rejected access tokens
//   4 I/O (read/write/path)

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const NOT_FOUND: u8 = 3;
    pub const IO: u8 = 4;
}

use std::fmt;
use std::path::Path;
use std::process::ExitCode;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, Args, CliError, Command};
use sw_algo::distribute_evenly;
use sw_core::{Policy, SurveyId};
use sw_io::{load_dataset, load_policy, IoError, MemoryStore, Store};
use sw_report::{build_model, write_report, ReportError};
use sw_service::{
    DraftRequest, EvaluationMode, ResponseInput, ReviseRequest, ServiceError, SubmitRequest, SurveyService,
    WeightInput,
};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    Validation(String),
    NotFound(String),
    Io(String),
}

impl fmt::Display for MainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MainError::Validation(m) | MainError::NotFound(m) | MainError::Io(m) => f.write_str(m),
        }
    }
}

impl From<IoError> for MainError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::NotFound { .. } => MainError::NotFound(e.to_string()),
            IoError::Json { .. } | IoError::Conflict(_) | IoError::Invalid(_) => MainError::Validation(e.to_string()),
            IoError::Path(_) | IoError::Hash(_) | IoError::Poisoned => MainError::Io(e.to_string()),
        }
    }
}

impl From<ServiceError> for MainError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Store(io) => io.into(),
            ServiceError::NotFound { .. } | ServiceError::InviteRejected { .. } => MainError::NotFound(e.to_string()),
            ServiceError::Validation(_)
            | ServiceError::ReviewBlocked(_)
            | ServiceError::SubmissionBlocked(_)
            | ServiceError::RoleLocked { .. } => MainError::Validation(e.to_string()),
        }
    }
}

impl From<ReportError> for MainError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::Io(io) => io.into(),
            other => MainError::Validation(other.to_string()),
        }
    }
}

impl From<CliError> for MainError {
    fn from(e: CliError) -> Self {
        match e {
            CliError::NotFound(_) => MainError::Io(e.to_string()),
            CliError::NonLocalPath(_) => MainError::Validation(e.to_string()),
        }
    }
}

fn main() -> ExitCode {
    let rc = match parse_cli().map_err(MainError::from).and_then(|args| {
        init_logging(args.verbose);
        run(&args)
    }) {
        Ok(out) => match serde_json::to_string_pretty(&out) {
            Ok(s) => {
                println!("{s}");
                exitcodes::OK
            }
            Err(e) => {
                eprintln!("sw: error: {e}");
                exitcodes::IO
            }
        },
        Err(e) => {
            eprintln!("sw: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc)
}

fn map_error(e: &MainError) -> u8 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::NotFound(_) => NOT_FOUND,
        MainError::Io(_) => IO,
    }
}

/// RUST_LOG applies unless --verbose; the default is warnings only.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: &Args) -> Result<Value, MainError> {
    let policy = match &args.policy {
        Some(p) => load_policy(p)?,
        None => Policy::default(),
    };

    match &args.command {
        Command::Init { dataset } => {
            let ds = load_dataset(dataset)?;
            let (surveys, invites) = (ds.surveys.len(), ds.invites.len());
            MemoryStore::create_file(&args.store, ds)?;
            info!(store = %args.store.display(), "store initialised");
            Ok(json!({ "store": args.store.display().to_string(), "surveys": surveys, "invites": invites }))
        }
        Command::Distribute { count, step } => {
            let d = distribute_evenly(*count, step.unwrap_or(policy.distribution_step));
            Ok(json!({ "weights": d.weights, "residual": d.residual }))
        }
        cmd => {
            let svc = SurveyService::new(MemoryStore::open_file(&args.store)?, policy);
            debug!(store = %args.store.display(), "store opened");
            dispatch(&svc, cmd)
        }
    }
}

fn dispatch(svc: &SurveyService<MemoryStore>, cmd: &Command) -> Result<Value, MainError> {
    match cmd {
        Command::Access { token } => to_json(&svc.access(token)?),
        Command::Summary { session } => to_json(&svc.session_summary(session)?),
        Command::Draft { session, strategy, weights, skip, rating } => {
            let rows: Vec<WeightInput> = match weights {
                Some(p) if !*skip => read_json(p)?,
                _ => Vec::new(),
            };
            let req = DraftRequest {
                strategy_id: strategy
                    .parse()
                    .map_err(|_| MainError::NotFound(format!("strategy not found: {strategy}")))?,
                weights: rows,
                evaluation_mode: if *skip { EvaluationMode::Skipped } else { EvaluationMode::Weighted },
                importance_rating: *rating,
            };
            to_json(&svc.save_draft(session, &req)?)
        }
        Command::Submit { session, ack_incomplete, role } => {
            let req = SubmitRequest { acknowledge_incomplete: *ack_incomplete, role: role.clone() };
            to_json(&svc.submit(session, &req)?)
        }
        Command::Consolidated { session, strategy } => to_json(&svc.consolidated(session, strategy)?),
        Command::Responses { session, strategy } => to_json(&svc.second_iteration_responses(session, strategy)?),
        Command::Revise { session, strategy, responses, mark_reviewed } => {
            let rows: Vec<ResponseInput> = read_json(responses)?;
            let req = ReviseRequest { responses: rows, mark_as_reviewed: *mark_reviewed };
            to_json(&svc.save_second_iteration(session, strategy, &req)?)
        }
        Command::Progress { session } => to_json(&svc.second_iteration_progress(session)?),
        Command::Overview { survey } => to_json(&svc.session_overview(survey)?),
        Command::Export { survey, out } => {
            let overview = svc.session_overview(survey)?;
            let export = svc.export_consolidated(survey)?;
            let id: SurveyId = survey
                .parse()
                .map_err(|_| MainError::NotFound(format!("survey not found: {survey}")))?;
            let entity = svc
                .store()
                .survey(&id)?
                .ok_or_else(|| MainError::NotFound(format!("survey not found: {survey}")))?;
            let indicators = svc.store().indicators()?;
            let model = build_model(&entity, &overview, &export, &indicators, chrono::Utc::now())?;
            let (path, sha256) = write_report(out, &model)?;
            Ok(json!({ "path": path.display().to_string(), "sha256": sha256 }))
        }
        Command::Init { .. } | Command::Distribute { .. } => {
            Err(MainError::Validation("command does not use the store".into()))
        }
    }
}

fn to_json<T: Serialize>(v: &T) -> Result<Value, MainError> {
    serde_json::to_value(v).map_err(|e| MainError::Io(format!("encode output: {e}")))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, MainError> {
    let bytes = std::fs::read(path).map_err(|e| MainError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| MainError::Validation(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_exit_codes() {
        let code = |e: ServiceError| map_error(&MainError::from(e));
        assert_eq!(code(ServiceError::Validation("x".into())), exitcodes::VALIDATION);
        assert_eq!(code(ServiceError::RoleLocked { current: "a".into() }), exitcodes::VALIDATION);
        assert_eq!(
            code(ServiceError::NotFound { kind: "session", id: "s".into() }),
            exitcodes::NOT_FOUND
        );
        assert_eq!(code(ServiceError::InviteRejected { reason: "expired".into() }), exitcodes::NOT_FOUND);
        assert_eq!(code(ServiceError::Store(IoError::Path("disk".into()))), exitcodes::IO);
        assert_eq!(code(ServiceError::Store(IoError::Conflict("dup".into()))), exitcodes::VALIDATION);
    }
}
