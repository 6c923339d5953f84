// crates/sw_cli/src/args.rs
//
// Argument surface for `sw`. Global flags select the store file, an optional
// policy file and verbosity; one subcommand per service operation.
//
// Rules checked here (before any store is opened):
// - No networked paths (reject any scheme:// like http/https/file)
// - `draft` needs exactly one of --weights FILE or --skip
// - `distribute --step` must be a positive number

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "sw",
    disable_help_subcommand = true,
    about = "Offline operator CLI for the survey weighting engine"
)]
pub struct Args {
    /// Store file (canonical JSON). Created by `init`.
    #[arg(long, global = true, default_value = "sw-store.json")]
    pub store: PathBuf,

    /// Policy JSON; missing fields take the defaults.
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Debug logging on stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create the store from a seed dataset.
    Init {
        #[arg(long)]
        dataset: PathBuf,
    },
    /// Open or resume the session bound to an access token.
    Access {
        #[arg(long)]
        token: String,
    },
    /// First-iteration session summary.
    Summary {
        #[arg(long)]
        session: String,
    },
    /// Save a strategy draft from a JSON array of {indicator_id, weight, threshold}.
    Draft {
        #[arg(long)]
        session: String,
        #[arg(long)]
        strategy: String,
        #[arg(long, required_unless_present = "skip", conflicts_with = "skip")]
        weights: Option<PathBuf>,
        /// Mark the strategy as outside the respondent's expertise.
        #[arg(long)]
        skip: bool,
        #[arg(long)]
        rating: Option<u8>,
    },
    Submit {
        #[arg(long)]
        session: String,
        /// Submit even with incomplete strategies.
        #[arg(long)]
        ack_incomplete: bool,
        #[arg(long)]
        role: Option<String>,
    },
    /// Group view of a strategy (caller's own weights left out of the lists).
    Consolidated {
        #[arg(long)]
        session: String,
        #[arg(long)]
        strategy: String,
    },
    /// Second-iteration rows for a strategy.
    Responses {
        #[arg(long)]
        session: String,
        #[arg(long)]
        strategy: String,
    },
    /// Save second-iteration rows from a JSON array of {indicator_id, weight, threshold, excluded}.
    Revise {
        #[arg(long)]
        session: String,
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        responses: PathBuf,
        #[arg(long)]
        mark_reviewed: bool,
    },
    /// Second-iteration progress.
    Progress {
        #[arg(long)]
        session: String,
    },
    Overview {
        #[arg(long)]
        survey: String,
    },
    /// Write <out>/report.json for a survey.
    Export {
        #[arg(long)]
        survey: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Preview an even distribution over N indicators.
    Distribute {
        #[arg(long)]
        count: usize,
        #[arg(long, value_parser = parse_step)]
        step: Option<f64>,
    },
}

/// Errors surfaced by argument validation.
/// Keep messages short/stable (handy for scripts/tests).
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Positive, finite granularity.
pub fn parse_step(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|_| format!("not a number: {s}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err("step must be a positive number".into())
    }
}

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(CliError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}

/// Input files that must exist before the command runs.
fn input_files(args: &Args) -> Vec<&Path> {
    let mut v: Vec<&Path> = args.policy.iter().map(PathBuf::as_path).collect();
    match &args.command {
        Command::Init { dataset } => v.push(dataset),
        Command::Draft { weights: Some(w), .. } => v.push(w),
        Command::Revise { responses, .. } => v.push(responses),
        _ => {}
    }
    v
}

/// Parse from the process arguments and run the local checks.
/// Usage errors and `--help` exit through clap (usage errors with code 2).
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    validate(&args)?;
    Ok(args)
}

pub fn validate(args: &Args) -> Result<(), CliError> {
    ensure_local_path(&args.store)?;
    if let Command::Export { out, .. } = &args.command {
        ensure_local_path(out)?;
    }
    for p in input_files(args) {
        ensure_local_path(p)?;
        if !p.is_file() {
            return Err(CliError::NotFound(p.display().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("sw").chain(argv.iter().copied()))
    }

    #[test]
    fn global_flags_after_subcommand() {
        let a = parse(&["summary", "--session", "s1", "--store", "x.json", "-v"]).unwrap();
        assert_eq!(a.store, PathBuf::from("x.json"));
        assert!(a.verbose);
        assert!(matches!(a.command, Command::Summary { ref session } if session == "s1"));
    }

    #[test]
    fn draft_needs_weights_or_skip_but_not_both() {
        assert!(parse(&["draft", "--session", "s", "--strategy", "st"]).is_err());
        assert!(parse(&["draft", "--session", "s", "--strategy", "st", "--skip", "--weights", "w.json"]).is_err());
        assert!(parse(&["draft", "--session", "s", "--strategy", "st", "--skip"]).is_ok());
    }

    #[test]
    fn step_must_be_positive() {
        assert!(parse_step("5").is_ok());
        assert!(parse_step("0").is_err());
        assert!(parse_step("-1").is_err());
        assert!(parse_step("abc").is_err());
    }

    #[test]
    fn remote_paths_are_rejected() {
        let a = parse(&["init", "--dataset", "https://example.org/seed.json"]).unwrap();
        assert!(matches!(validate(&a), Err(CliError::NonLocalPath(_))));
        let a = parse(&["init", "--dataset", "/definitely/missing/seed.json"]).unwrap();
        assert!(matches!(validate(&a), Err(CliError::NotFound(_))));
    }
}
