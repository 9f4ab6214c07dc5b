//! Configuration and command-line argument parsing

use std::env;

use crate::matcher::{MatchPolicy, MAX_TYPO_EDITS, PHONETIC_CODE_TOLERANCE};
use crate::trackfile::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Input
    /// Telemetry feed file, `-` for stdin
    pub feed: Option<String>,

    // Tracking
    pub history: usize,

    // Matching
    pub typo_edits: usize,
    pub phonetic_tolerance: usize,

    // Output
    /// Seconds between contact reports, 0 to disable
    pub report_interval: u64,
    pub verbose: bool,
    pub stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: None,
            history: DEFAULT_HISTORY_CAPACITY,
            typo_edits: MAX_TYPO_EDITS,
            phonetic_tolerance: PHONETIC_CODE_TOLERANCE,
            report_interval: 30,
            verbose: false,
            stats: false,
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Config),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value for {option}: {value}")]
    InvalidValue { option: String, value: String },
}

impl Config {
    /// Parse the process arguments, printing help or an error and exiting
    /// when they do not describe a run.
    pub fn from_args() -> Self {
        match Self::parse(env::args().skip(1)) {
            Ok(Command::Run(config)) => config,
            Ok(Command::Help) => {
                print_help();
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("{}", e);
                print_help();
                std::process::exit(1);
            }
        }
    }

    /// Parse arguments, not including the program name
    pub fn parse<I>(args: I) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--feed" => config.feed = Some(value(&arg, args.next())?),
                "--history" => config.history = parsed(&arg, args.next())?,
                "--typo-edits" => config.typo_edits = parsed(&arg, args.next())?,
                "--phonetic-tolerance" => config.phonetic_tolerance = parsed(&arg, args.next())?,
                "--report-interval" => config.report_interval = parsed(&arg, args.next())?,
                "--verbose" | "-v" => config.verbose = true,
                "--stats" => config.stats = true,
                "--help" | "-h" => return Ok(Command::Help),
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }

        Ok(Command::Run(config))
    }

    /// Matching policy with the configured tolerances
    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            max_typo_edits: self.typo_edits,
            phonetic_code_tolerance: self.phonetic_tolerance,
            ..MatchPolicy::default()
        }
    }

    /// Whether stdin is free to carry callsign queries
    pub fn interactive(&self) -> bool {
        self.feed.as_deref() != Some("-")
    }
}

fn value(option: &str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(option.to_string()))
}

fn parsed<T: std::str::FromStr>(option: &str, raw: Option<String>) -> Result<T, ConfigError> {
    let raw = value(option, raw)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        option: option.to_string(),
        value: raw,
    })
}

fn print_help() {
    println!(
        r#"radar-contacts - live contact tracking with spoken callsign lookup

Usage: radar-contacts [OPTIONS]

Reads telemetry events from --feed and resolves callsign queries typed on
stdin as "<coalition> <phrase>", e.g. "blue houston one one". Type "list" to
print every contact, "quit" to exit.

Options:
  --feed <file>               JSON-lines telemetry feed ('-' for stdin, disables queries)
  --history <N>               Samples kept per contact (default: 8)
  --typo-edits <N>            Single-character edits tolerated per word (default: 1)
  --phonetic-tolerance <N>    Sound classes a heard word may drop or add (default: 1)
  --report-interval <s>       Seconds between contact reports, 0 disables (default: 30)
  --stats                     Print ingestion stats at exit
  --verbose, -v               Debug logging
  --help, -h                  Show this help
"#
    );
}
