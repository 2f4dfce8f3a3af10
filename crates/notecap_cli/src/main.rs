//! Command-line entry point for notecap.
//!
//! # Responsibility
//! - Map subcommands onto `notecap_core::NoteService` calls.
//! - Print results as JSON on stdout and failures on stderr.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use notecap_core::config::env_vars;
use notecap_core::{
    init_logging, CaptureRequest, ConfigError, CoreConfig, ImportMode, Modality, NoteFilter,
    NoteService, NoteServiceError, NoteStore, NoteType,
};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "notecap")]
#[command(about = "Capture, classify, query and back up notes")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

/// Storage and logging overrides.
///
/// Values stay raw here; defaults and parsing belong to `CoreConfig`.
#[derive(Args, Debug)]
struct Settings {
    /// Directory holding the note store [default: .data]
    #[arg(long, env = "NOTECAP_DATA_DIR")]
    data_dir: Option<String>,

    /// Storage backend: json or sqlite [default: json]
    #[arg(long, env = "NOTECAP_BACKEND")]
    backend: Option<String>,

    /// Maximum notes accepted by one import [default: 5000]
    #[arg(long, env = "NOTECAP_IMPORT_LIMIT")]
    import_limit: Option<String>,

    /// Log level for the file logger
    #[arg(long, env = "NOTECAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, env = "NOTECAP_LOG_DIR")]
    log_dir: Option<String>,
}

impl Settings {
    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            env_vars::DATA_DIR => &self.data_dir,
            env_vars::BACKEND => &self.backend,
            env_vars::IMPORT_LIMIT => &self.import_limit,
            env_vars::LOG_LEVEL => &self.log_level,
            env_vars::LOG_DIR => &self.log_dir,
            _ => return None,
        };
        value.clone()
    }
}

#[derive(Debug)]
enum CliError {
    /// Input text could not be read from a file or stdin.
    Read {
        source_name: String,
        source: std::io::Error,
    },
    Service(NoteServiceError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Service(NoteServiceError::NoteNotFound(_)) => ExitCode::from(4),
            Self::Service(err) if err.is_validation() => ExitCode::from(2),
            Self::Read { .. } | Self::Service(_) => ExitCode::FAILURE,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read {
                source_name,
                source,
            } => write!(f, "failed to read {source_name}: {source}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Service(err) => Some(err),
        }
    }
}

impl From<NoteServiceError> for CliError {
    fn from(value: NoteServiceError) -> Self {
        Self::Service(value)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify and store a note; reads stdin when no content is given
    Capture {
        content: Option<String>,
        #[arg(long, value_parser = parse_modality)]
        modality: Option<Modality>,
    },
    /// List notes matching every given filter
    List {
        #[arg(long = "type", value_parser = parse_note_type)]
        kind: Option<NoteType>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(short, long)]
        q: Option<String>,
        /// RFC 3339 timestamp or YYYY-MM-DD (start of day)
        #[arg(long, value_parser = parse_lower_bound)]
        from: Option<DateTime<Utc>>,
        /// RFC 3339 timestamp or YYYY-MM-DD (end of day)
        #[arg(long, value_parser = parse_upper_bound)]
        to: Option<DateTime<Utc>>,
    },
    /// Add a user tag to a note
    Tag { id: String, tag: String },
    /// Delete a note
    Delete { id: String },
    /// Print collection statistics
    Stats,
    /// Print a backup envelope
    Export,
    /// Import a backup envelope from a file or stdin
    Import {
        file: Option<PathBuf>,
        #[arg(long, default_value = "merge", value_parser = parse_import_mode)]
        mode: ImportMode,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli.settings) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Some(log_dir) = config.log_dir.as_ref() {
        let log_dir = std::path::absolute(log_dir).unwrap_or_else(|_| log_dir.clone());
        if let Err(err) = init_logging(&config.log_level, &log_dir) {
            eprintln!("warning: {err}");
        }
    }

    let service = match config.open_service() {
        Ok(service) => service,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&service, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn build_config(settings: &Settings) -> Result<CoreConfig, ConfigError> {
    CoreConfig::from_lookup(|key| settings.lookup(key))
}

fn run<S: NoteStore>(service: &NoteService<S>, command: Command) -> Result<String, CliError> {
    let value = match command {
        Command::Capture { content, modality } => {
            let content = match content {
                Some(content) => content,
                None => read_input(None)?,
            };
            let note = service.capture(CaptureRequest { content, modality })?;
            json!({ "note": note })
        }
        Command::List {
            kind,
            tag,
            q,
            from,
            to,
        } => {
            let filter = NoteFilter {
                kind,
                tag,
                query: q,
                from,
                to,
            };
            json!({ "notes": service.list_notes(&filter) })
        }
        Command::Tag { id, tag } => json!({ "note": service.tag_note(&id, &tag)? }),
        Command::Delete { id } => {
            service.delete_note(&id)?;
            json!({ "ok": true })
        }
        Command::Stats => json!({ "stats": service.stats() }),
        Command::Export => json!(service.export_backup()),
        Command::Import { file, mode } => {
            let raw = read_input(file.as_deref())?;
            let outcome = service.import_backup_str(&raw, mode)?;
            json!({ "ok": true, "count": outcome.count, "mode": outcome.mode })
        }
    };

    Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
}

/// Reads `path`, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    let result = match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        }
    };
    result.map_err(|source| CliError::Read {
        source_name: path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string()),
        source,
    })
}

fn parse_modality(value: &str) -> Result<Modality, String> {
    value.parse()
}

fn parse_note_type(value: &str) -> Result<NoteType, String> {
    value.parse()
}

fn parse_import_mode(value: &str) -> Result<ImportMode, String> {
    value.parse()
}

fn parse_lower_bound(value: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(value, false)
}

fn parse_upper_bound(value: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(value, true)
}

fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("`{value}` is neither RFC 3339 nor YYYY-MM-DD"))?;
    let time = if end_of_day {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|naive| naive.and_utc())
        .ok_or_else(|| format!("`{value}` is out of range"))
}

#[cfg(test)]
mod tests {
    use super::{build_config, parse_bound, run, Cli, CliError, Command};
    use clap::Parser;
    use notecap_core::{
        ImportMode, MemoryStore, NoteRepository, NoteService, NoteServiceError, StorageBackend,
    };
    use std::path::PathBuf;

    #[test]
    fn date_bounds_expand_to_whole_days() {
        let from = parse_bound("2024-02-03", false).unwrap();
        let to = parse_bound("2024-02-03", true).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-02-03T00:00:00+00:00");
        assert!(to > from);
        assert_eq!(to.date_naive(), from.date_naive());
        assert!(parse_bound("yesterday", false).is_err());
    }

    #[test]
    fn cli_parses_list_filters() {
        let cli = Cli::try_parse_from([
            "notecap", "list", "--type", "idea", "--tag", "work", "-q", "plan",
        ])
        .unwrap();
        match cli.command {
            Command::List { kind, tag, q, .. } => {
                assert_eq!(kind.map(|k| k.as_str()), Some("idea"));
                assert_eq!(tag.as_deref(), Some("work"));
                assert_eq!(q.as_deref(), Some("plan"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_capture_then_stats() {
        let service = NoteService::new(NoteRepository::new(MemoryStore::new()));
        let output = run(
            &service,
            Command::Capture {
                content: Some("hello world".to_string()),
                modality: None,
            },
        )
        .unwrap();
        assert!(output.contains("\"note\""));

        let stats = run(&service, Command::Stats).unwrap();
        let value: serde_json::Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(value["stats"]["total"], 1);
        assert_eq!(value["stats"]["byType"]["standard"], 1);
    }

    #[test]
    fn flags_flow_through_core_config() {
        let cli = Cli::try_parse_from([
            "notecap",
            "--data-dir",
            "/tmp/notecap-flags",
            "--backend",
            "SQLite",
            "--import-limit",
            "7",
            "stats",
        ])
        .unwrap();
        let config = build_config(&cli.settings).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notecap-flags"));
        assert_eq!(config.backend, StorageBackend::Sqlite);
        assert_eq!(config.import_limit, 7);

        let bad = Cli::try_parse_from(["notecap", "--import-limit", "lots", "stats"]).unwrap();
        assert!(build_config(&bad.settings).is_err());
    }

    #[test]
    fn unreadable_input_is_a_read_error() {
        let service = NoteService::new(NoteRepository::new(MemoryStore::new()));
        let dir = tempfile::tempdir().unwrap();

        let err = run(
            &service,
            Command::Import {
                file: Some(dir.path().join("missing.json")),
                mode: ImportMode::Merge,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
        assert!(err.to_string().starts_with("failed to read "));
    }

    #[test]
    fn service_errors_keep_their_kind() {
        let service = NoteService::new(NoteRepository::new(MemoryStore::new()));
        let err = run(
            &service,
            Command::Tag {
                id: "nope".to_string(),
                tag: "x".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Service(NoteServiceError::NoteNotFound(_))
        ));
    }
}
