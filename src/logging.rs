//! Leveled logging setup and redaction of diagnostics before they are logged.

use std::fs::OpenOptions;

use log::{warn, LevelFilter};

use crate::config::{AppPaths, Config};
use crate::storage;

/// Maps the configured verbosity onto a filter; unknown values mean `info`.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Installs the global logger. `RUST_LOG` overrides the configured level.
/// With `log_to_file`, records are appended to `app.log` in the data
/// directory instead of stderr. Calling this twice is a no-op.
pub fn init(config: &Config, paths: &AppPaths) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_filter(&config.log_level))
        .parse_default_env()
        .format_timestamp_millis();

    let mut file_error = None;
    if config.log_to_file {
        let opened = storage::ensure_private_dir(&paths.data_dir)
            .map_err(|err| err.to_string())
            .and_then(|()| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&paths.log_file)
                    .map_err(|err| err.to_string())
            });
        match opened {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(err) => file_error = Some(err),
        }
    }

    let _ = builder.try_init();

    if let Some(err) = file_error {
        warn!(
            "Could not open log file {}; logging to stderr: {}",
            paths.log_file.display(),
            err
        );
    }
}

const REDACTED: &str = "<redacted>";
const MAX_DETAIL_CHARS: usize = 180;

/// YouTrack permanent tokens start with `perm:` (older servers) or `perm-`.
fn is_permanent_token(word: &str) -> bool {
    let lowered = word.to_ascii_lowercase();
    lowered.starts_with("perm:") || lowered.starts_with("perm-")
}

/// Words after which the next word is a credential value.
fn precedes_secret(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "bearer" | "authorization:" | "token:" | "password:"
    )
}

/// `token=...` style assignments; returns the kept `key=` prefix.
fn inline_secret_key(word: &str) -> Option<&str> {
    let (key, value) = word.split_once('=')?;
    let sensitive = matches!(
        key.to_ascii_lowercase().as_str(),
        "token" | "access_token" | "password" | "authorization"
    );
    (sensitive && !value.is_empty()).then_some(key)
}

/// Prepares a diagnostic for the log: collapses whitespace, masks bearer
/// values and permanent tokens, and caps the length.
pub fn redact_log_details(value: &str) -> String {
    let mut redacted: Vec<String> = Vec::new();
    let mut mask_next = false;
    for word in value.split_whitespace() {
        let keyword = precedes_secret(word);
        redacted.push(if keyword {
            word.to_string()
        } else if let Some(key) = inline_secret_key(word) {
            format!("{key}={REDACTED}")
        } else if mask_next || is_permanent_token(word) {
            REDACTED.to_string()
        } else {
            word.to_string()
        });
        mask_next = keyword;
    }

    let joined = redacted.join(" ");
    if joined.chars().count() <= MAX_DETAIL_CHARS {
        return joined;
    }
    let mut truncated: String = joined.chars().take(MAX_DETAIL_CHARS - 1).collect();
    truncated.push('…');
    truncated
}
