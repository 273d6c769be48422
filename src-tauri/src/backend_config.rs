use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{errors::ConfigDegraded, runtime_paths};

pub const BACKEND_TIMEOUT_ENV: &str = "CONVERTAPK_BACKEND_TIMEOUT_MS";
pub const STARTUP_READY_TIMEOUT_MS: u64 = 45_000;
pub const STARTUP_READY_TIMEOUT_MIN_MS: u64 = 1_000;
pub const STARTUP_READY_TIMEOUT_MAX_MS: u64 = 10 * 60 * 1000;

pub fn read_configured_data_root<F>(path: &Path, cwd: &Path, mut log: F) -> Option<PathBuf>
where
    F: FnMut(ConfigDegraded),
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
        Err(source) => {
            log(ConfigDegraded::Unreadable {
                path: path.to_path_buf(),
                source,
            });
            return None;
        }
    };
    configured_data_root_from_bytes(path, &bytes, cwd, &mut log)
}

fn configured_data_root_from_bytes<F>(
    path: &Path,
    bytes: &[u8],
    cwd: &Path,
    log: &mut F,
) -> Option<PathBuf>
where
    F: FnMut(ConfigDegraded),
{
    let document: Value = match serde_json::from_slice(bytes) {
        Ok(document) => document,
        Err(error) => {
            log(ConfigDegraded::Unparseable {
                path: path.to_path_buf(),
                reason: error.to_string(),
            });
            return None;
        }
    };
    match document.get("data_root") {
        Some(Value::String(raw)) => {
            let resolved = runtime_paths::resolve_against(raw, cwd);
            if resolved.is_none() {
                log(ConfigDegraded::BackendConfigIgnored {
                    path: path.to_path_buf(),
                });
            }
            resolved
        }
        Some(_) => {
            log(ConfigDegraded::BackendConfigIgnored {
                path: path.to_path_buf(),
            });
            None
        }
        None => None,
    }
}

pub fn parse_clamped_timeout_env<F>(
    raw: &str,
    env_name: &str,
    fallback_ms: u64,
    min_ms: u64,
    max_ms: u64,
    mut log: F,
) -> u64
where
    F: FnMut(String),
{
    match raw.trim().parse::<u128>() {
        Ok(parsed) if parsed > 0 => {
            if parsed < min_ms as u128 {
                log(format!(
                    "{}='{}' is below minimum {}ms, clamped to {}ms",
                    env_name, raw, min_ms, min_ms
                ));
                min_ms
            } else if parsed > max_ms as u128 {
                log(format!(
                    "{}='{}' is above maximum {}ms, clamped to {}ms",
                    env_name, raw, max_ms, max_ms
                ));
                max_ms
            } else {
                parsed as u64
            }
        }
        _ => {
            log(format!(
                "invalid {}='{}', fallback to {}ms",
                env_name, raw, fallback_ms
            ));
            fallback_ms
        }
    }
}

pub fn resolve_startup_timeout_ms<F>(raw_override: Option<&str>, log: F) -> u64
where
    F: FnMut(String),
{
    match raw_override {
        Some(raw) => parse_clamped_timeout_env(
            raw,
            BACKEND_TIMEOUT_ENV,
            STARTUP_READY_TIMEOUT_MS,
            STARTUP_READY_TIMEOUT_MIN_MS,
            STARTUP_READY_TIMEOUT_MAX_MS,
            log,
        ),
        None => STARTUP_READY_TIMEOUT_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8]) -> (Option<PathBuf>, Vec<String>) {
        let mut issues = Vec::new();
        let resolved = configured_data_root_from_bytes(
            Path::new("config.json"),
            bytes,
            Path::new("/work"),
            &mut |issue: ConfigDegraded| issues.push(issue.to_string()),
        );
        (resolved, issues)
    }

    #[test]
    fn data_root_relative_path_resolves_against_cwd() {
        let (resolved, issues) = collect(br#"{"data_root": "builds"}"#);
        assert_eq!(resolved, Some(Path::new("/work").join("builds")));
        assert!(issues.is_empty());
    }

    #[test]
    fn data_root_ignored_for_invalid_json() {
        let (resolved, issues) = collect(b"{not json");
        assert_eq!(resolved, None);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("ignoring"));
    }

    #[test]
    fn data_root_ignored_when_blank_or_not_a_string() {
        assert_eq!(collect(br#"{"data_root": "   "}"#).0, None);
        assert_eq!(collect(br#"{"data_root": 42}"#).0, None);
        let (resolved, issues) = collect(br#"{"other": true}"#);
        assert_eq!(resolved, None);
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_backend_config_is_silent() {
        let mut issues = 0;
        let resolved = read_configured_data_root(
            Path::new("/definitely/not/here/config.json"),
            Path::new("/work"),
            |_| issues += 1,
        );
        assert_eq!(resolved, None);
        assert_eq!(issues, 0);
    }

    #[test]
    fn parse_clamped_timeout_returns_value_in_range() {
        let value = parse_clamped_timeout_env("1200", "TEST_ENV", 500, 100, 5_000, |_| {});
        assert_eq!(value, 1200);
    }

    #[test]
    fn parse_clamped_timeout_clamps_too_small_value() {
        let mut logs = Vec::new();
        let value = parse_clamped_timeout_env("20", "TEST_ENV", 500, 100, 5_000, |message| {
            logs.push(message)
        });
        assert_eq!(value, 100);
        assert!(logs.iter().any(|line| line.contains("below minimum")));
    }

    #[test]
    fn startup_timeout_defaults_and_falls_back() {
        assert_eq!(resolve_startup_timeout_ms(None, |_| {}), STARTUP_READY_TIMEOUT_MS);
        let mut logs = Vec::new();
        let value = resolve_startup_timeout_ms(Some("soon"), |message| logs.push(message));
        assert_eq!(value, STARTUP_READY_TIMEOUT_MS);
        assert!(logs[0].contains("invalid CONVERTAPK_BACKEND_TIMEOUT_MS"));
        assert_eq!(
            resolve_startup_timeout_ms(Some("99999999"), |_| {}),
            STARTUP_READY_TIMEOUT_MAX_MS
        );
    }
}
