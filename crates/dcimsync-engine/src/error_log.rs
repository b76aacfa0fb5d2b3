//! Append-only per-item error logs.

use std::error::Error as StdError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use dcimsync_core::timestamp;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/:\s]+").expect("Invalid separator regex"));

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z._-]").expect("Invalid file name regex"));

static PLAIN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z.-]+(/[0-9A-Za-z.-]+)*$").expect("Invalid plain path regex")
});

/// Flatten a relative path into a single safe file name.
///
/// A path whose segments hold only `[0-9A-Za-z.-]` maps to the segments
/// joined by `_`. Any other path also gets `+` and a hash of the raw path,
/// so two paths never share a log file.
pub fn sanitize_name(relative_path: &str) -> String {
    let joined = SEPARATORS.replace_all(relative_path, "_");
    let name = UNSAFE_CHARS.replace_all(&joined, "_").into_owned();
    if PLAIN_PATH.is_match(relative_path) {
        name
    } else {
        format!("{name}+{:016x}", path_hash(relative_path))
    }
}

/// FNV-1a, stable across builds.
fn path_hash(path: &str) -> u64 {
    path.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Writes one log file per definition under a logs directory.
///
/// Each record is `[timestamp] message`, then the error when its text is not
/// already part of the message, then its causes, then a blank line. Writing
/// is best-effort.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    dir: PathBuf,
}

impl ErrorLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, relative_path: &str) -> PathBuf {
        self.dir.join(format!("{}.log", sanitize_name(relative_path)))
    }

    pub fn record(&self, relative_path: &str, message: &str, error: Option<&(dyn StdError + 'static)>) {
        let path = self.path_for(relative_path);
        if let Err(e) = self.append(&path, &render(message, error)) {
            warn!(path = %path.display(), error = %e, "Failed to write error log");
        }
    }

    fn append(&self, path: &Path, record: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(record.as_bytes())
    }
}

fn render(message: &str, error: Option<&(dyn StdError + 'static)>) -> String {
    let mut record = format!("[{}] {message}\n", timestamp());
    if let Some(error) = error {
        let text = error.to_string();
        if !message.contains(&text) {
            record.push_str(&format!("Error: {text}\n"));
        }
        let mut cause = error.source();
        while let Some(inner) = cause {
            record.push_str(&format!("Caused by: {inner}\n"));
            cause = inner.source();
        }
    }
    record.push('\n');
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use dcimsync_core::EntityKind;
    use dcimsync_inventory::{Endpoint, InventoryError};
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Cisco/nim-4fxs.yaml"), "Cisco_nim-4fxs.yaml");

        let spaced = sanitize_name("Cisco/nim 1ge.yaml");
        assert!(spaced.starts_with("Cisco_nim_1ge.yaml+"));
        assert_eq!(spaced.len(), "Cisco_nim_1ge.yaml+".len() + 16);
        assert_eq!(spaced, sanitize_name("Cisco/nim 1ge.yaml"));
        assert!(sanitize_name("A&B\\x:y.yml").starts_with("A_B_x_y.yml+"));
    }

    #[test]
    fn test_lossy_names_stay_distinct() {
        let names = [
            sanitize_name("Cisco/a_b.yaml"),
            sanitize_name("Cisco_a/b.yaml"),
            sanitize_name("Cisco/a/b.yaml"),
            sanitize_name("Cisco/a b.yaml"),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(names[2], "Cisco_a_b.yaml");

        let dir = TempDir::new().unwrap();
        let log = ErrorLog::new(dir.path());
        log.record("Cisco/a_b.yaml", "first", None);
        log.record("Cisco_a/b.yaml", "second", None);
        let first = fs::read_to_string(log.path_for("Cisco/a_b.yaml")).unwrap();
        assert!(first.contains("] first"));
        assert!(!first.contains("second"));
    }

    #[test]
    fn test_error_line_omitted_when_message_repeats_it() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::new(dir.path());
        let err = ReconcileError::write(
            Endpoint::Entity(EntityKind::ModuleType),
            InventoryError::rejected("dcim/module-types", 400, "bad slug"),
        );
        let message = err.to_string();
        log.record("Cisco/a.yaml", &message, Some(&err as &(dyn StdError + 'static)));

        let contents = fs::read_to_string(log.path_for("Cisco/a.yaml")).unwrap();
        assert!(!contents.contains("Error: "));
        assert_eq!(contents.matches("Caused by: ").count(), 1);
        assert_eq!(contents.matches("bad slug").count(), 2);
    }

    #[test]
    fn test_records_append_with_causes() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::new(dir.path().join("logs"));

        log.record("Cisco/a.yaml", "Empty YAML file", None);
        let err = ReconcileError::write(
            Endpoint::Entity(EntityKind::DeviceType),
            InventoryError::rejected("dcim/device-types", 400, "slug exists"),
        );
        log.record("Cisco/a.yaml", "Failed to create", Some(&err as &(dyn StdError + 'static)));

        let contents = fs::read_to_string(log.path_for("Cisco/a.yaml")).unwrap();
        let records: Vec<&str> = contents.split("\n\n").filter(|r| !r.is_empty()).collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].starts_with('['));
        assert!(records[0].ends_with("] Empty YAML file"));
        assert!(records[1].contains("Error: Write to dcim/device-types failed"));
        assert!(records[1].contains("Caused by: Rejected by dcim/device-types (HTTP 400): slug exists"));
    }
}
