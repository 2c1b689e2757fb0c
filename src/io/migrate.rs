//! Discovery of legacy JSON-file stores for one-time migration into the
//! primary `SQLite` store.

use std::path::{Path, PathBuf};

/// A legacy file discovered for migration, tagged with the branch name it
/// should be imported into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFile {
    /// Branch the file's contents belong to.
    pub branch: String,
    /// Path to the legacy JSONL file.
    pub path: PathBuf,
}

/// Discovers `memory.json` at `<memory_path>/` or `<memory_path>/.memory/`
/// (imported into `main`), and any `<branch>.json` under `.memory/`
/// excluding `memory.json` and dotfiles (imported into `<branch>`).
#[must_use]
pub fn discover_legacy_files(memory_path: &Path) -> Vec<LegacyFile> {
    let mut found = Vec::new();
    let memory_dir = memory_path.join(".memory");

    for candidate in [memory_path.join("memory.json"), memory_dir.join("memory.json")] {
        if candidate.is_file() {
            found.push(LegacyFile {
                branch: crate::models::MAIN_BRANCH.to_string(),
                path: candidate,
            });
        }
    }

    let Ok(entries) = std::fs::read_dir(&memory_dir) else {
        return found;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.starts_with('.') || file_name == "memory.json" {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let branch = file_name.trim_end_matches(".json").to_string();
        found.push(LegacyFile { branch, path });
    }

    found
}

/// Formats a backup/export/migration timestamp per the persistent-layout
/// convention: `YYYY-MM-DDTHH-MM-SS-sssZ` (colons and dots replaced with
/// dashes so the string is filesystem-safe).
#[must_use]
pub fn backup_timestamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_legacy_files_top_level_memory_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.json"), "").unwrap();
        let found = discover_legacy_files(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].branch, "main");
    }

    #[test]
    fn test_discover_legacy_files_branch_files() {
        let dir = tempfile::tempdir().unwrap();
        let memory_dir = dir.path().join(".memory");
        fs::create_dir_all(&memory_dir).unwrap();
        fs::write(memory_dir.join("memory.json"), "").unwrap();
        fs::write(memory_dir.join("feature-x.json"), "").unwrap();
        fs::write(memory_dir.join(".hidden.json"), "").unwrap();

        let found = discover_legacy_files(dir.path());
        let branches: Vec<&str> = found.iter().map(|f| f.branch.as_str()).collect();
        assert!(branches.contains(&"main"));
        assert!(branches.contains(&"feature-x"));
        assert!(!branches.contains(&".hidden"));
    }

    #[test]
    fn test_backup_timestamp_format() {
        use chrono::TimeZone;
        let ts = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let formatted = backup_timestamp(ts);
        assert!(!formatted.contains(':'));
        assert!(formatted.starts_with("2026-01-02T03-04-05"));
        assert!(formatted.ends_with('Z'));
    }
}
