//! JSON snapshot files for propositions and requests.
//!
//! Snapshots are written to a sibling `.tmp` file first and then renamed over
//! the target, so an interrupted write never leaves a truncated proposition.

use anyhow::{anyhow, Result};
use deliberatorium_core::Proposition;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read and parse a JSON file. `-` reads stdin.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?
    };
    serde_json::from_str(&text).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

pub fn load_proposition(path: &Path) -> Result<Proposition> {
    load_json(path)
}

pub fn save_proposition(path: &Path, proposition: &Proposition) -> Result<()> {
    let json = serde_json::to_string_pretty(&proposition.snapshot()?)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, format!("{json}\n"))
        .map_err(|e| anyhow!("failed to write {}: {e}", tmp.display()))?;
    fs::rename(&tmp, path)
        .map_err(|e| anyhow!("failed to replace {}: {e}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliberatorium_core::{CreatePropositionRequest, EvidenceSubmission, JudgingModel};

    fn sample() -> Proposition {
        let mut proposition = CreatePropositionRequest::new("Will it snow?", &["yes", "no"])
            .into_proposition(vec![JudgingModel::new("scripted", "v1")])
            .unwrap();
        let ids = proposition
            .attach_evidence(vec![EvidenceSubmission::new("cold front", "u1", "reddit")])
            .unwrap();
        proposition.record_classification(ids[0], "YES");
        proposition.aggregate().unwrap();
        proposition
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/prop.json");
        let proposition = sample();

        save_proposition(&path, &proposition).unwrap();
        let loaded = load_proposition(&path).unwrap();

        assert_eq!(loaded, proposition);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.json");
        fs::write(&path, "stale").unwrap();

        save_proposition(&path, &sample()).unwrap();

        assert!(load_proposition(&path).is_ok());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_proposition(&path).unwrap_err().to_string();

        assert!(err.contains("failed to parse"));
        assert!(err.contains("broken.json"));
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        assert_eq!(
            tmp_path(Path::new("/data/prop.json")),
            PathBuf::from("/data/prop.json.tmp")
        );
    }
}
