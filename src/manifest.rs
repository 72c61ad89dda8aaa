//! Sweep manifest persisted as `runs.json` under the output root.
//!
//! The manifest records what a sweep attempted and how each run ended, so a
//! later `summarize` invocation can rebuild the report without re-walking
//! the directory tree or re-deriving parameter tokens.

use crate::error::Result;
use crate::params::Params;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "runs.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Already complete before this sweep started
    Skipped,
    Failed,
}

impl RunOutcome {
    /// Whether result files exist for this run.
    pub fn has_results(self) -> bool {
        matches!(self, RunOutcome::Completed | RunOutcome::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub token: String,
    pub params: Params,
    pub dir: PathBuf,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub dataset: String,
    pub runs: Vec<RunRecord>,
}

impl Manifest {
    pub fn new(dataset: impl Into<String>) -> Self {
        Manifest {
            dataset: dataset.into(),
            runs: Vec::new(),
        }
    }

    pub fn record(&mut self, record: RunRecord) {
        self.runs.push(record);
    }

    /// Runs whose result files should feed the summary.
    pub fn summarizable(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter().filter(|r| r.outcome.has_results())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs
            .iter()
            .filter(|r| r.outcome == RunOutcome::Failed)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Manifest> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> Manifest {
        let mut manifest = Manifest::new("blanchette");
        let ok = Params::builder().min_chain_length(4).build();
        manifest.record(RunRecord {
            token: ok.to_string(),
            params: ok,
            dir: PathBuf::from("out/blanchette_mc4"),
            outcome: RunOutcome::Completed,
            error: None,
        });
        let bad = Params::builder().subtree_size(3).build();
        manifest.record(RunRecord {
            token: bad.to_string(),
            params: bad,
            dir: PathBuf::from("out/blanchette_st3"),
            outcome: RunOutcome::Failed,
            error: Some("workflow did not complete".to_string()),
        });
        manifest
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let manifest = sample();
        manifest.write(&path).unwrap();

        let back = Manifest::read(&path).unwrap();
        assert_eq!(back.dataset, "blanchette");
        assert_eq!(back.runs.len(), 2);
        assert_eq!(back.runs[0].token, "_mc4");
        assert_eq!(back.runs[0].params, manifest.runs[0].params);
        assert_eq!(back.runs[1].outcome, RunOutcome::Failed);
    }

    #[test]
    fn only_runs_with_results_are_summarizable() {
        let manifest = sample();
        let tokens: Vec<&str> = manifest.summarizable().map(|r| r.token.as_str()).collect();
        assert_eq!(tokens, ["_mc4"]);
        assert_eq!(manifest.failed().count(), 1);
    }

    #[test]
    fn failure_reason_survives_serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("workflow did not complete"));
        assert!(json.contains(r#""outcome": "failed""#) || json.contains(r#""outcome":"failed""#));
    }
}
