//! Discovery of the external workflow executables.
//!
//! The harness never embeds the alignment toolchain; it locates the installed
//! executables and shells out to them.
//!
//! Search order for each tool:
//! 1. An explicit bin-dir override (CLI flag or `CACTUS_BIN_DIR`)
//! 2. Same directory as the current executable
//! 3. System `PATH`

use crate::error::{BenchError, Result};
use std::path::{Path, PathBuf};

/// Project-creation step of the progressive workflow.
pub const CREATE_PROJECT: &str = "cactus_createMultiCactusProject";
/// The progressive alignment driver itself.
pub const PROGRESSIVE: &str = "cactus_progressive";
/// Completion check for the scheduler's job tree.
pub const JOBTREE_STATUS: &str = "jobTreeStatus";
/// Timing/resource statistics dump for the job tree.
pub const JOBTREE_STATS: &str = "jobTreeStats";
/// Converts the simulation's true MFA alignment to MAF.
pub const MFA_TO_MAF: &str = "mfaToMaf";
/// Pairwise homology comparison of two MAF files.
pub const MAF_COMPARATOR: &str = "mafComparator";
/// Merges two comparator result files into one.
pub const MERGE_COMPARATOR_RESULTS: &str = "mergeMafComparatorResults.py";

/// Every tool a full benchmark run needs, in invocation order.
pub const ALL_TOOLS: [&str; 7] = [
    CREATE_PROJECT,
    PROGRESSIVE,
    JOBTREE_STATUS,
    JOBTREE_STATS,
    MFA_TO_MAF,
    MAF_COMPARATOR,
    MERGE_COMPARATOR_RESULTS,
];

/// Resolves external tool paths once, up front.
#[derive(Debug, Clone, Default)]
pub struct Toolbox {
    bin_dir: Option<PathBuf>,
}

impl Toolbox {
    /// Toolbox using the default search order.
    pub fn new() -> Self {
        Toolbox {
            bin_dir: std::env::var_os("CACTUS_BIN_DIR").map(PathBuf::from),
        }
    }

    /// Toolbox that checks `bin_dir` before anything else.
    pub fn with_bin_dir(bin_dir: impl Into<PathBuf>) -> Self {
        Toolbox {
            bin_dir: Some(bin_dir.into()),
        }
    }

    /// Find one tool by name.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        // 1. Explicit override directory
        if let Some(dir) = &self.bin_dir {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        // 2. Same directory as the current executable
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let candidate = exe_dir.join(name);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }

        // 3. System PATH
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }

        Err(BenchError::ToolNotFound(name.to_string()))
    }

    /// Check that every workflow tool is reachable; returns the missing ones.
    pub fn missing_tools(&self) -> Vec<&'static str> {
        ALL_TOOLS
            .iter()
            .copied()
            .filter(|name| self.find(name).is_err())
            .collect()
    }

    /// The override directory, if one is set.
    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }
}
