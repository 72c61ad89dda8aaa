//! # progressive-bench: Benchmark Harness for Progressive Genome Alignment
//!
//! This library drives parameter-sweep benchmarks of the progressive
//! alignment workflow over simulated datasets with known true alignments.
//!
//! ## Overview
//!
//! progressive-bench lets you:
//! - Enumerate combinatorial sweeps over workflow configuration knobs
//! - Patch a workflow configuration template per parameter set
//! - Orchestrate the external alignment toolchain through the job-tree
//!   scheduler, one run directory per parameter set and region
//! - Compare predicted alignments against the simulation truth and flatten
//!   the results into a single CSV report
//!
//! ## Example Usage
//!
//! ```no_run
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! use progressive_bench::{Benchmark, Dataset, RunOptions, Sweep, Toolbox};
//! use std::path::Path;
//!
//! let dataset = Dataset::blanchette(Path::new("data/blanchette00"))?;
//! let options = RunOptions::new("out", "config.xml").max_jobs(8);
//! let benchmark = Benchmark::new(options, Toolbox::new())?;
//!
//! let report = benchmark.run_sweep(&Sweep::basic_progressive(), &dataset)?;
//! println!("{} run(s) summarized", report.summary.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is structured in several modules:
//! - `params`: per-run parameter sets and their name tokens
//! - `sweep`: combinatorial parameter enumeration with presets
//! - `config_patch`: XML configuration template patching
//! - `experiment`: experiment file generation and database stanzas
//! - `dataset`: simulated benchmark inputs (Blanchette layout)
//! - `naming`: sequence renaming between truth and workflow MAFs
//! - `tools`: external tool discovery
//! - `pipeline`: per-run workflow orchestration
//! - `manifest`: sweep manifest (`runs.json`)
//! - `summary`: CSV report over per-run result files
//! - `error`: error types for the library

pub mod config_patch;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod manifest;
pub mod naming;
pub mod params;
pub mod pipeline;
pub mod summary;
pub mod sweep;
pub mod tools;

use error::Result;
use log::{error, info, warn};
use manifest::{Manifest, RunOutcome, RunRecord, MANIFEST_FILE};

pub use dataset::{Dataset, Region};
pub use error::BenchError;
pub use experiment::{DatabaseConf, Experiment};
pub use naming::NamingMap;
pub use params::{OutgroupStrategy, Params, SingleCopyStrategy};
pub use pipeline::{Pipeline, RunOptions};
pub use summary::Summary;
pub use sweep::Sweep;
pub use tools::Toolbox;

/// What a finished sweep produced.
#[derive(Debug)]
pub struct SweepReport {
    pub manifest: Manifest,
    pub summary: Summary,
    /// Written CSV, absent when no run produced results
    pub summary_path: Option<std::path::PathBuf>,
}

/// Main interface to the benchmark harness.
///
/// Wraps a [`Pipeline`] and drives it over a whole sweep, recording every
/// run in a manifest and summarizing the survivors into a CSV report.
#[derive(Debug)]
pub struct Benchmark {
    pipeline: Pipeline,
}

impl Benchmark {
    /// Creates a new benchmark harness with the given options.
    pub fn new(options: RunOptions, toolbox: Toolbox) -> Result<Self> {
        Ok(Benchmark {
            pipeline: Pipeline::new(options, toolbox)?,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs every parameter set of the sweep over every region of the
    /// dataset.
    ///
    /// Individual run failures are recorded in the manifest and skipped in
    /// the summary; only harness-level problems (unwritable output root,
    /// broken manifest) abort the sweep. The manifest is written to
    /// `runs.json` and the report to `summary.csv` under the output root.
    pub fn run_sweep(&self, sweep: &Sweep, dataset: &Dataset) -> Result<SweepReport> {
        let options = self.pipeline.options();
        std::fs::create_dir_all(&options.output_root)?;
        info!(
            "sweeping {} parameter set(s) over dataset {}",
            sweep.len(),
            dataset.name
        );

        let mut manifest = Manifest::new(&dataset.name);
        for params in sweep.iter() {
            let token = params.to_string();
            match self.pipeline.run_params(&params, dataset) {
                Ok(run) => manifest.record(RunRecord {
                    token: run.token,
                    params,
                    dir: run.dir,
                    outcome: if run.skipped {
                        RunOutcome::Skipped
                    } else {
                        RunOutcome::Completed
                    },
                    error: None,
                }),
                Err(err) => {
                    error!("{token}: {err}");
                    let dir = options.output_root.join(format!("{}{token}", dataset.name));
                    manifest.record(RunRecord {
                        token,
                        params,
                        dir,
                        outcome: RunOutcome::Failed,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let manifest_path = options.output_root.join(MANIFEST_FILE);
        manifest.write(&manifest_path)?;
        let failures = manifest.failed().count();
        if failures > 0 {
            warn!("{failures} of {} run(s) failed", manifest.runs.len());
        }

        let summary = Summary::from_manifest(&manifest)?;
        let summary_path = if summary.is_empty() {
            None
        } else {
            let path = options.output_root.join("summary.csv");
            summary.write(&path)?;
            info!("wrote {}", path.display());
            Some(path)
        };

        Ok(SweepReport {
            manifest,
            summary,
            summary_path,
        })
    }
}
