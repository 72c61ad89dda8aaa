//! Per-run orchestration of the progressive alignment workflow.
//!
//! One benchmark run is a directory tree plus a fixed subprocess sequence:
//! patch the configuration template, write the experiment file, create the
//! multi-cactus project, drive the progressive workflow through the job-tree
//! scheduler, check completion, dump scheduler statistics, and compare the
//! predicted alignment against the simulation truth. Region results are
//! merged into one comparison file and one timing total per parameter set.
//!
//! Completed runs are detected by their final `mafComparison.xml` and are
//! never re-run, so an interrupted sweep can simply be restarted.

use crate::config_patch::patch_config_file;
use crate::dataset::{Dataset, Region};
use crate::error::{BenchError, Result};
use crate::experiment::{DatabaseConf, Experiment};
use crate::naming::NamingMap;
use crate::params::{OutgroupStrategy, Params};
use crate::summary::read_run_stats;
use crate::tools::{self, Toolbox};
use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Writer;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Options shared by every run of a sweep.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root directory the per-run trees are created under
    pub output_root: PathBuf,
    /// Workflow configuration template to patch per run
    pub config_template: PathBuf,
    /// Scheduler batch system (`singleMachine`, `parasol`, `gridEngine`, ...)
    pub batch_system: String,
    /// Maximum concurrent scheduler jobs
    pub max_jobs: usize,
    /// Scheduler retry count for failed jobs
    pub retry_count: u32,
    /// Keep per-run scratch directories (job trees, temporary MAFs)
    pub keep_intermediates: bool,
    /// Collect scheduler timing statistics (`jobTreeStats.xml`)
    pub job_tree_stats: bool,
}

impl RunOptions {
    pub fn new(output_root: impl Into<PathBuf>, config_template: impl Into<PathBuf>) -> Self {
        RunOptions {
            output_root: output_root.into(),
            config_template: config_template.into(),
            batch_system: "singleMachine".to_string(),
            max_jobs: num_cpus::get().max(1),
            retry_count: 0,
            keep_intermediates: false,
            job_tree_stats: true,
        }
    }

    pub fn batch_system(mut self, batch_system: impl Into<String>) -> Self {
        self.batch_system = batch_system.into();
        self
    }

    pub fn max_jobs(mut self, max_jobs: usize) -> Self {
        assert!(max_jobs > 0, "max_jobs must be positive");
        self.max_jobs = max_jobs;
        self
    }

    pub fn retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn job_tree_stats(mut self, enabled: bool) -> Self {
        self.job_tree_stats = enabled;
        self
    }

    /// A run (or parameter set) is complete when its comparison exists,
    /// together with its stats file when stats are being collected.
    fn is_complete(&self, comparison: &Path, stats: &Path) -> bool {
        comparison.is_file() && (!self.job_tree_stats || stats.is_file())
    }
}

/// Results of one region within a parameter set.
#[derive(Debug, Clone)]
pub struct RegionRun {
    pub dir: PathBuf,
    /// Region-level comparison XML
    pub comparison: PathBuf,
    /// Region-level scheduler statistics XML
    pub stats: PathBuf,
    pub skipped: bool,
}

/// Results of one parameter set across all regions.
#[derive(Debug, Clone)]
pub struct ParamsRun {
    pub token: String,
    pub dir: PathBuf,
    /// Merged comparison XML across regions
    pub comparison: PathBuf,
    /// Aggregated scheduler statistics across regions
    pub stats: PathBuf,
    pub regions: Vec<RegionRun>,
    /// The whole parameter set was already complete
    pub skipped: bool,
}

/// Drives one workflow run at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: RunOptions,
    toolbox: Toolbox,
}

impl Pipeline {
    pub fn new(options: RunOptions, toolbox: Toolbox) -> Result<Self> {
        if !options.config_template.is_file() {
            return Err(BenchError::FileNotFound(options.config_template.clone()));
        }
        Ok(Pipeline { options, toolbox })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs one parameter set over every region of the dataset and merges
    /// the results.
    pub fn run_params(&self, params: &Params, dataset: &Dataset) -> Result<ParamsRun> {
        params.validate()?;
        let token = params.to_string();
        let params_dir = self.options.output_root.join(format!("{}{token}", dataset.name));
        let comparison = params_dir.join("mafComparison.xml");
        let stats = params_dir.join("jobTreeStats.xml");

        if self.options.is_complete(&comparison, &stats) {
            info!("{token}: already complete, skipping");
            return Ok(ParamsRun {
                token,
                dir: params_dir,
                comparison,
                stats,
                regions: Vec::new(),
                skipped: true,
            });
        }
        fs::create_dir_all(&params_dir)?;
        info!("{token}: running {} region(s)", dataset.regions.len());

        let mut regions = Vec::with_capacity(dataset.regions.len());
        for region in &dataset.regions {
            regions.push(self.run_region(params, dataset, region, &params_dir)?);
        }

        self.merge_comparisons(&regions, &params_dir, &comparison)?;
        if self.options.job_tree_stats {
            self.aggregate_stats(&regions, &stats)?;
        }
        info!("{token}: complete");

        Ok(ParamsRun {
            token,
            dir: params_dir,
            comparison,
            stats,
            regions,
            skipped: false,
        })
    }

    /// Runs one region of one parameter set.
    pub fn run_region(
        &self,
        params: &Params,
        dataset: &Dataset,
        region: &Region,
        params_dir: &Path,
    ) -> Result<RegionRun> {
        let region_dir = params_dir.join(region.index.to_string());
        let comparison = region_dir.join("mafComparison.xml");
        let stats = region_dir.join("jobTreeStats.xml");

        if self.options.is_complete(&comparison, &stats) {
            debug!("region {}: already complete, skipping", region.index);
            return Ok(RegionRun {
                dir: region_dir,
                comparison,
                stats,
                skipped: true,
            });
        }
        fs::create_dir_all(&region_dir)?;

        let scratch = tempfile::Builder::new()
            .prefix("scratch_")
            .tempdir_in(&region_dir)?;
        let scratch_dir = scratch.path().to_path_buf();

        let experiment_path = region_dir.join("experiment.xml");
        let predicted_maf = region_dir.join("alignment.maf");

        if !predicted_maf.is_file() {
            // configuration and experiment files live with the results
            let config_path = region_dir.join("config.xml");
            patch_config_file(&self.options.config_template, &config_path, params)?;

            let database_dir = scratch_dir.join("cactusDisk");
            Experiment {
                sequences: region.sequences.clone(),
                species_tree: dataset.species_tree.clone(),
                config_path: config_path.clone(),
                database: DatabaseConf::for_params(params, database_dir),
            }
            .write(&experiment_path)?;

            let project_dir = scratch_dir.join("project");
            self.create_project(params, &experiment_path, &project_dir)?;

            let job_tree = scratch_dir.join("jobTree");
            self.run_progressive(&project_dir.join("exp_project.xml"), &job_tree)?;
            self.check_job_tree(&job_tree)?;
            if self.options.job_tree_stats {
                self.dump_job_tree_stats(&job_tree, &stats)?;
            }

            let produced = project_dir.join("alignment.maf");
            if !produced.is_file() {
                return Err(BenchError::Other(format!(
                    "workflow completed but produced no {}",
                    produced.display()
                )));
            }
            fs::rename(&produced, &predicted_maf)?;
        }

        // truth side: MFA -> MAF, then rename to the workflow's
        // event-qualified sequence names
        let true_maf = scratch_dir.join("true.maf");
        self.run_tool(tools::MFA_TO_MAF, |cmd| {
            cmd.arg("--mfaFile")
                .arg(&region.true_mfa)
                .arg("--outputFile")
                .arg(&true_maf);
        })?;

        let renamed_true = scratch_dir.join("true.renamed.maf");
        NamingMap::from_experiment(&experiment_path)?.apply_to_maf(&true_maf, &renamed_true)?;

        self.run_tool(tools::MAF_COMPARATOR, |cmd| {
            cmd.arg("--mafFile1")
                .arg(&renamed_true)
                .arg("--mafFile2")
                .arg(&predicted_maf)
                .arg("--outputFile")
                .arg(&comparison);
        })?;

        if self.options.keep_intermediates {
            let kept = scratch.into_path();
            debug!("region {}: keeping scratch {}", region.index, kept.display());
        }
        Ok(RegionRun {
            dir: region_dir,
            comparison,
            stats,
            skipped: false,
        })
    }

    fn create_project(
        &self,
        params: &Params,
        experiment: &Path,
        project_dir: &Path,
    ) -> Result<()> {
        self.run_tool(tools::CREATE_PROJECT, |cmd| {
            cmd.arg(experiment).arg(project_dir);
            if params
                .outgroup_strategy
                .is_some_and(|s| s != OutgroupStrategy::None)
            {
                cmd.arg("--outgroup");
            }
            if params.self_alignment == Some(true) {
                cmd.arg("--selfAlignment");
            }
        })
        .map(|_| ())
    }

    fn run_progressive(&self, project_xml: &Path, job_tree: &Path) -> Result<()> {
        let max_jobs = self.options.max_jobs.to_string();
        let retries = self.options.retry_count.to_string();
        self.run_tool(tools::PROGRESSIVE, |cmd| {
            cmd.arg(project_xml)
                .arg("--jobTree")
                .arg(job_tree)
                .arg("--batchSystem")
                .arg(&self.options.batch_system)
                .arg("--maxThreads")
                .arg(&max_jobs)
                .arg("--retryCount")
                .arg(&retries)
                .arg("--buildMaf")
                .arg("--joinMaf");
            if self.options.job_tree_stats {
                cmd.arg("--stats");
            }
        })
        .map(|_| ())
    }

    fn check_job_tree(&self, job_tree: &Path) -> Result<()> {
        let checked = self.run_tool(tools::JOBTREE_STATUS, |cmd| {
            cmd.arg("--jobTree").arg(job_tree).arg("--failIfNotComplete");
        });
        match checked {
            Ok(_) => Ok(()),
            Err(BenchError::ToolFailed { .. }) => {
                Err(BenchError::WorkflowIncomplete(job_tree.to_path_buf()))
            }
            Err(other) => Err(other),
        }
    }

    fn dump_job_tree_stats(&self, job_tree: &Path, output: &Path) -> Result<()> {
        self.run_tool(tools::JOBTREE_STATS, |cmd| {
            cmd.arg("--jobTree")
                .arg(job_tree)
                .arg("--outputFile")
                .arg(output);
        })
        .map(|_| ())
    }

    /// Chains the per-region comparison files into one merged document,
    /// exactly as the merge utility does it: fold left, two at a time.
    fn merge_comparisons(
        &self,
        regions: &[RegionRun],
        params_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut sources = regions.iter().map(|r| r.comparison.clone());
        let first = sources.next().ok_or_else(|| {
            BenchError::Other("cannot merge comparisons of an empty region list".to_string())
        })?;

        let scratch = tempfile::Builder::new()
            .prefix("merge_")
            .tempdir_in(params_dir)?;
        let mut merged = first;
        for (i, next) in sources.enumerate() {
            let step = scratch.path().join(format!("merged_{i}.xml"));
            self.run_tool(tools::MERGE_COMPARATOR_RESULTS, |cmd| {
                cmd.arg("--results1")
                    .arg(&merged)
                    .arg("--results2")
                    .arg(&next)
                    .arg("--outputFile")
                    .arg(&step);
            })?;
            merged = step;
        }
        fs::copy(&merged, output)?;
        Ok(())
    }

    /// Sums the per-region scheduler totals into a params-level stats file.
    fn aggregate_stats(&self, regions: &[RegionRun], output: &Path) -> Result<()> {
        let mut run_time = 0f64;
        let mut clock_time = 0f64;
        for region in regions {
            let stats = read_run_stats(&region.stats)?;
            run_time += stats.run_time;
            clock_time += stats.clock_time;
        }

        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        let mut root = BytesStart::new("stats");
        root.push_attribute(("total_run_time", run_time.to_string().as_str()));
        root.push_attribute(("total_clock", clock_time.to_string().as_str()));
        writer.write_event(Event::Empty(root))?;
        fs::write(output, writer.into_inner())?;
        Ok(())
    }

    /// Runs one external tool to completion, capturing its output.
    fn run_tool(
        &self,
        name: &str,
        configure: impl FnOnce(&mut Command),
    ) -> Result<std::process::Output> {
        let path = self.toolbox.find(name)?;
        let mut cmd = Command::new(path);
        configure(&mut cmd);
        debug!("executing {cmd:?}");

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(BenchError::ToolFailed {
                tool: name.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }
}
