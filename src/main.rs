use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use progressive_bench::manifest::{Manifest, MANIFEST_FILE};
use progressive_bench::naming::apply_naming_to_maf;
use progressive_bench::params::PARAMS_HEADER;
use progressive_bench::{Benchmark, Dataset, RunOptions, Summary, Sweep, Toolbox};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "progressive-bench", version, about = "Benchmark harness for the progressive alignment workflow")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SweepPreset {
    /// Stock configuration plus the vanilla control only
    Default,
    /// Outgroup on/off only
    Small,
    /// Outgroup and self-alignment axes
    Basic,
    /// Full cross product over the progressive axes
    All,
}

impl SweepPreset {
    fn sweep(self) -> Sweep {
        match self {
            SweepPreset::Default => Sweep::default(),
            SweepPreset::Small => Sweep::small_progressive(),
            SweepPreset::Basic => Sweep::basic_progressive(),
            SweepPreset::All => Sweep::all_progressive(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a parameter sweep over a dataset
    Run {
        /// Dataset root directory (Blanchette layout, NN.job regions)
        dataset: PathBuf,
        /// Workflow configuration template to patch per run
        #[arg(long)]
        config: PathBuf,
        /// Output root for run directories, manifest and summary
        #[arg(long, short, default_value = "benchmark-out")]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = SweepPreset::Default)]
        sweep: SweepPreset,
        /// Number of dataset regions to use (all by default)
        #[arg(long)]
        regions: Option<usize>,
        /// Scheduler batch system
        #[arg(long, default_value = "singleMachine")]
        batch_system: String,
        /// Maximum concurrent scheduler jobs (defaults to CPU count)
        #[arg(long)]
        max_jobs: Option<usize>,
        /// Scheduler retry count for failed jobs
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Directory searched first for the external tools
        #[arg(long)]
        bin_dir: Option<PathBuf>,
        /// Keep per-run scratch directories
        #[arg(long)]
        keep_intermediates: bool,
        /// Skip scheduler timing statistics
        #[arg(long)]
        no_stats: bool,
        /// Extra location to write the CSV summary to
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Rebuild the CSV summary from an existing sweep manifest
    Summarize {
        /// Output root of a previous run (must contain runs.json)
        output: PathBuf,
        /// Where to write the CSV (default: <output>/summary.csv)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Rename sequences in a MAF to the workflow's event-qualified names
    RenameMaf {
        /// Experiment XML the naming is derived from
        #[arg(long)]
        experiment: PathBuf,
        input: PathBuf,
        output: PathBuf,
    },
    /// Print the parameter tokens a sweep preset would run
    Params {
        #[arg(long, value_enum, default_value_t = SweepPreset::Default)]
        sweep: SweepPreset,
        /// Also print the parameter columns
        #[arg(long)]
        columns: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            dataset,
            config,
            output,
            sweep,
            regions,
            batch_system,
            max_jobs,
            retries,
            bin_dir,
            keep_intermediates,
            no_stats,
            summary,
        } => {
            let dataset = match regions {
                Some(count) => Dataset::blanchette_regions(&dataset, count),
                None => Dataset::blanchette(&dataset),
            }
            .with_context(|| format!("loading dataset from {}", dataset.display()))?;

            let mut options = RunOptions::new(output, config)
                .batch_system(batch_system)
                .retry_count(retries)
                .keep_intermediates(keep_intermediates)
                .job_tree_stats(!no_stats);
            if let Some(max_jobs) = max_jobs {
                options = options.max_jobs(max_jobs);
            }
            let toolbox = match bin_dir {
                Some(dir) => Toolbox::with_bin_dir(dir),
                None => Toolbox::new(),
            };
            let missing = toolbox.missing_tools();
            if !missing.is_empty() {
                bail!("missing external tools: {}", missing.join(", "));
            }

            let report = Benchmark::new(options, toolbox)?.run_sweep(&sweep.sweep(), &dataset)?;
            let failures = report.manifest.failed().count();
            println!(
                "{} run(s), {} failed, {} summarized",
                report.manifest.runs.len(),
                failures,
                report.summary.len()
            );
            if let Some(path) = &report.summary_path {
                println!("summary: {}", path.display());
            }
            if let Some(path) = summary {
                report.summary.write(&path)?;
            }
            if failures > 0 {
                bail!("{failures} run(s) failed; see {MANIFEST_FILE}");
            }
        }
        Command::Summarize { output, csv } => {
            let manifest_path = output.join(MANIFEST_FILE);
            let manifest = Manifest::read(&manifest_path)
                .with_context(|| format!("reading {}", manifest_path.display()))?;
            let summary = Summary::from_manifest(&manifest)?;
            if summary.is_empty() {
                bail!("no summarizable runs in {}", manifest_path.display());
            }
            let csv = csv.unwrap_or_else(|| output.join("summary.csv"));
            summary.write(&csv)?;
            println!("wrote {} row(s) to {}", summary.len(), csv.display());
        }
        Command::RenameMaf {
            experiment,
            input,
            output,
        } => {
            apply_naming_to_maf(&experiment, &input, &output)
                .with_context(|| format!("renaming {}", input.display()))?;
        }
        Command::Params { sweep, columns } => {
            let sweep = sweep.sweep();
            if columns {
                println!("{}", PARAMS_HEADER.join(","));
            }
            for params in sweep.iter() {
                if columns {
                    println!("{}", params.as_row().join(","));
                } else {
                    println!("{params}");
                }
            }
        }
    }
    Ok(())
}
