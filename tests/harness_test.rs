//! End-to-end harness behavior that needs no external toolchain, plus one
//! ignored test against the real tools.

use progressive_bench::manifest::{Manifest, RunOutcome, RunRecord, MANIFEST_FILE};
use progressive_bench::params::Params;
use progressive_bench::{
    Benchmark, Dataset, DatabaseConf, Experiment, NamingMap, RunOptions, Summary, Sweep, Toolbox,
};
use std::fs;
use std::path::Path;

const JOBTREE_STATS: &str = r#"<?xml version="1.0"?>
<stats total_run_time="120.5" total_clock="240.25" total_number_of_jobs="17"/>
"#;

const MAF_COMPARISON: &str = r#"<?xml version="1.0"?>
<alignmentComparisons>
  <homology_tests fileA="true.maf" fileB="predicted.maf">
    <aggregate_results>
      <all totalTests="1000" totalTrue="950" totalFalse="50" average="0.95"/>
    </aggregate_results>
    <homology_pair_tests>
      <homology_test sequenceA="aggregate" sequenceB="HUMAN.chr1">
        <aggregate_results>
          <all totalTests="100" totalTrue="97" totalFalse="3" average="0.97"/>
        </aggregate_results>
      </homology_test>
    </homology_pair_tests>
  </homology_tests>
  <homology_tests fileA="predicted.maf" fileB="true.maf">
    <aggregate_results>
      <all totalTests="1000" totalTrue="880" totalFalse="120" average="0.88"/>
    </aggregate_results>
    <homology_pair_tests>
      <homology_test sequenceA="aggregate" sequenceB="HUMAN.chr1">
        <aggregate_results>
          <all totalTests="100" totalTrue="90" totalFalse="10" average="0.9"/>
        </aggregate_results>
      </homology_test>
    </homology_pair_tests>
  </homology_tests>
</alignmentComparisons>
"#;

fn fake_result_dir(root: &Path, token: &str) -> std::path::PathBuf {
    let dir = root.join(format!("blanchette{token}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("jobTreeStats.xml"), JOBTREE_STATS).unwrap();
    fs::write(dir.join("mafComparison.xml"), MAF_COMPARISON).unwrap();
    dir
}

#[test]
fn summary_rebuilds_from_a_manifest_on_disk() {
    let root = tempfile::tempdir().unwrap();

    let mut manifest = Manifest::new("blanchette");
    for params in [Params::default(), Params::builder().min_chain_length(4).build()] {
        let token = params.to_string();
        let dir = fake_result_dir(root.path(), &token);
        manifest.record(RunRecord {
            token,
            params,
            dir,
            outcome: RunOutcome::Completed,
            error: None,
        });
    }
    let broken = Params::builder().subtree_size(3).build();
    manifest.record(RunRecord {
        token: broken.to_string(),
        params: broken,
        dir: root.path().join("blanchette_st3"),
        outcome: RunOutcome::Failed,
        error: Some("workflow did not complete".to_string()),
    });
    let manifest_path = root.path().join(MANIFEST_FILE);
    manifest.write(&manifest_path).unwrap();

    // re-read from disk like `summarize` does
    let manifest = Manifest::read(&manifest_path).unwrap();
    let summary = Summary::from_manifest(&manifest).unwrap();
    assert_eq!(summary.len(), 2);

    let csv_path = root.path().join("summary.csv");
    summary.write(&csv_path).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Name,Run_Time,Clock_Time,Sensitivity,Specificity"));
    assert!(header.contains("HUMAN.chr1_sens,HUMAN.chr1_spec"));
    let first = lines.next().unwrap();
    assert!(first.starts_with("blanchette_Default,120.5,240.25,0.95,0.88"));
    let second = lines.next().unwrap();
    assert!(second.starts_with("blanchette_mc4,"));
}

#[test]
fn one_corrupt_result_does_not_sink_the_summary() {
    let root = tempfile::tempdir().unwrap();

    let mut manifest = Manifest::new("blanchette");
    for params in [Params::default(), Params::builder().min_chain_length(4).build()] {
        let token = params.to_string();
        let dir = fake_result_dir(root.path(), &token);
        manifest.record(RunRecord {
            token,
            params,
            dir,
            outcome: RunOutcome::Completed,
            error: None,
        });
    }
    // second run's comparison is damaged, its row is dropped with a warning
    fs::write(
        root.path().join("blanchette_mc4").join("mafComparison.xml"),
        MAF_COMPARISON.replace(r#"average="0.88""#, r#"average="nan-ish""#),
    )
    .unwrap();

    let summary = Summary::from_manifest(&manifest).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary.rendered_rows()[0][0], "blanchette_Default");
}

#[test]
fn renaming_follows_the_experiment_sequence_order() {
    let root = tempfile::tempdir().unwrap();
    let seq_dir = root.path().join("seqs");
    fs::create_dir_all(&seq_dir).unwrap();
    fs::write(seq_dir.join("HUMAN"), ">hg18.chr7 extra header text\nACGTACGT\n").unwrap();
    fs::write(seq_dir.join("MOUSE"), ">mm9.chr6\nTTTTACGT\n").unwrap();

    let experiment_path = root.path().join("experiment.xml");
    Experiment {
        sequences: vec![seq_dir.join("HUMAN"), seq_dir.join("MOUSE")],
        species_tree: "(HUMAN:0.1,MOUSE:0.2);".to_string(),
        config_path: root.path().join("config.xml"),
        database: DatabaseConf::TokyoCabinet {
            database_dir: root.path().join("db"),
        },
    }
    .write(&experiment_path)
    .unwrap();

    let naming = NamingMap::from_experiment(&experiment_path).unwrap();
    assert_eq!(naming.workflow_name("hg18.chr7").unwrap(), "HUMAN.hg18.chr7");

    let input = root.path().join("true.maf");
    fs::write(
        &input,
        "##maf version=1\n\na score=23.0\ns hg18.chr7  100 8 + 158545518 ACGTACGT\ns mm9.chr6    10 8 + 151104725 TTTTACGT\n\n",
    )
    .unwrap();
    let output = root.path().join("true.renamed.maf");
    naming.apply_to_maf(&input, &output).unwrap();

    let renamed = fs::read_to_string(&output).unwrap();
    assert!(renamed.contains("s HUMAN.hg18.chr7  100 8 + 158545518 ACGTACGT"));
    assert!(renamed.contains("s MOUSE.mm9.chr6    10 8 + 151104725 TTTTACGT"));
    assert!(renamed.starts_with("##maf version=1\n"));
}

#[test]
fn sweep_over_completed_results_is_fully_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let template = root.path().join("config.xml");
    fs::write(
        &template,
        r#"<cactus_workflow_config>
  <multi_cactus>
    <outgroup strategy="none"/>
    <coverage required_fraction="0" single_copy_strategy="none"/>
    <decomposition self_alignment="False" subtree_size="2"/>
  </multi_cactus>
  <alignment>
    <iterations>
      <iteration type="blast" number="0"><core minimumChainLength="2"/></iteration>
      <iteration type="base" number="1" minimumBlockDegree="2"/>
    </iterations>
  </alignment>
</cactus_workflow_config>
"#,
    )
    .unwrap();

    let data = root.path().join("data");
    for species in progressive_bench::dataset::BLANCHETTE_SPECIES {
        let dir = data.join("00.job");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(species), format!(">{species}.chr1\nACGT\n")).unwrap();
    }
    fs::write(data.join("00.job").join("true.mfa"), ">a\nACGT\n").unwrap();
    let dataset = Dataset::blanchette_regions(&data, 1).unwrap();

    let out = root.path().join("out");
    fs::create_dir_all(&out).unwrap();
    for token in ["_Vanilla", "_Default"] {
        fake_result_dir(&out, token);
    }

    // empty toolbox: the sweep must complete without a single tool call
    let toolbox = Toolbox::with_bin_dir(root.path().join("no-bin"));
    let benchmark = Benchmark::new(RunOptions::new(&out, &template), toolbox).unwrap();
    let report = benchmark.run_sweep(&Sweep::default(), &dataset).unwrap();

    assert_eq!(report.manifest.runs.len(), 2);
    assert!(report
        .manifest
        .runs
        .iter()
        .all(|r| r.outcome == RunOutcome::Skipped));
    assert_eq!(report.summary.len(), 2);
    assert!(report.summary_path.unwrap().is_file());
    assert!(out.join(MANIFEST_FILE).is_file());
}

#[test]
#[ignore] // Run with --ignored when the alignment toolchain is installed
fn full_sweep_against_the_real_toolchain() {
    let data = Path::new("data/blanchette00");
    let template = Path::new("data/cactus_workflow_config.xml");
    if !data.is_dir() || !template.is_file() {
        eprintln!("Benchmark data not found, skipping");
        return;
    }

    let toolbox = Toolbox::new();
    let missing = toolbox.missing_tools();
    if !missing.is_empty() {
        eprintln!("Missing tools ({}), skipping", missing.join(", "));
        return;
    }

    let out = tempfile::tempdir().unwrap();
    let options = RunOptions::new(out.path(), template).max_jobs(2);
    let benchmark = Benchmark::new(options, toolbox).unwrap();
    let dataset = Dataset::blanchette_regions(data, 1).unwrap();

    let report = benchmark.run_sweep(&Sweep::default(), &dataset).unwrap();
    assert_eq!(report.manifest.failed().count(), 0);
    let summary_path = report.summary_path.expect("summary written");
    let csv = fs::read_to_string(summary_path).unwrap();
    assert!(csv.lines().count() >= 2);
}
