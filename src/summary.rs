//! CSV summary tables over per-run result files.
//!
//! Every completed run leaves two XML artifacts behind: the scheduler's
//! timing statistics (`jobTreeStats.xml`) and the homology comparison
//! against the simulation truth (`mafComparison.xml`). This module parses
//! both and flattens them into one CSV row per run, with per-species
//! sensitivity/specificity columns aligned across the whole table.

use crate::error::{BenchError, Result};
use crate::manifest::Manifest;
use crate::params::{Params, PARAMS_HEADER};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Timing totals from the scheduler's statistics dump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub run_time: f64,
    pub clock_time: f64,
}

/// Homology-test aggregates from the MAF comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComparisonStats {
    /// Aggregate of the truth-vs-prediction direction
    pub sensitivity: f64,
    /// Aggregate of the prediction-vs-truth direction
    pub specificity: f64,
    pub species_sensitivity: BTreeMap<String, f64>,
    pub species_specificity: BTreeMap<String, f64>,
}

fn parse_f64_attr(elem: &BytesStart, key: &[u8], path: &Path) -> Result<f64> {
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            let text = attr.unescape_value()?;
            return text.parse::<f64>().map_err(|_| BenchError::XmlShape {
                path: path.to_path_buf(),
                detail: format!(
                    "attribute {} is not a number: {text:?}",
                    String::from_utf8_lossy(key)
                ),
            });
        }
    }
    Err(BenchError::XmlShape {
        path: path.to_path_buf(),
        detail: format!("missing attribute {}", String::from_utf8_lossy(key)),
    })
}

fn attr_string(elem: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Reads `total_run_time` / `total_clock` from the stats dump's root element.
pub fn read_run_stats(path: &Path) -> Result<RunStats> {
    let text = fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&text);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(RunStats {
                    run_time: parse_f64_attr(&e, b"total_run_time", path)?,
                    clock_time: parse_f64_attr(&e, b"total_clock", path)?,
                });
            }
            Event::Eof => {
                return Err(BenchError::XmlShape {
                    path: path.to_path_buf(),
                    detail: "empty job-tree stats document".to_string(),
                })
            }
            _ => {}
        }
    }
}

/// Parses a MAF comparison file.
///
/// The document must contain exactly two `homology_tests` blocks (one per
/// comparison direction). Each block's top-level `aggregate_results/all`
/// average is the direction's total; `homology_test` entries whose
/// `sequenceA`/`sequenceB` is the literal `aggregate` carry the per-species
/// aggregates.
pub fn read_comparison_stats(path: &Path) -> Result<ComparisonStats> {
    let text = fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&text);

    let mut totals: Vec<f64> = Vec::new();
    let mut species: [BTreeMap<String, f64>; 2] = [BTreeMap::new(), BTreeMap::new()];
    let mut stack: Vec<String> = Vec::new();
    // species name of the enclosing aggregate pair test, when inside one
    let mut pair_species: Option<Option<String>> = None;
    // 1-based ordinal of the most recently opened homology_tests block;
    // sibling blocks pop off the stack, so the ordinal has to be counted
    let mut block = 0usize;

    loop {
        let event = reader.read_event()?;
        let (elem, is_start) = match &event {
            Event::Start(e) => (Some(e), true),
            Event::Empty(e) => (Some(e), false),
            Event::End(_) => {
                if stack.last().map(String::as_str) == Some("homology_test") {
                    pair_species = None;
                }
                stack.pop();
                (None, false)
            }
            Event::Eof => break,
            _ => (None, false),
        };

        if let Some(e) = elem {
            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

            match name.as_str() {
                "homology_tests" => block += 1,
                "homology_test" => {
                    let a = attr_string(e, b"sequenceA")?.unwrap_or_default();
                    let b = attr_string(e, b"sequenceB")?.unwrap_or_default();
                    pair_species = Some(if b == "aggregate" {
                        Some(a)
                    } else if a == "aggregate" {
                        Some(b)
                    } else {
                        None
                    });
                }
                "all" if stack.last().map(String::as_str) == Some("aggregate_results") => {
                    if !stack.iter().any(|n| n == "homology_tests") {
                        return Err(BenchError::XmlShape {
                            path: path.to_path_buf(),
                            detail: "aggregate outside a homology_tests block".to_string(),
                        });
                    }
                    let average = parse_f64_attr(e, b"average", path)?;
                    match &pair_species {
                        // inside an aggregate pair test
                        Some(Some(sp)) if block <= 2 => {
                            species[block - 1].insert(sp.clone(), average);
                        }
                        Some(Some(_)) => {}
                        // inside a named-pair test; not aggregated
                        Some(None) => {}
                        // block-level total
                        None => {
                            if totals.len() != block - 1 {
                                return Err(BenchError::XmlShape {
                                    path: path.to_path_buf(),
                                    detail: format!(
                                        "homology_tests block {block} has multiple totals"
                                    ),
                                });
                            }
                            totals.push(average);
                        }
                    }
                }
                _ => {}
            }

            if is_start {
                stack.push(name);
            }
        }
    }

    if totals.len() != 2 {
        return Err(BenchError::XmlShape {
            path: path.to_path_buf(),
            detail: format!(
                "expected exactly two homology_tests aggregates, found {}",
                totals.len()
            ),
        });
    }
    let [species_sensitivity, species_specificity] = species;
    Ok(ComparisonStats {
        sensitivity: totals[0],
        specificity: totals[1],
        species_sensitivity,
        species_specificity,
    })
}

/// One summarized run.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub name: String,
    pub params: Params,
    pub run: RunStats,
    pub comparison: ComparisonStats,
}

/// Accumulates run rows and writes the final CSV table.
#[derive(Debug, Default)]
pub struct Summary {
    rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn new() -> Self {
        Summary::default()
    }

    /// Builds a summary from a sweep manifest, one row per run that left
    /// result files behind. Runs whose files have since vanished are
    /// skipped with a warning, same as [`Summary::add_row`].
    pub fn from_manifest(manifest: &Manifest) -> Result<Summary> {
        let mut summary = Summary::new();
        for record in manifest.summarizable() {
            summary.add_row(
                &manifest.dataset,
                &record.params,
                &record.dir.join("jobTreeStats.xml"),
                &record.dir.join("mafComparison.xml"),
            )?;
        }
        Ok(summary)
    }

    /// Adds one run's row. Runs whose result files are missing or
    /// unreadable are skipped with a warning (partial sweeps still
    /// summarize); returns whether a row was added.
    pub fn add_row(
        &mut self,
        category: &str,
        params: &Params,
        job_tree_stats: &Path,
        maf_comparison: &Path,
    ) -> Result<bool> {
        if !job_tree_stats.is_file() || !maf_comparison.is_file() {
            log::warn!(
                "skipping {category}{params}: missing {} or {}",
                job_tree_stats.display(),
                maf_comparison.display()
            );
            return Ok(false);
        }
        let run = match read_run_stats(job_tree_stats) {
            Ok(run) => run,
            Err(err) => {
                log::warn!("skipping {category}{params}: {err}");
                return Ok(false);
            }
        };
        let comparison = match read_comparison_stats(maf_comparison) {
            Ok(comparison) => comparison,
            Err(err) => {
                log::warn!("skipping {category}{params}: {err}");
                return Ok(false);
            }
        };
        self.rows.push(SummaryRow {
            name: format!("{category}{params}"),
            params: params.clone(),
            run,
            comparison,
        });
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted union of species seen across all rows.
    fn species(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.comparison
                    .species_sensitivity
                    .keys()
                    .chain(row.comparison.species_specificity.keys())
            })
            .cloned()
            .collect()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = vec![
            "Name".to_string(),
            "Run_Time".to_string(),
            "Clock_Time".to_string(),
            "Sensitivity".to_string(),
            "Specificity".to_string(),
        ];
        for species in self.species() {
            header.push(format!("{species}_sens"));
            header.push(format!("{species}_spec"));
        }
        header.extend(PARAMS_HEADER.iter().map(|h| h.to_string()));
        header
    }

    /// All rows rendered as cells, aligned with [`Summary::header`].
    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        let species = self.species();
        self.rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.name.clone(),
                    row.run.run_time.to_string(),
                    row.run.clock_time.to_string(),
                    row.comparison.sensitivity.to_string(),
                    row.comparison.specificity.to_string(),
                ];
                for sp in &species {
                    for side in [
                        &row.comparison.species_sensitivity,
                        &row.comparison.species_specificity,
                    ] {
                        cells.push(side.get(sp).map(f64::to_string).unwrap_or_default());
                    }
                }
                cells.extend(row.params.as_row());
                cells
            })
            .collect()
    }

    /// Writes the CSV table. An empty summary writes no file.
    pub fn write(&self, path: &Path) -> Result<()> {
        if self.rows.is_empty() {
            log::warn!("no summarizable runs, not writing {}", path.display());
            return Ok(());
        }
        let header = self.header();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&header)?;
        for row in self.rendered_rows() {
            debug_assert_eq!(row.len(), header.len());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
