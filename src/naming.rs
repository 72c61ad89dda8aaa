//! Event-qualified renaming of MAF sequence names.
//!
//! The progressive workflow rewrites FASTA headers into event-qualified
//! names (`<event>.<sequence>`) so downstream MAF joining accepts them.
//! Comparing a predicted alignment against the simulation truth needs the
//! same names on both sides, so this module rebuilds the original-name to
//! workflow-name map from the run's experiment file and rewrites MAF `s`
//! lines accordingly.

use crate::error::{BenchError, Result};
use crate::experiment::Experiment;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Map from original FASTA sequence names to workflow names.
#[derive(Debug, Default)]
pub struct NamingMap {
    map: HashMap<String, String>,
}

impl NamingMap {
    /// Builds the map from an experiment file, reading every sequence file
    /// it references.
    pub fn from_experiment(experiment_path: &Path) -> Result<NamingMap> {
        let experiment = Experiment::read(experiment_path)?;
        let mut naming = NamingMap::default();
        for (event, sequence_path) in experiment.sequence_events()? {
            naming.add_sequence_file(&event, &sequence_path)?;
        }
        Ok(naming)
    }

    /// Registers every header of one FASTA file under its event name.
    pub fn add_sequence_file(&mut self, event: &str, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(BenchError::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            if let Some(header) = line.strip_prefix('>') {
                let name = header.split_whitespace().next().unwrap_or_default();
                if name.is_empty() {
                    return Err(BenchError::Other(format!(
                        "empty FASTA header in {}",
                        path.display()
                    )));
                }
                self.insert(name, &format!("{event}.{name}"))?;
            }
        }
        Ok(())
    }

    /// Identical re-registrations are fine; conflicting ones are errors.
    fn insert(&mut self, name: &str, qualified: &str) -> Result<()> {
        match self.map.get(name) {
            Some(existing) if existing != qualified => Err(BenchError::Other(format!(
                "sequence {name:?} maps to both {existing:?} and {qualified:?}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.map.insert(name.to_string(), qualified.to_string());
                Ok(())
            }
        }
    }

    /// The workflow name for an original sequence name.
    pub fn workflow_name(&self, name: &str) -> Result<&str> {
        self.map
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| BenchError::UnknownSequence(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Streams a MAF file, renaming the source field of every `s` line.
    /// All other lines pass through untouched.
    pub fn apply_to_maf(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.is_file() {
            return Err(BenchError::FileNotFound(input.to_path_buf()));
        }
        let reader = BufReader::new(File::open(input)?);
        let mut writer = BufWriter::new(File::create(output)?);
        for line in reader.lines() {
            let line = line?;
            writeln!(writer, "{}", self.rename_line(&line)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rewrites one MAF line; only `s` lines change.
    fn rename_line(&self, line: &str) -> Result<String> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("s") {
            return Ok(line.to_string());
        }
        let name = match tokens.next() {
            Some(name) => name,
            None => return Ok(line.to_string()),
        };
        let renamed = self.workflow_name(name)?;

        // splice the new name into the original byte range so the line's
        // spacing survives
        let after_s = &line[1..];
        let name_start = 1 + (after_s.len() - after_s.trim_start().len());
        let name_end = name_start + name.len();
        Ok(format!(
            "{}{}{}",
            &line[..name_start],
            renamed,
            &line[name_end..]
        ))
    }
}

/// Convenience wrapper: build the map from an experiment file and rename
/// a MAF in one call.
pub fn apply_naming_to_maf(experiment: &Path, input: &Path, output: &Path) -> Result<()> {
    NamingMap::from_experiment(experiment)?.apply_to_maf(input, output)
}
