//! Benchmark input sets.
//!
//! A dataset is a species tree plus one or more simulated regions, each with
//! per-species sequence files and the simulation's true alignment. The stock
//! loader understands the Blanchette primate/rodent/laurasiatheria simulation
//! layout used by the workflow's own test suite.

use crate::error::{BenchError, Result};
use std::path::{Path, PathBuf};

/// One simulated region: ordered sequence files plus the true alignment.
#[derive(Debug, Clone)]
pub struct Region {
    pub index: usize,
    /// Sequence files in species-tree leaf order
    pub sequences: Vec<PathBuf>,
    /// True alignment in MFA format
    pub true_mfa: PathBuf,
}

/// A named benchmark input set.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    /// Newick tree whose leaves match the per-region sequence files
    pub species_tree: String,
    pub regions: Vec<Region>,
}

/// Species of the Blanchette simulation, in tree leaf order.
pub const BLANCHETTE_SPECIES: [&str; 9] = [
    "HUMAN", "CHIMP", "BABOON", "MOUSE", "RAT", "DOG", "CAT", "PIG", "COW",
];

/// The simulation's fixed species tree.
pub const BLANCHETTE_TREE: &str = "((((HUMAN:0.006969,CHIMP:0.009727):0.025291,\
    BABOON:0.044568):0.11,(MOUSE:0.072818,RAT:0.081244):0.260342):0.02326,\
    ((DOG:0.07,CAT:0.07):0.087381,(PIG:0.06,COW:0.06):0.104728):0.04);";

/// Number of regions the full Blanchette benchmark covers.
pub const BLANCHETTE_REGIONS: usize = 5;

impl Dataset {
    /// Loads the Blanchette simulation from its standard layout:
    /// region directories `00.job` .. `04.job`, each holding one sequence
    /// file per species plus `true.mfa`.
    pub fn blanchette(root: &Path) -> Result<Dataset> {
        Dataset::blanchette_regions(root, BLANCHETTE_REGIONS)
    }

    /// Blanchette loader restricted to the first `count` regions.
    pub fn blanchette_regions(root: &Path, count: usize) -> Result<Dataset> {
        if !root.is_dir() {
            return Err(BenchError::FileNotFound(root.to_path_buf()));
        }
        let mut regions = Vec::with_capacity(count);
        for index in 0..count {
            let region_dir = root.join(format!("{index:02}.job"));
            if !region_dir.is_dir() {
                return Err(BenchError::FileNotFound(region_dir));
            }
            let mut sequences = Vec::with_capacity(BLANCHETTE_SPECIES.len());
            for species in BLANCHETTE_SPECIES {
                let sequence = region_dir.join(species);
                if !sequence.is_file() {
                    return Err(BenchError::FileNotFound(sequence));
                }
                sequences.push(sequence);
            }
            let true_mfa = region_dir.join("true.mfa");
            if !true_mfa.is_file() {
                return Err(BenchError::FileNotFound(true_mfa));
            }
            regions.push(Region {
                index,
                sequences,
                true_mfa,
            });
        }
        Ok(Dataset {
            name: "blanchette".to_string(),
            species_tree: BLANCHETTE_TREE.to_string(),
            regions,
        })
    }
}
