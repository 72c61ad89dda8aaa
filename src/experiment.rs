//! Per-run experiment files for the workflow engine.
//!
//! Each run hands the workflow an experiment XML naming the input sequences,
//! the species tree, the patched configuration, and the key-value database
//! the aligner should use. The same file is read back later to recover the
//! event-name to sequence-file pairing for MAF renaming.

use crate::error::{BenchError, Result};
use crate::params::Params;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::{Path, PathBuf};

/// Key-value store backing the alignment database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConf {
    /// File-backed database in `database_dir` (the default)
    TokyoCabinet { database_dir: PathBuf },
    /// Database served by a kyoto-tycoon instance
    KyotoTycoon {
        host: String,
        port: u16,
        database_dir: PathBuf,
    },
}

impl DatabaseConf {
    /// Stock server location for the kyoto-tycoon backend.
    pub fn kyoto_tycoon_default(database_dir: PathBuf) -> Self {
        DatabaseConf::KyotoTycoon {
            host: "localhost".to_string(),
            port: 1978,
            database_dir,
        }
    }

    /// Selects the backend a parameter set asks for.
    pub fn for_params(params: &Params, database_dir: PathBuf) -> Self {
        if params.kyoto_tycoon == Some(true) {
            DatabaseConf::kyoto_tycoon_default(database_dir)
        } else {
            DatabaseConf::TokyoCabinet {
                database_dir,
            }
        }
    }
}

/// One run's experiment description.
#[derive(Debug, Clone)]
pub struct Experiment {
    /// Input sequence files, in species-tree leaf order
    pub sequences: Vec<PathBuf>,
    /// Newick species tree whose leaves name the events
    pub species_tree: String,
    /// Patched workflow configuration for this run
    pub config_path: PathBuf,
    pub database: DatabaseConf,
}

impl Experiment {
    /// Writes the experiment XML.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let sequences = self
            .sequences
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");

        let mut root = BytesStart::new("cactus_workflow_experiment");
        root.push_attribute(("sequences", sequences.as_str()));
        root.push_attribute(("species_tree", self.species_tree.as_str()));
        root.push_attribute((
            "config",
            self.config_path.to_string_lossy().into_owned().as_str(),
        ));
        writer.write_event(Event::Start(root))?;

        match &self.database {
            DatabaseConf::TokyoCabinet { database_dir } => {
                let mut conf = BytesStart::new("st_kv_database_conf");
                conf.push_attribute(("type", "tokyo_cabinet"));
                writer.write_event(Event::Start(conf))?;
                let mut db = BytesStart::new("tokyo_cabinet");
                db.push_attribute((
                    "database_dir",
                    database_dir.to_string_lossy().into_owned().as_str(),
                ));
                writer.write_event(Event::Empty(db))?;
                writer.write_event(Event::End(BytesEnd::new("st_kv_database_conf")))?;
            }
            DatabaseConf::KyotoTycoon {
                host,
                port,
                database_dir,
            } => {
                let mut conf = BytesStart::new("st_kv_database_conf");
                conf.push_attribute(("type", "kyoto_tycoon"));
                writer.write_event(Event::Start(conf))?;
                let mut db = BytesStart::new("kyoto_tycoon");
                db.push_attribute(("host", host.as_str()));
                db.push_attribute(("port", port.to_string().as_str()));
                db.push_attribute((
                    "database_dir",
                    database_dir.to_string_lossy().into_owned().as_str(),
                ));
                writer.write_event(Event::Empty(db))?;
                writer.write_event(Event::End(BytesEnd::new("st_kv_database_conf")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("cactus_workflow_experiment")))?;

        fs::write(path, writer.into_inner())?;
        Ok(())
    }

    /// Reads the sequence list and species tree back from an experiment file.
    pub fn read(path: &Path) -> Result<Experiment> {
        if !path.exists() {
            return Err(BenchError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let mut reader = Reader::from_str(&text);

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e)
                    if e.name().as_ref() == b"cactus_workflow_experiment" =>
                {
                    let mut sequences = None;
                    let mut species_tree = None;
                    let mut config = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"sequences" => sequences = Some(value),
                            b"species_tree" => species_tree = Some(value),
                            b"config" => config = Some(value),
                            _ => {}
                        }
                    }
                    let sequences = sequences.ok_or_else(|| BenchError::XmlShape {
                        path: path.to_path_buf(),
                        detail: "experiment root has no sequences attribute".to_string(),
                    })?;
                    let species_tree = species_tree.ok_or_else(|| BenchError::XmlShape {
                        path: path.to_path_buf(),
                        detail: "experiment root has no species_tree attribute".to_string(),
                    })?;
                    return Ok(Experiment {
                        sequences: sequences.split_whitespace().map(PathBuf::from).collect(),
                        species_tree,
                        config_path: PathBuf::from(config.unwrap_or_default()),
                        database: DatabaseConf::TokyoCabinet {
                            database_dir: PathBuf::new(),
                        },
                    });
                }
                Event::Eof => {
                    return Err(BenchError::XmlShape {
                        path: path.to_path_buf(),
                        detail: "no cactus_workflow_experiment element".to_string(),
                    })
                }
                _ => {}
            }
        }
    }

    /// Pairs each species-tree leaf (event name) with its sequence file,
    /// in order.
    pub fn sequence_events(&self) -> Result<Vec<(String, PathBuf)>> {
        let leaves = newick_leaves(&self.species_tree);
        if leaves.len() != self.sequences.len() {
            return Err(BenchError::Other(format!(
                "species tree has {} leaves but experiment lists {} sequences",
                leaves.len(),
                self.sequences.len()
            )));
        }
        Ok(leaves.into_iter().zip(self.sequences.iter().cloned()).collect())
    }
}

/// Leaf names of a newick tree, left to right.
///
/// A name is a leaf iff it directly follows `(` or `,`; labels after `)`
/// name internal nodes and branch lengths follow `:`.
pub fn newick_leaves(tree: &str) -> Vec<String> {
    let mut leaves = Vec::new();
    let mut token = String::new();
    let mut last_delim = '(';
    for c in tree.chars() {
        match c {
            '(' | ')' | ',' | ';' | ':' => {
                if !token.is_empty() {
                    if last_delim == '(' || last_delim == ',' {
                        leaves.push(std::mem::take(&mut token));
                    } else {
                        token.clear();
                    }
                }
                last_delim = c;
            }
            c if c.is_whitespace() => {}
            _ => token.push(c),
        }
    }
    if !token.is_empty() && (last_delim == '(' || last_delim == ',') {
        leaves.push(token);
    }
    leaves
}
