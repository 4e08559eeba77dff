//! In-memory view of the NCBI taxonomy dump.
//!
//! `names.dmp` and `nodes.dmp` share one row format: fields separated by
//! `\t|\t`, rows terminated by `\t|\n`.
//!
//! ```text
//! 562	|	Escherichia coli	|		|	scientific name	|
//! 562	|	561	|	species	|	EC	|	0	|	...
//! ```

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{RankSelection, TaxonId};
use crate::error::TaxLookupError;

pub const NAMES_FILE: &str = "names.dmp";
pub const NODES_FILE: &str = "nodes.dmp";

const FIELD_DELIMITER: &str = "\t|\t";
const ROW_TERMINATOR: &str = "\t|";
const SCIENTIFIC_NAME: &str = "scientific name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonRecord {
    pub id: TaxonId,
    pub name: String,
    pub parent_id: TaxonId,
    pub rank: String,
}

impl TaxonRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
        rank: impl Into<String>,
    ) -> Self {
        Self {
            id: TaxonId::new(id),
            name: name.into(),
            parent_id: TaxonId::new(parent_id),
            rank: rank.into(),
        }
    }

    /// The root of the tree is the one node that is its own parent.
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

/// One step of a lineage, borrowed from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageEntry<'a> {
    pub rank: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Default, Clone)]
pub struct TaxonomyTable {
    records: HashMap<TaxonId, TaxonRecord>,
}

/// Scientific names keyed by taxon ID, read from `names.dmp` before the nodes.
pub type ScientificNames = HashMap<String, String>;

impl TaxonomyTable {
    /// Builds the table from the two dumps. Names must be read first since
    /// every node row attaches its parent and rank to an existing name.
    pub fn load<N: BufRead, D: BufRead>(names: N, nodes: D) -> Result<Self, TaxLookupError> {
        Self::from_nodes(read_scientific_names(names)?, nodes)
    }

    /// Second half of [`TaxonomyTable::load`]: consumes the names, one per
    /// node row.
    pub fn from_nodes<D: BufRead>(
        mut scientific_names: ScientificNames,
        nodes: D,
    ) -> Result<Self, TaxLookupError> {
        let mut records = HashMap::with_capacity(scientific_names.len());
        for_each_row(nodes, NODES_FILE, |line, fields| {
            if fields.len() < 3 {
                return Err(short_row(NODES_FILE, line, 3, fields.len()));
            }
            let tax_id = fields[0];
            let name = scientific_names.remove(tax_id).ok_or_else(|| {
                TaxLookupError::OrphanNode {
                    line,
                    tax_id: tax_id.to_string(),
                }
            })?;
            let record = TaxonRecord::new(tax_id, name, fields[1], fields[2]);
            records.insert(record.id.clone(), record);
            Ok(())
        })?;

        if !scientific_names.is_empty() {
            debug!(
                "{} scientific names have no node entry and were dropped",
                scientific_names.len()
            );
        }
        debug!("loaded {} taxa", records.len());
        Ok(Self { records })
    }

    pub fn get(&self, id: &str) -> Option<&TaxonRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Walks from `start` towards the root and returns the visited entries
    /// leaf first.
    ///
    /// An unknown `start` yields an empty lineage. A parent missing from the
    /// table ends the walk early. A parent chain that revisits a taxon other
    /// than through the root self-loop is an error.
    pub fn ascend(&self, start: &str) -> Result<Vec<LineageEntry<'_>>, TaxLookupError> {
        let mut lineage = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = start;

        while let Some(record) = self.records.get(current) {
            if !visited.insert(record.id.as_str()) {
                return Err(TaxLookupError::CyclicLineage {
                    start: start.to_string(),
                    revisited: current.to_string(),
                });
            }
            lineage.push(LineageEntry {
                rank: &record.rank,
                name: &record.name,
            });
            if record.is_root() {
                return Ok(lineage);
            }
            current = record.parent_id.as_str();
        }

        if !lineage.is_empty() {
            warn!("lineage of taxon {start} stops at unknown parent taxon {current}");
        }
        Ok(lineage)
    }

    /// Root-to-leaf lineage of `start`.
    pub fn lineage(&self, start: &str) -> Result<Vec<LineageEntry<'_>>, TaxLookupError> {
        let mut lineage = self.ascend(start)?;
        lineage.reverse();
        Ok(lineage)
    }
}

impl FromIterator<TaxonRecord> for TaxonomyTable {
    fn from_iter<T: IntoIterator<Item = TaxonRecord>>(iter: T) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }
}

/// Names of the entries whose rank is selected, in lineage order.
pub fn select_ranks<'a>(
    lineage: &[LineageEntry<'a>],
    selection: &RankSelection,
) -> Vec<&'a str> {
    lineage
        .iter()
        .filter(|entry| selection.selects(entry.rank))
        .map(|entry| entry.name)
        .collect()
}

pub fn read_scientific_names<R: BufRead>(reader: R) -> Result<ScientificNames, TaxLookupError> {
    let mut names = HashMap::new();
    for_each_row(reader, NAMES_FILE, |line, fields| {
        if fields.len() < 4 {
            return Err(short_row(NAMES_FILE, line, 4, fields.len()));
        }
        if fields[3] == SCIENTIFIC_NAME {
            names.insert(fields[0].to_string(), fields[1].to_string());
        }
        Ok(())
    })?;
    debug!("read {} scientific names", names.len());
    Ok(names)
}

pub fn open_dump(path: &Path) -> Result<BufReader<File>, TaxLookupError> {
    let file = File::open(path)
        .map_err(|err| TaxLookupError::Filesystem(format!("open {}: {err}", path.display())))?;
    Ok(BufReader::new(file))
}

/// Feeds every non-blank row of a dump to `handle` with its 1-based line
/// number. Rows are decoded lossily; a few old names contain stray Latin-1.
fn for_each_row<R, F>(mut reader: R, file: &str, mut handle: F) -> Result<(), TaxLookupError>
where
    R: BufRead,
    F: FnMut(usize, Vec<&str>) -> Result<(), TaxLookupError>,
{
    let mut buf = Vec::new();
    let mut line = 0usize;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|err| TaxLookupError::Filesystem(format!("read {file}: {err}")))?;
        if read == 0 {
            return Ok(());
        }
        line += 1;
        let text = String::from_utf8_lossy(&buf);
        let row = text.trim_end_matches(['\n', '\r']);
        if row.trim().is_empty() {
            continue;
        }
        handle(line, split_row(row))?;
    }
}

fn split_row(row: &str) -> Vec<&str> {
    row.strip_suffix(ROW_TERMINATOR)
        .unwrap_or(row)
        .split(FIELD_DELIMITER)
        .collect()
}

fn short_row(file: &str, line: usize, expected: usize, found: usize) -> TaxLookupError {
    TaxLookupError::MalformedDump {
        file: file.to_string(),
        line,
        message: format!("expected at least {expected} fields, found {found}"),
    }
}
