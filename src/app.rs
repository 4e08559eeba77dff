use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{RankSelection, TaxonQuery};
use crate::error::TaxLookupError;
use crate::fs_util::extract_tar_gz_members;
use crate::ncbi::TaxdumpClient;
use crate::store::Store;
use crate::taxonomy::{
    NAMES_FILE, NODES_FILE, TaxonomyTable, open_dump, read_scientific_names, select_ranks,
};

#[derive(Debug, Clone)]
pub struct LookupOptions {
    /// 1-based column holding the taxon ID.
    pub column: usize,
    pub ranks: RankSelection,
    pub force_download: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            column: 1,
            ranks: RankSelection::linnean(),
            force_download: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub lines: usize,
    pub comments: usize,
    pub annotated: usize,
    pub not_found: usize,
    pub multi_id: usize,
    pub fetched: bool,
    pub taxa_loaded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub source: String,
    pub archive_bytes: u64,
    pub extracted: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: TaxdumpClient> {
    store: Store,
    client: C,
    taxdump_url: String,
}

impl<C: TaxdumpClient> App<C> {
    pub fn new(store: Store, client: C, taxdump_url: impl Into<String>) -> Self {
        Self {
            store,
            client,
            taxdump_url: taxdump_url.into(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Whether the next taxonomy load has to download the dump first.
    pub fn needs_fetch(&self, force_download: bool) -> bool {
        force_download || !self.store.has_taxdump()
    }

    /// Replaces the cached dump with a fresh copy of the remote archive.
    pub fn fetch_taxdump(&self, sink: &dyn ProgressSink) -> Result<FetchResult, TaxLookupError> {
        self.store.ensure_data_dir()?;
        for path in self.store.remove_stale()? {
            debug!("removed stale {path}");
        }

        let archive = self.store.archive_path();
        sink.event(ProgressEvent {
            message: format!("phase=Download; downloading {} to {archive}", self.taxdump_url),
            elapsed: None,
        });
        let started = Instant::now();
        let archive_bytes = self
            .client
            .download_taxdump(&self.taxdump_url, archive.as_std_path())?;
        sink.event(ProgressEvent {
            message: format!("phase=Download; {archive_bytes} bytes written"),
            elapsed: Some(started.elapsed()),
        });

        let members = [NODES_FILE, NAMES_FILE];
        sink.event(ProgressEvent {
            message: format!("phase=Extract; extracting {} from {archive}", members.join(", ")),
            elapsed: None,
        });
        let started = Instant::now();
        let extracted = extract_tar_gz_members(
            archive.as_std_path(),
            &members,
            self.store.data_dir().as_std_path(),
        )?;
        sink.event(ProgressEvent {
            message: "phase=Extract; done".to_string(),
            elapsed: Some(started.elapsed()),
        });

        info!(
            "taxonomy dump fetched from {} ({archive_bytes} bytes)",
            self.taxdump_url
        );
        Ok(FetchResult {
            source: self.taxdump_url.clone(),
            archive_bytes,
            extracted: extracted
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        })
    }

    /// Parses the cached dump, names first. Does not download.
    pub fn load_taxonomy(&self, sink: &dyn ProgressSink) -> Result<TaxonomyTable, TaxLookupError> {
        let names_path = self.store.names_path();
        sink.event(ProgressEvent {
            message: format!("phase=Load; reading {names_path}"),
            elapsed: None,
        });
        let started = Instant::now();
        let names = read_scientific_names(open_dump(names_path.as_std_path())?)?;
        sink.event(ProgressEvent {
            message: format!("phase=Load; {} scientific names read", names.len()),
            elapsed: Some(started.elapsed()),
        });

        let nodes_path = self.store.nodes_path();
        sink.event(ProgressEvent {
            message: format!("phase=Load; reading {nodes_path}"),
            elapsed: None,
        });
        let started = Instant::now();
        let table = TaxonomyTable::from_nodes(names, open_dump(nodes_path.as_std_path())?)?;
        sink.event(ProgressEvent {
            message: format!("phase=Load; {} taxa loaded", table.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(table)
    }

    pub fn process_file<W: Write>(
        &self,
        path: &Path,
        output: W,
        options: &LookupOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ProcessSummary, TaxLookupError> {
        if !path.is_file() {
            return Err(TaxLookupError::InputNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|err| TaxLookupError::InputRead {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        self.process(
            BufReader::new(file),
            &path.display().to_string(),
            output,
            options,
            sink,
        )
    }

    /// Annotates every data line of `input` with the selected lineage names.
    ///
    /// The taxonomy is fetched and loaded on the first data line only, so an
    /// input made of comments never touches the cache. Lines are handled as
    /// bytes and written back unchanged, whatever their encoding.
    pub fn process<R: BufRead, W: Write>(
        &self,
        mut input: R,
        source: &str,
        mut output: W,
        options: &LookupOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ProcessSummary, TaxLookupError> {
        if options.column == 0 {
            return Err(TaxLookupError::InvalidColumn(options.column));
        }

        let mut summary = ProcessSummary::default();
        let mut table: Option<TaxonomyTable> = None;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .map_err(|err| TaxLookupError::InputRead {
                    path: source.to_string(),
                    message: err.to_string(),
                })?;
            if read == 0 {
                break;
            }
            summary.lines += 1;
            let line_no = summary.lines;
            let line = strip_line_ending(&buf);

            if line.trim_ascii_start().starts_with(b"#") {
                summary.comments += 1;
                write_line(&mut output, line, &[])?;
                continue;
            }

            let fields: Vec<&[u8]> = line.split(|byte| *byte == b'\t').collect();
            if fields.len() < options.column {
                return Err(TaxLookupError::MissingColumn {
                    line: line_no,
                    column: options.column,
                    found: fields.len(),
                });
            }

            let id_field = String::from_utf8_lossy(fields[options.column - 1]);
            let query = TaxonQuery::from_field(&id_field);
            if query.is_ambiguous() {
                summary.multi_id += 1;
                warn!(
                    "line {line_no}: multiple taxon IDs found, using '{}' and ignoring '{}'",
                    query.id,
                    query.discarded.join(";")
                );
            }

            let taxonomy = match table {
                Some(ref taxonomy) => taxonomy,
                None => {
                    if self.needs_fetch(options.force_download) {
                        self.fetch_taxdump(sink)?;
                        summary.fetched = true;
                    }
                    let loaded = self.load_taxonomy(sink)?;
                    summary.taxa_loaded = loaded.len();
                    &*table.insert(loaded)
                }
            };

            if !taxonomy.contains(query.id.as_str()) {
                summary.not_found += 1;
                warn!("line {line_no}: taxon ID '{}' not found", query.id);
                write_line(&mut output, line, &[])?;
                continue;
            }

            let lineage = taxonomy.lineage(query.id.as_str())?;
            let values = select_ranks(&lineage, &options.ranks);
            summary.annotated += 1;
            write_line(&mut output, line, &values)?;
        }

        output
            .flush()
            .map_err(|err| TaxLookupError::Output(err.to_string()))?;
        Ok(summary)
    }
}

/// The original line followed by one tab-prefixed field per value.
pub fn format_record(line: &[u8], values: &[&str]) -> Vec<u8> {
    let extra: usize = values.iter().map(|value| value.len() + 1).sum();
    let mut record = Vec::with_capacity(line.len() + extra + 1);
    record.extend_from_slice(line);
    for value in values {
        record.push(b'\t');
        record.extend_from_slice(value.as_bytes());
    }
    record
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn write_line<W: Write>(
    output: &mut W,
    line: &[u8],
    values: &[&str],
) -> Result<(), TaxLookupError> {
    let mut record = format_record(line, values);
    record.push(b'\n');
    output
        .write_all(&record)
        .map_err(|err| TaxLookupError::Output(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_values_is_unchanged() {
        assert_eq!(format_record(b"read1\t562", &[]), b"read1\t562");
    }

    #[test]
    fn record_values_are_tab_prefixed() {
        assert_eq!(
            format_record(b"read1\t562", &["Bacteria", "Escherichia coli"]),
            b"read1\t562\tBacteria\tEscherichia coli"
        );
    }

    #[test]
    fn line_endings_are_stripped() {
        assert_eq!(strip_line_ending(b"562\r\n"), b"562");
        assert_eq!(strip_line_ending(b"562\n"), b"562");
        assert_eq!(strip_line_ending(b"562"), b"562");
    }
}
