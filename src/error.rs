use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TaxLookupError {
    #[error("input file \"{}\" does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to read input {path}: {message}")]
    InputRead { path: String, message: String },

    #[error(
        "column {column} was requested for taxon IDs, but line {line} only has {found} column(s)"
    )]
    #[diagnostic(help("check the --column value; columns are counted from 1 and split on tabs"))]
    MissingColumn {
        line: usize,
        column: usize,
        found: usize,
    },

    #[error("invalid column index {0}: columns are counted from 1")]
    InvalidColumn(usize),

    #[error("invalid rank selection: {0}")]
    InvalidRanks(String),

    #[error("taxonomy download failed: {0}")]
    TaxdumpHttp(String),

    #[error("taxonomy server returned status {status}: {message}")]
    TaxdumpStatus { status: u16, message: String },

    #[error("taxonomy download was redirected from {requested} to {resolved}")]
    UrlMismatch { requested: String, resolved: String },

    #[error("taxonomy archive does not contain {0}")]
    MissingArchiveMember(String),

    #[error("malformed {file} at line {line}: {message}")]
    MalformedDump {
        file: String,
        line: usize,
        message: String,
    },

    #[error("nodes.dmp line {line}: taxon {tax_id} has no scientific name in names.dmp")]
    #[diagnostic(help("the cached dump looks inconsistent, re-download it with --download"))]
    OrphanNode { line: usize, tax_id: String },

    #[error("lineage of taxon {start} loops back to taxon {revisited} without reaching the root")]
    CyclicLineage { start: String, revisited: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write output: {0}")]
    Output(String),
}
