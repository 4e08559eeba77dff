#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;

use kira_taxlookup::app::{ProgressEvent, ProgressSink};
use kira_taxlookup::error::TaxLookupError;
use kira_taxlookup::ncbi::TaxdumpClient;
use tracing_subscriber::fmt::MakeWriter;

pub const NAMES_DMP: &str = "1\t|\troot\t|\t\t|\tscientific name\t|\n\
2\t|\tBacteria\t|\tBacteria <bacteria>\t|\tscientific name\t|\n\
2\t|\teubacteria\t|\t\t|\tgenbank common name\t|\n\
561\t|\tEscherichia\t|\t\t|\tscientific name\t|\n\
562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|\n\
562\t|\tE. coli\t|\t\t|\tcommon name\t|\n\
1224\t|\tPseudomonadota\t|\t\t|\tscientific name\t|\n";

pub const NODES_DMP: &str = "1\t|\t1\t|\tno rank\t|\t\t|\t8\t|\n\
2\t|\t1\t|\tsuperkingdom\t|\t\t|\t0\t|\n\
1224\t|\t2\t|\tphylum\t|\t\t|\t0\t|\n\
561\t|\t1224\t|\tgenus\t|\t\t|\t0\t|\n\
562\t|\t561\t|\tspecies\t|\tEC\t|\t0\t|\n";

pub fn taxdump_archive(members: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn full_taxdump_archive() -> Vec<u8> {
    taxdump_archive(&[
        ("citations.dmp", "\n"),
        ("names.dmp", NAMES_DMP),
        ("nodes.dmp", NODES_DMP),
    ])
}

/// Serves a prepared archive instead of downloading.
pub struct MockTaxdump {
    archive: Vec<u8>,
    pub calls: Mutex<Vec<String>>,
}

impl MockTaxdump {
    pub fn new(archive: Vec<u8>) -> Self {
        Self {
            archive,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TaxdumpClient for MockTaxdump {
    fn download_taxdump(&self, url: &str, destination: &Path) -> Result<u64, TaxLookupError> {
        self.calls.lock().unwrap().push(url.to_string());
        std::fs::write(destination, &self.archive)
            .map_err(|err| TaxLookupError::Filesystem(err.to_string()))?;
        Ok(self.archive.len() as u64)
    }
}

pub struct FailingTaxdump;

impl TaxdumpClient for FailingTaxdump {
    fn download_taxdump(&self, url: &str, _destination: &Path) -> Result<u64, TaxLookupError> {
        Err(TaxLookupError::UrlMismatch {
            requested: url.to_string(),
            resolved: "https://example.org/moved".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Runs `f` with a thread-local subscriber and returns its warnings.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}
