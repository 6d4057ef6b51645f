//! # Strata I/O - Ingest Readers and Export Writers
//!
//! This crate provides the format boundary of a Strata node. A [`Reader`]
//! turns external input into table slices under a declared (or discovered)
//! layout; a [`Writer`] renders slices for export.
//!
//! ## Formats
//!
//! - **test**: deterministic synthetic telemetry, for wiring and tests
//! - **zeek**: tab-separated Zeek logs with `#fields`/`#types` headers
//! - **json**: JSON-lines input against a declared layout
//! - **ascii**: human-readable row rendering
//! - **json** (writer): one JSON object per row
//!
//! The remaining formats of the platform (PCAP, Suricata, syslog, CSV) live
//! behind the same two traits and are out of scope here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_core::{Error, Result, Slice, Type};

/// JSON-lines reader against a declared layout
pub mod source_json;

/// Deterministic synthetic telemetry generator
pub mod source_test;

/// Zeek TSV log reader
pub mod source_zeek;

/// Human-readable row rendering
pub mod sink_ascii;

/// One JSON object per row
pub mod sink_json;

mod json_convert;

pub use json_convert::{data_to_json, json_to_data};

/// Produces slices from an external input.
#[async_trait]
pub trait Reader: Send {
    /// Format name, for logging and status reports.
    fn name(&self) -> &str;

    /// Layout of produced slices once known. Readers that learn their
    /// schema from an input header return `None` before the first batch.
    fn layout(&self) -> Option<&Type>;

    /// Reads up to `max_rows` events into one slice. `None` signals end of
    /// input.
    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Slice>>;
}

/// Renders slices for export.
#[async_trait]
pub trait Writer: Send {
    /// Format name, for logging and status reports.
    fn name(&self) -> &str;

    async fn write(&mut self, slice: &Slice) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;
}

/// Import-side options a source passes to its reader, deserialized from the
/// merged `import.*` settings of a spawn invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Input path or glob pattern.
    #[serde(default)]
    pub read: Option<String>,

    /// Textual schema for readers that need a declared layout.
    #[serde(default)]
    pub schema: Option<String>,

    /// Stop after this many events.
    #[serde(default)]
    pub max_events: Option<u64>,

    /// Rows per produced slice.
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            read: None,
            schema: None,
            max_events: None,
            batch_rows: default_batch_rows(),
        }
    }
}

fn default_batch_rows() -> usize {
    65536
}

/// Export-side options a sink passes to its writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriterSettings {
    /// Output path; standard output when absent.
    #[serde(default)]
    pub write: Option<String>,
}

/// Constructs the reader for a format name.
pub fn make_reader(format: &str, settings: &ReaderSettings) -> Result<Box<dyn Reader>> {
    match format {
        "test" => Ok(Box::new(source_test::TestReader::new(
            settings.max_events.unwrap_or(1024),
        ))),
        "zeek" => {
            let path = settings.read.as_deref().ok_or_else(|| {
                Error::unexpected_arguments("the zeek source requires an input path")
            })?;
            Ok(Box::new(source_zeek::ZeekReader::new(path)?))
        }
        "json" => {
            let path = settings.read.as_deref().ok_or_else(|| {
                Error::unexpected_arguments("the json source requires an input path")
            })?;
            let schema = settings.schema.as_deref().ok_or_else(|| {
                Error::unexpected_arguments("the json source requires a schema")
            })?;
            let layout = strata_core::parse_type(schema, &strata_core::SymbolTable::new())?;
            Ok(Box::new(source_json::JsonReader::new(path, layout)?))
        }
        other => Err(Error::invalid_spawn(format!(
            "no reader for format: {other}"
        ))),
    }
}

/// Constructs the writer for a format name.
pub fn make_writer(format: &str, settings: &WriterSettings) -> Result<Box<dyn Writer>> {
    match format {
        "ascii" => Ok(Box::new(sink_ascii::AsciiWriter::open(
            settings.write.as_deref(),
        )?)),
        "json" => Ok(Box::new(sink_json::JsonWriter::open(
            settings.write.as_deref(),
        )?)),
        other => Err(Error::invalid_spawn(format!(
            "no writer for format: {other}"
        ))),
    }
}

/// Expands a path or glob pattern into concrete input files.
pub(crate) fn expand_paths(pattern: &str) -> Result<Vec<std::path::PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)
        .map_err(|e| Error::unexpected_arguments(format!("bad input pattern {pattern}: {e}")))?
    {
        paths.push(entry.map_err(|e| Error::io(e.to_string()))?);
    }
    if paths.is_empty() {
        return Err(Error::io(format!("no files matched: {pattern}")));
    }
    Ok(paths)
}
