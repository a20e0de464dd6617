//! baf2mzml: convert Bruker BAF acquisitions to the mzML interchange format
//!
//! A BAF acquisition container is a relational metadata store (SQLite)
//! plus an opaque binary array store. This library extracts per-scan
//! acquisition metadata and signal arrays, reconciles them into a
//! normalized scan model, and streams that model out as byte-offset-
//! indexed mzML with base64-encoded binary payloads.
//!
//! The binary array store is an external collaborator, modeled by the
//! [`ArrayStorage`] trait; the metadata store is read through rusqlite
//! with a fixed schema. The GUI/CLI driver is likewise external: it
//! supplies source locations and a minimum-intensity filter, and gets
//! back success or a contextual error per source.
//!
//! # Quick Start
//!
//! ```no_run
//! use baf2mzml::{BafSource, InMemoryStorage};
//!
//! let storage = InMemoryStorage::new(); // vendor-bound storage in production
//! let mut source = BafSource::open("run1.d/analysis.sqlite", storage).unwrap();
//! source.set_level_filter(100.0);
//! source.save_as_mzml("run1.mzML").unwrap();
//! ```
//!
//! # Module Organization
//!
//! - [`model`]: core data structures (AcquisitionKey, Scan, LineData, …)
//! - [`queries`]: low-level metadata-store query functions
//! - [`iterator`]: scan assembly, intensity filter, iteration utilities
//! - [`storage`]: the binary array store collaborator trait
//! - [`codec`]: fixed-width little-endian base64 array encoding
//! - [`writer`]: the streaming mzML serialization engine
//! - [`error`]: the conversion failure taxonomy

pub mod codec;
pub mod error;
pub mod iterator;
pub mod model;
pub mod queries;
pub mod query_utils;
pub mod storage;
pub mod writer;

// Re-export main types for convenience
pub use error::ConvertError;
pub use model::{
    AcquisitionKey, LineData, Polarity, ProfileData, Scan, SpectrumAcquisitionData,
    SupportedVariable,
};
pub use storage::{ArrayStorage, InMemoryStorage};
pub use writer::{MzMlWriter, SpectrumOffset, WriterState};

use anyhow::anyhow;
use anyhow_ext::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::iterator::ScanIterator;
use crate::query_utils::query_single_i64;

// Every metadata query is bounded; a stalled store fails rather than
// hanging the conversion.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// One open acquisition source: the metadata-store connection plus the
/// binary array store handle, scoped to a single conversion.
///
/// Both resources are released when the value is dropped, on every exit
/// path; [`close`](Self::close) releases them explicitly and surfaces
/// close errors. Sources share no state, so an outer driver may process
/// several `BafSource` values in parallel, one per source.
pub struct BafSource<S: ArrayStorage> {
    connection: Connection,
    storage: S,
    path: PathBuf,
    level_filter: Option<f64>,
}

impl<S: ArrayStorage> std::fmt::Debug for BafSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BafSource")
            .field("path", &self.path)
            .field("level_filter", &self.level_filter)
            .finish_non_exhaustive()
    }
}

impl<S: ArrayStorage> BafSource<S> {
    // ========================================================================
    // Construction and lifecycle
    // ========================================================================

    /// Open the metadata store at `path` together with the source's
    /// binary array store.
    pub fn open(path: impl AsRef<Path>, storage: S) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let connection = Connection::open(&path)
            .with_context(|| format!("cannot open metadata store at {}", path.display()))?;
        Self::from_connection(connection, storage, path)
    }

    /// Wrap an already-open connection (used by tests and embedders).
    pub fn from_connection(connection: Connection, storage: S, path: PathBuf) -> Result<Self> {
        connection.busy_timeout(QUERY_TIMEOUT).dot()?;

        if !queries::required_tables_present(&connection).dot()? {
            return Err(anyhow!(ConvertError::ConnectionNotOpen {
                path: path.display().to_string(),
            }));
        }

        Ok(Self {
            connection,
            storage,
            path,
            level_filter: None,
        })
    }

    /// Close the source explicitly, surfacing connection close errors.
    pub fn close(self) -> Result<()> {
        self.connection
            .close()
            .map_err(|(_, e)| anyhow::Error::new(e))
            .with_context(|| format!("closing metadata store at {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Drop line peaks whose intensity does not strictly exceed `level`.
    pub fn set_level_filter(&mut self, level: f64) {
        debug!("level filter set to {}", level);
        self.level_filter = Some(level);
    }

    pub fn level_filter(&self) -> Option<f64> {
        self.level_filter
    }

    // ========================================================================
    // Acquisition data access
    // ========================================================================

    /// Load all acquisition keys, keyed by id.
    pub fn acquisition_keys(&self) -> Result<HashMap<i64, AcquisitionKey>> {
        queries::acquisition_keys(&self.connection)
    }

    /// Load the per-scan acquisition variables, keyed by scan id.
    pub fn spectra_acquisition_data(&self) -> Result<HashMap<i64, SpectrumAcquisitionData>> {
        queries::spectra_acquisition_data(&self.connection)
    }

    /// Load the supported-variable dictionary, keyed by variable code.
    pub fn supported_variables(&self) -> Result<HashMap<i64, SupportedVariable>> {
        queries::supported_variables(&self.connection)
    }

    /// Number of acquired spectra in the source.
    pub fn scan_count(&self) -> Result<i64> {
        Ok(query_single_i64(&self.connection, "SELECT count(Id) FROM Spectra")?.unwrap_or(0))
    }

    // ========================================================================
    // Scan iteration
    // ========================================================================

    /// Visit every scan, in ascending id order. `scan_id` restricts the
    /// query to one spectrum; `line_only` skips profile arrays.
    ///
    /// The lookup maps are rebuilt per call; do not invoke this in a
    /// tight per-scan loop.
    pub fn for_each_scan<F>(&self, scan_id: Option<i64>, line_only: bool, visit: F) -> Result<()>
    where
        F: FnMut(&Scan) -> Result<()>,
    {
        iterator::for_each_scan(
            &self.connection,
            &self.storage,
            scan_id,
            line_only,
            self.level_filter,
            visit,
        )
        .with_context(|| format!("iterating scans of {}", self.path.display()))
    }

    /// Streaming variant of [`for_each_scan`](Self::for_each_scan).
    pub fn scan_iter(&self, scan_id: Option<i64>, line_only: bool) -> Result<ScanIterator<'_, S>> {
        ScanIterator::new(
            &self.connection,
            &self.storage,
            scan_id,
            line_only,
            self.level_filter,
        )
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Convert this source to one mzML document at `output`.
    ///
    /// Scans without line peaks are excluded from the spectrum list. Any
    /// failure aborts the document; a partially written output file is
    /// invalid and should be discarded.
    pub fn save_as_mzml(&self, output: impl AsRef<Path>) -> Result<()> {
        let output = output.as_ref();

        let mut scans = Vec::new();
        self.for_each_scan(None, true, |scan| {
            if scan.has_line_peaks() {
                scans.push(scan.clone());
            } else {
                debug!("scan {} has no line peaks, excluded from output", scan.id);
            }
            Ok(())
        })?;

        let source_path = self.path.display().to_string();
        let sample_name = self
            .path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_path.clone());

        let file = File::create(output)
            .with_context(|| format!("cannot create output file {}", output.display()))?;
        let mut writer = MzMlWriter::new(BufWriter::new(file));

        writer.write_declaration()?;
        writer.write_header(&source_path)?;
        writer.write_param_groups()?;
        writer.write_sample_list(&sample_name)?;
        writer.open_run(&sample_name, scans.len())?;
        for scan in &scans {
            writer.write_spectrum(scan)?;
        }
        writer.close_run()?;
        writer.write_index()?;
        writer.close_document()?;

        info!(
            "wrote {} spectra from {} to {}",
            scans.len(),
            source_path,
            output.display()
        );
        Ok(())
    }
}
