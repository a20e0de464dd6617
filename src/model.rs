//! Core data model for one BAF acquisition source
//!
//! The structures here mirror the metadata store's tables after
//! normalization: acquisition keys and per-scan acquisition variables are
//! loaded once per source into maps, and each acquired spectrum becomes a
//! transient [`Scan`] that is handed to the serializer and dropped.

/// Scan polarity as recorded by the vendor format.
///
/// The raw column is a signed small integer; values other than 0/1 have
/// been observed in broken files and are kept as `Unknown` rather than
/// rejected, since polarity only influences param-group selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Unknown,
}

impl Polarity {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Polarity::Positive,
            1 => Polarity::Negative,
            _ => Polarity::Unknown,
        }
    }
}

/// One acquisition configuration, shared by many scans.
///
/// `ms_level` is vendor 0-based: 0 = MS1, 1 = MS2, and so on.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AcquisitionKey {
    pub id: i64,
    pub polarity: Polarity,
    pub scan_mode: i64,
    pub acquisition_mode: i64,
    pub ms_level: i64,
}

/// Per-scan subset of acquisition variables needed downstream.
///
/// Each field is absent when the variable was not recorded for the scan.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumAcquisitionData {
    pub id: i64,
    pub collision_energy: Option<f64>,
    pub msms_isolation_mz: Option<f64>,
    pub quadrupole_isolation_resolution: Option<f64>,
}

impl SpectrumAcquisitionData {
    pub fn empty(id: i64) -> Self {
        Self {
            id,
            collision_energy: None,
            msms_isolation_mz: None,
            quadrupole_isolation_resolution: None,
        }
    }
}

/// One row of the supported-variable dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportedVariable {
    pub id: i64,
    pub permanent_name: String,
    pub var_type: Option<String>,
    pub display_group_name: Option<String>,
    pub display_value_text: Option<String>,
    pub display_format: Option<String>,
    pub display_dimension: Option<String>,
}

/// Raw (non-centroided) signal arrays. Rare path, only materialized when
/// the caller asks for non-line data.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileData {
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// Centroided signal arrays after the level filter.
///
/// `mz` and `intensity` are always equal length; entry i of one pairs
/// with entry i of the other.
#[derive(Clone, Debug, PartialEq)]
pub struct LineData {
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl LineData {
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

/// One acquired spectrum, assembled from the metadata row, the preloaded
/// maps, and the binary store.
///
/// `line_data` is `None` when the scan's array identifiers are incomplete
/// (such a scan is excluded from the emitted spectrum list).
#[derive(Clone, Debug, PartialEq)]
pub struct Scan {
    pub id: i64,
    /// Retention time in seconds.
    pub rt: f64,
    pub segment: i64,
    pub acquisition_key: AcquisitionKey,
    pub acquisition_data: SpectrumAcquisitionData,
    /// Parent scan id; 0 means no parent.
    pub parent: i64,
    pub mz_acq_range_lower: i64,
    pub mz_acq_range_upper: i64,
    pub sum_intensity: f64,
    pub max_intensity: f64,
    pub transformator_id: Option<i64>,
    pub profile_data: Option<ProfileData>,
    pub line_data: Option<LineData>,
}

impl Scan {
    /// The native spectrum identifier used in the emitted document, both
    /// for `spectrum id` and for precursor back-references.
    pub fn native_id(&self) -> String {
        format!("scan={}", self.id)
    }

    pub fn has_line_peaks(&self) -> bool {
        self.line_data.as_ref().is_some_and(|line| !line.is_empty())
    }
}
