//! Metadata-store queries
//!
//! Translates the acquisition container's relational tables into the
//! typed lookup structures consumed by scan assembly. Each map is loaded
//! whole, once per source; the store never streams partial result sets.

use anyhow_ext::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use serde_rusqlite::from_rows;
use std::collections::HashMap;

use crate::model::{AcquisitionKey, Polarity, SpectrumAcquisitionData, SupportedVariable};
use crate::query_utils::table_exists;

pub const SPECTRA_TABLE_NAME: &str = "Spectra";
pub const ACQUISITION_KEYS_TABLE_NAME: &str = "AcquisitionKeys";
pub const VARIABLES_TABLE_NAME: &str = "Variables";
pub const SUPPORTED_VARIABLES_TABLE_NAME: &str = "SupportedVariables";

// The only variable codes retained from the Variables table; everything
// else the instrument records is ignored.
const VAR_COLLISION_ENERGY: i64 = 5;
const VAR_MSMS_ISOLATION_MZ: i64 = 7;
const VAR_QUAD_ISOLATION_RESOLUTION: i64 = 8;

const SPECTRA_COLUMNS: &str = "Id, Rt, Segment, AcquisitionKey, Parent, \
     MzAcqRangeLower, MzAcqRangeUpper, SumIntensity, MaxIntensity, TransformatorId, \
     ProfileMzId, ProfileIntensityId, \
     LineIndexId, LineMzId, LineIntensityId, LineIndexWidthId, LinePeakAreaId, LineSnrId";

/// Check that the four required acquisition tables are present.
pub fn required_tables_present(db: &Connection) -> Result<bool> {
    for table in [
        SPECTRA_TABLE_NAME,
        ACQUISITION_KEYS_TABLE_NAME,
        VARIABLES_TABLE_NAME,
        SUPPORTED_VARIABLES_TABLE_NAME,
    ] {
        if !table_exists(db, table).dot()? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Load all acquisition keys, keyed by id.
pub fn acquisition_keys(db: &Connection) -> Result<HashMap<i64, AcquisitionKey>> {
    let mut stmt = db
        .prepare("SELECT Id, Polarity, ScanMode, AcquisitionMode, MsLevel FROM AcquisitionKeys")
        .dot()?;

    let rows = stmt
        .query_map([], |row| {
            Ok(AcquisitionKey {
                id: row.get(0)?,
                polarity: Polarity::from_raw(row.get(1)?),
                scan_mode: row.get(2)?,
                acquisition_mode: row.get(3)?,
                ms_level: row.get(4)?,
            })
        })
        .dot()?;

    let mut keys = HashMap::new();
    for key in rows {
        let key = key.dot()?;
        keys.insert(key.id, key);
    }
    Ok(keys)
}

/// Load the per-scan acquisition variables, keyed by scan id.
///
/// Scans the Variables table ordered by scan id and retains the three
/// known variable codes. A spectrum that only recorded unknown codes
/// still gets an (empty) entry, so scan assembly can distinguish "no
/// variables of interest" from "scan missing from the table".
pub fn spectra_acquisition_data(db: &Connection) -> Result<HashMap<i64, SpectrumAcquisitionData>> {
    let mut stmt = db
        .prepare("SELECT Spectrum, Variable, Value FROM Variables ORDER BY Spectrum")
        .dot()?;
    let mut rows = stmt.query([]).dot()?;

    let mut data: HashMap<i64, SpectrumAcquisitionData> = HashMap::new();
    while let Some(row) = rows.next().dot()? {
        let id: i64 = row.get(0).dot()?;
        let variable: i64 = row.get(1).dot()?;

        let entry = data
            .entry(id)
            .or_insert_with(|| SpectrumAcquisitionData::empty(id));

        match variable {
            VAR_COLLISION_ENERGY => entry.collision_energy = Some(row.get(2).dot()?),
            VAR_MSMS_ISOLATION_MZ => entry.msms_isolation_mz = Some(row.get(2).dot()?),
            VAR_QUAD_ISOLATION_RESOLUTION => {
                entry.quadrupole_isolation_resolution = Some(row.get(2).dot()?)
            }
            _ => {}
        }
    }

    Ok(data)
}

/// Load the supported-variable dictionary, keyed by variable code.
pub fn supported_variables(db: &Connection) -> Result<HashMap<i64, SupportedVariable>> {
    let mut stmt = db
        .prepare(
            "SELECT Variable, PermanentName, Type, DisplayGroupName, \
             DisplayValueText, DisplayFormat, DisplayDimension FROM SupportedVariables",
        )
        .dot()?;

    let rows = stmt
        .query_map([], |row| {
            Ok(SupportedVariable {
                id: row.get(0)?,
                permanent_name: row.get(1)?,
                var_type: row.get(2)?,
                display_group_name: row.get(3)?,
                display_value_text: row.get(4)?,
                display_format: row.get(5)?,
                display_dimension: row.get(6)?,
            })
        })
        .dot()?;

    let mut variables = HashMap::new();
    for variable in rows {
        let variable = variable.dot()?;
        variables.insert(variable.id, variable);
    }
    Ok(variables)
}

/// One raw row of the Spectra table.
///
/// Array identifier columns are nullable; which of them are populated
/// decides whether profile and line data can be materialized at all.
#[derive(Clone, Debug, Deserialize)]
pub struct SpectrumRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Rt")]
    pub rt: f64,
    #[serde(rename = "Segment")]
    pub segment: i64,
    #[serde(rename = "AcquisitionKey")]
    pub acquisition_key: i64,
    #[serde(rename = "Parent")]
    pub parent: Option<i64>,
    #[serde(rename = "MzAcqRangeLower")]
    pub mz_acq_range_lower: i64,
    #[serde(rename = "MzAcqRangeUpper")]
    pub mz_acq_range_upper: i64,
    #[serde(rename = "SumIntensity")]
    pub sum_intensity: f64,
    #[serde(rename = "MaxIntensity")]
    pub max_intensity: f64,
    #[serde(rename = "TransformatorId")]
    pub transformator_id: Option<i64>,
    #[serde(rename = "ProfileMzId")]
    pub profile_mz_id: Option<i64>,
    #[serde(rename = "ProfileIntensityId")]
    pub profile_intensity_id: Option<i64>,
    #[serde(rename = "LineIndexId")]
    pub line_index_id: Option<i64>,
    #[serde(rename = "LineMzId")]
    pub line_mz_id: Option<i64>,
    #[serde(rename = "LineIntensityId")]
    pub line_intensity_id: Option<i64>,
    #[serde(rename = "LineIndexWidthId")]
    pub line_index_width_id: Option<i64>,
    #[serde(rename = "LinePeakAreaId")]
    pub line_peak_area_id: Option<i64>,
    #[serde(rename = "LineSnrId")]
    pub line_snr_id: Option<i64>,
}

/// Fetch the Spectra rows, ascending by id, optionally restricted to one
/// scan id.
pub fn spectrum_records(db: &Connection, scan_id: Option<i64>) -> Result<Vec<SpectrumRecord>> {
    let mut records = Vec::new();

    match scan_id {
        None => {
            let mut stmt = db
                .prepare(&format!(
                    "SELECT {} FROM Spectra ORDER BY Id",
                    SPECTRA_COLUMNS
                ))
                .dot()?;
            let rows = stmt.query([]).dot()?;
            for record in from_rows::<SpectrumRecord>(rows) {
                records.push(record.dot()?);
            }
        }
        Some(id) => {
            let mut stmt = db
                .prepare(&format!("SELECT {} FROM Spectra WHERE Id = ?1", SPECTRA_COLUMNS))
                .dot()?;
            let rows = stmt.query([id]).dot()?;
            for record in from_rows::<SpectrumRecord>(rows) {
                records.push(record.dot()?);
            }
        }
    }

    Ok(records)
}
