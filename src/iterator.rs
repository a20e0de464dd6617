//! Scan model assembly and iteration
//!
//! Joins the Spectra rows with the preloaded acquisition-key and
//! acquisition-data maps, reads the signal arrays from the binary store,
//! applies the minimum-intensity filter to line data, and yields one
//! [`Scan`] per acquired spectrum in query order (ascending scan id).
//!
//! Two access styles are offered, the visitor [`for_each_scan`] and the
//! streaming [`ScanIterator`]. Both build the lookup maps once per call;
//! neither should be invoked in a tight per-scan loop.

use anyhow::anyhow;
use anyhow_ext::{Context, Result};
use fallible_iterator::FallibleIterator;
use itertools::Itertools;
use log::debug;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::error::ConvertError;
use crate::model::{AcquisitionKey, LineData, ProfileData, Scan, SpectrumAcquisitionData};
use crate::queries::{
    SpectrumRecord, acquisition_keys, spectra_acquisition_data, spectrum_records,
};
use crate::storage::ArrayStorage;

/// Visit every scan of the source, in query order.
///
/// `scan_id` restricts the underlying query to a single spectrum.
/// `line_only` skips materialization of profile arrays (the common path).
pub fn for_each_scan<S, F>(
    db: &Connection,
    storage: &S,
    scan_id: Option<i64>,
    line_only: bool,
    level_filter: Option<f64>,
    mut visit: F,
) -> Result<()>
where
    S: ArrayStorage,
    F: FnMut(&Scan) -> Result<()>,
{
    let mut iter = ScanIterator::new(db, storage, scan_id, line_only, level_filter)?;
    while let Some(scan) = iter.next()? {
        visit(&scan)?;
    }
    Ok(())
}

/// Streaming scan iterator.
///
/// The header rows are prefetched in one query (the source system loads
/// whole result sets into memory); the binary arrays are read lazily per
/// `next()`, so a corrupt array surfaces exactly at the failing scan.
pub struct ScanIterator<'a, S: ArrayStorage> {
    storage: &'a S,
    keys: HashMap<i64, AcquisitionKey>,
    acquisition_data: HashMap<i64, SpectrumAcquisitionData>,
    records: std::vec::IntoIter<SpectrumRecord>,
    line_only: bool,
    level_filter: Option<f64>,
}

impl<'a, S: ArrayStorage> ScanIterator<'a, S> {
    pub fn new(
        db: &Connection,
        storage: &'a S,
        scan_id: Option<i64>,
        line_only: bool,
        level_filter: Option<f64>,
    ) -> Result<Self> {
        Ok(Self {
            storage,
            keys: acquisition_keys(db).dot()?,
            acquisition_data: spectra_acquisition_data(db).dot()?,
            records: spectrum_records(db, scan_id).dot()?.into_iter(),
            line_only,
            level_filter,
        })
    }
}

impl<S: ArrayStorage> FallibleIterator for ScanIterator<'_, S> {
    type Item = Scan;
    type Error = anyhow::Error;

    fn next(&mut self) -> Result<Option<Scan>> {
        match self.records.next() {
            None => Ok(None),
            Some(record) => assemble_scan(
                self.storage,
                &self.keys,
                &self.acquisition_data,
                record,
                self.line_only,
                self.level_filter,
            )
            .map(Some),
        }
    }
}

fn assemble_scan<S: ArrayStorage>(
    storage: &S,
    keys: &HashMap<i64, AcquisitionKey>,
    acquisition_data: &HashMap<i64, SpectrumAcquisitionData>,
    record: SpectrumRecord,
    line_only: bool,
    level_filter: Option<f64>,
) -> Result<Scan> {
    let key = keys.get(&record.acquisition_key).copied().ok_or_else(|| {
        anyhow!(ConvertError::InvalidReference {
            scan_id: record.id,
            referent: "acquisition key",
            reference_id: record.acquisition_key,
        })
    })?;

    let acquisition = acquisition_data.get(&record.id).cloned().ok_or_else(|| {
        anyhow!(ConvertError::InvalidReference {
            scan_id: record.id,
            referent: "acquisition data for spectrum",
            reference_id: record.id,
        })
    })?;

    let profile_data = if line_only {
        None
    } else {
        read_profile_data(storage, &record)?
    };
    let line_data = read_line_data(storage, &record, level_filter)?;

    Ok(Scan {
        id: record.id,
        rt: record.rt,
        segment: record.segment,
        acquisition_key: key,
        acquisition_data: acquisition,
        parent: record.parent.unwrap_or(0),
        mz_acq_range_lower: record.mz_acq_range_lower,
        mz_acq_range_upper: record.mz_acq_range_upper,
        sum_intensity: record.sum_intensity,
        max_intensity: record.max_intensity,
        transformator_id: record.transformator_id,
        profile_data,
        line_data,
    })
}

fn read_profile_data<S: ArrayStorage>(
    storage: &S,
    record: &SpectrumRecord,
) -> Result<Option<ProfileData>> {
    let (Some(mz_id), Some(intensity_id)) = (record.profile_mz_id, record.profile_intensity_id)
    else {
        return Ok(None);
    };

    Ok(Some(ProfileData {
        mz: read_array(storage, record.id, mz_id)?,
        intensity: read_array(storage, record.id, intensity_id)?,
    }))
}

fn read_line_data<S: ArrayStorage>(
    storage: &S,
    record: &SpectrumRecord,
    level_filter: Option<f64>,
) -> Result<Option<LineData>> {
    // The SNR array id must be recorded even though SNR values are never
    // read afterwards; a scan without it carries no usable line data.
    // TODO: drop the SNR precondition once confirmed nothing downstream
    // ever consumed it.
    let (Some(mz_id), Some(intensity_id), Some(_snr_id)) = (
        record.line_mz_id,
        record.line_intensity_id,
        record.line_snr_id,
    ) else {
        debug!("scan {}: incomplete line array ids, no line data", record.id);
        return Ok(None);
    };

    let mz = read_array(storage, record.id, mz_id)?;
    let intensity = read_array(storage, record.id, intensity_id)?;

    let (mz, intensity) = match level_filter {
        None => (mz, intensity),
        Some(level) => filter_line_pairs(&mz, &intensity, level),
    };

    Ok(Some(LineData { mz, intensity }))
}

/// Drop every (m/z, intensity) pair whose intensity does not strictly
/// exceed `level`, preserving co-indexing and original order.
pub fn filter_line_pairs(mz: &[f64], intensity: &[f64], level: f64) -> (Vec<f64>, Vec<f64>) {
    let kept = intensity.iter().positions(|&v| v > level).collect_vec();
    (
        kept.iter().map(|&i| mz[i]).collect(),
        kept.iter().map(|&i| intensity[i]).collect(),
    )
}

fn read_array<S: ArrayStorage>(storage: &S, scan_id: i64, array_id: i64) -> Result<Vec<f64>> {
    storage.read_f64_array(array_id).map_err(|e| {
        anyhow!(ConvertError::BinaryRead {
            scan_id,
            array_id,
            detail: format!("{e:#}"),
        })
    })
}
