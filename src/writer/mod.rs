//! Streaming mzML serialization engine
//!
//! Writes one self-describing mzML 1.1.0 document per source in a single
//! forward pass, without buffering the whole document. The writer is the
//! sole owner of byte-position bookkeeping: every write goes through
//! [`MzMlWriter::write_raw`], which updates the running counter together
//! with the underlying write, so the offsets recorded for the trailing
//! index are exact.
//!
//! The document lifecycle is a one-shot state machine:
//!
//! `Start → DeclarationWritten → HeaderWritten → ParamGroupsWritten →
//! SampleListWritten → RunOpen → [spectrum]* → RunClosed → IndexWritten →
//! DocumentClosed`
//!
//! Calling a transition out of order is a programmer error and fails with
//! [`ConvertError::IllegalState`]. Any failure while emitting a spectrum
//! aborts the whole document; a partially written output file is invalid
//! and must be discarded or re-created.

pub mod params;

use anyhow::anyhow;
use anyhow_ext::{Context, Result};
use log::debug;
use std::io::Write;
use std::path::Path;

use crate::codec::{encode_f32_base64, encode_f64_base64};
use crate::error::ConvertError;
use crate::model::{Polarity, Scan};
use crate::writer::params::{
    CvParam, MS1_PARAM_GROUP_ID, MS2_PARAM_GROUP_ID, SampleRecord, common_param_groups,
    xml_escape,
};

pub const MZML_VERSION: &str = "1.1.0";

const SAMPLE_ID: &str = "sample1";
const SOURCE_FILE_ID: &str = "SF1";
const SOFTWARE_ID: &str = "baf2mzml";
const INSTRUMENT_CONFIGURATION_ID: &str = "IC1";
const DATA_PROCESSING_ID: &str = "baf2mzml_conversion";

// Fixed scan window emitted for every scan.
const SCAN_WINDOW_LOWER_MZ: f64 = 400.0;
const SCAN_WINDOW_UPPER_MZ: f64 = 1800.0;

/// Serialization progress; transitions are one-shot and strictly ordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum WriterState {
    Start,
    DeclarationWritten,
    HeaderWritten,
    ParamGroupsWritten,
    SampleListWritten,
    RunOpen,
    RunClosed,
    IndexWritten,
    DocumentClosed,
}

/// Byte position of one emitted spectrum, collected in emission order.
///
/// `position` is the exact byte count of everything written before the
/// `<spectrum …>` opening tag.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumOffset {
    pub id_ref: String,
    pub position: u64,
}

pub struct MzMlWriter<W: Write> {
    out: W,
    position: u64,
    state: WriterState,
    offsets: Vec<SpectrumOffset>,
    spectrum_index: usize,
    index_list_position: u64,
}

impl<W: Write> MzMlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            position: 0,
            state: WriterState::Start,
            offsets: Vec::new(),
            spectrum_index: 0,
            index_list_position: 0,
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Offsets recorded so far, in emission order.
    pub fn offsets(&self) -> &[SpectrumOffset] {
        &self.offsets
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).dot()?;
        self.position += text.len() as u64;
        Ok(())
    }

    fn write_cv(&mut self, indent: &str, param: &CvParam) -> Result<()> {
        self.write_raw(&format!("{}{}\n", indent, param.to_xml()))
    }

    fn expect_state(&self, expected: WriterState) -> Result<()> {
        if self.state != expected {
            return Err(anyhow!(ConvertError::IllegalState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            }));
        }
        Ok(())
    }

    /// Write the XML declaration.
    pub fn write_declaration(&mut self) -> Result<()> {
        self.expect_state(WriterState::Start)?;
        self.write_raw("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n")?;
        self.state = WriterState::DeclarationWritten;
        Ok(())
    }

    /// Open the document roots and write the controlled-vocabulary list
    /// and file description for `source_path`.
    pub fn write_header(&mut self, source_path: &str) -> Result<()> {
        self.expect_state(WriterState::DeclarationWritten)?;

        self.write_raw(
            "<indexedmzML xmlns=\"http://psi.hupo.org/ms/mzml\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://psi.hupo.org/ms/mzml \
             http://psidev.info/files/ms/mzML/xsd/mzML1.1.1_idx.xsd\">\n",
        )?;
        self.write_raw(&format!(
            "  <mzML xmlns=\"http://psi.hupo.org/ms/mzml\" version=\"{}\">\n",
            MZML_VERSION
        ))?;

        self.write_raw("    <cvList count=\"2\">\n")?;
        self.write_raw(
            "      <cv id=\"MS\" fullName=\"Proteomics Standards Initiative Mass Spectrometry Ontology\" \
             version=\"4.1.0\" URI=\"https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo\"/>\n",
        )?;
        self.write_raw(
            "      <cv id=\"UO\" fullName=\"Unit Ontology\" version=\"09:04:2014\" \
             URI=\"https://raw.githubusercontent.com/bio-ontology-research-group/unit-ontology/master/unit.obo\"/>\n",
        )?;
        self.write_raw("    </cvList>\n")?;

        let path = Path::new(source_path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_path.to_string());
        let location = path
            .parent()
            .map(|p| format!("file://{}", p.display()))
            .unwrap_or_else(|| "file://".to_string());

        self.write_raw("    <fileDescription>\n")?;
        self.write_raw("      <fileContent>\n")?;
        self.write_cv("        ", &CvParam::ms1_spectrum())?;
        self.write_cv("        ", &CvParam::msn_spectrum())?;
        self.write_raw("      </fileContent>\n")?;
        self.write_raw("      <sourceFileList count=\"1\">\n")?;
        self.write_raw(&format!(
            "        <sourceFile id=\"{}\" name=\"{}\" location=\"{}\"/>\n",
            SOURCE_FILE_ID,
            xml_escape(&file_name),
            xml_escape(&location),
        ))?;
        self.write_raw("      </sourceFileList>\n")?;
        self.write_raw("    </fileDescription>\n")?;

        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Write the two fixed referenceable parameter groups.
    pub fn write_param_groups(&mut self) -> Result<()> {
        self.expect_state(WriterState::HeaderWritten)?;

        let groups = common_param_groups();
        self.write_raw(&format!(
            "    <referenceableParamGroupList count=\"{}\">\n",
            groups.len()
        ))?;
        for group in &groups {
            self.write_raw(&format!(
                "      <referenceableParamGroup id=\"{}\">\n",
                group.id
            ))?;
            for param in &group.params {
                self.write_cv("        ", param)?;
            }
            self.write_raw("      </referenceableParamGroup>\n")?;
        }
        self.write_raw("    </referenceableParamGroupList>\n")?;

        self.state = WriterState::ParamGroupsWritten;
        Ok(())
    }

    /// Write the single-sample list.
    pub fn write_sample_list(&mut self, sample_name: &str) -> Result<()> {
        self.expect_state(WriterState::ParamGroupsWritten)?;

        let sample = SampleRecord {
            id: SAMPLE_ID.to_string(),
            name: sample_name.to_string(),
        };
        self.write_raw("    <sampleList count=\"1\">\n")?;
        self.write_raw(&format!("      {}\n", sample.to_xml()))?;
        self.write_raw("    </sampleList>\n")?;

        self.state = WriterState::SampleListWritten;
        Ok(())
    }

    /// Write the fixed software/instrument/data-processing preamble and
    /// open the run and its spectrum list.
    ///
    /// `spectrum_count` must be the number of spectra that will actually
    /// be written before [`close_run`](Self::close_run).
    pub fn open_run(&mut self, run_id: &str, spectrum_count: usize) -> Result<()> {
        self.expect_state(WriterState::SampleListWritten)?;

        self.write_raw("    <softwareList count=\"1\">\n")?;
        self.write_raw(&format!(
            "      <software id=\"{}\" version=\"{}\">\n",
            SOFTWARE_ID,
            env!("CARGO_PKG_VERSION")
        ))?;
        self.write_cv("        ", &CvParam::custom_software(SOFTWARE_ID))?;
        self.write_raw("      </software>\n")?;
        self.write_raw("    </softwareList>\n")?;

        self.write_raw("    <instrumentConfigurationList count=\"1\">\n")?;
        self.write_raw(&format!(
            "      <instrumentConfiguration id=\"{}\">\n",
            INSTRUMENT_CONFIGURATION_ID
        ))?;
        self.write_cv("        ", &CvParam::instrument_model())?;
        self.write_raw("      </instrumentConfiguration>\n")?;
        self.write_raw("    </instrumentConfigurationList>\n")?;

        self.write_raw("    <dataProcessingList count=\"1\">\n")?;
        self.write_raw(&format!(
            "      <dataProcessing id=\"{}\">\n",
            DATA_PROCESSING_ID
        ))?;
        self.write_raw(&format!(
            "        <processingMethod order=\"1\" softwareRef=\"{}\">\n",
            SOFTWARE_ID
        ))?;
        self.write_cv("          ", &CvParam::conversion_to_mzml())?;
        self.write_raw("        </processingMethod>\n")?;
        self.write_raw("      </dataProcessing>\n")?;
        self.write_raw("    </dataProcessingList>\n")?;

        self.write_raw(&format!(
            "    <run id=\"{}\" defaultInstrumentConfigurationRef=\"{}\" \
             defaultSourceFileRef=\"{}\" sampleRef=\"{}\">\n",
            xml_escape(run_id),
            INSTRUMENT_CONFIGURATION_ID,
            SOURCE_FILE_ID,
            SAMPLE_ID,
        ))?;
        self.write_raw(&format!(
            "      <spectrumList count=\"{}\" defaultDataProcessingRef=\"{}\">\n",
            spectrum_count, DATA_PROCESSING_ID
        ))?;

        self.state = WriterState::RunOpen;
        Ok(())
    }

    /// Emit one spectrum, recording its byte offset for the trailing
    /// index.
    pub fn write_spectrum(&mut self, scan: &Scan) -> Result<()> {
        self.expect_state(WriterState::RunOpen)?;

        let line = scan.line_data.as_ref().ok_or_else(|| {
            anyhow!(ConvertError::FeatureMissing { scan_id: scan.id })
        })?;

        let id_ref = scan.native_id();
        let mz_payload = encode_f64_base64(&line.mz);
        let intensity_payload = encode_f32_base64(&line.intensity);

        // Indentation goes out first; the recorded position must point at
        // the '<' of the opening tag.
        self.write_raw("        ")?;
        self.offsets.push(SpectrumOffset {
            id_ref: id_ref.clone(),
            position: self.position,
        });

        self.write_raw(&format!(
            "<spectrum index=\"{}\" id=\"{}\" defaultArrayLength=\"{}\">\n",
            self.spectrum_index,
            id_ref,
            line.len()
        ))?;
        self.spectrum_index += 1;

        let key = &scan.acquisition_key;
        match (key.polarity, key.ms_level) {
            (Polarity::Positive, 0) => {
                self.write_raw(&format!(
                    "          <referenceableParamGroupRef ref=\"{}\"/>\n",
                    MS1_PARAM_GROUP_ID
                ))?;
            }
            (Polarity::Positive, level) if level > 0 => {
                self.write_raw(&format!(
                    "          <referenceableParamGroupRef ref=\"{}\"/>\n",
                    MS2_PARAM_GROUP_ID
                ))?;
            }
            _ => {}
        }

        self.write_cv("          ", &CvParam::ms_level(key.ms_level + 1))?;
        self.write_cv("          ", &CvParam::centroid_spectrum())?;

        // Observed m/z bounds come from profile data; without it the
        // sentinel 0 is emitted and base peak parameters are omitted.
        let (low, high) = scan
            .profile_data
            .as_ref()
            .map(|p| {
                (
                    p.mz.first().copied().unwrap_or(0.0),
                    p.mz.last().copied().unwrap_or(0.0),
                )
            })
            .unwrap_or((0.0, 0.0));
        self.write_cv("          ", &CvParam::lowest_observed_mz(low))?;
        self.write_cv("          ", &CvParam::highest_observed_mz(high))?;

        if let Some(profile) = &scan.profile_data {
            let base_peak = profile
                .intensity
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i);
            if let Some(i) = base_peak {
                self.write_cv("          ", &CvParam::base_peak_mz(profile.mz[i]))?;
                self.write_cv(
                    "          ",
                    &CvParam::base_peak_intensity(profile.intensity[i]),
                )?;
            }
        }

        self.write_cv("          ", &CvParam::total_ion_current(scan.sum_intensity))?;

        self.write_raw("          <scanList count=\"1\">\n")?;
        self.write_cv("            ", &CvParam::no_combination())?;
        self.write_raw("            <scan>\n")?;
        self.write_cv(
            "              ",
            &CvParam::scan_start_time_minutes(scan.rt / 60.0),
        )?;
        self.write_cv("              ", &CvParam::filter_string())?;
        self.write_raw("              <scanWindowList count=\"1\">\n")?;
        self.write_raw("                <scanWindow>\n")?;
        self.write_cv(
            "                  ",
            &CvParam::scan_window_lower_limit(SCAN_WINDOW_LOWER_MZ),
        )?;
        self.write_cv(
            "                  ",
            &CvParam::scan_window_upper_limit(SCAN_WINDOW_UPPER_MZ),
        )?;
        self.write_raw("                </scanWindow>\n")?;
        self.write_raw("              </scanWindowList>\n")?;
        self.write_raw("            </scan>\n")?;
        self.write_raw("          </scanList>\n")?;

        // Precursor block only for fragment scans with a recorded
        // isolation m/z.
        if key.ms_level > 0 {
            if let Some(isolation_mz) = scan.acquisition_data.msms_isolation_mz {
                self.write_raw("          <precursorList count=\"1\">\n")?;
                if scan.parent > 0 {
                    self.write_raw(&format!(
                        "            <precursor spectrumRef=\"scan={}\">\n",
                        scan.parent
                    ))?;
                } else {
                    self.write_raw("            <precursor>\n")?;
                }
                self.write_raw("              <selectedIonList count=\"1\">\n")?;
                self.write_raw("                <selectedIon>\n")?;
                self.write_cv(
                    "                  ",
                    &CvParam::selected_ion_mz(isolation_mz),
                )?;
                self.write_raw("                </selectedIon>\n")?;
                self.write_raw("              </selectedIonList>\n")?;
                self.write_raw("              <activation>\n")?;
                self.write_cv(
                    "                ",
                    &CvParam::collision_induced_dissociation(),
                )?;
                self.write_cv(
                    "                ",
                    &CvParam::collision_energy(
                        scan.acquisition_data.collision_energy.unwrap_or(0.0),
                    ),
                )?;
                self.write_raw("              </activation>\n")?;
                self.write_raw("            </precursor>\n")?;
                self.write_raw("          </precursorList>\n")?;
            }
        }

        self.write_raw("          <binaryDataArrayList count=\"2\">\n")?;
        self.write_raw(&format!(
            "            <binaryDataArray encodedLength=\"{}\">\n",
            mz_payload.len()
        ))?;
        self.write_cv("              ", &CvParam::float_64_bit())?;
        self.write_cv("              ", &CvParam::no_compression())?;
        self.write_cv("              ", &CvParam::mz_array())?;
        self.write_raw(&format!("              <binary>{}</binary>\n", mz_payload))?;
        self.write_raw("            </binaryDataArray>\n")?;
        self.write_raw(&format!(
            "            <binaryDataArray encodedLength=\"{}\">\n",
            intensity_payload.len()
        ))?;
        self.write_cv("              ", &CvParam::float_32_bit())?;
        self.write_cv("              ", &CvParam::no_compression())?;
        self.write_cv("              ", &CvParam::intensity_array())?;
        self.write_raw(&format!(
            "              <binary>{}</binary>\n",
            intensity_payload
        ))?;
        self.write_raw("            </binaryDataArray>\n")?;
        self.write_raw("          </binaryDataArrayList>\n")?;

        self.write_raw("        </spectrum>\n")?;

        debug!("wrote spectrum {} ({} peaks)", id_ref, line.len());
        Ok(())
    }

    /// Close the spectrum list, the run, and the inner mzML element.
    pub fn close_run(&mut self) -> Result<()> {
        self.expect_state(WriterState::RunOpen)?;
        self.write_raw("      </spectrumList>\n")?;
        self.write_raw("    </run>\n")?;
        self.write_raw("  </mzML>\n")?;
        self.state = WriterState::RunClosed;
        Ok(())
    }

    /// Write the trailing offset index, one entry per spectrum in
    /// recording order.
    pub fn write_index(&mut self) -> Result<()> {
        self.expect_state(WriterState::RunClosed)?;

        self.write_raw("  ")?;
        self.index_list_position = self.position;
        self.write_raw("<indexList count=\"1\">\n")?;
        self.write_raw("    <index name=\"spectrum\">\n")?;
        let offsets = self.offsets.clone();
        for offset in &offsets {
            self.write_raw(&format!(
                "      <offset idRef=\"{}\">{}</offset>\n",
                xml_escape(&offset.id_ref),
                offset.position
            ))?;
        }
        self.write_raw("    </index>\n")?;
        self.write_raw("  </indexList>\n")?;

        self.state = WriterState::IndexWritten;
        Ok(())
    }

    /// Write the index-list offset and close the document root.
    pub fn close_document(&mut self) -> Result<()> {
        self.expect_state(WriterState::IndexWritten)?;
        self.write_raw(&format!(
            "  <indexListOffset>{}</indexListOffset>\n",
            self.index_list_position
        ))?;
        self.write_raw("</indexedmzML>\n")?;
        self.out.flush().dot()?;
        self.state = WriterState::DocumentClosed;
        Ok(())
    }
}
