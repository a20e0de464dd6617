//! Controlled-vocabulary parameter records
//!
//! Plain append-only records rendered to XML by the serialization
//! engine. Every term the restricted mzML profile emits has a named
//! constructor here, so the writer reads as a sequence of declarations
//! rather than accession literals.

/// A standardized (ontology-id, name, value) triple, with an optional
/// unit reference.
#[derive(Clone, Debug, PartialEq)]
pub struct CvParam {
    pub cv_ref: &'static str,
    pub accession: &'static str,
    pub name: &'static str,
    pub value: String,
    pub unit: Option<UnitRef>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnitRef {
    pub cv_ref: &'static str,
    pub accession: &'static str,
    pub name: &'static str,
}

const UNIT_MZ: UnitRef = UnitRef {
    cv_ref: "MS",
    accession: "MS:1000040",
    name: "m/z",
};

const UNIT_COUNTS: UnitRef = UnitRef {
    cv_ref: "MS",
    accession: "MS:1000131",
    name: "number of counts",
};

const UNIT_MINUTE: UnitRef = UnitRef {
    cv_ref: "UO",
    accession: "UO:0000031",
    name: "minute",
};

const UNIT_ELECTRONVOLT: UnitRef = UnitRef {
    cv_ref: "UO",
    accession: "UO:0000266",
    name: "electronvolt",
};

impl CvParam {
    fn plain(accession: &'static str, name: &'static str) -> Self {
        Self {
            cv_ref: "MS",
            accession,
            name,
            value: String::new(),
            unit: None,
        }
    }

    fn with_value(accession: &'static str, name: &'static str, value: String) -> Self {
        Self {
            cv_ref: "MS",
            accession,
            name,
            value,
            unit: None,
        }
    }

    fn with_unit(self, unit: UnitRef) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }

    pub fn ms1_spectrum() -> Self {
        Self::plain("MS:1000579", "MS1 spectrum")
    }

    pub fn msn_spectrum() -> Self {
        Self::plain("MS:1000580", "MSn spectrum")
    }

    pub fn positive_scan() -> Self {
        Self::plain("MS:1000130", "positive scan")
    }

    pub fn no_combination() -> Self {
        Self::plain("MS:1000795", "no combination")
    }

    pub fn centroid_spectrum() -> Self {
        Self::plain("MS:1000127", "centroid spectrum")
    }

    pub fn ms_level(level: i64) -> Self {
        Self::with_value("MS:1000511", "ms level", level.to_string())
    }

    pub fn lowest_observed_mz(mz: f64) -> Self {
        Self::with_value("MS:1000528", "lowest observed m/z", mz.to_string()).with_unit(UNIT_MZ)
    }

    pub fn highest_observed_mz(mz: f64) -> Self {
        Self::with_value("MS:1000527", "highest observed m/z", mz.to_string()).with_unit(UNIT_MZ)
    }

    pub fn base_peak_mz(mz: f64) -> Self {
        Self::with_value("MS:1000504", "base peak m/z", mz.to_string()).with_unit(UNIT_MZ)
    }

    pub fn base_peak_intensity(intensity: f64) -> Self {
        Self::with_value("MS:1000505", "base peak intensity", intensity.to_string())
            .with_unit(UNIT_COUNTS)
    }

    /// Total ion current, truncated to an integer count.
    pub fn total_ion_current(total: f64) -> Self {
        Self::with_value("MS:1000285", "total ion current", (total as i64).to_string())
    }

    pub fn scan_start_time_minutes(minutes: f64) -> Self {
        Self::with_value("MS:1000016", "scan start time", minutes.to_string())
            .with_unit(UNIT_MINUTE)
    }

    /// Placeholder filter string; the vendor format records none.
    pub fn filter_string() -> Self {
        Self::with_value("MS:1000512", "filter string", String::new())
    }

    pub fn scan_window_lower_limit(mz: f64) -> Self {
        Self::with_value("MS:1000501", "scan window lower limit", mz.to_string())
            .with_unit(UNIT_MZ)
    }

    pub fn scan_window_upper_limit(mz: f64) -> Self {
        Self::with_value("MS:1000500", "scan window upper limit", mz.to_string())
            .with_unit(UNIT_MZ)
    }

    pub fn selected_ion_mz(mz: f64) -> Self {
        Self::with_value("MS:1000744", "selected ion m/z", mz.to_string()).with_unit(UNIT_MZ)
    }

    pub fn collision_induced_dissociation() -> Self {
        Self::plain("MS:1000133", "collision-induced dissociation")
    }

    pub fn collision_energy(energy: f64) -> Self {
        Self::with_value("MS:1000045", "collision energy", energy.to_string())
            .with_unit(UNIT_ELECTRONVOLT)
    }

    pub fn mz_array() -> Self {
        Self::plain("MS:1000514", "m/z array").with_unit(UNIT_MZ)
    }

    pub fn intensity_array() -> Self {
        Self::plain("MS:1000515", "intensity array").with_unit(UNIT_COUNTS)
    }

    pub fn float_64_bit() -> Self {
        Self::plain("MS:1000523", "64-bit float")
    }

    pub fn float_32_bit() -> Self {
        Self::plain("MS:1000521", "32-bit float")
    }

    pub fn no_compression() -> Self {
        Self::plain("MS:1000576", "no compression")
    }

    pub fn conversion_to_mzml() -> Self {
        Self::plain("MS:1000544", "Conversion to mzML")
    }

    pub fn custom_software(name: &'static str) -> Self {
        Self::with_value("MS:1000799", "custom unreleased software tool", name.to_string())
    }

    pub fn instrument_model() -> Self {
        Self::plain("MS:1000031", "instrument model")
    }

    pub fn to_xml(&self) -> String {
        let mut out = format!(
            r#"<cvParam cvRef="{}" accession="{}" name="{}" value="{}""#,
            xml_escape(self.cv_ref),
            xml_escape(self.accession),
            xml_escape(self.name),
            xml_escape(&self.value),
        );
        if let Some(unit) = &self.unit {
            out.push_str(&format!(
                r#" unitCvRef="{}" unitAccession="{}" unitName="{}""#,
                xml_escape(unit.cv_ref),
                xml_escape(unit.accession),
                xml_escape(unit.name),
            ));
        }
        out.push_str("/>");
        out
    }
}

/// A fixed referenceable parameter group.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceableParamGroup {
    pub id: &'static str,
    pub params: Vec<CvParam>,
}

pub const MS1_PARAM_GROUP_ID: &str = "CommonMS1SpectrumParams";
pub const MS2_PARAM_GROUP_ID: &str = "CommonMS2SpectrumParams";

/// The two fixed groups shared by every emitted document.
pub fn common_param_groups() -> Vec<ReferenceableParamGroup> {
    vec![
        ReferenceableParamGroup {
            id: MS1_PARAM_GROUP_ID,
            params: vec![CvParam::ms1_spectrum(), CvParam::positive_scan()],
        },
        ReferenceableParamGroup {
            id: MS2_PARAM_GROUP_ID,
            params: vec![CvParam::msn_spectrum(), CvParam::positive_scan()],
        },
    ]
}

/// The single sample of the document.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRecord {
    pub id: String,
    pub name: String,
}

impl SampleRecord {
    pub fn to_xml(&self) -> String {
        format!(
            r#"<sample id="{}" name="{}"></sample>"#,
            xml_escape(&self.id),
            xml_escape(&self.name),
        )
    }
}

/// Escape a value for use in XML attribute or text content.
///
/// Non-ASCII characters become numeric references so the byte stream
/// stays within the ASCII subset shared by UTF-8 and the declared
/// ISO-8859-1 encoding.
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("&#{};", c as u32)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_param_to_xml() {
        assert_eq!(
            CvParam::centroid_spectrum().to_xml(),
            r#"<cvParam cvRef="MS" accession="MS:1000127" name="centroid spectrum" value=""/>"#
        );
    }

    #[test]
    fn test_param_with_unit_to_xml() {
        let xml = CvParam::selected_ion_mz(445.34).to_xml();
        assert_eq!(
            xml,
            r#"<cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="445.34" unitCvRef="MS" unitAccession="MS:1000040" unitName="m/z"/>"#
        );
    }

    #[test]
    fn test_total_ion_current_truncates() {
        assert_eq!(CvParam::total_ion_current(12345.78).value, "12345");
    }

    #[test]
    fn test_common_groups_are_fixed() {
        let groups = common_param_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, MS1_PARAM_GROUP_ID);
        assert_eq!(groups[1].id, MS2_PARAM_GROUP_ID);
        assert_eq!(groups[0].params[0], CvParam::ms1_spectrum());
        assert_eq!(groups[1].params[1], CvParam::positive_scan());
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(xml_escape("caf\u{e9}"), "caf&#233;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_sample_record_to_xml() {
        let sample = SampleRecord {
            id: "sample1".to_string(),
            name: "run \"A\"".to_string(),
        };
        assert_eq!(
            sample.to_xml(),
            r#"<sample id="sample1" name="run &quot;A&quot;"></sample>"#
        );
    }
}
