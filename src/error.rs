//! Failure taxonomy for the conversion pipeline
//!
//! Every kind is fatal for the source (or document) being processed; the
//! only sensible retry is the outer driver re-attempting a whole source.
//! The variants are carried inside [`anyhow::Error`] chains so callers can
//! recover the kind with `downcast_ref::<ConvertError>()` while still
//! getting the full context string (source path, scan id, low-level text).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The metadata store is unavailable or is not an acquisition container.
    #[error("metadata store is not open or is not a valid acquisition container: {path}")]
    ConnectionNotOpen { path: String },

    /// A scan references an acquisition key or acquisition-data id absent
    /// from the preloaded maps. The metadata store is inconsistent.
    #[error("spectrum {scan_id} references unknown {referent} {reference_id}")]
    InvalidReference {
        scan_id: i64,
        referent: &'static str,
        reference_id: i64,
    },

    /// The binary store could not resolve an array identifier.
    #[error("cannot read binary array {array_id} for spectrum {scan_id}: {detail}")]
    BinaryRead {
        scan_id: i64,
        array_id: i64,
        detail: String,
    },

    /// A scan selected for output carries no line data.
    #[error("spectrum {scan_id} has no line data to serialize")]
    FeatureMissing { scan_id: i64 },

    /// A serialization method was invoked out of sequence.
    #[error("mzML writer invoked out of order: expected state {expected}, found {actual}")]
    IllegalState { expected: String, actual: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_anyhow_chain() {
        let err = anyhow::Error::new(ConvertError::InvalidReference {
            scan_id: 12,
            referent: "acquisition key",
            reference_id: 4,
        })
        .context("while converting /data/sample.d");

        let kind = err.downcast_ref::<ConvertError>();
        assert!(matches!(
            kind,
            Some(ConvertError::InvalidReference { scan_id: 12, .. })
        ));
        assert!(format!("{:#}", err).contains("/data/sample.d"));
    }

    #[test]
    fn test_binary_read_preserves_low_level_text() {
        let err = ConvertError::BinaryRead {
            scan_id: 3,
            array_id: 77,
            detail: "storage handle reports: bad page checksum".to_string(),
        };
        assert!(err.to_string().contains("bad page checksum"));
        assert!(err.to_string().contains("array 77"));
    }
}
