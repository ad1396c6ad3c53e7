//! Status document extraction.

use thiserror::Error;

use crate::capture::classify::is_status_document;
use crate::telemetry::document::TelemetryDocument;

/// Why a body did not yield telemetry.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The body is not shaped like a status report. An expected outcome.
    #[error("not a status document")]
    NotRecognized,

    /// The body looked like a status report but did not decode.
    #[error("failed to parse status document: {0}")]
    ParseFailure(#[from] quick_xml::DeError),

    /// The report carries no zones, so per-zone metrics cannot be rendered.
    #[error("status document has no zone data")]
    NoZoneData,
}

impl ExtractionError {
    /// Short label used for logging and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::NotRecognized => "not_recognized",
            ExtractionError::ParseFailure(_) => "parse_failure",
            ExtractionError::NoZoneData => "no_zone_data",
        }
    }
}

/// Decode a status report from `body`.
pub fn extract(body: &[u8]) -> Result<TelemetryDocument, ExtractionError> {
    if !is_status_document(body) {
        return Err(ExtractionError::NotRecognized);
    }

    let document: TelemetryDocument = quick_xml::de::from_reader(body)?;
    if document.first_zone().is_none() {
        return Err(ExtractionError::NoZoneData);
    }
    Ok(document)
}
