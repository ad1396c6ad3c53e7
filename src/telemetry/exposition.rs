//! Prometheus-style text rendering of a status report.
//!
//! The block order, names and help strings are fixed; scrapers key on the
//! exact casing.

use std::fmt::{Display, Write};

use chrono::{DateTime, FixedOffset};

use crate::telemetry::document::TelemetryDocument;
use crate::telemetry::extract::ExtractionError;

/// Length of `YYYY-MM-DDThh:mm:ss`.
const DATETIME_PREFIX_LEN: usize = 19;

// `%.f` also matches when no fraction is present.
const OFFSET_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

impl TelemetryDocument {
    /// Render the report as `# HELP` / `# TYPE` / value triples.
    ///
    /// Per-zone metrics come from the first zone only; a report without
    /// zones fails with [`ExtractionError::NoZoneData`].
    pub fn to_exposition(&self) -> Result<String, ExtractionError> {
        let zone = self.first_zone().ok_or(ExtractionError::NoZoneData)?;
        let mut out = String::with_capacity(768);

        gauge(&mut out, "outdoorAirTemp", "degrees in F", format_args!("{:.1}", self.outdoor_air_temp));
        gauge(&mut out, "fanSpeed", "cubic feet minute", self.idu.fan_cfm);
        gauge(&mut out, "Stage", "StageName", stage_value(&self.idu.operation_status));
        gauge(&mut out, "filter", "percent of filter life", self.filter_life_percent);
        gauge(&mut out, "temperature", "indoor temp", format_args!("{:.1}", zone.current_temp));
        gauge(&mut out, "relativeHumidity", "indoor relative humidity", zone.relative_humidity);
        gauge(&mut out, "heatSetPoint", "heat set point", format_args!("{:.1}", zone.heat_set_point));
        gauge(&mut out, "coolingSetPoint", "cooling set point", format_args!("{:.1}", zone.cool_set_point));
        gauge(&mut out, "localtime", "last refreshed time", localtime_stamp(&self.local_time));

        Ok(out)
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl Display) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);
    let _ = writeln!(out, "{} {}", name, value);
}

/// Operating stage as a metric value.
///
/// Integers are normalised (`" 02"` renders `2`), an empty status renders
/// `0`, and any other token is passed through as-is.
pub fn stage_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "0".to_string();
    }
    match trimmed.parse::<i64>() {
        Ok(stage) => stage.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// The report timestamp as a `YYYYMMDDhhmmss` integer in its own offset.
///
/// Returns 0 when the timestamp cannot be read.
pub fn localtime_stamp(raw: &str) -> i64 {
    parse_local_time(raw)
        .and_then(|t| t.format("%Y%m%d%H%M%S").to_string().parse().ok())
        .unwrap_or(0)
}

/// Parse RFC 3339, then retry with one stray colon removed from the offset.
///
/// Thermostat firmware has been seen emitting offsets that strict RFC 3339
/// rejects; dropping the last colon past the datetime prefix turns them into
/// a plain `+hhmm` offset.
pub fn parse_local_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t);
    }

    let mut repaired = raw.to_string();
    if let Some(i) = repaired.rfind(':') {
        if i > DATETIME_PREFIX_LEN {
            repaired.remove(i);
        }
    }
    DateTime::parse_from_str(&repaired, OFFSET_LAYOUT).ok()
}
