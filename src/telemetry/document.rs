//! Typed schema of the thermostat's `<status>` report.
//!
//! Element names follow the device's XML; serialized names are the
//! structured-record keys published to MQTT.

use std::fmt::Display;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// The recognized telemetry payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename = "status")]
pub struct TelemetryDocument {
    /// Device-local timestamp; kept verbatim, format not guaranteed.
    #[serde(rename(deserialize = "localTime", serialize = "localTime"), default)]
    pub local_time: String,

    /// Outdoor air temperature (degrees F).
    #[serde(
        rename(deserialize = "oat", serialize = "outdoorAirTemp"),
        default,
        deserialize_with = "lenient"
    )]
    pub outdoor_air_temp: f64,

    /// Remaining filter life in percent. Not range checked.
    #[serde(
        rename(deserialize = "filtrlvl", serialize = "filterLevel"),
        default,
        deserialize_with = "lenient"
    )]
    pub filter_life_percent: i64,

    #[serde(default)]
    pub idu: IndoorUnit,

    #[serde(default)]
    pub zones: Zones,
}

/// Indoor unit section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IndoorUnit {
    /// Fan airflow in cubic feet per minute.
    #[serde(rename = "cfm", default, deserialize_with = "lenient")]
    pub fan_cfm: i64,

    /// Operating stage: a number, or a token such as `off`.
    #[serde(rename = "opstat", default)]
    pub operation_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Zones {
    #[serde(rename(deserialize = "zone", serialize = "zones"), default)]
    pub zones: Vec<Zone>,
}

/// One independently controlled area.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Zone {
    #[serde(rename(deserialize = "@id", serialize = "id"), default, deserialize_with = "lenient")]
    pub id: i64,

    #[serde(
        rename(deserialize = "rt", serialize = "currentTemp"),
        default,
        deserialize_with = "lenient"
    )]
    pub current_temp: f64,

    #[serde(
        rename(deserialize = "rh", serialize = "relativeHumidity"),
        default,
        deserialize_with = "lenient"
    )]
    pub relative_humidity: i64,

    #[serde(
        rename(deserialize = "htsp", serialize = "heatSetPoint"),
        default,
        deserialize_with = "lenient"
    )]
    pub heat_set_point: f64,

    #[serde(
        rename(deserialize = "clsp", serialize = "coolSetPoint"),
        default,
        deserialize_with = "lenient"
    )]
    pub cool_set_point: f64,
}

impl TelemetryDocument {
    /// The only zone that is ever reported.
    pub fn first_zone(&self) -> Option<&Zone> {
        self.zones.zones.first()
    }
}

// Numbers arrive as element text. Surrounding whitespace is ignored and an
// empty element reads as zero; anything else must parse.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(T::default());
    }
    raw.parse()
        .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_document() {
        let xml = r#"<status version="1.0">
            <localTime>2025-11-15T18:52:45-05:00</localTime>
            <oat>63</oat>
            <filtrlvl>40</filtrlvl>
            <idu><cfm>437</cfm><opstat>off</opstat><type>furnace</type></idu>
            <zones>
                <zone id="1"><rt>71.0</rt><rh>49</rh><htsp>68.0</htsp><clsp>72.0</clsp></zone>
                <zone id="2"><rt>65.5</rt><rh>51</rh><htsp>60.0</htsp><clsp>80.0</clsp></zone>
            </zones>
        </status>"#;

        let doc: TelemetryDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(doc.local_time, "2025-11-15T18:52:45-05:00");
        assert_eq!(doc.outdoor_air_temp, 63.0);
        assert_eq!(doc.filter_life_percent, 40);
        assert_eq!(doc.idu.fan_cfm, 437);
        assert_eq!(doc.idu.operation_status, "off");
        assert_eq!(doc.zones.zones.len(), 2);

        let zone = doc.first_zone().unwrap();
        assert_eq!(zone.id, 1);
        assert_eq!(zone.current_temp, 71.0);
        assert_eq!(zone.relative_humidity, 49);
        assert_eq!(zone.heat_set_point, 68.0);
        assert_eq!(zone.cool_set_point, 72.0);
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: TelemetryDocument = quick_xml::de::from_str("<status><oat>50</oat></status>").unwrap();
        assert_eq!(doc.outdoor_air_temp, 50.0);
        assert_eq!(doc.idu, IndoorUnit::default());
        assert!(doc.first_zone().is_none());
    }

    #[test]
    fn test_padded_and_empty_numbers() {
        let doc: TelemetryDocument =
            quick_xml::de::from_str("<status><oat> 61.5 </oat><filtrlvl></filtrlvl></status>").unwrap();
        assert_eq!(doc.outdoor_air_temp, 61.5);
        assert_eq!(doc.filter_life_percent, 0);
    }

    #[test]
    fn test_non_numeric_is_an_error() {
        let result: Result<TelemetryDocument, _> =
            quick_xml::de::from_str("<status><oat>warm</oat></status>");
        assert!(result.is_err());
    }

    #[test]
    fn test_structured_record_keys() {
        let doc = TelemetryDocument {
            local_time: "2024-04-05T14:30:00Z".into(),
            outdoor_air_temp: 63.5,
            filter_life_percent: 40,
            idu: IndoorUnit {
                fan_cfm: 437,
                operation_status: "off".into(),
            },
            zones: Zones {
                zones: vec![Zone {
                    id: 1,
                    current_temp: 72.3,
                    relative_humidity: 45,
                    heat_set_point: 68.0,
                    cool_set_point: 75.0,
                }],
            },
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["localTime"], "2024-04-05T14:30:00Z");
        assert_eq!(json["outdoorAirTemp"], 63.5);
        assert_eq!(json["filterLevel"], 40);
        assert_eq!(json["idu"]["cfm"], 437);
        assert_eq!(json["idu"]["opstat"], "off");
        assert_eq!(json["zones"]["zones"][0]["id"], 1);
        assert_eq!(json["zones"]["zones"][0]["currentTemp"], 72.3);
        assert_eq!(json["zones"]["zones"][0]["coolSetPoint"], 75.0);
    }
}
