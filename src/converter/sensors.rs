//! Sensor detection and OG1 sensor variables.
//!
//! A sensor counts as fitted when one of its keywords appears in a
//! basestation variable name. Serial number and calibration date come from
//! the free-text calibration comment in `sg_calib_constants.m`.

use crate::models::{AttrValue, VarData, Variable};
use crate::table::MeasurementTable;
use crate::vocabularies::SensorSpec;

use super::split::DiveScalars;

use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Placeholder for a calibration date or serial that could not be parsed
pub const UNKNOWN: &str = "Unknown";

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// A sensor found on one dive
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSensor {
    /// Key of the sensor table entry, e.g. `CTD`
    pub key: String,
    pub serial_number: String,
    pub calibration_date: String,
}

impl DetectedSensor {
    /// Name of the OG1 sensor variable, `SENSOR_<TYPE>_<SERIAL>`
    pub fn variable_name(&self, spec: &SensorSpec) -> String {
        let sensor_type = spec
            .attributes
            .get_str("sensor_type")
            .unwrap_or(self.key.as_str());
        format!("SENSOR_{}_{}", sensor_type, self.serial_number)
            .to_uppercase()
            .replace(' ', "_")
    }
}

fn day_month_year() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})\s*([A-Za-z]{3,9})\.?\s*(\d{2}|\d{4})\b")
            .expect("valid calibration date pattern")
    })
}

fn numeric_date() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").expect("valid numeric date pattern")
    })
}

fn serial_after_sn() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)s/n\s*([A-Za-z0-9]+)").expect("valid serial pattern"))
}

fn serial_after_maker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:SBE|#)\s*#?\s*([A-Za-z0-9/]+)").expect("valid maker serial pattern")
    })
}

/// Extract `(calibration_date, serial_number)` from a calibration comment
///
/// The date is `YYYYmmdd`; either value is [`UNKNOWN`] when not found.
pub fn parse_calibcomm(text: &str) -> (String, String) {
    let date = parse_calibration_date(text).unwrap_or_else(|| UNKNOWN.to_string());
    let serial = serial_after_sn()
        .captures(text)
        .or_else(|| serial_after_maker().captures(text))
        .map(|c| c[1].replace('/', ""))
        .unwrap_or_else(|| UNKNOWN.to_string());
    (date, serial)
}

fn parse_calibration_date(text: &str) -> Option<String> {
    let from_words = day_month_year().captures_iter(text).find_map(|c| {
        let prefix = c[2].get(..3)?.to_lowercase();
        let month = MONTHS.iter().position(|m| *m == prefix)? as u32 + 1;
        calendar_date(&c[3], month, &c[1])
    });
    from_words.or_else(|| {
        numeric_date().captures_iter(text).find_map(|c| {
            let month = c[1].parse().ok()?;
            calendar_date(&c[3], month, &c[2])
        })
    })
}

fn calendar_date(year: &str, month: u32, day: &str) -> Option<String> {
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    let day = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y%m%d").to_string())
}

/// Sensors fitted on a dive, in table order
///
/// `variable_names` are the raw basestation names of the dive; the
/// calibration comments and log parameters come from its scalars. When a
/// sensor lists several comment variables, the first one in its `calibcomm`
/// list that the dive carries is used.
pub fn detect_sensors(
    variable_names: &[String],
    scalars: &DiveScalars,
    sensors: &BTreeMap<String, SensorSpec>,
) -> Vec<DetectedSensor> {
    let mut found = Vec::new();
    for (key, spec) in sensors {
        let present = spec
            .keywords
            .iter()
            .any(|keyword| variable_names.iter().any(|n| n.contains(keyword.as_str())));
        if !present {
            continue;
        }

        if let Some(require) = &spec.require {
            let value = scalars.log_value(&require.variable);
            if value.is_none_or(|v| v == require.not_equal) {
                debug!("{} keywords present but {} = {:?}", key, require.variable, value);
                continue;
            }
        }

        // First configured comment present on the dive
        let comment = spec.calibcomm.iter().find_map(|name| {
            scalars
                .sg_cal
                .iter()
                .find(|v| &v.name == name)
                .and_then(|v| match &v.data {
                    VarData::Text(text) => Some(text.as_str()),
                    VarData::Numeric(_) => None,
                })
        });
        let (calibration_date, serial_number) = comment
            .map(parse_calibcomm)
            .unwrap_or_else(|| (UNKNOWN.to_string(), UNKNOWN.to_string()));

        found.push(DetectedSensor {
            key: key.clone(),
            serial_number,
            calibration_date,
        });
    }
    found
}

/// Scalar `SENSOR_*` variables carrying the sensor table attributes
///
/// Sensors that resolve to the same variable name are written once.
pub fn sensor_variables(
    detected: &[DetectedSensor],
    sensors: &BTreeMap<String, SensorSpec>,
) -> Vec<Variable> {
    let mut out: Vec<Variable> = Vec::new();
    for sensor in detected {
        let Some(spec) = sensors.get(&sensor.key) else {
            continue;
        };
        let name = sensor.variable_name(spec);
        if out.iter().any(|v| v.name == name) {
            continue;
        }

        let mut attrs = spec.attributes.clone();
        if let Some(long_name) = attrs.get("long_name").map(AttrValue::to_string) {
            attrs.set("long_name", format!("{long_name}:{}", sensor.serial_number));
        }
        attrs.set("serial_number", sensor.serial_number.clone());
        attrs.set("calibration_date", sensor.calibration_date.clone());
        out.push(Variable::text(name, sensor.serial_number.clone()).with_attributes(attrs));
    }
    out
}

/// Point each measured OG1 variable at the sensor that produced it
pub fn add_sensor_attribute(
    table: &mut MeasurementTable,
    detected: &[DetectedSensor],
    sensors: &BTreeMap<String, SensorSpec>,
) {
    for sensor in detected {
        let Some(spec) = sensors.get(&sensor.key) else {
            continue;
        };
        let name = sensor.variable_name(spec);
        for measured in &spec.measures {
            if table.contains(measured) {
                table.attributes_mut(measured).set("sensor", name.clone());
            }
        }
    }
}

/// Merge sensor lists from several dives, first occurrence wins
pub fn merge_detected(lists: impl IntoIterator<Item = Vec<DetectedSensor>>) -> Vec<DetectedSensor> {
    let mut merged: Vec<DetectedSensor> = Vec::new();
    for sensor in lists.into_iter().flatten() {
        if !merged
            .iter()
            .any(|s| s.key == sensor.key && s.serial_number == sensor.serial_number)
        {
            merged.push(sensor);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SG_DATA_POINT;
    use crate::converter::split::extract_variables;
    use crate::models::Attributes;
    use crate::vocabularies::Vocabularies;

    fn parsed(text: &str) -> (String, String) {
        parse_calibcomm(text)
    }

    fn pair(date: &str, serial: &str) -> (String, String) {
        (date.to_string(), serial.to_string())
    }

    #[test]
    fn test_parse_calibcomm_forms() {
        assert_eq!(
            parsed("SBE s/n 0112 calibration 20apr09"),
            pair("20090420", "0112")
        );
        assert_eq!(parsed("SBE#0041 t,c cal 7 Sep 02"), pair("20020907", "0041"));
        assert_eq!(
            parsed("Optode #1234/5 calibrated 30DEC03"),
            pair("20031230", "12345")
        );
        assert_eq!(
            parsed("wetlabs BBFL2VMT-1234 10 june 08"),
            pair("20080610", UNKNOWN)
        );
        assert_eq!(parsed("Aanderaa 4330 s/n 123 9/10/08"), pair("20080910", "123"));
        assert_eq!(parsed("SBE 0025-1 calib 1 may 98"), pair("19980501", "0025"));
        assert_eq!(parsed("no info"), pair(UNKNOWN, UNKNOWN));
    }

    fn detect(variables: Vec<Variable>) -> Vec<DetectedSensor> {
        let vocab = Vocabularies::builtin().unwrap();
        let names: Vec<String> = variables.iter().map(|v| v.name.clone()).collect();
        let scalars =
            extract_variables(variables.into_iter().filter(|v| v.dims.is_empty()).collect());
        detect_sensors(&names, &scalars, &vocab.sensors)
    }

    #[test]
    fn test_detect_ctd_with_calibration() {
        let vocab = Vocabularies::builtin().unwrap();
        let found = detect(vec![
            Variable::numeric("eng_sbect_tempFreq", &[SG_DATA_POINT], vec![1.0]),
            Variable::text("sg_cal_calibcomm", "SBE s/n 0112 calibration 20apr09"),
        ]);

        let ctd = found.iter().find(|s| s.key == "CTD").unwrap();
        assert_eq!(ctd.serial_number, "0112");
        assert_eq!(ctd.calibration_date, "20090420");
        assert_eq!(ctd.variable_name(&vocab.sensors["CTD"]), "SENSOR_CTD_0112");
    }

    #[test]
    fn test_calibration_comment_follows_configured_order() {
        let oxygen = "SBE 43 s/n 0245 calibration 02mar09";
        let optode = "Optode 4330 s/n 1109 calibrated 10 Oct 2008";
        let found = detect(vec![
            Variable::numeric("aanderaa4330_dissolved_oxygen", &[SG_DATA_POINT], vec![1.0]),
            Variable::text("sg_cal_calibcomm_optode", optode),
            Variable::text("sg_cal_calibcomm_oxygen", oxygen),
        ]);

        let gas = found.iter().find(|s| s.key == "DISSOLVED_GAS").unwrap();
        assert_eq!(gas.serial_number, "0245");
        assert_eq!(gas.calibration_date, "20090302");

        let found = detect(vec![
            Variable::numeric("aanderaa4330_dissolved_oxygen", &[SG_DATA_POINT], vec![1.0]),
            Variable::text("sg_cal_calibcomm_optode", optode),
        ]);
        let gas = found.iter().find(|s| s.key == "DISSOLVED_GAS").unwrap();
        assert_eq!(gas.serial_number, "1109");
    }

    #[test]
    fn test_magnetometer_requires_compass_use() {
        let has_magnetometer =
            |found: Vec<DetectedSensor>| found.iter().any(|s| s.key == "MAGNETOMETER");

        assert!(!has_magnetometer(detect(vec![
            Variable::scalar("magnetic_variation", 12.3),
            Variable::scalar("log_COMPASS_USE", 0.0),
        ])));
        assert!(!has_magnetometer(detect(vec![Variable::scalar(
            "magnetic_variation",
            12.3
        )])));

        let found = detect(vec![
            Variable::scalar("magnetic_variation", 12.3),
            Variable::scalar("log_COMPASS_USE", 4.0),
        ]);
        let mag = found.iter().find(|s| s.key == "MAGNETOMETER").unwrap();
        assert_eq!(mag.serial_number, UNKNOWN);
    }

    #[test]
    fn test_sensor_variables_and_measured_attribute() {
        let vocab = Vocabularies::builtin().unwrap();
        let detected = vec![
            DetectedSensor {
                key: "CTD".into(),
                serial_number: "0112".into(),
                calibration_date: "20090420".into(),
            };
            2
        ];

        let vars = sensor_variables(&detected, &vocab.sensors);
        assert_eq!(vars.len(), 1);
        let ctd = &vars[0];
        assert_eq!(ctd.name, "SENSOR_CTD_0112");
        assert_eq!(
            ctd.attributes.get_str("long_name"),
            Some("Sea-Bird unpumped CTD:0112")
        );
        assert_eq!(ctd.attributes.get_str("calibration_date"), Some("20090420"));

        let mut table = MeasurementTable::new();
        table.insert("TEMP", vec![1.0], Attributes::new()).unwrap();
        add_sensor_attribute(&mut table, &detected, &vocab.sensors);
        assert_eq!(
            table.attributes("TEMP").unwrap().get_str("sensor"),
            Some("SENSOR_CTD_0112")
        );
    }

    #[test]
    fn test_merge_detected_keeps_first() {
        let a = DetectedSensor {
            key: "CTD".into(),
            serial_number: "0112".into(),
            calibration_date: "20090420".into(),
        };
        let b = DetectedSensor {
            calibration_date: "20100101".into(),
            ..a.clone()
        };
        let merged = merge_detected(vec![vec![a.clone()], vec![b]]);
        assert_eq!(merged, vec![a]);
    }
}
