//! Scalar platform and deployment variables.

use crate::constants::og1;
use crate::models::{AttrValue, Attributes, Variable};
use crate::table::MeasurementTable;

use super::{first_valid, nan_min};
use std::collections::HashMap;
use tracing::debug;

pub const PLATFORM_MODEL: &str = "Seaglider";
pub const PLATFORM_MAKER: &str = "Kongsberg Maritime";

/// `sg` plus the three digit glider number
///
/// Taken from the `glider` attribute, or from the digits of `platform_id`.
pub fn platform_serial_number(attrs: &Attributes) -> Option<String> {
    let number = attrs
        .get("glider")
        .and_then(AttrValue::as_f64)
        .map(|n| n as i64)
        .or_else(|| {
            let digits: String = attrs
                .get_str("platform_id")?
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        })?;
    Some(format!("sg{number:03}"))
}

/// Platform variables for a mission
///
/// `dive_attrs` are the basestation attributes of the first dive and
/// `trajectory` the mission id.
pub fn platform_variables(
    dive_attrs: &Attributes,
    trajectory: &str,
    table: &MeasurementTable,
    vocab_attrs: &HashMap<String, Attributes>,
) -> Vec<Variable> {
    let text_of = |name: &str| dive_attrs.get(name).map(AttrValue::to_string);

    let mut texts = vec![(og1::TRAJECTORY, Some(trajectory.to_string()))];
    texts.push(("WMO_IDENTIFIER", text_of("wmo_id")));
    texts.push(("PLATFORM_MODEL", Some(PLATFORM_MODEL.to_string())));
    texts.push(("PLATFORM_MAKER", Some(PLATFORM_MAKER.to_string())));
    texts.push(("PLATFORM_NAME", text_of("platform_id")));
    texts.push((og1::PLATFORM_SERIAL_NUMBER, platform_serial_number(dive_attrs)));
    texts.push(("GLIDER_FIRMWARE_VERSION", text_of("seaglider_software_version")));
    let landstation = text_of("base_station_version")
        .map(|v| format!("{v}{}", text_of("base_station_micro_version").unwrap_or_default()));
    texts.push(("LANDSTATION_VERSION", landstation));

    let column = |name: &str| table.get(name).unwrap_or_default();
    let numbers = [
        ("DEPLOYMENT_TIME", nan_min(&column(og1::TIME))),
        ("DEPLOYMENT_LATITUDE", first_valid(&column(og1::LATITUDE))),
        ("DEPLOYMENT_LONGITUDE", first_valid(&column(og1::LONGITUDE))),
    ];

    let attrs_for = |name: &str| vocab_attrs.get(name).cloned().unwrap_or_default();
    let mut out = Vec::new();
    for (name, value) in texts {
        match value {
            Some(value) => out.push(Variable::text(name, value).with_attributes(attrs_for(name))),
            None => debug!("No source attribute for {}", name),
        }
    }
    for (name, value) in numbers {
        let value = value.unwrap_or(f64::NAN);
        out.push(Variable::scalar(name, value).with_attributes(attrs_for(name)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabularies::Vocabularies;

    #[test]
    fn test_serial_number_sources() {
        let mut attrs = Attributes::new();
        attrs.set("platform_id", "SG015");
        assert_eq!(platform_serial_number(&attrs).as_deref(), Some("sg015"));

        attrs.set("glider", 5i64);
        assert_eq!(platform_serial_number(&attrs).as_deref(), Some("sg005"));

        assert_eq!(platform_serial_number(&Attributes::new()), None);
    }

    #[test]
    fn test_platform_variables() {
        let vocab = Vocabularies::builtin().unwrap();
        let mut attrs = Attributes::new();
        attrs.set("platform_id", "SG015");
        attrs.set("glider", 15i64);
        attrs.set("seaglider_software_version", "66.04");
        attrs.set("base_station_version", "2.13");
        attrs.set("base_station_micro_version", "1");

        let mut table = MeasurementTable::new();
        table
            .insert(og1::TIME, vec![20.0, 10.0, 30.0], Attributes::new())
            .unwrap();
        table
            .insert(og1::LATITUDE, vec![f64::NAN, 50.1, 50.2], Attributes::new())
            .unwrap();

        let vars = platform_variables(&attrs, "sg015_x_delayed", &table, &vocab.vocab_attrs);
        let find = |name: &str| vars.iter().find(|v| v.name == name);

        let trajectory = find(og1::TRAJECTORY).unwrap();
        assert_eq!(trajectory.attributes.get_str("cf_role"), Some("trajectory_id"));
        assert!(find("WMO_IDENTIFIER").is_none());
        assert_eq!(
            find("LANDSTATION_VERSION").unwrap().data,
            crate::models::VarData::Text("2.131".into())
        );
        assert_eq!(find("DEPLOYMENT_TIME").unwrap().data.scalar(), Some(10.0));
        assert_eq!(find("DEPLOYMENT_LATITUDE").unwrap().data.scalar(), Some(50.1));
        assert!(
            find("DEPLOYMENT_LONGITUDE")
                .unwrap()
                .data
                .scalar()
                .is_some_and(f64::is_nan)
        );
        assert!(vars.iter().all(|v| v.attributes.contains("long_name")));
    }
}
