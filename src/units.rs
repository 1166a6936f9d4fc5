//! Unit string normalisation and multiplicative unit conversion.

use tracing::warn;

/// Basestation unit spellings and their OG1 form
const UNIT_STR_FORMAT: &[(&str, &str)] = &[
    ("m/s", "m s-1"),
    ("cm/s", "cm s-1"),
    ("S/m", "S m-1"),
    ("mS/cm", "mS cm-1"),
    ("meters", "m"),
    ("degrees_Celsius", "Celsius"),
    ("degreesCelsius", "Celsius"),
    ("g/m^3", "g m-3"),
    ("kg/m^3", "kg m-3"),
];

/// A multiplicative conversion between two unit strings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    pub current_unit: &'static str,
    pub new_unit: &'static str,
    pub factor: f64,
}

const fn conv(current_unit: &'static str, new_unit: &'static str, factor: f64) -> UnitConversion {
    UnitConversion {
        current_unit,
        new_unit,
        factor,
    }
}

pub const UNIT_CONVERSIONS: &[UnitConversion] = &[
    conv("cm s-1", "m s-1", 0.01),
    conv("cm/s", "m/s", 0.01),
    conv("m/s", "cm/s", 100.0),
    conv("m s-1", "cm s-1", 100.0),
    conv("S/m", "mS/cm", 0.1),
    conv("S m-1", "mS cm-1", 0.1),
    conv("mS/cm", "S/m", 10.0),
    conv("mS cm-1", "S m-1", 10.0),
    conv("dbar", "Pa", 10000.0),
    conv("Pa", "dbar", 0.0001),
    conv("dbar", "kPa", 10.0),
    conv("degreesCelsius", "Celsius", 1.0),
    conv("Celsius", "degreesCelsius", 1.0),
    conv("m", "cm", 100.0),
    conv("m", "km", 0.001),
    conv("cm", "m", 0.01),
    conv("km", "m", 1000.0),
    conv("g/m3", "kg/m3", 0.001),
    conv("g m-3", "kg m-3", 0.001),
    conv("kg/m3", "g/m3", 1000.0),
    conv("kg m-3", "g m-3", 1000.0),
];

/// Reformat a unit string to its OG1 spelling, unknown units pass through
pub fn format_unit(unit: &str) -> &str {
    UNIT_STR_FORMAT
        .iter()
        .find(|(from, _)| *from == unit)
        .map(|(_, to)| *to)
        .unwrap_or(unit)
}

/// Look up a conversion from `current` to `new`
pub fn find_conversion(current: &str, new: &str) -> Option<&'static UnitConversion> {
    UNIT_CONVERSIONS
        .iter()
        .find(|c| c.current_unit == current && c.new_unit == new)
}

/// First conversion from `current` into one of the preferred units
pub fn preferred_conversion(
    current: &str,
    preferred: &[String],
) -> Option<&'static UnitConversion> {
    UNIT_CONVERSIONS
        .iter()
        .find(|c| c.current_unit == current && preferred.iter().any(|p| p == c.new_unit))
}

/// Convert a value between units
///
/// Returns the value unchanged with the current unit when no conversion is
/// known.
pub fn convert_units_var(value: f64, current: &str, new: &str) -> (f64, String) {
    match find_conversion(current, new) {
        Some(c) => (value * c.factor, c.new_unit.to_string()),
        None => {
            warn!("No conversion information found for {} to {}", current, new);
            (value, current.to_string())
        }
    }
}
