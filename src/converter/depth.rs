//! Height from sea pressure (TEOS-10).

use crate::constants::og1;
use crate::error::{Og1Error, Result};
use crate::models::Attributes;
use crate::table::MeasurementTable;

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
const GAMMA: f64 = 2.26e-7;
const DB2PA: f64 = 1e4;

/// Dynamic enthalpy of Standard Seawater at 0 degC (J/kg) as a function of sea pressure
fn enthalpy_sso_0(p: f64) -> f64 {
    const H006: f64 = -2.107_876_881_0e-9;
    const H007: f64 = 2.801_929_132_9e-10;
    let z = p * 1e-4;
    let dynamic = z
        * (9.726_613_854_843_870e-4
            + z * (-2.252_956_605_630_465e-5
                + z * (2.376_909_655_387_404e-6
                    + z * (-1.664_294_869_986_011e-7
                        + z * (-5.988_108_894_465_758e-9 + z * (H006 + H007 * z))))));
    dynamic * DB2PA * 1e4
}

/// Height (m, negative below the sea surface) from sea pressure (dbar) and latitude (degrees)
pub fn z_from_p(p: f64, lat: f64) -> f64 {
    if p.is_nan() || lat.is_nan() {
        return f64::NAN;
    }
    let sin2 = (lat * DEG2RAD).sin().powi(2);
    let b = 9.780327 * (1.0 + (5.2792e-3 + 2.32e-5 * sin2) * sin2);
    let a = -0.5 * GAMMA * b;
    let c = enthalpy_sso_0(p);
    -2.0 * c / (b + (b * b - 4.0 * a * c).sqrt())
}

/// Add `DEPTH_Z`, positive up, computed from `PRES` and `LATITUDE`
pub fn calc_z(table: &mut MeasurementTable) -> Result<()> {
    let pres = table
        .get(og1::PRES)
        .ok_or_else(|| Og1Error::missing_variable(og1::PRES, "DEPTH_Z calculation"))?;
    let lat = table
        .get(og1::LATITUDE)
        .ok_or_else(|| Og1Error::missing_variable(og1::LATITUDE, "DEPTH_Z calculation"))?;

    let depth = pres.iter().zip(&lat).map(|(p, l)| z_from_p(*p, *l)).collect();
    let attrs: Attributes = [
        ("units", "m"),
        ("positive", "up"),
        ("standard_name", "depth"),
        (
            "comment",
            "Depth calculated from pressure using the TEOS-10 z_from_p formula, positive up.",
        ),
    ]
    .into_iter()
    .collect();
    table.insert(og1::DEPTH_Z, depth, attrs)
}
