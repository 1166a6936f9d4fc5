//! Coordinate checks and grouping of dive variables by dimension.

use crate::constants::{
    BASESTATION_LATITUDE, BASESTATION_LONGITUDE, CTD_TIME, LOG_PREFIX, SG_CAL_PREFIX,
    SG_DATA_POINT,
};
use crate::models::{DiveDataset, Variable};

use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Variables keyed by their ordered dimension names
pub type DimensionGroups = BTreeMap<Vec<String>, Vec<Variable>>;

/// Dimensionless variables of a dive, split by origin
#[derive(Debug, Clone, Default)]
pub struct DiveScalars {
    /// Calibration constants with the `sg_cal_` prefix removed
    pub sg_cal: Vec<Variable>,
    /// Log file parameters (`log_*`)
    pub log: Vec<Variable>,
    /// Everything else, e.g. depth-averaged currents
    pub other: Vec<Variable>,
}

impl DiveScalars {
    /// Numeric value of a log parameter
    pub fn log_value(&self, name: &str) -> Option<f64> {
        self.log
            .iter()
            .find(|v| v.name == name)
            .and_then(|v| v.data.scalar())
    }
}

/// Make sure a dive has the coordinates the converter relies on
///
/// Missing `latitude`/`longitude` arrays are added as NaN. Returns `false`
/// when `ctd_time` is absent and the dive cannot be used.
pub fn validate_coords(dive: &mut DiveDataset) -> bool {
    let label = dive.source.display().to_string();
    let Some(samples) = dive
        .variable(CTD_TIME)
        .and_then(|v| v.data.as_numeric())
        .map(<[f64]>::len)
    else {
        warn!("{}: no variable {} - skipping dive", label, CTD_TIME);
        return false;
    };

    for coord in [BASESTATION_LONGITUDE, BASESTATION_LATITUDE] {
        if !dive.contains(coord) {
            debug!("{}: no {} - adding as NaN", label, coord);
            dive.variables.push(Variable::numeric(
                coord,
                &[SG_DATA_POINT],
                vec![f64::NAN; samples],
            ));
        }
    }
    true
}

/// Group variables by their dimension tuple, keeping file order inside a group
pub fn split_by_unique_dims(variables: Vec<Variable>) -> DimensionGroups {
    let mut groups = DimensionGroups::new();
    for var in variables {
        groups.entry(var.dims.clone()).or_default().push(var);
    }
    groups
}

/// Split dimensionless variables into calibration constants, log parameters and the rest
pub fn extract_variables(scalars: Vec<Variable>) -> DiveScalars {
    let mut out = DiveScalars::default();
    for mut var in scalars {
        if let Some(stripped) = var.name.strip_prefix(SG_CAL_PREFIX) {
            var.name = stripped.to_string();
            out.sg_cal.push(var);
        } else if var.name.starts_with(LOG_PREFIX) {
            out.log.push(var);
        } else {
            out.other.push(var);
        }
    }
    out
}
