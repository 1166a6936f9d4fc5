//! Dimension and variable renaming into the OG1 vocabulary.

use crate::constants::RENAME_SUFFIXES;
use crate::error::Result;
use crate::models::{VarData, Variable};
use crate::table::MeasurementTable;
use crate::vocabularies::NameMap;

use tracing::{debug, warn};

/// Rename dimensions of every variable; returns how many variables were touched
pub fn rename_dimensions(variables: &mut [Variable], renames: &NameMap) -> usize {
    let mut touched = 0;
    for var in variables.iter_mut() {
        let mut changed = false;
        for dim in var.dims.iter_mut() {
            if let Some(new) = renames.get(dim) {
                *dim = new.to_string();
                changed = true;
            }
        }
        if changed {
            touched += 1;
        }
    }
    if touched == 0 {
        warn!("No variables with dimensions matching the dimension rename table");
    }
    touched
}

/// Build the measurement table from variables sharing the measurement dimension
///
/// Text variables have no place in a numeric table and are left out.
pub fn measurement_table(variables: Vec<Variable>) -> Result<MeasurementTable> {
    let mut table = MeasurementTable::new();
    for var in variables {
        match var.data {
            VarData::Numeric(values) => table.insert(&var.name, values, var.attributes)?,
            VarData::Text(_) => debug!("Leaving text variable '{}' out of measurements", var.name),
        }
    }
    Ok(table)
}

/// Rename basestation variables and their `_qc`/`_raw`/`_raw_qc` variants
///
/// An existing target is kept and the source left untouched.
pub fn rename_variables(table: &mut MeasurementTable, renames: &NameMap) -> Result<()> {
    for (old_name, new_name) in renames.iter() {
        for suffix in RENAME_SUFFIXES {
            let source = format!("{old_name}{suffix}");
            if !table.contains(&source) {
                continue;
            }
            let target = format!("{new_name}{}", suffix.to_uppercase());
            if table.contains(&target) {
                warn!(
                    "Variable '{}' already exists; not renaming '{}'",
                    target, source
                );
                continue;
            }
            table.rename(&source, &target)?;
        }
    }
    Ok(())
}
