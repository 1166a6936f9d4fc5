//! OG1 netCDF writer
//!
//! Serialises a [`MissionDataset`] to a netCDF-4 file with one measurement
//! dimension. Each variable gets the narrowest storage type that holds its
//! values; integer variables store NaN as the netCDF default fill value.

use crate::config::ConverterConfig;
use crate::constants::{N_MEASUREMENTS, fill, is_qc_variable};
use crate::error::{Og1Error, Result};
use crate::models::{AttrValue, Attributes, MissionDataset, VarData};

use netcdf::AttributeValue;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk type of a measurement variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    I8,
    I16,
    I32,
    F64,
}

/// Pick the storage type for a variable from its name and values
pub fn find_best_dtype(name: &str, values: &[f64]) -> StorageType {
    let lower = name.to_lowercase();
    if lower.contains("latitude") || lower.contains("longitude") || lower.contains("time") {
        return StorageType::F64;
    }
    if is_qc_variable(name) {
        return StorageType::I8;
    }

    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return StorageType::F64;
    }
    let integral = valid.iter().all(|v| v.fract() == 0.0);
    if !integral && !lower.ends_with("raw") {
        return StorageType::F64;
    }

    let max_abs = valid.iter().fold(0.0_f64, |m, v| m.max(v.abs().round()));
    if max_abs < f64::from(fill::SHORT) {
        StorageType::I16
    } else if max_abs < f64::from(fill::INT) {
        StorageType::I32
    } else {
        StorageType::F64
    }
}

/// The mission must use the OG1 measurement dimension and scalars must be dimensionless
pub fn validate_dims(mission: &MissionDataset) -> Result<()> {
    if mission.dimension != N_MEASUREMENTS {
        return Err(Og1Error::InvalidDimension {
            expected: N_MEASUREMENTS.to_string(),
            found: mission.dimension.clone(),
        });
    }
    if let Some(var) = mission.scalars.iter().find(|v| !v.dims.is_empty()) {
        return Err(Og1Error::InvalidDimension {
            expected: N_MEASUREMENTS.to_string(),
            found: var.dims.join(", "),
        });
    }
    Ok(())
}

/// Writes missions to OG1 netCDF files
#[derive(Debug, Clone)]
pub struct Og1Writer {
    output_path: PathBuf,
    compression_level: i32,
    overwrite: bool,
}

impl Og1Writer {
    pub fn new(output_path: PathBuf, config: &ConverterConfig) -> Self {
        Self {
            output_path,
            compression_level: config.compression_level,
            overwrite: config.overwrite,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the mission, returning the number of measurements written
    pub fn write(&self, mission: &MissionDataset) -> Result<usize> {
        save_dataset(mission, &self.output_path, self.compression_level, self.overwrite)?;
        Ok(mission.measurements.height())
    }
}

/// Save a mission as netCDF-4
///
/// Parent directories are created. An existing file is only replaced when
/// `overwrite` is set.
pub fn save_dataset(
    mission: &MissionDataset,
    path: &Path,
    compression_level: i32,
    overwrite: bool,
) -> Result<()> {
    validate_dims(mission)?;
    if path.exists() {
        if !overwrite {
            return Err(Og1Error::OutputExists {
                path: path.to_path_buf(),
            });
        }
        debug!("Replacing {}", path.display());
        fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = netcdf::create(path)?;
    let table = &mission.measurements;
    file.add_dimension(&mission.dimension, table.height())?;

    for name in table.names() {
        let values = table.values(&name)?;
        let attrs = table.attributes(&name).cloned().unwrap_or_default();
        let storage = find_best_dtype(&name, &values);
        debug!("Writing {} as {:?}", name, storage);

        let mut var = match storage {
            StorageType::I8 => {
                let mut var = file.add_variable::<i8>(&name, &[mission.dimension.as_str()])?;
                var.set_fill_value(fill::BYTE)?;
                var.put_values(&to_integers(&values, fill::BYTE), ..)?;
                var
            }
            StorageType::I16 => {
                let mut var = file.add_variable::<i16>(&name, &[mission.dimension.as_str()])?;
                var.set_fill_value(fill::SHORT)?;
                var.put_values(&to_integers(&values, fill::SHORT), ..)?;
                var
            }
            StorageType::I32 => {
                let mut var = file.add_variable::<i32>(&name, &[mission.dimension.as_str()])?;
                var.set_fill_value(fill::INT)?;
                var.put_values(&to_integers(&values, fill::INT), ..)?;
                var
            }
            StorageType::F64 => {
                let mut var = file.add_variable::<f64>(&name, &[mission.dimension.as_str()])?;
                var.set_fill_value(f64::NAN)?;
                var.put_values(&values, ..)?;
                var
            }
        };
        if compression_level > 0 {
            var.set_compression(compression_level, true)?;
        }
        for (attr, value) in attrs.iter() {
            if attr == "_FillValue" {
                debug!("{}: _FillValue comes from the storage type", name);
                continue;
            }
            let value = range_attribute(storage, attr, value)
                .unwrap_or_else(|| attribute_value(&name, attr, value));
            var.put_attribute(attr, value)?;
        }
    }

    for scalar in &mission.scalars {
        match &scalar.data {
            VarData::Numeric(values) => {
                let mut var = file.add_variable::<f64>(&scalar.name, &[])?;
                var.put_values(&values[..values.len().min(1)], ..)?;
                put_attributes(&mut var, &scalar.name, &scalar.attributes)?;
            }
            VarData::Text(text) => {
                let mut var = file.add_string_variable(&scalar.name, &[])?;
                var.put_string(text, ..)?;
                put_attributes(&mut var, &scalar.name, &scalar.attributes)?;
            }
        }
    }

    for (attr, value) in mission.attributes.iter() {
        file.add_attribute(attr, attribute_value("global", attr, value))?;
    }

    info!(
        "Wrote {} measurements of {} variables to {}",
        table.height(),
        table.names().len() + mission.scalars.len(),
        path.display()
    );
    Ok(())
}

fn put_attributes(
    var: &mut netcdf::VariableMut<'_>,
    owner: &str,
    attrs: &Attributes,
) -> Result<()> {
    for (attr, value) in attrs.iter() {
        var.put_attribute(attr, attribute_value(owner, attr, value))?;
    }
    Ok(())
}

/// NaN becomes the type's fill value; everything else is rounded
fn to_integers<T>(values: &[f64], fill_value: T) -> Vec<T>
where
    T: Copy + TryFrom<i64>,
{
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                fill_value
            } else {
                T::try_from(v.round() as i64).unwrap_or(fill_value)
            }
        })
        .collect()
}

/// Range attributes of an integer variable in the variable's own type
fn range_attribute(storage: StorageType, name: &str, value: &AttrValue) -> Option<AttributeValue> {
    if !matches!(name, "valid_min" | "valid_max" | "valid_range") {
        return None;
    }
    let values: Vec<f64> = match value {
        AttrValue::Int(i) => vec![*i as f64],
        AttrValue::Float(v) => vec![*v],
        AttrValue::Ints(v) => v.iter().map(|i| *i as f64).collect(),
        AttrValue::Floats(v) => v.clone(),
        _ => return None,
    };
    let rounded = values.iter().map(|v| v.round());
    // Float to int casts saturate at the type bounds
    let cast = match storage {
        StorageType::I8 => AttributeValue::Schars(rounded.map(|v| v as i8).collect()),
        StorageType::I16 => AttributeValue::Shorts(rounded.map(|v| v as i16).collect()),
        StorageType::I32 => AttributeValue::Ints(rounded.map(|v| v as i32).collect()),
        StorageType::F64 => return None,
    };
    Some(match cast {
        AttributeValue::Schars(v) if v.len() == 1 => AttributeValue::Schar(v[0]),
        AttributeValue::Shorts(v) if v.len() == 1 => AttributeValue::Short(v[0]),
        AttributeValue::Ints(v) if v.len() == 1 => AttributeValue::Int(v[0]),
        other => other,
    })
}

fn attribute_value(owner: &str, name: &str, value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Bool(b) => {
            warn!("{}: boolean attribute '{}' written as text", owner, name);
            AttributeValue::Str(b.to_string())
        }
        AttrValue::Int(i) => match i32::try_from(*i) {
            Ok(v) => AttributeValue::Int(v),
            Err(_) => AttributeValue::Longlong(*i),
        },
        AttrValue::Float(v) => AttributeValue::Double(*v),
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Ints(v) => {
            match v.iter().map(|i| i32::try_from(*i)).collect::<std::result::Result<Vec<_>, _>>() {
                Ok(ints) => AttributeValue::Ints(ints),
                Err(_) => AttributeValue::Longlongs(v.clone()),
            }
        }
        AttrValue::Floats(v) => AttributeValue::Doubles(v.clone()),
        AttrValue::Bytes(v) => AttributeValue::Schars(v.clone()),
    }
}
