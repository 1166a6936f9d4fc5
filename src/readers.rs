//! Basestation per-dive netCDF reader.
//!
//! Loads every variable of a dive file into a [`DiveDataset`]. Numeric data
//! is widened to `f64` with fill values mapped to NaN; character data becomes
//! text, except flag arrays along a data dimension which become digit codes.

use crate::config::ProfileRange;
use crate::constants::{GPS_INFO, SG_DATA_POINT, fill};
use crate::error::{Og1Error, Result};
use crate::models::{AttrValue, Attributes, DiveDataset, VarData, Variable};
use crate::processor::discovery::{DiveSource, FileDiscovery};

use netcdf::AttributeValue;
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::path::Path;
use tokio::task;
use tracing::{debug, info, warn};

/// Storage attributes that do not survive the read
const STORAGE_ATTRIBUTES: &[&str] = &["_FillValue", "missing_value", "coordinates"];

/// Read one basestation dive file
pub fn read_dive(path: &Path) -> Result<DiveDataset> {
    let file = netcdf::open(path)?;
    let attributes = read_attributes(file.attributes());

    let mut variables = Vec::new();
    for var in file.variables() {
        match read_variable(&var) {
            Ok(Some(variable)) => variables.push(variable),
            Ok(None) => debug!("{}: skipping '{}' of unsupported type", path.display(), var.name()),
            Err(e) => warn!("{}: could not read '{}': {}", path.display(), var.name(), e),
        }
    }

    debug!(
        "Read {} variables and {} attributes from {}",
        variables.len(),
        attributes.len(),
        path.display()
    );
    Ok(DiveDataset {
        source: path.to_path_buf(),
        variables,
        attributes,
    })
}

/// Discover and read every dive of a source in the profile range
///
/// Files that fail to open are logged and left out.
pub async fn read_basestation(
    source: &str,
    range: ProfileRange,
    cache_dir: &Path,
) -> Result<Vec<DiveDataset>> {
    let source = DiveSource::parse(source)?;
    let discovery = FileDiscovery::new(source.clone(), range, cache_dir.to_path_buf());
    let discovered = discovery.discover_dive_files().await?;
    info!("Reading {} dive files from {}", discovered.files.len(), source);

    let mut dives = Vec::with_capacity(discovered.files.len());
    for path in discovered.files {
        let shown = path.clone();
        let result = task::spawn_blocking(move || read_dive(&path))
            .await
            .map_err(|e| Og1Error::ProcessingFailed {
                path: shown.clone(),
                reason: e.to_string(),
            })?;
        match result {
            Ok(dive) => dives.push(dive),
            Err(e) => warn!("Skipping {}: {}", shown.display(), e),
        }
    }
    Ok(dives)
}

fn read_attributes<'f>(attrs: impl Iterator<Item = netcdf::Attribute<'f>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        let name = attr.name().to_string();
        match attr.value() {
            Ok(value) => match convert_attribute(value) {
                Some(v) => out.set(name, v),
                None => debug!("Ignoring attribute '{}' of unsupported type", name),
            },
            Err(e) => warn!("Could not read attribute '{}': {}", name, e),
        }
    }
    out
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    fn ints<T: Into<i64>>(v: Vec<T>) -> AttrValue {
        AttrValue::Ints(v.into_iter().map(Into::into).collect())
    }

    let converted = match value {
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Ulonglong(v) => AttrValue::Int(v as i64),
        AttributeValue::Float(v) => AttrValue::Float(v.into()),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Uchars(v) => ints(v),
        AttributeValue::Schars(v) => AttrValue::Bytes(v),
        AttributeValue::Ushorts(v) => ints(v),
        AttributeValue::Shorts(v) => ints(v),
        AttributeValue::Uints(v) => ints(v),
        AttributeValue::Ints(v) => ints(v),
        AttributeValue::Longlongs(v) => AttrValue::Ints(v),
        AttributeValue::Ulonglongs(v) => AttrValue::Ints(v.into_iter().map(|x| x as i64).collect()),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(Into::into).collect()),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        AttributeValue::Strs(v) => AttrValue::Text(v.join(", ")),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}

fn read_variable(var: &netcdf::Variable) -> Result<Option<Variable>> {
    let name = var.name();
    let mut dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let mut attributes = read_attributes(var.attributes());
    let fill_value = attributes.get("_FillValue").and_then(AttrValue::as_f64);
    let missing_value = attributes.get("missing_value").and_then(AttrValue::as_f64);
    for attr in STORAGE_ATTRIBUTES {
        attributes.remove(attr);
    }

    let data = match var.vartype() {
        NcVariableType::Char => {
            let bytes = var.get_raw_values(..)?;
            if dims.len() == 1 && is_data_dimension(&dims[0]) {
                VarData::Numeric(char_codes(&bytes))
            } else {
                // Trailing dimension is the string length
                dims.pop();
                VarData::Text(decode_text(&bytes))
            }
        }
        NcVariableType::String if dims.is_empty() => VarData::Text(var.get_string(..)?),
        NcVariableType::Int(_) | NcVariableType::Float(_) => {
            let mut values = read_numeric(var)?;
            mask_fill_values(&mut values, fill_value, missing_value);
            VarData::Numeric(values)
        }
        _ => return Ok(None),
    };

    Ok(Some(Variable {
        name,
        dims,
        data,
        attributes,
    }))
}

fn read_numeric(var: &netcdf::Variable) -> Result<Vec<f64>> {
    macro_rules! widen {
        ($t:ty) => {
            var.get_values::<$t, _>(..)?
                .into_iter()
                .map(|v| v as f64)
                .collect()
        };
    }

    let values = match var.vartype() {
        NcVariableType::Float(FloatType::F64) => var.get_values::<f64, _>(..)?,
        NcVariableType::Float(FloatType::F32) => widen!(f32),
        NcVariableType::Int(IntType::I8) => widen!(i8),
        NcVariableType::Int(IntType::U8) => widen!(u8),
        NcVariableType::Int(IntType::I16) => widen!(i16),
        NcVariableType::Int(IntType::U16) => widen!(u16),
        NcVariableType::Int(IntType::I32) => widen!(i32),
        NcVariableType::Int(IntType::U32) => widen!(u32),
        NcVariableType::Int(IntType::I64) => widen!(i64),
        NcVariableType::Int(IntType::U64) => widen!(u64),
        _ => Vec::new(),
    };
    Ok(values)
}

/// Replace declared fill values and netCDF default float fills with NaN
fn mask_fill_values(values: &mut [f64], fill_value: Option<f64>, missing_value: Option<f64>) {
    for v in values.iter_mut() {
        if Some(*v) == fill_value
            || Some(*v) == missing_value
            || v.abs() >= fill::DOUBLE_THRESHOLD
        {
            *v = f64::NAN;
        }
    }
}

fn is_data_dimension(dim: &str) -> bool {
    dim == SG_DATA_POINT || dim == GPS_INFO
}

/// Per-sample flag codes from a character array; non-digits become NaN
pub(crate) fn char_codes(bytes: &[u8]) -> Vec<f64> {
    bytes
        .iter()
        .map(|b| {
            if b.is_ascii_digit() {
                f64::from(b - b'0')
            } else {
                f64::NAN
            }
        })
        .collect()
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}
