//! Core data structures for the conversion pipeline.
//!
//! Defines attribute values, variables, per-dive and mission datasets, and
//! the processing statistics returned to the caller.

use crate::table::MeasurementTable;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A netCDF attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    /// Signed bytes, used for QC flag values
    Bytes(Vec<i8>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar numeric value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => write!(f, "{s}"),
            AttrValue::Ints(v) => write!(f, "[{}]", join(v)),
            AttrValue::Floats(v) => write!(f, "[{}]", join(v)),
            AttrValue::Bytes(v) => write!(f, "[{}]", join(v)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

/// Insertion-ordered attribute map
///
/// netCDF keeps attributes in definition order and OG1 prescribes an order
/// for global attributes, so this is a vector of pairs rather than a hash map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attributes(Vec<(String, AttrValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let pos = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of attribute values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Attributes, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((key, value)) = map.next_entry::<String, AttrValue>()? {
                    attrs.set(key, value);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// Variable payload
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    Numeric(Vec<f64>),
    Text(String),
}

impl VarData {
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            VarData::Numeric(v) => Some(v),
            VarData::Text(_) => None,
        }
    }

    /// First value of a numeric variable
    pub fn scalar(&self) -> Option<f64> {
        self.as_numeric().and_then(|v| v.first().copied())
    }
}

/// A named netCDF variable with its dimensions and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: VarData,
    pub attributes: Attributes,
}

impl Variable {
    pub fn numeric(name: impl Into<String>, dims: &[&str], values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data: VarData::Numeric(values),
            attributes: Attributes::new(),
        }
    }

    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self::numeric(name, &[], vec![value])
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: Vec::new(),
            data: VarData::Text(value.into()),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Contents of one basestation per-dive file
#[derive(Debug, Clone, Default)]
pub struct DiveDataset {
    pub source: PathBuf,
    pub variables: Vec<Variable>,
    pub attributes: Attributes,
}

impl DiveDataset {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Profile number encoded in the file name (`p0150500_...` gives 500)
    pub fn profile_number(&self) -> Option<i64> {
        self.source
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(crate::processor::discovery::profile_number)
    }
}

/// Converted OG1 mission, ready to write
#[derive(Debug, Clone)]
pub struct MissionDataset {
    /// Variables along `N_MEASUREMENTS`, sorted by time
    pub measurements: MeasurementTable,
    /// Scalar platform and sensor variables
    pub scalars: Vec<Variable>,
    pub attributes: Attributes,
    /// Name of the measurement dimension
    pub dimension: String,
}

impl MissionDataset {
    /// Identifier used for the output file name
    pub fn id(&self) -> Option<&str> {
        self.attributes.get_str("id")
    }
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub dives_found: usize,
    pub dives_processed: usize,
    pub dives_skipped: usize,
    pub dives_failed: usize,
    pub total_measurements: usize,
    pub attribute_warnings: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
}
