//! OG1 vocabulary and mapping tables.
//!
//! The tables live in `config/*.toml` and are compiled into the binary.
//! A directory passed with `--config-dir` may hold replacements for any of
//! them under the same file names.

use crate::error::{Og1Error, Result};
use crate::models::Attributes;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

const VAR_NAMES_FILE: &str = "og1_var_names.toml";
const VOCAB_ATTRS_FILE: &str = "og1_vocab_attrs.toml";
const SENSOR_ATTRS_FILE: &str = "og1_sensor_attrs.toml";
const GLOBAL_ATTRS_FILE: &str = "og1_global_attrs.toml";
const AUTHOR_FILE: &str = "og1_author.toml";

const DEFAULT_VAR_NAMES: &str = include_str!("../config/og1_var_names.toml");
const DEFAULT_VOCAB_ATTRS: &str = include_str!("../config/og1_vocab_attrs.toml");
const DEFAULT_SENSOR_ATTRS: &str = include_str!("../config/og1_sensor_attrs.toml");
const DEFAULT_GLOBAL_ATTRS: &str = include_str!("../config/og1_global_attrs.toml");
const DEFAULT_AUTHOR: &str = include_str!("../config/og1_author.toml");

/// Ordered string to string mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameMap(Vec<(String, String)>);

impl NameMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }
}

impl<'de> Deserialize<'de> for NameMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NameMapVisitor;

        impl<'de> Visitor<'de> for NameMapVisitor {
            type Value = NameMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of name mappings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<NameMap, A::Error> {
                let mut pairs = Vec::new();
                while let Some(pair) = map.next_entry::<String, String>()? {
                    pairs.push(pair);
                }
                Ok(NameMap(pairs))
            }
        }

        deserializer.deserialize_map(NameMapVisitor)
    }
}

/// Dimension and variable renames
#[derive(Debug, Clone, Deserialize)]
pub struct NameTable {
    pub dimensions: NameMap,
    pub names: NameMap,
}

/// Scalar log parameter that must differ from a value for a sensor to count
#[derive(Debug, Clone, Deserialize)]
pub struct SensorRequirement {
    pub variable: String,
    pub not_equal: f64,
}

/// A sensor that may be fitted to the glider
#[derive(Debug, Clone, Deserialize)]
pub struct SensorSpec {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub calibcomm: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
    pub require: Option<SensorRequirement>,
    pub attributes: Attributes,
}

/// Global attribute templates
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalAttrTemplates {
    pub attr_as_is: Vec<String>,
    pub order_of_attr: Vec<String>,
    pub attr_to_add: Attributes,
    /// New name mapped from the basestation name
    pub attr_to_rename: NameMap,
}

/// All tables needed for one conversion
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub var_names: NameTable,
    pub vocab_attrs: HashMap<String, Attributes>,
    pub sensors: BTreeMap<String, SensorSpec>,
    pub global: GlobalAttrTemplates,
    pub author: Attributes,
}

impl Vocabularies {
    /// Load the tables, preferring files found in `config_dir`
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let vocab = Self {
            var_names: parse_table(config_dir, VAR_NAMES_FILE, DEFAULT_VAR_NAMES)?,
            vocab_attrs: parse_table(config_dir, VOCAB_ATTRS_FILE, DEFAULT_VOCAB_ATTRS)?,
            sensors: parse_table(config_dir, SENSOR_ATTRS_FILE, DEFAULT_SENSOR_ATTRS)?,
            global: parse_table(config_dir, GLOBAL_ATTRS_FILE, DEFAULT_GLOBAL_ATTRS)?,
            author: parse_table(config_dir, AUTHOR_FILE, DEFAULT_AUTHOR)?,
        };
        vocab.validate()?;
        debug!(
            "Loaded {} variable renames, {} vocabulary entries, {} sensors",
            vocab.var_names.names.0.len(),
            vocab.vocab_attrs.len(),
            vocab.sensors.len()
        );
        Ok(vocab)
    }

    /// Built-in tables
    pub fn builtin() -> Result<Self> {
        Self::load(None)
    }

    /// Vocabulary attributes for an OG1 variable
    pub fn attrs_for(&self, name: &str) -> Option<&Attributes> {
        self.vocab_attrs.get(name)
    }

    /// Whether a variable resolves to a complete attribute set
    pub fn is_complete(&self, name: &str) -> bool {
        self.attrs_for(name).is_some_and(|a| a.contains("long_name"))
    }

    /// Every vocabulary entry and rename target must be complete
    pub fn validate(&self) -> Result<()> {
        let mut incomplete: Vec<&str> = self
            .vocab_attrs
            .iter()
            .filter(|(_, attrs)| !attrs.contains("long_name"))
            .map(|(name, _)| name.as_str())
            .collect();
        incomplete.sort_unstable();
        if let Some(name) = incomplete.first() {
            return Err(Og1Error::configuration(format!(
                "'{name}' in {VOCAB_ATTRS_FILE} has no long_name"
            )));
        }
        for target in self.var_names.names.values() {
            if !self.is_complete(target) {
                return Err(Og1Error::configuration(format!(
                    "{VAR_NAMES_FILE} maps to '{target}' which has no long_name in {VOCAB_ATTRS_FILE}"
                )));
            }
        }
        if self.var_names.dimensions.get(crate::constants::SG_DATA_POINT).is_none() {
            return Err(Og1Error::configuration(format!(
                "{VAR_NAMES_FILE} has no rename for dimension '{}'",
                crate::constants::SG_DATA_POINT
            )));
        }
        Ok(())
    }
}

fn parse_table<T: for<'de> Deserialize<'de>>(
    config_dir: Option<&Path>,
    file_name: &str,
    builtin: &str,
) -> Result<T> {
    if let Some(path) = config_dir.map(|d| d.join(file_name)).filter(|p| p.is_file()) {
        info!("Using {} from {}", file_name, path.display());
        let text = std::fs::read_to_string(&path)?;
        return Ok(toml::from_str(&text)?);
    }
    Ok(toml::from_str(builtin)?)
}
