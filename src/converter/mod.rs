//! Basestation to OG1 conversion.
//!
//! [`Converter::process_dive`] turns one basestation dive into an OG1
//! measurement table; [`Converter::assemble_mission`] stacks the dives,
//! attaches the vocabulary metadata and builds the mission dataset.

pub mod depth;
pub mod global_attrs;
pub mod gps;
pub mod platform;
pub mod profile;
pub mod rename;
pub mod sensors;
pub mod split;
pub mod variable_attrs;

use crate::config::ConverterConfig;
use crate::constants::{
    DIVE_CAST_COLUMN, DIVE_NUMBER_COLUMN, GPS_INFO, N_MEASUREMENTS, SG_DATA_POINT, og1,
    is_qc_variable, qc_parent,
};
use crate::error::{Og1Error, Result};
use crate::models::{AttrValue, Attributes, DiveDataset, MissionDataset, Variable};
use crate::processor::writer::validate_dims;
use crate::table::MeasurementTable;
use crate::vocabularies::Vocabularies;

use sensors::DetectedSensor;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Columns that only exist while a dive is being processed
const PER_DIVE_COLUMNS: [&str; 4] = ["time", og1::TIME_GPS, DIVE_NUMBER_COLUMN, DIVE_CAST_COLUMN];

/// One dive after per-dive conversion
#[derive(Debug, Clone)]
pub struct ProcessedDive {
    pub source: PathBuf,
    pub dive_number: f64,
    pub measurements: MeasurementTable,
    /// Basestation global attributes of the dive
    pub attributes: Attributes,
    pub sensors: Vec<DetectedSensor>,
    /// Vocabulary attribute mismatches
    pub warnings: BTreeSet<String>,
}

/// Applies the vocabulary tables to dives and missions
#[derive(Debug, Clone)]
pub struct Converter {
    vocab: Vocabularies,
    preferred_units: Vec<String>,
    vars_to_remove: Vec<String>,
}

impl Converter {
    pub fn new(vocab: Vocabularies, config: &ConverterConfig) -> Self {
        Self {
            vocab,
            preferred_units: config.preferred_units.clone(),
            vars_to_remove: config.vars_to_remove.clone(),
        }
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocab
    }

    /// Convert one dive; `None` when the dive has no usable measurements
    pub fn process_dive(&self, mut dive: DiveDataset) -> Result<Option<ProcessedDive>> {
        let label = dive.source.display().to_string();
        if !split::validate_coords(&mut dive) {
            return Ok(None);
        }

        let dive_number = dive
            .attributes
            .get("dive_number")
            .and_then(AttrValue::as_f64)
            .or_else(|| dive.profile_number().map(|p| p as f64))
            .ok_or_else(|| Og1Error::missing_variable("dive_number", label.clone()))?;

        let names: Vec<String> = dive.variables.iter().map(|v| v.name.clone()).collect();
        let mut groups = split::split_by_unique_dims(dive.variables);
        let mut measurement_vars = groups
            .remove(&vec![SG_DATA_POINT.to_string()])
            .unwrap_or_default();
        let gps_vars = groups.remove(&vec![GPS_INFO.to_string()]).unwrap_or_default();
        let scalars =
            split::extract_variables(groups.remove(&Vec::<String>::new()).unwrap_or_default());
        for (dims, vars) in &groups {
            debug!("{}: leaving out {} variables along {:?}", label, vars.len(), dims);
        }

        let fitted = sensors::detect_sensors(&names, &scalars, &self.vocab.sensors);

        rename::rename_dimensions(&mut measurement_vars, &self.vocab.var_names.dimensions);
        let mut table = rename::measurement_table(measurement_vars)?;
        if table.is_empty() {
            warn!("{}: no measurements - skipping dive", label);
            return Ok(None);
        }
        rename::rename_variables(&mut table, &self.vocab.var_names.names)?;

        let warnings =
            variable_attrs::assign_variable_attributes(&mut table, &self.vocab.vocab_attrs);
        variable_attrs::convert_units(&mut table, &self.preferred_units)?;

        gps::add_gps_info_to_dataset(&mut table, &gps_vars)?;
        gps::interpolate_gps_positions(&mut table)?;

        profile::add_dive_number(&mut table, dive_number)?;
        profile::assign_profile_number(&mut table)?;
        profile::assign_phase(&mut table)?;
        depth::calc_z(&mut table)?;

        for name in PER_DIVE_COLUMNS
            .iter()
            .copied()
            .chain(self.vars_to_remove.iter().map(String::as_str))
        {
            table.remove(name);
        }

        debug!(
            "{}: dive {} with {} rows and {} variables",
            label,
            dive_number,
            table.height(),
            table.names().len()
        );
        Ok(Some(ProcessedDive {
            source: dive.source,
            dive_number,
            measurements: table,
            attributes: dive.attributes,
            sensors: fitted,
            warnings,
        }))
    }

    /// Stack converted dives into one OG1 mission
    ///
    /// Returns the mission and the set of attribute warnings of all dives.
    pub fn assemble_mission(
        &self,
        mut dives: Vec<ProcessedDive>,
    ) -> Result<(MissionDataset, BTreeSet<String>)> {
        if dives.is_empty() {
            return Err(Og1Error::NoDives {
                reason: "no dive produced measurements".to_string(),
            });
        }
        dives.sort_by(|a, b| a.dive_number.total_cmp(&b.dive_number));
        info!("Assembling mission from {} dives", dives.len());

        let dive_attrs = dives[0].attributes.clone();
        let mut warnings = BTreeSet::new();
        let mut detected = Vec::with_capacity(dives.len());
        let mut tables = Vec::with_capacity(dives.len());
        for dive in dives {
            warnings.extend(dive.warnings);
            detected.push(dive.sensors);
            tables.push(dive.measurements);
        }
        let fitted = sensors::merge_detected(detected);

        let mut table = MeasurementTable::concat(tables)?;
        table.sort_by(og1::TIME)?;

        self.drop_untranslated(&mut table);
        for name in table.names() {
            if let Some(vocab) = self.vocab.attrs_for(&name) {
                variable_attrs::fill_from_vocabulary(table.attributes_mut(&name), vocab);
            }
        }
        sensors::add_sensor_attribute(&mut table, &fitted, &self.vocab.sensors);
        variable_attrs::add_qc_attributes(&mut table);

        let mut attributes = global_attrs::update_dataset_attributes(
            &dive_attrs,
            &self.vocab.global,
            &self.vocab.author,
        );
        let serial = platform::platform_serial_number(&dive_attrs).unwrap_or_else(|| {
            warn!("No glider number in the dive attributes");
            "sg000".to_string()
        });
        global_attrs::apply_data_attributes(&mut attributes, &table, &serial);
        let trajectory = attributes.get_str("id").unwrap_or_default().to_string();

        let mut scalars =
            platform::platform_variables(&dive_attrs, &trajectory, &table, &self.vocab.vocab_attrs);
        scalars.extend(sensors::sensor_variables(&fitted, &self.vocab.sensors));

        check_attributes(&table, &scalars)?;

        let dimension = self
            .vocab
            .var_names
            .dimensions
            .get(SG_DATA_POINT)
            .unwrap_or(N_MEASUREMENTS)
            .to_string();
        let mission = MissionDataset {
            measurements: table,
            scalars,
            attributes,
            dimension,
        };
        validate_dims(&mission)?;
        Ok((mission, warnings))
    }

    /// Convert dives into one OG1 mission
    pub fn convert_to_og1(
        &self,
        dives: Vec<DiveDataset>,
    ) -> Result<(MissionDataset, BTreeSet<String>)> {
        let mut processed = Vec::with_capacity(dives.len());
        for dive in dives {
            if let Some(dive) = self.process_dive(dive)? {
                processed.push(dive);
            }
        }
        self.assemble_mission(processed)
    }

    /// Remove variables without a vocabulary entry, keeping QC flags of retained variables
    fn drop_untranslated(&self, table: &mut MeasurementTable) {
        let names = table.names();
        let translated = |name: &str| self.vocab.attrs_for(name).is_some();
        for name in &names {
            if translated(name) {
                continue;
            }
            let companion = is_qc_variable(name)
                && qc_parent(name).is_some_and(|p| translated(p) && names.iter().any(|n| n == p));
            if companion {
                continue;
            }
            error!("Variable '{}' not translated - dropping", name);
            table.remove(name);
        }
    }
}

/// Every output variable must carry a `long_name`
fn check_attributes(table: &MeasurementTable, scalars: &[Variable]) -> Result<()> {
    let table_names = table.names();
    let described = |attrs: Option<&Attributes>| attrs.is_some_and(|a| a.contains("long_name"));
    for name in &table_names {
        if !described(table.attributes(name)) {
            return Err(Og1Error::MissingAttributes { name: name.clone() });
        }
    }
    for var in scalars {
        if !described(Some(&var.attributes)) {
            return Err(Og1Error::MissingAttributes {
                name: var.name.clone(),
            });
        }
    }
    Ok(())
}

/// Minimum ignoring NaN
pub fn nan_min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::min)
}

/// Maximum ignoring NaN
pub fn nan_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::max)
}

pub fn first_valid(values: &[f64]) -> Option<f64> {
    values.iter().copied().find(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::read_dive;
    use crate::test_support::{DiveSpec, write_dive_file};
    use tempfile::TempDir;

    fn converter() -> Converter {
        Converter::new(Vocabularies::builtin().unwrap(), &ConverterConfig::default())
    }

    fn dive(dir: &TempDir, spec: DiveSpec) -> DiveDataset {
        read_dive(&write_dive_file(dir.path(), &spec).unwrap()).unwrap()
    }

    #[test]
    fn test_nan_helpers() {
        let values = [f64::NAN, 3.0, -1.0, f64::NAN];
        assert_eq!(nan_min(&values), Some(-1.0));
        assert_eq!(nan_max(&values), Some(3.0));
        assert_eq!(first_valid(&values), Some(3.0));
        assert_eq!(nan_min(&[f64::NAN]), None);
    }

    #[test]
    fn test_process_dive() {
        let temp_dir = TempDir::new().unwrap();
        let processed = converter()
            .process_dive(dive(&temp_dir, DiveSpec::new(7)))
            .unwrap()
            .unwrap();

        assert_eq!(processed.dive_number, 7.0);
        let table = &processed.measurements;
        // 6 measurements plus 3 GPS fixes
        assert_eq!(table.height(), 9);
        for name in ["TIME", "PRES", "TEMP", "TEMP_QC", "DEPTH_Z", "PHASE", "PROFILE_NUMBER"] {
            assert!(table.contains(name), "missing {name}");
        }
        for name in ["time", "TIME_GPS", "divenum", "dive_num_cast", "sound_velocity"] {
            assert!(!table.contains(name), "{name} should be dropped");
        }

        let time = table.values("TIME").unwrap();
        assert!(time.windows(2).all(|w| w[0] <= w[1]));
        let lat = table.values("LATITUDE").unwrap();
        assert!(lat.iter().all(|v| !v.is_nan()));

        let vert = table.values("GLIDER_VERT_VELO_MODEL").unwrap();
        let units = table
            .attributes("GLIDER_VERT_VELO_MODEL")
            .unwrap()
            .get_str("units");
        assert_eq!(units, Some("m s-1"));
        assert!(vert.iter().filter(|v| !v.is_nan()).all(|v| v.abs() < 1.0));

        assert!(processed.sensors.iter().any(|s| s.key == "CTD" && s.serial_number == "0112"));
        assert!(!processed.sensors.iter().any(|s| s.key == "MAGNETOMETER"));
        let optode = processed
            .sensors
            .iter()
            .find(|s| s.key == "DISSOLVED_GAS")
            .unwrap();
        assert_eq!(optode.serial_number, "1109");
        assert_eq!(optode.calibration_date, "20081010");

        let qc = table.values("TEMP_QC").unwrap();
        let flags: Vec<f64> = qc.into_iter().filter(|v| !v.is_nan()).collect();
        assert_eq!(flags, vec![1.0, 1.0, 1.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_process_dive_without_ctd_time_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let result = converter()
            .process_dive(dive(&temp_dir, DiveSpec::new(1).without_ctd_time()))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_convert_to_og1() {
        let temp_dir = TempDir::new().unwrap();
        let dives = vec![
            dive(&temp_dir, DiveSpec::new(2)),
            dive(&temp_dir, DiveSpec::new(1).without_position()),
        ];

        let (mission, warnings) = converter().convert_to_og1(dives).unwrap();
        let table = &mission.measurements;
        assert_eq!(table.height(), 18);
        assert_eq!(mission.dimension, N_MEASUREMENTS);

        let profiles = table.values("PROFILE_NUMBER").unwrap();
        assert_eq!(nan_min(&profiles), Some(1.0));
        assert_eq!(nan_max(&profiles), Some(4.0));

        assert!(!table.contains("eng_mystery"));
        assert_eq!(
            table.attributes("TEMP_QC").unwrap().get_str("standard_name"),
            Some("status_flag")
        );
        assert_eq!(
            table.attributes("TEMP").unwrap().get_str("sensor"),
            Some("SENSOR_CTD_0112")
        );

        let id = mission.id().unwrap();
        assert!(id.starts_with("sg015_"), "{id}");
        assert!(id.ends_with("_delayed"));
        assert!(mission.scalars.iter().any(|v| v.name == "PLATFORM_SERIAL_NUMBER"));
        assert!(mission.scalars.iter().any(|v| v.name == "SENSOR_CTD_0112"));
        assert!(warnings.iter().any(|w| w.contains("GLIDER_VERT_VELO_MODEL")));
    }

    #[test]
    fn test_convert_without_usable_dives() {
        let temp_dir = TempDir::new().unwrap();
        let dives = vec![dive(&temp_dir, DiveSpec::new(3).without_ctd_time())];
        assert!(matches!(
            converter().convert_to_og1(dives),
            Err(Og1Error::NoDives { .. })
        ));
    }
}
