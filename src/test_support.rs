//! Synthetic basestation dive files for tests.

use crate::constants::{GPS_INFO, SG_DATA_POINT};
use crate::error::Result;
use netcdf::types::NcVariableType;
use std::path::{Path, PathBuf};

pub(crate) const FIXTURE_FILL: f64 = -999.0;

const CALIBCOMM_LEN: &str = "string_48";
const CALIBCOMM_WIDTH: usize = 48;

/// Shape of a synthetic dive
#[derive(Debug, Clone)]
pub(crate) struct DiveSpec {
    pub dive_number: i32,
    pub with_ctd_time: bool,
    pub with_position: bool,
}

impl DiveSpec {
    pub fn new(dive_number: i32) -> Self {
        Self {
            dive_number,
            with_ctd_time: true,
            with_position: true,
        }
    }

    pub fn without_ctd_time(mut self) -> Self {
        self.with_ctd_time = false;
        self
    }

    pub fn without_position(mut self) -> Self {
        self.with_position = false;
        self
    }

    pub fn file_name(&self) -> String {
        format!("p015{:04}_20040924.nc", self.dive_number)
    }

    /// First CTD sample time of the dive
    pub fn start_time(&self) -> f64 {
        1_096_020_000.0 + f64::from(self.dive_number) * 10_000.0
    }
}

/// Write a basestation-like dive file with six samples and three GPS fixes
pub(crate) fn write_dive_file(dir: &Path, spec: &DiveSpec) -> Result<PathBuf> {
    let path = dir.join(spec.file_name());
    let mut file = netcdf::create(&path)?;
    let t0 = spec.start_time();

    file.add_dimension(SG_DATA_POINT, 6)?;
    file.add_dimension(GPS_INFO, 3)?;

    file.add_attribute("dive_number", spec.dive_number)?;
    file.add_attribute("id", format!("p015{:04}", spec.dive_number).as_str())?;
    file.add_attribute("platform_id", "SG015")?;
    file.add_attribute("glider", 15i32)?;
    file.add_attribute("time_coverage_start", "2004-09-24T10:00:00Z")?;
    file.add_attribute("time_coverage_end", "2004-09-24T11:40:00Z")?;
    file.add_attribute("date_created", "2004-09-25T08:00:00Z")?;
    file.add_attribute("creator_name", "Ada Pilot")?;
    file.add_attribute("creator_email", "pilot@example.org")?;
    file.add_attribute("institution", "School of Oceanography, University of Washington")?;
    file.add_attribute("summary", "Labrador Sea")?;
    file.add_attribute("uuid", "a1b2c3")?;
    file.add_attribute("history", "Created by basestation")?;
    file.add_attribute("project", "Labrador Sea gliders")?;
    file.add_attribute("naming_authority", "edu.washington.apl")?;
    file.add_attribute("license", "CC-BY-4.0")?;
    file.add_attribute("seaglider_software_version", "66.04")?;
    file.add_attribute("base_station_version", "2.13")?;
    file.add_attribute("base_station_micro_version", "1")?;

    let samples = |offsets: [f64; 6]| -> Vec<f64> { offsets.iter().map(|o| t0 + o).collect() };

    let mut measurements: Vec<(&str, Vec<f64>, Option<&str>)> = vec![
        ("ctd_pressure", vec![5.0, 100.0, 200.0, 150.0, 50.0, 2.0], Some("dbar")),
        ("ctd_depth", vec![5.0, 99.0, 198.0, 149.0, 50.0, 2.0], Some("meters")),
        ("temperature", vec![10.5, 9.0, 8.0, 8.5, 9.5, 10.4], Some("degrees_Celsius")),
        ("salinity", vec![34.9, 35.0, 35.1, 35.05, 34.95, 34.9], Some("1e-3")),
        ("conductivity", vec![3.5, 3.4, 3.3, 3.35, 3.45, 3.5], Some("S/m")),
        ("vert_speed", vec![-10.0, -12.0, -11.0, 9.0, 11.0, 10.0], Some("cm/s")),
        ("eng_head", vec![90.0, 91.0, 92.0, 270.0, 271.0, 272.0], Some("degrees")),
        ("eng_sbect_tempFreq", vec![4000.0; 6], None),
        ("sound_velocity", vec![1490.0; 6], Some("m/s")),
        ("time", samples([0.0, 600.0, 1200.0, 1800.0, 2400.0, 3000.0]), None),
        ("eng_mystery", vec![1.5; 6], None),
    ];
    if spec.with_ctd_time {
        measurements.push((
            "ctd_time",
            samples([0.0, 600.0, 1200.0, 1800.0, 2400.0, 3000.0]),
            Some("seconds since 1970-1-1 00:00:00"),
        ));
    }
    if spec.with_position {
        measurements.push((
            "latitude",
            vec![FIXTURE_FILL, 50.02, 50.03, FIXTURE_FILL, 50.04, 50.045],
            Some("degrees_north"),
        ));
        measurements.push((
            "longitude",
            vec![FIXTURE_FILL, -20.02, -20.03, FIXTURE_FILL, -20.04, -20.045],
            Some("degrees_east"),
        ));
    }

    for (name, values, units) in measurements {
        let mut var = file.add_variable::<f64>(name, &[SG_DATA_POINT])?;
        var.set_fill_value(FIXTURE_FILL)?;
        if let Some(units) = units {
            var.put_attribute("units", units)?;
        }
        var.put_values(&values, ..)?;
    }

    let gps = [
        ("log_gps_lat", vec![50.0, 50.01, 50.05]),
        ("log_gps_lon", vec![-20.0, -20.01, -20.05]),
        ("log_gps_time", vec![t0 - 600.0, t0 - 60.0, t0 + 3600.0]),
    ];
    for (name, values) in gps {
        let mut var = file.add_variable::<f64>(name, &[GPS_INFO])?;
        var.put_values(&values, ..)?;
    }

    let scalars = [
        ("log_COMPASS_USE", 0.0),
        ("magnetic_variation", 12.3),
        ("sg_cal_t_g", 0.00437),
        ("sg_cal_mass", 52.0),
    ];
    for (name, value) in scalars {
        let mut var = file.add_variable::<f64>(name, &[])?;
        var.put_values(&[value], ..)?;
    }

    // Flags and calibration comments are char arrays in basestation files
    let mut temperature_qc =
        file.add_variable_with_type("temperature_qc", &[SG_DATA_POINT], &NcVariableType::Char)?;
    temperature_qc.put_raw_values(b"111121", ..)?;

    file.add_dimension(CALIBCOMM_LEN, CALIBCOMM_WIDTH)?;
    let comments = [
        ("sg_cal_calibcomm", "SBE s/n 0112 calibration 20apr09"),
        ("sg_cal_calibcomm_optode", "Optode 4330 s/n 1109 calibrated 10 Oct 2008"),
    ];
    for (name, text) in comments {
        let mut var = file.add_variable_with_type(name, &[CALIBCOMM_LEN], &NcVariableType::Char)?;
        var.put_raw_values(&padded(text), ..)?;
    }

    Ok(path)
}

/// NUL-padded bytes of a fixed-width char variable
fn padded(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(CALIBCOMM_WIDTH, 0);
    bytes
}
