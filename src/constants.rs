//! Application constants for the OG1 converter
//!
//! This module contains dimension names, variable name conventions, QC flag
//! definitions and default values used throughout the conversion pipeline.

// =============================================================================
// Dimensions and File Patterns
// =============================================================================

/// Basestation measurement dimension
pub const SG_DATA_POINT: &str = "sg_data_point";

/// Basestation GPS fix dimension
pub const GPS_INFO: &str = "gps_info";

/// OG1 measurement dimension
pub const N_MEASUREMENTS: &str = "N_MEASUREMENTS";

/// Basestation dive file extension
pub const DIVE_FILE_EXTENSION: &str = "nc";

/// Characters in the leading file token before the profile number (`p015` in `p0150500`)
pub const PROFILE_PREFIX_LEN: usize = 4;

/// Cache folder name for downloaded dive files
pub const CACHE_DIR_NAME: &str = "seaglider_og1";

/// Output folder for converted missions
pub const OUTPUT_DIR_NAME: &str = "og1";

// =============================================================================
// Variable Name Conventions
// =============================================================================

/// Scalar calibration constants (from sg_calib_constants.m)
pub const SG_CAL_PREFIX: &str = "sg_cal_";

/// Scalar log-file parameters
pub const LOG_PREFIX: &str = "log_";

/// Suffixes carried along when a variable is renamed
pub const RENAME_SUFFIXES: &[&str] = &["", "_qc", "_raw", "_raw_qc"];

/// Suffix of OG1 quality flag variables
pub const QC_SUFFIX: &str = "_QC";

/// Basestation coordinate variables required on every dive
pub const CTD_TIME: &str = "ctd_time";
pub const BASESTATION_LATITUDE: &str = "latitude";
pub const BASESTATION_LONGITUDE: &str = "longitude";

/// Basestation GPS fix variables
pub mod gps {
    pub const LATITUDE: &str = "log_gps_lat";
    pub const LONGITUDE: &str = "log_gps_lon";
    pub const TIME: &str = "log_gps_time";
}

/// OG1 variable names produced by the converter
pub mod og1 {
    pub const TIME: &str = "TIME";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const DEPTH: &str = "DEPTH";
    pub const PRES: &str = "PRES";
    pub const DEPTH_Z: &str = "DEPTH_Z";
    pub const TIME_GPS: &str = "TIME_GPS";
    pub const LATITUDE_GPS: &str = "LATITUDE_GPS";
    pub const LONGITUDE_GPS: &str = "LONGITUDE_GPS";
    pub const PROFILE_NUMBER: &str = "PROFILE_NUMBER";
    pub const PHASE: &str = "PHASE";
    pub const PHASE_QC: &str = "PHASE_QC";
    pub const TRAJECTORY: &str = "TRAJECTORY";
    pub const PLATFORM_SERIAL_NUMBER: &str = "PLATFORM_SERIAL_NUMBER";
}

/// Per-dive helper columns removed before concatenation
pub const DIVE_NUMBER_COLUMN: &str = "divenum";
pub const DIVE_CAST_COLUMN: &str = "dive_num_cast";

// =============================================================================
// Phase and Quality Control Constants
// =============================================================================

/// Glider phase codes
pub mod phase {
    /// Ascent after the pressure maximum
    pub const ASCENT: f64 = 1.0;
    /// Descent up to and including the pressure maximum
    pub const DESCENT: f64 = 2.0;
    /// Between the first two surface GPS fixes
    pub const SURFACE: f64 = 3.0;
}

/// OG1 quality flag values and their meanings
pub const QC_FLAG_VALUES: &[i8] = &[1, 2, 3, 4, 9];
pub const QC_FLAG_MEANINGS: &str = "GOOD UNKNOWN SUSPECT FAIL MISSING";

// =============================================================================
// Defaults
// =============================================================================

/// Units the converter rescales towards when a conversion exists
pub const DEFAULT_PREFERRED_UNITS: &[&str] = &["m s-1", "dbar", "S m-1"];

/// Derived basestation variables dropped from the output
pub const DEFAULT_VARS_TO_REMOVE: &[&str] = &[
    "dissolved_oxygen_sat",
    "depth",
    "eng_depth",
    "eng_elaps_t",
    "eng_elaps_t_0000",
    "latitude_gsm",
    "longitude_gsm",
    "sound_velocity",
    "theta",
    "time",
    "eng_sbect_condFreq",
    "eng_sbect_tempFreq",
    "glide_angle_gsm",
    "horz_speed_gsm",
    "north_displacement_gsm",
    "east_displacement_gsm",
    "speed_gsm",
    "vert_speed_gsm",
    "dive_num_cast",
    "density",
];

/// netCDF default fill values for integer storage types
pub mod fill {
    pub const BYTE: i8 = -127;
    pub const SHORT: i16 = -32767;
    pub const INT: i32 = -2147483647;
    /// Values at or above this magnitude are treated as the netCDF double fill value
    pub const DOUBLE_THRESHOLD: f64 = 9.9e36;
}

/// Default deflate level for output variables
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 4;

/// Check if a variable name is an OG1 quality flag
pub fn is_qc_variable(name: &str) -> bool {
    name.ends_with(QC_SUFFIX)
}

/// Name of the QC companion of an OG1 variable
pub fn qc_name(name: &str) -> String {
    format!("{name}{QC_SUFFIX}")
}

/// Parent variable of an OG1 quality flag variable
pub fn qc_parent(name: &str) -> Option<&str> {
    name.strip_suffix(QC_SUFFIX)
}
