//! Basestation dive file builder shared by the integration tests

use std::path::{Path, PathBuf};

pub const FILL: f64 = -9999.0;
const SAMPLES: usize = 8;

/// Write dive `dive` of glider 532 into `dir`
///
/// Dives carry a CTD and an Aanderaa optode; each spans 80 minutes and
/// reaches 300 dbar halfway through.
pub fn write_dive(dir: &Path, dive: i32) -> PathBuf {
    let path = dir.join(format!("p532{dive:04}_20210630.nc"));
    let mut file = netcdf::create(&path).unwrap();
    let t0 = 1_625_000_000.0 + f64::from(dive) * 6_000.0;

    file.add_dimension("sg_data_point", SAMPLES).unwrap();
    file.add_dimension("gps_info", 3).unwrap();

    file.add_attribute("dive_number", dive).unwrap();
    file.add_attribute("platform_id", "SG532").unwrap();
    file.add_attribute("glider", 532i32).unwrap();
    file.add_attribute("time_coverage_start", "2021-06-29T20:53:20Z").unwrap();
    file.add_attribute("time_coverage_end", "2021-06-30T02:00:00Z").unwrap();
    file.add_attribute("creator_name", "Jo Glider").unwrap();
    file.add_attribute("creator_email", "jo@example.org").unwrap();
    file.add_attribute("institution", "Ocean Lab").unwrap();
    file.add_attribute("seaglider_software_version", "66.12").unwrap();
    file.add_attribute("base_station_version", "2.14").unwrap();
    file.add_attribute("base_station_micro_version", "b").unwrap();

    let time: Vec<f64> = (0..SAMPLES).map(|i| t0 + i as f64 * 600.0).collect();
    let pressure = vec![2.0, 80.0, 160.0, 240.0, 300.0, 200.0, 100.0, 3.0];
    let columns: [(&str, Vec<f64>, Option<&str>); 9] = [
        ("ctd_time", time.clone(), Some("seconds since 1970-1-1 00:00:00")),
        ("time", time, None),
        ("ctd_pressure", pressure.clone(), Some("dbar")),
        ("ctd_depth", pressure.iter().map(|p| p * 0.99).collect(), Some("meters")),
        ("temperature", vec![12.0, 11.0, 9.5, 8.0, 7.5, 8.2, 10.0, 11.9], Some("degrees_Celsius")),
        ("salinity", vec![35.2; SAMPLES], Some("1e-3")),
        ("conductivity", vec![4.2; SAMPLES], Some("S/m")),
        (
            "aanderaa4330_dissolved_oxygen",
            vec![250.4, 248.1, FILL, 230.7, 225.2, 232.9, 240.3, 249.6],
            Some("micromoles/kg"),
        ),
        (
            "latitude",
            vec![60.1, 60.11, 60.12, 60.13, 60.14, 60.15, 60.16, 60.17],
            Some("degrees_north"),
        ),
    ];
    for (name, values, units) in columns {
        let mut var = file.add_variable::<f64>(name, &["sg_data_point"]).unwrap();
        var.set_fill_value(FILL).unwrap();
        if let Some(units) = units {
            var.put_attribute("units", units).unwrap();
        }
        var.put_values(&values, ..).unwrap();
    }
    let mut lon = file.add_variable::<f64>("longitude", &["sg_data_point"]).unwrap();
    lon.put_attribute("units", "degrees_east").unwrap();
    lon.put_values(&[-5.0, -5.01, -5.02, -5.03, -5.04, -5.05, -5.06, -5.07], ..)
        .unwrap();

    let gps = [
        ("log_gps_lat", [60.09, 60.1, 60.18]),
        ("log_gps_lon", [-4.99, -5.0, -5.08]),
        ("log_gps_time", [t0 - 900.0, t0 - 30.0, t0 + 5_000.0]),
    ];
    for (name, values) in gps {
        let mut var = file.add_variable::<f64>(name, &["gps_info"]).unwrap();
        var.put_values(&values, ..).unwrap();
    }

    let mut t_g = file.add_variable::<f64>("sg_cal_t_g", &[]).unwrap();
    t_g.put_values(&[0.00438], ..).unwrap();
    let mut ctd = file.add_string_variable("sg_cal_calibcomm", &[]).unwrap();
    ctd.put_string("SBE#0241 t/c 28Sep20 p 30Sep20", ..).unwrap();
    let mut optode = file
        .add_string_variable("sg_cal_calibcomm_optode", &[])
        .unwrap();
    optode.put_string("Optode 4330 s/n 1109 calibration 10 Oct 2020", ..).unwrap();

    path
}

/// Create `<root>/sg532` holding the given dives
pub fn write_mission(root: &Path, dives: &[i32]) -> PathBuf {
    let dir = root.join("sg532");
    std::fs::create_dir_all(&dir).unwrap();
    for dive in dives {
        write_dive(&dir, *dive);
    }
    dir
}
