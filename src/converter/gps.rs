//! GPS fix merging and position interpolation.
//!
//! Surface fixes are appended to the measurement table as extra rows so
//! that `LATITUDE_GPS`, `LONGITUDE_GPS` and `TIME_GPS` share the
//! measurement dimension. Measurement rows without a position are then
//! filled by interpolating the fixes in time.

use crate::constants::{gps, og1};
use crate::error::Result;
use crate::models::{Attributes, Variable};
use crate::table::MeasurementTable;

use tracing::{debug, warn};

/// Append GPS fixes as rows and sort the dive by `TIME`
pub fn add_gps_info_to_dataset(table: &mut MeasurementTable, gps_vars: &[Variable]) -> Result<()> {
    let find = |name: &str| {
        gps_vars
            .iter()
            .find(|v| v.name == name)
            .and_then(|v| v.data.as_numeric())
            .map(<[f64]>::to_vec)
    };
    let (Some(lat), Some(lon), Some(time)) =
        (find(gps::LATITUDE), find(gps::LONGITUDE), find(gps::TIME))
    else {
        warn!("GPS fixes incomplete; dive keeps measurement rows only");
        return table.sort_by(og1::TIME);
    };

    let fixes = lat.len();
    let mut gps_rows = MeasurementTable::new();
    let columns = [
        (og1::LATITUDE, lat.clone()),
        (og1::LONGITUDE, lon.clone()),
        (og1::TIME, time.clone()),
        (og1::DEPTH, vec![0.0; fixes]),
        (og1::LATITUDE_GPS, lat),
        (og1::LONGITUDE_GPS, lon),
        (og1::TIME_GPS, time),
    ];
    for (name, values) in columns {
        gps_rows.insert(name, values, Attributes::new())?;
    }

    debug!("Adding {} GPS fixes to {} measurements", fixes, table.height());
    let measurements = std::mem::take(table);
    *table = MeasurementTable::concat(vec![measurements, gps_rows])?;
    table.sort_by(og1::TIME)
}

/// Fill missing `LATITUDE`/`LONGITUDE` by linear interpolation between fixes
///
/// Outside the span of the fixes the nearest fix is used. Without any valid
/// fix positions stay NaN.
pub fn interpolate_gps_positions(table: &mut MeasurementTable) -> Result<()> {
    let Some(time) = table.get(og1::TIME) else {
        return Ok(());
    };
    let Some(fix_time) = table.get(og1::TIME_GPS) else {
        return Ok(());
    };

    for (target, source) in [
        (og1::LATITUDE, og1::LATITUDE_GPS),
        (og1::LONGITUDE, og1::LONGITUDE_GPS),
    ] {
        let (Some(mut values), Some(fix_values)) = (table.get(target), table.get(source)) else {
            continue;
        };

        let mut fixes: Vec<(f64, f64)> = fix_time
            .iter()
            .zip(&fix_values)
            .filter(|(t, v)| !t.is_nan() && !v.is_nan())
            .map(|(t, v)| (*t, *v))
            .collect();
        if fixes.is_empty() {
            debug!("No valid GPS fixes for {}", target);
            continue;
        }
        fixes.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (xp, fp): (Vec<f64>, Vec<f64>) = fixes.into_iter().unzip();

        let mut filled = 0;
        for (value, t) in values.iter_mut().zip(&time) {
            if value.is_nan() && !t.is_nan() {
                *value = interp(*t, &xp, &fp);
                filled += 1;
            }
        }
        debug!("Interpolated {} values of {}", filled, target);
        table.update(target, values)?;
    }
    Ok(())
}

/// Piecewise linear interpolation over ascending `xp`, clamped at the ends
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (xp.first(), xp.last()) else {
        return f64::NAN;
    };
    if x <= first {
        return fp[0];
    }
    if x >= last {
        return fp[fp.len() - 1];
    }

    let upper = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[upper - 1], xp[upper]);
    let (y0, y1) = (fp[upper - 1], fp[upper]);
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GPS_INFO;

    fn dive_table() -> MeasurementTable {
        let mut table = MeasurementTable::new();
        table
            .insert(og1::TIME, vec![100.0, 200.0, 300.0], Attributes::new())
            .unwrap();
        table
            .insert(og1::LATITUDE, vec![f64::NAN, 50.5, f64::NAN], Attributes::new())
            .unwrap();
        table
            .insert(og1::LONGITUDE, vec![f64::NAN, -20.5, f64::NAN], Attributes::new())
            .unwrap();
        table
            .insert(og1::DEPTH, vec![10.0, 20.0, 10.0], Attributes::new())
            .unwrap();
        table
    }

    fn fixes(times: Vec<f64>, lats: Vec<f64>, lons: Vec<f64>) -> Vec<Variable> {
        vec![
            Variable::numeric(gps::LATITUDE, &[GPS_INFO], lats),
            Variable::numeric(gps::LONGITUDE, &[GPS_INFO], lons),
            Variable::numeric(gps::TIME, &[GPS_INFO], times),
        ]
    }

    #[test]
    fn test_interp_clamps_and_interpolates() {
        let xp = [0.0, 10.0, 20.0];
        let fp = [0.0, 100.0, 0.0];
        assert_eq!(interp(-5.0, &xp, &fp), 0.0);
        assert_eq!(interp(5.0, &xp, &fp), 50.0);
        assert_eq!(interp(10.0, &xp, &fp), 100.0);
        assert_eq!(interp(15.0, &xp, &fp), 50.0);
        assert_eq!(interp(25.0, &xp, &fp), 0.0);
        assert!(interp(1.0, &[], &[]).is_nan());
    }

    #[test]
    fn test_add_gps_info_appends_sorted_rows() {
        let mut table = dive_table();
        let gps_vars = fixes(vec![50.0, 400.0], vec![50.0, 51.0], vec![-20.0, -21.0]);

        add_gps_info_to_dataset(&mut table, &gps_vars).unwrap();
        assert_eq!(table.height(), 5);
        assert_eq!(
            table.values(og1::TIME).unwrap(),
            vec![50.0, 100.0, 200.0, 300.0, 400.0]
        );
        assert_eq!(table.values(og1::DEPTH).unwrap()[0], 0.0);

        let time_gps = table.values(og1::TIME_GPS).unwrap();
        assert_eq!(time_gps[0], 50.0);
        assert!(time_gps[1].is_nan());
        assert_eq!(time_gps[4], 400.0);
    }

    #[test]
    fn test_interpolate_gps_positions() {
        let mut table = dive_table();
        let gps_vars = fixes(vec![100.0, 300.0], vec![50.0, 51.0], vec![-20.0, -22.0]);
        add_gps_info_to_dataset(&mut table, &gps_vars).unwrap();

        interpolate_gps_positions(&mut table).unwrap();
        let lat = table.values(og1::LATITUDE).unwrap();
        // Stable sort keeps measurement rows ahead of fixes at equal times
        assert_eq!(lat, vec![50.0, 50.0, 50.5, 51.0, 51.0]);
        let lon = table.values(og1::LONGITUDE).unwrap();
        assert_eq!(lon[1], -20.0);
        assert_eq!(lon[4], -22.0);
    }

    #[test]
    fn test_interpolate_without_fixes_leaves_nan() {
        let mut table = dive_table();
        let gps_vars = fixes(vec![f64::NAN], vec![f64::NAN], vec![f64::NAN]);
        add_gps_info_to_dataset(&mut table, &gps_vars).unwrap();

        interpolate_gps_positions(&mut table).unwrap();
        assert!(table.values(og1::LATITUDE).unwrap().iter().filter(|v| v.is_nan()).count() >= 2);
    }
}
