//! Dive, profile and phase numbering.

use crate::constants::{DIVE_CAST_COLUMN, DIVE_NUMBER_COLUMN, og1, phase};
use crate::error::{Og1Error, Result};
use crate::models::Attributes;
use crate::table::MeasurementTable;

/// Columns that may hold the dive number, in lookup order
const DIVE_NUMBER_COLUMNS: &[&str] = &["dive_number", DIVE_NUMBER_COLUMN, "dive_num"];

/// Rows of one dive: dive number, first and last row index
#[derive(Debug, Clone, Copy, PartialEq)]
struct DiveSpan {
    dive: f64,
    start: usize,
    end: usize,
}

/// Add the constant `divenum` column
pub fn add_dive_number(table: &mut MeasurementTable, dive_number: f64) -> Result<()> {
    let rows = table.height();
    table.insert(DIVE_NUMBER_COLUMN, vec![dive_number; rows], Attributes::new())
}

/// Split each dive at its pressure maximum into a dive and a climb profile
///
/// Rows up to and including the first pressure maximum get
/// `dive_num_cast = dive`, later rows `dive + 0.5`, and
/// `PROFILE_NUMBER = 2 * dive_num_cast - 1`.
pub fn assign_profile_number(table: &mut MeasurementTable) -> Result<()> {
    let divenum = table
        .get(DIVE_NUMBER_COLUMN)
        .ok_or_else(|| Og1Error::missing_variable(DIVE_NUMBER_COLUMN, "profile numbering"))?;
    let pres = table
        .get(og1::PRES)
        .ok_or_else(|| Og1Error::missing_variable(og1::PRES, "profile numbering"))?;

    let mut cast = vec![f64::NAN; divenum.len()];
    for span in dive_spans(&divenum) {
        let pmax = pressure_max_index(&pres, span.start, span.end);
        cast[span.start..=pmax].fill(span.dive);
        if pmax < span.end {
            cast[pmax + 1..=span.end].fill(span.dive + 0.5);
        }
    }

    let profile = cast.iter().map(|c| 2.0 * c - 1.0).collect();
    table.insert(DIVE_CAST_COLUMN, cast, Attributes::new())?;
    table.insert(og1::PROFILE_NUMBER, profile, Attributes::new())
}

/// Assign the glider phase of every row
///
/// Descent (2) up to and including the pressure maximum, ascent (1) after
/// it, and surface (3) between the first two valid GPS fixes of the dive.
/// `PHASE_QC` is zero.
pub fn assign_phase(table: &mut MeasurementTable) -> Result<()> {
    let divenum = DIVE_NUMBER_COLUMNS
        .iter()
        .find_map(|name| table.get(name))
        .ok_or_else(|| Og1Error::missing_variable(DIVE_NUMBER_COLUMN, "phase assignment"))?;
    let pres = table
        .get(og1::PRES)
        .ok_or_else(|| Og1Error::missing_variable(og1::PRES, "phase assignment"))?;
    let time_gps = table.get(og1::TIME_GPS);

    let mut phases = vec![f64::NAN; divenum.len()];
    for span in dive_spans(&divenum) {
        let pmax = pressure_max_index(&pres, span.start, span.end);
        phases[span.start..=pmax].fill(phase::DESCENT);
        if pmax < span.end {
            phases[pmax + 1..=span.end].fill(phase::ASCENT);
        }

        if let Some(time_gps) = &time_gps {
            let mut valid = (span.start..=span.end).filter(|&i| !time_gps[i].is_nan());
            if let (Some(first), Some(second)) = (valid.next(), valid.next()) {
                phases[first..=second].fill(phase::SURFACE);
            }
        }
    }

    let rows = phases.len();
    table.insert(og1::PHASE, phases, Attributes::new())?;
    table.insert(og1::PHASE_QC, vec![0.0; rows], Attributes::new())
}

/// First and last row of every distinct dive number, in ascending dive order
fn dive_spans(divenum: &[f64]) -> Vec<DiveSpan> {
    let mut spans: Vec<DiveSpan> = Vec::new();
    for (i, &dive) in divenum.iter().enumerate() {
        if dive.is_nan() {
            continue;
        }
        match spans.iter_mut().find(|s| s.dive == dive) {
            Some(span) => span.end = i,
            None => spans.push(DiveSpan {
                dive,
                start: i,
                end: i,
            }),
        }
    }
    spans.sort_by(|a, b| a.dive.total_cmp(&b.dive));
    spans
}

/// Index of the first pressure maximum within `start..=end`
///
/// Falls back to `start` when the span has no valid pressure.
fn pressure_max_index(pres: &[f64], start: usize, end: usize) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in pres.iter().enumerate().take(end + 1).skip(start) {
        if p.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, max)| p > max) {
            best = Some((i, p));
        }
    }
    best.map_or(start, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[(&str, Vec<f64>)]) -> MeasurementTable {
        let mut t = MeasurementTable::new();
        for (name, values) in columns {
            t.insert(name, values.clone(), Attributes::new()).unwrap();
        }
        t
    }

    #[test]
    fn test_profile_number_splits_at_first_pressure_max() {
        let mut t = table(&[(og1::PRES, vec![0.0, 100.0, 200.0, 200.0, 50.0])]);
        add_dive_number(&mut t, 3.0).unwrap();

        assign_profile_number(&mut t).unwrap();
        assert_eq!(
            t.values(DIVE_CAST_COLUMN).unwrap(),
            vec![3.0, 3.0, 3.0, 3.5, 3.5]
        );
        assert_eq!(
            t.values(og1::PROFILE_NUMBER).unwrap(),
            vec![5.0, 5.0, 5.0, 6.0, 6.0]
        );
    }

    #[test]
    fn test_profile_number_handles_several_dives() {
        let mut t = table(&[
            (og1::PRES, vec![10.0, 50.0, 5.0, 20.0, 80.0, 1.0]),
            (DIVE_NUMBER_COLUMN, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]),
        ]);

        assign_profile_number(&mut t).unwrap();
        assert_eq!(
            t.values(og1::PROFILE_NUMBER).unwrap(),
            vec![1.0, 1.0, 2.0, 3.0, 3.0, 4.0]
        );
    }

    #[test]
    fn test_profile_number_requires_pressure() {
        let mut t = table(&[(DIVE_NUMBER_COLUMN, vec![1.0])]);
        let err = assign_profile_number(&mut t).unwrap_err();
        assert!(matches!(err, Og1Error::MissingVariable { ref name, .. } if name == og1::PRES));
    }

    #[test]
    fn test_phase_with_surface_fixes() {
        let nan = f64::NAN;
        let mut t = table(&[
            (og1::PRES, vec![0.0, 0.0, 0.0, 50.0, 150.0, 80.0, 10.0]),
            (og1::TIME_GPS, vec![1.0, nan, 3.0, nan, nan, nan, nan]),
            (DIVE_NUMBER_COLUMN, vec![4.0; 7]),
        ]);

        assign_phase(&mut t).unwrap();
        assert_eq!(
            t.values(og1::PHASE).unwrap(),
            vec![3.0, 3.0, 3.0, 2.0, 2.0, 1.0, 1.0]
        );
        assert_eq!(t.values(og1::PHASE_QC).unwrap(), vec![0.0; 7]);
    }

    #[test]
    fn test_phase_without_dive_number_fails() {
        let mut t = table(&[(og1::PRES, vec![1.0, 2.0])]);
        assert!(matches!(
            assign_phase(&mut t),
            Err(Og1Error::MissingVariable { .. })
        ));
    }

    #[test]
    fn test_pressure_max_without_valid_pressure() {
        let nan = f64::NAN;
        assert_eq!(pressure_max_index(&[nan, nan, nan], 0, 2), 0);
        assert_eq!(pressure_max_index(&[nan, 5.0, 5.0, 1.0], 0, 3), 1);
    }
}
