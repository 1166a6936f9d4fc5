//! Measurement table backed by a polars `DataFrame`.
//!
//! Holds every variable along the measurement dimension as a `Float64`
//! column plus the per-variable attributes. Dives are stacked with a
//! diagonal concat so variables missing from a dive come through as nulls,
//! which read back as NaN.

use crate::error::{Og1Error, Result};
use crate::models::Attributes;

use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    frame: DataFrame,
    attributes: HashMap<String, Attributes>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.width() == 0 || self.frame.height() == 0
    }

    /// Column names in table order
    pub fn names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Column values with nulls mapped to NaN
    pub fn values(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| Og1Error::missing_variable(name, "measurement table"))?
            .cast(&DataType::Float64)?;
        Ok(column
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Column values if the column exists
    pub fn get(&self, name: &str) -> Option<Vec<f64>> {
        self.values(name).ok()
    }

    /// Insert or replace a column, keeping existing attributes when `attrs` is empty
    pub fn insert(&mut self, name: &str, values: Vec<f64>, attrs: Attributes) -> Result<()> {
        if self.frame.width() > 0 && values.len() != self.frame.height() {
            return Err(Og1Error::LengthMismatch {
                name: name.to_string(),
                expected: self.frame.height(),
                found: values.len(),
            });
        }
        self.frame.with_column(Column::new(name.into(), values))?;
        if !attrs.is_empty() || !self.attributes.contains_key(name) {
            self.attributes.insert(name.to_string(), attrs);
        }
        Ok(())
    }

    /// Replace the values of an existing column
    pub fn update(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.insert(name, values, Attributes::new())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        self.frame.rename(old, new.into())?;
        if let Some(attrs) = self.attributes.remove(old) {
            self.attributes.insert(new.to_string(), attrs);
        }
        Ok(())
    }

    /// Drop a column if present, returning whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        self.attributes.remove(name);
        self.frame.drop_in_place(name).is_ok()
    }

    pub fn attributes(&self, name: &str) -> Option<&Attributes> {
        self.attributes.get(name)
    }

    pub fn attributes_mut(&mut self, name: &str) -> &mut Attributes {
        self.attributes.entry(name.to_string()).or_default()
    }

    /// Stable sort of all rows by one column
    pub fn sort_by(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(Og1Error::missing_variable(name, "sort key"));
        }
        let frame = std::mem::take(&mut self.frame);
        self.frame = frame
            .lazy()
            .sort_by_exprs(
                [col(name)],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(())
    }

    /// Stack tables row-wise; the union of columns is kept and attributes
    /// come from the first table that defines them
    pub fn concat(tables: Vec<MeasurementTable>) -> Result<Self> {
        let tables: Vec<_> = tables.into_iter().filter(|t| !t.is_empty()).collect();
        if tables.len() <= 1 {
            return Ok(tables.into_iter().next().unwrap_or_default());
        }

        debug!("Concatenating {} measurement tables", tables.len());
        let mut attributes: HashMap<String, Attributes> = HashMap::new();
        let mut frames = Vec::with_capacity(tables.len());
        for table in tables {
            for (name, attrs) in table.attributes {
                attributes.entry(name).or_insert(attrs);
            }
            frames.push(table.frame.lazy());
        }

        let frame = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
        Ok(Self { frame, attributes })
    }
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
    fn test_insert_rejects_mismatched_length() {
        let mut t = table(&[("TIME", vec![1.0, 2.0, 3.0])]);
        assert!(t.insert("PRES", vec![1.0], Attributes::new()).is_err());
    }

    #[test]
    fn test_rename_moves_attributes() {
        let mut t = table(&[("pressure", vec![1.0, 2.0])]);
        t.attributes_mut("pressure").set("units", "dbar");
        t.rename("pressure", "PRES").unwrap();

        assert!(t.contains("PRES"));
        assert!(!t.contains("pressure"));
        assert_eq!(t.attributes("PRES").unwrap().get_str("units"), Some("dbar"));
    }

    #[test]
    fn test_sort_is_stable() {
        let mut t = table(&[
            ("TIME", vec![3.0, 1.0, 1.0, 2.0]),
            ("ROW", vec![0.0, 1.0, 2.0, 3.0]),
        ]);
        t.sort_by("TIME").unwrap();
        assert_eq!(t.values("TIME").unwrap(), vec![1.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.values("ROW").unwrap(), vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_concat_fills_missing_columns_with_nan() {
        let a = table(&[("TIME", vec![1.0, 2.0]), ("TEMP", vec![10.0, 11.0])]);
        let b = table(&[("TIME", vec![3.0]), ("PSAL", vec![35.0])]);

        let merged = MeasurementTable::concat(vec![a, b]).unwrap();
        assert_eq!(merged.height(), 3);

        let temp = merged.values("TEMP").unwrap();
        assert_eq!(&temp[..2], &[10.0, 11.0]);
        assert!(temp[2].is_nan());

        let psal = merged.values("PSAL").unwrap();
        assert!(psal[0].is_nan() && psal[1].is_nan());
        assert_eq!(psal[2], 35.0);
    }
}
