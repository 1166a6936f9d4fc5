//! Variable attributes, unit harmonisation and quality flag metadata.

use crate::constants::{QC_FLAG_MEANINGS, QC_FLAG_VALUES, is_qc_variable, qc_name, qc_parent};
use crate::error::Result;
use crate::models::{AttrValue, Attributes};
use crate::table::MeasurementTable;
use crate::units::{format_unit, preferred_conversion};

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Merge vocabulary attributes into every known variable
///
/// Existing text values are first normalised through the unit spelling
/// table. A remaining difference from the vocabulary is reported and the
/// existing value wins; missing attributes are taken from the vocabulary.
pub fn assign_variable_attributes(
    table: &mut MeasurementTable,
    vocab_attrs: &HashMap<String, Attributes>,
) -> BTreeSet<String> {
    let mut warnings = BTreeSet::new();
    for name in table.names() {
        let Some(vocab) = vocab_attrs.get(&name) else {
            continue;
        };
        let attrs = table.attributes_mut(&name);
        for (attr, new_value) in vocab.iter() {
            let Some(old_value) = attrs.get(attr).cloned() else {
                attrs.set(attr, new_value.clone());
                continue;
            };

            let old_value = match &old_value {
                AttrValue::Text(text) => {
                    let formatted = AttrValue::from(format_unit(text));
                    attrs.set(attr, formatted.clone());
                    formatted
                }
                _ => old_value,
            };
            if &old_value != new_value {
                let msg = format!(
                    "Variable '{name}' attribute '{attr}' mismatch: Old value: {old_value}, New value: {new_value}"
                );
                debug!("{}", msg);
                warnings.insert(msg);
            }
        }
    }
    warnings
}

/// Rescale variables whose unit converts to one of the preferred units
pub fn convert_units(table: &mut MeasurementTable, preferred_units: &[String]) -> Result<()> {
    for name in table.names() {
        let Some(unit) = table
            .attributes(&name)
            .and_then(|a| a.get_str("units"))
            .map(str::to_string)
        else {
            continue;
        };
        let Some(conversion) = preferred_conversion(&unit, preferred_units) else {
            continue;
        };

        debug!(
            "Converting {} from {} to {}",
            name, conversion.current_unit, conversion.new_unit
        );
        let values = table
            .values(&name)?
            .into_iter()
            .map(|v| v * conversion.factor)
            .collect();
        table.update(&name, values)?;
        table.attributes_mut(&name).set("units", conversion.new_unit);
    }
    Ok(())
}

/// Fill attributes a variable lacks from its vocabulary entry
pub fn fill_from_vocabulary(attrs: &mut Attributes, vocab: &Attributes) {
    for (attr, value) in vocab.iter() {
        if !attrs.contains(attr) {
            attrs.set(attr, value.clone());
        }
    }
}

/// Describe every `*_QC` variable as a flag of its parent
///
/// The parent must already carry a `long_name`. A parent without one leaves
/// the flag undescribed, which the final attribute check reports.
pub fn add_qc_attributes(table: &mut MeasurementTable) {
    for name in table.names().into_iter().filter(|n| is_qc_variable(n)) {
        let Some(parent) = qc_parent(&name).map(str::to_string) else {
            continue;
        };
        let Some(parent_long_name) = table
            .attributes(&parent)
            .and_then(|a| a.get_str("long_name"))
            .map(str::to_string)
        else {
            warn!("Quality flag '{}' has no described parent '{}'", name, parent);
            continue;
        };

        let attrs = table.attributes_mut(&name);
        attrs.set("long_name", format!("{parent_long_name} Quality Flag"));
        attrs.set("standard_name", "status_flag");
        attrs.set("flag_values", AttrValue::Bytes(QC_FLAG_VALUES.to_vec()));
        attrs.set("flag_meanings", QC_FLAG_MEANINGS);
        // Parent units do not apply to a flag
        attrs.remove("units");

        table
            .attributes_mut(&parent)
            .set("ancillary_variables", qc_name(&parent));
    }
}
