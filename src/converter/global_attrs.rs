//! OG1 global attributes.
//!
//! Merges basestation attributes with the templates from
//! `og1_global_attrs.toml`, rebuilds the contributor lists and normalises
//! timestamps to `YYYYmmddTHHMMSS`.

use crate::constants::og1;
use crate::models::{AttrValue, Attributes};
use crate::table::MeasurementTable;
use crate::vocabularies::{GlobalAttrTemplates, NameMap};

use super::{nan_max, nan_min};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Timestamp format used in OG1 global attributes
pub const OG1_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

const DEFAULT_ROLE_VOCABULARY: &str = "http://vocab.nerc.ac.uk/search_nvs/W08";
const DEFAULT_INSTITUTION_VOCABULARY: &str = "https://edmo.seadatanet.org/report/1434";
const DEFAULT_INSTITUTION_ROLE_VOCABULARY: &str = "http://vocab.nerc.ac.uk/collection/W08/current/";
const UW_OCEANOGRAPHY: &str = "University of Washington - School of Oceanography";

/// Contributor attributes, in output order
const CONTRIBUTOR_KEYS: [&str; 8] = [
    "contributor_name",
    "contributor_email",
    "contributor_role",
    "contributor_role_vocabulary",
    "contributing_institutions",
    "contributing_institutions_role",
    "contributing_institutions_vocabulary",
    "contributing_institutions_role_vocabulary",
];

/// Format Unix seconds as an OG1 timestamp
pub fn format_timestamp(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map(|t| t.format(OG1_TIME_FORMAT).to_string())
}

/// Current UTC time as an OG1 timestamp
pub fn now_timestamp() -> String {
    Utc::now().format(OG1_TIME_FORMAT).to_string()
}

fn text_of(attrs: &Attributes, name: &str) -> Option<String> {
    attrs.get(name).map(AttrValue::to_string)
}

/// Append an item unless already listed; commas inside the item become hyphens
fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.replace(',', "-"));
    }
}

/// Build the comma separated contributor and institution lists
///
/// Creators come first, then basestation contributors, then the configured
/// author block. Lists are padded with empty entries to the number of names.
pub fn get_contributors(attrs: &Attributes, author: &Attributes) -> Attributes {
    let mut lists: [Vec<String>; 8] = Default::default();
    let [names, emails, roles, roles_vocab, insts, inst_roles, inst_vocab, inst_roles_vocab] =
        &mut lists;

    for prefix in ["creator", "contributor"] {
        let Some(name) = text_of(attrs, &format!("{prefix}_name")) else {
            continue;
        };
        let field = |suffix: &str, default: &str| {
            text_of(attrs, &format!("{prefix}_{suffix}")).unwrap_or_else(|| default.to_string())
        };
        push_unique(names, &name);
        push_unique(emails, &field("email", ""));
        push_unique(roles, &field("role", "PI"));
        push_unique(roles_vocab, &field("role_vocabulary", DEFAULT_ROLE_VOCABULARY));
    }

    let institution_field = |name: &str, default: &str| {
        text_of(attrs, name).unwrap_or_else(|| default.to_string())
    };
    let institution = match text_of(attrs, "contributing_institutions") {
        Some(inst) => Some((inst, "Operator")),
        None => text_of(attrs, "institution").map(|inst| (inst, "PI")),
    };
    if let Some((inst, default_role)) = institution {
        push_unique(insts, &inst);
        push_unique(
            inst_roles,
            &institution_field("contributing_institutions_role", default_role),
        );
        push_unique(
            inst_vocab,
            &institution_field(
                "contributing_institutions_vocabulary",
                DEFAULT_INSTITUTION_VOCABULARY,
            ),
        );
        push_unique(
            inst_roles_vocab,
            &institution_field(
                "contributing_institutions_role_vocabulary",
                DEFAULT_INSTITUTION_ROLE_VOCABULARY,
            ),
        );
    }

    for inst in insts.iter_mut() {
        if ["Oceanography", "University", "Washington"]
            .iter()
            .all(|k| inst.contains(k))
        {
            *inst = UW_OCEANOGRAPHY.to_string();
        }
    }

    let width = lists[0].len();
    for list in lists.iter_mut().skip(1) {
        if list.len() < width {
            list.resize(width, String::new());
        }
    }

    for (key, list) in CONTRIBUTOR_KEYS.iter().zip(lists.iter_mut()) {
        if let Some(value) = text_of(author, key) {
            push_unique(list, &value);
        }
    }

    CONTRIBUTOR_KEYS
        .iter()
        .zip(lists)
        .map(|(key, list)| (*key, list.join(", ")))
        .collect()
}

/// Timestamps normalised to `YYYYmmddTHHMMSS`, plus `start_date` and `date_modified`
pub fn get_time_attributes(attrs: &Attributes) -> Attributes {
    let mut out = Attributes::new();
    for name in ["time_coverage_start", "time_coverage_end", "date_created", "start_time"] {
        let Some(value) = attrs.get(name) else {
            continue;
        };
        let cleaned = match value {
            AttrValue::Int(_) | AttrValue::Float(_) => value
                .as_f64()
                .and_then(format_timestamp)
                .map(AttrValue::Text)
                .unwrap_or_else(|| value.clone()),
            AttrValue::Text(text) if text.contains('-') || text.contains(':') => {
                AttrValue::Text(clean_time_string(text))
            }
            other => other.clone(),
        };
        out.set(name, cleaned);
    }
    out.set("date_modified", now_timestamp());

    if let Some(start) = out.remove("start_time") {
        out.set("start_date", start);
    }
    if !out.contains("start_date") {
        if let Some(start) = out.get("time_coverage_start").cloned() {
            out.set("start_date", start);
        }
    }
    out
}

fn clean_time_string(text: &str) -> String {
    text.replace(['_', ':'], "")
        .trim_end_matches('Z')
        .replace('-', "")
}

/// Basestation attributes copied unchanged
pub fn extract_attr_to_keep(attrs: &Attributes, attr_as_is: &[String]) -> Attributes {
    attr_as_is
        .iter()
        .filter_map(|name| attrs.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Basestation attributes copied under their OG1 name
pub fn extract_attr_to_rename(attrs: &Attributes, attr_to_rename: &NameMap) -> Attributes {
    attr_to_rename
        .iter()
        .filter_map(|(new, old)| attrs.get(old).map(|v| (new, v.clone())))
        .collect()
}

/// Merge template, contributor, time, renamed and kept attributes
///
/// Later sources override earlier values; `attr_to_add` is applied first
/// and again last so its values always win. The result follows
/// `order_of_attr`, other attributes follow in first-seen order.
pub fn update_dataset_attributes(
    attrs: &Attributes,
    templates: &GlobalAttrTemplates,
    author: &Attributes,
) -> Attributes {
    let sources = [
        templates.attr_to_add.clone(),
        get_contributors(attrs, author),
        get_time_attributes(attrs),
        extract_attr_to_rename(attrs, &templates.attr_to_rename),
        extract_attr_to_keep(attrs, &templates.attr_as_is),
        templates.attr_to_add.clone(),
    ];

    let mut merged = Attributes::new();
    for source in sources {
        for (name, value) in source.iter() {
            merged.set(name, value.clone());
        }
    }
    order_attributes(merged, &templates.order_of_attr)
}

/// Reorder attributes by a preferred key order
pub fn order_attributes(attrs: Attributes, order: &[String]) -> Attributes {
    let mut ordered = Attributes::new();
    for name in order {
        if let Some(value) = attrs.get(name) {
            ordered.set(name.as_str(), value.clone());
        }
    }
    for (name, value) in attrs.iter() {
        if !ordered.contains(name) {
            ordered.set(name, value.clone());
        }
    }
    ordered
}

/// Attributes derived from the mission data
///
/// Sets the time coverage, geospatial bounds, `date_created` and `id`, and
/// moves `start_date` back when the data begin before it.
pub fn apply_data_attributes(
    attrs: &mut Attributes,
    table: &MeasurementTable,
    serial_number: &str,
) {
    let time = table.get(og1::TIME).unwrap_or_default();
    if let Some(start) = nan_min(&time).and_then(format_timestamp) {
        let later_start = attrs
            .get_str("start_date")
            .is_none_or(|current| current.len() == start.len() && current > start.as_str());
        if later_start {
            attrs.set("start_date", start.clone());
        }
        attrs.set("time_coverage_start", start);
    }
    if let Some(end) = nan_max(&time).and_then(format_timestamp) {
        attrs.set("time_coverage_end", end);
    }

    for (column, bound) in [
        (og1::LATITUDE, "geospatial_lat"),
        (og1::LONGITUDE, "geospatial_lon"),
        (og1::DEPTH, "geospatial_vertical"),
    ] {
        let values = table.get(column).unwrap_or_default();
        if let (Some(min), Some(max)) = (nan_min(&values), nan_max(&values)) {
            attrs.set(format!("{bound}_min"), min);
            attrs.set(format!("{bound}_max"), max);
        }
    }

    attrs.set("date_created", now_timestamp());

    let start = attrs.get_str("time_coverage_start").unwrap_or("unknown");
    let id = format!("{serial_number}_{start}_delayed");
    debug!("Mission id {}", id);
    attrs.set("id", id);
}
