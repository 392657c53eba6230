//
// resolver.rs
// Mri-Stats-rs
//
// Expands requested group names into concrete label sets: region name, then tag, then aggregate.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::groups::BUILTIN_GROUP_NAMES;
use crate::lookup_table::LookupTable;
use crate::volume::Segmentation;

/// Names that select every non-background label in the table.
pub const AGGREGATE_NAMES: [&str; 2] = ["all", "whole"];

const UNKNOWN_PREFIX: &str = "unknown-";

/// How a requested name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    Region,
    Tag,
    Aggregate,
    /// `unknown-<label>` for a label the table does not name.
    UnnamedLabel,
}

/// A requested group with the labels it covers. Label sets of different groups
/// may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub kind: GroupKind,
    pub labels: BTreeSet<u32>,
}

/// Resolve one name against the table.
pub fn resolve_group(name: &str, table: &LookupTable) -> Result<GroupSpec> {
    let spec = |kind, labels| GroupSpec {
        name: name.to_string(),
        kind,
        labels,
    };

    if let Some(entry) = table.find_by_name(name) {
        return Ok(spec(GroupKind::Region, BTreeSet::from([entry.label])));
    }
    if table.has_tag(name) {
        return Ok(spec(GroupKind::Tag, table.entries_with_tag(name)));
    }
    if AGGREGATE_NAMES.contains(&name) {
        // Empty only when the table itself is; that flows on as a zero-count group.
        return Ok(spec(GroupKind::Aggregate, table.nonzero_labels()));
    }
    if let Some(label) = unnamed_label(name, table) {
        return Ok(spec(GroupKind::UnnamedLabel, BTreeSet::from([label])));
    }

    Err(StatsError::UnknownGroup {
        group: name.to_string(),
    })
}

/// Resolve every requested name, keeping request order. Exact repeats are dropped
/// (first occurrence wins). The first unresolvable name fails the whole call.
pub fn resolve_groups<S: AsRef<str>>(requested: &[S], table: &LookupTable) -> Result<Vec<GroupSpec>> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(requested.len());
    for name in requested.iter().map(AsRef::as_ref) {
        if !seen.insert(name) {
            debug!(group = name, "dropping repeated group request");
            continue;
        }
        specs.push(resolve_group(name, table)?);
    }
    Ok(specs)
}

/// Requests used when the caller names none: every named region present in the
/// segmentation (ascending label), then the built-in groups the table knows.
pub fn default_requests(table: &LookupTable, segmentation: &Segmentation) -> Vec<String> {
    let regions = segmentation
        .present_labels()
        .into_iter()
        .filter_map(|label| table.resolve(label).map(|entry| entry.name.clone()));
    let builtin = BUILTIN_GROUP_NAMES
        .iter()
        .filter(|name| table.has_tag(name))
        .map(|name| name.to_string());
    regions.chain(builtin).collect()
}

fn unnamed_label(name: &str, table: &LookupTable) -> Option<u32> {
    let label: u32 = name.strip_prefix(UNKNOWN_PREFIX)?.parse().ok()?;
    table.resolve(label).is_none().then_some(label)
}
