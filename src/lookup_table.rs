//
// lookup_table.rs
// Mri-Stats-rs
//
// Immutable label -> region lookup table, with tags for anatomical grouping and a FreeSurfer ColorLUT reader.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::groups;

/// One named region of the segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub label: u32,
    pub name: String,
    pub group_tags: BTreeSet<String>,
    /// RGBA as stored in the source table, when it has one.
    pub color: Option<[u8; 4]>,
}

impl LookupEntry {
    pub fn new(label: u32, name: impl Into<String>) -> Self {
        Self {
            label,
            name: name.into(),
            group_tags: BTreeSet::new(),
            color: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.group_tags.insert(tag.into());
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = Some(color);
        self
    }
}

/// Label lookup shared read-only by every stage. Built once, never mutated after
/// construction; pass it by reference to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: BTreeMap<u32, LookupEntry>,
    names: BTreeMap<String, u32>,
    // Tags defined directly as label lists, independent of which labels have entries.
    tag_definitions: BTreeMap<String, BTreeSet<u32>>,
}

impl LookupTable {
    /// Build from entries. Fails on the first repeated label.
    pub fn new(entries: impl IntoIterator<Item = LookupEntry>) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            if table.entries.contains_key(&entry.label) {
                return Err(StatsError::DuplicateLabel { label: entry.label });
            }
            table.entries.insert(entry.label, entry);
        }
        table.reindex_names();
        Ok(table)
    }

    /// Build from a static `(label, name, tags)` definition.
    pub fn from_definition(definition: &[(u32, &str, &[&str])]) -> Result<Self> {
        Self::new(definition.iter().map(|(label, name, tags)| {
            tags.iter()
                .fold(LookupEntry::new(*label, *name), |entry, tag| entry.with_tag(*tag))
        }))
    }

    /// Register a tag that covers `labels` whether or not they have entries.
    pub fn with_tag_definition(
        mut self,
        tag: impl Into<String>,
        labels: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.tag_definitions
            .entry(tag.into())
            .or_default()
            .extend(labels);
        self
    }

    /// Add the built-in FreeSurfer groups and hemisphere tags.
    pub fn with_builtin_groups(mut self) -> Self {
        for entry in self.entries.values_mut() {
            if let Some(tag) = groups::hemisphere_tag(&entry.name) {
                entry.group_tags.insert(tag.to_string());
            }
        }
        groups::builtin_groups()
            .into_iter()
            .fold(self, |table, (name, labels)| table.with_tag_definition(name, labels))
    }

    /// Parse FreeSurfer `ColorLUT` text: `label name R G B A` per line. Comment,
    /// blank and otherwise non-matching lines are skipped.
    pub fn parse_freesurfer(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(entry) = parse_lut_line(line, idx + 1)? {
                entries.push(entry);
            }
        }
        debug!(entries = entries.len(), "parsed FreeSurfer lookup table");
        Self::new(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_freesurfer(&text)
    }

    /// Entry for `label`, or `None` when the table does not name it.
    pub fn resolve(&self, label: u32) -> Option<&LookupEntry> {
        self.entries.get(&label)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&LookupEntry> {
        self.names.get(name).and_then(|label| self.entries.get(label))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_definitions.contains_key(tag)
            || self.entries.values().any(|e| e.group_tags.contains(tag))
    }

    /// Union of labels whose entry carries `tag` and labels of a standalone definition.
    pub fn entries_with_tag(&self, tag: &str) -> BTreeSet<u32> {
        let mut labels: BTreeSet<u32> = self
            .entries
            .values()
            .filter(|e| e.group_tags.contains(tag))
            .map(|e| e.label)
            .collect();
        if let Some(defined) = self.tag_definitions.get(tag) {
            labels.extend(defined.iter().copied());
        }
        labels
    }

    /// Every non-background label that has an entry.
    pub fn nonzero_labels(&self) -> BTreeSet<u32> {
        self.entries.keys().copied().filter(|&l| l != 0).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex_names(&mut self) {
        self.names.clear();
        // Lowest label wins when a name repeats.
        for entry in self.entries.values() {
            self.names.entry(entry.name.clone()).or_insert(entry.label);
        }
    }
}

fn is_region_name(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_lut_line(line: &str, line_no: usize) -> Result<Option<LookupEntry>> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Ok(None);
    }
    let numeric = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
    if !numeric(tokens[0]) || !is_region_name(tokens[1]) || !tokens[2..6].iter().all(|t| numeric(*t))
    {
        return Ok(None);
    }

    let parse_err = |reason: String| StatsError::LutParse {
        line: line_no,
        reason,
    };
    let label: u32 = tokens[0]
        .parse()
        .map_err(|_| parse_err(format!("label '{}' out of range", tokens[0])))?;
    let mut color = [0u8; 4];
    for (slot, token) in color.iter_mut().zip(&tokens[2..6]) {
        *slot = token
            .parse()
            .map_err(|_| parse_err(format!("colour component '{}' exceeds 255", token)))?;
    }

    Ok(Some(LookupEntry::new(label, tokens[1]).with_color(color)))
}
