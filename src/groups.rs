//
// groups.rs
// Mri-Stats-rs
//
// Built-in FreeSurfer anatomical groups and hemisphere tagging for aseg/aparc/wmparc labels.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::BTreeSet;

pub const LEFT_HEMISPHERE: &str = "left-hemisphere";
pub const RIGHT_HEMISPHERE: &str = "right-hemisphere";

const CORPUS_CALLOSUM: [u32; 5] = [251, 252, 253, 254, 255];

const VENTRICLES: [u32; 6] = [
    4,  // Left lateral ventricle
    5,  // Left inferior lateral ventricle
    14, // Third ventricle
    15, // Fourth ventricle
    43, // Right lateral ventricle
    44, // Right inferior lateral ventricle
];

const SUBCORTICAL_GM: [u32; 14] = [
    10, 49, // thalamus
    11, 50, // caudate
    12, 51, // putamen
    13, 52, // pallidum
    17, 53, // hippocampus
    18, 54, // amygdala
    26, 58, // accumbens
];

/// Offset between a cortical label and the CSF label surrounding it.
const CORTICAL_CSF_OFFSET: u32 = 15000;

/// Canonical group names in the order they are reported by default.
pub const BUILTIN_GROUP_NAMES: [&str; 8] = [
    "cerebral-wm",
    "cerebral-cortex",
    "cerebellar-wm",
    "cerebellar-cortex",
    "csf-freesurfer",
    "cortical-csf",
    "corpus-callosum",
    "subcortical-gm",
];

fn cerebral_wm() -> Vec<u32> {
    let mut labels = vec![2, 41];
    labels.extend(3000..3036);
    labels.extend(4000..4036);
    labels.extend([5001, 5002]);
    // Ventral DC is counted as white matter.
    labels.extend([28, 60]);
    labels.extend(CORPUS_CALLOSUM);
    // Choroid plexus.
    labels.extend([31, 63]);
    labels
}

fn cerebral_cortex() -> Vec<u32> {
    let mut labels = vec![3, 42];
    labels.extend(1000..1036);
    labels.extend(2000..2036);
    labels
}

/// Label list for one built-in group, or `None` if the name is not built in.
pub fn builtin_group(name: &str) -> Option<Vec<u32>> {
    let labels = match name {
        "cerebral-wm" => cerebral_wm(),
        "cerebral-cortex" => cerebral_cortex(),
        "cerebellar-wm" => vec![7, 46],
        "cerebellar-cortex" => vec![8, 47],
        "csf-freesurfer" => {
            let mut labels = VENTRICLES.to_vec();
            labels.push(24); // generic CSF
            labels
        }
        "cortical-csf" => cerebral_cortex()
            .into_iter()
            .map(|l| l + CORTICAL_CSF_OFFSET)
            .collect(),
        "corpus-callosum" => CORPUS_CALLOSUM.to_vec(),
        "subcortical-gm" => SUBCORTICAL_GM.to_vec(),
        _ => return None,
    };
    Some(labels)
}

/// All built-in groups as (name, sorted label set), in canonical order.
pub fn builtin_groups() -> Vec<(&'static str, BTreeSet<u32>)> {
    BUILTIN_GROUP_NAMES
        .iter()
        .filter_map(|name| builtin_group(name).map(|labels| (*name, labels.into_iter().collect())))
        .collect()
}

/// Hemisphere tag implied by a FreeSurfer region name, if any.
pub fn hemisphere_tag(region_name: &str) -> Option<&'static str> {
    const LEFT: [&str; 3] = ["Left-", "ctx-lh-", "wm-lh-"];
    const RIGHT: [&str; 3] = ["Right-", "ctx-rh-", "wm-rh-"];

    if LEFT.iter().any(|p| region_name.starts_with(p)) {
        Some(LEFT_HEMISPHERE)
    } else if RIGHT.iter().any(|p| region_name.starts_with(p)) {
        Some(RIGHT_HEMISPHERE)
    } else {
        None
    }
}
