//! Channel catalog: canonical electrode sets and channel-name resolution.
//!
//! Two fixed lists define the standard layouts:
//!
//! * [`ELECTRODES_10_20`]: 19 scalp electrodes of the 10-20 system.
//! * [`BIPOLAR_DBANANA`]: 20 bipolar derivations of the "double banana".
//!
//! Vendor files rarely use the bare canonical names (`"EEG Fp1-REF"`,
//! `"FP1-LE"`, `"T8-P8-0"`, …), so lookups go through [`normalize_label`]
//! and, failing that, through the old/new temporal-electrode alias table.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reference scheme of a channel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Montage {
    /// Every channel is referenced to a common point.
    Unipolar,
    /// Every channel is the difference of two electrodes.
    Bipolar,
}

impl Montage {
    /// Canonical channel list a signal with this montage is standardized to.
    pub fn canonical_channels(self) -> &'static [&'static str] {
        match self {
            Montage::Unipolar => &ELECTRODES_10_20,
            Montage::Bipolar => &BIPOLAR_DBANANA,
        }
    }
}

impl fmt::Display for Montage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Montage::Unipolar => f.write_str("unipolar"),
            Montage::Bipolar => f.write_str("bipolar"),
        }
    }
}

/// Canonical 10-20 electrodes, in standard output order.
pub const ELECTRODES_10_20: [&str; 19] = [
    "Fp1", "F3", "C3", "P3", "O1", "F7", "T3", "T5", "Fz", "Cz", "Pz", "Fp2", "F4", "C4", "P4",
    "O2", "F8", "T4", "T6",
];

/// Canonical double-banana derivations, in standard output order.
///
/// Left temporal, right temporal, left parasagittal, right parasagittal and
/// midline chains, followed by the two temporal–central links.
pub const BIPOLAR_DBANANA: [&str; 20] = [
    "Fp1-F7", "F7-T3", "T3-T5", "T5-O1",
    "Fp2-F8", "F8-T4", "T4-T6", "T6-O2",
    "Fp1-F3", "F3-C3", "C3-P3", "P3-O1",
    "Fp2-F4", "F4-C4", "C4-P4", "P4-O2",
    "Fz-Cz", "Cz-Pz",
    "T3-C3", "C4-T4",
];

/// Old (T3/T4/T5/T6) and new (T7/T8/P7/P8) names of the same electrodes.
const ALIASES: [(&str, &str); 4] = [("t3", "t7"), ("t4", "t8"), ("t5", "p7"), ("t6", "p8")];

/// Reference suffixes vendors append to unipolar labels.
const REF_SUFFIXES: [&str; 4] = ["-ref", "-le", "-avg", "-ar"];

/// Catalog name of the double-banana derivation `a - b`, matched
/// case-insensitively. Order-significant: `("F7", "Fp1")` is not a pair.
pub fn bipolar_pair_name(a: &str, b: &str) -> Option<&'static str> {
    BIPOLAR_DBANANA.iter().copied().find(|pair| {
        split_pair(pair).is_some_and(|(x, y)| x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b))
    })
}

fn join_pair(a: &str, b: &str) -> String {
    format!("{a}-{b}")
}

/// Split a bipolar name into its two electrodes.
pub fn split_pair(name: &str) -> Option<(&str, &str)> {
    name.split_once('-')
}

/// Normalise a raw label for comparison.
///
/// Lowercase, strip spaces and a leading `EEG` modality tag. Unipolar labels
/// lose their reference suffix (`-REF`, `-LE`, …); bipolar labels lose the
/// numeric duplicate suffix some archives use (`T8-P8-0`).
pub fn normalize_label(label: &str, montage: Montage) -> String {
    let lower = label.trim().to_lowercase();
    let stripped = lower.strip_prefix("eeg ").unwrap_or(&lower);
    let mut s = stripped.replace(' ', "");

    match montage {
        Montage::Unipolar => {
            if let Some(suffix) = REF_SUFFIXES.iter().find(|suf| s.ends_with(*suf)) {
                s.truncate(s.len() - suffix.len());
            }
        }
        Montage::Bipolar => {
            let parts: Vec<&str> = s.split('-').collect();
            if parts.len() == 3 && parts[2].chars().all(|c| c.is_ascii_digit()) {
                s = join_pair(parts[0], parts[1]);
            }
        }
    }
    s
}

fn electrode_alias(electrode: &str) -> Option<&'static str> {
    ALIASES.iter().find_map(|&(old, new)| {
        if electrode == old {
            Some(new)
        } else if electrode == new {
            Some(old)
        } else {
            None
        }
    })
}

/// Alternative normalised spellings of `target` (already normalised).
fn alias_candidates(target: &str, montage: Montage) -> Vec<String> {
    match montage {
        Montage::Unipolar => electrode_alias(target).map(String::from).into_iter().collect(),
        Montage::Bipolar => {
            let Some((a, b)) = split_pair(target) else {
                return vec![];
            };
            let mut a_opts = vec![a];
            a_opts.extend(electrode_alias(a));
            let mut b_opts = vec![b];
            b_opts.extend(electrode_alias(b));
            let mut out = Vec::new();
            for &ea in &a_opts {
                for &eb in &b_opts {
                    let name = join_pair(ea, eb);
                    if name != target {
                        out.push(name);
                    }
                }
            }
            out
        }
    }
}

/// Index of the channel in `channels` that corresponds to `target`.
///
/// Resolution order: case-insensitive exact match, match after
/// [`normalize_label`], then the alias table for `montage`.
///
/// # Errors
///
/// [`Error::ChannelNotFound`] when none of the steps matches.
pub fn resolve_index<S: AsRef<str>>(channels: &[S], target: &str, montage: Montage) -> Result<usize> {
    if let Some(i) = channels.iter().position(|c| c.as_ref().eq_ignore_ascii_case(target)) {
        return Ok(i);
    }

    let normalized: Vec<String> = channels
        .iter()
        .map(|c| normalize_label(c.as_ref(), montage))
        .collect();
    let target_n = normalize_label(target, montage);
    if let Some(i) = normalized.iter().position(|c| *c == target_n) {
        return Ok(i);
    }

    for candidate in alias_candidates(&target_n, montage) {
        if let Some(i) = normalized.iter().position(|c| *c == candidate) {
            return Ok(i);
        }
    }

    Err(Error::ChannelNotFound {
        name: target.to_string(),
        available: channels.iter().map(|c| c.as_ref().to_string()).collect(),
    })
}
