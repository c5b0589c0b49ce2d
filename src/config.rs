//! Standardization configuration.
//!
//! [`StandardizeConfig`] holds every tunable parameter of the canonical
//! pipeline. The defaults are the settings every dataset converter uses:
//! 256 Hz, the 19 10-20 electrodes, common-average reference, strict
//! channel handling.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channels::ELECTRODES_10_20;
use crate::error::Result;

/// How missing channels or bipolar pairs are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Any missing channel fails the operation.
    #[default]
    Strict,
    /// Missing channels are dropped from the output and logged.
    Lenient,
}

/// Reference applied as the last step of standardization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceScheme {
    /// Double-banana bipolar derivation.
    Bipolar,
    /// Subtract the per-sample mean of all channels.
    CommonAverage,
    /// Subtract the named electrode from every channel.
    Referential(String),
}

impl FromStr for ReferenceScheme {
    type Err = std::convert::Infallible;

    /// `"bipolar"`, `"avg"` / `"average"` / `"common-average"` / `"car"`
    /// (case-insensitive); anything else names a reference electrode.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let scheme = match s.trim().to_lowercase().as_str() {
            "bipolar" => ReferenceScheme::Bipolar,
            "avg" | "average" | "common-average" | "car" => ReferenceScheme::CommonAverage,
            _ => ReferenceScheme::Referential(s.trim().to_string()),
        };
        Ok(scheme)
    }
}

impl TryFrom<String> for ReferenceScheme {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ReferenceScheme> for String {
    fn from(r: ReferenceScheme) -> Self {
        r.to_string()
    }
}

impl fmt::Display for ReferenceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceScheme::Bipolar => f.write_str("bipolar"),
            ReferenceScheme::CommonAverage => f.write_str("common-average"),
            ReferenceScheme::Referential(name) => f.write_str(name),
        }
    }
}

/// Configuration of [`EegSignal::standardize_with`](crate::signal::EegSignal::standardize_with).
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegstd::{ReferenceScheme, StandardizeConfig};
///
/// let cfg = StandardizeConfig {
///     target_fs: 200.0,
///     reference: ReferenceScheme::Referential("Cz".into()),
///     ..StandardizeConfig::default()
/// };
/// assert_eq!(cfg.channels.len(), 19);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizeConfig {
    /// Output sampling rate in Hz.
    ///
    /// Default: `256.0` Hz.
    pub target_fs: f64,

    /// Output channel list, in output order.
    ///
    /// Names are resolved against the signal's channels with the channel
    /// catalog rules (case-insensitive, vendor suffixes, temporal aliases).
    ///
    /// Default: the 19 electrodes of [`ELECTRODES_10_20`].
    pub channels: Vec<String>,

    /// Reference scheme applied after channel selection.
    ///
    /// Default: [`ReferenceScheme::CommonAverage`].
    pub reference: ReferenceScheme,

    /// Missing channel / bipolar pair handling.
    ///
    /// Default: [`Strictness::Strict`].
    pub strictness: Strictness,
}

impl Default for StandardizeConfig {
    fn default() -> Self {
        Self {
            target_fs: 256.0,
            channels: ELECTRODES_10_20.iter().map(|s| s.to_string()).collect(),
            reference: ReferenceScheme::CommonAverage,
            strictness: Strictness::Strict,
        }
    }
}

impl StandardizeConfig {
    /// Parse a JSON document. Missing keys take their default value.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
