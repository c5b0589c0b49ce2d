//! Generates the event taxonomy enums from `taxonomy/events.json`.
//!
//! The `Levels` object maps short codes to human labels. `bckg` is the
//! background class; every other level is a seizure type. The output is
//! `$OUT_DIR/taxonomy.rs`, pulled into `src/taxonomy.rs` with `include!`.
use std::collections::HashSet;
use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

const SOURCE: &str = "taxonomy/events.json";
const BACKGROUND: &str = "bckg";

fn variant_name(code: &str) -> String {
    code.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed={SOURCE}");

    let text = std::fs::read_to_string(SOURCE)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let levels = json
        .get("Levels")
        .and_then(|v| v.as_object())
        .ok_or("taxonomy: missing `Levels` object")?;

    let mut entries: Vec<(String, String, String)> = Vec::new(); // (code, variant, description)
    let mut seen = HashSet::new();
    for (code, label) in levels {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("taxonomy: invalid short code `{code}`").into());
        }
        let description = label
            .as_str()
            .ok_or_else(|| format!("taxonomy: label of `{code}` is not a string"))?;
        let variant = variant_name(code);
        if !seen.insert(variant.clone()) {
            return Err(format!("taxonomy: code `{code}` collides as `{variant}`").into());
        }
        entries.push((code.clone(), variant, description.to_string()));
    }
    if !entries.iter().any(|(code, _, _)| code == BACKGROUND) {
        return Err(format!("taxonomy: missing `{BACKGROUND}` level").into());
    }

    let seizures: Vec<&(String, String, String)> =
        entries.iter().filter(|(code, _, _)| code != BACKGROUND).collect();
    let events: Vec<&(String, String, String)> = entries
        .iter()
        .filter(|(code, _, _)| code == BACKGROUND)
        .chain(seizures.iter().copied())
        .collect();

    let mut out = String::new();
    writeln!(out, "// @generated by build.rs from {SOURCE}. Do not edit.")?;

    for (name, doc, list) in [
        ("SeizureType", "Seizure subtypes of the event taxonomy.", &seizures),
        ("EventType", "Every event label of the taxonomy: background plus all seizure subtypes.", &events),
    ] {
        writeln!(out, "#[doc = {doc:?}]")?;
        writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]")?;
        writeln!(out, "pub enum {name} {{")?;
        for (_, variant, description) in list.iter() {
            writeln!(out, "    #[doc = {description:?}]")?;
            writeln!(out, "    {variant},")?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        writeln!(out, "impl {name} {{")?;
        writeln!(out, "    /// Every member, in taxonomy order.")?;
        writeln!(out, "    pub const ALL: [{name}; {}] = [", list.len())?;
        for (_, variant, _) in list.iter() {
            writeln!(out, "        {name}::{variant},")?;
        }
        writeln!(out, "    ];")?;
        writeln!(out)?;

        writeln!(out, "    /// Taxonomy short code, as used in annotation files.")?;
        writeln!(out, "    pub const fn code(self) -> &'static str {{")?;
        writeln!(out, "        match self {{")?;
        for (code, variant, _) in list.iter() {
            writeln!(out, "            {name}::{variant} => {code:?},")?;
        }
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
        writeln!(out)?;

        writeln!(out, "    /// Human-readable label.")?;
        writeln!(out, "    pub const fn description(self) -> &'static str {{")?;
        writeln!(out, "        match self {{")?;
        for (_, variant, description) in list.iter() {
            writeln!(out, "            {name}::{variant} => {description:?},")?;
        }
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
        writeln!(out)?;

        writeln!(out, "    /// Look up a member by its exact short code.")?;
        writeln!(out, "    pub fn from_code(code: &str) -> Option<{name}> {{")?;
        writeln!(out, "        match code {{")?;
        for (code, variant, _) in list.iter() {
            writeln!(out, "            {code:?} => Some({name}::{variant}),")?;
        }
        writeln!(out, "            _ => None,")?;
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    writeln!(out, "impl From<SeizureType> for EventType {{")?;
    writeln!(out, "    fn from(sz: SeizureType) -> EventType {{")?;
    writeln!(out, "        match sz {{")?;
    for (_, variant, _) in &seizures {
        writeln!(out, "            SeizureType::{variant} => EventType::{variant},")?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl EventType {{")?;
    writeln!(out, "    /// The seizure subtype, or `None` for background.")?;
    writeln!(out, "    pub const fn seizure_type(self) -> Option<SeizureType> {{")?;
    writeln!(out, "        match self {{")?;
    for (code, variant, _) in &events {
        if code == BACKGROUND {
            writeln!(out, "            EventType::{variant} => None,")?;
        } else {
            writeln!(out, "            EventType::{variant} => Some(SeizureType::{variant}),")?;
        }
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;

    let dest = PathBuf::from(std::env::var("OUT_DIR")?).join("taxonomy.rs");
    std::fs::write(dest, out)?;
    Ok(())
}
