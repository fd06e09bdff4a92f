use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Known data-entry errors in source datasets and their canonical adduct.
pub const DEFAULT_CORRECTIONS: &[(&str, &str)] = &[
    ("[M+]+", "[M]+"),
    ("M+NH4]+", "[M+NH4]+"),
    ("[M+H]+*", "[M+H]+"),
    ("[M+Na]+*", "[M+Na]+"),
    ("[M+H20-H]-", "[M+H2O-H]-"),
];

// a digit followed by a sign right after a closing bracket, e.g. `[M+2H]2+`
static MULTI_CHARGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*\]([0-9])[+-]").expect("charge pattern is valid"));

/// Lookup table from malformed adduct notation to its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdductCorrections {
    table: BTreeMap<String, String>,
}

impl Default for AdductCorrections {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_CORRECTIONS.iter().copied())
    }
}

impl AdductCorrections {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            table: pairs
                .into_iter()
                .map(|(malformed, canonical)| (malformed.to_string(), canonical.to_string()))
                .collect(),
        }
    }

    pub fn from_map(table: BTreeMap<String, String>) -> Self {
        Self { table }
    }

    /// Returns the canonical adduct; anything not in the table passes through.
    pub fn normalize<'a>(&'a self, adduct: &'a str) -> &'a str {
        self.table.get(adduct).map(String::as_str).unwrap_or(adduct)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Ion charge encoded in the adduct, `1` when no multiplicity is given.
pub fn infer_charge(adduct: &str) -> u32 {
    MULTI_CHARGE
        .captures(adduct)
        .and_then(|caps| caps.get(1))
        .and_then(|digit| digit.as_str().parse::<u32>().ok())
        .map(|charge| charge.max(1))
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedIon {
    pub charge: u32,
    pub mz: f64,
    pub mass: f64,
}

pub fn resolve_ion(adduct: &str, mz: f64) -> ResolvedIon {
    let charge = infer_charge(adduct);
    ResolvedIon {
        charge,
        mz,
        mass: mz * f64::from(charge),
    }
}
