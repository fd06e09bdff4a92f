use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Identifier of a source dataset, e.g. `zhou1016`. Doubles as the resource file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceTag(String);

impl SourceTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceTag {
    type Err = BuildError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized != "."
            && !normalized.contains("..")
            && !normalized.contains(['/', '\\']);
        if !is_valid {
            return Err(BuildError::InvalidSourceTag(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl TryFrom<String> for SourceTag {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceTag> for String {
    fn from(value: SourceTag) -> Self {
        value.0
    }
}

/// One row of the `master` table, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterRecord {
    pub global_id: String,
    pub name: String,
    pub adduct: String,
    pub mass: f64,
    pub charge: u32,
    pub mz: f64,
    pub ccs: f64,
    pub smi: Option<String>,
    pub chem_class_label: Option<String>,
    pub src_tag: String,
    pub ccs_type: String,
    pub ccs_method: String,
}
