use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::adduct::AdductCorrections;
use crate::dataset::BUILTIN_SRC_DATA_DIR;
use crate::domain::SourceTag;
use crate::error::BuildError;

pub const DEFAULT_CONFIG_FILE: &str = "c3sdb.json";

/// Source datasets included in the standard build, in ingestion order.
pub const DEFAULT_SRC_TAGS: &[&str] = &[
    "zhou1016",
    "zhou0817",
    "zhen0917",
    "pagl0314",
    "righ0218",
    "nich1118",
    "may_0114",
    "moll0218",
    "hine1217",
    "hine0217",
    "hine0817",
    "groe0815",
    "bijl0517",
    "stow0817",
    "hine0119",
    "leap0219",
    "blaz0818",
    "tsug0220",
    "lian0118",
    "teja0918",
    "pola0620",
    "dodd0220",
    "celm1120",
    "belo0321",
    "ross0422",
    "baker0524",
    "mull_1223",
    "palm_0424",
];

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub src_tags: Option<Vec<String>>,
    #[serde(default)]
    pub adduct_corrections: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub src_data_dir: Option<String>,
    #[serde(default)]
    pub descriptors: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub src_tags: Vec<SourceTag>,
    pub corrections: AdductCorrections,
    pub src_data_dir: Utf8PathBuf,
    /// Whether both stores get a descriptor pass.
    pub descriptors: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `c3sdb.json` in the current directory when present.
    /// Without either, the built-in defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BuildError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BuildError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BuildError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BuildError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let src_tags = match config.src_tags {
            Some(tags) => tags
                .iter()
                .map(|tag| tag.parse())
                .collect::<Result<Vec<SourceTag>, BuildError>>()?,
            None => default_src_tags(),
        };

        let corrections = config
            .adduct_corrections
            .map(AdductCorrections::from_map)
            .unwrap_or_default();

        let src_data_dir = config
            .src_data_dir
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| Utf8PathBuf::from(BUILTIN_SRC_DATA_DIR));

        tracing::debug!(
            src_tags = src_tags.len(),
            corrections = corrections.len(),
            %src_data_dir,
            "configuration resolved"
        );

        Ok(ResolvedConfig {
            schema_version,
            src_tags,
            corrections,
            src_data_dir,
            descriptors: config.descriptors.unwrap_or(true),
        })
    }
}

pub fn default_src_tags() -> Vec<SourceTag> {
    DEFAULT_SRC_TAGS
        .iter()
        .filter_map(|tag| tag.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.src_tags.len(), DEFAULT_SRC_TAGS.len());
        assert_eq!(resolved.src_tags[0].as_str(), "zhou1016");
        assert_eq!(resolved.corrections, AdductCorrections::default());
        assert!(resolved.src_data_dir.ends_with("data/src_data"));
        assert!(resolved.descriptors);
    }
}
