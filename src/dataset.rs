use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Deserializer};

use crate::domain::SourceTag;
use crate::error::BuildError;

/// Directory holding the packaged `<src_tag>.json` datasets.
pub const BUILTIN_SRC_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/src_data");

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDataset {
    pub metadata: DatasetMetadata,
    pub data: Vec<CompoundRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetMetadata {
    pub ccs_type: String,
    pub ccs_method: String,
    pub src_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompoundRecord {
    pub name: String,
    pub adduct: String,
    #[serde(default, deserialize_with = "present_number")]
    pub mz: Option<f64>,
    #[serde(default, rename = "m/z", alias = "m-z", deserialize_with = "present_number")]
    pub alt_mz: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub ccs: f64,
    #[serde(default)]
    pub smi: Option<String>,
}

impl CompoundRecord {
    /// `mz`, then `m/z`, then `0.0`.
    pub fn resolved_mz(&self) -> f64 {
        self.mz.or(self.alt_mz).unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrText::Number(value) => Ok(value),
            NumberOrText::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("expected a number, found {text:?}"))),
        }
    }
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f64()
}

// only called for keys that are present, so an explicit `null` is rejected
fn present_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f64().map(Some)
}

#[derive(Debug, Clone)]
pub struct DatasetLoader {
    root: Utf8PathBuf,
}

impl DatasetLoader {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn resource_path(&self, src_tag: &SourceTag) -> Utf8PathBuf {
        self.root.join(format!("{}.json", src_tag.as_str()))
    }

    /// Reads and fully validates one dataset before any of it is used.
    pub fn load(&self, src_tag: &SourceTag) -> Result<SourceDataset, BuildError> {
        let path = self.resource_path(src_tag);
        if !path.as_std_path().is_file() {
            return Err(BuildError::ResourceNotFound {
                src_tag: src_tag.to_string(),
                path: path.into_std_path_buf(),
            });
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| BuildError::Filesystem(format!("read {path}: {err}")))?;
        parse_dataset(src_tag.as_str(), &content)
    }
}

pub fn parse_dataset(src_tag: &str, content: &str) -> Result<SourceDataset, BuildError> {
    serde_json::from_str(content).map_err(|err| BuildError::MalformedDataset {
        src_tag: src_tag.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn mz_prefers_mz_then_slash_then_zero() {
        let dataset = parse_dataset(
            "t",
            r#"{
                "metadata": {"ccs_type": "DT", "ccs_method": "single field", "src_tag": "t"},
                "data": [
                    {"name": "a", "adduct": "[M+H]+", "mz": 100.5, "m/z": 200.0, "ccs": 150.0},
                    {"name": "b", "adduct": "[M+H]+", "m/z": 200.0, "ccs": 150.0},
                    {"name": "c", "adduct": "[M+H]+", "ccs": 150.0}
                ]
            }"#,
        )
        .unwrap();
        let mzs: Vec<f64> = dataset.data.iter().map(CompoundRecord::resolved_mz).collect();
        assert_eq!(mzs, vec![100.5, 200.0, 0.0]);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let dataset = parse_dataset(
            "t",
            r#"{
                "metadata": {"ccs_type": "DT", "ccs_method": "m", "src_tag": "t"},
                "data": [{"name": "a", "adduct": "[M+H]+", "mz": "181.07", "ccs": " 140.2 "}]
            }"#,
        )
        .unwrap();
        assert_eq!(dataset.data[0].mz, Some(181.07));
        assert_eq!(dataset.data[0].ccs, 140.2);
        assert_eq!(dataset.data[0].smi, None);
    }

    #[test]
    fn null_mz_is_malformed() {
        for field in ["mz", "m/z"] {
            let content = format!(
                r#"{{
                    "metadata": {{"ccs_type": "DT", "ccs_method": "m", "src_tag": "t"}},
                    "data": [{{"name": "a", "adduct": "[M+H]+", "{field}": null, "ccs": 1.0}}]
                }}"#
            );
            let err = parse_dataset("t", &content).unwrap_err();
            assert_matches!(err, BuildError::MalformedDataset { .. });
        }
    }

    #[test]
    fn missing_ccs_is_malformed() {
        let err = parse_dataset(
            "t",
            r#"{
                "metadata": {"ccs_type": "DT", "ccs_method": "m", "src_tag": "t"},
                "data": [{"name": "a", "adduct": "[M+H]+", "mz": 100.0}]
            }"#,
        )
        .unwrap_err();
        assert_matches!(err, BuildError::MalformedDataset { .. });
    }

    #[test]
    fn missing_metadata_is_malformed() {
        let err = parse_dataset("t", r#"{"data": []}"#).unwrap_err();
        assert_matches!(err, BuildError::MalformedDataset { src_tag, .. } if src_tag == "t");
    }

    #[test]
    fn missing_resource_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let loader = DatasetLoader::new(root);
        let tag: SourceTag = "nope0000".parse().unwrap();
        assert!(loader.resource_path(&tag).ends_with("nope0000.json"));
        assert_matches!(loader.load(&tag), Err(BuildError::ResourceNotFound { .. }));
    }
}
