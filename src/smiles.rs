use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rusqlite::{Connection, params};
use serde::Serialize;
use serde_json::Value;

use crate::error::BuildError;

pub const DEFAULT_CACHE_FILE: &str = "smiles_search_cache.json";

const BUILTIN_CACHE: &str = include_str!("../data/smiles_search_cache.json");
const PUBCHEM_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Previous structure searches by compound name. `None` records a search
/// that found nothing, so it is not repeated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmilesCache {
    entries: BTreeMap<String, Option<String>>,
}

impl SmilesCache {
    /// Loads `path`, or the copy shipped with the crate when `path` is `None`.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, BuildError> {
        let content = match path {
            Some(path) => fs::read_to_string(path.as_std_path())
                .map_err(|err| BuildError::Filesystem(format!("read {path}: {err}")))?,
            None => BUILTIN_CACHE.to_string(),
        };
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, BuildError> {
        let entries = serde_json::from_str(content)
            .map_err(|err| BuildError::CacheParse(err.to_string()))?;
        Ok(Self { entries })
    }

    /// Writes through a temporary file in the same directory, then renames.
    pub fn save(&self, path: &Utf8Path) -> Result<(), BuildError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(&self.entries)
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("c3sdb-cache")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: &str, smi: Option<String>) {
        self.entries.insert(name.to_string(), smi);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
    /// No request was made; the name stays uncached.
    Skipped,
}

pub trait StructureResolver {
    fn lookup(&self, name: &str) -> Result<Lookup, BuildError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub structures_added: usize,
    pub requests_sent: usize,
}

/// Fills `smi` for rows that have none, consulting `cache` before `resolver`.
pub fn add_smiles_to_db(
    conn: &Connection,
    resolver: &dyn StructureResolver,
    cache: &mut SmilesCache,
) -> Result<StructureReport, BuildError> {
    let mut select =
        conn.prepare("SELECT DISTINCT name FROM master WHERE smi IS NULL ORDER BY name")?;
    let names = select
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = StructureReport::default();
    for name in names {
        let smi = match cache.get(&name) {
            Some(cached) => cached.clone(),
            None => match resolver.lookup(&name)? {
                Lookup::Found(smi) => {
                    report.requests_sent += 1;
                    cache.insert(&name, Some(smi.clone()));
                    Some(smi)
                }
                Lookup::NotFound => {
                    report.requests_sent += 1;
                    cache.insert(&name, None);
                    None
                }
                Lookup::Skipped => None,
            },
        };
        if let Some(smi) = smi {
            report.structures_added += conn.execute(
                "UPDATE master SET smi = ?1 WHERE name = ?2 AND smi IS NULL",
                params![smi, name],
            )?;
        }
    }
    tracing::info!(
        added = report.structures_added,
        requests = report.requests_sent,
        "structure lookup finished"
    );
    Ok(report)
}

/// Resolver for builds without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResolver;

impl StructureResolver for OfflineResolver {
    fn lookup(&self, _name: &str) -> Result<Lookup, BuildError> {
        Ok(Lookup::Skipped)
    }
}

#[derive(Clone)]
pub struct PubChemHttpClient {
    client: Client,
    base_url: String,
}

impl PubChemHttpClient {
    pub fn new() -> Result<Self, BuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("c3sdb-build/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BuildError::StructureHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| BuildError::StructureHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: PUBCHEM_BASE_URL.to_string(),
        })
    }

    pub fn lookup_url(&self, name: &str) -> Result<Url, BuildError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| BuildError::StructureHttp(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| BuildError::StructureHttp("base url cannot hold a path".to_string()))?
            .extend(["compound", "name", name, "property", "CanonicalSMILES", "JSON"]);
        Ok(url)
    }
}

impl StructureResolver for PubChemHttpClient {
    fn lookup(&self, name: &str) -> Result<Lookup, BuildError> {
        let url = self.lookup_url(name)?;
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| BuildError::StructureHttp(err.to_string()))?;
        let status = response.status().as_u16();
        // PubChem answers unknown or unparseable names with 404/400
        if matches!(status, 400 | 404) {
            return Ok(Lookup::NotFound);
        }
        if !response.status().is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "structure lookup failed".to_string());
            return Err(BuildError::StructureStatus { status, message });
        }
        let body: Value = response
            .json()
            .map_err(|err| BuildError::StructureHttp(err.to_string()))?;
        Ok(parse_property_table(&body)
            .map(Lookup::Found)
            .unwrap_or(Lookup::NotFound))
    }
}

/// Pulls the first SMILES out of a PUG REST property table.
pub fn parse_property_table(body: &Value) -> Option<String> {
    let first = body
        .get("PropertyTable")?
        .get("Properties")?
        .as_array()?
        .first()?;
    ["CanonicalSMILES", "ConnectivitySMILES", "SMILES", "IsomericSMILES"]
        .iter()
        .find_map(|key| first.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
