use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::Connection;
use serde::Serialize;

use crate::classify::label_class_byname;
use crate::clean::clean_database;
use crate::config::ResolvedConfig;
use crate::database::{self, create_schema};
use crate::dataset::DatasetLoader;
use crate::descriptors::{DescriptorCalculator, add_descriptors_to_db};
use crate::error::BuildError;
use crate::ingest::{DatasetIngest, ingest_dataset};
use crate::smiles::{
    DEFAULT_CACHE_FILE, SmilesCache, StructureReport, StructureResolver, add_smiles_to_db,
};

pub const DEFAULT_DATABASE_FILE: &str = "C3S.db";
pub const DEFAULT_CLEAN_DATABASE_FILE: &str = "C3S_clean.db";

#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub database: Utf8PathBuf,
    pub smiles_cache: Utf8PathBuf,
    pub clean_database: Utf8PathBuf,
}

impl BuildPaths {
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self {
            database: dir.join(DEFAULT_DATABASE_FILE),
            smiles_cache: dir.join(DEFAULT_CACHE_FILE),
            clean_database: dir.join(DEFAULT_CLEAN_DATABASE_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub datasets: Vec<DatasetIngest>,
    pub total_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub built_at: String,
    pub tool: String,
    pub schema_version: u32,
    pub ingest: IngestResult,
    pub structures: StructureReport,
    pub entries_with_descriptors: usize,
    pub entries_labelled: usize,
    pub clean_entries: usize,
    pub clean_entries_with_descriptors: usize,
    pub database: String,
    pub smiles_cache: String,
    pub clean_database: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

fn done(sink: &dyn ProgressSink, start: Instant) {
    sink.event(ProgressEvent {
        message: "... done".to_string(),
        elapsed: Some(start.elapsed()),
    });
}

/// The full database build. Stages run strictly in order and the first error
/// ends the run; only the two explicit commits persist anything.
pub struct Pipeline<S: StructureResolver, D: DescriptorCalculator> {
    config: ResolvedConfig,
    loader: DatasetLoader,
    structures: S,
    descriptors: D,
}

impl<S: StructureResolver, D: DescriptorCalculator> Pipeline<S, D> {
    pub fn new(config: ResolvedConfig, structures: S, descriptors: D) -> Self {
        let loader = DatasetLoader::new(config.src_data_dir.clone());
        Self {
            config,
            loader,
            structures,
            descriptors,
        }
    }

    pub fn run(
        &self,
        paths: &BuildPaths,
        sink: &dyn ProgressSink,
    ) -> Result<BuildSummary, BuildError> {
        emit(sink, "initializing database ...");
        create_schema(&paths.database)?;
        emit(sink, "done");

        let mut conn = database::open(&paths.database)?;
        let tx = conn.transaction()?;

        let ingest = self.ingest_all(&tx, sink)?;

        let start = Instant::now();
        emit(sink, "adding SMILES structures ...");
        // a local cache from an earlier build takes precedence over the packaged one
        let mut cache = if paths.smiles_cache.as_std_path().is_file() {
            SmilesCache::load(Some(&paths.smiles_cache))?
        } else {
            SmilesCache::load(None)?
        };
        let structures = add_smiles_to_db(&tx, &self.structures, &mut cache)?;
        emit(
            sink,
            format!("\tSMILES structures added: {}", structures.structures_added),
        );
        emit(sink, format!("\tweb requests sent: {}", structures.requests_sent));
        done(sink, start);
        cache.save(&paths.smiles_cache)?;

        let entries_with_descriptors = if self.config.descriptors {
            let start = Instant::now();
            emit(sink, "adding descriptors to database entries ...");
            let updated = add_descriptors_to_db(&tx, &self.descriptors)?;
            emit(sink, format!("\tentries with descriptors: {updated}"));
            done(sink, start);
            updated
        } else {
            0
        };

        let start = Instant::now();
        emit(sink, "adding rough chemical classification labels to database entries ...");
        let entries_labelled = label_class_byname(&tx)?;
        emit(sink, format!("\tentries labelled: {entries_labelled}"));
        done(sink, start);

        tx.commit()?;
        drop(conn);

        let start = Instant::now();
        emit(sink, "cleaning database ...");
        let clean_entries = clean_database(&paths.database, &paths.clean_database)?;
        emit(sink, format!("\tentries in clean database: {clean_entries}"));
        done(sink, start);

        let clean_entries_with_descriptors = if self.config.descriptors {
            let start = Instant::now();
            emit(sink, "adding descriptors to cleaned database entries ...");
            let mut clean_conn = database::open(&paths.clean_database)?;
            let clean_tx = clean_conn.transaction()?;
            let updated = add_descriptors_to_db(&clean_tx, &self.descriptors)?;
            emit(sink, format!("\tentries with descriptors in clean database: {updated}"));
            clean_tx.commit()?;
            done(sink, start);
            updated
        } else {
            tracing::info!("descriptor stage disabled");
            0
        };

        Ok(BuildSummary {
            built_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("c3sdb-build/{}", env!("CARGO_PKG_VERSION")),
            schema_version: self.config.schema_version,
            ingest,
            structures,
            entries_with_descriptors,
            entries_labelled,
            clean_entries,
            clean_entries_with_descriptors,
            database: paths.database.to_string(),
            smiles_cache: paths.smiles_cache.to_string(),
            clean_database: paths.clean_database.to_string(),
        })
    }

    /// Adds every configured source dataset, in order, through `conn`.
    pub fn ingest_all(
        &self,
        conn: &Connection,
        sink: &dyn ProgressSink,
    ) -> Result<IngestResult, BuildError> {
        let start = Instant::now();
        emit(sink, "adding source datasets ...");
        let mut datasets = Vec::with_capacity(self.config.src_tags.len());
        let mut total_entries = 0;
        for src_tag in &self.config.src_tags {
            let report = ingest_dataset(conn, &self.loader, &self.config.corrections, src_tag)?;
            total_entries += report.added;
            emit(
                sink,
                format!("\tsrc_tag: {} n_added: {}", report.src_tag, report.added),
            );
            tracing::info!(
                src_tag = %report.src_tag,
                added = report.added,
                duplicates = report.duplicates,
                total = total_entries,
                "dataset ingested"
            );
            datasets.push(report);
        }
        emit(sink, format!("\ttotal entries: {total_entries}"));
        done(sink, start);
        Ok(IngestResult {
            datasets,
            total_entries,
        })
    }
}
