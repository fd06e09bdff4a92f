use rusqlite::Connection;
use serde::Serialize;

use crate::adduct::{AdductCorrections, resolve_ion};
use crate::database::insert_master;
use crate::dataset::{CompoundRecord, DatasetLoader, DatasetMetadata, SourceDataset};
use crate::domain::{MasterRecord, SourceTag};
use crate::error::BuildError;
use crate::identity::{SeenIds, global_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetIngest {
    pub src_tag: String,
    pub added: usize,
    pub duplicates: usize,
}

/// Loads the dataset for `src_tag` and appends its records to `master`.
pub fn ingest_dataset(
    conn: &Connection,
    loader: &DatasetLoader,
    corrections: &AdductCorrections,
    src_tag: &SourceTag,
) -> Result<DatasetIngest, BuildError> {
    let dataset = loader.load(src_tag)?;
    let mut report = ingest_records(conn, &dataset, corrections)?;
    report.src_tag = src_tag.to_string();
    Ok(report)
}

/// Writes every record of `dataset` whose identity has not been seen earlier in
/// the same dataset. Repeats are dropped without an error.
pub fn ingest_records(
    conn: &Connection,
    dataset: &SourceDataset,
    corrections: &AdductCorrections,
) -> Result<DatasetIngest, BuildError> {
    let mut seen = SeenIds::new();
    let mut added = 0;
    let mut duplicates = 0;

    for compound in &dataset.data {
        let record = build_master_record(&dataset.metadata, compound, corrections);
        if !seen.insert(&record.global_id) {
            tracing::debug!(
                g_id = %record.global_id,
                name = %record.name,
                "dropping duplicate record"
            );
            duplicates += 1;
            continue;
        }
        insert_master(conn, &record)?;
        added += 1;
    }

    Ok(DatasetIngest {
        src_tag: dataset.metadata.src_tag.clone(),
        added,
        duplicates,
    })
}

pub fn build_master_record(
    metadata: &DatasetMetadata,
    compound: &CompoundRecord,
    corrections: &AdductCorrections,
) -> MasterRecord {
    let name = compound.name.trim().to_string();
    let adduct = corrections.normalize(&compound.adduct).to_string();
    let ion = resolve_ion(&adduct, compound.resolved_mz());
    let global_id = global_id(
        &name,
        &adduct,
        compound.ccs,
        &metadata.ccs_type,
        &metadata.src_tag,
    );
    MasterRecord {
        global_id,
        name,
        adduct,
        mass: ion.mass,
        charge: ion.charge,
        mz: ion.mz,
        ccs: compound.ccs,
        smi: compound.smi.clone(),
        chem_class_label: None,
        src_tag: metadata.src_tag.clone(),
        ccs_type: metadata.ccs_type.clone(),
        ccs_method: metadata.ccs_method.clone(),
    }
}
