use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use c3sdb_build::adduct::AdductCorrections;
use c3sdb_build::config::ResolvedConfig;
use c3sdb_build::database::{self, count_master, master_records};
use c3sdb_build::descriptors::SmilesCounts;
use c3sdb_build::error::BuildError;
use c3sdb_build::output::{JsonOutput, QuietOutput};
use c3sdb_build::pipeline::{BuildPaths, Pipeline};
use c3sdb_build::smiles::{Lookup, OfflineResolver, SmilesCache, StructureResolver};

const CAFFEINE: &str = "CN1C=NC2=C1C(=O)N(C(=O)N2C)C";

#[derive(Default)]
struct MockPubChem {
    calls: Mutex<Vec<String>>,
}

impl StructureResolver for MockPubChem {
    fn lookup(&self, name: &str) -> Result<Lookup, BuildError> {
        self.calls.lock().unwrap().push(name.to_string());
        if name == "Caffeine" {
            Ok(Lookup::Found(CAFFEINE.to_string()))
        } else {
            Ok(Lookup::NotFound)
        }
    }
}

fn dataset_dir(temp: &tempfile::TempDir) -> Utf8PathBuf {
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("src_data")).unwrap();
    std::fs::create_dir_all(dir.as_std_path()).unwrap();
    std::fs::write(
        dir.join("T.json").as_std_path(),
        r#"{
            "metadata": {"ccs_type": "A", "ccs_method": "B", "src_tag": "T"},
            "data": [
                {"name": "Caffeine", "adduct": "[M+H]+", "mz": 195.0877, "ccs": 138.2},
                {"name": "Caffeine", "adduct": "[M+Na]+", "mz": 217.0696, "ccs": 142.5},
                {"name": "PC 16:0/18:1", "adduct": "[M+H]+", "mz": 760.585, "ccs": 286.0},
                {"name": "Unknown", "adduct": "[M-H]-", "ccs": 150.0}
            ]
        }"#,
    )
    .unwrap();
    dir
}

fn config(src_data_dir: Utf8PathBuf, tags: &[&str]) -> ResolvedConfig {
    ResolvedConfig {
        schema_version: 1,
        src_tags: tags.iter().map(|tag| tag.parse().unwrap()).collect(),
        corrections: AdductCorrections::default(),
        src_data_dir,
        descriptors: true,
    }
}

fn paths(temp: &tempfile::TempDir) -> BuildPaths {
    BuildPaths::in_dir(&Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap())
}

#[test]
fn full_build_produces_three_artifacts() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(dataset_dir(&temp), &["T"]),
        MockPubChem::default(),
        SmilesCounts,
    );
    let paths = paths(&temp);

    let summary = pipeline.run(&paths, &JsonOutput).unwrap();

    assert_eq!(summary.schema_version, 1);
    assert_eq!(summary.ingest.total_entries, 4);
    assert_eq!(summary.structures.structures_added, 2);
    assert_eq!(summary.structures.requests_sent, 3);
    assert_eq!(summary.entries_with_descriptors, 2);
    assert_eq!(summary.entries_labelled, 1);
    assert_eq!(summary.clean_entries, 3);
    assert_eq!(summary.clean_entries_with_descriptors, 2);

    let conn = database::open(&paths.database).unwrap();
    assert_eq!(count_master(&conn).unwrap(), 4);
    let rows = master_records(&conn).unwrap();
    let lipid = rows.iter().find(|row| row.name == "PC 16:0/18:1").unwrap();
    assert_eq!(lipid.chem_class_label.as_deref(), Some("PC"));

    let cache = SmilesCache::load(Some(&paths.smiles_cache)).unwrap();
    assert_eq!(cache.get("Caffeine"), Some(&Some(CAFFEINE.to_string())));
    assert_eq!(cache.get("Unknown"), Some(&None));

    let clean = database::open(&paths.clean_database).unwrap();
    assert_eq!(count_master(&clean).unwrap(), 3);
}

#[test]
fn cached_names_are_not_requested_again() {
    let temp = tempfile::tempdir().unwrap();
    let src_data_dir = dataset_dir(&temp);
    let paths = paths(&temp);

    let first = MockPubChem::default();
    Pipeline::new(config(src_data_dir.clone(), &["T"]), first, SmilesCounts)
        .run(&paths, &JsonOutput)
        .unwrap();

    let second = Pipeline::new(config(src_data_dir, &["T"]), MockPubChem::default(), SmilesCounts);
    let summary = second.run(&paths, &JsonOutput).unwrap();
    assert_eq!(summary.structures.requests_sent, 0);
    assert_eq!(summary.structures.structures_added, 2);
}

#[test]
fn offline_build_leaves_structures_empty() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(dataset_dir(&temp), &["T"]),
        OfflineResolver,
        SmilesCounts,
    );
    let summary = pipeline.run(&paths(&temp), &JsonOutput).unwrap();
    assert_eq!(summary.structures.requests_sent, 0);
    assert_eq!(summary.structures.structures_added, 0);
    assert_eq!(summary.entries_with_descriptors, 0);
}

#[test]
fn failure_before_first_commit_discards_ingestion() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(dataset_dir(&temp), &["T", "absent0000"]),
        OfflineResolver,
        SmilesCounts,
    );
    let paths = paths(&temp);

    let err = pipeline.run(&paths, &JsonOutput).unwrap_err();
    assert_matches!(err, BuildError::ResourceNotFound { src_tag, .. } if src_tag == "absent0000");

    let conn = database::open(&paths.database).unwrap();
    assert_eq!(count_master(&conn).unwrap(), 0);
    assert!(!paths.clean_database.as_std_path().exists());
}

#[test]
fn descriptor_stage_can_be_disabled() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config(dataset_dir(&temp), &["T"]);
    config.descriptors = false;
    let pipeline = Pipeline::new(config, MockPubChem::default(), SmilesCounts);
    let paths = paths(&temp);

    let summary = pipeline.run(&paths, &QuietOutput).unwrap();
    assert_eq!(summary.structures.structures_added, 2);
    assert_eq!(summary.entries_with_descriptors, 0);
    assert_eq!(summary.clean_entries, 3);
    assert_eq!(summary.clean_entries_with_descriptors, 0);

    for store in [&paths.database, &paths.clean_database] {
        let conn = database::open(store).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM descriptors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}

#[test]
fn failure_after_first_commit_keeps_primary_store() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(dataset_dir(&temp), &["T"]),
        MockPubChem::default(),
        SmilesCounts,
    );
    let paths = paths(&temp);
    // a directory where the clean store should go makes the clean stage fail
    std::fs::create_dir_all(paths.clean_database.as_std_path()).unwrap();

    let err = pipeline.run(&paths, &QuietOutput).unwrap_err();
    assert_matches!(err, BuildError::Filesystem(_) | BuildError::Database(_));

    let conn = database::open(&paths.database).unwrap();
    assert_eq!(count_master(&conn).unwrap(), 4);
    let labelled: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM master WHERE chem_class_label IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(labelled, 1);
    let cache = SmilesCache::load(Some(&paths.smiles_cache)).unwrap();
    assert_eq!(cache.get("Caffeine"), Some(&Some(CAFFEINE.to_string())));
}
