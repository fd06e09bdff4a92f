use std::fs;

use camino::Utf8Path;
use rusqlite::{Connection, params};

use crate::domain::MasterRecord;
use crate::error::BuildError;

/// `master` holds one row per measurement; `chem_class_label` stays NULL until
/// classification runs.
pub const SCHEMA: &str = "
CREATE TABLE master (
    g_id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    adduct TEXT NOT NULL,
    mass REAL NOT NULL,
    z INTEGER NOT NULL,
    mz REAL NOT NULL,
    ccs REAL NOT NULL,
    smi TEXT,
    chem_class_label TEXT,
    src_tag TEXT NOT NULL,
    ccs_type TEXT NOT NULL,
    ccs_method TEXT NOT NULL
);
CREATE INDEX master_src_tag ON master (src_tag);
CREATE TABLE descriptors (
    g_id TEXT PRIMARY KEY NOT NULL REFERENCES master (g_id),
    heavy_atoms INTEGER NOT NULL,
    carbon INTEGER NOT NULL,
    nitrogen INTEGER NOT NULL,
    oxygen INTEGER NOT NULL,
    sulfur INTEGER NOT NULL,
    phosphorus INTEGER NOT NULL,
    halogens INTEGER NOT NULL,
    double_bonds INTEGER NOT NULL,
    triple_bonds INTEGER NOT NULL,
    rings INTEGER NOT NULL,
    charged_atoms INTEGER NOT NULL
);
";

const INSERT_MASTER: &str =
    "INSERT INTO master VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// Starts a fresh store at `path`, replacing whatever file was there.
pub fn create_schema(path: &Utf8Path) -> Result<(), BuildError> {
    if path.as_std_path().exists() {
        fs::remove_file(path.as_std_path())
            .map_err(|err| BuildError::Filesystem(format!("remove {path}: {err}")))?;
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| BuildError::Filesystem(err.to_string()))?;
    }
    let conn = open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn open(path: &Utf8Path) -> Result<Connection, BuildError> {
    Connection::open(path.as_std_path())
        .map_err(|err| BuildError::Database(format!("open {path}: {err}")))
}

/// Appends one row. There is no conflict handling, so a repeated `g_id` fails.
pub fn insert_master(conn: &Connection, record: &MasterRecord) -> Result<(), BuildError> {
    conn.execute(
        INSERT_MASTER,
        params![
            record.global_id,
            record.name,
            record.adduct,
            record.mass,
            record.charge,
            record.mz,
            record.ccs,
            record.smi,
            record.chem_class_label,
            record.src_tag,
            record.ccs_type,
            record.ccs_method,
        ],
    )?;
    Ok(())
}

pub fn count_master(conn: &Connection) -> Result<usize, BuildError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM master", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn count_master_for_src(conn: &Connection, src_tag: &str) -> Result<usize, BuildError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM master WHERE src_tag = ?1",
        params![src_tag],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Reads every `master` row in insertion order.
pub fn master_records(conn: &Connection) -> Result<Vec<MasterRecord>, BuildError> {
    let mut stmt = conn.prepare(
        "SELECT g_id, name, adduct, mass, z, mz, ccs, smi, chem_class_label, src_tag, ccs_type, \
         ccs_method FROM master ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(MasterRecord {
            global_id: row.get(0)?,
            name: row.get(1)?,
            adduct: row.get(2)?,
            mass: row.get(3)?,
            charge: row.get(4)?,
            mz: row.get(5)?,
            ccs: row.get(6)?,
            smi: row.get(7)?,
            chem_class_label: row.get(8)?,
            src_tag: row.get(9)?,
            ccs_type: row.get(10)?,
            ccs_method: row.get(11)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(BuildError::from)
}
