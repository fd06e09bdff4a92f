use camino::Utf8Path;
use rusqlite::params;

use crate::database::{create_schema, open};
use crate::error::BuildError;

/// Rows kept in the cleaned store: an m/z was resolved and the CCS is physical.
const KEEP: &str = "mz > 0 AND ccs > 0";

/// Derives a filtered copy of `source` at `destination`. The copy is committed
/// before returning; the number of rows kept is returned.
pub fn clean_database(source: &Utf8Path, destination: &Utf8Path) -> Result<usize, BuildError> {
    if !source.as_std_path().is_file() {
        return Err(BuildError::Filesystem(format!(
            "source database not found: {source}"
        )));
    }
    create_schema(destination)?;

    let mut conn = open(destination)?;
    conn.execute("ATTACH DATABASE ?1 AS source", params![source.as_str()])?;
    let tx = conn.transaction()?;
    let kept = tx.execute(
        &format!("INSERT INTO main.master SELECT * FROM source.master WHERE {KEEP} ORDER BY rowid"),
        [],
    )?;
    tx.commit()?;
    conn.execute("DETACH DATABASE source", [])?;
    tracing::info!(kept, %destination, "cleaned database written");
    Ok(kept)
}
