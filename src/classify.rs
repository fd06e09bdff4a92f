use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{Connection, params};

use crate::error::BuildError;

// lipid shorthand names such as `PC 16:0/18:1`, `TG(52:2)` or `LPE 18:1`
static LIPID_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    let heads = LIPID_CLASSES.join("|");
    Regex::new(&format!(r"^({heads})[\s(]*[OP]?-?\d+:\d+")).expect("lipid pattern is valid")
});

/// Rough lipid class of a compound name, if it is written in lipid shorthand.
pub fn class_from_name(name: &str) -> Option<&'static str> {
    let caps = LIPID_SHORTHAND.captures(name.trim())?;
    let class = caps.get(1)?.as_str();
    LIPID_CLASSES.iter().copied().find(|known| *known == class)
}

// longer heads first so `LPC` is not read as `PC`, `HexCer` not as `Cer`
const LIPID_CLASSES: &[&str] = &[
    "LPC", "LPE", "LPG", "LPI", "LPS", "PC", "PE", "PG", "PI", "PS", "PA", "SM", "HexCer", "Cer",
    "TG", "DG", "MG", "CE", "FA", "CAR",
];

/// Writes class labels into rows that do not have one yet. Returns the number
/// of rows labelled.
pub fn label_class_byname(conn: &Connection) -> Result<usize, BuildError> {
    let mut select = conn.prepare("SELECT g_id, name FROM master WHERE chem_class_label IS NULL")?;
    let rows = select
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("UPDATE master SET chem_class_label = ?1 WHERE g_id = ?2")?;
    let mut labelled = 0;
    for (g_id, name) in rows {
        if let Some(class) = class_from_name(&name) {
            labelled += stmt.execute(params![class, g_id])?;
        }
    }
    Ok(labelled)
}
