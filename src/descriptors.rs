use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::BuildError;

/// Structural counts derived from a SMILES string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Descriptors {
    pub heavy_atoms: u32,
    pub carbon: u32,
    pub nitrogen: u32,
    pub oxygen: u32,
    pub sulfur: u32,
    pub phosphorus: u32,
    pub halogens: u32,
    pub double_bonds: u32,
    pub triple_bonds: u32,
    pub rings: u32,
    pub charged_atoms: u32,
}

pub trait DescriptorCalculator {
    fn compute(&self, smi: &str) -> Option<Descriptors>;
}

/// Counts atoms, bonds and ring closures directly from the SMILES text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmilesCounts;

impl DescriptorCalculator for SmilesCounts {
    fn compute(&self, smi: &str) -> Option<Descriptors> {
        count_smiles(smi)
    }
}

/// Recomputes descriptors for every row with a structure. Returns the number of
/// rows written.
pub fn add_descriptors_to_db(
    conn: &Connection,
    calculator: &dyn DescriptorCalculator,
) -> Result<usize, BuildError> {
    let mut select = conn.prepare("SELECT g_id, smi FROM master WHERE smi IS NOT NULL")?;
    let rows = select
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO descriptors
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    let mut updated = 0;
    for (g_id, smi) in rows {
        let Some(d) = calculator.compute(&smi) else {
            tracing::debug!(%g_id, %smi, "no descriptors for structure");
            continue;
        };
        stmt.execute(params![
            g_id,
            d.heavy_atoms,
            d.carbon,
            d.nitrogen,
            d.oxygen,
            d.sulfur,
            d.phosphorus,
            d.halogens,
            d.double_bonds,
            d.triple_bonds,
            d.rings,
            d.charged_atoms,
        ])?;
        updated += 1;
    }
    Ok(updated)
}

pub fn count_smiles(smi: &str) -> Option<Descriptors> {
    let mut d = Descriptors::default();
    let mut ring_labels = 0u32;
    let chars: Vec<char> = smi.trim().chars().collect();
    if chars.is_empty() {
        return None;
    }

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '[' => {
                let end = chars[i..].iter().position(|&c| c == ']')? + i;
                bracket_atom(&chars[i + 1..end], &mut d)?;
                i = end + 1;
                continue;
            }
            'C' if chars.get(i + 1) == Some(&'l') => {
                add_atom("Cl", &mut d);
                i += 2;
                continue;
            }
            'B' if chars.get(i + 1) == Some(&'r') => {
                add_atom("Br", &mut d);
                i += 2;
                continue;
            }
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' => add_atom(&ch.to_string(), &mut d),
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                add_atom(&ch.to_ascii_uppercase().to_string(), &mut d)
            }
            '=' => d.double_bonds += 1,
            '#' => d.triple_bonds += 1,
            '0'..='9' => ring_labels += 1,
            '%' => {
                let digits = chars.get(i + 1..i + 3)?;
                if !digits.iter().all(char::is_ascii_digit) {
                    return None;
                }
                ring_labels += 1;
                i += 3;
                continue;
            }
            '(' | ')' | '-' | '/' | '\\' | '.' | ':' | '$' | '~' | '*' => {}
            _ => return None,
        }
        i += 1;
    }

    d.rings = ring_labels / 2;
    Some(d)
}

fn bracket_atom(contents: &[char], d: &mut Descriptors) -> Option<()> {
    let mut rest = contents
        .iter()
        .skip_while(|c| c.is_ascii_digit())
        .copied()
        .peekable();
    let first = rest.next()?;
    let mut symbol = first.to_ascii_uppercase().to_string();
    if first.is_ascii_uppercase() {
        if let Some(&next) = rest.peek() {
            if next.is_ascii_lowercase() && !matches!(next, 'h') {
                symbol.push(next);
                rest.next();
            }
        }
    } else if !first.is_ascii_lowercase() {
        return None;
    }
    if symbol != "H" {
        add_atom(&symbol, d);
    }
    if contents.iter().any(|c| matches!(c, '+' | '-')) {
        d.charged_atoms += 1;
    }
    Some(())
}

fn add_atom(symbol: &str, d: &mut Descriptors) {
    d.heavy_atoms += 1;
    match symbol {
        "C" => d.carbon += 1,
        "N" => d.nitrogen += 1,
        "O" => d.oxygen += 1,
        "S" => d.sulfur += 1,
        "P" => d.phosphorus += 1,
        "F" | "Cl" | "Br" | "I" => d.halogens += 1,
        _ => {}
    }
}
