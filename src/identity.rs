use std::collections::HashSet;

use sha1::{Digest, Sha1};

pub const GLOBAL_ID_PREFIX: &str = "CCSBASE_";
const GLOBAL_ID_HEX_LEN: usize = 10;

/// Stable identity for a measurement.
///
/// The five fields are concatenated without a delimiter and hashed with SHA-1;
/// the id is [`GLOBAL_ID_PREFIX`] plus the last ten hex digits, upper-cased.
/// `ccs` is rendered the way existing CCSbase identities were produced, so ids
/// stay comparable across database releases.
pub fn global_id(name: &str, adduct: &str, ccs: f64, ccs_type: &str, src_tag: &str) -> String {
    let key = format!("{name}{adduct}{}{ccs_type}{src_tag}", float_text(ccs));
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());
    let tail = &hash_hex[hash_hex.len() - GLOBAL_ID_HEX_LEN..];
    format!("{GLOBAL_ID_PREFIX}{}", tail.to_uppercase())
}

/// Shortest round-trip text for a float, always with a fractional part or an
/// exponent (`150.0`, `0.0001`, `1e-05`, `1.5e+16`).
pub fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{value:e}");
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }
    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

/// Identities already written during one ingestion call.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id`; returns `false` when it was already seen.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_ids() {
        assert_eq!(
            global_id("Caffeine", "[M+H]+", 138.0, "A", "T"),
            "CCSBASE_399731B8BB"
        );
        assert_eq!(
            global_id("Caffeine", "[M+H]+", 138.2, "DT", "zhou1016"),
            "CCSBASE_964D04FD0F"
        );
    }

    #[test]
    fn id_is_deterministic() {
        let first = global_id("Glucose", "[M+Na]+", 150.25, "TW", "hine1217");
        let second = global_id("Glucose", "[M+Na]+", 150.25, "TW", "hine1217");
        assert_eq!(first, second);
        assert!(first.starts_with(GLOBAL_ID_PREFIX));
        assert_eq!(first.len(), GLOBAL_ID_PREFIX.len() + 10);
        assert!(
            first[GLOBAL_ID_PREFIX.len()..]
                .chars()
                .all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase())
        );
    }

    #[test]
    fn undelimited_fields_collide() {
        assert_eq!(
            global_id("AB", "C", 1.5, "x", "y"),
            global_id("A", "BC", 1.5, "x", "y")
        );
    }

    #[test]
    fn float_text_keeps_fraction() {
        assert_eq!(float_text(138.0), "138.0");
        assert_eq!(float_text(123.456), "123.456");
        assert_eq!(float_text(0.0001), "0.0001");
        assert_eq!(float_text(0.0), "0.0");
        assert_eq!(float_text(-2.0), "-2.0");
    }

    #[test]
    fn float_text_exponents() {
        assert_eq!(float_text(1e-5), "1e-05");
        assert_eq!(float_text(1e16), "1e+16");
        assert_eq!(float_text(1.5e16), "1.5e+16");
    }

    #[test]
    fn seen_ids_reject_repeats() {
        let mut seen = SeenIds::new();
        assert!(seen.insert("CCSBASE_A"));
        assert!(!seen.insert("CCSBASE_A"));
        assert!(seen.insert("CCSBASE_B"));
        assert!(!seen.insert("CCSBASE_B"));
    }
}
