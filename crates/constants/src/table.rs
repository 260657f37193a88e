use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use sage_core::ConstantRecord;

/// Read-only table keyed by canonical lowercase-underscore name; built once
/// at process start, injected, never mutated.
#[derive(Debug, Clone)]
pub struct ConstantsTable {
    records: HashMap<String, ConstantRecord>,
}

impl ConstantsTable {
    pub fn builtin() -> Self {
        let mut records = HashMap::new();
        for (name, value, unit, symbol) in [
            ("speed_of_light", 299_792_458.0, "m/s", "c"),
            ("gravitational_constant", 6.674_30e-11, "m³/kg⋅s²", "G"),
            ("planck_constant", 6.626_070_15e-34, "J⋅s", "h"),
            ("avogadro_number", 6.022_140_76e23, "mol⁻¹", "Nₐ"),
            ("boltzmann_constant", 1.380_649e-23, "J/K", "k"),
            ("elementary_charge", 1.602_176_634e-19, "C", "e"),
            ("electron_mass", 9.109_383_701_5e-31, "kg", "mₑ"),
            ("proton_mass", 1.672_621_923_69e-27, "kg", "mₚ"),
        ] {
            records.insert(
                name.to_string(),
                ConstantRecord {
                    value,
                    unit: unit.to_string(),
                    symbol: symbol.to_string(),
                },
            );
        }

        Self { records }
    }

    /// JSON object of canonical name to record, replacing the builtin set.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading constants file: {}", path.display()))?;
        let records: HashMap<String, ConstantRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing constants file: {}", path.display()))?;

        Ok(Self { records })
    }

    /// Exact lookup after canonicalizing case and spaces.
    pub fn get(&self, name: &str) -> Option<&ConstantRecord> {
        let canonical = name.trim().to_lowercase().replace(' ', "_");
        self.records.get(&canonical)
    }

    /// Constants whose name or symbol contains the keyword.
    pub fn search(&self, keyword: &str) -> Vec<(String, ConstantRecord)> {
        let keyword = keyword.to_lowercase();

        let mut matches = self
            .records
            .iter()
            .filter(|(name, record)| {
                name.contains(&keyword) || record.symbol.to_lowercase().contains(&keyword)
            })
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect::<Vec<_>>();

        matches.sort_by(|(a, _), (b, _)| a.cmp(b));
        matches
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.records.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `speed_of_light` -> `Speed Of Light: 299792458 m/s (Symbol: c)`.
pub fn format_constant(name: &str, record: &ConstantRecord) -> String {
    let title = name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{title}: {} {} (Symbol: {})",
        format_value(record.value),
        record.unit,
        record.symbol
    )
}

/// Integral magnitudes print plainly, everything else in scientific
/// notation.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_canonicalized() {
        let table = ConstantsTable::builtin();
        assert!(table.get("Speed of Light").is_some());
        assert!(table.get("speed_of_light").is_some());
        assert!(table.get("warp_factor").is_none());
    }

    #[test]
    fn formats_speed_of_light() {
        let table = ConstantsTable::builtin();
        let record = table.get("speed_of_light").unwrap();
        assert_eq!(
            format_constant("speed_of_light", record),
            "Speed Of Light: 299792458 m/s (Symbol: c)"
        );
    }

    #[test]
    fn search_matches_symbols() {
        let table = ConstantsTable::builtin();
        let matches = table.search("g");
        assert!(matches
            .iter()
            .any(|(name, _)| name == "gravitational_constant"));
    }
}
