use sage_core::ConstantRecord;

use crate::table::{format_constant, ConstantsTable};

// Scanned in order. The single-letter symbols ("c", "g") are substring
// matches against the whole lowercased query and can fire on unrelated
// words; accepted precision trade-off.
pub const CONSTANT_KEYWORDS: &[(&str, &str)] = &[
    ("speed of light", "speed_of_light"),
    ("light speed", "speed_of_light"),
    ("c", "speed_of_light"),
    ("gravitational constant", "gravitational_constant"),
    ("gravity constant", "gravitational_constant"),
    ("g", "gravitational_constant"),
    ("planck", "planck_constant"),
    ("avogadro", "avogadro_number"),
    ("boltzmann", "boltzmann_constant"),
    ("elementary charge", "elementary_charge"),
    ("electron mass", "electron_mass"),
    ("proton mass", "proton_mass"),
];

#[derive(Debug, Clone)]
pub struct ScannedConstant {
    pub name: String,
    pub record: ConstantRecord,
    pub formatted: String,
}

/// Each canonical constant is reported at most once, in keyword-map order.
pub fn scan_for_constants(query: &str, table: &ConstantsTable) -> Vec<ScannedConstant> {
    let lower = query.to_lowercase();
    let mut found: Vec<ScannedConstant> = Vec::new();

    for (keyword, canonical) in CONSTANT_KEYWORDS {
        if !lower.contains(keyword) {
            continue;
        }
        if found.iter().any(|scanned| scanned.name == *canonical) {
            continue;
        }
        if let Some(record) = table.get(canonical) {
            found.push(ScannedConstant {
                name: (*canonical).to_string(),
                record: record.clone(),
                formatted: format_constant(canonical, record),
            });
        }
    }

    found
}
