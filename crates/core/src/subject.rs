use crate::models::Subject;

// Math keywords are consulted before physics keywords; first claim wins.
pub const MATH_KEYWORDS: &[&str] = &[
    "calculate",
    "solve",
    "equation",
    "algebra",
    "geometry",
    "trigonometry",
    "calculus",
    "derivative",
    "integral",
    "math",
    "mathematics",
    "number",
    "addition",
    "subtraction",
    "multiplication",
    "division",
    "fraction",
    "percentage",
    "ratio",
    "proportion",
    "polynomial",
    "quadratic",
    "linear",
    "graph",
    "function",
    "variable",
    "coefficient",
];

pub const PHYSICS_KEYWORDS: &[&str] = &[
    "physics",
    "force",
    "energy",
    "motion",
    "velocity",
    "acceleration",
    "newton",
    "gravity",
    "electromagnetic",
    "quantum",
    "thermodynamics",
    "mechanics",
    "optics",
    "waves",
    "electricity",
    "magnetism",
    "momentum",
    "kinetic",
    "potential",
    "work",
    "power",
    "pressure",
    "temperature",
    "heat",
    "light",
    "radiation",
    "atomic",
    "nuclear",
    "relativity",
    "particle",
    "field",
    "circuit",
    "resistance",
    "current",
    "voltage",
    "frequency",
    "wavelength",
    "mass",
    "weight",
];

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Case-insensitive substring membership over a fixed vocabulary.
pub fn matches_keywords(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}

/// Anything outside the three recognized tokens collapses to `General`.
pub fn coerce_subject_token(raw: &str) -> Subject {
    match raw.trim().to_uppercase().as_str() {
        "MATH" => Subject::Math,
        "PHYSICS" => Subject::Physics,
        _ => Subject::General,
    }
}
