pub mod models;
pub mod prompt;
pub mod subject;

pub use models::*;
pub use prompt::{
    apology_reply, classification_prompt, empty_input_reply, general_prompt, math_prompt,
    physics_prompt, strip_marked_region, THINK_END, THINK_START,
};
pub use subject::{
    coerce_subject_token, matches_keywords, normalize_text, MATH_KEYWORDS, PHYSICS_KEYWORDS,
};
