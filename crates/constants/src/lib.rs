mod scan;
mod table;

pub use scan::{scan_for_constants, ScannedConstant, CONSTANT_KEYWORDS};
pub use table::{format_constant, format_value, ConstantsTable};
