mod eval;
mod extract;

pub use eval::{evaluate, EvalError};
pub use extract::extract_expressions;

/// Integral values render without the fractional part: `345`, not `345.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
