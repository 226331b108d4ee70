//! Human-readable sizes for storage reports

use byte_unit::{Byte, UnitType};

/// Format a byte count with binary units, e.g. `1.5 KiB`
pub fn human_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.1}")
}

/// Percentage saved going from `before` to `after` bytes.
///
/// Negative when the output grew. An empty input reports no reduction.
pub fn reduction_percent(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) / before as f64 * 100.0
}
