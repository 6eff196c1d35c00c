//! Grounded on `format_utils.BytesToHumanReadable` in the Python checker's
//! support package -- used by the report for sizes and by histogram labels.

const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Renders a byte count with a binary-prefix unit, e.g. `1536` -> `"1.50 KiB"`.
pub fn bytes_to_human_readable(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = UNITS[0];
    for candidate in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = candidate;
    }
    if unit == UNITS[0] {
        format!("{size} {unit}")
    } else {
        format!("{value:.2} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(bytes_to_human_readable(0), "0 B");
        assert_eq!(bytes_to_human_readable(1023), "1023 B");
    }

    #[test]
    fn scales_to_larger_units() {
        assert_eq!(bytes_to_human_readable(1536), "1.50 KiB");
        assert_eq!(bytes_to_human_readable(10 * 1024 * 1024), "10.00 MiB");
    }
}
