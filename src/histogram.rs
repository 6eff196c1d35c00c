//! Grounded on `histogram.Histogram` in the Python checker's support
//! package (`FromCountDict`, `FromKeyList`, its bar-chart `__str__`).
//! Bar-chart aesthetics are explicitly out of scope, so the exact rendering
//! here is a free choice, but the constructors and the "percentage of total"
//! semantics are kept.

use std::collections::HashMap;
use std::fmt;

const BAR_WIDTH: usize = 40;

#[derive(Clone)]
pub struct Histogram {
    // (label, count), sorted by descending count then label.
    buckets: Vec<(String, u64)>,
    total: u64,
    // Renders a bucket's count (e.g. as a human-readable byte size) without
    // disturbing the bar/percentage math, which stays keyed on the raw u64.
    value_formatter: Option<fn(u64) -> String>,
}

impl Histogram {
    /// Builds a histogram directly from label -> count pairs.
    pub fn from_count_dict(counts: &HashMap<String, u64>) -> Self {
        let mut buckets: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total = buckets.iter().map(|(_, c)| c).sum();
        Histogram { buckets, total, value_formatter: None }
    }

    /// Builds a histogram by counting occurrences in a list of keys.
    pub fn from_key_list(keys: impl IntoIterator<Item = String>) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for key in keys {
            *counts.entry(key).or_insert(0) += 1;
        }
        Self::from_count_dict(&counts)
    }

    /// Builds a histogram of how many block-counter slots hold each value,
    /// e.g. the §4.5 block read/write histograms (bucket label is the write
    /// count, not an operation type).
    pub fn from_counter_values(counters: &[u8]) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for &value in counters {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        Self::from_count_dict(&counts)
    }

    /// Renders each bucket's count through `formatter` for display (bar
    /// length and percentage are still computed from the raw count).
    pub fn with_value_formatter(mut self, formatter: fn(u64) -> String) -> Self {
        self.value_formatter = Some(formatter);
        self
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The distinct bucket labels, in display order. Used by callers that
    /// need to assert the key set itself (e.g. "every block written exactly
    /// once" checks for `{"1"}`).
    pub fn keys(&self) -> Vec<&str> {
        self.buckets.iter().map(|(label, _)| label.as_str()).collect()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.buckets.is_empty() {
            return write!(f, "(empty)");
        }
        let max_count = self.buckets.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);
        let label_width = self.buckets.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        for (index, (label, count)) in self.buckets.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let bar_len = ((*count as f64 / max_count as f64) * BAR_WIDTH as f64).round() as usize;
            let pct = if self.total == 0 { 0.0 } else { *count as f64 * 100.0 / self.total as f64 };
            let value = match self.value_formatter {
                Some(formatter) => formatter(*count),
                None => count.to_string(),
            };
            write!(
                f,
                "{label:label_width$} | {bar:bar_len$} {value} ({pct:.1}%)",
                bar = "*".repeat(bar_len),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_key_list_counts_occurrences() {
        let hist = Histogram::from_key_list(["REPLACE".to_string(), "MOVE".to_string(), "REPLACE".to_string()]);
        assert_eq!(hist.total(), 3);
        let rendered = hist.to_string();
        assert!(rendered.contains("REPLACE"));
        assert!(rendered.contains("MOVE"));
    }

    #[test]
    fn empty_histogram_renders_placeholder() {
        let hist = Histogram::from_count_dict(&HashMap::new());
        assert!(hist.is_empty());
        assert_eq!(hist.to_string(), "(empty)");
    }
}
