//! Merging harness results into the scenario document.

use serde_json::{Map, Value};

/// Key holding the harness results payload in an output document.
pub const RESULTS_KEY: &str = "results";
/// Key holding the number of linearizations in an output document.
pub const COUNT_KEY: &str = "linearizations";

/// Combine a scenario document with its harness results.
///
/// The output is `original` with [`RESULTS_KEY`] and [`COUNT_KEY`] set;
/// existing keys of those names are overwritten in place and every other key
/// keeps its position.
pub fn merge_results(
    original: &Map<String, Value>,
    results: Value,
    count: usize,
) -> Map<String, Value> {
    let mut merged = original.clone();
    merged.insert(RESULTS_KEY.into(), results);
    merged.insert(COUNT_KEY.into(), Value::from(count));
    merged
}
