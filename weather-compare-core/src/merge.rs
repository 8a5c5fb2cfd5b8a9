use crate::{
    error::MergeError,
    model::{ComparisonRecord, LocationReading, MetricDiffs},
};

/// Combine two readings into one comparison record.
///
/// Columns of each reading are namespaced by its short name, so two readings for cities
/// with the same name cannot share a row.
pub fn merge(
    first: LocationReading,
    second: LocationReading,
) -> Result<ComparisonRecord, MergeError> {
    if first.short_name() == second.short_name() {
        return Err(MergeError::NamingConflict(first.short_name().to_string()));
    }

    let diffs = MetricDiffs::between(&first, &second);

    Ok(ComparisonRecord {
        first,
        second,
        diffs,
    })
}
