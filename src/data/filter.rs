use super::model::{CategoryTable, PointRecord};
use crate::hypsometry::overlap::OverlapRange;

// ---------------------------------------------------------------------------
// Elevation-range selection
// ---------------------------------------------------------------------------

/// Return indices of records whose elevation lies inside `range`.
///
/// A record passes when:
/// * its elevation is not the missing marker (`0.0`), and
/// * `range.min_elevation() <= elevation <= range.max_elevation()`
pub fn filtered_indices(table: &CategoryTable, range: &OverlapRange) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.elevation_missing() && range.contains(r.elevation))
        .map(|(i, _)| i)
        .collect()
}

/// Copy out the records of `table` that fall inside `range`, in table order.
pub fn select_in_range(table: &CategoryTable, range: &OverlapRange) -> Vec<PointRecord> {
    filtered_indices(table, range)
        .into_iter()
        .map(|i| table.records[i])
        .collect()
}
