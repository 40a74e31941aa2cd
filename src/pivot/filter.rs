use crate::pivot::lookup::Lookups;
use crate::pivot::types::{FactRow, PivotFilters};

/// Drop rows failing any active lookup-dependent filter (department,
/// process, category). Push-down filters are the fact source's job and are
/// not re-checked here.
pub fn apply_filters(rows: Vec<FactRow>, filters: &PivotFilters, lookups: &Lookups) -> Vec<FactRow> {
    if !filters.has_lookup_filters() {
        return rows;
    }
    let before = rows.len();
    let kept: Vec<FactRow> = rows
        .into_iter()
        .filter(|row| matches(row, filters, lookups))
        .collect();
    log::debug!("lookup filters kept {} of {before} fact rows", kept.len());
    kept
}

/// Whether a row passes every active lookup-dependent filter.
///
/// Rows whose user has no department, or whose measure has no process,
/// never match a department or process filter.
pub fn matches(row: &FactRow, filters: &PivotFilters, lookups: &Lookups) -> bool {
    if !filters.department_id.is_empty() {
        match lookups.department_id(row) {
            Some(id) if contains(&filters.department_id, id) => {}
            _ => return false,
        }
    }
    if !filters.process_id.is_empty() {
        match lookups.process_id(row) {
            Some(id) if contains(&filters.process_id, id) => {}
            _ => return false,
        }
    }
    if !filters.category.is_empty() && !contains(&filters.category, lookups.category(row)) {
        return false;
    }
    true
}

fn contains(values: &[String], id: &str) -> bool {
    values.iter().any(|v| v == id)
}
