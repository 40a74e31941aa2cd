use crate::pivot::lookup::Lookups;
use crate::pivot::types::{Category, Dimension, FactRow, PivotDimension};

/// Id used when a dimension cannot be resolved for a row.
pub const UNKNOWN_ID: &str = "unknown";

pub const NO_COMPANY: &str = "Без названия";
pub const NO_DEPARTMENT: &str = "Без отдела";
pub const UNKNOWN_EMPLOYEE: &str = "Неизвестно";
pub const NO_PROCESS: &str = "Без процесса";
pub const NO_MEASURE: &str = "Без мероприятия";

/// The row's dimension tuple, in `group_by` order.
pub fn dimensions_for(row: &FactRow, group_by: &[Dimension], lookups: &Lookups) -> Vec<PivotDimension> {
    group_by
        .iter()
        .map(|dim| describe(*dim, row, lookups))
        .collect()
}

/// Resolve one dimension of a row to its id and display name. Unresolvable
/// ids fall back to sentinels; two-hop dimensions stop at the first hop
/// when it yields nothing.
pub fn describe(dim: Dimension, row: &FactRow, lookups: &Lookups) -> PivotDimension {
    let (id, name) = match dim {
        Dimension::Company => (
            row.company_id.as_str(),
            lookups.company_name(row).unwrap_or(NO_COMPANY),
        ),
        Dimension::Department => match lookups.department_id(row) {
            Some(id) => (id, lookups.department_name(id).unwrap_or(NO_DEPARTMENT)),
            None => (UNKNOWN_ID, NO_DEPARTMENT),
        },
        Dimension::Employee => (
            row.user_id.as_str(),
            lookups.employee_name(row).unwrap_or(UNKNOWN_EMPLOYEE),
        ),
        Dimension::Process => match lookups.process_id(row) {
            Some(id) => (id, lookups.process_name(id).unwrap_or(NO_PROCESS)),
            None => (UNKNOWN_ID, NO_PROCESS),
        },
        Dimension::Measure => (
            row.measure_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .unwrap_or(UNKNOWN_ID),
            lookups.measure_name(row).unwrap_or(NO_MEASURE),
        ),
        Dimension::Category => {
            let id = lookups.category(row);
            (id, Category::parse(id).map(|c| c.label()).unwrap_or(id))
        }
    };
    PivotDimension {
        id: id.to_string(),
        name: name.to_string(),
        dim_type: dim,
    }
}

/// Composite key of a dimension tuple. Each id is length-prefixed, so no
/// id content can make two different tuples produce the same key.
pub fn group_key(dims: &[PivotDimension]) -> String {
    let mut key = String::new();
    for dim in dims {
        key.push_str(&dim.id.len().to_string());
        key.push(':');
        key.push_str(&dim.id);
    }
    key
}
