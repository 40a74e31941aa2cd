use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::period::ReportPeriod;

/// A grouping axis for pivot rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Company,
    Department,
    Employee,
    Process,
    Measure,
    Category,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Company,
        Dimension::Department,
        Dimension::Employee,
        Dimension::Process,
        Dimension::Measure,
        Dimension::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Company => "company",
            Dimension::Department => "department",
            Dimension::Employee => "employee",
            Dimension::Process => "process",
            Dimension::Measure => "measure",
            Dimension::Category => "category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

/// The single quantity projected into every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Hours,
    Tasks,
    Planned,
    Cost,
    /// Delivered hours as a percentage of planned hours.
    Kpi,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Hours => "hours",
            Metric::Tasks => "tasks",
            Metric::Planned => "planned",
            Metric::Cost => "cost",
            Metric::Kpi => "kpi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hours" => Some(Metric::Hours),
            "tasks" => Some(Metric::Tasks),
            "planned" => Some(Metric::Planned),
            "cost" => Some(Metric::Cost),
            "kpi" => Some(Metric::Kpi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Month,
    Quarter,
    Year,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Month => "month",
            PeriodType::Quarter => "quarter",
            PeriodType::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "month" => Some(PeriodType::Month),
            "quarter" => Some(PeriodType::Quarter),
            "year" => Some(PeriodType::Year),
            _ => None,
        }
    }
}

/// Column granularity of the pivot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrain {
    Month,
    Quarter,
}

impl TimeGrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGrain::Month => "month",
            TimeGrain::Quarter => "quarter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "month" => Some(TimeGrain::Month),
            "quarter" => Some(TimeGrain::Quarter),
            _ => None,
        }
    }
}

/// Measure categories. Measures without a category count as operational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Strategic,
    Process,
    Operational,
}

impl Category {
    pub const DEFAULT_ID: &'static str = "operational";

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strategic" => Some(Category::Strategic),
            "process" => Some(Category::Process),
            "operational" => Some(Category::Operational),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Strategic => "Стратегические",
            Category::Process => "Процессные",
            Category::Operational => "Оперативные",
        }
    }
}

/// Filters applied to fact rows. Empty lists are inactive.
///
/// `company_id`, `user_id` and `measure_id` are pushed down to the fact
/// source; the rest need a lookup hop and are applied in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotFilters {
    pub company_id: Vec<String>,
    pub user_id: Vec<String>,
    pub measure_id: Vec<String>,
    pub department_id: Vec<String>,
    pub process_id: Vec<String>,
    pub category: Vec<String>,
}

impl PivotFilters {
    pub fn has_lookup_filters(&self) -> bool {
        !self.department_id.is_empty() || !self.process_id.is_empty() || !self.category.is_empty()
    }
}

/// A validated pivot request.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRequest {
    pub period: ReportPeriod,
    /// Non-empty, without duplicates, in output order.
    pub group_by: Vec<Dimension>,
    pub time_grain: TimeGrain,
    pub metric: Metric,
    pub filters: PivotFilters,
}

/// One user × company × measure × month hour allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub company_id: String,
    pub user_id: String,
    pub measure_id: Option<String>,
    pub year: i32,
    pub month: u8,
    pub quarter: u8,
    pub distributed_hours: f64,
    pub tasks_count: u64,
    pub planned_hours_share: f64,
    pub rate_per_hour: f64,
}

// ── Lookup entities ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub name: String,
    pub category: Option<String>,
    pub process_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub full_name: Option<String>,
    pub department_id: Option<String>,
}

// ── Response ───────────────────────────────────────────────────────

/// A column of the output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    /// `"2025-01"` or `"2025-Q1"`.
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotDimension {
    pub id: String,
    pub name: String,
    pub dim_type: Dimension,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub dimensions: Vec<PivotDimension>,
    pub buckets: BTreeMap<String, f64>,
    pub total: f64,
    pub planned_total: f64,
    /// Raw planned hours per bucket, only for the KPI metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_buckets: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotMeta {
    pub year: i32,
    pub period_type: PeriodType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_value: Option<u8>,
    pub group_by: Vec<Dimension>,
    pub time_grain: TimeGrain,
    pub metric: Metric,
    pub time_buckets: Vec<TimeBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotStats {
    pub total_hours: f64,
    pub total_tasks: u64,
    pub planned_hours: f64,
    pub companies_count: usize,
    pub employees_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResponse {
    pub meta: PivotMeta,
    pub stats: PivotStats,
    pub rows: Vec<PivotRow>,
    pub column_totals: BTreeMap<String, f64>,
    pub grand_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_parse_roundtrip() {
        for d in Dimension::ALL {
            assert_eq!(Dimension::parse(d.as_str()), Some(d));
        }
        assert_eq!(Dimension::parse("Company"), None);
        assert_eq!(Dimension::parse(""), None);
    }

    #[test]
    fn test_enum_parse_rejects_unknown() {
        assert_eq!(Metric::parse("kpi"), Some(Metric::Kpi));
        assert_eq!(Metric::parse("revenue"), None);
        assert_eq!(PeriodType::parse("week"), None);
        assert_eq!(TimeGrain::parse("year"), None);
    }

    #[test]
    fn test_filters_deserialize_partial() {
        let f: PivotFilters = serde_json::from_str(r#"{"department_id": ["d1"]}"#).unwrap();
        assert_eq!(f.department_id, vec!["d1".to_string()]);
        assert!(f.company_id.is_empty());
        assert!(f.has_lookup_filters());
        assert!(!PivotFilters::default().has_lookup_filters());
    }

    #[test]
    fn test_dimension_serializes_lowercase() {
        let dim = PivotDimension {
            id: "c1".into(),
            name: "Acme".into(),
            dim_type: Dimension::Company,
        };
        let json = serde_json::to_value(&dim).unwrap();
        assert_eq!(json["dimType"], "company");
    }
}
