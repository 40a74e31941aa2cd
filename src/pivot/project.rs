use std::collections::BTreeMap;

use crate::date_util::round2;
use crate::pivot::aggregate::{Aggregation, Sums};
use crate::pivot::types::{
    Metric, PivotMeta, PivotRequest, PivotResponse, PivotRow, PivotStats, TimeBucket,
};

/// Project accumulated sums onto the requested metric.
pub fn project(metric: Metric, sums: &Sums) -> f64 {
    match metric {
        Metric::Hours => round2(sums.hours),
        Metric::Tasks => sums.tasks as f64,
        Metric::Planned => round2(sums.planned),
        Metric::Cost => round2(sums.cost),
        Metric::Kpi => {
            if sums.planned > 0.0 {
                round2(sums.hours / sums.planned * 100.0)
            } else {
                0.0
            }
        }
    }
}

/// Build the response from an aggregation.
///
/// Every declared bucket appears in every row, zero when nothing
/// contributed. Column totals add up projected values, so for `kpi` they
/// are sums of per-group percentages. Rows are ordered by total,
/// descending; ties keep group-key order.
pub fn assemble(request: &PivotRequest, buckets: Vec<TimeBucket>, agg: Aggregation) -> PivotResponse {
    let metric = request.metric;
    let mut rows = Vec::with_capacity(agg.groups.len());
    let mut column_totals: BTreeMap<String, f64> = BTreeMap::new();

    for group in agg.groups.into_values() {
        let mut values = BTreeMap::new();
        let mut planned = BTreeMap::new();
        for bucket in &buckets {
            let sums = group.bucket(&bucket.key);
            let value = project(metric, &sums);
            values.insert(bucket.key.clone(), value);
            planned.insert(bucket.key.clone(), round2(sums.planned));
            *column_totals.entry(bucket.key.clone()).or_insert(0.0) += value;
        }

        rows.push(PivotRow {
            dimensions: group.dimensions,
            buckets: values,
            total: project(metric, &group.total),
            planned_total: round2(group.total.planned),
            planned_buckets: (metric == Metric::Kpi).then_some(planned),
        });
    }

    // Stable: equal totals stay in group-key order
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));

    for value in column_totals.values_mut() {
        *value = round2(*value);
    }
    let grand_total = round2(rows.iter().map(|r| r.total).sum());

    let stats = PivotStats {
        total_hours: round2(agg.stats.total_hours),
        total_tasks: agg.stats.total_tasks,
        planned_hours: round2(agg.stats.total_planned),
        companies_count: agg.stats.companies.len(),
        employees_count: agg.stats.employees.len(),
    };

    PivotResponse {
        meta: meta(request, buckets),
        stats,
        rows,
        column_totals,
        grand_total,
    }
}

/// Response for a period with no facts: full scaffolding, zero values.
pub fn empty_response(request: &PivotRequest, buckets: Vec<TimeBucket>) -> PivotResponse {
    PivotResponse {
        meta: meta(request, buckets),
        stats: PivotStats::default(),
        rows: Vec::new(),
        column_totals: BTreeMap::new(),
        grand_total: 0.0,
    }
}

fn meta(request: &PivotRequest, time_buckets: Vec<TimeBucket>) -> PivotMeta {
    PivotMeta {
        year: request.period.year(),
        period_type: request.period.period_type(),
        period_value: request.period.period_value(),
        group_by: request.group_by.clone(),
        time_grain: request.time_grain,
        metric: request.metric,
        time_buckets,
    }
}
