use std::collections::{BTreeMap, HashMap, HashSet};

use crate::pivot::keyer::{dimensions_for, group_key};
use crate::pivot::lookup::Lookups;
use crate::pivot::types::{Dimension, FactRow, PivotDimension, TimeGrain};
use crate::query::period::bucket_key;

/// Raw sums for one cell (or one group total).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sums {
    pub hours: f64,
    pub tasks: u64,
    pub planned: f64,
    /// Sum of per-row `hours × rate`.
    pub cost: f64,
}

impl Sums {
    pub fn add_row(&mut self, row: &FactRow) {
        self.hours += row.distributed_hours;
        self.tasks += row.tasks_count;
        self.planned += row.planned_hours_share;
        self.cost += row.distributed_hours * row.rate_per_hour;
    }

    pub fn merge(&mut self, other: &Sums) {
        self.hours += other.hours;
        self.tasks += other.tasks;
        self.planned += other.planned;
        self.cost += other.cost;
    }
}

/// Accumulated sums for one dimension tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAccumulator {
    pub dimensions: Vec<PivotDimension>,
    pub buckets: HashMap<String, Sums>,
    pub total: Sums,
}

impl GroupAccumulator {
    fn new(dimensions: Vec<PivotDimension>) -> Self {
        Self {
            dimensions,
            buckets: HashMap::new(),
            total: Sums::default(),
        }
    }

    pub fn bucket(&self, key: &str) -> Sums {
        self.buckets.get(key).copied().unwrap_or_default()
    }

    fn merge(&mut self, other: GroupAccumulator) {
        for (key, sums) in other.buckets {
            self.buckets.entry(key).or_default().merge(&sums);
        }
        self.total.merge(&other.total);
    }
}

/// Grouping-independent totals over every aggregated row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStats {
    pub total_hours: f64,
    pub total_tasks: u64,
    pub total_planned: f64,
    pub companies: HashSet<String>,
    pub employees: HashSet<String>,
}

impl RunningStats {
    fn add_row(&mut self, row: &FactRow) {
        self.total_hours += row.distributed_hours;
        self.total_tasks += row.tasks_count;
        self.total_planned += row.planned_hours_share;
        if !self.companies.contains(&row.company_id) {
            self.companies.insert(row.company_id.clone());
        }
        if !self.employees.contains(&row.user_id) {
            self.employees.insert(row.user_id.clone());
        }
    }

    fn merge(&mut self, other: RunningStats) {
        self.total_hours += other.total_hours;
        self.total_tasks += other.total_tasks;
        self.total_planned += other.total_planned;
        self.companies.extend(other.companies);
        self.employees.extend(other.employees);
    }
}

/// Result of one aggregation pass. Groups are keyed by their composite
/// group key, so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub groups: BTreeMap<String, GroupAccumulator>,
    pub stats: RunningStats,
}

impl Aggregation {
    /// Fold rows into per-group, per-bucket sums.
    pub fn collect(
        rows: &[FactRow],
        year: i32,
        group_by: &[Dimension],
        grain: TimeGrain,
        lookups: &Lookups,
    ) -> Self {
        let mut agg = Self::default();
        for row in rows {
            agg.add(row, year, group_by, grain, lookups);
        }
        log::debug!("aggregated {} rows into {} groups", rows.len(), agg.groups.len());
        agg
    }

    pub fn add(
        &mut self,
        row: &FactRow,
        year: i32,
        group_by: &[Dimension],
        grain: TimeGrain,
        lookups: &Lookups,
    ) {
        self.stats.add_row(row);

        let dims = dimensions_for(row, group_by, lookups);
        let key = group_key(&dims);
        let bucket = bucket_key(year, grain, row.month);

        let entry = self
            .groups
            .entry(key)
            .or_insert_with(|| GroupAccumulator::new(dims));
        entry.buckets.entry(bucket).or_default().add_row(row);
        entry.total.add_row(row);
    }

    /// Combine with an aggregation computed over a disjoint set of rows.
    /// Groups present in both are merged per key.
    pub fn merge(&mut self, other: Aggregation) {
        for (key, group) in other.groups {
            match self.groups.get_mut(&key) {
                Some(existing) => existing.merge(group),
                None => {
                    self.groups.insert(key, group);
                }
            }
        }
        self.stats.merge(other.stats);
    }
}
