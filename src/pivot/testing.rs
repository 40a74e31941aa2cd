//! In-memory `PivotSource` used by the engine's unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::date_util::quarter_of_month;
use crate::error::{Error, Result};
use crate::pivot::source::PivotSource;
use crate::pivot::types::{FactRow, Measure, User};
use crate::query::builder::FactQuery;

pub fn fact(user: &str, company: &str, measure: Option<&str>, month: u8, hours: f64) -> FactRow {
    fact_full(user, company, measure, month, hours, 1, hours, 0.0)
}

#[allow(clippy::too_many_arguments)]
pub fn fact_full(
    user: &str,
    company: &str,
    measure: Option<&str>,
    month: u8,
    hours: f64,
    tasks: u64,
    planned: f64,
    rate: f64,
) -> FactRow {
    FactRow {
        company_id: company.to_string(),
        user_id: user.to_string(),
        measure_id: measure.map(str::to_string),
        year: 2025,
        month,
        quarter: quarter_of_month(month),
        distributed_hours: hours,
        tasks_count: tasks,
        planned_hours_share: planned,
        rate_per_hour: rate,
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub facts: Vec<FactRow>,
    pub measures: HashMap<String, Measure>,
    pub processes: HashMap<String, String>,
    pub users: HashMap<String, User>,
    pub departments: HashMap<String, String>,
    pub companies: HashMap<String, String>,
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<(&'static str, Vec<String>)>>,
}

impl FakeSource {
    /// Lookup tables shared by most tests:
    /// - c1 Acme, c2 Globex
    /// - m1 Helpdesk (strategic, p1 Support), m2 Audit (no category, no process)
    /// - u1 → d1 IT, u2 → d2 Finance, u3 without department
    pub fn sample() -> Self {
        let mut s = Self::default();
        s.companies.insert("c1".into(), "Acme".into());
        s.companies.insert("c2".into(), "Globex".into());
        s.measures.insert(
            "m1".into(),
            Measure {
                name: "Helpdesk".into(),
                category: Some("strategic".into()),
                process_id: Some("p1".into()),
            },
        );
        s.measures.insert(
            "m2".into(),
            Measure {
                name: "Audit".into(),
                category: None,
                process_id: None,
            },
        );
        s.processes.insert("p1".into(), "Support".into());
        for (id, name, dept) in [
            ("u1", "Ivan Petrov", Some("d1")),
            ("u2", "Anna Smirnova", Some("d2")),
            ("u3", "Oleg Ivanov", None),
        ] {
            s.users.insert(
                id.into(),
                User {
                    full_name: Some(name.into()),
                    department_id: dept.map(str::to_string),
                },
            );
        }
        s.departments.insert("d1".into(), "IT".into());
        s.departments.insert("d2".into(), "Finance".into());
        s
    }

    pub fn with_facts(mut self, facts: Vec<FactRow>) -> Self {
        self.facts = facts;
        self
    }

    pub fn failing_on(mut self, table: &'static str) -> Self {
        self.fail_on = Some(table);
        self
    }

    /// Names of the fetches issued, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    /// Ids passed to the given lookup, across all of its calls.
    pub fn requested(&self, table: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == table)
            .flat_map(|(_, ids)| ids.clone())
            .collect()
    }

    fn record(&self, table: &'static str, ids: &[String]) -> Result<()> {
        self.calls.lock().unwrap().push((table, ids.to_vec()));
        if self.fail_on == Some(table) {
            return Err(Error::Database(format!("{table}: connection reset")));
        }
        Ok(())
    }

    fn pick<T: Clone>(map: &HashMap<String, T>, ids: &[String]) -> HashMap<String, T> {
        ids.iter()
            .filter_map(|id| map.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }
}

impl PivotSource for FakeSource {
    async fn fetch_facts(&self, query: &FactQuery) -> Result<Vec<FactRow>> {
        self.record("facts", &[])?;
        let allowed = |ids: &[String], id: Option<&str>| {
            ids.is_empty() || id.is_some_and(|id| ids.iter().any(|i| i == id))
        };
        Ok(self
            .facts
            .iter()
            .filter(|f| f.year == query.year() && query.months().contains(&f.month))
            .filter(|f| allowed(query.company_ids(), Some(&f.company_id)))
            .filter(|f| allowed(query.user_ids(), Some(&f.user_id)))
            .filter(|f| allowed(query.measure_ids(), f.measure_id.as_deref()))
            .cloned()
            .collect())
    }

    async fn fetch_measures(&self, ids: &[String]) -> Result<HashMap<String, Measure>> {
        self.record("measures", ids)?;
        Ok(Self::pick(&self.measures, ids))
    }

    async fn fetch_processes(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.record("processes", ids)?;
        Ok(Self::pick(&self.processes, ids))
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<HashMap<String, User>> {
        self.record("users", ids)?;
        Ok(Self::pick(&self.users, ids))
    }

    async fn fetch_departments(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.record("departments", ids)?;
        Ok(Self::pick(&self.departments, ids))
    }

    async fn fetch_companies(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.record("companies", ids)?;
        Ok(Self::pick(&self.companies, ids))
    }
}
