use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::pivot::source::PivotSource;
use crate::pivot::types::{Category, Dimension, FactRow, Measure, PivotFilters, User};
use crate::pivot::upstream_failure;

/// Which lookup tables a request needs, decided before any fetch.
///
/// A request grouped only by company with no lookup filters needs neither
/// measures nor users, and must not fetch them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupRequirements {
    pub measures: bool,
    pub processes: bool,
    pub users: bool,
    pub departments: bool,
    pub companies: bool,
}

impl LookupRequirements {
    pub fn for_request(group_by: &[Dimension], filters: &PivotFilters) -> Self {
        let mut req = Self::default();
        for dim in group_by {
            match dim {
                Dimension::Company => req.companies = true,
                Dimension::Employee => req.users = true,
                Dimension::Department => {
                    req.users = true;
                    req.departments = true;
                }
                Dimension::Measure | Dimension::Category => req.measures = true,
                Dimension::Process => {
                    req.measures = true;
                    req.processes = true;
                }
            }
        }
        // Filters only need the first hop: ids, not names
        if !filters.department_id.is_empty() {
            req.users = true;
        }
        if !filters.process_id.is_empty() || !filters.category.is_empty() {
            req.measures = true;
        }
        req
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Resolved lookup maps for one request. Maps that were not required stay
/// empty.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub measures: HashMap<String, Measure>,
    pub processes: HashMap<String, String>,
    pub users: HashMap<String, User>,
    pub departments: HashMap<String, String>,
    pub companies: HashMap<String, String>,
}

impl Lookups {
    /// Fetch the required lookups for the ids present in `facts`.
    ///
    /// The measure → process and user → department chains run
    /// concurrently with each other and with the company fetch; within a
    /// chain the second hop waits for the first.
    pub async fn resolve<S: PivotSource>(
        source: &S,
        req: &LookupRequirements,
        facts: &[FactRow],
    ) -> Result<Self> {
        if req.is_empty() {
            return Ok(Self::default());
        }
        let ((measures, processes), (users, departments), companies) = tokio::try_join!(
            load_measures(source, req, facts),
            load_users(source, req, facts),
            load_companies(source, req, facts),
        )?;

        log::debug!(
            "resolved lookups: {} measures, {} processes, {} users, {} departments, {} companies",
            measures.len(),
            processes.len(),
            users.len(),
            departments.len(),
            companies.len()
        );

        Ok(Self {
            measures,
            processes,
            users,
            departments,
            companies,
        })
    }

    pub fn measure(&self, row: &FactRow) -> Option<&Measure> {
        non_empty(row.measure_id.as_deref()).and_then(|id| self.measures.get(id))
    }

    pub fn user(&self, row: &FactRow) -> Option<&User> {
        self.users.get(&row.user_id)
    }

    /// First hop of the measure → process chain.
    pub fn process_id(&self, row: &FactRow) -> Option<&str> {
        self.measure(row).and_then(|m| non_empty(m.process_id.as_deref()))
    }

    pub fn process_name(&self, process_id: &str) -> Option<&str> {
        non_empty(self.processes.get(process_id).map(String::as_str))
    }

    /// First hop of the user → department chain.
    pub fn department_id(&self, row: &FactRow) -> Option<&str> {
        self.user(row).and_then(|u| non_empty(u.department_id.as_deref()))
    }

    pub fn department_name(&self, department_id: &str) -> Option<&str> {
        non_empty(self.departments.get(department_id).map(String::as_str))
    }

    pub fn employee_name(&self, row: &FactRow) -> Option<&str> {
        self.user(row).and_then(|u| non_empty(u.full_name.as_deref()))
    }

    pub fn measure_name(&self, row: &FactRow) -> Option<&str> {
        self.measure(row).and_then(|m| non_empty(Some(m.name.as_str())))
    }

    pub fn company_name(&self, row: &FactRow) -> Option<&str> {
        non_empty(self.companies.get(&row.company_id).map(String::as_str))
    }

    /// The row's measure category, `operational` when absent.
    pub fn category(&self, row: &FactRow) -> &str {
        self.measure(row)
            .and_then(|m| non_empty(m.category.as_deref()))
            .unwrap_or(Category::DEFAULT_ID)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Distinct ids in ascending order.
fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    ids.filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

async fn load_measures<S: PivotSource>(
    source: &S,
    req: &LookupRequirements,
    facts: &[FactRow],
) -> Result<(HashMap<String, Measure>, HashMap<String, String>)> {
    if !req.measures {
        return Ok(Default::default());
    }
    let ids = distinct(facts.iter().filter_map(|r| r.measure_id.as_deref()));
    if ids.is_empty() {
        return Ok(Default::default());
    }
    let measures = source
        .fetch_measures(&ids)
        .await
        .map_err(|e| upstream_failure("measure lookup", e))?;

    if !req.processes {
        return Ok((measures, HashMap::new()));
    }
    let process_ids = distinct(measures.values().filter_map(|m| m.process_id.as_deref()));
    if process_ids.is_empty() {
        return Ok((measures, HashMap::new()));
    }
    let processes = source
        .fetch_processes(&process_ids)
        .await
        .map_err(|e| upstream_failure("process lookup", e))?;
    Ok((measures, processes))
}

async fn load_users<S: PivotSource>(
    source: &S,
    req: &LookupRequirements,
    facts: &[FactRow],
) -> Result<(HashMap<String, User>, HashMap<String, String>)> {
    if !req.users {
        return Ok(Default::default());
    }
    let ids = distinct(facts.iter().map(|r| r.user_id.as_str()));
    if ids.is_empty() {
        return Ok(Default::default());
    }
    let users = source
        .fetch_users(&ids)
        .await
        .map_err(|e| upstream_failure("user lookup", e))?;

    if !req.departments {
        return Ok((users, HashMap::new()));
    }
    let department_ids = distinct(users.values().filter_map(|u| u.department_id.as_deref()));
    if department_ids.is_empty() {
        return Ok((users, HashMap::new()));
    }
    let departments = source
        .fetch_departments(&department_ids)
        .await
        .map_err(|e| upstream_failure("department lookup", e))?;
    Ok((users, departments))
}

async fn load_companies<S: PivotSource>(
    source: &S,
    req: &LookupRequirements,
    facts: &[FactRow],
) -> Result<HashMap<String, String>> {
    if !req.companies {
        return Ok(HashMap::new());
    }
    let ids = distinct(facts.iter().map(|r| r.company_id.as_str()));
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    source
        .fetch_companies(&ids)
        .await
        .map_err(|e| upstream_failure("company lookup", e))
}
