//! Loading planning datasets into the warehouse.
//!
//! A dataset carries dimension records and monthly plans. Each plan is
//! expanded into one fact row per company it is split across.

pub mod distribution;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::date_util::quarter_of_month;
use crate::error::{Error, Result};
use crate::pivot::types::FactRow;
use crate::storage::repository;
use crate::storage::Database;

use distribution::{distribute_hours, split_count, DistributionKind, Infra};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub companies: Vec<CompanyRecord>,
    pub departments: Vec<NamedRecord>,
    pub processes: Vec<NamedRecord>,
    pub measures: Vec<MeasureRecord>,
    pub users: Vec<UserRecord>,
    pub plans: Vec<MonthlyPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rate_per_hour: f64,
    #[serde(default)]
    pub servers_count: u32,
    #[serde(default)]
    pub workstations_count: u32,
}

/// Id and display name; used for departments and processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub process_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

/// One user's plan for one measure and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPlan {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub measure_id: Option<String>,
    pub year: i32,
    pub month: u8,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub planned_hours: f64,
    #[serde(default)]
    pub tasks_count: u64,
    pub company_ids: Vec<String>,
    #[serde(default)]
    pub distribution_type: DistributionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub companies: usize,
    pub departments: usize,
    pub processes: usize,
    pub measures: usize,
    pub users: usize,
    pub plans: usize,
    pub facts: usize,
    /// Plans with an empty company list; they produce no facts.
    pub skipped_plans: usize,
}

impl Dataset {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Import(format!("invalid dataset: {e}")))
    }

    /// Structural checks run before anything is written.
    pub fn validate(&self) -> Result<()> {
        let mut plan_ids = HashSet::new();
        for plan in &self.plans {
            let ctx = |msg: &str| Error::Import(format!("plan {}: {msg}", plan.id));
            if plan.id.is_empty() {
                return Err(Error::Import("plan with empty id".into()));
            }
            if !plan_ids.insert(plan.id.as_str()) {
                return Err(ctx("duplicate plan id"));
            }
            if plan.user_id.is_empty() {
                return Err(ctx("missing user_id"));
            }
            if !(1..=12).contains(&plan.month) {
                return Err(ctx(&format!("month must be 1-12, got {}", plan.month)));
            }
            for (name, value) in [("actual_hours", plan.actual_hours), ("planned_hours", plan.planned_hours)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(ctx(&format!("{name} must be a non-negative number")));
                }
            }
            let mut seen = HashSet::new();
            if let Some(dup) = plan.company_ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(ctx(&format!("company {dup} listed twice")));
            }
        }
        for company in &self.companies {
            if !company.rate_per_hour.is_finite() || company.rate_per_hour < 0.0 {
                return Err(Error::Import(format!(
                    "company {}: rate_per_hour must be a non-negative number",
                    company.id
                )));
            }
        }
        Ok(())
    }
}

/// Expand one plan into fact rows using the companies' infrastructure.
/// Hours, planned hours and tasks are split by the same fractions.
pub fn expand_plan(plan: &MonthlyPlan, infra: &HashMap<String, Infra>) -> Vec<FactRow> {
    let kind = plan.distribution_type;
    let hours = distribute_hours(plan.actual_hours, &plan.company_ids, infra, kind);
    let planned = distribute_hours(plan.planned_hours, &plan.company_ids, infra, kind);
    let tasks = split_count(plan.tasks_count, &hours);

    hours
        .into_iter()
        .zip(planned)
        .zip(tasks)
        .map(|((h, p), tasks_count)| {
            let rate_per_hour = infra.get(&h.company_id).map_or(0.0, |i| i.rate_per_hour);
            FactRow {
                company_id: h.company_id,
                user_id: plan.user_id.clone(),
                measure_id: plan.measure_id.clone(),
                year: plan.year,
                month: plan.month,
                quarter: quarter_of_month(plan.month),
                distributed_hours: h.hours,
                tasks_count,
                planned_hours_share: p.hours,
                rate_per_hour,
            }
        })
        .collect()
}

/// Validate and load a dataset in one transaction. Dimensions are upserted
/// first, so plans see the rates and infrastructure counts of the same
/// dataset. Re-importing a plan id replaces its fact rows.
pub async fn load_dataset(db: &Database, dataset: Dataset) -> Result<ImportReport> {
    dataset.validate()?;

    let report = db
        .writer()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut report = ImportReport {
                companies: dataset.companies.len(),
                departments: dataset.departments.len(),
                processes: dataset.processes.len(),
                measures: dataset.measures.len(),
                users: dataset.users.len(),
                ..ImportReport::default()
            };

            for c in &dataset.companies {
                repository::upsert_company(&tx, c)?;
            }
            for d in &dataset.departments {
                repository::upsert_department(&tx, d)?;
            }
            for p in &dataset.processes {
                repository::upsert_process(&tx, p)?;
            }
            for m in &dataset.measures {
                repository::upsert_measure(&tx, m)?;
            }
            for u in &dataset.users {
                repository::upsert_user(&tx, u)?;
            }

            let mut company_ids: Vec<String> = dataset
                .plans
                .iter()
                .flat_map(|p| p.company_ids.iter().cloned())
                .collect();
            company_ids.sort();
            company_ids.dedup();
            let infra = repository::get_company_infra(&tx, &company_ids)?;

            for plan in &dataset.plans {
                if plan.company_ids.is_empty() {
                    log::warn!("plan {} has no companies, skipping", plan.id);
                    report.skipped_plans += 1;
                }
                let facts = expand_plan(plan, &infra);
                report.facts += repository::replace_plan_facts(&tx, &plan.id, &facts)?;
                report.plans += 1;
            }

            tx.commit()?;
            Ok::<_, rusqlite::Error>(report)
        })
        .await?;

    log::info!(
        "imported {} plans into {} fact rows ({} companies, {} users, {} measures)",
        report.plans,
        report.facts,
        report.companies,
        report.users,
        report.measures
    );
    Ok(report)
}
