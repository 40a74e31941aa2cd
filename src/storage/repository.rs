use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::date_util::quarter_of_month;
use crate::import::{CompanyRecord, MeasureRecord, NamedRecord, UserRecord};
use crate::import::distribution::Infra;
use crate::pivot::types::{FactRow, Measure, User};
use crate::query::builder::FactQuery;

/// Maximum ids bound per `IN (...)` lookup statement.
const LOOKUP_CHUNK: usize = 500;

// ── Facts ──────────────────────────────────────────────────────────

pub fn query_facts(conn: &Connection, query: &FactQuery) -> Result<Vec<FactRow>, rusqlite::Error> {
    let (sql, params) = query.build_sql();
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        let month: u8 = row.get(4)?;
        Ok(FactRow {
            company_id: row.get(0)?,
            user_id: row.get(1)?,
            measure_id: row.get(2)?,
            year: row.get(3)?,
            month,
            quarter: quarter_of_month(month),
            distributed_hours: row.get(5)?,
            tasks_count: row.get::<_, i64>(6)?.max(0) as u64,
            planned_hours_share: row.get(7)?,
            rate_per_hour: row.get(8)?,
        })
    })?;
    rows.collect()
}

/// Replace every fact row of a monthly plan. Returns the number inserted.
pub fn replace_plan_facts(
    conn: &Connection,
    plan_id: &str,
    facts: &[FactRow],
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM fact_user_company_hours WHERE plan_id = ?1",
        params![plan_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO fact_user_company_hours (
            plan_id, company_id, user_id, measure_id, year, month, quarter,
            distributed_hours, tasks_count, planned_hours_share, rate_per_hour
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for f in facts {
        stmt.execute(params![
            plan_id,
            f.company_id,
            f.user_id,
            f.measure_id,
            f.year,
            f.month,
            f.quarter,
            f.distributed_hours,
            f.tasks_count as i64,
            f.planned_hours_share,
            f.rate_per_hour,
        ])?;
    }
    Ok(facts.len())
}

// ── Companies ──────────────────────────────────────────────────────

pub fn upsert_company(conn: &Connection, company: &CompanyRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_companies (company_id, name, rate_per_hour, servers_count, workstations_count, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(company_id) DO UPDATE SET
            name=excluded.name, rate_per_hour=excluded.rate_per_hour,
            servers_count=excluded.servers_count, workstations_count=excluded.workstations_count,
            cached_at=excluded.cached_at",
        params![
            company.id,
            company.name,
            company.rate_per_hour,
            company.servers_count,
            company.workstations_count,
        ],
    )?;
    Ok(())
}

pub fn get_company_names(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, String>, rusqlite::Error> {
    lookup_in(conn, "SELECT company_id, name FROM dim_companies", "company_id", ids, |row| {
        row.get(1)
    })
}

/// Hourly rate and infrastructure counts, used to split plans into facts.
pub fn get_company_infra(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, Infra>, rusqlite::Error> {
    lookup_in(
        conn,
        "SELECT company_id, rate_per_hour, servers_count, workstations_count FROM dim_companies",
        "company_id",
        ids,
        |row| {
            Ok(Infra {
                rate_per_hour: row.get(1)?,
                servers_count: row.get(2)?,
                workstations_count: row.get(3)?,
            })
        },
    )
}

// ── Departments & Processes ────────────────────────────────────────

pub fn upsert_department(conn: &Connection, dept: &NamedRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_departments (department_id, name, cached_at)
         VALUES (?1, ?2, datetime('now'))",
        params![dept.id, dept.name],
    )?;
    Ok(())
}

pub fn get_department_names(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, String>, rusqlite::Error> {
    lookup_in(
        conn,
        "SELECT department_id, name FROM dim_departments",
        "department_id",
        ids,
        |row| row.get(1),
    )
}

pub fn upsert_process(conn: &Connection, process: &NamedRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_processes (process_id, name, cached_at)
         VALUES (?1, ?2, datetime('now'))",
        params![process.id, process.name],
    )?;
    Ok(())
}

pub fn get_process_names(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, String>, rusqlite::Error> {
    lookup_in(conn, "SELECT process_id, name FROM dim_processes", "process_id", ids, |row| {
        row.get(1)
    })
}

// ── Measures ───────────────────────────────────────────────────────

pub fn upsert_measure(conn: &Connection, measure: &MeasureRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_measures (measure_id, name, category, process_id, cached_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![measure.id, measure.name, measure.category, measure.process_id],
    )?;
    Ok(())
}

pub fn get_measures(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, Measure>, rusqlite::Error> {
    lookup_in(
        conn,
        "SELECT measure_id, name, category, process_id FROM dim_measures",
        "measure_id",
        ids,
        |row| {
            Ok(Measure {
                name: row.get(1)?,
                category: row.get(2)?,
                process_id: row.get(3)?,
            })
        },
    )
}

// ── Users ──────────────────────────────────────────────────────────

pub fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_users (user_id, full_name, department_id, cached_at)
         VALUES (?1, ?2, ?3, datetime('now'))",
        params![user.id, user.full_name, user.department_id],
    )?;
    Ok(())
}

pub fn get_users(conn: &Connection, ids: &[String]) -> Result<HashMap<String, User>, rusqlite::Error> {
    lookup_in(
        conn,
        "SELECT user_id, full_name, department_id FROM dim_users",
        "user_id",
        ids,
        |row| {
            Ok(User {
                full_name: row.get(1)?,
                department_id: row.get(2)?,
            })
        },
    )
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts of the warehouse tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarehouseStatus {
    pub companies: u64,
    pub departments: u64,
    pub processes: u64,
    pub measures: u64,
    pub users: u64,
    pub plans: u64,
    pub facts: u64,
    /// Years present in the fact table, ascending.
    pub years: Vec<i32>,
}

pub fn warehouse_status(conn: &Connection) -> Result<WarehouseStatus, rusqlite::Error> {
    let count = |sql: &str| -> Result<u64, rusqlite::Error> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };
    let mut stmt = conn.prepare("SELECT DISTINCT year FROM fact_user_company_hours ORDER BY year")?;
    let years = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;

    Ok(WarehouseStatus {
        companies: count("SELECT COUNT(*) FROM dim_companies")?,
        departments: count("SELECT COUNT(*) FROM dim_departments")?,
        processes: count("SELECT COUNT(*) FROM dim_processes")?,
        measures: count("SELECT COUNT(*) FROM dim_measures")?,
        users: count("SELECT COUNT(*) FROM dim_users")?,
        plans: count("SELECT COUNT(DISTINCT plan_id) FROM fact_user_company_hours")?,
        facts: count("SELECT COUNT(*) FROM fact_user_company_hours")?,
        years,
    })
}

// ── Helpers ────────────────────────────────────────────────────────

/// Run `select WHERE key_col IN (...)` over `ids` in chunks, keyed by the
/// first column. Ids with no row are simply absent from the result.
fn lookup_in<T>(
    conn: &Connection,
    select: &str,
    key_col: &str,
    ids: &[String],
    map_row: impl Fn(&Row<'_>) -> Result<T, rusqlite::Error>,
) -> Result<HashMap<String, T>, rusqlite::Error> {
    let mut out = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(LOOKUP_CHUNK) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{i}")).collect();
        let sql = format!("{select} WHERE {key_col} IN ({})", placeholders.join(", "));
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            out.insert(id, map_row(row)?);
        }
    }
    Ok(out)
}
