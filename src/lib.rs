pub mod config;
pub mod date_util;
pub mod error;
pub mod import;
pub mod pivot;
pub mod query;
pub mod storage;

pub use config::PivotLimits;
pub use error::{Error, Result};
pub use import::{Dataset, ImportReport};
pub use pivot::{
    build_pivot, build_pivot_within, Dimension, Metric, PivotFilters, PivotParams, PivotRequest, PivotResponse,
    PivotSource, TimeGrain,
};
pub use query::builder::FactQuery;
pub use query::period::ReportPeriod;
pub use storage::repository::WarehouseStatus;
pub use storage::Database;

use storage::repository;

/// Main entry point: pivot reports over a local planning warehouse.
pub struct PlanPivot {
    db: Database,
}

impl PlanPivot {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Pivot ──────────────────────────────────────────────────────

    /// Validate raw parameters against the configured limits and build
    /// the report.
    pub async fn pivot(&self, params: &PivotParams) -> Result<PivotResponse> {
        let limits = PivotLimits::load(&self.db)
            .await
            .map_err(|e| match e {
                Error::Config(_) => e,
                e => pivot::upstream_failure("config read", e),
            })?;
        let request = params.validate(&limits)?;
        build_pivot_within(&self.db, &request, &limits).await
    }

    // ── Import ─────────────────────────────────────────────────────

    pub async fn import(&self, dataset: Dataset) -> Result<ImportReport> {
        import::load_dataset(&self.db, dataset).await
    }

    pub async fn import_json(&self, json: &str) -> Result<ImportReport> {
        self.import(Dataset::from_json(json)?).await
    }

    pub async fn status(&self) -> Result<WarehouseStatus> {
        Ok(self
            .db
            .reader()
            .call(|conn| repository::warehouse_status(conn))
            .await?)
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Set a config value. Year limits must parse as integers.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        if (key == config::KEY_MIN_YEAR || key == config::KEY_MAX_YEAR)
            && value.trim().parse::<i32>().is_err()
        {
            return Err(Error::Config(format!("{key} must be a year, got {value:?}")));
        }
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "companies": [
            {"id": "c1", "name": "Acme", "rate_per_hour": 10},
            {"id": "c2", "name": "Globex", "rate_per_hour": 20}
        ],
        "processes": [{"id": "p1", "name": "Support"}],
        "measures": [
            {"id": "m1", "name": "Helpdesk", "category": "strategic", "process_id": "p1"},
            {"id": "m2", "name": "Audit"}
        ],
        "plans": [
            {"id": "a", "user_id": "u1", "measure_id": "m1", "year": 2025, "month": 1,
             "actual_hours": 10, "planned_hours": 8, "tasks_count": 2, "company_ids": ["c1", "c2"]},
            {"id": "b", "user_id": "u2", "measure_id": "m2", "year": 2025, "month": 4,
             "actual_hours": 6, "planned_hours": 6, "tasks_count": 1, "company_ids": ["c2"]}
        ]
    }"#;

    async fn app() -> PlanPivot {
        let app = PlanPivot::new(Database::open_memory().await.unwrap());
        app.import_json(DATASET).await.unwrap();
        app
    }

    #[tokio::test]
    async fn test_pivot_from_raw_params() {
        let app = app().await;
        let params = PivotParams {
            year: Some("2025".into()),
            group_by: Some("process".into()),
            time_grain: Some("quarter".into()),
            metric: Some("cost".into()),
            ..PivotParams::default()
        };

        let resp = app.pivot(&params).await.unwrap();

        assert_eq!(resp.meta.time_buckets.len(), 4);
        assert_eq!(resp.rows.len(), 2);
        // p1: 5h × 10 + 5h × 20; no-process: 6h × 20
        assert_eq!(resp.rows[0].dimensions[0].name, "Support");
        assert_eq!(resp.rows[0].total, 150.0);
        assert_eq!(resp.rows[1].total, 120.0);
        assert_eq!(resp.rows[1].buckets["2025-Q2"], 120.0);
        assert_eq!(resp.grand_total, 270.0);
    }

    #[tokio::test]
    async fn test_pivot_respects_configured_limits() {
        let app = app().await;
        app.config_set(config::KEY_MAX_YEAR, "2024").await.unwrap();
        let params = PivotParams {
            year: Some("2025".into()),
            ..PivotParams::default()
        };
        let err = app.pivot(&params).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field: "year", .. }));
    }

    #[tokio::test]
    async fn test_config_read_failure_is_internal() {
        let app = app().await;
        app.db()
            .writer()
            .call(|conn| conn.execute_batch("DROP TABLE app_config"))
            .await
            .unwrap();

        let err = app.pivot(&PivotParams::default()).await.unwrap_err();
        assert!(matches!(err, Error::Internal));
        assert!(!err.to_string().contains("app_config"));
    }

    #[tokio::test]
    async fn test_config_set_rejects_non_year_limits() {
        let app = app().await;
        assert!(app.config_set(config::KEY_MIN_YEAR, "abc").await.is_err());
        app.config_set("report.title", "Q plan").await.unwrap();
        assert_eq!(app.config_get("report.title").await.unwrap().as_deref(), Some("Q plan"));
        assert_eq!(app.config_list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let app = app().await;
        let status = app.status().await.unwrap();
        assert_eq!(status.companies, 2);
        assert_eq!(status.measures, 2);
        assert_eq!(status.plans, 2);
        assert_eq!(status.facts, 3);
    }
}
