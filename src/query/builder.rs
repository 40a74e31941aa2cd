use crate::pivot::types::PivotFilters;

/// Push-down query against the fact store: one year, a set of months and
/// optional company / user / measure id sets. Row order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactQuery {
    year: i32,
    months: Vec<u8>,
    company_ids: Vec<String>,
    user_ids: Vec<String>,
    measure_ids: Vec<String>,
}

impl FactQuery {
    pub fn new(year: i32, months: Vec<u8>) -> Self {
        Self {
            year,
            months,
            ..Self::default()
        }
    }

    /// Copy the push-down capable filters from a request.
    pub fn with_filters(self, filters: &PivotFilters) -> Self {
        self.companies(&filters.company_id)
            .users(&filters.user_id)
            .measures(&filters.measure_id)
    }

    pub fn companies(mut self, ids: &[String]) -> Self {
        self.company_ids = ids.to_vec();
        self
    }

    pub fn users(mut self, ids: &[String]) -> Self {
        self.user_ids = ids.to_vec();
        self
    }

    pub fn measures(mut self, ids: &[String]) -> Self {
        self.measure_ids = ids.to_vec();
        self
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn months(&self) -> &[u8] {
        &self.months
    }

    pub fn company_ids(&self) -> &[String] {
        &self.company_ids
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    pub fn measure_ids(&self) -> &[String] {
        &self.measure_ids
    }

    pub(crate) fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut wheres = Vec::new();
        let mut param_idx = 1;

        let select = "SELECT f.company_id, f.user_id, f.measure_id, f.year, f.month,
                f.distributed_hours, f.tasks_count, f.planned_hours_share, f.rate_per_hour
            FROM fact_user_company_hours f";

        wheres.push(format!("f.year = ?{param_idx}"));
        params.push(Box::new(self.year));
        param_idx += 1;

        // An empty month list matches nothing rather than everything
        let mut placeholders = Vec::new();
        for month in &self.months {
            placeholders.push(format!("?{param_idx}"));
            params.push(Box::new(*month));
            param_idx += 1;
        }
        if placeholders.is_empty() {
            wheres.push("0".to_string());
        } else {
            wheres.push(format!("f.month IN ({})", placeholders.join(",")));
        }

        for (column, ids) in [
            ("f.company_id", &self.company_ids),
            ("f.user_id", &self.user_ids),
            ("f.measure_id", &self.measure_ids),
        ] {
            if ids.is_empty() {
                continue;
            }
            let mut placeholders = Vec::with_capacity(ids.len());
            for id in ids {
                placeholders.push(format!("?{param_idx}"));
                params.push(Box::new(id.clone()));
                param_idx += 1;
            }
            wheres.push(format!("{column} IN ({})", placeholders.join(",")));
        }

        let sql = format!("{select} WHERE {}", wheres.join(" AND "));
        (sql, params)
    }
}
