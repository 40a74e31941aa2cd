use std::collections::HashMap;

use crate::error::Result;
use crate::pivot::source::PivotSource;
use crate::pivot::types::{FactRow, Measure, User};
use crate::query::builder::FactQuery;
use crate::storage::repository;
use crate::storage::Database;

impl PivotSource for Database {
    async fn fetch_facts(&self, query: &FactQuery) -> Result<Vec<FactRow>> {
        let query = query.clone();
        let rows = self
            .reader()
            .call(move |conn| repository::query_facts(conn, &query))
            .await?;
        Ok(rows)
    }

    async fn fetch_measures(&self, ids: &[String]) -> Result<HashMap<String, Measure>> {
        let ids = ids.to_vec();
        Ok(self
            .reader()
            .call(move |conn| repository::get_measures(conn, &ids))
            .await?)
    }

    async fn fetch_processes(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let ids = ids.to_vec();
        Ok(self
            .reader()
            .call(move |conn| repository::get_process_names(conn, &ids))
            .await?)
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<HashMap<String, User>> {
        let ids = ids.to_vec();
        Ok(self
            .reader()
            .call(move |conn| repository::get_users(conn, &ids))
            .await?)
    }

    async fn fetch_departments(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let ids = ids.to_vec();
        Ok(self
            .reader()
            .call(move |conn| repository::get_department_names(conn, &ids))
            .await?)
    }

    async fn fetch_companies(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let ids = ids.to_vec();
        Ok(self
            .reader()
            .call(move |conn| repository::get_company_names(conn, &ids))
            .await?)
    }
}
