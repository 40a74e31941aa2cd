use std::collections::HashMap;

use crate::error::Result;
use crate::pivot::types::{FactRow, Measure, User};
use crate::query::builder::FactQuery;

/// The data collaborators a pivot is computed from: a fact store with
/// push-down filters and five batched key → attribute lookups.
///
/// Lookup methods receive distinct ids and return only the ids they know;
/// missing keys are not an error. Any `Err` aborts the whole pivot.
#[allow(async_fn_in_trait)]
pub trait PivotSource {
    async fn fetch_facts(&self, query: &FactQuery) -> Result<Vec<FactRow>>;

    async fn fetch_measures(&self, ids: &[String]) -> Result<HashMap<String, Measure>>;

    /// Process id → process name.
    async fn fetch_processes(&self, ids: &[String]) -> Result<HashMap<String, String>>;

    async fn fetch_users(&self, ids: &[String]) -> Result<HashMap<String, User>>;

    /// Department id → department name.
    async fn fetch_departments(&self, ids: &[String]) -> Result<HashMap<String, String>>;

    /// Company id → company name.
    async fn fetch_companies(&self, ids: &[String]) -> Result<HashMap<String, String>>;
}
