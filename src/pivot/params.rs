use chrono::Datelike;

use crate::config::PivotLimits;
use crate::error::{Error, Result};
use crate::pivot::types::{Dimension, Metric, PeriodType, PivotFilters, PivotRequest, TimeGrain};
use crate::query::period::ReportPeriod;

/// Raw request parameters as they arrive from a query string or the CLI.
/// `None` means the parameter was not supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotParams {
    pub year: Option<String>,
    pub period_type: Option<String>,
    pub period_value: Option<String>,
    /// Comma-separated dimension list.
    pub group_by: Option<String>,
    pub time_grain: Option<String>,
    pub metric: Option<String>,
    /// JSON object of filter arrays.
    pub filters: Option<String>,
}

impl PivotParams {
    /// Fill year, period type and period value from a period shorthand
    /// such as `2025-Q2`.
    pub fn with_period(mut self, period: ReportPeriod) -> Self {
        self.year = Some(period.year().to_string());
        self.period_type = Some(period.period_type().as_str().to_string());
        self.period_value = period.period_value().map(|v| v.to_string());
        self
    }

    /// Validate and type the parameters. Nothing here touches data.
    ///
    /// Defaults: current year, `year` period, `company` grouping, `month`
    /// grain, `hours` metric, no filters.
    pub fn validate(&self, limits: &PivotLimits) -> Result<PivotRequest> {
        let year = match present(&self.year) {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| Error::validation("year", format!("not a number: {raw}")))?,
            None => chrono::Local::now().year(),
        };
        if !limits.contains(year) {
            return Err(Error::validation(
                "year",
                format!("must be between {} and {}", limits.min_year, limits.max_year),
            ));
        }

        let period_type = match present(&self.period_type) {
            Some(raw) => PeriodType::parse(raw)
                .ok_or_else(|| Error::validation("periodType", format!("unknown value: {raw}")))?,
            None => PeriodType::Year,
        };

        let period_value = match present(&self.period_value) {
            // Irrelevant for whole-year periods
            Some(_) if period_type == PeriodType::Year => None,
            Some(raw) => Some(
                raw.parse::<u8>()
                    .map_err(|_| Error::validation("periodValue", format!("not a number: {raw}")))?,
            ),
            None => None,
        };
        let period = ReportPeriod::from_parts(year, period_type, period_value)?;

        let group_by = match present(&self.group_by) {
            Some(raw) => parse_group_by(raw)?,
            None => vec![Dimension::Company],
        };

        let time_grain = match present(&self.time_grain) {
            Some(raw) => TimeGrain::parse(raw)
                .ok_or_else(|| Error::validation("timeGrain", format!("unknown value: {raw}")))?,
            None => TimeGrain::Month,
        };

        let metric = match present(&self.metric) {
            Some(raw) => Metric::parse(raw)
                .ok_or_else(|| Error::validation("metric", format!("unknown value: {raw}")))?,
            None => Metric::Hours,
        };

        let filters = match present(&self.filters) {
            Some(raw) => serde_json::from_str::<PivotFilters>(raw)
                .map_err(|e| Error::validation("filters", e.to_string()))?,
            None => PivotFilters::default(),
        };

        Ok(PivotRequest {
            period,
            group_by,
            time_grain,
            metric,
            filters,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Unknown entries are dropped; repeats keep their first position.
fn parse_group_by(raw: &str) -> Result<Vec<Dimension>> {
    let mut dims = Vec::new();
    for part in raw.split(',') {
        match Dimension::parse(part.trim()) {
            Some(dim) if !dims.contains(&dim) => dims.push(dim),
            Some(_) => {}
            None => log::warn!("ignoring unknown groupBy entry {part:?}"),
        }
    }
    if dims.is_empty() {
        return Err(Error::validation("groupBy", "no valid dimensions"));
    }
    Ok(dims)
}
