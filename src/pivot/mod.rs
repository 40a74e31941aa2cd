//! Dynamic pivot aggregation over work-hour facts.
//!
//! A request flows through fact retrieval (with push-down filters), lookup
//! resolution, in-memory filtering, dimension keying, aggregation and
//! metric projection. Only the lookup tables the request actually needs
//! are fetched.

pub mod aggregate;
pub mod filter;
pub mod keyer;
pub mod lookup;
pub mod params;
pub mod project;
pub mod render;
pub mod source;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregate::Aggregation;
pub use lookup::{LookupRequirements, Lookups};
pub use params::PivotParams;
pub use source::PivotSource;
pub use types::{
    Dimension, FactRow, Metric, PeriodType, PivotDimension, PivotFilters, PivotRequest,
    PivotResponse, PivotRow, PivotStats, TimeBucket, TimeGrain,
};

use crate::config::PivotLimits;
use crate::error::{Error, Result};
use crate::query::builder::FactQuery;

/// Log an upstream fetch failure with context and replace it with the
/// opaque internal error surfaced to callers.
pub(crate) fn upstream_failure(what: &str, e: Error) -> Error {
    log::error!("{what} failed: {e}");
    Error::Internal
}

/// Build a pivot report, checking the request period against the default
/// year band. See [`build_pivot_within`].
pub async fn build_pivot<S: PivotSource>(source: &S, request: &PivotRequest) -> Result<PivotResponse> {
    build_pivot_within(source, request, &PivotLimits::default()).await
}

/// Build a pivot report for a request whose period must fall inside
/// `limits`.
///
/// An out-of-range period is a validation error raised before any fetch.
/// Any fact or lookup fetch failure aborts the whole request with
/// [`Error::Internal`]; no partial pivot is returned.
pub async fn build_pivot_within<S: PivotSource>(
    source: &S,
    request: &PivotRequest,
    limits: &PivotLimits,
) -> Result<PivotResponse> {
    let period = request.period;
    period.check(limits)?;
    let buckets = period.time_buckets(request.time_grain);

    let query = FactQuery::new(period.year(), period.months()).with_filters(&request.filters);
    let facts = source
        .fetch_facts(&query)
        .await
        .map_err(|e| upstream_failure("fact query", e))?;
    log::debug!("fetched {} fact rows for {period}", facts.len());

    if facts.is_empty() {
        return Ok(project::empty_response(request, buckets));
    }

    let requirements = LookupRequirements::for_request(&request.group_by, &request.filters);
    let lookups = Lookups::resolve(source, &requirements, &facts).await?;
    let facts = filter::apply_filters(facts, &request.filters, &lookups);

    let agg = Aggregation::collect(
        &facts,
        period.year(),
        &request.group_by,
        request.time_grain,
        &lookups,
    );
    Ok(project::assemble(request, buckets, agg))
}
