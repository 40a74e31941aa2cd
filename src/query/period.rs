use std::sync::LazyLock;

use regex::Regex;

use crate::config::PivotLimits;
use crate::date_util::{month_abbrev, quarter_of_month, quarter_start_month};
use crate::error::{Error, Result};
use crate::pivot::types::{PeriodType, TimeBucket, TimeGrain};

static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap());
static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-[Qq](\d)$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// The reporting period of a pivot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Year(i32),
    Quarter(i32, u8),
    Month(i32, u8),
}

impl ReportPeriod {
    /// Build a period from request parts. `value` is required and
    /// range-checked for month (1-12) and quarter (1-4) periods and
    /// ignored for years.
    pub fn from_parts(year: i32, period_type: PeriodType, value: Option<u8>) -> Result<Self> {
        match period_type {
            PeriodType::Year => Ok(ReportPeriod::Year(year)),
            PeriodType::Quarter => match value {
                Some(q @ 1..=4) => Ok(ReportPeriod::Quarter(year, q)),
                Some(q) => Err(Error::validation(
                    "periodValue",
                    format!("quarter must be 1-4, got {q}"),
                )),
                None => Err(Error::validation("periodValue", "required for quarter periods")),
            },
            PeriodType::Month => match value {
                Some(m @ 1..=12) => Ok(ReportPeriod::Month(year, m)),
                Some(m) => Err(Error::validation(
                    "periodValue",
                    format!("month must be 1-12, got {m}"),
                )),
                None => Err(Error::validation("periodValue", "required for month periods")),
            },
        }
    }

    /// Re-check a period that may not have come through [`from_parts`]:
    /// the value must be in range and the year inside `limits`.
    ///
    /// [`from_parts`]: ReportPeriod::from_parts
    pub fn check(&self, limits: &PivotLimits) -> Result<()> {
        let year = self.year();
        if !limits.contains(year) {
            return Err(Error::validation(
                "year",
                format!(
                    "must be between {} and {}, got {year}",
                    limits.min_year, limits.max_year
                ),
            ));
        }
        Self::from_parts(year, self.period_type(), self.period_value()).map(|_| ())
    }

    /// Parse a period shorthand.
    ///
    /// Supported formats:
    /// - `2025`: year
    /// - `2025-Q2`: quarter
    /// - `2025-03`: month
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(caps) = RE_YEAR.captures(s) {
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid year: {s}")))?;
            return Ok(ReportPeriod::Year(year));
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid year: {s}")))?;
            let q: u8 = caps[2]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid quarter: {s}")))?;
            if (1..=4).contains(&q) {
                return Ok(ReportPeriod::Quarter(year, q));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid year: {s}")))?;
            let month: u8 = caps[2]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid month: {s}")))?;
            if (1..=12).contains(&month) {
                return Ok(ReportPeriod::Month(year, month));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Convert to a canonical key string.
    pub fn to_key(&self) -> String {
        match self {
            ReportPeriod::Year(y) => format!("{y}"),
            ReportPeriod::Quarter(y, q) => format!("{y}-Q{q}"),
            ReportPeriod::Month(y, m) => format!("{y}-{m:02}"),
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            ReportPeriod::Year(y) | ReportPeriod::Quarter(y, _) | ReportPeriod::Month(y, _) => *y,
        }
    }

    pub fn period_type(&self) -> PeriodType {
        match self {
            ReportPeriod::Year(_) => PeriodType::Year,
            ReportPeriod::Quarter(..) => PeriodType::Quarter,
            ReportPeriod::Month(..) => PeriodType::Month,
        }
    }

    pub fn period_value(&self) -> Option<u8> {
        match self {
            ReportPeriod::Year(_) => None,
            ReportPeriod::Quarter(_, q) => Some(*q),
            ReportPeriod::Month(_, m) => Some(*m),
        }
    }

    /// Calendar months covered by the period, ascending.
    pub fn months(&self) -> Vec<u8> {
        match self {
            ReportPeriod::Year(_) => (1..=12).collect(),
            ReportPeriod::Quarter(_, q) => {
                let start = quarter_start_month(*q);
                vec![start, start + 1, start + 2]
            }
            ReportPeriod::Month(_, m) => vec![*m],
        }
    }

    /// The fixed column set of the output table at the given grain.
    pub fn time_buckets(&self, grain: TimeGrain) -> Vec<TimeBucket> {
        let year = self.year();
        let months = self.months();
        match grain {
            TimeGrain::Month => months
                .into_iter()
                .map(|m| TimeBucket {
                    key: bucket_key(year, grain, m),
                    label: month_abbrev(m).to_string(),
                    month: Some(m),
                    quarter: None,
                })
                .collect(),
            TimeGrain::Quarter => {
                let mut quarters: Vec<u8> = months.into_iter().map(quarter_of_month).collect();
                quarters.dedup();
                quarters
                    .into_iter()
                    .map(|q| TimeBucket {
                        key: format!("{year}-Q{q}"),
                        label: format!("Q{q}"),
                        month: None,
                        quarter: Some(q),
                    })
                    .collect()
            }
        }
    }
}

/// Bucket key for a month at the given grain.
pub fn bucket_key(year: i32, grain: TimeGrain, month: u8) -> String {
    match grain {
        TimeGrain::Month => format!("{year}-{month:02}"),
        TimeGrain::Quarter => format!("{year}-Q{}", quarter_of_month(month)),
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(ReportPeriod::parse("2025").unwrap(), ReportPeriod::Year(2025));
    }

    #[test]
    fn test_parse_quarter() {
        assert_eq!(ReportPeriod::parse("2025-Q1").unwrap(), ReportPeriod::Quarter(2025, 1));
        assert_eq!(ReportPeriod::parse("2025-q4").unwrap(), ReportPeriod::Quarter(2025, 4));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(ReportPeriod::parse("2025-01").unwrap(), ReportPeriod::Month(2025, 1));
        assert_eq!(ReportPeriod::parse("2025-3").unwrap(), ReportPeriod::Month(2025, 3));
        assert_eq!(ReportPeriod::parse(" 2025-12 ").unwrap(), ReportPeriod::Month(2025, 12));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ReportPeriod::parse("garbage").is_err());
        assert!(ReportPeriod::parse("2025-Q5").is_err());
        assert!(ReportPeriod::parse("2025-13").is_err());
        assert!(ReportPeriod::parse("2025-00").is_err());
        assert!(ReportPeriod::parse("ytd").is_err());
    }

    #[test]
    fn test_to_key() {
        assert_eq!(ReportPeriod::Year(2025).to_key(), "2025");
        assert_eq!(ReportPeriod::Quarter(2025, 2).to_key(), "2025-Q2");
        assert_eq!(ReportPeriod::Month(2025, 3).to_key(), "2025-03");
    }

    #[test]
    fn test_from_parts_requires_value() {
        assert_eq!(
            ReportPeriod::from_parts(2025, PeriodType::Year, None).unwrap(),
            ReportPeriod::Year(2025)
        );
        assert_eq!(
            ReportPeriod::from_parts(2025, PeriodType::Year, Some(7)).unwrap(),
            ReportPeriod::Year(2025)
        );
        let err = ReportPeriod::from_parts(2025, PeriodType::Month, None).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "periodValue", .. }));
        let err = ReportPeriod::from_parts(2025, PeriodType::Month, Some(13)).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "periodValue", .. }));
        let err = ReportPeriod::from_parts(2025, PeriodType::Quarter, Some(0)).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "periodValue", .. }));
        assert_eq!(
            ReportPeriod::from_parts(2025, PeriodType::Quarter, Some(4)).unwrap(),
            ReportPeriod::Quarter(2025, 4)
        );
    }

    #[test]
    fn test_check_rejects_hand_built_periods() {
        let limits = PivotLimits::default();
        assert!(ReportPeriod::Quarter(2025, 2).check(&limits).is_ok());
        assert!(ReportPeriod::Year(2000).check(&limits).is_ok());

        let err = ReportPeriod::Quarter(2025, 0).check(&limits).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "periodValue", .. }));
        let err = ReportPeriod::Month(2025, 13).check(&limits).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "periodValue", .. }));
        let err = ReportPeriod::Year(1500).check(&limits).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "year", .. }));

        let wide = PivotLimits {
            min_year: 1500,
            max_year: 2100,
        };
        assert!(ReportPeriod::Year(1500).check(&wide).is_ok());
    }

    #[test]
    fn test_months() {
        assert_eq!(ReportPeriod::Month(2025, 5).months(), vec![5]);
        assert_eq!(ReportPeriod::Quarter(2025, 1).months(), vec![1, 2, 3]);
        assert_eq!(ReportPeriod::Quarter(2025, 4).months(), vec![10, 11, 12]);
        assert_eq!(ReportPeriod::Year(2025).months().len(), 12);
    }

    #[test]
    fn test_bucket_counts() {
        let cases = [
            (ReportPeriod::Month(2025, 2), TimeGrain::Month, 1),
            (ReportPeriod::Month(2025, 2), TimeGrain::Quarter, 1),
            (ReportPeriod::Quarter(2025, 3), TimeGrain::Month, 3),
            (ReportPeriod::Quarter(2025, 3), TimeGrain::Quarter, 1),
            (ReportPeriod::Year(2025), TimeGrain::Month, 12),
            (ReportPeriod::Year(2025), TimeGrain::Quarter, 4),
        ];
        for (period, grain, expected) in cases {
            let buckets = period.time_buckets(grain);
            assert_eq!(buckets.len(), expected, "{period} at {grain:?}");
            let mut keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
            keys.dedup();
            assert_eq!(keys.len(), expected, "bucket keys must be unique");
            assert_eq!(buckets, period.time_buckets(grain));
        }
    }

    #[test]
    fn test_month_bucket_shape() {
        let buckets = ReportPeriod::Quarter(2026, 1).time_buckets(TimeGrain::Month);
        assert_eq!(buckets[0].key, "2026-01");
        assert_eq!(buckets[0].label, "Янв");
        assert_eq!(buckets[0].month, Some(1));
        assert_eq!(buckets[0].quarter, None);
        assert_eq!(buckets[2].key, "2026-03");
    }

    #[test]
    fn test_quarter_bucket_shape() {
        let buckets = ReportPeriod::Year(2026).time_buckets(TimeGrain::Quarter);
        let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["2026-Q1", "2026-Q2", "2026-Q3", "2026-Q4"]);
        assert_eq!(buckets[1].label, "Q2");
        assert_eq!(buckets[1].quarter, Some(2));
        assert_eq!(buckets[1].month, None);
    }

    #[test]
    fn test_bucket_key() {
        assert_eq!(bucket_key(2025, TimeGrain::Month, 7), "2025-07");
        assert_eq!(bucket_key(2025, TimeGrain::Quarter, 7), "2025-Q3");
    }
}
