use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;

pub const KEY_MIN_YEAR: &str = "pivot.min_year";
pub const KEY_MAX_YEAR: &str = "pivot.max_year";

/// Accepted band for the request `year` parameter, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotLimits {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for PivotLimits {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2100,
        }
    }
}

impl PivotLimits {
    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    /// Read the year band from `app_config`, falling back to the defaults
    /// for keys that are not set.
    pub async fn load(db: &Database) -> Result<Self> {
        let (min, max) = db
            .reader()
            .call(|conn| {
                let min = repository::get_config(conn, KEY_MIN_YEAR)?;
                let max = repository::get_config(conn, KEY_MAX_YEAR)?;
                Ok::<_, rusqlite::Error>((min, max))
            })
            .await?;

        let defaults = Self::default();
        let limits = Self {
            min_year: parse_year(KEY_MIN_YEAR, min)?.unwrap_or(defaults.min_year),
            max_year: parse_year(KEY_MAX_YEAR, max)?.unwrap_or(defaults.max_year),
        };
        if limits.min_year > limits.max_year {
            return Err(Error::Config(format!(
                "{KEY_MIN_YEAR} ({}) is greater than {KEY_MAX_YEAR} ({})",
                limits.min_year, limits.max_year
            )));
        }
        Ok(limits)
    }
}

fn parse_year(key: &str, value: Option<String>) -> Result<Option<i32>> {
    value
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| Error::Config(format!("{key} must be a year, got {v:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn set(db: &Database, key: &'static str, value: &'static str) {
        db.writer()
            .call(move |conn| repository::set_config(conn, key, value))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let db = Database::open_memory().await.unwrap();
        let limits = PivotLimits::load(&db).await.unwrap();
        assert_eq!(limits, PivotLimits::default());
        assert!(limits.contains(2000) && limits.contains(2100));
        assert!(!limits.contains(1999) && !limits.contains(2101));
    }

    #[tokio::test]
    async fn test_configured_band() {
        let db = Database::open_memory().await.unwrap();
        set(&db, KEY_MIN_YEAR, "2020").await;
        let limits = PivotLimits::load(&db).await.unwrap();
        assert_eq!(limits.min_year, 2020);
        assert_eq!(limits.max_year, 2100);
    }

    #[tokio::test]
    async fn test_malformed_value_is_config_error() {
        let db = Database::open_memory().await.unwrap();
        set(&db, KEY_MAX_YEAR, "soon").await;
        let err = PivotLimits::load(&db).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_inverted_band_is_config_error() {
        let db = Database::open_memory().await.unwrap();
        set(&db, KEY_MIN_YEAR, "2050").await;
        set(&db, KEY_MAX_YEAR, "2040").await;
        assert!(matches!(PivotLimits::load(&db).await, Err(Error::Config(_))));
    }
}
