use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::date_util::round2;

/// How a monthly plan's hours are split across its companies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[default]
    Even,
    /// Proportional to each company's server count.
    ByServers,
    /// Proportional to each company's workstation count.
    ByWorkstations,
}

/// Per-company attributes that drive distribution and cost.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Infra {
    pub rate_per_hour: f64,
    pub servers_count: u32,
    pub workstations_count: u32,
}

/// One company's part of a distributed amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyShare {
    pub company_id: String,
    /// Fraction of the total, 0..=1.
    pub share: f64,
    pub hours: f64,
}

/// Split `total` hours across `company_ids`.
///
/// Shares are rounded to 2 decimals and the last company takes the
/// remainder, so the parts add up to `total`. Weighted kinds fall back to
/// an even split when every weight is zero; companies missing from `infra`
/// weigh zero.
pub fn distribute_hours(
    total: f64,
    company_ids: &[String],
    infra: &HashMap<String, Infra>,
    kind: DistributionKind,
) -> Vec<CompanyShare> {
    let fractions = fractions(company_ids, infra, kind);
    let mut shares = Vec::with_capacity(fractions.len());
    let mut distributed = 0.0;
    let last = fractions.len().saturating_sub(1);

    for (i, (id, share)) in fractions.into_iter().enumerate() {
        let hours = if i == last {
            round2(total - distributed)
        } else {
            let h = round2(total * share);
            distributed += h;
            h
        };
        shares.push(CompanyShare {
            company_id: id.clone(),
            share,
            hours,
        });
    }
    shares
}

/// Split an integer count by the same fractions: each part rounds to the
/// nearest integer, the last takes the remainder. Never negative.
pub fn split_count(total: u64, shares: &[CompanyShare]) -> Vec<u64> {
    let mut parts = Vec::with_capacity(shares.len());
    let mut remaining = total;
    let last = shares.len().saturating_sub(1);
    for (i, s) in shares.iter().enumerate() {
        let part = if i == last {
            remaining
        } else {
            ((total as f64 * s.share).round() as u64).min(remaining)
        };
        remaining -= part;
        parts.push(part);
    }
    parts
}

fn fractions<'a>(
    company_ids: &'a [String],
    infra: &HashMap<String, Infra>,
    kind: DistributionKind,
) -> Vec<(&'a String, f64)> {
    let weight = |id: &String| -> f64 {
        let info = infra.get(id).copied().unwrap_or_default();
        match kind {
            DistributionKind::Even => 1.0,
            DistributionKind::ByServers => f64::from(info.servers_count),
            DistributionKind::ByWorkstations => f64::from(info.workstations_count),
        }
    };

    let weights: Vec<f64> = company_ids.iter().map(weight).collect();
    let sum: f64 = weights.iter().sum();
    if sum == 0.0 {
        if kind != DistributionKind::Even && !company_ids.is_empty() {
            log::warn!("no {kind:?} weights for {company_ids:?}, splitting evenly");
        }
        let even = 1.0 / company_ids.len().max(1) as f64;
        return company_ids.iter().map(|id| (id, even)).collect();
    }
    company_ids
        .iter()
        .zip(weights)
        .map(|(id, w)| (id, w / sum))
        .collect()
}
