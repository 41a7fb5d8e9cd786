//! Catalog ranking and filtering
//!
//! Pure functions over a dataset slice. Every function returns a new vector and
//! keeps the input's relative order wherever it does not sort.
//!
//! # Top-N
//! Two tiers, concatenated and truncated:
//! 1. Industrial zoning (`HI`, `LI`, `M-1`) by ascending highway distance; a parcel
//!    without distance data sorts after every parcel that has it, and two parcels both
//!    without data fall back to the score order below.
//! 2. Everything else by descending investment score, then descending zoning fit score.
//!
//! Industrial parcels precede all others even before enrichment has supplied any
//! distance. That is the business rule as it has always shipped.

use parcel_common::{FilterCriteria, Parcel};
use std::cmp::Ordering;

/// Score threshold for the "high potential" view
pub const HIGH_POTENTIAL_THRESHOLD: f64 = 4.5;

/// Keep parcels whose zoning fit score and acreage satisfy every set bound
///
/// An unset bound is skipped entirely. A parcel with no value for a bounded
/// attribute fails that bound.
pub fn filter(dataset: &[Parcel], criteria: &FilterCriteria) -> Vec<Parcel> {
    if criteria.is_unbounded() {
        return dataset.to_vec();
    }

    dataset
        .iter()
        .filter(|p| {
            within(
                p.zoning_fit_score,
                criteria.min_zoning_score,
                criteria.max_zoning_score,
            ) && within(p.acreage, criteria.min_acreage, criteria.max_acreage)
        })
        .cloned()
        .collect()
}

fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    let above_min = min.map_or(true, |lo| value.is_some_and(|v| v >= lo));
    let below_max = max.map_or(true, |hi| value.is_some_and(|v| v <= hi));
    above_min && below_max
}

/// Parcels scoring at least 4.5 on both zoning fit and investment
///
/// Missing scores count as 0, so they never qualify.
pub fn high_potential(dataset: &[Parcel]) -> Vec<Parcel> {
    dataset
        .iter()
        .filter(|p| {
            p.zoning_fit_or_zero() >= HIGH_POTENTIAL_THRESHOLD
                && p.investment_or_zero() >= HIGH_POTENTIAL_THRESHOLD
        })
        .cloned()
        .collect()
}

/// Pre-enrichment shortlist: score order only, first `n`
///
/// Used to pick enrichment candidates before any distance data exists.
pub fn initial_ranking(dataset: &[Parcel], n: usize) -> Vec<Parcel> {
    let mut ranked = dataset.to_vec();
    ranked.sort_by(by_scores_desc);
    ranked.truncate(n);
    ranked
}

/// Two-tier Top-N ranking
pub fn top_n(dataset: &[Parcel], n: usize) -> Vec<Parcel> {
    let (mut industrial, mut other): (Vec<Parcel>, Vec<Parcel>) =
        dataset.iter().cloned().partition(Parcel::is_industrial);

    industrial.sort_by(by_highway_distance);
    other.sort_by(by_scores_desc);

    industrial.extend(other);
    industrial.truncate(n);
    industrial
}

/// Ascending distance, missing distance last, score order between two missing
fn by_highway_distance(a: &Parcel, b: &Parcel) -> Ordering {
    match (a.distance_miles(), b.distance_miles()) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => by_scores_desc(a, b),
    }
}

/// Descending investment score, then descending zoning fit score
fn by_scores_desc(a: &Parcel, b: &Parcel) -> Ordering {
    b.investment_or_zero()
        .total_cmp(&a.investment_or_zero())
        .then_with(|| b.zoning_fit_or_zero().total_cmp(&a.zoning_fit_or_zero()))
}
