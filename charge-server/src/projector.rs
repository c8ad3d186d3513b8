//! Distance projection and histogram binning.
//!
//! Annotates stations with their distance from a reference point and bins
//! them into fixed distance buckets for the chart.
//!
//! Bucket boundaries are evaluated at display precision: a distance is
//! rounded to the nearest 10 m (the `x.xx km` shown to users) before
//! binning, so a station listed as "5.00 km" always lands in the `0-5 km`
//! bucket. The first bucket is closed, `[0, 5]`; the others are `(lo, hi]`,
//! and the last is `(20, ∞)`.

use serde::Serialize;

use crate::domain::{Coordinate, Station};

/// A station annotated with its distance from a reference point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedStation {
    #[serde(flatten)]
    pub station: Station,

    /// Great-circle distance in meters.
    pub distance: f64,
}

impl ProjectedStation {
    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    pub label: &'static str,

    /// Lower bound in km (exclusive, except for the first bucket).
    pub min_km: f64,

    /// Upper bound in km (inclusive); `None` for the open-ended bucket.
    pub max_km: Option<f64>,

    pub count: usize,
}

/// Bucket table: (label, lower bound, inclusive upper bound).
const BUCKETS: [(&str, f64, Option<f64>); 5] = [
    ("0-5 km", 0.0, Some(5.0)),
    ("5-10 km", 5.0, Some(10.0)),
    ("10-15 km", 10.0, Some(15.0)),
    ("15-20 km", 15.0, Some(20.0)),
    ("20+ km", 20.0, None),
];

/// Distance in km at display precision (two decimals).
fn display_km(distance_m: f64) -> f64 {
    (distance_m / 10.0).round() / 100.0
}

/// Index of the bucket a distance (in meters) falls into.
pub fn bucket_index(distance_m: f64) -> usize {
    let km = display_km(distance_m);
    BUCKETS
        .iter()
        .position(|(_, _, max)| max.is_some_and(|max| km <= max))
        .unwrap_or(BUCKETS.len() - 1)
}

/// Annotate stations with their distance from `reference`, nearest first.
///
/// Returns new values; the input stations are left untouched. Stations at
/// equal distance keep their input order.
pub fn project(reference: Coordinate, stations: &[Station]) -> Vec<ProjectedStation> {
    let mut projected: Vec<ProjectedStation> = stations
        .iter()
        .map(|station| ProjectedStation {
            distance: reference.distance_to(&station.coordinate),
            station: station.clone(),
        })
        .collect();

    projected.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    projected
}

/// Bin projected stations into the five distance buckets.
pub fn histogram(projected: &[ProjectedStation]) -> Vec<HistogramBucket> {
    let mut counts = [0usize; BUCKETS.len()];
    for station in projected {
        counts[bucket_index(station.distance)] += 1;
    }

    BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(label, min_km, max_km), count)| HistogramBucket {
            label,
            min_km,
            max_km,
            count,
        })
        .collect()
}
