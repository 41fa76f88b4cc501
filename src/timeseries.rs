//! Time-bucket collation and continuity normalization
//!
//! The charting layer draws stacked areas and bars over per-entity time
//! series. This module turns flat `(date, key, value)` rows into ordered
//! [`TimeSeriesPoint`]s and then repairs the shape defects that break
//! stacked rendering: an entity appearing mid-series without a zero point
//! before it (a discontinuous jump), and one-point series that give the
//! stacking geometry zero width.
//!
//! Dates arrive pre-bucketed from the fetch layer; no bucketing or
//! rounding happens here.

use crate::error::{GencostError, Result};
use crate::types::{BucketDate, ValueMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// One flat input row for the collator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Pre-bucketed date label
    pub date: BucketDate,
    /// Entity key (topic, sequencing group, cost category, ...)
    pub key: String,
    /// Value for that entity at that date (cost, percentage, or count)
    pub value: f64,
}

impl RawPoint {
    /// Create a new RawPoint
    pub fn new(date: BucketDate, key: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            key: key.into(),
            value,
        }
    }
}

/// One chart point: a date and the per-entity values present at it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Bucket date
    pub date: BucketDate,
    /// Entity key to value; absent keys have not appeared yet
    pub values: BTreeMap<String, f64>,
}

/// An ordered series plus its stacking order, ready for a stacked chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedSeries {
    /// Chronological points, strictly increasing dates
    pub points: Vec<TimeSeriesPoint>,
    /// Tracked entity keys in stacking order
    pub keys: Vec<String>,
}

/// Collate flat rows into one point per distinct date
///
/// Groups by exact date equality, merges all rows for a date into one
/// value map, and sums duplicate `(date, key)` pairs (this is what lets a
/// chart merge several source queries). Output dates are ascending with
/// no duplicates. Empty input yields an empty series.
pub fn collate(points: impl IntoIterator<Item = RawPoint>) -> Vec<TimeSeriesPoint> {
    let mut by_date: BTreeMap<BucketDate, BTreeMap<String, f64>> = BTreeMap::new();

    for point in points {
        *by_date
            .entry(point.date)
            .or_default()
            .entry(point.key)
            .or_insert(0.0) += point.value;
    }

    by_date
        .into_iter()
        .map(|(date, values)| TimeSeriesPoint { date, values })
        .collect()
}

/// Zero-fill `key` at `prev`, erroring if a conflicting value is present
fn backfill_zero(prev: &mut TimeSeriesPoint, key: &str) -> Result<()> {
    match prev.values.get(key) {
        None => {
            prev.values.insert(key.to_string(), 0.0);
            Ok(())
        }
        Some(&existing) if existing == 0.0 => Ok(()),
        Some(&existing) => Err(GencostError::InconsistentContinuity {
            date: prev.date,
            key: key.to_string(),
            existing,
        }),
    }
}

/// Normalize a collated series for stacked rendering
///
/// Three passes, in order:
///
/// 1. **Single-point padding**: a one-point series gains a synthetic
///    second point at `series_end` with the same values, so downstream
///    stacking always has an interval to draw.
/// 2. **Continuity**: each tracked key is a tiny state machine,
///    `NotYetSeen` until its first appearance. On that transition, if the
///    transition point is not the first point and the immediately
///    preceding point does not already contain the key, the preceding
///    point gets the key with value `0`. A preceding point already
///    holding a non-zero value for the key is a caller-level invariant
///    violation and surfaces as
///    [`GencostError::InconsistentContinuity`]. Keys that never appear
///    stay absent everywhere.
/// 3. **Percentage mode** (when requested): each point's values are
///    rescaled by that point's own sum to total 1.0; a point summing to
///    exactly zero is left all-zero rather than producing NaN.
pub fn normalize_series(
    mut series: Vec<TimeSeriesPoint>,
    tracked_keys: &[String],
    series_end: BucketDate,
    mode: ValueMode,
) -> Result<StackedSeries> {
    if series.len() == 1 {
        if series_end <= series[0].date {
            debug!(
                date = %series[0].date,
                series_end = %series_end,
                "series end does not extend past the single point"
            );
        }
        let values = series[0].values.clone();
        series.push(TimeSeriesPoint {
            date: series_end,
            values,
        });
    }

    let mut not_yet_seen: HashSet<&str> = tracked_keys.iter().map(String::as_str).collect();

    for i in 0..series.len() {
        if not_yet_seen.is_empty() {
            break;
        }

        let appearing: Vec<String> = series[i]
            .values
            .keys()
            .filter(|k| not_yet_seen.contains(k.as_str()))
            .cloned()
            .collect();

        for key in appearing {
            not_yet_seen.remove(key.as_str());
            if i > 0 {
                let (before, _) = series.split_at_mut(i);
                backfill_zero(&mut before[i - 1], &key)?;
            }
        }
    }

    if mode == ValueMode::Percentage {
        for point in &mut series {
            let sum: f64 = point.values.values().sum();
            if sum != 0.0 {
                for value in point.values.values_mut() {
                    *value /= sum;
                }
            }
        }
    }

    Ok(StackedSeries {
        points: series,
        keys: tracked_keys.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> BucketDate {
        BucketDate::parse(s).unwrap()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_collate_groups_and_sorts() {
        let points = vec![
            RawPoint::new(date("2024-02"), "topicA", 3.0),
            RawPoint::new(date("2024-01"), "topicA", 1.0),
            RawPoint::new(date("2024-01"), "topicB", 2.0),
        ];

        let series = collate(points);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date("2024-01"));
        assert_eq!(series[0].values.len(), 2);
        assert_eq!(series[1].values["topicA"], 3.0);
    }

    #[test]
    fn test_collate_sums_duplicate_date_key_pairs() {
        let points = vec![
            RawPoint::new(date("2024-01"), "topicA", 1.5),
            RawPoint::new(date("2024-01"), "topicA", 2.5),
        ];

        let series = collate(points);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values["topicA"], 4.0);
    }

    #[test]
    fn test_collate_empty() {
        assert!(collate(Vec::new()).is_empty());
    }

    #[test]
    fn test_continuity_inserts_zero_before_first_appearance() {
        // topicA at 2024-01, topicB first appears at 2024-03: topicB gets
        // a zero at 2024-01 while topicA there is untouched.
        let series = collate(vec![
            RawPoint::new(date("2024-01"), "topicA", 5.0),
            RawPoint::new(date("2024-03"), "topicA", 7.0),
            RawPoint::new(date("2024-03"), "topicB", 2.0),
        ]);

        let stacked = normalize_series(
            series,
            &keys(&["topicA", "topicB"]),
            date("2024-04"),
            ValueMode::Absolute,
        )
        .unwrap();

        assert_eq!(stacked.points[0].values["topicA"], 5.0);
        assert_eq!(stacked.points[0].values["topicB"], 0.0);
        assert_eq!(stacked.points[1].values["topicB"], 2.0);
    }

    #[test]
    fn test_key_present_at_first_point_needs_no_fill() {
        let series = collate(vec![
            RawPoint::new(date("2024-01"), "topicA", 5.0),
            RawPoint::new(date("2024-02"), "topicA", 6.0),
        ]);

        let stacked = normalize_series(
            series,
            &keys(&["topicA"]),
            date("2024-03"),
            ValueMode::Absolute,
        )
        .unwrap();

        assert_eq!(stacked.points[0].values.len(), 1);
        assert_eq!(stacked.points[1].values.len(), 1);
    }

    #[test]
    fn test_tracked_key_never_appearing_stays_absent() {
        let series = collate(vec![RawPoint::new(date("2024-01"), "topicA", 5.0)]);

        let stacked = normalize_series(
            series,
            &keys(&["topicA", "ghost"]),
            date("2024-02"),
            ValueMode::Absolute,
        )
        .unwrap();

        for point in &stacked.points {
            assert!(!point.values.contains_key("ghost"));
        }
        assert_eq!(stacked.keys, keys(&["topicA", "ghost"]));
    }

    #[test]
    fn test_single_point_padding() {
        let series = collate(vec![RawPoint::new(date("2024-01"), "topicA", 5.0)]);

        let stacked = normalize_series(
            series,
            &keys(&["topicA"]),
            date("2024-06"),
            ValueMode::Absolute,
        )
        .unwrap();

        assert_eq!(stacked.points.len(), 2);
        assert_eq!(stacked.points[1].date, date("2024-06"));
        assert_eq!(stacked.points[0].values, stacked.points[1].values);
    }

    #[test]
    fn test_empty_series_stays_empty() {
        let stacked = normalize_series(
            Vec::new(),
            &keys(&["topicA"]),
            date("2024-06"),
            ValueMode::Absolute,
        )
        .unwrap();
        assert!(stacked.points.is_empty());
    }

    #[test]
    fn test_percentage_mode_rescales_per_point() {
        let series = collate(vec![
            RawPoint::new(date("2024-01"), "topicA", 3.0),
            RawPoint::new(date("2024-01"), "topicB", 1.0),
            RawPoint::new(date("2024-02"), "topicA", 5.0),
        ]);

        let stacked = normalize_series(
            series,
            &keys(&["topicA", "topicB"]),
            date("2024-03"),
            ValueMode::Percentage,
        )
        .unwrap();

        assert!((stacked.points[0].values["topicA"] - 0.75).abs() < 1e-12);
        assert!((stacked.points[0].values["topicB"] - 0.25).abs() < 1e-12);
        assert!((stacked.points[1].values["topicA"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentage_mode_leaves_zero_sum_points_alone() {
        // topicB first appears at the second point, so the first point
        // ends up with only a zero fill; its sum is zero and must stay
        // all-zero rather than become NaN.
        let series = collate(vec![
            RawPoint::new(date("2024-01"), "topicB", 0.0),
            RawPoint::new(date("2024-02"), "topicB", 4.0),
        ]);

        let stacked = normalize_series(
            series,
            &keys(&["topicB"]),
            date("2024-03"),
            ValueMode::Percentage,
        )
        .unwrap();

        assert_eq!(stacked.points[0].values["topicB"], 0.0);
        assert_eq!(stacked.points[1].values["topicB"], 1.0);
    }

    #[test]
    fn test_percentage_normalization_is_idempotent() {
        let series = collate(vec![
            RawPoint::new(date("2024-01"), "topicA", 0.75),
            RawPoint::new(date("2024-01"), "topicB", 0.25),
            RawPoint::new(date("2024-02"), "topicA", 1.0),
        ]);

        let once = normalize_series(
            series,
            &keys(&["topicA", "topicB"]),
            date("2024-03"),
            ValueMode::Percentage,
        )
        .unwrap();
        let twice = normalize_series(
            once.points.clone(),
            &keys(&["topicA", "topicB"]),
            date("2024-03"),
            ValueMode::Percentage,
        )
        .unwrap();

        for (a, b) in once.points.iter().zip(&twice.points) {
            for (key, value) in &a.values {
                assert!((value - b.values[key]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_backfill_conflict_is_an_error() {
        let mut prev = TimeSeriesPoint {
            date: date("2024-01"),
            values: BTreeMap::from([("topicA".to_string(), 5.0)]),
        };

        let err = backfill_zero(&mut prev, "topicA").unwrap_err();
        assert!(matches!(
            err,
            GencostError::InconsistentContinuity { existing, .. } if existing == 5.0
        ));

        // A pre-existing zero is fine.
        let mut prev = TimeSeriesPoint {
            date: date("2024-01"),
            values: BTreeMap::from([("topicA".to_string(), 0.0)]),
        };
        assert!(backfill_zero(&mut prev, "topicA").is_ok());
    }
}
