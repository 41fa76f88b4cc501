//! Filtering for cost entries
//!
//! Narrow a normalized entry set before rolling it up, by usage date
//! range, billing topic, or sequencing group. All filters are optional
//! and combine conjunctively.
//!
//! # Examples
//!
//! ```
//! use gencost::filters::CostFilter;
//! use chrono::NaiveDate;
//!
//! let filter = CostFilter::new()
//!     .with_since(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
//!     .with_until(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
//!     .with_topic("rare-disease");
//! ```

use crate::types::{CostEntry, SequencingGroupId};
use chrono::NaiveDate;

/// Filter configuration for cost entries
#[derive(Debug, Default, Clone)]
pub struct CostFilter {
    /// Earliest usage date (inclusive); entries whose period ends before
    /// this are excluded
    pub since_date: Option<NaiveDate>,
    /// Latest usage date (inclusive); entries whose period starts after
    /// this are excluded
    pub until_date: Option<NaiveDate>,
    /// Billing topic filter
    pub topic: Option<String>,
    /// Sequencing group filter
    pub sequencing_group: Option<SequencingGroupId>,
}

impl CostFilter {
    /// Create a new filter with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start date filter
    pub fn with_since(mut self, date: NaiveDate) -> Self {
        self.since_date = Some(date);
        self
    }

    /// Set the end date filter
    pub fn with_until(mut self, date: NaiveDate) -> Self {
        self.until_date = Some(date);
        self
    }

    /// Set the topic filter
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the sequencing group filter
    pub fn with_sequencing_group(mut self, group: SequencingGroupId) -> Self {
        self.sequencing_group = Some(group);
        self
    }

    /// Check if an entry passes the filter
    ///
    /// Date filters test overlap with the entry's usage period; entries
    /// without a period pass the date filters.
    pub fn matches(&self, entry: &CostEntry) -> bool {
        if let Some(period) = &entry.period {
            if let Some(since) = &self.since_date
                && period.end.date_naive() < *since
            {
                return false;
            }
            if let Some(until) = &self.until_date
                && period.start.date_naive() > *until
            {
                return false;
            }
        }

        if let Some(topic) = &self.topic {
            match &entry.topic {
                Some(entry_topic) if entry_topic == topic => {}
                _ => return false,
            }
        }

        if let Some(group) = &self.sequencing_group
            && !entry.sequencing_groups.contains(group)
        {
            return false;
        }

        true
    }

    /// Keep only the entries matching the filter
    pub fn apply(&self, mut entries: Vec<CostEntry>) -> Vec<CostEntry> {
        entries.retain(|e| self.matches(e));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchId, CostResource, SequencingGroups, Sku, UsagePeriod};
    use chrono::{TimeZone, Utc};

    fn entry(day: u32, topic: Option<&str>, groups: &[&str]) -> CostEntry {
        CostEntry {
            ar_guid: None,
            resource: CostResource::Batch {
                batch_id: BatchId::new("1"),
                job_id: None,
            },
            sku: Sku::new("compute"),
            cost_category: None,
            cost_aud: 1.0,
            period: Some(UsagePeriod::new(
                Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            )),
            sequencing_groups: groups
                .iter()
                .map(|g| SequencingGroupId::new(*g))
                .collect::<SequencingGroups>(),
            stage: None,
            topic: topic.map(str::to_string),
        }
    }

    #[test]
    fn test_date_range_filter() {
        let filter = CostFilter::new()
            .with_since(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .with_until(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());

        assert!(!filter.matches(&entry(5, None, &[])));
        assert!(filter.matches(&entry(15, None, &[])));
        assert!(!filter.matches(&entry(25, None, &[])));
    }

    #[test]
    fn test_entry_without_period_passes_date_filters() {
        let filter = CostFilter::new().with_since(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let mut e = entry(5, None, &[]);
        e.period = None;
        assert!(filter.matches(&e));
    }

    #[test]
    fn test_topic_filter() {
        let filter = CostFilter::new().with_topic("rare-disease");

        assert!(filter.matches(&entry(1, Some("rare-disease"), &[])));
        assert!(!filter.matches(&entry(1, Some("other"), &[])));
        assert!(!filter.matches(&entry(1, None, &[])));
    }

    #[test]
    fn test_sequencing_group_filter() {
        let filter = CostFilter::new().with_sequencing_group(SequencingGroupId::new("SG1"));

        assert!(filter.matches(&entry(1, None, &["SG1", "SG2"])));
        assert!(!filter.matches(&entry(1, None, &["SG2"])));
        assert!(!filter.matches(&entry(1, None, &[])));
    }

    #[test]
    fn test_apply_retains_matches() {
        let filter = CostFilter::new().with_topic("a");
        let entries = vec![
            entry(1, Some("a"), &[]),
            entry(2, Some("b"), &[]),
            entry(3, Some("a"), &[]),
        ];

        assert_eq!(filter.apply(entries).len(), 2);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = CostFilter::new();
        assert!(filter.matches(&entry(1, Some("a"), &["SG1"])));
    }
}
