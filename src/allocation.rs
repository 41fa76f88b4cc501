//! Sequencing-group cost allocation
//!
//! Computes the per-sequencing-group share of a set of cost entries.
//! Entries carrying no sequencing group are excluded here (they still
//! count toward node totals elsewhere). An entry attributed to several
//! groups at once — a shared compute job — is split evenly across them.
//!
//! The even split is a deliberate simplifying policy, not a proportional
//! or weighted allocation; callers needing weighted allocation must
//! pre-split entries before this stage.

use crate::types::{CostEntry, SequencingGroupId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost share attributed to one sequencing group (and stage, if known)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeqGroupShare {
    /// Sequencing group the share belongs to
    pub sequencing_group: SequencingGroupId,
    /// Pipeline stage, when the contributing entries carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Allocated cost in AUD
    pub cost: f64,
}

/// Allocate entry costs to sequencing groups, evenly for shared entries
///
/// For an entry spanning `n` groups each group receives `cost / n`, with
/// the last share absorbing the floating-point remainder so the shares
/// sum exactly to the entry's cost. Output is sorted by cost descending
/// (stable, first-seen order on ties).
pub fn allocate_by_seq_group<'a>(
    entries: impl IntoIterator<Item = &'a CostEntry>,
) -> Vec<SeqGroupShare> {
    let mut shares: Vec<SeqGroupShare> = Vec::new();
    let mut index: HashMap<(SequencingGroupId, Option<String>), usize> = HashMap::new();

    for entry in entries {
        let groups = &entry.sequencing_groups;
        if groups.is_empty() {
            continue;
        }

        let n = groups.len();
        let even_share = entry.cost_aud / n as f64;

        for (i, group) in groups.iter().enumerate() {
            let amount = if i == n - 1 {
                entry.cost_aud - even_share * (n - 1) as f64
            } else {
                even_share
            };

            let key = (group.clone(), entry.stage.clone());
            match index.get(&key) {
                Some(&slot) => shares[slot].cost += amount,
                None => {
                    index.insert(key, shares.len());
                    shares.push(SeqGroupShare {
                        sequencing_group: group.clone(),
                        stage: entry.stage.clone(),
                        cost: amount,
                    });
                }
            }
        }
    }

    shares.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchId, CostResource, SequencingGroups, Sku};

    fn entry(groups: &[&str], stage: Option<&str>, cost: f64) -> CostEntry {
        CostEntry {
            ar_guid: None,
            resource: CostResource::Batch {
                batch_id: BatchId::new("1"),
                job_id: None,
            },
            sku: Sku::new("compute"),
            cost_category: None,
            cost_aud: cost,
            period: None,
            sequencing_groups: groups
                .iter()
                .map(|g| SequencingGroupId::new(*g))
                .collect::<SequencingGroups>(),
            stage: stage.map(str::to_string),
            topic: None,
        }
    }

    #[test]
    fn test_entries_without_groups_are_excluded() {
        let entries = vec![entry(&["SG1"], None, 10.0), entry(&[], None, 5.0)];

        let shares = allocate_by_seq_group(&entries);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].sequencing_group.as_str(), "SG1");
        assert_eq!(shares[0].cost, 10.0);
    }

    #[test]
    fn test_even_split_across_shared_groups() {
        let entries = vec![entry(&["SG1", "SG2", "SG3"], None, 10.0)];

        let shares = allocate_by_seq_group(&entries);
        assert_eq!(shares.len(), 3);
        for share in &shares[..2] {
            assert!((share.cost - 10.0 / 3.0).abs() < 1e-12);
        }

        let total: f64 = shares.iter().map(|s| s.cost).sum();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn test_shares_accumulate_across_entries() {
        let entries = vec![
            entry(&["SG1"], Some("align"), 2.0),
            entry(&["SG1"], Some("align"), 3.0),
            entry(&["SG1"], Some("call"), 1.0),
        ];

        let shares = allocate_by_seq_group(&entries);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].stage.as_deref(), Some("align"));
        assert_eq!(shares[0].cost, 5.0);
        assert_eq!(shares[1].stage.as_deref(), Some("call"));
    }

    #[test]
    fn test_sorted_by_cost_descending() {
        let entries = vec![
            entry(&["SG_low"], None, 1.0),
            entry(&["SG_high"], None, 9.0),
            entry(&["SG_mid"], None, 4.0),
        ];

        let shares = allocate_by_seq_group(&entries);
        let ids: Vec<&str> = shares
            .iter()
            .map(|s| s.sequencing_group.as_str())
            .collect();
        assert_eq!(ids, vec!["SG_high", "SG_mid", "SG_low"]);
    }

    #[test]
    fn test_empty_input() {
        let entries: Vec<CostEntry> = Vec::new();
        assert!(allocate_by_seq_group(&entries).is_empty());
    }
}
