//! SKU and cost-category breakdowns
//!
//! Pure reductions over an arbitrary collection of cost entries: group by
//! a key, sum cost per group, and order the rows by cost descending. No
//! hierarchy is involved; the rollup tree reuses these reductions to
//! annotate each of its nodes.

use crate::types::CostEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of a cost breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    /// Grouping key (SKU, cost category, ...)
    pub key: String,
    /// Summed cost in AUD
    pub cost: f64,
}

/// Group entries by `key_fn`, summing cost per group
///
/// Rows are sorted by cost descending; ties keep first-seen order (the
/// sort is stable). Empty input yields an empty list.
///
/// # Examples
/// ```
/// use gencost::breakdown::aggregate_by;
/// # use gencost::types::{BatchId, CostEntry, CostResource, Sku};
/// # fn entry(sku: &str, cost: f64) -> CostEntry {
/// #     CostEntry {
/// #         ar_guid: None,
/// #         resource: CostResource::Batch {
/// #             batch_id: BatchId::new("1"),
/// #             job_id: None,
/// #         },
/// #         sku: Sku::new(sku),
/// #         cost_category: None,
/// #         cost_aud: cost,
/// #         period: None,
/// #         sequencing_groups: Default::default(),
/// #         stage: None,
/// #         topic: None,
/// #     }
/// # }
///
/// let entries = vec![entry("compute", 3.0), entry("storage", 5.0), entry("compute", 7.0)];
/// let rows = aggregate_by(&entries, |e| e.sku.as_str());
/// assert_eq!(rows[0].key, "compute");
/// assert_eq!(rows[0].cost, 10.0);
/// ```
pub fn aggregate_by<'a, I, F>(entries: I, key_fn: F) -> Vec<BreakdownRow>
where
    I: IntoIterator<Item = &'a CostEntry>,
    F: Fn(&'a CostEntry) -> &'a str,
{
    let mut rows: Vec<BreakdownRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let key = key_fn(entry);
        match index.get(key) {
            Some(&i) => rows[i].cost += entry.cost_aud,
            None => {
                index.insert(key.to_string(), rows.len());
                rows.push(BreakdownRow {
                    key: key.to_string(),
                    cost: entry.cost_aud,
                });
            }
        }
    }

    // Stable sort keeps first-seen order for equal costs.
    rows.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    rows
}

/// Cost per SKU, descending
pub fn sku_breakdown<'a>(entries: impl IntoIterator<Item = &'a CostEntry>) -> Vec<BreakdownRow> {
    aggregate_by(entries, |e| e.sku.as_str())
}

/// Cost per category, descending
///
/// Entries without a cost category are grouped under `uncategorised` so
/// the rows still sum to the total of the input.
pub fn category_breakdown<'a>(
    entries: impl IntoIterator<Item = &'a CostEntry>,
) -> Vec<BreakdownRow> {
    aggregate_by(entries, |e| {
        e.cost_category.as_deref().unwrap_or("uncategorised")
    })
}
