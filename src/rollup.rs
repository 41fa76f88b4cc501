//! Cost rollup tree for a single analysis run
//!
//! Groups the flat cost entries of one AR-GUID into a drill-down tree:
//! run totals at the root, one bucket per backend kind below it, then
//! per-batch and per-job (or per-task, per-workflow, ...) leaves. Every
//! node is annotated with its own SKU, category, and sequencing-group
//! breakdowns so a dashboard can expand any level without re-querying.
//!
//! Parents sum their children's totals rather than re-deriving from raw
//! entries, which keeps the rollup internally consistent. The build is
//! total: entries whose entity path matches no known backend kind land in
//! a synthetic `unknown` bucket instead of failing the response.

use crate::allocation::{SeqGroupShare, allocate_by_seq_group};
use crate::breakdown::{BreakdownRow, category_breakdown, sku_breakdown};
use crate::types::{ArGuid, CostEntry, CostResource, UsagePeriod, union_periods};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A node of the cost rollup tree
///
/// Built once per query response and immutable after construction; the
/// caller displays it and discards it when a new query supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostNode {
    /// Node identity: run guid, backend kind, batch id, job id, ...
    pub label: String,
    /// Sum of all descendant entries' cost
    pub total_cost: f64,
    /// Number of leaf entries aggregated below this node (None on leaves)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_count: Option<usize>,
    /// Min/max usage bounds over descendants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<UsagePeriod>,
    /// Cost per SKU, descending
    pub sku_breakdown: Vec<BreakdownRow>,
    /// Cost per category, descending
    pub category_breakdown: Vec<BreakdownRow>,
    /// Cost per sequencing group, descending
    pub seq_group_breakdown: Vec<SeqGroupShare>,
    /// Child nodes in insertion/backend-kind order (not cost order)
    pub children: Vec<CostNode>,
}

impl CostNode {
    fn leaf(label: String, entries: &[&CostEntry]) -> Self {
        Self {
            label,
            total_cost: entries.iter().map(|e| e.cost_aud).sum(),
            job_count: None,
            period: entries
                .iter()
                .fold(None, |acc, e| union_periods(acc, e.period)),
            sku_breakdown: sku_breakdown(entries.iter().copied()),
            category_breakdown: category_breakdown(entries.iter().copied()),
            seq_group_breakdown: allocate_by_seq_group(entries.iter().copied()),
            children: Vec::new(),
        }
    }

    /// Parent totals come from the children, not from the raw entries;
    /// breakdowns still come from the descendant entry slice.
    fn group(label: String, children: Vec<CostNode>, entries: &[&CostEntry]) -> Self {
        Self {
            label,
            total_cost: children.iter().map(|c| c.total_cost).sum(),
            job_count: Some(children.iter().map(|c| c.job_count.unwrap_or(1)).sum()),
            period: children
                .iter()
                .fold(None, |acc, c| union_periods(acc, c.period)),
            sku_breakdown: sku_breakdown(entries.iter().copied()),
            category_breakdown: category_breakdown(entries.iter().copied()),
            seq_group_breakdown: allocate_by_seq_group(entries.iter().copied()),
            children,
        }
    }
}

/// Group entries by a label, preserving first-seen order
fn group_by_label<'a, F>(entries: &[&'a CostEntry], label_fn: F) -> Vec<(String, Vec<&'a CostEntry>)>
where
    F: Fn(&CostEntry) -> String,
{
    let mut groups: Vec<(String, Vec<&'a CostEntry>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for &entry in entries {
        let label = label_fn(entry);
        match index.get(&label) {
            Some(&i) => groups[i].1.push(entry),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push((label, vec![entry]));
            }
        }
    }

    groups
}

fn build_batch_bucket(entries: &[&CostEntry]) -> CostNode {
    let batches = group_by_label(entries, |e| match &e.resource {
        CostResource::Batch { batch_id, .. } => batch_id.as_str().to_string(),
        _ => unreachable!("batch bucket only receives batch entries"),
    });

    let children = batches
        .into_iter()
        .map(|(batch_label, batch_entries)| {
            // Entries with no job id form a single implicit driver leaf.
            let jobs = group_by_label(&batch_entries, |e| match &e.resource {
                CostResource::Batch { job_id, .. } => {
                    job_id.clone().unwrap_or_else(|| "driver".to_string())
                }
                _ => unreachable!("batch bucket only receives batch entries"),
            });

            let job_nodes = jobs
                .into_iter()
                .map(|(job_label, job_entries)| CostNode::leaf(job_label, &job_entries))
                .collect();

            CostNode::group(batch_label, job_nodes, &batch_entries)
        })
        .collect();

    CostNode::group("batch".to_string(), children, entries)
}

fn build_flat_bucket(kind_label: &str, entries: &[&CostEntry]) -> CostNode {
    let groups = group_by_label(entries, |e| match &e.resource {
        CostResource::Dataproc { cluster } => cluster.clone(),
        CostResource::WdlTask { task_name } => task_name.clone(),
        CostResource::CromwellSubWorkflow { name } => name.clone(),
        CostResource::CromwellWorkflow { workflow_id } => workflow_id.clone(),
        CostResource::Unknown { path } if !path.is_empty() => path.join("/"),
        CostResource::Unknown { .. } => "unknown".to_string(),
        CostResource::Batch { .. } => unreachable!("batch entries have their own bucket"),
    });

    let children = groups
        .into_iter()
        .map(|(label, group_entries)| CostNode::leaf(label, &group_entries))
        .collect();

    CostNode::group(kind_label.to_string(), children, entries)
}

/// Build the cost rollup tree for one analysis run
///
/// Always succeeds for normalized input; the tree shape is run root →
/// backend-kind buckets → batches/leaves → job leaves, with singleton
/// grouping levels collapsed for display (see
/// [`collapse_singleton_levels`]). Backend-kind buckets appear in the
/// fixed [`crate::types::BackendKind::ALL`] order, empty kinds omitted.
pub fn build_tree(ar_guid: &ArGuid, entries: &[CostEntry]) -> CostNode {
    use crate::types::BackendKind;

    let mut by_kind: HashMap<BackendKind, Vec<&CostEntry>> = HashMap::new();
    for entry in entries {
        by_kind
            .entry(entry.resource.backend_kind())
            .or_default()
            .push(entry);
    }

    let mut children = Vec::new();
    for kind in BackendKind::ALL {
        let Some(kind_entries) = by_kind.get(&kind) else {
            continue;
        };

        let mut bucket = match kind {
            BackendKind::Batch => build_batch_bucket(kind_entries),
            _ => build_flat_bucket(kind.as_str(), kind_entries),
        };
        collapse_singleton_levels(&mut bucket);
        children.push(bucket);
    }

    let all: Vec<&CostEntry> = entries.iter().collect();
    let root = CostNode::group(ar_guid.to_string(), children, &all);

    debug!(
        ar_guid = %ar_guid,
        entries = entries.len(),
        buckets = root.children.len(),
        total_cost = root.total_cost,
        "built cost rollup tree"
    );

    root
}

/// Collapse grouping levels that hold exactly one leaf
///
/// A node whose only child is a leaf surfaces that leaf's label on itself
/// (e.g. a batch with exactly one job shows the job name on the batch
/// row). Runs bottom-up over the whole subtree; totals and breakdowns are
/// unchanged because a singleton parent and its leaf aggregate the same
/// entries.
pub fn collapse_singleton_levels(node: &mut CostNode) {
    for child in &mut node.children {
        collapse_singleton_levels(child);
    }

    if node.children.len() == 1
        && node.children[0].children.is_empty()
        && let Some(child) = node.children.pop()
        && child.label != node.label
    {
        node.label = format!("{} / {}", node.label, child.label);
    }
}
