//! Cost record normalization
//!
//! The billing export hands over loosely-shaped records whose fields vary
//! by backend kind: batch rows carry `batch_id`/`job_id`, Dataproc rows a
//! cluster name, Cromwell rows workflow identifiers, and so on. This
//! module coerces those records into the canonical [`CostEntry`] shape,
//! rejecting records that fail basic shape/sign checks with
//! [`GencostError::MalformedRecord`].
//!
//! Cost values are preserved at full precision; rounding is strictly a
//! display-time concern and never happens here.
//!
//! # Examples
//!
//! ```
//! use gencost::normalize::{RawCostRecord, normalize};
//!
//! let raw: RawCostRecord = serde_json::from_str(
//!     r#"{
//!         "ar_guid": "run-1",
//!         "batch_id": "4213",
//!         "job_id": "align",
//!         "sku": "compute-n2",
//!         "cost": 1.25,
//!         "usage_start_time": "2024-01-01T00:00:00Z",
//!         "usage_end_time": "2024-01-01T02:00:00Z"
//!     }"#,
//! ).unwrap();
//!
//! let entry = normalize(raw).unwrap();
//! assert_eq!(entry.cost_aud, 1.25);
//! ```

use crate::error::{GencostError, Result};
use crate::types::{
    ArGuid, BatchId, CostEntry, CostResource, SequencingGroupId, SequencingGroups, Sku,
    UsagePeriod,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

/// Sequencing group attribution as it appears in raw records
///
/// Exports emit either a single group id or a list (shared compute jobs
/// span several groups), so both shapes deserialize transparently.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SequencingGroupField {
    /// Single group id
    One(String),
    /// Several group ids for a shared job
    Many(Vec<String>),
}

impl SequencingGroupField {
    fn into_groups(self) -> SequencingGroups {
        match self {
            Self::One(id) => std::iter::once(id)
                .filter(|id| !id.is_empty())
                .map(SequencingGroupId::new)
                .collect(),
            Self::Many(ids) => ids
                .into_iter()
                .filter(|id| !id.is_empty())
                .map(SequencingGroupId::new)
                .collect(),
        }
    }
}

/// One raw record from the billing export, prior to validation
///
/// Every field is optional; which identifying fields are present depends
/// on the backend kind that incurred the cost. The optional `category`
/// field is an explicit backend-kind hint from the export and takes
/// precedence over field-presence inference when it names a known kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCostRecord {
    /// Owning analysis run
    pub ar_guid: Option<String>,
    /// Explicit backend-kind label, when the export provides one
    pub category: Option<String>,
    /// Batch identifier (batch kind)
    pub batch_id: Option<String>,
    /// Job identifier within a batch
    pub job_id: Option<String>,
    /// Dataproc cluster name
    pub dataproc_cluster: Option<String>,
    /// WDL task name
    pub wdl_task_name: Option<String>,
    /// Cromwell sub-workflow name
    pub cromwell_sub_workflow_name: Option<String>,
    /// Cromwell workflow identifier
    pub cromwell_workflow_id: Option<String>,
    /// Billing SKU
    pub sku: Option<String>,
    /// Cost category (e.g. "Compute", "Storage")
    pub cost_category: Option<String>,
    /// Cost in AUD
    pub cost: Option<f64>,
    /// Usage start instant
    pub usage_start_time: Option<DateTime<Utc>>,
    /// Usage end instant
    pub usage_end_time: Option<DateTime<Utc>>,
    /// Sequencing group attribution
    pub sequencing_group: Option<SequencingGroupField>,
    /// Pipeline stage
    pub stage: Option<String>,
    /// Billing topic
    pub topic: Option<String>,
}

impl RawCostRecord {
    /// Resolve the compute resource this record belongs to
    ///
    /// Never fails: records matching no known backend kind resolve to
    /// [`CostResource::Unknown`] so a single odd record cannot fail a
    /// whole response.
    fn resolve_resource(&self) -> CostResource {
        if let Some(category) = &self.category
            && let Ok(kind) = category.parse::<crate::types::BackendKind>()
        {
            if let Some(resource) = self.resource_for_kind(kind) {
                return resource;
            }
            debug!(
                category = %category,
                "backend-kind hint present but its identifying field is missing"
            );
        }

        // Field-presence inference, most specific first.
        if let Some(batch_id) = &self.batch_id {
            return CostResource::Batch {
                batch_id: BatchId::new(batch_id.clone()),
                job_id: self.job_id.clone(),
            };
        }
        if let Some(cluster) = &self.dataproc_cluster {
            return CostResource::Dataproc {
                cluster: cluster.clone(),
            };
        }
        if let Some(task_name) = &self.wdl_task_name {
            return CostResource::WdlTask {
                task_name: task_name.clone(),
            };
        }
        if let Some(name) = &self.cromwell_sub_workflow_name {
            return CostResource::CromwellSubWorkflow { name: name.clone() };
        }
        if let Some(workflow_id) = &self.cromwell_workflow_id {
            return CostResource::CromwellWorkflow {
                workflow_id: workflow_id.clone(),
            };
        }

        CostResource::Unknown {
            path: self
                .category
                .iter()
                .chain(self.job_id.iter())
                .cloned()
                .collect(),
        }
    }

    fn resource_for_kind(&self, kind: crate::types::BackendKind) -> Option<CostResource> {
        use crate::types::BackendKind;
        match kind {
            BackendKind::Batch => self.batch_id.as_ref().map(|batch_id| CostResource::Batch {
                batch_id: BatchId::new(batch_id.clone()),
                job_id: self.job_id.clone(),
            }),
            BackendKind::Dataproc => {
                self.dataproc_cluster
                    .as_ref()
                    .map(|cluster| CostResource::Dataproc {
                        cluster: cluster.clone(),
                    })
            }
            BackendKind::WdlTask => {
                self.wdl_task_name
                    .as_ref()
                    .map(|task_name| CostResource::WdlTask {
                        task_name: task_name.clone(),
                    })
            }
            BackendKind::CromwellSubWorkflow => self
                .cromwell_sub_workflow_name
                .as_ref()
                .map(|name| CostResource::CromwellSubWorkflow { name: name.clone() }),
            BackendKind::CromwellWorkflow => {
                self.cromwell_workflow_id
                    .as_ref()
                    .map(|workflow_id| CostResource::CromwellWorkflow {
                        workflow_id: workflow_id.clone(),
                    })
            }
            BackendKind::Unknown => None,
        }
    }
}

/// Validate and coerce one raw record into a [`CostEntry`]
///
/// Rejects with [`GencostError::MalformedRecord`] when `cost` is missing,
/// negative, or non-finite, or when both usage bounds are absent. All
/// other shape oddities are coerced: unknown entity paths map to the
/// `unknown` backend kind and a missing SKU becomes the literal
/// `"unknown"` SKU.
pub fn normalize(raw: RawCostRecord) -> Result<CostEntry> {
    let cost_aud = raw.cost.ok_or_else(|| GencostError::MalformedRecord {
        reason: "cost is missing".to_string(),
    })?;
    if !cost_aud.is_finite() {
        return Err(GencostError::MalformedRecord {
            reason: format!("cost is not a finite number: {cost_aud}"),
        });
    }
    if cost_aud < 0.0 {
        return Err(GencostError::MalformedRecord {
            reason: format!("cost is negative: {cost_aud}"),
        });
    }

    let period = match (raw.usage_start_time, raw.usage_end_time) {
        (None, None) => {
            return Err(GencostError::MalformedRecord {
                reason: "both usage_start_time and usage_end_time are absent".to_string(),
            });
        }
        // A single known bound degenerates to an instant.
        (Some(start), None) => UsagePeriod::new(start, start),
        (None, Some(end)) => UsagePeriod::new(end, end),
        (Some(start), Some(end)) => UsagePeriod::new(start, end),
    };

    let sku = match raw.sku {
        Some(ref sku) if !sku.is_empty() => Sku::new(sku.clone()),
        _ => {
            debug!("record has no SKU, coercing to \"unknown\"");
            Sku::new("unknown")
        }
    };

    let resource = raw.resolve_resource();

    Ok(CostEntry {
        ar_guid: raw.ar_guid.map(ArGuid::new),
        resource,
        sku,
        cost_category: raw.cost_category,
        cost_aud,
        period: Some(period),
        sequencing_groups: raw
            .sequencing_group
            .map(SequencingGroupField::into_groups)
            .unwrap_or_default(),
        stage: raw.stage,
        topic: raw.topic,
    })
}

/// Normalize a batch of raw records, dropping the malformed ones
///
/// Implements the recommended drop-and-continue policy: each rejected
/// record is logged and counted, and the survivors are returned. Callers
/// that must abort on any malformed record should call [`normalize`]
/// per record instead.
pub fn normalize_lossy(
    records: impl IntoIterator<Item = RawCostRecord>,
) -> (Vec<CostEntry>, usize) {
    let mut entries = Vec::new();
    let mut dropped = 0usize;

    for raw in records {
        match normalize(raw) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                warn!(error = %err, "dropping malformed cost record");
                dropped += 1;
            }
        }
    }

    (entries, dropped)
}

/// Parse a JSON array of raw records as handed over by the fetch layer
pub fn parse_records(json: &str) -> Result<Vec<RawCostRecord>> {
    Ok(serde_json::from_str(json)?)
}
