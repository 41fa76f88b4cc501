//! Core domain types for gencost
//!
//! This module contains the fundamental types used throughout the gencost
//! library. These types provide strong typing for common concepts like
//! analysis-run GUIDs, batch identifiers, sequencing groups, SKUs, and
//! pre-bucketed time labels.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Strongly-typed analysis-runner GUID
///
/// Identifies one analysis-runner invocation; it is the root of a cost
/// rollup tree.
///
/// # Examples
/// ```
/// use gencost::types::ArGuid;
///
/// let ar = ArGuid::new("f1b2c3d4-0000-4000-8000-1234567890ab");
/// assert_eq!(ar.as_str(), "f1b2c3d4-0000-4000-8000-1234567890ab");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArGuid(String);

impl ArGuid {
    /// Create a new ArGuid from any string-like type
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed batch identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(String);

impl BatchId {
    /// Create a new BatchId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed sequencing group identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequencingGroupId(String);

impl SequencingGroupId {
    /// Create a new SequencingGroupId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequencingGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SequencingGroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strongly-typed billing SKU
///
/// A SKU is the billing line-item/service identifier from the underlying
/// cloud cost export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    /// Create a new Sku
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pre-bucketed date label for time series
///
/// The fetch layer supplies already-bucketed dates (e.g. one per calendar
/// day or month); this type only labels the bucket, it never re-buckets.
///
/// # Examples
/// ```
/// use gencost::types::BucketDate;
///
/// let month = BucketDate::parse("2024-03").unwrap();
/// assert_eq!(month.format("%Y-%m"), "2024-03");
///
/// let day = BucketDate::parse("2024-03-15").unwrap();
/// assert!(month < day);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketDate(NaiveDate);

impl BucketDate {
    /// Create a new BucketDate
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Get the inner NaiveDate
    pub fn inner(&self) -> &NaiveDate {
        &self.0
    }

    /// Parse a bucket label in `YYYY-MM-DD` or `YYYY-MM` form
    ///
    /// Month labels resolve to the first day of the month.
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Ok(Self(date));
        }
        Err(crate::error::GencostError::InvalidDate(s.to_string()))
    }

    /// Format with a chrono format string
    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }
}

impl fmt::Display for BucketDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Compute backend that incurred a cost
///
/// Discriminates where in the platform a billable unit ran: the batch/job
/// engine, a Dataproc cluster, a WDL task, or a Cromwell (sub-)workflow.
/// Entity paths that match none of these land in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Batch/job engine
    Batch,
    /// Dataproc cluster
    Dataproc,
    /// WDL task
    WdlTask,
    /// Cromwell sub-workflow
    CromwellSubWorkflow,
    /// Cromwell workflow
    CromwellWorkflow,
    /// Unrecognized entity path
    Unknown,
}

impl BackendKind {
    /// All kinds in the fixed bucket order used by the rollup tree
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Batch,
        BackendKind::Dataproc,
        BackendKind::WdlTask,
        BackendKind::CromwellSubWorkflow,
        BackendKind::CromwellWorkflow,
        BackendKind::Unknown,
    ];

    /// Stable string form, matching the billing export labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Dataproc => "dataproc",
            Self::WdlTask => "wdl_task",
            Self::CromwellSubWorkflow => "cromwell_sub_workflow",
            Self::CromwellWorkflow => "cromwell_workflow",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "dataproc" => Ok(Self::Dataproc),
            "wdl_task" => Ok(Self::WdlTask),
            "cromwell_sub_workflow" => Ok(Self::CromwellSubWorkflow),
            "cromwell_workflow" => Ok(Self::CromwellWorkflow),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid backend kind: {s}")),
        }
    }
}

/// The compute resource a cost entry is attributed to
///
/// Raw billing records carry different identifying fields depending on the
/// backend that incurred the cost; this tagged union captures exactly the
/// fields each kind provides, so downstream grouping pattern-matches on
/// the variant instead of null-checking optional columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostResource {
    /// Batch engine cost; `job_id` is absent for batch driver/overhead entries
    Batch {
        batch_id: BatchId,
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
    /// Dataproc cluster cost
    Dataproc { cluster: String },
    /// WDL task cost
    WdlTask { task_name: String },
    /// Cromwell sub-workflow cost
    CromwellSubWorkflow { name: String },
    /// Cromwell workflow cost
    CromwellWorkflow { workflow_id: String },
    /// Entity path that matched no known backend kind
    Unknown { path: Vec<String> },
}

impl CostResource {
    /// The backend kind this resource belongs to
    pub fn backend_kind(&self) -> BackendKind {
        match self {
            Self::Batch { .. } => BackendKind::Batch,
            Self::Dataproc { .. } => BackendKind::Dataproc,
            Self::WdlTask { .. } => BackendKind::WdlTask,
            Self::CromwellSubWorkflow { .. } => BackendKind::CromwellSubWorkflow,
            Self::CromwellWorkflow { .. } => BackendKind::CromwellWorkflow,
            Self::Unknown { .. } => BackendKind::Unknown,
        }
    }
}

/// Closed usage interval of a cost entry or rollup node
///
/// # Examples
/// ```
/// use gencost::types::UsagePeriod;
/// use chrono::{TimeZone, Utc};
///
/// let a = UsagePeriod::new(
///     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap(),
/// );
/// let b = UsagePeriod::new(
///     Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
/// );
/// let merged = a.union(&b);
/// assert_eq!(merged.start, a.start);
/// assert_eq!(merged.end, b.end);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePeriod {
    /// Start of usage (inclusive)
    pub start: DateTime<Utc>,
    /// End of usage (inclusive)
    pub end: DateTime<Utc>,
}

impl UsagePeriod {
    /// Create a new UsagePeriod, reordering reversed bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Smallest period covering both inputs (min start, max end)
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Merge two optional periods, unioning when both are present
pub fn union_periods(a: Option<UsagePeriod>, b: Option<UsagePeriod>) -> Option<UsagePeriod> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Per-entry sequencing group list
///
/// Most entries are attributed to zero or one sequencing group; shared
/// compute jobs span a handful. SmallVec keeps the common cases inline.
pub type SequencingGroups = SmallVec<[SequencingGroupId; 1]>;

/// Canonical, validated cost entry
///
/// One billable unit after normalization. All rollups and breakdowns in
/// this crate consume this shape; raw export records are coerced into it
/// by [`crate::normalize`].
///
/// # Examples
/// ```
/// use gencost::types::{BatchId, CostEntry, CostResource, Sku};
///
/// let entry = CostEntry {
///     ar_guid: None,
///     resource: CostResource::Batch {
///         batch_id: BatchId::new("4213"),
///         job_id: Some("align".to_string()),
///     },
///     sku: Sku::new("compute-n2-preemptible"),
///     cost_category: Some("Compute".to_string()),
///     cost_aud: 1.25,
///     period: None,
///     sequencing_groups: Default::default(),
///     stage: None,
///     topic: None,
/// };
/// assert_eq!(entry.resource.backend_kind().as_str(), "batch");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Owning analysis run, when the record carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ar_guid: Option<ArGuid>,
    /// Compute resource the cost is attributed to
    pub resource: CostResource,
    /// Billing SKU
    pub sku: Sku,
    /// Cost category from the export (e.g. "Compute", "Storage")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_category: Option<String>,
    /// Cost in AUD, full precision, never negative
    pub cost_aud: f64,
    /// Usage time bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<UsagePeriod>,
    /// Sequencing groups this entry is attributed to (empty = unattributed)
    pub sequencing_groups: SequencingGroups,
    /// Pipeline stage (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Billing topic (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Value mode for normalized time series
///
/// Controls whether stacked series carry absolute values or per-point
/// fractions summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueMode {
    /// Keep values as supplied
    Absolute,
    /// Rescale each point so its values sum to 1.0
    Percentage,
}

impl Default for ValueMode {
    fn default() -> Self {
        Self::Absolute
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Percentage => write!(f, "percentage"),
        }
    }
}

impl std::str::FromStr for ValueMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absolute" => Ok(Self::Absolute),
            "percentage" => Ok(Self::Percentage),
            _ => Err(format!("Invalid value mode: {s}")),
        }
    }
}
