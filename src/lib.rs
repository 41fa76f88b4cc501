//! gencost - cost aggregation and time-series normalization for genomics
//! billing dashboards
//!
//! This library is the data-shaping core behind a genomics platform's
//! billing views. It provides functionality to:
//! - Normalize heterogeneous billing export records into canonical cost
//!   entries
//! - Build a hierarchical cost rollup tree for one analysis run, spanning
//!   batches, jobs, Dataproc clusters, WDL tasks, and Cromwell workflows
//! - Allocate costs across sequencing groups
//! - Collate dated rows into chart-ready time series with continuity
//!   padding and optional percentage normalization
//!
//! It does not fetch data, render charts, or persist anything: every
//! operation is a pure, synchronous function over an already-fetched
//! record set, and outputs are read-only snapshots the caller discards on
//! the next query.
//!
//! # Examples
//!
//! ```
//! use gencost::{
//!     normalize::{normalize_lossy, parse_records},
//!     rollup::build_tree,
//!     types::ArGuid,
//! };
//!
//! # fn main() -> gencost::Result<()> {
//! let records = parse_records(
//!     r#"[{
//!         "ar_guid": "run-1",
//!         "batch_id": "4213",
//!         "job_id": "align",
//!         "sku": "compute-n2",
//!         "cost": 1.25,
//!         "usage_start_time": "2024-01-01T00:00:00Z",
//!         "usage_end_time": "2024-01-01T02:00:00Z"
//!     }]"#,
//! )?;
//!
//! let (entries, _dropped) = normalize_lossy(records);
//! let tree = build_tree(&ArGuid::new("run-1"), &entries);
//! assert_eq!(tree.total_cost, 1.25);
//! # Ok(())
//! # }
//! ```

pub mod allocation;
pub mod breakdown;
pub mod error;
pub mod filters;
pub mod normalize;
pub mod rollup;
pub mod timeseries;
pub mod types;

// Re-export commonly used types
pub use error::{GencostError, Result};
pub use rollup::CostNode;
pub use timeseries::{RawPoint, StackedSeries, TimeSeriesPoint};
pub use types::{
    ArGuid, BackendKind, BatchId, BucketDate, CostEntry, CostResource, SequencingGroupId, Sku,
    UsagePeriod, ValueMode,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
