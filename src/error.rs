//! Error types for gencost
//!
//! This module defines the error types used throughout the gencost library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Most operations in this crate are total: empty input produces empty,
//! well-typed output. The only fallible paths are record normalization
//! and series continuity normalization.

use thiserror::Error;

use crate::types::BucketDate;

/// Main error type for gencost operations
#[derive(Error, Debug)]
pub enum GencostError {
    /// A raw cost record failed basic shape/sign checks
    ///
    /// The recommended caller policy is to drop the record and continue,
    /// since partial billing data is more useful than none.
    #[error("malformed cost record: {reason}")]
    MalformedRecord {
        /// What made the record unusable
        reason: String,
    },

    /// A preceding series point already holds a non-zero value for a key
    /// the continuity pass is about to zero-fill
    ///
    /// This indicates a caller-level invariant violation (e.g. duplicate
    /// dates that were never merged by the collator) and is surfaced as a
    /// programming error rather than silently overwritten.
    #[error("continuity conflict at {date}: key `{key}` already holds {existing}")]
    InconsistentContinuity {
        /// Date of the point that would have been zero-filled
        date: BucketDate,
        /// Entity key in conflict
        key: String,
        /// Value already present at that point
        existing: f64,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
}

/// Convenience type alias for Results in gencost
pub type Result<T> = std::result::Result<T, GencostError>;
