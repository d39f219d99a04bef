//! The batch manifest maps array task indices to work units
//!
//! One line per work unit, whitespace separated fields, written once by
//! plan and read-only afterwards. Line order is load-bearing: the task
//! with array index i owns line i + 1 and no other.

/// The work unit record type and its strict line parser
pub mod record;

/// Scan URL-list directories and write the manifest
pub mod build;

/// Count units and resolve one task's line
pub mod read;
