//! Merge rules applied while layering configuration sources.

pub mod merge_policy;
