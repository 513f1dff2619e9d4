//! Batch jobs: guide merging and gap finding

pub mod gap_finder;
pub mod guide_merger;

pub use gap_finder::{GapFinder, GapReport, ProgrammeIndex};
pub use guide_merger::{GuideMerger, MergeSummary};
