//! # Firefuel Algorithms
//!
//! The three transforms of the FM40 update pipeline, each exposed as a
//! pure per-tile function plus a streaming sweep wrapper:
//!
//! - `disturbance`: burn severity → disturbance (DIST) code encoding
//! - `combine`: multi-raster DIST merge by impact ranking
//! - `update`: rule-driven FM40 reclassification
//! - `ruleset`: CSV rule loading and class-label expansion

pub mod combine;
pub mod disturbance;
pub mod ruleset;
pub mod update;

pub use combine::{combine_dist, combine_stack, impact_rank, SENTINEL_RANK};
pub use disturbance::{convert_bs_to_dist, dist_code, encode_tile, time_code, DIST_NODATA};
pub use ruleset::RuleTable;
pub use update::{reclassify, reclassify_tile, update_fm40};
