//! Grid controller: computes the desired order ladder each tick and
//! diffs it against the outstanding ladder to produce place/cancel
//! actions.

pub mod controller;
pub mod error;
pub mod plan;

pub use controller::{diff_ladder, CycleReport, GridEngine, LadderDiff, PaceConfig};
pub use error::{GridError, GridResult};
pub use plan::{build_plan, side_split, GridConfig, GridPlan};
