//! Resource profile simulation
//!
//! Static per-project resource ranges and the stochastic engine that turns
//! a pipeline configuration and build state into a labelled estimate.

mod engine;
mod table;

pub use engine::ResourceProfileEngine;
pub(crate) use engine::round_to;
pub use table::{
    uniform, Interval, ProfileTable, ResourceProfile, ResourceRange, StageAddition,
    StageProbabilities, PROFILE_TABLE,
};
