//! # stagetrack
//!
//! Post-processing of photogrammetric displacement-measurement exports into
//! per-point trajectories across measurement stages.
//!
//! A structural test is recorded as a series of **stages**; at each stage the
//! measurement device reports an unordered cloud of 3D points, with no stable
//! point identity from one stage to the next. This crate reconstructs, for
//! every point of a chosen reference stage, its trajectory through all
//! subsequent stages using a greedy nearest-neighbor search with a distance
//! tolerance, then cleans, slices, and evaluates the resulting histories.
//!
//! ## Pipeline
//!
//! 1. [`in_out::read_export`] – parse the device's text export,
//! 2. [`observations::group_by_stage`] – one point cloud per stage,
//! 3. [`tracking::trajectory::find_points_from_stage`] – per-point
//!    trajectories with gap handling,
//! 4. [`history::split_history`] – coordinate-only and distance-only
//!    projections,
//! 5. [`history`] cleaners and [`history::split_into_cycles`] – drop
//!    corrupted points, slice into load cycles,
//! 6. [`evaluate`] – displacement statistics, normalization, color ramp.

pub mod constants;
pub mod evaluate;
pub mod history;
pub mod in_out;
pub mod observations;
pub mod stagetrack_errors;
pub mod tracking;

pub use constants::{CoordinateMap, DistanceMap, Position, StageClouds, StageIndex};
pub use stagetrack_errors::StageTrackError;
pub use tracking::matcher::{closest_point_in_cloud, PointMatch, StageMatch};
pub use tracking::trajectory::{
    find_points_between_stages, find_points_from_stage, PointId, Trajectory, TrajectorySet,
    TrajectorySetExt,
};
pub use tracking::{MatchPolicy, TrackParams};
