//! # Constants and type definitions for stagetrack
//!
//! This module centralizes the **unit conventions** and **common type
//! definitions** used throughout the `stagetrack` library. It also defines the
//! container types for organizing measured points and their histories.
//!
//! ## Overview
//!
//! - Unit aliases (millimetres, seconds, stage indices)
//! - Core container aliases used across the crate
//! - The gap-sentinel values used on the export surface
//!
//! These definitions are used by all main modules, including point grouping,
//! trajectory building, and the result cleaning/evaluation utilities.

use ahash::RandomState;
use nalgebra::Point3;
use std::collections::HashMap;

// -------------------------------------------------------------------------------------------------
// Unit aliases
// -------------------------------------------------------------------------------------------------

/// Distance in millimetres (the native unit of the measurement export).
pub type Millimeter = f64;

/// Stage time in seconds since the start of the test.
pub type Seconds = f64;

/// Index of a measurement stage (one discrete snapshot of the test).
pub type StageIndex = usize;

/// A measured location in three-dimensional space, in millimetres.
pub type Position = Point3<f64>;

// -------------------------------------------------------------------------------------------------
// Containers
// -------------------------------------------------------------------------------------------------

/// All positions observed at one stage, in file order.
pub type PointCloud = Vec<Position>;

/// Lookup table from stage index to the point cloud observed at that stage.
pub type StageClouds = HashMap<StageIndex, PointCloud, RandomState>;

/// Export-surface key of a tracked point: the rendered coordinates of its
/// reference-stage position, e.g. `"(981.3, -12.5, 44)"`.
///
/// Two reference points with identical coordinates collide and overwrite each
/// other in any map keyed this way. This is a documented ambiguity of the
/// export format, not something the crate tries to repair; the in-memory
/// tracking API uses [`PointId`](crate::tracking::trajectory::PointId)
/// instead.
pub type PointKey = String;

/// Per-point coordinate history: one position per tracked stage.
pub type CoordinateMap = HashMap<PointKey, Vec<Position>, RandomState>;

/// Per-point displacement history: one distance (mm) per tracked stage.
pub type DistanceMap = HashMap<PointKey, Vec<Millimeter>, RandomState>;

/// An RGB color triple.
pub type Rgb = (u8, u8, u8);

/// Per-point color ramp, parallel to a normalized [`DistanceMap`].
pub type ColorMap = HashMap<PointKey, Vec<Rgb>, RandomState>;

/// Name of a load cycle, e.g. `"c0"`.
pub type CycleName = String;

// -------------------------------------------------------------------------------------------------
// Gap sentinel (export surface only)
// -------------------------------------------------------------------------------------------------

/// Distance value standing in for "no corresponding point found" in exported
/// distance histories.
pub const GAP_DISTANCE: Millimeter = 0.0;

/// Position value standing in for "no corresponding point found" in exported
/// coordinate histories.
///
/// A legitimate point measured exactly at the origin is indistinguishable
/// from this sentinel once the data has been exported. In memory the crate
/// uses [`StageMatch::Gap`](crate::tracking::matcher::StageMatch) instead,
/// which has no such ambiguity.
pub fn gap_position() -> Position {
    Position::origin()
}
