//! History projection, cleaning, and cycle slicing.
//!
//! Overview
//! -----------------
//! Once trajectories are built, downstream consumers (JSON export, plotting,
//! viewport drawing) want plain per-point sequences rather than the
//! [`StageMatch`] enum. [`split_history`] projects a
//! [`TrajectorySet`](crate::tracking::trajectory::TrajectorySet) onto the
//! string-keyed export surface: a [`CoordinateMap`] (position per stage) and a
//! [`DistanceMap`] (nearest-neighbor distance per stage). Gaps project to the
//! legacy sentinel values ([`GAP_DISTANCE`], origin position), which is what
//! the export format has always used.
//!
//! The cleaning utilities operate on that export surface, because cleaning
//! typically happens on data read back from JSON where the gap/real-zero
//! distinction is already lost. Detection is exact floating-point equality
//! against the sentinel: a legitimate point measured exactly at the origin is
//! indistinguishable from a gap here. When the `TrajectorySet` is still at
//! hand, prefer
//! [`TrajectorySetExt::remove_gap_points`](crate::tracking::trajectory::TrajectorySetExt::remove_gap_points),
//! which has no such ambiguity.
//!
//! [`split_into_cycles`] slices every history into named `[start, stop)`
//! stage ranges, one per load cycle of the test.

use ahash::RandomState;
use std::collections::HashMap;
use std::ops::Range;

use crate::constants::{
    gap_position, CoordinateMap, CycleName, DistanceMap, PointKey, Position, StageIndex,
    GAP_DISTANCE,
};
use crate::stagetrack_errors::StageTrackError;
use crate::tracking::matcher::StageMatch;
use crate::tracking::trajectory::TrajectorySet;

/// Named half-open stage ranges, one per load cycle.
pub type CycleRanges = HashMap<CycleName, Range<StageIndex>, RandomState>;

/// Project a trajectory set onto coordinate-only and distance-only histories.
///
/// Every trajectory contributes one entry to each output map, keyed by the
/// rendered reference coordinates
/// ([`Trajectory::coordinate_key`](crate::tracking::trajectory::Trajectory::coordinate_key)).
/// Order and length of the per-stage sequences are preserved exactly; the
/// match's candidate index is discarded. Gaps project to the sentinel pair
/// ([`GAP_DISTANCE`], origin).
///
/// Two reference points with identical coordinates collide on the same key;
/// one silently overwrites the other. This is inherent to the coordinate key
/// space and documented rather than fixed.
///
/// Arguments
/// ---------
/// * `set`: the trajectories to project
///
/// Return
/// ------
/// * `(CoordinateMap, DistanceMap)` with identical key sets
pub fn split_history(set: &TrajectorySet) -> (CoordinateMap, DistanceMap) {
    let mut coordinates = CoordinateMap::default();
    let mut distances = DistanceMap::default();

    for traj in set.values() {
        let mut coord = Vec::with_capacity(traj.matches.len());
        let mut disp = Vec::with_capacity(traj.matches.len());

        for m in &traj.matches {
            match m {
                StageMatch::Matched(pm) => {
                    coord.push(pm.position);
                    disp.push(pm.distance);
                }
                StageMatch::Gap => {
                    coord.push(gap_position());
                    disp.push(GAP_DISTANCE);
                }
            }
        }

        let key = traj.coordinate_key();
        coordinates.insert(key.clone(), coord);
        distances.insert(key, disp);
    }

    (coordinates, distances)
}

/// Parse an export key `"(x, y, z)"` back into a position.
///
/// Arguments
/// ---------
/// * `key`: the rendered coordinates of a reference point
///
/// Return
/// ------
/// * `Ok(Position)` - the parsed coordinates
/// * `Err(StageTrackError::InvalidPointKey)` - the key does not hold exactly
///   three numbers
pub fn key_to_coordinates(key: &str) -> Result<Position, StageTrackError> {
    let stripped = key.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = stripped.split(',').collect();
    if parts.len() != 3 {
        return Err(StageTrackError::InvalidPointKey(key.to_string()));
    }

    let mut coords = [0.0_f64; 3];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<f64>()
            .map_err(|_| StageTrackError::InvalidPointKey(key.to_string()))?;
    }

    Ok(Position::new(coords[0], coords[1], coords[2]))
}

/// Find the stage offsets at which any coordinate history holds the sentinel.
///
/// Scans every sequence for positions exactly equal to `sentinel` and
/// collects the offsets where they occur, deduplicated and sorted.
///
/// Arguments
/// ---------
/// * `coordinates`: coordinate histories, typically read back from export
/// * `sentinel`: the marker standing for a missing point (origin in the
///   historical format)
///
/// Return
/// ------
/// * sorted, deduplicated stage offsets containing at least one sentinel
pub fn find_corrupted_stages(
    coordinates: &CoordinateMap,
    sentinel: &Position,
) -> Vec<StageIndex> {
    let mut stages: Vec<StageIndex> = coordinates
        .values()
        .flat_map(|history| {
            history
                .iter()
                .enumerate()
                .filter(|(_, position)| *position == sentinel)
                .map(|(offset, _)| offset)
        })
        .collect();

    stages.sort_unstable();
    stages.dedup();
    stages
}

/// Find the keys whose coordinate history holds the sentinel at least once.
///
/// Arguments
/// ---------
/// * `coordinates`: coordinate histories, typically read back from export
/// * `sentinel`: the marker standing for a missing point
///
/// Return
/// ------
/// * sorted keys of the corrupted points
pub fn find_corrupted_points(coordinates: &CoordinateMap, sentinel: &Position) -> Vec<PointKey> {
    let mut keys: Vec<PointKey> = coordinates
        .iter()
        .filter(|(_, history)| history.iter().any(|position| position == sentinel))
        .map(|(key, _)| key.clone())
        .collect();

    keys.sort_unstable();
    keys
}

/// Delete the listed keys from a history map, in place.
///
/// Deletion stops at the first absent key; keys listed before it have already
/// been removed when the error is returned.
///
/// Arguments
/// ---------
/// * `keys`: the keys to delete
/// * `map`: any per-point history map (coordinates, distances, colors)
///
/// Return
/// ------
/// * `Err(StageTrackError::KeyNotFound)` - a listed key is absent from the map
pub fn remove_points<T>(
    keys: &[PointKey],
    map: &mut HashMap<PointKey, Vec<T>, RandomState>,
) -> Result<(), StageTrackError> {
    for key in keys {
        map.remove(key)
            .ok_or_else(|| StageTrackError::KeyNotFound(key.clone()))?;
    }
    Ok(())
}

/// Slice every history into named stage ranges, one map per load cycle.
///
/// For each `(name, start..stop)` in `cycles`, builds a new map holding every
/// key's sequence restricted to `[start, stop)`. `stop` is exclusive; ranges
/// reaching past a sequence's end are clamped to its length, and an inverted
/// range yields empty sequences — the slicing semantics of the original
/// export pipeline.
///
/// Arguments
/// ---------
/// * `map`: any per-point history map
/// * `cycles`: named `[start, stop)` stage ranges
///
/// Return
/// ------
/// * one sliced copy of `map` per cycle name
pub fn split_into_cycles<T: Clone>(
    map: &HashMap<PointKey, Vec<T>, RandomState>,
    cycles: &CycleRanges,
) -> HashMap<CycleName, HashMap<PointKey, Vec<T>, RandomState>> {
    let mut out: HashMap<CycleName, HashMap<PointKey, Vec<T>, RandomState>> = HashMap::new();

    for (name, range) in cycles {
        let mut sliced: HashMap<PointKey, Vec<T>, RandomState> = HashMap::default();
        for (key, history) in map {
            let start = range.start.min(history.len());
            let stop = range.end.min(history.len()).max(start);
            sliced.insert(key.clone(), history[start..stop].to_vec());
        }
        out.insert(name.clone(), sliced);
    }

    out
}
