//! Trajectory reconstruction across measurement stages.
//!
//! Overview
//! -----------------
//! The measurement device does not guarantee stable point identity between
//! stages: points appear, disappear, and get relabeled. This module rebuilds
//! per-point trajectories out of the per-stage clouds with a greedy
//! nearest-neighbor search:
//!
//! * [`find_points_between_stages`] matches every point of stage `s` against
//!   stage `s + 1`, for all consecutive stage pairs. No cross-stage identity
//!   is kept; the output is one list of [`StageMatch`] per stage pair.
//! * [`find_points_from_stage`] picks a reference stage and follows every one
//!   of its points through all subsequent stages, producing a
//!   [`TrajectorySet`] keyed by [`PointId`].
//!
//! Whenever the nearest neighbor lies beyond the configured tolerance the
//! trajectory records a [`StageMatch::Gap`] for that stage instead of a
//! correspondence.
//!
//! Greedy matching is a heuristic: it does not compute an assignment-optimal
//! correspondence, and under [`MatchPolicy::ConsumeMatched`] the outcome
//! depends on the processing order of the reference points (file order, so
//! results are reproducible for a given export).

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use ahash::RandomState;

use crate::constants::{PointCloud, Position, StageClouds, StageIndex};
use crate::stagetrack_errors::StageTrackError;
use crate::tracking::matcher::{closest_point_in_cloud, StageMatch};
use crate::tracking::{MatchPolicy, TrackParams};

/// Stable identifier of a tracked point: the reference stage it was picked
/// from and its position within that stage's cloud.
///
/// This replaces the stringified-coordinate keys of the original export
/// pipeline, which collide for duplicate coordinates and cannot distinguish a
/// real origin point from a gap sentinel. Coordinate strings remain available
/// for display and export through
/// [`split_history`](crate::history::split_history).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId {
    /// Reference stage the point was observed at.
    pub stage: StageIndex,
    /// Index of the point within the reference stage's cloud.
    pub index: usize,
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}/p{}", self.stage, self.index)
    }
}

/// The tracked history of one reference-stage point.
///
/// `matches` holds one entry per stage after the reference stage, in stage
/// order: entry `k` describes the point's correspondence at stage
/// `reference_stage + 1 + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// The point's position at the reference stage.
    pub reference: Position,
    /// One correspondence or gap per subsequent stage.
    pub matches: SmallVec<[StageMatch; 8]>,
}

impl Trajectory {
    /// Whether any tracked stage recorded a gap.
    pub fn has_gap(&self) -> bool {
        self.matches.iter().any(StageMatch::is_gap)
    }

    /// Render the reference position as an export key, e.g. `"(1, 2.5, 3)"`.
    ///
    /// Inverse of [`key_to_coordinates`](crate::history::key_to_coordinates).
    pub fn coordinate_key(&self) -> String {
        format!(
            "({}, {}, {})",
            self.reference.x, self.reference.y, self.reference.z
        )
    }
}

/// All trajectories reconstructed from one reference stage, keyed by
/// [`PointId`].
pub type TrajectorySet = HashMap<PointId, Trajectory, RandomState>;

/// Convenience queries over a [`TrajectorySet`].
pub trait TrajectorySetExt {
    /// Ids of every trajectory containing at least one gap, in unspecified
    /// order.
    fn gap_point_ids(&self) -> Vec<PointId>;

    /// Remove every trajectory containing at least one gap, returning the
    /// removed ids.
    fn remove_gap_points(&mut self) -> Vec<PointId>;

    /// Total number of stage matches (gaps included) across all trajectories.
    fn total_matches(&self) -> usize;
}

impl TrajectorySetExt for TrajectorySet {
    fn gap_point_ids(&self) -> Vec<PointId> {
        self.iter()
            .filter(|(_, traj)| traj.has_gap())
            .map(|(id, _)| *id)
            .collect()
    }

    fn remove_gap_points(&mut self) -> Vec<PointId> {
        let ids = self.gap_point_ids();
        for id in &ids {
            self.remove(id);
        }
        ids
    }

    #[inline]
    fn total_matches(&self) -> usize {
        self.values().map(|traj| traj.matches.len()).sum()
    }
}

/// Fetch the cloud for `stage` or fail with [`StageTrackError::MissingStage`].
fn cloud_at(clouds: &StageClouds, stage: StageIndex) -> Result<&PointCloud, StageTrackError> {
    clouds
        .get(&stage)
        .ok_or(StageTrackError::MissingStage(stage))
}

/// Match every point of each stage against the next stage.
///
/// For each stage `s` in `0..N-1` and every point `p` of stage `s`, the
/// nearest neighbor in stage `s + 1` is looked up. A neighbor farther than
/// `params.tolerance` is recorded as a [`StageMatch::Gap`].
///
/// No cross-stage identity is maintained: a destination point may be claimed
/// by several stage-`s` points, and `params.policy` is ignored here (the
/// pairwise search never consumes candidates). Stages must be numbered
/// `0..N-1` with no holes.
///
/// Arguments
/// ---------
/// * `clouds`: the per-stage point clouds
/// * `params`: tolerance configuration
///
/// Return
/// ------
/// * `Ok(matches)` - exactly `N - 1` lists; list `s` has one entry per point
///   of stage `s`
/// * `Err(StageTrackError::MissingStage)` - a stage index in `0..N` is absent
/// * `Err(StageTrackError::EmptyCandidateSet)` - a stage holds no points
pub fn find_points_between_stages(
    clouds: &StageClouds,
    params: &TrackParams,
) -> Result<Vec<Vec<StageMatch>>, StageTrackError> {
    let num_stages = clouds.len();
    let mut matches = Vec::with_capacity(num_stages.saturating_sub(1));

    for s in 0..num_stages.saturating_sub(1) {
        let current = cloud_at(clouds, s)?;
        let next = cloud_at(clouds, s + 1)?;

        let mut stage_matches = Vec::with_capacity(current.len());
        for p in current {
            let cpc = closest_point_in_cloud(p, next)?;
            if cpc.distance > params.tolerance {
                stage_matches.push(StageMatch::Gap);
            } else {
                stage_matches.push(StageMatch::Matched(cpc));
            }
        }
        matches.push(stage_matches);
    }

    Ok(matches)
}

/// Follow every point of a reference stage through all subsequent stages.
///
/// Each point `p` of stage `start_stage` is matched against stages
/// `start_stage + 1 .. N` in order. When the nearest neighbor lies beyond
/// `params.tolerance` (and the stage offset is below
/// `params.gap_stage_cutoff`, if set) the trajectory records a
/// [`StageMatch::Gap`].
///
/// Under [`MatchPolicy::ConsumeMatched`] every successful match removes the
/// matched candidate from its stage, so a destination point is claimed by at
/// most one reference point. Consumption operates on a scoped copy: the
/// caller's `clouds` is left intact and a rerun on the same input gives the
/// same result. A stage drained empty by earlier reference points records a
/// gap for the remaining ones. Note that under this policy
/// [`PointMatch::index`](crate::tracking::matcher::PointMatch) refers to the
/// candidate's position among the points still unclaimed at match time, not
/// to its index in the original cloud.
///
/// Arguments
/// ---------
/// * `clouds`: the per-stage point clouds (stages `0..N`, no holes)
/// * `start_stage`: the reference stage to track from
/// * `params`: tolerance, policy, and cutoff configuration
///
/// Return
/// ------
/// * `Ok(TrajectorySet)` - one trajectory per reference point, each with
///   exactly `N - start_stage - 1` matches
/// * `Err(StageTrackError::MissingStage)` - `start_stage` or a subsequent
///   stage index is absent
/// * `Err(StageTrackError::EmptyCandidateSet)` - a queried stage holds no
///   points (only under [`MatchPolicy::KeepCandidates`])
pub fn find_points_from_stage(
    clouds: &StageClouds,
    start_stage: StageIndex,
    params: &TrackParams,
) -> Result<TrajectorySet, StageTrackError> {
    let num_stages = clouds.len();
    let reference_cloud = cloud_at(clouds, start_stage)?;

    // Scoped arena for the consume-on-match policy: one mutable copy per
    // tracked stage, so the caller's clouds stay untouched.
    let mut arena: Option<Vec<PointCloud>> = match params.policy {
        MatchPolicy::ConsumeMatched => {
            let mut copies = Vec::with_capacity(num_stages.saturating_sub(start_stage + 1));
            for s in (start_stage + 1)..num_stages {
                copies.push(cloud_at(clouds, s)?.clone());
            }
            Some(copies)
        }
        MatchPolicy::KeepCandidates => None,
    };

    let mut set = TrajectorySet::default();

    for (index, p) in reference_cloud.iter().enumerate() {
        let mut matches: SmallVec<[StageMatch; 8]> =
            SmallVec::with_capacity(num_stages.saturating_sub(start_stage + 1));

        for s in (start_stage + 1)..num_stages {
            let offset = s - start_stage - 1;

            let stage_match = match arena.as_mut() {
                Some(copies) => {
                    let candidates = &mut copies[offset];
                    if candidates.is_empty() {
                        // All destination points already claimed.
                        StageMatch::Gap
                    } else {
                        let cpc = closest_point_in_cloud(p, candidates)?;
                        if cpc.distance > params.tolerance && params.gap_applies(offset) {
                            StageMatch::Gap
                        } else {
                            candidates.remove(cpc.index);
                            StageMatch::Matched(cpc)
                        }
                    }
                }
                None => {
                    let cpc = closest_point_in_cloud(p, cloud_at(clouds, s)?)?;
                    if cpc.distance > params.tolerance && params.gap_applies(offset) {
                        StageMatch::Gap
                    } else {
                        StageMatch::Matched(cpc)
                    }
                }
            };

            matches.push(stage_match);
        }

        set.insert(
            PointId {
                stage: start_stage,
                index,
            },
            Trajectory {
                reference: *p,
                matches,
            },
        );
    }

    Ok(set)
}
