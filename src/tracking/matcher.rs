//! Nearest-neighbor queries against a point cloud.
//!
//! The matcher is a plain linear scan: the measurement stages hold a few
//! hundred points at most, so an acceleration structure would not pay for its
//! construction. Ties on the minimum distance resolve to the first candidate
//! encountered, which makes the result stable under the cloud's iteration
//! order.

use crate::constants::{Millimeter, PointCloud, Position};
use crate::stagetrack_errors::StageTrackError;

/// A successful nearest-neighbor query result.
///
/// # Fields
///
/// * `distance` - Euclidean distance from the query to the matched candidate, in millimetres
/// * `position` - the matched candidate's location
/// * `index` - index of the matched candidate within the queried cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMatch {
    pub distance: Millimeter,
    pub position: Position,
    pub index: usize,
}

/// Outcome of one tracked stage: either a real correspondence or a gap.
///
/// `Gap` replaces the legacy `(0.0, (0.0, 0.0, 0.0), 0)` sentinel of the
/// original export pipeline, which could not be told apart from a legitimate
/// zero-distance match at the origin. The sentinel encoding only reappears
/// when a history is projected for export, see
/// [`split_history`](crate::history::split_history).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageMatch {
    /// The nearest neighbor was accepted as the corresponding point.
    Matched(PointMatch),
    /// No candidate lay within tolerance; the point is lost at this stage.
    Gap,
}

impl StageMatch {
    /// The matched record, if any.
    pub fn as_matched(&self) -> Option<&PointMatch> {
        match self {
            StageMatch::Matched(m) => Some(m),
            StageMatch::Gap => None,
        }
    }

    /// Whether this stage recorded a gap.
    pub fn is_gap(&self) -> bool {
        matches!(self, StageMatch::Gap)
    }
}

/// Find the candidate closest to `query`.
///
/// Scans every candidate, computing Euclidean distances, and returns the
/// minimum-distance one together with its distance and its index in
/// `candidates`. Ties: the first minimum encountered wins.
///
/// Arguments
/// ---------
/// * `query`: the point to match
/// * `candidates`: the cloud to search
///
/// Return
/// ------
/// * `Ok(PointMatch)` - the closest candidate
/// * `Err(StageTrackError::EmptyCandidateSet)` - `candidates` is empty
pub fn closest_point_in_cloud(
    query: &Position,
    candidates: &PointCloud,
) -> Result<PointMatch, StageTrackError> {
    let mut best: Option<PointMatch> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let distance = (candidate - query).norm();
        let better = match &best {
            Some(current) => distance < current.distance,
            None => true,
        };
        if better {
            best = Some(PointMatch {
                distance,
                position: *candidate,
                index,
            });
        }
    }

    best.ok_or(StageTrackError::EmptyCandidateSet)
}
