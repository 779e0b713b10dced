//! # Point-correspondence tracking parameters
//!
//! This module defines the [`TrackParams`] configuration struct and its
//! builder, which control how the nearest-neighbor trajectory builder decides
//! between a real correspondence and a gap, and whether matched candidates are
//! consumed.
//!
//! ## Purpose
//!
//! [`TrackParams`] centralizes the tunable parameters used by
//! [`find_points_between_stages`](crate::tracking::trajectory::find_points_between_stages)
//! and
//! [`find_points_from_stage`](crate::tracking::trajectory::find_points_from_stage):
//!
//! - The distance tolerance separating a correspondence from a gap,
//! - The candidate consumption policy ([`MatchPolicy`]),
//! - An optional stage cutoff past which out-of-tolerance matches are kept.
//!
//! Tolerances are dataset-specific (historical runs of the source datasets
//! used 30, 40, 50 and 60 mm at different call sites), so the tolerance is
//! always caller-supplied and there is no default constant.
//!
//! ## Example
//!
//! ```rust
//! use stagetrack::tracking::{MatchPolicy, TrackParams};
//!
//! let params = TrackParams::builder()
//!     .tolerance(50.0)
//!     .policy(MatchPolicy::ConsumeMatched)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.tolerance, 50.0);
//! ```

use crate::constants::{Millimeter, StageIndex};
use crate::stagetrack_errors::StageTrackError;

pub mod matcher;
pub mod trajectory;

/// Policy deciding whether a matched candidate stays available for later
/// reference points.
///
/// The two historical variants of the tracking algorithm disagree on this, so
/// the choice is explicit:
///
/// * [`MatchPolicy::KeepCandidates`] – every query sees the full candidate
///   cloud. Two reference points may claim the same destination point
///   (many-to-one matches are possible and not deduplicated).
/// * [`MatchPolicy::ConsumeMatched`] – each successful match removes the
///   matched candidate from the stage before the next reference point is
///   processed. Destinations are claimed at most once, at the cost of making
///   the result dependent on the processing order of reference points.
///   Consumption happens on a scoped copy of the clouds; the caller's
///   [`StageClouds`](crate::constants::StageClouds) is never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    #[default]
    KeepCandidates,
    ConsumeMatched,
}

/// Configuration for the nearest-neighbor trajectory builder.
///
/// Fields
/// -----------------
/// * `tolerance` – maximum distance (mm) between a reference point and its
///   nearest neighbor for the pair to count as a correspondence. Beyond it, a
///   gap is recorded instead.
/// * `policy` – candidate consumption policy, see [`MatchPolicy`].
/// * `gap_stage_cutoff` – when `Some(c)`, the tolerance check only applies to
///   the first `c` tracked stages; from stage offset `c` on, the nearest
///   neighbor is kept even when it lies beyond the tolerance. Historical runs
///   hardcoded `c = 122` for one dataset; the default is `None` (tolerance
///   applies everywhere).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParams {
    pub tolerance: Millimeter,
    pub policy: MatchPolicy,
    pub gap_stage_cutoff: Option<StageIndex>,
}

impl TrackParams {
    /// Create a new [`TrackParamsBuilder`].
    ///
    /// The tolerance has no default and must be set before `build()`.
    pub fn builder() -> TrackParamsBuilder {
        TrackParamsBuilder::new()
    }

    /// Whether an out-of-tolerance nearest neighbor at tracked-stage offset
    /// `offset` is replaced by a gap.
    pub(crate) fn gap_applies(&self, offset: StageIndex) -> bool {
        match self.gap_stage_cutoff {
            Some(cutoff) => offset < cutoff,
            None => true,
        }
    }
}

/// Builder for [`TrackParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct TrackParamsBuilder {
    tolerance: Option<Millimeter>,
    policy: MatchPolicy,
    gap_stage_cutoff: Option<StageIndex>,
}

impl TrackParamsBuilder {
    /// Create a new builder with no tolerance set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum correspondence distance in millimetres. Mandatory.
    pub fn tolerance(mut self, v: Millimeter) -> Self {
        self.tolerance = Some(v);
        self
    }

    /// Candidate consumption policy. Defaults to [`MatchPolicy::KeepCandidates`].
    pub fn policy(mut self, v: MatchPolicy) -> Self {
        self.policy = v;
        self
    }

    /// Stage offset past which out-of-tolerance matches are kept. Defaults to
    /// `None` (tolerance applies at every stage).
    pub fn gap_stage_cutoff(mut self, v: StageIndex) -> Self {
        self.gap_stage_cutoff = Some(v);
        self
    }

    /// Validate and build the [`TrackParams`].
    ///
    /// Return
    /// ------
    /// * `Err(StageTrackError::InvalidTrackParams)` if the tolerance is
    ///   missing, non-finite, or not strictly positive.
    pub fn build(self) -> Result<TrackParams, StageTrackError> {
        let tolerance = self.tolerance.ok_or_else(|| {
            StageTrackError::InvalidTrackParams("tolerance must be set".to_string())
        })?;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(StageTrackError::InvalidTrackParams(format!(
                "tolerance must be finite and > 0, got {tolerance}"
            )));
        }

        Ok(TrackParams {
            tolerance,
            policy: self.policy,
            gap_stage_cutoff: self.gap_stage_cutoff,
        })
    }
}
