//! Measured point observations and stage grouping.
//!
//! Overview
//! -----------------
//! This module defines the [`Observation`] value type (one measured sample of
//! one point at one stage) and the grouping step that turns a flat, file-ordered
//! list of observations into per-stage point clouds ([`StageClouds`]).
//!
//! The measurement system emits all rows of a stage consecutively, so grouping
//! is a single linear pass over contiguous runs of equal stage numbers. A stage
//! number reappearing after a different stage has been seen means the export is
//! malformed and grouping fails with
//! [`StageTrackError::NonContiguousStage`] rather than silently producing
//! partial groups.
//!
//! A second, rounding-tolerant grouping strategy is available through
//! [`group_by_geometric_key`]: observations are keyed by their coordinates
//! rounded to a coarse base, which groups re-measurements of the same physical
//! point regardless of stage.

use itertools::Itertools;
use std::collections::HashMap;

use crate::constants::{Millimeter, Position, Seconds, StageClouds, StageIndex};
use crate::stagetrack_errors::StageTrackError;

/// One measured sample: a point seen at a given stage of the test.
///
/// # Fields
///
/// * `stage` - Index of the measurement stage the sample belongs to
/// * `time` - Stage time in seconds since the start of the test
/// * `position` - Measured location in millimetres
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub stage: StageIndex,
    pub time: Seconds,
    pub position: Position,
}

impl Observation {
    /// Create a new observation.
    ///
    /// Arguments
    /// ---------
    /// * `stage`: the stage index the sample was measured at
    /// * `time`: the stage time in seconds
    /// * `position`: the measured location in millimetres
    ///
    /// Return
    /// ------
    /// * a new Observation struct
    pub fn new(stage: StageIndex, time: Seconds, position: Position) -> Self {
        Observation {
            stage,
            time,
            position,
        }
    }
}

/// Parse one whitespace-delimited row of a displacement export.
///
/// The export schema is:
///
/// ```text
/// label | stage | stage time | ID/Name | X | Y | Z | ...
/// ```
///
/// Only fields 1–2 (stage, time) and 4–6 (X, Y, Z) are consumed; the stage is
/// written as a float and truncated to an integer index. Trailing fields
/// (displacement components already computed by the device) are ignored.
///
/// Arguments
/// ---------
/// * `line`: one row of the export file
///
/// Return
/// ------
/// * the parsed [`Observation`], or an error describing the malformed field
pub(crate) fn from_export_line(line: &str) -> Result<Observation, StageTrackError> {
    const MIN_FIELDS: usize = 7;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(StageTrackError::ExportLineTooShort {
            line: line.to_string(),
            found: fields.len(),
            expected: MIN_FIELDS,
        });
    }

    let parse = |idx: usize| -> Result<f64, StageTrackError> {
        fields[idx]
            .parse::<f64>()
            .map_err(|_| StageTrackError::InvalidExportField {
                field: idx,
                value: fields[idx].to_string(),
            })
    };

    let stage = parse(1)?.trunc() as StageIndex;
    let time = parse(2)?;
    let (x, y, z) = (parse(4)?, parse(5)?, parse(6)?);

    Ok(Observation::new(stage, time, Position::new(x, y, z)))
}

/// Group observations into one point cloud per stage.
///
/// The input is expected in file order, with all rows of a stage contiguous.
/// Within a stage, the first-seen order of positions is preserved; it carries
/// no meaning beyond stable iteration.
///
/// Arguments
/// ---------
/// * `observations`: flat list of observations, grouped by contiguous stage
///
/// Return
/// ------
/// * `Ok(StageClouds)` - one entry per encountered stage
/// * `Err(StageTrackError::NonContiguousStage)` - a stage number reappeared
///   after a different stage was seen (interleaved or unsorted export)
pub fn group_by_stage(observations: &[Observation]) -> Result<StageClouds, StageTrackError> {
    let mut clouds = StageClouds::default();

    for (stage, group) in &observations.iter().chunk_by(|obs| obs.stage) {
        let positions: Vec<Position> = group.map(|obs| obs.position).collect();
        if clouds.insert(stage, positions).is_some() {
            return Err(StageTrackError::NonContiguousStage(stage));
        }
    }

    Ok(clouds)
}

/// Round `x` to the nearest multiple of `base`.
///
/// `round_to_multiple(147.2, 50.0)` is `150.0`; `round_to_multiple(-147.2, 50.0)`
/// is `-150.0`.
pub fn round_to_multiple(x: f64, base: f64) -> f64 {
    base * (x / base).round()
}

/// Compute the coarse spatial hash of a position.
///
/// Each coordinate is rounded to the nearest multiple of `base` (millimetres)
/// and the three rounded values are joined into a string key. Points closer
/// than roughly `base / 2` per axis hash to the same key; this is a coarse
/// grouping aid, not an exact identifier.
pub fn geometric_key(position: &Position, base: Millimeter) -> String {
    format!(
        "{},{},{}",
        round_to_multiple(position.x, base),
        round_to_multiple(position.y, base),
        round_to_multiple(position.z, base)
    )
}

/// Group observations by their [`geometric_key`] instead of their stage.
///
/// Unlike [`group_by_stage`], observations sharing a key do not have to be
/// contiguous in the input: all positions hashing to the same key end up in
/// one entry, in first-seen order. Useful to collect re-measurements of the
/// same physical point across stages when stage identity is unreliable.
///
/// Arguments
/// ---------
/// * `observations`: flat list of observations in file order
/// * `base`: rounding base of the spatial hash, in millimetres
///
/// Return
/// ------
/// * mapping from geometric key to all positions hashing to it
pub fn group_by_geometric_key(
    observations: &[Observation],
    base: Millimeter,
) -> HashMap<String, Vec<Position>, ahash::RandomState> {
    let mut groups: HashMap<String, Vec<Position>, ahash::RandomState> = HashMap::default();

    for obs in observations {
        groups
            .entry(geometric_key(&obs.position, base))
            .or_default()
            .push(obs.position);
    }

    groups
}
