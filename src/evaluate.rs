//! Displacement evaluation, normalization, and the color ramp.
//!
//! Overview
//! -----------------
//! Post-cleaning utilities over the export-surface maps:
//!
//! * [`max_abs_displacement`] locates the largest recorded displacement,
//! * [`displacement_from_origin`] recomputes displacements from the reference
//!   position as an independent cross-check of the matcher's distances,
//! * [`normalize`] rescales distance histories (by a factor or each
//!   sequence's own maximum),
//! * [`evaluate_color_map`] turns normalized displacements into a
//!   green→yellow→red color ramp for viewport drawing.

use crate::constants::{
    ColorMap, CoordinateMap, DistanceMap, Millimeter, PointKey, Rgb, StageIndex,
};
use crate::history::key_to_coordinates;
use crate::stagetrack_errors::StageTrackError;

/// Find the largest displacement across all points and stages.
///
/// Returns the key, the stage offset, and the value of the global maximum
/// over every `(point, stage)` pair. Ties resolve to the smallest key, then
/// the earliest stage, so the result is deterministic.
///
/// Note: the original pipeline selected `max(dict)` — the *lexicographically
/// greatest key* — and only then that key's maximum value, which does not
/// compute a global maximum at all (its own example script remarks on the
/// discrepancy). This implementation computes the evidently intended global
/// maximum; see DESIGN.md.
///
/// Arguments
/// ---------
/// * `distances`: displacement histories
///
/// Return
/// ------
/// * `Some((key, stage, value))` - location and value of the maximum
/// * `None` - the map is empty or every history is empty
pub fn max_abs_displacement(
    distances: &DistanceMap,
) -> Option<(PointKey, StageIndex, Millimeter)> {
    let mut best: Option<(&PointKey, StageIndex, Millimeter)> = None;

    for (key, history) in distances {
        for (stage, &value) in history.iter().enumerate() {
            let better = match &best {
                None => true,
                Some((bk, bs, bv)) => {
                    value > *bv
                        || (value == *bv && (key < *bk || (key == *bk && stage < *bs)))
                }
            };
            if better {
                best = Some((key, stage, value));
            }
        }
    }

    best.map(|(key, stage, value)| (key.clone(), stage, value))
}

/// Recompute each point's displacement from its reference position.
///
/// For every key, parses the reference coordinates back out of the key and
/// measures the Euclidean distance from there to each entry of the
/// coordinate history. This is an independent cross-check of the
/// matcher-reported distances: those measure to the nearest neighbor in the
/// *next queried stage*, while these measure to the fixed reference, so the
/// two legitimately disagree.
///
/// Arguments
/// ---------
/// * `coordinates`: coordinate histories keyed by rendered reference position
///
/// Return
/// ------
/// * `Ok(DistanceMap)` - same key set, one distance per history entry
/// * `Err(StageTrackError::InvalidPointKey)` - a key does not parse back to
///   coordinates
pub fn displacement_from_origin(
    coordinates: &CoordinateMap,
) -> Result<DistanceMap, StageTrackError> {
    let mut distances = DistanceMap::default();

    for (key, history) in coordinates {
        let reference = key_to_coordinates(key)?;
        let disp: Vec<Millimeter> = history
            .iter()
            .map(|position| (position - reference).norm())
            .collect();
        distances.insert(key.clone(), disp);
    }

    Ok(distances)
}

/// Scaling factor for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeFactor {
    /// Divide every value by this fixed factor.
    Value(f64),
    /// Divide each sequence by its own maximum. Sequences whose maximum is
    /// zero (all-gap histories) are left untouched.
    Max,
}

/// Rescale every distance history in place.
///
/// With [`NormalizeFactor::Max`], each sequence ends up in `[0, 1]` with its
/// maximum at exactly 1; a second pass with `Value(1.0)` is a no-op.
///
/// Arguments
/// ---------
/// * `distances`: the histories to rescale
/// * `factor`: fixed divisor or per-sequence maximum
pub fn normalize(distances: &mut DistanceMap, factor: NormalizeFactor) {
    for history in distances.values_mut() {
        let divisor = match factor {
            NormalizeFactor::Value(v) => v,
            NormalizeFactor::Max => {
                let max = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                if max == 0.0 || max == f64::NEG_INFINITY {
                    continue;
                }
                max
            }
        };
        for value in history.iter_mut() {
            *value /= divisor;
        }
    }
}

/// Convert a ratio in `[0, 1]` into an RGB color on a green→yellow→red ramp.
///
/// `0.0` maps to pure green, `0.5` to yellow, `1.0` to pure red; the blue
/// channel is always zero. Ratios rounding to `0.5` at one decimal saturate
/// both channels, matching the historical ramp.
pub fn ratio_to_rgb(ratio: f64) -> Rgb {
    let rounded = (ratio * 10.0).round() / 10.0;
    if rounded == 0.5 {
        (255, 255, 0)
    } else if ratio < 0.5 {
        ((ratio * 2.0 * 255.0) as u8, 255, 0)
    } else {
        (255, ((1.0 - ratio) * 2.0 * 255.0) as u8, 0)
    }
}

/// Build the color map parallel to a normalized distance map.
///
/// Every value is expected in `[0, 1]` (run [`normalize`] with
/// [`NormalizeFactor::Max`] first). The output has the same key set and the
/// same sequence length per key, ready to be consumed alongside the
/// coordinate map by a viewport drawer.
pub fn evaluate_color_map(normalized: &DistanceMap) -> ColorMap {
    let mut colors = ColorMap::default();

    for (key, history) in normalized {
        colors.insert(key.clone(), history.iter().map(|&v| ratio_to_rgb(v)).collect());
    }

    colors
}

#[cfg(test)]
mod test_evaluate {
    use super::*;
    use crate::constants::Position;
    use approx::assert_relative_eq;

    fn distance_fixture() -> DistanceMap {
        let mut map = DistanceMap::default();
        map.insert("(1, 0, 0)".to_string(), vec![0.0, 10.0, 5.2, 4.0]);
        map.insert("(2, 0, 0)".to_string(), vec![2.0, 4.0, 15.3, 1.0]);
        map
    }

    #[test]
    fn test_max_abs_displacement_is_global() {
        let (key, stage, value) = max_abs_displacement(&distance_fixture()).unwrap();
        // The legacy key-max selection would report "(2, 0, 0)" regardless of
        // values; the global maximum happens to live there too, at stage 2.
        assert_eq!(key, "(2, 0, 0)");
        assert_eq!(stage, 2);
        assert_relative_eq!(value, 15.3);

        let mut map = DistanceMap::default();
        map.insert("(9, 9, 9)".to_string(), vec![1.0]);
        map.insert("(0, 0, 0)".to_string(), vec![7.0]);
        // Global max lives under the lexicographically smaller key.
        let (key, _, value) = max_abs_displacement(&map).unwrap();
        assert_eq!(key, "(0, 0, 0)");
        assert_relative_eq!(value, 7.0);
    }

    #[test]
    fn test_max_abs_displacement_empty() {
        assert_eq!(max_abs_displacement(&DistanceMap::default()), None);
        let mut map = DistanceMap::default();
        map.insert("(0, 0, 0)".to_string(), vec![]);
        assert_eq!(max_abs_displacement(&map), None);
    }

    #[test]
    fn test_displacement_from_origin() {
        let mut coordinates = CoordinateMap::default();
        coordinates.insert(
            "(1, 0, 0)".to_string(),
            vec![Position::new(1.0, 0.0, 0.0), Position::new(4.0, 4.0, 0.0)],
        );

        let distances = displacement_from_origin(&coordinates).unwrap();
        let history = &distances["(1, 0, 0)"];
        assert_relative_eq!(history[0], 0.0);
        assert_relative_eq!(history[1], 5.0);
    }

    #[test]
    fn test_displacement_from_origin_bad_key() {
        let mut coordinates = CoordinateMap::default();
        coordinates.insert("not a key".to_string(), vec![]);
        assert!(matches!(
            displacement_from_origin(&coordinates),
            Err(StageTrackError::InvalidPointKey(_))
        ));
    }

    #[test]
    fn test_normalize_max_then_one_is_idempotent() {
        let mut map = distance_fixture();
        normalize(&mut map, NormalizeFactor::Max);
        let snapshot = map.clone();
        normalize(&mut map, NormalizeFactor::Value(1.0));
        assert_eq!(map, snapshot);

        for history in map.values() {
            let max = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_relative_eq!(max, 1.0);
        }
    }

    #[test]
    fn test_normalize_skips_all_zero_histories() {
        let mut map = DistanceMap::default();
        map.insert("(0, 0, 0)".to_string(), vec![0.0, 0.0]);
        normalize(&mut map, NormalizeFactor::Max);
        assert_eq!(map["(0, 0, 0)"], vec![0.0, 0.0]);
    }

    #[test]
    fn test_ratio_to_rgb_endpoints() {
        assert_eq!(ratio_to_rgb(0.0), (0, 255, 0));
        assert_eq!(ratio_to_rgb(1.0), (255, 0, 0));
        assert_eq!(ratio_to_rgb(0.5), (255, 255, 0));
        // Values rounding to 0.5 at one decimal also saturate both channels.
        assert_eq!(ratio_to_rgb(0.46), (255, 255, 0));
    }

    #[test]
    fn test_evaluate_color_map_is_parallel() {
        let mut map = distance_fixture();
        normalize(&mut map, NormalizeFactor::Max);
        let colors = evaluate_color_map(&map);

        assert_eq!(colors.len(), map.len());
        for (key, history) in &map {
            assert_eq!(colors[key].len(), history.len());
        }
        // The per-sequence maximum is pure red.
        assert!(colors["(2, 0, 0)"].contains(&(255, 0, 0)));
    }
}
