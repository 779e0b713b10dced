use approx::assert_relative_eq;

use stagetrack::constants::{gap_position, StageClouds};
use stagetrack::evaluate::{
    displacement_from_origin, evaluate_color_map, max_abs_displacement, normalize,
    NormalizeFactor,
};
use stagetrack::history::{
    find_corrupted_points, find_corrupted_stages, remove_points, split_history,
    split_into_cycles, CycleRanges,
};
use stagetrack::observations::{group_by_stage, Observation};
use stagetrack::{
    find_points_between_stages, find_points_from_stage, Position, StageMatch, TrackParams,
};

/// Synthetic four-stage test: point A creeps along x, point B deflects in y,
/// point C vanishes at stage 2 and reappears at stage 3.
fn test_observations() -> Vec<Observation> {
    let rows: Vec<(usize, (f64, f64, f64))> = vec![
        (0, (0.0, 0.0, 0.0)),
        (0, (100.0, 0.0, 0.0)),
        (0, (200.0, 0.0, 0.0)),
        (1, (1.0, 0.0, 0.0)),
        (1, (100.0, 5.0, 0.0)),
        (1, (200.0, 0.0, 0.0)),
        (2, (2.0, 0.0, 0.0)),
        (2, (100.0, 9.0, 0.0)),
        (3, (3.0, 0.0, 0.0)),
        (3, (100.0, 12.0, 0.0)),
        (3, (200.0, 1.0, 0.0)),
    ];

    rows.into_iter()
        .map(|(stage, (x, y, z))| Observation::new(stage, stage as f64, Position::new(x, y, z)))
        .collect()
}

fn test_clouds() -> StageClouds {
    group_by_stage(&test_observations()).unwrap()
}

#[test]
fn test_full_pipeline() {
    let clouds = test_clouds();
    assert_eq!(clouds.len(), 4);

    let params = TrackParams::builder().tolerance(50.0).build().unwrap();

    // ---------- Tracking from stage 0 ----------
    let set = find_points_from_stage(&clouds, 0, &params).unwrap();
    assert_eq!(set.len(), 3);
    for traj in set.values() {
        assert_eq!(traj.matches.len(), 3);
    }

    // ---------- Projection ----------
    let (mut coordinates, mut distances) = split_history(&set);
    assert_eq!(coordinates.len(), 3);
    assert_eq!(distances.len(), 3);

    let a = &coordinates["(0, 0, 0)"];
    assert_eq!(a[0], Position::new(1.0, 0.0, 0.0));
    assert_eq!(a[2], Position::new(3.0, 0.0, 0.0));

    // Point C lost stage 2: gap sentinel in both projections.
    let c = &coordinates["(200, 0, 0)"];
    assert_eq!(c[1], gap_position());
    assert_eq!(distances["(200, 0, 0)"][1], 0.0);

    // ---------- Cleaning ----------
    let sentinel = gap_position();
    assert_eq!(find_corrupted_stages(&coordinates, &sentinel), vec![1]);

    let corrupted = find_corrupted_points(&coordinates, &sentinel);
    assert_eq!(corrupted, vec!["(200, 0, 0)".to_string()]);

    remove_points(&corrupted, &mut coordinates).unwrap();
    remove_points(&corrupted, &mut distances).unwrap();
    assert_eq!(coordinates.len(), 2);
    assert_eq!(distances.len(), 2);

    // ---------- Displacements from the reference position ----------
    let from_origin = displacement_from_origin(&coordinates).unwrap();
    let b = &from_origin["(100, 0, 0)"];
    assert_relative_eq!(b[0], 5.0);
    assert_relative_eq!(b[1], 9.0);
    assert_relative_eq!(b[2], 12.0);

    let (max_key, max_stage, max_val) = max_abs_displacement(&from_origin).unwrap();
    assert_eq!(max_key, "(100, 0, 0)");
    assert_eq!(max_stage, 2);
    assert_relative_eq!(max_val, 12.0);

    // ---------- Cycles ----------
    let mut cycles = CycleRanges::default();
    cycles.insert("c0".to_string(), 0..2);
    cycles.insert("c1".to_string(), 2..3);

    let cycle_maps = split_into_cycles(&from_origin, &cycles);
    assert_eq!(cycle_maps["c0"]["(100, 0, 0)"], vec![5.0, 9.0]);
    assert_eq!(cycle_maps["c1"]["(100, 0, 0)"], vec![12.0]);

    // ---------- Normalization and color ramp ----------
    let mut normalized = from_origin.clone();
    normalize(&mut normalized, NormalizeFactor::Max);
    assert_relative_eq!(normalized["(100, 0, 0)"][2], 1.0);

    let colors = evaluate_color_map(&normalized);
    assert_eq!(colors.len(), normalized.len());
    assert_eq!(colors["(100, 0, 0)"][2], (255, 0, 0));
}

#[test]
fn test_pairwise_matching_shapes() {
    let clouds = test_clouds();
    let params = TrackParams::builder().tolerance(50.0).build().unwrap();

    let matches = find_points_between_stages(&clouds, &params).unwrap();

    // N - 1 lists, list s as long as cloud s.
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].len(), 3);
    assert_eq!(matches[1].len(), 3);
    assert_eq!(matches[2].len(), 2);

    // Stage 1 -> 2: point C finds nothing within 50 mm.
    assert_eq!(matches[1][2], StageMatch::Gap);

    // Stage 0 -> 1: everything matches.
    for m in &matches[0] {
        assert!(!m.is_gap());
    }
}

#[test]
fn test_tracking_from_later_stage() {
    let clouds = test_clouds();
    let params = TrackParams::builder().tolerance(50.0).build().unwrap();

    let set = find_points_from_stage(&clouds, 2, &params).unwrap();

    // Stage 2 holds two points; one tracked stage remains.
    assert_eq!(set.len(), 2);
    for traj in set.values() {
        assert_eq!(traj.matches.len(), 1);
        assert!(!traj.has_gap());
    }
}
