//! Structure of the generated systems: counts, idempotence, SOS paths, errors.

mod common;

use common::*;
use pwl_algo::{
    breakpoints_from_options, breakpoints_from_xy, piecewise_linear, Adjacency, Breakpoint,
    EncodingConfig, Exclusivity, Formulation, JumpValues, PwlError,
};
use pwl_core::{Model, ModelContext, SosKind, VarId, VarKind, VarSpec};
use std::collections::HashMap;

fn fresh() -> (Model, VarId) {
    let mut model = Model::new();
    let x = model.add_variable("x", VarSpec::free());
    (model, x)
}

#[test]
fn identical_calls_build_identical_systems() {
    for config in all_encodings() {
        let config = config.with_bounds(false, true);
        let (mut a, xa) = fresh();
        let (mut b, xb) = fresh();
        let ra = piecewise_linear(&mut a, xa, &gapped_points(), &config).unwrap();
        let rb = piecewise_linear(&mut b, xb, &gapped_points(), &config).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a.variables(), b.variables());
        assert_eq!(a.equations(), b.equations());
    }
}

#[test]
fn repeated_calls_on_one_model_do_not_collide() {
    let (mut model, x) = fresh();
    let first = piecewise_linear(&mut model, x, &end_to_end_points(), &EncodingConfig::interval())
        .unwrap();
    let second =
        piecewise_linear(&mut model, x, &end_to_end_points(), &EncodingConfig::interval()).unwrap();
    assert_ne!(first.output(), second.output());
    let mut names: Vec<&str> = model.variables().iter().map(|v| v.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
    assert_eq!(
        model.equations().len(),
        first.equations().len() + second.equations().len()
    );
}

#[test]
fn interval_counts_match_segments() {
    let (mut model, x) = fresh();
    let result =
        piecewise_linear(&mut model, x, &gapped_points(), &EncodingConfig::interval()).unwrap();
    // 5 segments, one of them a jump without an offset
    assert_eq!(result.indicators().len(), 5);
    assert_eq!(result.continuous().len(), 4);
    assert_eq!(result.num_binaries(), 5);
    assert_eq!(result.num_blocks(), 2);
    assert!(result.rays().is_empty());
    assert!(result.selectors().is_empty());
    assert_eq!(result.variables().len(), 1 + 5 + 4);
    assert_eq!(result.variables()[0], result.output());
    assert_eq!(result.input(), x);
}

#[test]
fn convexity_counts_match_points_and_segments() {
    let (mut model, x) = fresh();
    let result =
        piecewise_linear(&mut model, x, &gapped_points(), &EncodingConfig::convexity()).unwrap();
    assert_eq!(result.continuous().len(), 7);
    assert_eq!(result.indicators().len(), 5);
    assert_eq!(result.adjacency(), Some(Adjacency::Segment));
    // two unit rows, two links, one adjacency row per point
    assert_eq!(result.equations().len(), 2 + 2 + 7);
    for id in result.continuous() {
        let decl = model.variable(*id).unwrap();
        assert_eq!((decl.kind, decl.lower, decl.upper), (VarKind::Continuous, 0.0, 1.0));
    }
}

#[test]
fn logarithmic_mode_scales_with_log_of_points() {
    let x: Vec<f64> = (0..33).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| (v / 4.0).sin()).collect();
    let points = breakpoints_from_xy(&x, &y).unwrap();

    let (mut model, input) = fresh();
    let log = EncodingConfig::convexity().with_adjacency(Adjacency::Logarithmic);
    let result = piecewise_linear(&mut model, input, &points, &log).unwrap();
    assert_eq!(result.num_binaries(), 5);
    assert!(result.indicators().is_empty());
    assert_eq!(result.selectors().len(), 5);

    let (mut model, input) = fresh();
    let result =
        piecewise_linear(&mut model, input, &points, &EncodingConfig::convexity()).unwrap();
    assert_eq!(result.num_binaries(), 32);
}

#[test]
fn native_sos2_chain_admits_only_adjacent_weights() {
    let points = breakpoints_from_xy(&[0.0, 1.0, 2.0], &[0.0, 2.0, 0.0]).unwrap();
    let mut model = Model::with_sos();
    let x = model.add_variable("x", VarSpec::free());
    let config = EncodingConfig::convexity().with_adjacency(Adjacency::NativeSos2);
    let result = piecewise_linear(&mut model, x, &points, &config).unwrap();

    assert_eq!(result.adjacency(), Some(Adjacency::NativeSos2));
    assert_eq!(result.num_binaries(), 0);
    assert_eq!(model.sos_sets().len(), 1);
    assert_eq!(model.sos_sets()[0].kind, SosKind::Sos2);
    assert_eq!(model.sos_sets()[0].members, result.continuous());

    let w = result.continuous();
    let y = result.output();
    let on_graph: HashMap<VarId, f64> =
        [(x, 0.5), (y, 1.0), (w[0], 0.5), (w[1], 0.5)].into_iter().collect();
    assert!(model.violations(&on_graph, 1e-9).is_empty());

    // the chord from (0,0) to (2,0) skips the middle breakpoint
    let chord: HashMap<VarId, f64> =
        [(x, 1.0), (y, 0.0), (w[0], 0.5), (w[2], 0.5)].into_iter().collect();
    let violations = model.violations(&chord, 1e-9);
    assert_eq!(violations.len(), 1, "{:?}", violations);
}

#[test]
fn native_sos2_without_capability_falls_back() {
    let (mut model, x) = fresh();
    let config = EncodingConfig::convexity().with_adjacency(Adjacency::NativeSos2);
    let result = piecewise_linear(&mut model, x, &end_to_end_points(), &config).unwrap();
    assert_eq!(result.adjacency(), Some(Adjacency::Segment));
    assert!(model.sos_sets().is_empty());
    assert_eq!(result.indicators().len(), 4);
}

#[test]
fn native_sos1_exclusivity_checks_out_on_assignments() {
    let points = breakpoints_from_xy(&[0.0, 1.0, 2.0], &[0.0, 2.0, 0.0]).unwrap();
    let mut model = Model::with_sos();
    let x = model.add_variable("x", VarSpec::free());
    let config = EncodingConfig::interval().with_exclusivity(Exclusivity::NativeSos1);
    let result = piecewise_linear(&mut model, x, &points, &config).unwrap();
    assert_eq!(result.num_binaries(), 0);

    let b = result.indicators();
    let f = result.continuous();
    let y = result.output();
    let second_piece: HashMap<VarId, f64> =
        [(x, 1.5), (y, 1.0), (b[1], 1.0), (f[1], 0.5)].into_iter().collect();
    assert!(model.violations(&second_piece, 1e-9).is_empty());

    // half of each piece satisfies every linear row but not the SOS1 set
    let blend: HashMap<VarId, f64> = [
        (x, 1.0),
        (y, 2.0),
        (b[0], 0.5),
        (f[0], 0.5),
        (b[1], 0.5),
        (f[1], 0.0),
    ]
    .into_iter()
    .collect();
    let violations = model.violations(&blend, 1e-9);
    assert_eq!(violations.len(), 1, "{:?}", violations);
}

#[test]
fn sos_capable_models_extend_rays_past_any_limit() {
    let mut model = Model::with_sos();
    let x = model.add_variable("x", VarSpec::free());
    let config = EncodingConfig::interval()
        .with_bounds(false, true)
        .with_ray_limit(100.0);
    let result = piecewise_linear(&mut model, x, &end_to_end_points(), &config).unwrap();
    assert!(model.equations().iter().all(|eq| !eq.name.ends_with("_gate")));

    let ray = result.rays()[0];
    let gate = &model.sos_sets()[0];
    assert_eq!(gate.kind, SosKind::Sos1);
    assert_eq!(gate.members[0], ray.ray);
    let off = gate.members[1];

    // (0, 2) with slope -1, followed 2e6 units to the left
    let far: HashMap<VarId, f64> = [
        (x, -2e6),
        (result.output(), 2e6 + 2.0),
        (ray.ray, 2e6),
        (ray.indicator, 1.0),
        (off, 0.0),
    ]
    .into_iter()
    .collect();
    assert!(model.violations(&far, 1e-6).is_empty(), "{:?}", model.violations(&far, 1e-6));

    // an inactive ray cannot move x
    let stray: HashMap<VarId, f64> = [
        (x, -5.0),
        (result.output(), 7.0),
        (ray.ray, 5.0),
        (result.indicators()[0], 1.0),
        (off, 1.0),
    ]
    .into_iter()
    .collect();
    let violations = model.violations(&stray, 1e-6);
    assert_eq!(violations.len(), 1, "{:?}", violations);
    assert!(violations[0].contains("Sos1"));
}

#[test]
fn invalid_breakpoints_leave_the_model_untouched() {
    let bad: Vec<Vec<Breakpoint>> = vec![
        breakpoints_from_xy(&[1.0], &[1.0]).unwrap(),
        breakpoints_from_xy(&[0.0, 1.0, 1.0, 1.0, 2.0], &[0.0; 5]).unwrap(),
        breakpoints_from_xy(&[2.0, 2.0], &[0.0, 1.0]).unwrap(),
        breakpoints_from_xy(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).unwrap(),
        breakpoints_from_options(&[Some(0.0), Some(1.0), None], &[Some(0.0), Some(1.0), None])
            .unwrap(),
    ];
    for formulation in Formulation::all() {
        let config = EncodingConfig::default().with_formulation(*formulation);
        for points in &bad {
            let (mut model, x) = fresh();
            let err = piecewise_linear(&mut model, x, points, &config).unwrap_err();
            assert!(err.is_input_error(), "{:?}", err);
            assert_eq!(model.variables().len(), 1);
            assert!(model.equations().is_empty());
        }
    }
}

#[test]
fn error_kinds_identify_the_problem() {
    let (mut model, x) = fresh();
    let config = EncodingConfig::convexity();

    let triple = breakpoints_from_xy(&[0.0, 1.0, 1.0, 1.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
    assert_eq!(
        piecewise_linear(&mut model, x, &triple, &config).unwrap_err(),
        PwlError::AmbiguousDiscontinuity {
            x: 1.0,
            occurrences: 3
        }
    );

    let flat = breakpoints_from_xy(&[5.0, 5.0], &[0.0, 1.0]).unwrap();
    assert!(matches!(
        piecewise_linear(&mut model, x, &flat, &config),
        Err(PwlError::DegenerateSegment { block: 0, .. })
    ));

    let unknown = VarId::new(99);
    assert_eq!(
        piecewise_linear(&mut model, unknown, &end_to_end_points(), &config).unwrap_err(),
        PwlError::UnknownVariable(unknown)
    );
}

#[test]
fn config_file_drives_the_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pwl.toml");
    std::fs::write(
        &path,
        "formulation = \"convexity\"\njumps = \"span\"\nbound_right = false\nray_limit = 500.0\n",
    )
    .unwrap();
    let config = EncodingConfig::load(&path).unwrap();
    assert_eq!(config.jumps, JumpValues::Span);

    let (model, x, y) = encode(&end_to_end_points(), &config);
    assert!(feasible(&model, &[(x, 3.0), (y, 1.5)]));
    let (lo, hi) = output_range(&model, x, y, 10.0).unwrap();
    assert_close(lo, 9.0);
    assert_close(hi, 9.0);
}

#[test]
fn summary_describes_the_encoding() {
    let (mut model, x) = fresh();
    let config = EncodingConfig::interval().with_bounds(false, false);
    let result = piecewise_linear(&mut model, x, &end_to_end_points(), &config).unwrap();
    let summary = result.summary();
    assert!(summary.contains("Formulation: interval"));
    assert!(summary.contains("Segments: 4 in 1 block(s)"));
    assert!(summary.contains("[RAY] left end"));
    assert!(summary.contains("[RAY] right end"));
}
