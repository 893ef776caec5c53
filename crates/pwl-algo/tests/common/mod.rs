//! Shared helpers: fix variables, lower to good_lp and solve with microlp.

#![allow(dead_code)]

use good_lp::solvers::microlp::microlp;
use good_lp::{Solution, SolverModel};
use pwl_algo::{
    breakpoints_from_options, breakpoints_from_xy, Adjacency, Breakpoint, EncodingConfig,
    LpModel,
};
use pwl_core::{Equation, LinearExpr, Model, ModelContext, VarId};
use tracing_subscriber::EnvFilter;

pub const TOL: f64 = 1e-6;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy)]
pub enum Goal {
    Min,
    Max,
}

/// Optimise `objective` with the given variables fixed; `None` if infeasible.
pub fn optimise(model: &Model, fixed: &[(VarId, f64)], objective: VarId, goal: Goal) -> Option<f64> {
    let mut model = model.clone();
    for (i, (var, value)) in fixed.iter().enumerate() {
        model.attach_equation(Equation::eq(format!("fix{}", i), LinearExpr::from(*var), *value));
    }
    let lp = LpModel::lower(&model).expect("model without SOS sets");
    let target = lp.var(objective).expect("objective is declared");
    let expr = lp
        .expression(&LinearExpr::from(objective))
        .expect("objective is declared");
    let (vars, constraints, _) = lp.into_parts();

    let unsolved = match goal {
        Goal::Min => vars.minimise(expr),
        Goal::Max => vars.maximise(expr),
    };
    let mut problem = unsolved.using(microlp);
    for c in constraints {
        problem = problem.with(c);
    }
    problem.solve().ok().map(|s| s.value(target))
}

pub fn feasible(model: &Model, fixed: &[(VarId, f64)]) -> bool {
    optimise(model, fixed, fixed[0].0, Goal::Min).is_some()
}

/// The range of outputs the encoding admits at `x`.
pub fn output_range(model: &Model, input: VarId, output: VarId, x: f64) -> Option<(f64, f64)> {
    let lo = optimise(model, &[(input, x)], output, Goal::Min)?;
    let hi = optimise(model, &[(input, x)], output, Goal::Max)?;
    Some((lo, hi))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOL,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Every configuration the properties are checked under.
pub fn all_encodings() -> Vec<EncodingConfig> {
    vec![
        EncodingConfig::interval(),
        EncodingConfig::convexity(),
        EncodingConfig::convexity().with_adjacency(Adjacency::Logarithmic),
    ]
}

/// x=[0,1,3,3,4], y=[2,1,1,2,3]
pub fn end_to_end_points() -> Vec<Breakpoint> {
    breakpoints_from_xy(&[0.0, 1.0, 3.0, 3.0, 4.0], &[2.0, 1.0, 1.0, 2.0, 3.0]).unwrap()
}

/// x=[0,1,1.5,gap,2,3,3,4], y=[2,1,1,gap,1,1,2,3]
pub fn gapped_points() -> Vec<Breakpoint> {
    breakpoints_from_options(
        &[Some(0.0), Some(1.0), Some(1.5), None, Some(2.0), Some(3.0), Some(3.0), Some(4.0)],
        &[Some(2.0), Some(1.0), Some(1.0), None, Some(1.0), Some(1.0), Some(2.0), Some(3.0)],
    )
    .unwrap()
}

/// Fresh model with a free input variable, then the encoding of `points`.
pub fn encode(points: &[Breakpoint], config: &EncodingConfig) -> (Model, VarId, VarId) {
    let mut model = Model::new();
    let x = model.add_variable("x", pwl_core::VarSpec::free());
    let result = pwl_algo::piecewise_linear(&mut model, x, points, config).unwrap();
    (model, x, result.output())
}
