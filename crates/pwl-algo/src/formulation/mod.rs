//! Piecewise-linear encodings
//!
//! ## Architecture
//!
//! ```text
//!   breakpoints ──► SegmentTable ──► Encoder (interval | convexity)
//!                                        │  x_expr, y_expr, unit rows
//!                                        ▼
//!                                 boundary rays (optional)
//!                                        │
//!                                        ▼
//!                          equations + SOS sets ──► ModelContext
//! ```
//!
//! An encoder never touches the model directly. It declares variables and
//! records side constraints through an [`Emitter`], and hands back the
//! expressions `x` and `y` must equal plus the "unit rows" (sums that must
//! be exactly 1). Boundary rays only ever see that [`Encoding`], which is
//! what keeps them independent of the formulation.
//!
//! Everything that can fail (breakpoint validation, configuration, the input
//! variable lookup, capability resolution) happens before the first variable
//! is declared, so a failed call leaves the model untouched.

pub mod boundary;
pub mod convexity;
pub mod exclusivity;
pub mod interval;
pub mod result;

pub use result::{BoundaryEnd, BoundaryRay, FormulationResult};

use crate::config::{Adjacency, EncodingConfig, Formulation, JumpValues};
use crate::segments::{Breakpoint, SegmentTable};
use convexity::ConvexityEncoder;
use exclusivity::IndicatorMode;
use interval::IntervalEncoder;
use pwl_core::{
    Equation, LinearExpr, ModelContext, PwlError, PwlResult, SosKind, SosSet, VarId, VarKind,
    VarSpec,
};
use tracing::{debug, warn};

/// Expressions an encoder ties the input and output to.
#[derive(Debug, Clone, Default)]
pub(crate) struct Encoding {
    pub x_expr: LinearExpr,
    pub y_expr: LinearExpr,
    /// Named sums that must equal 1; boundary indicators join every one
    pub unit_rows: Vec<(String, LinearExpr)>,
}

/// A strategy translating a segment table into variables and constraints.
pub(crate) trait Encoder {
    fn formulation(&self) -> Formulation;

    fn adjacency(&self) -> Option<Adjacency> {
        None
    }

    fn encode(&self, table: &SegmentTable, em: &mut Emitter<'_>) -> Encoding;
}

/// Declaration front-end shared by the encoders.
///
/// Variables are declared immediately; equations and SOS sets are held back
/// so the caller can attach them in a fixed order.
pub(crate) struct Emitter<'a> {
    ctx: &'a mut dyn ModelContext,
    tag: String,
    mode: IndicatorMode,
    has_sos: bool,
    variables: Vec<VarId>,
    indicators: Vec<VarId>,
    selectors: Vec<VarId>,
    continuous: Vec<VarId>,
    equations: Vec<Equation>,
    sos_sets: Vec<SosSet>,
    num_binaries: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(ctx: &'a mut dyn ModelContext, tag: String, mode: IndicatorMode) -> Self {
        let has_sos = ctx.special_ordered_sets().is_some();
        Self {
            ctx,
            tag,
            mode,
            has_sos,
            variables: Vec::new(),
            indicators: Vec::new(),
            selectors: Vec::new(),
            continuous: Vec::new(),
            equations: Vec::new(),
            sos_sets: Vec::new(),
            num_binaries: 0,
        }
    }

    pub(crate) fn name(&self, suffix: &str) -> String {
        format!("{}_{}", self.tag, suffix)
    }

    /// Whether the target model accepts native SOS sets.
    pub(crate) fn has_sos(&self) -> bool {
        self.has_sos
    }

    /// Declare a variable that belongs to no particular role list.
    pub(crate) fn declare(&mut self, suffix: &str, spec: VarSpec) -> VarId {
        let name = self.name(suffix);
        let id = self.ctx.declare_variable(&name, spec);
        if spec.kind == VarKind::Binary {
            self.num_binaries += 1;
        }
        self.variables.push(id);
        id
    }

    /// Member of the "exactly one active" set.
    pub(crate) fn indicator(&mut self, suffix: &str) -> VarId {
        let id = self.declare(suffix, self.mode.spec());
        self.indicators.push(id);
        id
    }

    /// Auxiliary binary outside the exclusivity set.
    pub(crate) fn selector(&mut self, suffix: &str) -> VarId {
        let id = self.declare(suffix, VarSpec::binary());
        self.selectors.push(id);
        id
    }

    /// Segment offset or breakpoint weight.
    pub(crate) fn weight(&mut self, suffix: &str) -> VarId {
        let id = self.declare(suffix, VarSpec::unit_interval());
        self.continuous.push(id);
        id
    }

    pub(crate) fn le(&mut self, suffix: &str, lhs: LinearExpr, rhs: f64) {
        let eq = Equation::le(self.name(suffix), lhs, rhs);
        self.equations.push(eq);
    }

    pub(crate) fn eq(&mut self, suffix: &str, lhs: LinearExpr, rhs: f64) {
        let eq = Equation::eq(self.name(suffix), lhs, rhs);
        self.equations.push(eq);
    }

    pub(crate) fn sos(&mut self, suffix: &str, kind: SosKind, members: &[VarId]) {
        let name = self.name(suffix);
        self.sos_sets.push(SosSet {
            name,
            kind,
            members: members.to_vec(),
        });
    }

    fn finish(self) -> Emitted {
        Emitted {
            mode: self.mode,
            variables: self.variables,
            indicators: self.indicators,
            selectors: self.selectors,
            continuous: self.continuous,
            equations: self.equations,
            sos_sets: self.sos_sets,
            num_binaries: self.num_binaries,
        }
    }
}

struct Emitted {
    mode: IndicatorMode,
    variables: Vec<VarId>,
    indicators: Vec<VarId>,
    selectors: Vec<VarId>,
    continuous: Vec<VarId>,
    equations: Vec<Equation>,
    sos_sets: Vec<SosSet>,
    num_binaries: usize,
}

/// Capability-resolved choices for one call.
#[derive(Debug, Clone, Copy)]
struct Plan {
    formulation: Formulation,
    adjacency: Adjacency,
    mode: IndicatorMode,
}

impl Plan {
    fn resolve(config: &EncodingConfig, has_sos: bool) -> Self {
        let adjacency = match config.adjacency {
            Adjacency::NativeSos2 if !has_sos && config.formulation == Formulation::Convexity => {
                warn!("model has no native SOS support; using segment adjacency");
                Adjacency::Segment
            }
            other => other,
        };
        let mode = IndicatorMode::resolve(
            config.exclusivity,
            config.formulation,
            adjacency,
            has_sos,
        );
        Self {
            formulation: config.formulation,
            adjacency,
            mode,
        }
    }

    fn encoder(&self, jumps: JumpValues) -> Box<dyn Encoder> {
        match self.formulation {
            Formulation::Interval => Box::new(IntervalEncoder::new(jumps)),
            Formulation::Convexity => Box::new(ConvexityEncoder::new(jumps, self.adjacency)),
        }
    }
}

/// Encode `output = f(input)` for the piecewise-linear `f` given by `points`.
///
/// Declares a new output variable and every auxiliary variable through
/// `ctx`, then attaches the generated equations (and SOS sets, when the
/// chosen path uses them).
///
/// # Errors
///
/// - [`PwlError::Config`]: invalid configuration
/// - [`PwlError::InputShape`], [`PwlError::AmbiguousDiscontinuity`],
///   [`PwlError::DegenerateSegment`]: malformed breakpoints
/// - [`PwlError::UnknownVariable`]: `input` is not declared in `ctx`
///
/// On error nothing has been declared or attached.
///
/// # Example
///
/// ```
/// use pwl_algo::{breakpoints_from_xy, piecewise_linear, EncodingConfig};
/// use pwl_core::{Model, VarSpec};
///
/// let mut model = Model::new();
/// let x = model.add_variable("x", VarSpec::free());
/// let points = breakpoints_from_xy(&[0.0, 1.0, 3.0, 3.0, 4.0], &[2.0, 1.0, 1.0, 2.0, 3.0])?;
///
/// let result = piecewise_linear(&mut model, x, &points, &EncodingConfig::interval())?;
/// assert_eq!(result.indicators().len(), 4);
/// # Ok::<(), pwl_core::PwlError>(())
/// ```
pub fn piecewise_linear(
    ctx: &mut dyn ModelContext,
    input: VarId,
    points: &[Breakpoint],
    config: &EncodingConfig,
) -> PwlResult<FormulationResult> {
    config.validate()?;
    let table = SegmentTable::build(points)?;
    if ctx.variable(input).is_none() {
        return Err(PwlError::UnknownVariable(input));
    }
    let has_sos = ctx.special_ordered_sets().is_some();
    let plan = Plan::resolve(config, has_sos);
    let encoder = plan.encoder(config.jumps);

    let output_spec = if config.endpoints.is_bounded() {
        let (lo, hi) = table.y_range();
        VarSpec::continuous(lo, hi)
    } else {
        VarSpec::free()
    };
    let output = ctx.declare_variable("pwl_y", output_spec);
    let tag = format!("pwl{}", output.value());

    let mut em = Emitter::new(ctx, tag.clone(), plan.mode);
    let mut encoding = encoder.encode(&table, &mut em);
    let rays = boundary::extend(&table, config, &mut encoding, &mut em);
    let emitted = em.finish();

    let mut sos_sets = emitted.sos_sets;
    if emitted.mode == IndicatorMode::Sos1 {
        sos_sets.push(SosSet {
            name: format!("{}_exclusive", tag),
            kind: SosKind::Sos1,
            members: emitted.indicators.clone(),
        });
    }

    let mut equations = Vec::with_capacity(encoding.unit_rows.len() + 2 + emitted.equations.len());
    for (name, row) in encoding.unit_rows {
        equations.push(Equation::eq(format!("{}_{}", tag, name), row, 1.0));
    }
    equations.push(Equation::eq(
        format!("{}_link_x", tag),
        LinearExpr::from(input) - encoding.x_expr,
        0.0,
    ));
    equations.push(Equation::eq(
        format!("{}_link_y", tag),
        LinearExpr::from(output) - encoding.y_expr,
        0.0,
    ));
    equations.extend(emitted.equations);

    for eq in &equations {
        ctx.attach_equation(eq.clone());
    }
    if !sos_sets.is_empty() {
        if let Some(cap) = ctx.special_ordered_sets() {
            for set in &sos_sets {
                match set.kind {
                    SosKind::Sos1 => cap.add_sos1(&set.name, &set.members),
                    SosKind::Sos2 => cap.add_sos2(&set.name, &set.members),
                }
            }
        }
    }

    let mut variables = Vec::with_capacity(emitted.variables.len() + 1);
    variables.push(output);
    variables.extend(emitted.variables);

    debug!(
        formulation = %plan.formulation,
        segments = table.segments().len(),
        variables = variables.len(),
        binaries = emitted.num_binaries,
        equations = equations.len(),
        rays = rays.len(),
        "encoded piecewise linear function"
    );

    Ok(FormulationResult {
        formulation: encoder.formulation(),
        adjacency: encoder.adjacency(),
        exclusivity: emitted.mode.exclusivity(),
        input,
        output,
        indicators: emitted.indicators,
        selectors: emitted.selectors,
        continuous: emitted.continuous,
        rays,
        equations,
        sos_sets,
        variables,
        num_binaries: emitted.num_binaries,
        num_segments: table.segments().len(),
        num_blocks: table.blocks().len(),
    })
}

/// Interval formulation over aligned x/y sequences (`None` marks a gap).
pub fn pwl_interval_formulation(
    ctx: &mut dyn ModelContext,
    input: VarId,
    x_points: &[Option<f64>],
    y_points: &[Option<f64>],
    bound_left: bool,
    bound_right: bool,
) -> PwlResult<FormulationResult> {
    let points = crate::segments::breakpoints_from_options(x_points, y_points)?;
    let config = EncodingConfig::interval().with_bounds(bound_left, bound_right);
    piecewise_linear(ctx, input, &points, &config)
}

/// Convexity formulation over aligned x/y sequences (`None` marks a gap).
pub fn pwl_convexity_formulation(
    ctx: &mut dyn ModelContext,
    input: VarId,
    x_points: &[Option<f64>],
    y_points: &[Option<f64>],
    bound_left: bool,
    bound_right: bool,
) -> PwlResult<FormulationResult> {
    let points = crate::segments::breakpoints_from_options(x_points, y_points)?;
    let config = EncodingConfig::convexity().with_bounds(bound_left, bound_right);
    piecewise_linear(ctx, input, &points, &config)
}
