//! # pwl-algo: Piecewise-Linear Function Encodings
//!
//! Translates a scalar piecewise-linear function, given as ordered
//! breakpoints that may contain discontinuities (jumps) and excluded ranges
//! (gaps), into an equivalent mixed-integer linear constraint system tied to
//! an existing input variable.
//!
//! ## Formulations
//!
//! | Formulation | Binaries | Continuous |
//! |-------------|----------|------------|
//! | [`Formulation::Interval`] | one per segment | one offset per sloped segment |
//! | [`Formulation::Convexity`] | one per segment, or ⌈log2(n-1)⌉ | one weight per breakpoint |
//!
//! Both admit exactly the graph of the function: interpolated values on every
//! segment, only the declared endpoint values at a jump (configurable through
//! [`JumpValues`]), and nothing inside a gap. Open ends extend the outermost
//! slopes as rays (see [`formulation::boundary`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use pwl_algo::{breakpoints_from_options, piecewise_linear, EncodingConfig};
//! use pwl_core::{Model, VarSpec};
//!
//! let mut model = Model::new();
//! let x = model.add_variable("x", VarSpec::free());
//!
//! // 2 -> 1 on [0, 1], flat on [1, 1.5], nothing on (1.5, 2)
//! let points = breakpoints_from_options(
//!     &[Some(0.0), Some(1.0), Some(1.5), None, Some(2.0), Some(3.0)],
//!     &[Some(2.0), Some(1.0), Some(1.0), None, Some(1.0), Some(4.0)],
//! )?;
//! let result = piecewise_linear(&mut model, x, &points, &EncodingConfig::convexity())?;
//! println!("{}", result.summary());
//! # Ok::<(), pwl_core::PwlError>(())
//! ```
//!
//! ## Modules
//!
//! - [`segments`]: breakpoint validation and block/segment tables
//! - [`formulation`]: the encoders, boundary rays and the entry point
//! - [`config`]: [`EncodingConfig`] and its TOML loader
//! - [`lp`]: lowering of a [`pwl_core::Model`] to good_lp

pub mod config;
pub mod formulation;
pub mod lp;
pub mod segments;

pub use config::{Adjacency, EncodingConfig, EndpointConfig, Exclusivity, Formulation, JumpValues};
pub use formulation::{
    piecewise_linear, pwl_convexity_formulation, pwl_interval_formulation, BoundaryEnd,
    BoundaryRay, FormulationResult,
};
pub use lp::LpModel;
pub use segments::{
    breakpoints_from_options, breakpoints_from_xy, Block, Breakpoint, Segment, SegmentTable,
};

// Re-export the modeling vocabulary so callers need a single import
pub use pwl_core::{Model, ModelContext, PwlError, PwlResult, VarId, VarSpec};
