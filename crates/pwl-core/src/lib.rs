//! # pwl-core: Modeling-Layer Vocabulary
//!
//! Provides the small algebraic modeling surface the piecewise-linear
//! encoding engine (`pwl-algo`) writes into.
//!
//! ## Design Philosophy
//!
//! The engine is a compiler from breakpoints to constraints. It never needs a
//! full expression tree, only:
//! - **Variables**: declared with a kind (continuous or binary) and bounds
//! - **Linear equations**: sparse `Σ c·v  (<=|>=|=)  rhs`
//! - **Optional SOS sets**: for targets that support them natively
//!
//! These are expressed by the [`ModelContext`] trait, with [`Model`] as the
//! in-memory implementation used by callers and tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use pwl_core::*;
//!
//! let mut model = Model::new();
//! let x = model.add_variable("x", VarSpec::free());
//! let b = model.declare_variable("b", VarSpec::binary());
//!
//! // x <= 10 b
//! model.attach_equation(Equation::le(
//!     "gate",
//!     LinearExpr::from(x) - LinearExpr::term(b, 10.0),
//!     0.0,
//! ));
//!
//! assert_eq!(model.variables().len(), 2);
//! assert_eq!(model.equations().len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod expr;
pub mod model;

pub use error::{PwlError, PwlResult};
pub use expr::{Equation, LinearExpr, Sense};
pub use model::{
    Model, ModelContext, SosKind, SosSet, SpecialOrderedSets, VarDecl, VarKind, VarSpec,
};

/// Identifier of a variable inside a [`ModelContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn new(value: usize) -> Self {
        VarId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
