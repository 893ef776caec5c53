//! Lowering of a [`Model`] into `good_lp` building blocks.
//!
//! The engine itself never solves anything. Callers that want to solve the
//! encoded model pick a good_lp backend and feed it the lowered variables and
//! constraints:
//!
//! ```ignore
//! let lp = LpModel::lower(&model)?;
//! let objective = lp.expression(&LinearExpr::from(result.output()))?;
//! let (vars, constraints, map) = lp.into_parts();
//! let mut problem = vars.minimise(objective).using(default_solver);
//! for c in constraints {
//!     problem = problem.with(c);
//! }
//! let solution = problem.solve()?;
//! ```

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use pwl_core::{LinearExpr, Model, PwlError, PwlResult, Sense, VarId, VarKind};
use std::collections::HashMap;
use tracing::debug;

/// A [`Model`] translated to good_lp variables and constraints.
pub struct LpModel {
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    map: HashMap<VarId, Variable>,
}

impl LpModel {
    /// Translate every declaration and equation of `model`.
    ///
    /// good_lp has no special-ordered-set constraints, so models carrying SOS
    /// sets are rejected with [`PwlError::Unsupported`].
    pub fn lower(model: &Model) -> PwlResult<Self> {
        if !model.sos_sets().is_empty() {
            return Err(PwlError::Unsupported(format!(
                "good_lp cannot express {} special ordered set(s)",
                model.sos_sets().len()
            )));
        }

        let mut vars = ProblemVariables::new();
        let mut map = HashMap::with_capacity(model.variables().len());
        for decl in model.variables() {
            let mut def = variable().name(decl.name.clone());
            match decl.kind {
                VarKind::Binary => def = def.binary(),
                VarKind::Continuous => {
                    if decl.lower.is_finite() {
                        def = def.min(decl.lower);
                    }
                    if decl.upper.is_finite() {
                        def = def.max(decl.upper);
                    }
                }
            }
            map.insert(decl.id, vars.add(def));
        }

        let mut lp = Self {
            vars,
            constraints: Vec::with_capacity(model.equations().len()),
            map,
        };
        for eq in model.equations() {
            let lhs = lp.expression(&eq.lhs)?;
            let rhs = eq.rhs;
            let c = match eq.sense {
                Sense::Le => constraint!(lhs <= rhs),
                Sense::Ge => constraint!(lhs >= rhs),
                Sense::Eq => constraint!(lhs == rhs),
            };
            lp.constraints.push(c);
        }

        debug!(
            variables = lp.map.len(),
            constraints = lp.constraints.len(),
            "lowered model to good_lp"
        );
        Ok(lp)
    }

    /// good_lp variable standing for `id`.
    pub fn var(&self, id: VarId) -> Option<Variable> {
        self.map.get(&id).copied()
    }

    /// Translate an expression over variables of the lowered model.
    ///
    /// A variable the model never declared is an error rather than a
    /// silently dropped term.
    pub fn expression(&self, expr: &LinearExpr) -> PwlResult<Expression> {
        let mut out = Expression::from(expr.constant_term());
        for (id, coeff) in expr.terms() {
            let v = self.var(id).ok_or(PwlError::UnknownVariable(id))?;
            out.add_mul(coeff, v);
        }
        Ok(out)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn into_parts(self) -> (ProblemVariables, Vec<Constraint>, HashMap<VarId, Variable>) {
        (self.vars, self.constraints, self.map)
    }
}
