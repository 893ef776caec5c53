//! Sparse linear expressions and equations.
//!
//! Terms are kept in a `BTreeMap` so iteration order (and therefore the
//! order coefficients reach a solver) is deterministic.

use crate::VarId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Coefficients with a smaller magnitude are dropped.
const COEFF_EPS: f64 = 1e-12;

/// A linear expression `Σ c_i · v_i + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coeff: f64) -> Self {
        let mut e = Self::zero();
        e.add_term(var, coeff);
        e
    }

    /// Sum of the given variables with unit coefficients.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        let mut e = Self::zero();
        for v in vars {
            e.add_term(v, 1.0);
        }
        e
    }

    /// Accumulate `coeff · var`, pruning the term if it cancels out.
    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coeff;
        if entry.abs() <= COEFF_EPS {
            self.terms.remove(&var);
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn scale(&self, k: f64) -> Self {
        let mut e = Self::constant(self.constant * k);
        for (v, c) in self.terms() {
            e.add_term(v, c * k);
        }
        e
    }

    /// Evaluate against a variable assignment; missing variables count as 0.
    pub fn eval(&self, values: &HashMap<VarId, f64>) -> f64 {
        self.terms()
            .map(|(v, c)| c * values.get(&v).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.constant += rhs.constant;
        for (v, c) in rhs.terms() {
            self.add_term(v, c);
        }
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        *self += &rhs;
    }
}

impl SubAssign<&LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: &LinearExpr) {
        self.constant -= rhs.constant;
        for (v, c) in rhs.terms() {
            self.add_term(v, -c);
        }
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        *self -= &rhs;
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += &rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;
    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self -= &rhs;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;
    fn mul(self, k: f64) -> LinearExpr {
        self.scale(k)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;
    fn neg(self) -> LinearExpr {
        self.scale(-1.0)
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, c) in self.terms() {
            if first {
                write!(f, "{}*{}", c, v)?;
                first = false;
            } else if c < 0.0 {
                write!(f, " - {}*{}", -c, v)?;
            } else {
                write!(f, " + {}*{}", c, v)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

/// Relation between the two sides of an [`Equation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
            Sense::Eq => write!(f, "="),
        }
    }
}

/// A named linear equation `lhs <sense> rhs`.
///
/// Constructors move any constant of the left-hand side to `rhs`, so
/// `lhs.constant_term()` is always zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub name: String,
    pub lhs: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Equation {
    pub fn new(name: impl Into<String>, lhs: LinearExpr, sense: Sense, rhs: f64) -> Self {
        let shift = lhs.constant_term();
        let mut lhs = lhs;
        lhs.add_constant(-shift);
        Self {
            name: name.into(),
            lhs,
            sense,
            rhs: rhs - shift,
        }
    }

    pub fn eq(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Sense::Eq, rhs)
    }

    pub fn le(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Sense::Le, rhs)
    }

    pub fn ge(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Sense::Ge, rhs)
    }

    /// Check the equation under an assignment with absolute tolerance `tol`.
    pub fn is_satisfied(&self, values: &HashMap<VarId, f64>, tol: f64) -> bool {
        let lhs = self.lhs.eval(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Ge => lhs >= self.rhs - tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {} {}", self.name, self.lhs, self.sense, self.rhs)
    }
}
