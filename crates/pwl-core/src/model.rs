//! The ambient model the encoding engine writes into.
//!
//! The engine only ever needs two capabilities from a modeling layer:
//! declaring fresh variables and attaching linear equations. Both are
//! expressed by [`ModelContext`]. Solvers with native special-ordered-set
//! support expose it through the optional [`SpecialOrderedSets`] capability
//! instead of through solver-specific branches in the engine.

use crate::{Equation, PwlResult, VarId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Algebraic kind of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Continuous,
    Binary,
}

/// Declaration request for a new variable.
///
/// Mirrors the `good_lp::variable()` builder: start from a kind and narrow
/// the bounds with [`VarSpec::min`] / [`VarSpec::max`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarSpec {
    pub kind: VarKind,
    #[serde(with = "lower_bound")]
    pub lower: f64,
    #[serde(with = "upper_bound")]
    pub upper: f64,
}

impl VarSpec {
    pub fn binary() -> Self {
        Self {
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Unbounded continuous variable.
    pub fn free() -> Self {
        Self {
            kind: VarKind::Continuous,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    pub fn continuous(lower: f64, upper: f64) -> Self {
        Self {
            kind: VarKind::Continuous,
            lower,
            upper,
        }
    }

    /// Continuous variable in `[0, 1]`.
    pub fn unit_interval() -> Self {
        Self::continuous(0.0, 1.0)
    }

    /// Continuous variable in `[0, ∞)`.
    pub fn non_negative() -> Self {
        Self::continuous(0.0, f64::INFINITY)
    }

    pub fn min(mut self, lower: f64) -> Self {
        self.lower = lower;
        self
    }

    pub fn max(mut self, upper: f64) -> Self {
        self.upper = upper;
        self
    }
}

/// A variable as recorded by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: VarId,
    pub name: String,
    pub kind: VarKind,
    #[serde(with = "lower_bound")]
    pub lower: f64,
    #[serde(with = "upper_bound")]
    pub upper: f64,
}

// JSON has no infinities: an unbounded side is written as `null` and read
// back as the matching infinity.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

mod lower_bound {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::finite(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod upper_bound {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::finite(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

impl VarDecl {
    pub fn is_binary(&self) -> bool {
        self.kind == VarKind::Binary
    }

    /// Whether `value` respects bounds (and integrality for binaries).
    pub fn admits(&self, value: f64, tol: f64) -> bool {
        if value < self.lower - tol || value > self.upper + tol {
            return false;
        }
        match self.kind {
            VarKind::Binary => value.abs() <= tol || (value - 1.0).abs() <= tol,
            VarKind::Continuous => true,
        }
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VarKind::Binary => write!(f, "{} ({}) binary", self.name, self.id),
            VarKind::Continuous => write!(
                f,
                "{} ({}) in [{}, {}]",
                self.name, self.id, self.lower, self.upper
            ),
        }
    }
}

/// Special ordered set type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SosKind {
    /// At most one member nonzero
    Sos1,
    /// At most two members nonzero, and they must be consecutive
    Sos2,
}

/// An ordered set of variables with an SOS restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosSet {
    pub name: String,
    pub kind: SosKind,
    pub members: Vec<VarId>,
}

impl SosSet {
    /// Check the SOS restriction under an assignment.
    pub fn is_satisfied(&self, values: &HashMap<VarId, f64>, tol: f64) -> bool {
        let nonzero: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, v)| values.get(v).copied().unwrap_or(0.0).abs() > tol)
            .map(|(i, _)| i)
            .collect();
        match self.kind {
            SosKind::Sos1 => nonzero.len() <= 1,
            SosKind::Sos2 => match nonzero.as_slice() {
                [] | [_] => true,
                [a, b] => b - a == 1,
                _ => false,
            },
        }
    }
}

/// Native special-ordered-set support of a target model.
pub trait SpecialOrderedSets {
    fn add_sos1(&mut self, name: &str, members: &[VarId]);
    fn add_sos2(&mut self, name: &str, members: &[VarId]);
}

/// What the encoding engine needs from a modeling layer.
pub trait ModelContext {
    /// Declare a fresh variable. `name` is a hint; the model keeps names unique.
    fn declare_variable(&mut self, name: &str, spec: VarSpec) -> VarId;

    /// Attach an equation to the model.
    fn attach_equation(&mut self, equation: Equation);

    /// Look up a declared variable.
    fn variable(&self, id: VarId) -> Option<&VarDecl>;

    /// Native SOS support, if the target has it.
    fn special_ordered_sets(&mut self) -> Option<&mut dyn SpecialOrderedSets> {
        None
    }
}

/// In-memory ambient model.
///
/// Records declared variables, attached equations and (optionally) SOS sets.
/// Build with [`Model::new`] for a plain MILP target or [`Model::with_sos`]
/// for a target that accepts SOS1/SOS2 sets natively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredModel")]
pub struct Model {
    variables: Vec<VarDecl>,
    equations: Vec<Equation>,
    sos_sets: Vec<SosSet>,
    sos_enabled: bool,
    #[serde(skip)]
    taken_names: HashSet<String>,
}

/// Serialized form of [`Model`]; the name registry is rebuilt on load.
#[derive(Deserialize)]
struct StoredModel {
    variables: Vec<VarDecl>,
    equations: Vec<Equation>,
    #[serde(default)]
    sos_sets: Vec<SosSet>,
    #[serde(default)]
    sos_enabled: bool,
}

impl From<StoredModel> for Model {
    fn from(stored: StoredModel) -> Self {
        let taken_names = stored
            .variables
            .iter()
            .map(|v| v.name.clone())
            .chain(stored.equations.iter().map(|e| e.name.clone()))
            .chain(stored.sos_sets.iter().map(|s| s.name.clone()))
            .collect();
        Self {
            variables: stored.variables,
            equations: stored.equations,
            sos_sets: stored.sos_sets,
            sos_enabled: stored.sos_enabled,
            taken_names,
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model whose target solver supports SOS1/SOS2 natively.
    pub fn with_sos() -> Self {
        Self {
            sos_enabled: true,
            ..Self::default()
        }
    }

    /// Declare a user variable (e.g. the input of a piecewise function).
    pub fn add_variable(&mut self, name: &str, spec: VarSpec) -> VarId {
        self.declare_variable(name, spec)
    }

    pub fn variables(&self) -> &[VarDecl] {
        &self.variables
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn sos_sets(&self) -> &[SosSet] {
        &self.sos_sets
    }

    pub fn num_binaries(&self) -> usize {
        self.variables.iter().filter(|v| v.is_binary()).count()
    }

    /// Everything an assignment violates: bounds, integrality, equations, SOS sets.
    ///
    /// Variables missing from `values` are treated as 0.
    pub fn violations(&self, values: &HashMap<VarId, f64>, tol: f64) -> Vec<String> {
        let mut out = Vec::new();
        for decl in &self.variables {
            let value = values.get(&decl.id).copied().unwrap_or(0.0);
            if !decl.admits(value, tol) {
                out.push(format!("{} = {}", decl, value));
            }
        }
        for eq in &self.equations {
            if !eq.is_satisfied(values, tol) {
                out.push(format!("{} (lhs = {})", eq, eq.lhs.eval(values)));
            }
        }
        for sos in &self.sos_sets {
            if !sos.is_satisfied(values, tol) {
                out.push(format!("{:?} set {} violated", sos.kind, sos.name));
            }
        }
        out
    }

    pub fn to_json(&self) -> PwlResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PwlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Model Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!(
            "Variables: {} ({} binary)\n",
            self.variables.len(),
            self.num_binaries()
        ));
        s.push_str(&format!("Equations: {}\n", self.equations.len()));
        if !self.sos_sets.is_empty() {
            s.push_str(&format!("SOS sets: {}\n", self.sos_sets.len()));
        }
        s
    }

    fn unique_name(&mut self, hint: &str) -> String {
        if self.taken_names.insert(hint.to_string()) {
            return hint.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", hint, n);
            if self.taken_names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn push_sos(&mut self, name: &str, kind: SosKind, members: &[VarId]) {
        let name = self.unique_name(name);
        self.sos_sets.push(SosSet {
            name,
            kind,
            members: members.to_vec(),
        });
    }
}

impl ModelContext for Model {
    fn declare_variable(&mut self, name: &str, spec: VarSpec) -> VarId {
        let id = VarId::new(self.variables.len());
        let name = self.unique_name(name);
        self.variables.push(VarDecl {
            id,
            name,
            kind: spec.kind,
            lower: spec.lower,
            upper: spec.upper,
        });
        id
    }

    fn attach_equation(&mut self, mut equation: Equation) {
        equation.name = self.unique_name(&equation.name);
        self.equations.push(equation);
    }

    fn variable(&self, id: VarId) -> Option<&VarDecl> {
        self.variables.get(id.value())
    }

    fn special_ordered_sets(&mut self) -> Option<&mut dyn SpecialOrderedSets> {
        if self.sos_enabled {
            Some(self)
        } else {
            None
        }
    }
}

impl SpecialOrderedSets for Model {
    fn add_sos1(&mut self, name: &str, members: &[VarId]) {
        self.push_sos(name, SosKind::Sos1, members);
    }

    fn add_sos2(&mut self, name: &str, members: &[VarId]) {
        self.push_sos(name, SosKind::Sos2, members);
    }
}
