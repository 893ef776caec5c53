//! What one encoding call produced.

use crate::config::{Adjacency, Exclusivity, Formulation};
use pwl_core::{Equation, PwlResult, SosSet, VarId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the breakpoint range a boundary ray extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryEnd {
    Left,
    Right,
}

impl BoundaryEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryEnd::Left => "left",
            BoundaryEnd::Right => "right",
        }
    }
}

impl fmt::Display for BoundaryEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unbounded extension of an outermost segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRay {
    pub end: BoundaryEnd,
    /// Non-negative distance travelled past the last breakpoint
    pub ray: VarId,
    /// Member of the exclusivity set; 1 when the ray is the active piece
    pub indicator: VarId,
    /// Slope the ray continues with (0 past a jump)
    pub slope: f64,
}

/// Immutable record of the variables and equations one call generated.
///
/// Equations are listed in attachment order: unit rows, the input link,
/// the output link, the encoder's side constraints, then boundary gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationResult {
    pub(crate) formulation: Formulation,
    pub(crate) adjacency: Option<Adjacency>,
    pub(crate) exclusivity: Exclusivity,
    pub(crate) input: VarId,
    pub(crate) output: VarId,
    pub(crate) indicators: Vec<VarId>,
    pub(crate) selectors: Vec<VarId>,
    pub(crate) continuous: Vec<VarId>,
    pub(crate) rays: Vec<BoundaryRay>,
    pub(crate) equations: Vec<Equation>,
    pub(crate) sos_sets: Vec<SosSet>,
    pub(crate) variables: Vec<VarId>,
    pub(crate) num_binaries: usize,
    pub(crate) num_segments: usize,
    pub(crate) num_blocks: usize,
}

impl FormulationResult {
    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    /// Adjacency mode used by the convexity formulation.
    pub fn adjacency(&self) -> Option<Adjacency> {
        self.adjacency
    }

    /// Exclusivity mode actually used (after capability fallback).
    pub fn exclusivity(&self) -> Exclusivity {
        self.exclusivity
    }

    pub fn input(&self) -> VarId {
        self.input
    }

    /// The new variable carrying `f(input)`.
    pub fn output(&self) -> VarId {
        self.output
    }

    /// Exclusivity indicators: one per segment (interval, segment-mode
    /// convexity) plus one per boundary ray.
    pub fn indicators(&self) -> &[VarId] {
        &self.indicators
    }

    /// Auxiliary binaries of the logarithmic and SOS2 adjacency modes.
    pub fn selectors(&self) -> &[VarId] {
        &self.selectors
    }

    /// Segment offsets (interval) or breakpoint weights (convexity).
    pub fn continuous(&self) -> &[VarId] {
        &self.continuous
    }

    pub fn rays(&self) -> &[BoundaryRay] {
        &self.rays
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn sos_sets(&self) -> &[SosSet] {
        &self.sos_sets
    }

    /// Every generated variable, output included, in declaration order.
    pub fn variables(&self) -> &[VarId] {
        &self.variables
    }

    pub fn num_binaries(&self) -> usize {
        self.num_binaries
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn to_json(&self) -> PwlResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Piecewise Linear Encoding\n{}\n", "=".repeat(40)));
        match self.adjacency {
            Some(adjacency) => s.push_str(&format!(
                "Formulation: {} ({:?} adjacency)\n",
                self.formulation, adjacency
            )),
            None => s.push_str(&format!("Formulation: {}\n", self.formulation)),
        }
        s.push_str(&format!("Input: {}  Output: {}\n", self.input, self.output));
        s.push_str(&format!(
            "Segments: {} in {} block(s)\n",
            self.num_segments, self.num_blocks
        ));
        s.push_str(&format!(
            "Variables: {} ({} binary)\n",
            self.variables.len(),
            self.num_binaries
        ));
        s.push_str(&format!("Equations: {}\n", self.equations.len()));
        s.push_str(&format!("Exclusivity: {:?}\n", self.exclusivity));
        if !self.sos_sets.is_empty() {
            s.push_str(&format!("SOS sets: {}\n", self.sos_sets.len()));
        }
        for ray in &self.rays {
            s.push_str(&format!(
                "  [RAY] {} end, slope {:.4}\n",
                ray.end, ray.slope
            ));
        }
        s
    }
}
