//! Encoding configuration
//!
//! Every knob of the engine lives in [`EncodingConfig`]. It can be built in
//! code or loaded from TOML:
//!
//! ```toml
//! formulation = "convexity"
//! bound_left = false
//! jumps = "endpoints"
//! adjacency = "logarithmic"
//! ray_limit = 1e4
//! ```

use anyhow::{Context, Result};
use pwl_core::{PwlError, PwlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Encoding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// Segment indicator + local offset per segment
    #[default]
    Interval,
    /// Convex combination of breakpoints gated by segment indicators
    Convexity,
}

impl Formulation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formulation::Interval => "interval",
            Formulation::Convexity => "convexity",
        }
    }

    pub fn all() -> &'static [Formulation] {
        &[Formulation::Interval, Formulation::Convexity]
    }
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Formulation {
    type Err = PwlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interval" | "intervals" => Ok(Formulation::Interval),
            "convexity" | "lambda" => Ok(Formulation::Convexity),
            other => Err(PwlError::Config(format!(
                "unknown formulation '{}'; supported values: interval, convexity",
                other
            ))),
        }
    }
}

/// Values admitted exactly at the x of a discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpValues {
    /// Only the two declared y values
    #[default]
    Endpoints,
    /// Any y between the two declared values
    Span,
}

/// How "exactly one segment active" is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusivity {
    /// Binary indicators summing to one
    #[default]
    Binary,
    /// Continuous indicators in one SOS1 set; needs native SOS support
    NativeSos1,
}

/// How the convexity formulation restricts breakpoint weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjacency {
    /// One binary per segment, weights gated by adjacent segments
    #[default]
    Segment,
    /// SOS2 through ⌈log2(n-1)⌉ Gray-code binaries
    Logarithmic,
    /// Weights declared as a native SOS2 set
    NativeSos2,
}

/// Which ends of the breakpoint range terminate the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// If false, the first segment extends to -∞
    #[serde(default = "default_bound")]
    pub bound_left: bool,
    /// If false, the last segment extends to +∞
    #[serde(default = "default_bound")]
    pub bound_right: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bound_left: default_bound(),
            bound_right: default_bound(),
        }
    }
}

impl EndpointConfig {
    pub fn is_bounded(&self) -> bool {
        self.bound_left && self.bound_right
    }
}

fn default_bound() -> bool {
    true
}

fn default_ray_limit() -> f64 {
    1e6
}

/// Full configuration of one encoding call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    #[serde(default)]
    pub formulation: Formulation,
    #[serde(flatten, default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub jumps: JumpValues,
    #[serde(default)]
    pub exclusivity: Exclusivity,
    /// Only read by the convexity formulation
    #[serde(default)]
    pub adjacency: Adjacency,
    /// Largest extension distance of a boundary ray on models without SOS
    /// support; SOS-capable models gate rays natively and ignore it
    #[serde(default = "default_ray_limit")]
    pub ray_limit: f64,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            formulation: Formulation::default(),
            endpoints: EndpointConfig::default(),
            jumps: JumpValues::default(),
            exclusivity: Exclusivity::default(),
            adjacency: Adjacency::default(),
            ray_limit: default_ray_limit(),
        }
    }
}

impl EncodingConfig {
    pub fn interval() -> Self {
        Self::default()
    }

    pub fn convexity() -> Self {
        Self {
            formulation: Formulation::Convexity,
            ..Self::default()
        }
    }

    pub fn with_formulation(mut self, formulation: Formulation) -> Self {
        self.formulation = formulation;
        self
    }

    pub fn with_bounds(mut self, bound_left: bool, bound_right: bool) -> Self {
        self.endpoints = EndpointConfig {
            bound_left,
            bound_right,
        };
        self
    }

    pub fn with_jumps(mut self, jumps: JumpValues) -> Self {
        self.jumps = jumps;
        self
    }

    pub fn with_exclusivity(mut self, exclusivity: Exclusivity) -> Self {
        self.exclusivity = exclusivity;
        self
    }

    pub fn with_adjacency(mut self, adjacency: Adjacency) -> Self {
        self.adjacency = adjacency;
        self
    }

    pub fn with_ray_limit(mut self, ray_limit: f64) -> Self {
        self.ray_limit = ray_limit;
        self
    }

    /// Reject values the engine cannot encode.
    pub fn validate(&self) -> PwlResult<()> {
        if !self.ray_limit.is_finite() || self.ray_limit <= 0.0 {
            return Err(PwlError::Config(format!(
                "ray_limit must be a positive finite number, got {}",
                self.ray_limit
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> PwlResult<Self> {
        let config: EncodingConfig =
            toml::from_str(content).map_err(|e| PwlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> PwlResult<String> {
        toml::to_string_pretty(self).map_err(|e| PwlError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading encoding config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing encoding config {}", path.display()))
    }
}
