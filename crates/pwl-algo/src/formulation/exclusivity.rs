//! "Exactly one piece active" enforcement.
//!
//! Every encoder states exclusivity as a sum-to-one row over indicators. What
//! keeps the indicators integral is decided here: binary declarations, or
//! continuous indicators tied together by one native SOS1 set.

use crate::config::{Adjacency, Exclusivity, Formulation};
use pwl_core::VarSpec;
use tracing::warn;

/// Resolved indicator declaration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndicatorMode {
    Binary,
    Sos1,
}

impl IndicatorMode {
    /// Pick the mode actually used for a call.
    ///
    /// SOS1 needs the model capability and segment indicators to attach to;
    /// the logarithmic and SOS2 adjacency modes have none.
    pub(crate) fn resolve(
        requested: Exclusivity,
        formulation: Formulation,
        adjacency: Adjacency,
        has_sos: bool,
    ) -> Self {
        match requested {
            Exclusivity::Binary => IndicatorMode::Binary,
            Exclusivity::NativeSos1 if !has_sos => {
                warn!("model has no native SOS support; using binary indicators");
                IndicatorMode::Binary
            }
            Exclusivity::NativeSos1
                if formulation == Formulation::Convexity && adjacency != Adjacency::Segment =>
            {
                warn!(
                    ?adjacency,
                    "SOS1 exclusivity needs segment indicators; using binary indicators"
                );
                IndicatorMode::Binary
            }
            Exclusivity::NativeSos1 => IndicatorMode::Sos1,
        }
    }

    pub(crate) fn spec(self) -> VarSpec {
        match self {
            IndicatorMode::Binary => VarSpec::binary(),
            IndicatorMode::Sos1 => VarSpec::unit_interval(),
        }
    }

    pub(crate) fn exclusivity(self) -> Exclusivity {
        match self {
            IndicatorMode::Binary => Exclusivity::Binary,
            IndicatorMode::Sos1 => Exclusivity::NativeSos1,
        }
    }
}
