//! Residual contributions to the Helmholtz energy.

mod cubic;
mod helmholtz;
mod mbwr;

pub use cubic::{Cubic, CubicRecord, CubicType};
pub use helmholtz::{HelmholtzTerms, MultiParameter, MultiParameterRecord};
pub use mbwr::{Mbwr, MbwrRecord};

use crate::parameter::{FluidConstants, ParameterError, ResidualRecord};
use num_dual::DualNum;
use std::fmt;

/// The residual Helmholtz energy model of a fluid.
///
/// All models are evaluated as the reduced residual Helmholtz energy
/// αʳ(δ,τ) with δ = ρ/ρc and τ = Tc/T, so that they are interchangeable
/// behind the same derivative interface.
#[derive(Debug, Clone)]
pub enum ResidualModel {
    MultiParameter(MultiParameter),
    Mbwr(Mbwr),
    Cubic(Cubic),
}

impl ResidualModel {
    pub fn from_record(
        record: &ResidualRecord,
        constants: &FluidConstants,
    ) -> Result<Self, ParameterError> {
        Ok(match record {
            ResidualRecord::MultiParameter(r) => {
                Self::MultiParameter(MultiParameter::from_record(r, constants)?)
            }
            ResidualRecord::Mbwr(r) => Self::Mbwr(Mbwr::from_record(r, constants)?),
            ResidualRecord::Cubic(r) => Self::Cubic(Cubic::from_record(r, constants)?),
        })
    }

    /// Reduced residual Helmholtz energy αʳ(δ,τ).
    pub fn evaluate<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        match self {
            Self::MultiParameter(m) => m.evaluate(delta, tau),
            Self::Mbwr(m) => m.evaluate(delta, tau),
            Self::Cubic(m) => m.evaluate(delta, tau),
        }
    }

    /// Maximum density in mol/m³ up to which the model is evaluated.
    pub fn max_density(&self) -> f64 {
        match self {
            Self::MultiParameter(m) => m.max_density(),
            Self::Mbwr(m) => m.max_density(),
            Self::Cubic(m) => m.max_density(),
        }
    }

    /// Short model name, used to key persisted reference state offsets.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MultiParameter(_) => "multi_parameter",
            Self::Mbwr(_) => "mbwr",
            Self::Cubic(m) => m.name(),
        }
    }
}

impl fmt::Display for ResidualModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiParameter(m) => m.fmt(f),
            Self::Mbwr(m) => m.fmt(f),
            Self::Cubic(m) => m.fmt(f),
        }
    }
}
