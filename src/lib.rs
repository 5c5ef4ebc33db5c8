//! Multiparameter equations of state and phase equilibria for pure fluids.
//!
//! The crate evaluates high-accuracy Helmholtz-energy equations of state
//! (term-by-term multiparameter correlations, pressure-explicit MBWR
//! correlations and two-parameter cubics) behind a single interface. On top
//! of the Helmholtz energy and its partial derivatives it provides
//! saturation calculations, a resolver for arbitrary two-property state
//! specifications, and configurable enthalpy/entropy reference states.
#![warn(clippy::all)]
use quantity::{Quantity, SIUnit};
use std::ops::Div;
use typenum::Integer;

/// Print a line per iteration, active at `Verbosity::Iter`.
#[macro_export]
macro_rules! log_iter {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Iter {
            println!($($arg)*);
        }
    }
}

/// Print the outcome of an iteration, active at `Verbosity::Result` or higher.
#[macro_export]
macro_rules! log_result {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Result {
            println!($($arg)*);
        }
    }
}

mod density_iteration;
mod eos;
mod errors;
mod ideal_gas;
pub mod parameter;
mod phase_equilibria;
mod reference_state;
mod residual;
mod state;
mod transport;

pub use eos::Eos;
pub use errors::{EosError, EosResult};
pub use ideal_gas::IdealGas;
pub use parameter::IdentifierOption;
pub use phase_equilibria::PhaseEquilibrium;
pub use reference_state::{ReferenceConvention, ReferenceOffsets, ReferenceState};
pub use residual::{Cubic, CubicType, Mbwr, MultiParameter, ResidualModel};
pub use state::{
    Contributions, DensityInitialization, Derivative, DomainWarning, Phase, PropertySpec,
    ResolvedState, State, StateBuilder, StateHD, StateSpecification, TPSpec, TwoPhaseState,
};
pub use transport::{TransportInput, TransportProperties};

/// Molar gas constant (CODATA 2018) in J/(mol K).
///
/// Used as default whenever a correlation does not specify its own value.
pub const RGAS: f64 = 8.31446261815324;

/// Amount of diagnostic output printed by the iterative solvers.
#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Stay quiet.
    #[default]
    None,
    /// Report whether the iteration succeeded.
    Result,
    /// Print a table row for every iteration.
    Iter,
}

/// Options for the iterative solvers.
///
/// Unset fields fall back to solver specific defaults.
#[derive(Copy, Clone, Default)]
pub struct SolverOptions {
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,
    /// Tolerance.
    pub tol: Option<f64>,
    /// Iteration output indicated by the [Verbosity] enum.
    pub verbosity: Verbosity,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn unwrap_or(self, max_iter: usize, tol: f64) -> (usize, f64, Verbosity) {
        (
            self.max_iter.unwrap_or(max_iter),
            self.tol.unwrap_or(tol),
            self.verbosity,
        )
    }
}

/// Conversion between dimensioned quantities and their plain SI magnitudes.
///
/// The iterative solvers work on bare floats. A reduced value is defined as
/// the numerical value of the property in (molar) SI base units, so the
/// round trip is a unit checked wrap and unwrap without any rescaling.
pub trait ReferenceSystem {
    type Inner;

    fn from_reduced(value: Self::Inner) -> Self;

    fn to_reduced(&self) -> Self::Inner
    where
        for<'a> &'a Self::Inner: Div<f64, Output = Self::Inner>;

    fn into_reduced(self) -> Self::Inner
    where
        Self::Inner: Div<f64, Output = Self::Inner>;
}

impl<Inner, T: Integer, L: Integer, M: Integer, I: Integer, THETA: Integer, N: Integer, J: Integer>
    ReferenceSystem for Quantity<Inner, SIUnit<T, L, M, I, THETA, N, J>>
{
    type Inner = Inner;

    fn from_reduced(value: Inner) -> Self {
        Self::new(value)
    }

    fn to_reduced(&self) -> Inner
    where
        for<'a> &'a Inner: Div<f64, Output = Inner>,
    {
        self.convert_to(Quantity::new(1.0))
    }

    fn into_reduced(self) -> Inner
    where
        Inner: Div<f64, Output = Inner>,
    {
        self.convert_into(Quantity::new(1.0))
    }
}
