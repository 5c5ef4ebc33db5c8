use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::state::{DensityInitialization, State};
use crate::ReferenceSystem;
use quantity::{Moles, Pressure, Temperature};
use std::fmt;
use std::sync::Arc;

mod vle_pure;

/// A thermodynamic equilibrium between a vapor and a liquid phase.
///
/// The struct is used both for converged vapor/liquid equilibria and for
/// the intermediate states of the saturation solvers.
#[derive(Debug, Clone)]
pub struct PhaseEquilibrium([State; 2]);

impl fmt::Display for PhaseEquilibrium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vapor: {}", self.vapor())?;
        write!(f, "liquid: {}", self.liquid())
    }
}

impl PhaseEquilibrium {
    pub fn vapor(&self) -> &State {
        &self.0[0]
    }

    pub fn liquid(&self) -> &State {
        &self.0[1]
    }

    pub(crate) fn from_states(state1: State, state2: State) -> Self {
        let (vapor, liquid) = if state1.density < state2.density {
            (state1, state2)
        } else {
            (state2, state1)
        };
        Self([vapor, liquid])
    }

    /// Vapor and liquid states at the given temperature and pressure,
    /// found by starting the density solve once from each side of the
    /// isotherm.
    ///
    /// The two states are generally *not* in equilibrium. The saturation
    /// solvers use this pair as an initial guess.
    pub fn new_npt(eos: &Arc<Eos>, temperature: Temperature, pressure: Pressure) -> EosResult<Self> {
        let moles = Moles::from_reduced(1.0);
        let vapor = State::new_npt(
            eos,
            temperature,
            pressure,
            moles,
            DensityInitialization::Vapor,
        )?;
        let liquid = State::new_npt(
            eos,
            temperature,
            pressure,
            moles,
            DensityInitialization::Liquid,
        )?;
        Ok(Self([vapor, liquid]))
    }

    pub(crate) fn update_pressure(
        self,
        temperature: Temperature,
        pressure: Pressure,
    ) -> EosResult<Self> {
        let [vapor, liquid] = self.0;
        let resolve = |s: State| {
            State::new_npt(
                &s.eos,
                temperature,
                pressure,
                s.moles,
                DensityInitialization::InitialDensity(s.density),
            )
        };
        Ok(Self([resolve(vapor)?, resolve(liquid)?]))
    }
}

const TRIVIAL_REL_DEVIATION: f64 = 1e-5;

/// # Utility functions
impl PhaseEquilibrium {
    pub(crate) fn check_trivial_solution(self) -> EosResult<Self> {
        if Self::is_trivial_solution(self.vapor(), self.liquid()) {
            Err(EosError::TrivialSolution)
        } else {
            Ok(self)
        }
    }

    /// Two states that collapsed onto the same density satisfy the
    /// equilibrium conditions trivially.
    pub fn is_trivial_solution(state1: &State, state2: &State) -> bool {
        ((state2.density / state1.density).into_value() - 1.0).abs() < TRIVIAL_REL_DEVIATION
    }
}
