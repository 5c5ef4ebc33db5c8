use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::state::State;
use crate::ReferenceSystem;
use quantity::{Density, Moles, Pressure, Temperature};
use std::sync::Arc;

/// Newton iteration for the density at given temperature and pressure.
///
/// Inside the two-phase dome the isotherm slopes downward and a plain Newton
/// step runs away from the root. Whenever ∂p/∂ρ turns negative the iteration
/// relocates to a spinodal density and restarts on the branch that can still
/// reach the target pressure.
pub fn density_iteration(
    eos: &Arc<Eos>,
    temperature: Temperature,
    pressure: Pressure,
    moles: Moles,
    initial_density: Density,
) -> EosResult<State> {
    let rho_max = eos.max_density();
    let (abstol, reltol) = (1e-12, 1e-14);
    let maxiter = 50;

    let mut rho = initial_density;
    if rho <= Density::from_reduced(0.0) {
        return Err(EosError::InvalidState(
            String::from("density iteration"),
            String::from("density"),
            rho.to_reduced(),
        ));
    }

    for k in 0..maxiter {
        let mut state = State::new_nvt(eos, temperature, moles / rho, moles)?;
        let (mut p, mut dp_drho) = state.p_dpdrho();

        // a seed that lands on the descending part of the isotherm gets one
        // chance to move off it before the spinodal logic takes over
        if k == 0 && dp_drho.is_sign_negative() {
            rho = if initial_density <= 0.15 * rho_max {
                0.05 * initial_density
            } else {
                (1.1 * initial_density).min(rho_max)
            };
            state = State::new_nvt(eos, temperature, moles / rho, moles)?;
            (p, dp_drho) = state.p_dpdrho();
        }

        let residual = p - pressure;

        if dp_drho.is_sign_negative() {
            let d2p_drho2 = state.d2pdrho2().2;
            let spinodal = |from| pressure_spinodal(eos, temperature, from, moles);

            if rho > 0.85 * rho_max {
                let (p_sp, rho_sp) = spinodal(initial_density)?;
                rho = rho_sp;
                let residual = p_sp - pressure;
                if rho > 0.85 * rho_max {
                    if residual.is_sign_negative() {
                        return Err(EosError::IterationFailed(String::from("density_iteration")));
                    }
                    rho *= 0.98;
                } else if residual.is_sign_positive() {
                    rho = 0.001 * rho_max;
                } else {
                    rho = (rho * 1.1).min(rho_max);
                }
            } else {
                // the signs of the residual and of the curvature decide
                // which side of the dome the root can lie on
                match (residual.is_sign_positive(), d2p_drho2.is_sign_positive()) {
                    (true, true) => {
                        let (p_sp, rho_sp) = spinodal(initial_density)?;
                        rho = if (p_sp - pressure).is_sign_positive() {
                            0.001 * rho_max
                        } else {
                            (rho_sp * 1.1).min(rho_max)
                        };
                    }
                    (false, false) => {
                        let (p_sp, rho_sp) = spinodal(initial_density)?;
                        rho = if (p_sp - pressure).is_sign_negative() {
                            0.8 * rho_max
                        } else {
                            0.8 * rho_sp
                        };
                    }
                    (false, true) => {
                        let (_, rho_l) = spinodal(0.8 * rho_max)?;
                        let (p_v, rho_v) = spinodal(0.001 * rho_max)?;
                        let closer_to_vapor =
                            (initial_density - rho_v).abs() < (initial_density - rho_l).abs();
                        rho = if (p_v - pressure).is_sign_positive() && closer_to_vapor {
                            0.8 * rho_v
                        } else {
                            (rho_l * 1.1).min(rho_max)
                        };
                    }
                    (true, false) => {
                        let (_, rho_l) = spinodal(0.8 * rho_max)?;
                        let (p_v, rho_v) = spinodal(0.001 * rho_max)?;
                        let closer_to_liquid =
                            (initial_density - rho_v).abs() > (initial_density - rho_l).abs();
                        rho = if (p_v - pressure).is_sign_negative() && closer_to_liquid {
                            (rho_l * 1.1).min(rho_max)
                        } else {
                            0.8 * rho_v
                        };
                    }
                }
            }
            continue;
        }

        let mut step = -residual / dp_drho;
        if step.abs() > 0.075 * rho_max {
            step = 0.075 * rho_max * step.signum();
        }
        // never step below zero density
        rho += step.max(-0.95 * rho);

        if residual.to_reduced().abs() < f64::max(abstol, (rho * reltol).to_reduced()) {
            return State::new_nvt(eos, temperature, moles / rho, moles);
        }
    }
    Err(EosError::NotConverged("density_iteration".to_owned()))
}

/// Extremum of the isotherm p(ρ), located by a Newton iteration on ∂p/∂ρ.
///
/// Starting below the vapor spinodal finds the pressure maximum, starting
/// above the liquid spinodal the minimum.
pub fn pressure_spinodal(
    eos: &Arc<Eos>,
    temperature: Temperature,
    rho_init: Density,
    moles: Moles,
) -> EosResult<(Pressure, Density)> {
    let maxiter = 30;
    let abstol = 1e-8;

    let rho_max = eos.max_density();
    let mut rho = rho_init;

    if rho <= Density::from_reduced(0.0) {
        return Err(EosError::InvalidState(
            String::from("pressure spinodal"),
            String::from("density"),
            rho.to_reduced(),
        ));
    }

    for _ in 0..maxiter {
        let (p, dp_drho, d2p_drho2) =
            State::new_nvt(eos, temperature, moles / rho, moles)?.d2pdrho2();

        let mut step = -dp_drho / d2p_drho2;
        if step.abs() > 0.05 * rho_max {
            step = 0.05 * rho_max * step.signum();
        }
        // keep the iterate inside (0, ρmax]
        step = step.max(-rho * 0.95);
        rho += step.min(rho_max - rho);

        if dp_drho.to_reduced().abs() < abstol {
            return Ok((p, rho));
        }
    }
    Err(EosError::NotConverged("pressure_spinodal".to_owned()))
}
