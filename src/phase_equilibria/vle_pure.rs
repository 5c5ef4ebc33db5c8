use super::PhaseEquilibrium;
use crate::density_iteration::pressure_spinodal;
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::state::{Contributions, DensityInitialization, State, TPSpec};
use crate::{ReferenceSystem, SolverOptions, Verbosity};
use quantity::{Moles, Pressure, Temperature};
use std::sync::Arc;

const T_STEP_FACTOR: f64 = 0.7;
const MAX_ITER_SAT: usize = 50;
const TOL_SAT: f64 = 1e-12;

/// # Saturation calculations
impl PhaseEquilibrium {
    /// Saturation point, specified by either a temperature or a pressure.
    pub fn pure<TP>(
        eos: &Arc<Eos>,
        temperature_or_pressure: TP,
        initial_state: Option<&PhaseEquilibrium>,
        options: SolverOptions,
    ) -> EosResult<Self>
    where
        TPSpec: From<TP>,
    {
        match TPSpec::from(temperature_or_pressure) {
            TPSpec::Temperature(t) => Self::pure_t(eos, t, initial_state, options),
            TPSpec::Pressure(p) => Self::pure_p(eos, p, initial_state, options),
        }
    }

    /// Calculate the vapor pressure for the given temperature.
    ///
    /// For temperatures at or above the critical temperature the critical
    /// pressure is returned.
    pub fn vapor_pressure(eos: &Arc<Eos>, temperature: Temperature) -> EosResult<Pressure> {
        Ok(Self::pure_t(eos, temperature, None, SolverOptions::default())?
            .vapor()
            .pressure(Contributions::Total))
    }

    /// Calculate the boiling temperature for the given pressure.
    pub fn boiling_temperature(eos: &Arc<Eos>, pressure: Pressure) -> EosResult<Temperature> {
        Ok(Self::pure_p(eos, pressure, None, SolverOptions::default())?
            .vapor()
            .temperature)
    }

    /// Saturation point at the given temperature.
    ///
    /// Initial guesses are tried in order: the caller's estimate, an ideal
    /// gas vapor phase, and finally a pressure bracketed by the spinodals.
    fn pure_t(
        eos: &Arc<Eos>,
        temperature: Temperature,
        initial_state: Option<&PhaseEquilibrium>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        // At and above the critical temperature both phases coincide in the
        // critical point.
        if temperature >= eos.critical_temperature() {
            let state = State::new_pure(eos, eos.critical_temperature(), eos.critical_density())?;
            return Ok(Self([state.clone(), state]));
        }

        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_SAT, TOL_SAT);
        let run = |init: EosResult<Self>| {
            init.and_then(|vle| vle.iterate_pure_t(max_iter, tol, verbosity))
        };

        // start from the caller's estimate if one was given
        if let Some(init) = initial_state {
            if let Ok(vle) = run(Self::init_pure_state(init, temperature)) {
                return Ok(vle);
            }
        }
        // second attempt, pressure guess from an ideal gas vapor phase
        if let Ok(vle) = run(Self::init_pure_ideal_gas(eos, temperature)) {
            return Ok(vle);
        }
        // last resort, bracket the pressure between the spinodals
        run(Self::init_pure_spinodal(eos, temperature))
    }

    fn iterate_pure_t(self, max_iter: usize, tol: f64, verbosity: Verbosity) -> EosResult<Self> {
        let mut p_old = self.vapor().pressure(Contributions::Total);
        let [mut vapor, mut liquid] = self.0;

        log_iter!(verbosity,
            " iter |     residual      |     pressure     |    liquid density    |    vapor density     | Newton steps"
        );
        log_iter!(verbosity, "{:-<106}", "");
        log_iter!(
            verbosity,
            " {:4} |                   | {:12.8} | {:12.8} | {:12.8} |",
            0,
            p_old,
            liquid.density,
            vapor.density
        );

        for i in 1..=max_iter {
            // isothermal pressure derivatives for the density Newton steps
            let (p_l, dp_drho_l) = liquid.p_dpdrho();
            let (p_v, dp_drho_v) = vapor.p_dpdrho();
            // residual Helmholtz energies come out of the state cache
            let a_l_res = liquid.residual_molar_helmholtz_energy();
            let a_v_res = vapor.residual_molar_helmholtz_energy();

            // pressure estimate from the Helmholtz energy difference of the phases
            let kt = vapor.eos.gas_constant() * vapor.temperature;
            let delta_v = 1.0 / vapor.density - 1.0 / liquid.density;
            let delta_a =
                a_v_res - a_l_res + kt * (vapor.density / liquid.density).into_value().ln();
            let mut p_new = -delta_a / delta_v;

            // far from the solution the estimate can go negative, the
            // fugacity of an ideal gas vapor phase cannot
            if p_new.is_sign_negative() {
                p_new = p_v
                    * ((-delta_a - p_v * vapor.volume / vapor.moles) / kt)
                        .into_value()
                        .exp();
            }

            // refine the pressure with a few Newton steps on the isofugacity
            // condition, treating the vapor phase as close to ideal
            let mut newton_iter = 0;
            let newton_tol = p_old * delta_v * tol;
            for _ in 0..20 {
                let p_frac = (p_new / p_old).into_value();
                let f = p_new * delta_v + delta_a + (p_frac.ln() + 1.0 - p_frac) * kt;
                let df_dp = delta_v + (1.0 / p_new - 1.0 / p_old) * kt;
                p_new -= f / df_dp;
                newton_iter += 1;
                if f.abs() < newton_tol {
                    break;
                }
            }

            // bail out before a NaN propagates into the states
            if p_new.to_reduced().is_nan() {
                return Err(EosError::IterationFailed("pure_t".to_owned()));
            }

            // one Newton step in each density towards the new pressure
            let rho_l = liquid.density + (p_new - p_l) / dp_drho_l;
            let rho_v = vapor.density + (p_new - p_v) / dp_drho_v;
            liquid = State::new_pure(&liquid.eos, liquid.temperature, rho_l)?;
            vapor = State::new_pure(&vapor.eos, vapor.temperature, rho_v)?;
            if Self::is_trivial_solution(&vapor, &liquid) {
                return Err(EosError::TrivialSolution);
            }

            let res = (p_new - p_old).abs();
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:12.8} | {:12.8} | {:12.8} | {}",
                i,
                res,
                p_new,
                liquid.density,
                vapor.density,
                newton_iter
            );
            if res < p_old * tol {
                log_result!(
                    verbosity,
                    "PhaseEquilibrium::pure_t: calculation converged in {} step(s)\n",
                    i
                );
                return Ok(Self([vapor, liquid]));
            }
            p_old = p_new;
        }
        Err(EosError::NotConverged("pure_t".to_owned()))
    }

    /// Saturation point at the given pressure.
    fn pure_p(
        eos: &Arc<Eos>,
        pressure: Pressure,
        initial_state: Option<&Self>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        if pressure > eos.critical_pressure() {
            return Err(EosError::SuperCritical);
        }
        // At the critical pressure both phases coincide in the critical point.
        if pressure == eos.critical_pressure() {
            let state = State::new_pure(eos, eos.critical_temperature(), eos.critical_density())?;
            return Ok(Self([state.clone(), state]));
        }

        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_SAT, TOL_SAT);

        let mut vle = match initial_state {
            Some(init) => init
                .clone()
                .update_pressure(init.vapor().temperature, pressure)?,
            None => PhaseEquilibrium::init_pure_p(eos, pressure)?,
        };

        log_iter!(
            verbosity,
            " iter |     residual     |   temperature   |    liquid density    |    vapor density     "
        );
        log_iter!(verbosity, "{:-<89}", "");
        log_iter!(
            verbosity,
            " {:4} |                  | {:13.8} | {:12.8} | {:12.8}",
            0,
            vle.vapor().temperature,
            vle.liquid().density,
            vle.vapor().density
        );
        for i in 1..=max_iter {
            // pressure derivatives for the density Newton steps
            let (p_l, dp_drho_l) = vle.liquid().p_dpdrho();
            let (p_v, dp_drho_v) = vle.vapor().p_dpdrho();
            let dp_dt_l = vle.liquid().dp_dt(Contributions::Total);
            let dp_dt_v = vle.vapor().dp_dt(Contributions::Total);

            // residual entropies and Helmholtz energies come out of the cache
            let s_l_res = vle.liquid().residual_molar_entropy();
            let s_v_res = vle.vapor().residual_molar_entropy();
            let a_l_res = vle.liquid().residual_molar_helmholtz_energy();
            let a_v_res = vle.vapor().residual_molar_helmholtz_energy();

            let v_l = 1.0 / vle.liquid().density;
            let v_v = 1.0 / vle.vapor().density;

            // temperature step from a Clausius-Clapeyron style estimate
            let r = eos.gas_constant();
            let kt = r * vle.vapor().temperature;
            let ln_rho = (v_l / v_v).into_value().ln();
            let delta_t = (pressure * (v_v - v_l) + (a_v_res - a_l_res + kt * ln_rho))
                / (s_v_res - s_l_res - r * ln_rho);
            let t_new = vle.vapor().temperature + delta_t;

            // Newton steps in the densities at the shifted temperature
            let rho_l = vle.liquid().density + (pressure - p_l - dp_dt_l * delta_t) / dp_drho_l;
            let rho_v = vle.vapor().density + (pressure - p_v - dp_dt_v * delta_t) / dp_drho_v;

            if rho_l.is_sign_negative()
                || rho_v.is_sign_negative()
                || delta_t.abs() > Temperature::from_reduced(1.0)
            {
                // discard the Newton step and redo the densities with a full
                // density iteration at the new temperature
                vle = vle
                    .update_pressure(t_new, pressure)?
                    .check_trivial_solution()?;
            } else {
                vle = Self([
                    State::new_pure(eos, t_new, rho_v)?,
                    State::new_pure(eos, t_new, rho_l)?,
                ]);
            }

            let res = delta_t.abs();
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:13.8} | {:12.8} | {:12.8}",
                i,
                res,
                vle.vapor().temperature,
                vle.liquid().density,
                vle.vapor().density
            );
            if res < vle.vapor().temperature * tol {
                log_result!(
                    verbosity,
                    "PhaseEquilibrium::pure_p: calculation converged in {} step(s)\n",
                    i
                );
                return Ok(vle);
            }
        }
        Err(EosError::NotConverged("pure_p".to_owned()))
    }

    fn init_pure_state(initial_state: &Self, temperature: Temperature) -> EosResult<Self> {
        let vapor = initial_state.vapor().update_temperature(temperature)?;
        let liquid = initial_state.liquid().update_temperature(temperature)?;
        Ok(Self([vapor, liquid]))
    }

    /// Pressure guess from equating the liquid fugacity with that of an
    /// ideal gas vapor phase.
    fn init_pure_ideal_gas(eos: &Arc<Eos>, temperature: Temperature) -> EosResult<Self> {
        let liquid = State::new_pure(eos, temperature, 0.75 * eos.max_density())?;
        let v_l = liquid.molar_volume();
        let p_l = liquid.pressure(Contributions::Total);
        let mu_res = liquid.residual_chemical_potential();
        let kt = eos.gas_constant() * temperature;
        let p = liquid.density * kt * ((mu_res - p_l * v_l) / kt).into_value().exp();
        PhaseEquilibrium::new_npt(eos, temperature, p)?.check_trivial_solution()
    }

    /// Pressure guess halfway between the two spinodal pressures.
    fn init_pure_spinodal(eos: &Arc<Eos>, temperature: Temperature) -> EosResult<Self> {
        let moles = Moles::from_reduced(1.0);
        let maxdensity = eos.max_density();
        let (p_l, _) = pressure_spinodal(eos, temperature, 0.8 * maxdensity, moles)?;
        let (p_v, _) = pressure_spinodal(eos, temperature, 0.001 * maxdensity, moles)?;
        let p = 0.5 * (Pressure::from_reduced(0.0).max(p_l) + p_v);
        PhaseEquilibrium::new_npt(eos, temperature, p)
    }

    /// Initial two phase pair for the pressure based iteration.
    fn init_pure_p(eos: &Arc<Eos>, pressure: Pressure) -> EosResult<Self> {
        let trial_temperatures = [
            Temperature::from_reduced(300.0),
            Temperature::from_reduced(500.0),
            Temperature::from_reduced(200.0),
        ];
        let mut vle = None;
        let mut t0 = Temperature::from_reduced(1.0);
        for &t in &trial_temperatures {
            t0 = t;
            let trial = PhaseEquilibrium::new_npt(eos, t, pressure)?;
            if !Self::is_trivial_solution(trial.vapor(), trial.liquid()) {
                return Ok(trial);
            }
            vle = Some(trial);
        }

        // every trial temperature collapsed into a single phase, walk the
        // temperature until the collapsed phase leaves the critical density
        let Some(mut pair) = vle else { unreachable!() };
        let rho_c = eos.critical_density();
        if pair.vapor().density < rho_c {
            for _ in 0..8 {
                t0 *= T_STEP_FACTOR;
                pair.0[1] = State::new_npt(
                    eos,
                    t0,
                    pressure,
                    pair.0[1].moles,
                    DensityInitialization::Liquid,
                )?;
                if pair.liquid().density > rho_c {
                    break;
                }
            }
        } else {
            for _ in 0..8 {
                t0 /= T_STEP_FACTOR;
                pair.0[0] = State::new_npt(
                    eos,
                    t0,
                    pressure,
                    pair.0[0].moles,
                    DensityInitialization::Vapor,
                )?;
                if pair.vapor().density < rho_c {
                    break;
                }
            }
        }

        // enthalpy including the ideal gas offset between the phases
        let h = |state: &State| {
            state.residual_enthalpy() + state.moles * state.eos.gas_constant() * state.temperature
        };
        for _ in 0..20 {
            t0 = (h(pair.vapor()) - h(pair.liquid()))
                / (pair.vapor().residual_entropy()
                    - pair.liquid().residual_entropy()
                    - pair.vapor().moles
                        * pair.vapor().eos.gas_constant()
                        * ((pair.vapor().density / pair.liquid().density).into_value().ln()));
            let trial_state =
                State::new_npt(eos, t0, pressure, pair.0[0].moles, DensityInitialization::Vapor)?;
            if trial_state.density < rho_c {
                pair.0[0] = trial_state;
            }
            let trial_state =
                State::new_npt(eos, t0, pressure, pair.0[1].moles, DensityInitialization::Liquid)?;
            if trial_state.density > rho_c {
                pair.0[1] = trial_state;
            }
            if pair.liquid().temperature == pair.vapor().temperature {
                return Ok(pair);
            }
        }
        Err(EosError::IterationFailed(
            "init_pure_p: could not find proper initial state".to_owned(),
        ))
    }
}
