//! Thermodynamic states and the properties derived from them.
//!
//! A [State] fixes the natural variables of the Helmholtz energy, temperature,
//! volume and mole number. Every other property is obtained by differentiating
//! the equation of state at that point, so all property methods live on the
//! state itself.
use crate::density_iteration::density_iteration;
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::ReferenceSystem;
use cache::Cache;
use num_dual::*;
use quantity::{
    Density, MolarEnergy, MolarEntropy, Moles, Pressure, Quantity, SIUnit, Temperature, Volume,
};
use std::fmt;
use std::ops::Sub;
use std::sync::{Arc, Mutex};
use typenum::{N1, N2, P1, Z0};

mod builder;
mod cache;
mod properties;
mod residual_properties;
mod resolver;
pub use builder::StateBuilder;
pub use resolver::{
    DomainWarning, Phase, PropertySpec, ResolvedState, StateSpecification, TwoPhaseState,
};

/// Helmholtz energy contributions included in a property evaluation.
#[derive(Clone, Copy)]
pub enum Contributions {
    /// The ideal gas part alone.
    IdealGas,
    /// Everything beyond the ideal gas part.
    Residual,
    /// Ideal gas and residual parts combined.
    Total,
}

/// Choice of the starting density for a density iteration.
#[derive(Clone, Copy)]
pub enum DensityInitialization {
    /// Start from the ideal gas density, aiming for a vapor root.
    Vapor,
    /// Start from the maximum density of the model, aiming for a liquid root.
    Liquid,
    /// Start from the given density.
    InitialDensity(Density),
    /// Solve from both sides of the isotherm and keep the root with the
    /// lower molar Gibbs energy.
    None,
}

/// State variables generic over the dual number type.
///
/// Seeding one of the fields with a dual derivative direction and evaluating
/// the Helmholtz energy on this struct yields the corresponding partial
/// derivatives without finite differences.
#[derive(Clone, Copy, Debug)]
pub struct StateHD<D: DualNum<f64>> {
    /// temperature in K
    pub temperature: D,
    /// volume in m³
    pub volume: D,
    /// mole number in mol
    pub moles: D,
    /// molar density in mol/m³
    pub density: D,
}

impl<D: DualNum<f64> + Copy> StateHD<D> {
    pub fn new(temperature: D, volume: D, moles: D) -> Self {
        let density = moles / volume;
        Self {
            temperature,
            volume,
            moles,
            density,
        }
    }
}

/// Thermodynamic state of a pure fluid.
///
/// The state is always specified by the variables of the Helmholtz energy:
/// volume $V$, temperature $T$ and mole number $N$. Additional to these
/// variables, the state saves properties like the density, that can be
/// calculated directly from the basic variables. The state also contains a
/// reference to the equation of state used to create the state. Therefore,
/// it can be used directly to calculate all state properties.
///
/// Calculated partial derivatives are cached in the state. Therefore, the
/// second evaluation of a property like the pressure does not require a
/// recalculation of the equation of state. This can be used in situations
/// where both lower and higher order derivatives are required, as in a
/// calculation of a derivative all lower derivatives have to be calculated
/// internally as well. Since they are cached it is more efficient to
/// calculate the highest derivatives first.
///
/// `State` objects are meant to be immutable. If individual fields like
/// `volume` are changed, the calculations are wrong as the internal fields
/// of the state are not updated.
#[derive(Debug)]
pub struct State {
    /// Equation of state
    pub eos: Arc<Eos>,
    /// Temperature $T$
    pub temperature: Temperature,
    /// Volume $V$
    pub volume: Volume,
    /// Mole number $N$
    pub moles: Moles,
    /// Density $\rho=\frac{N}{V}$
    pub density: Density,
    /// Reduced temperature
    reduced_temperature: f64,
    /// Reduced volume
    reduced_volume: f64,
    /// Reduced moles
    reduced_moles: f64,
    /// Cache
    cache: Mutex<Cache>,
}

impl Clone for State {
    fn clone(&self) -> Self {
        Self {
            eos: self.eos.clone(),
            temperature: self.temperature,
            volume: self.volume,
            moles: self.moles,
            density: self.density,
            reduced_temperature: self.reduced_temperature,
            reduced_volume: self.reduced_volume,
            reduced_moles: self.reduced_moles,
            cache: Mutex::new(self.cache.lock().unwrap().clone()),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T = {:.5}, ρ = {:.5}", self.temperature, self.density)
    }
}

/// Variables the Helmholtz energy can be differentiated with respect to.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Derivative {
    /// With respect to volume.
    DV,
    /// With respect to temperature.
    DT,
    /// With respect to the mole number.
    DN,
}

#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub(crate) enum PartialDerivative {
    Zeroth,
    First(Derivative),
    Second(Derivative, Derivative),
    Third(Derivative),
}

/// # State constructors
impl State {
    /// Return a new `State` given a temperature, a volume and a mole number.
    ///
    /// This function will perform a validation of the given properties, i.e.
    /// test for signs and if values are finite. It will **not** validate
    /// physics, i.e. if the resulting density is below the maximum density.
    pub fn new_nvt(
        eos: &Arc<Eos>,
        temperature: Temperature,
        volume: Volume,
        moles: Moles,
    ) -> EosResult<Self> {
        validate(temperature, volume, moles)?;

        Ok(State {
            eos: eos.clone(),
            temperature,
            volume,
            moles,
            density: moles / volume,
            reduced_temperature: temperature.to_reduced(),
            reduced_volume: volume.to_reduced(),
            reduced_moles: moles.to_reduced(),
            cache: Mutex::new(Cache::new()),
        })
    }

    /// Return a new `State` given a temperature and a density. The mole
    /// number is set to the reference value.
    pub fn new_pure(eos: &Arc<Eos>, temperature: Temperature, density: Density) -> EosResult<Self> {
        let moles = Moles::from_reduced(1.0);
        Self::new_nvt(eos, temperature, moles / density, moles)
    }

    /// Return a new `State` for whichever combination of inputs is set.
    ///
    /// Over- and well-determined inputs are dispatched in a fixed order:
    /// direct construction from $T$, $V$, $\rho$ and $N$ first, a density
    /// iteration at given pressure second, and only then the caloric Newton
    /// iterations, tried as $(p, h)$, $(p, s)$, $(T, h)$, $(T, s)$,
    /// $(p, V)$, $(p, u)$, $(T, u)$, $(V, u)$.
    ///
    /// Prefer [StateBuilder] over filling in the long `Option` list by hand.
    ///
    /// # Errors
    ///
    /// When the set inputs do not pin down a state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eos: &Arc<Eos>,
        temperature: Option<Temperature>,
        volume: Option<Volume>,
        density: Option<Density>,
        moles: Option<Moles>,
        pressure: Option<Pressure>,
        molar_enthalpy: Option<MolarEnergy>,
        molar_entropy: Option<MolarEntropy>,
        molar_internal_energy: Option<MolarEnergy>,
        density_initialization: DensityInitialization,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        // check if the density is overdetermined
        if density.and(volume).and(moles).is_some() {
            return Err(EosError::UndeterminedState(String::from(
                "Density is overdetermined.",
            )));
        }

        // If no extensive property is given, the moles are set to the reference value.
        let n = moles
            .or_else(|| density.and_then(|d| volume.map(|v| v * d)))
            .unwrap_or(Moles::from_reduced(1.0));
        let v = volume.or_else(|| density.map(|d| n / d));

        if let (Some(t), Some(v)) = (temperature, v) {
            return Self::new_nvt(eos, t, v, n);
        }
        if let (Some(t), Some(p)) = (temperature, pressure) {
            return Self::new_npt(eos, t, p, n, density_initialization);
        }
        if let (Some(p), Some(h)) = (pressure, molar_enthalpy) {
            return Self::new_nph(eos, p, h, n, density_initialization, initial_temperature);
        }
        if let (Some(p), Some(s)) = (pressure, molar_entropy) {
            return Self::new_nps(eos, p, s, n, density_initialization, initial_temperature);
        }
        if let (Some(t), Some(h)) = (temperature, molar_enthalpy) {
            return Self::new_nth(eos, t, h, n, density_initialization);
        }
        if let (Some(t), Some(s)) = (temperature, molar_entropy) {
            return Self::new_nts(eos, t, s, n, density_initialization);
        }
        if let (Some(p), Some(v)) = (pressure, v) {
            return Self::new_npv(eos, p, v, n, initial_temperature);
        }
        if let (Some(p), Some(u)) = (pressure, molar_internal_energy) {
            return Self::new_npu(eos, p, u, n, density_initialization, initial_temperature);
        }
        if let (Some(t), Some(u)) = (temperature, molar_internal_energy) {
            return Self::new_ntu(eos, t, u, n, density_initialization);
        }
        if let (Some(u), Some(v)) = (molar_internal_energy, v) {
            return Self::new_nvu(eos, v, u, n, initial_temperature);
        }
        Err(EosError::UndeterminedState(String::from(
            "Missing input parameters.",
        )))
    }

    /// Return a new `State` from a density iteration at the given pressure.
    ///
    /// The [DensityInitialization] selects which root of the isotherm the
    /// iteration is steered towards.
    pub fn new_npt(
        eos: &Arc<Eos>,
        temperature: Temperature,
        pressure: Pressure,
        moles: Moles,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let ideal_gas_density = pressure / temperature / eos.gas_constant();
        let seed = match density_initialization {
            DensityInitialization::InitialDensity(rho0) => Some(rho0),
            DensityInitialization::Vapor => Some(ideal_gas_density),
            DensityInitialization::Liquid => Some(eos.max_density()),
            DensityInitialization::None => None,
        };
        if let Some(rho0) = seed {
            return density_iteration(eos, temperature, pressure, moles, rho0);
        }

        // no phase requested, solve from both ends of the isotherm
        let max_density = eos.max_density();
        let liquid = density_iteration(eos, temperature, pressure, moles, max_density);
        if ideal_gas_density >= max_density {
            return liquid;
        }
        let vapor = density_iteration(eos, temperature, pressure, moles, ideal_gas_density);
        match (&liquid, &vapor) {
            (Ok(_), Err(_)) => liquid,
            (Err(_), Ok(_)) => vapor,
            (Ok(l), Ok(v)) => {
                if l.residual_molar_gibbs_energy() > v.residual_molar_gibbs_energy() {
                    vapor
                } else {
                    liquid
                }
            }
            _ => Err(EosError::UndeterminedState(String::from(
                "Density iteration did not find a solution.",
            ))),
        }
    }

    /// Return a new `State` for given pressure $p$ and volume $V$.
    ///
    /// The density is fixed by the volume and mole number, so the pressure
    /// residual is driven to zero by iterating the temperature.
    pub fn new_npv(
        eos: &Arc<Eos>,
        pressure: Pressure,
        volume: Volume,
        moles: Moles,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let solve = |t| {
            let state = State::new_nvt(eos, t, volume, moles)?;
            let residual = state.pressure(Contributions::Total) - pressure;
            let slope = state.dp_dt(Contributions::Total);
            Ok((residual, slope, state))
        };
        newton(
            temperature_seed(initial_temperature),
            solve,
            Temperature::from_reduced(1.0e-8),
        )
    }

    /// State at given pressure $p$ and molar enthalpy $h$, found by iterating
    /// the temperature.
    pub fn new_nph(
        eos: &Arc<Eos>,
        pressure: Pressure,
        molar_enthalpy: MolarEnergy,
        moles: Moles,
        density_initialization: DensityInitialization,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let mut density = density_initialization;
        let solve = |t| {
            let state = State::new_npt(eos, t, pressure, moles, density)?;
            let residual = state.molar_enthalpy(Contributions::Total) - molar_enthalpy;
            let slope = state.molar_isobaric_heat_capacity(Contributions::Total);
            density = DensityInitialization::InitialDensity(state.density);
            Ok((residual, slope, state))
        };
        newton(
            temperature_seed(initial_temperature),
            solve,
            Temperature::from_reduced(1.0e-8),
        )
    }

    /// State at given temperature $T$ and molar enthalpy $h$, found by
    /// iterating the density.
    pub fn new_nth(
        eos: &Arc<Eos>,
        temperature: Temperature,
        molar_enthalpy: MolarEnergy,
        moles: Moles,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let n_inv = 1.0 / moles;
        let solve = |rho| {
            let state = State::new_nvt(eos, temperature, moles / rho, moles)?;
            let residual = state.molar_enthalpy(Contributions::Total) - molar_enthalpy;
            let slope = -state.volume / state.density
                * n_inv
                * (state.volume * state.dp_dv(Contributions::Total)
                    + temperature * state.dp_dt(Contributions::Total));
            Ok((residual, slope, state))
        };
        newton(
            density_seed(eos, density_initialization),
            solve,
            Density::from_reduced(1.0e-12),
        )
    }

    /// State at given temperature $T$ and molar entropy $s$, found by
    /// iterating the density.
    pub fn new_nts(
        eos: &Arc<Eos>,
        temperature: Temperature,
        molar_entropy: MolarEntropy,
        moles: Moles,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let n_inv = 1.0 / moles;
        let solve = |rho| {
            let state = State::new_nvt(eos, temperature, moles / rho, moles)?;
            let residual = state.molar_entropy(Contributions::Total) - molar_entropy;
            let slope = -n_inv * state.volume / state.density * state.dp_dt(Contributions::Total);
            Ok((residual, slope, state))
        };
        newton(
            density_seed(eos, density_initialization),
            solve,
            Density::from_reduced(1.0e-12),
        )
    }

    /// State at given temperature $T$ and molar internal energy $u$, found by
    /// iterating the density.
    pub fn new_ntu(
        eos: &Arc<Eos>,
        temperature: Temperature,
        molar_internal_energy: MolarEnergy,
        moles: Moles,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let n_inv = 1.0 / moles;
        let solve = |rho| {
            let state = State::new_nvt(eos, temperature, moles / rho, moles)?;
            let residual =
                state.molar_internal_energy(Contributions::Total) - molar_internal_energy;
            let slope = state.volume / state.density
                * n_inv
                * (state.pressure(Contributions::Total)
                    - temperature * state.dp_dt(Contributions::Total));
            Ok((residual, slope, state))
        };
        newton(
            density_seed(eos, density_initialization),
            solve,
            Density::from_reduced(1.0e-12),
        )
    }

    /// State at given pressure $p$ and molar entropy $s$, found by iterating
    /// the temperature.
    pub fn new_nps(
        eos: &Arc<Eos>,
        pressure: Pressure,
        molar_entropy: MolarEntropy,
        moles: Moles,
        density_initialization: DensityInitialization,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let mut density = density_initialization;
        let solve = |t| {
            let state = State::new_npt(eos, t, pressure, moles, density)?;
            let residual = state.molar_entropy(Contributions::Total) - molar_entropy;
            let slope =
                state.molar_isobaric_heat_capacity(Contributions::Total) / state.temperature;
            density = DensityInitialization::InitialDensity(state.density);
            Ok((residual, slope, state))
        };
        newton(
            temperature_seed(initial_temperature),
            solve,
            Temperature::from_reduced(1.0e-8),
        )
    }

    /// State at given pressure $p$ and molar internal energy $u$, found by
    /// iterating the temperature.
    pub fn new_npu(
        eos: &Arc<Eos>,
        pressure: Pressure,
        molar_internal_energy: MolarEnergy,
        moles: Moles,
        density_initialization: DensityInitialization,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let mut density = density_initialization;
        let n_inv = 1.0 / moles;
        let solve = |t| {
            let state = State::new_npt(eos, t, pressure, moles, density)?;
            let residual =
                state.molar_internal_energy(Contributions::Total) - molar_internal_energy;
            let slope = state.molar_isobaric_heat_capacity(Contributions::Total)
                + pressure * n_inv
                    * (state.dp_dt(Contributions::Total) / state.dp_dv(Contributions::Total));
            density = DensityInitialization::InitialDensity(state.density);
            Ok((residual, slope, state))
        };
        newton(
            temperature_seed(initial_temperature),
            solve,
            Temperature::from_reduced(1.0e-8),
        )
    }

    /// State at given volume $V$ and molar internal energy $u$, found by
    /// iterating the temperature at fixed density.
    pub fn new_nvu(
        eos: &Arc<Eos>,
        volume: Volume,
        molar_internal_energy: MolarEnergy,
        moles: Moles,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let solve = |t| {
            let state = State::new_nvt(eos, t, volume, moles)?;
            let residual =
                state.molar_internal_energy(Contributions::Total) - molar_internal_energy;
            let slope = state.molar_isochoric_heat_capacity(Contributions::Total);
            Ok((residual, slope, state))
        };
        newton(
            temperature_seed(initial_temperature),
            solve,
            Temperature::from_reduced(1.0e-8),
        )
    }

    /// Update the state with the given temperature.
    pub fn update_temperature(&self, temperature: Temperature) -> EosResult<Self> {
        Self::new_nvt(&self.eos, temperature, self.volume, self.moles)
    }

    /// [StateHD] with plain values and no derivative direction.
    pub fn derive0(&self) -> StateHD<f64> {
        StateHD::new(
            self.reduced_temperature,
            self.reduced_volume,
            self.reduced_moles,
        )
    }

    /// [StateHD] seeded for the first derivative in the given direction.
    pub fn derive1(&self, derivative: Derivative) -> StateHD<Dual64> {
        let t = Dual64::from(self.reduced_temperature);
        let v = Dual64::from(self.reduced_volume);
        let n = Dual64::from(self.reduced_moles);
        let (t, v, n) = match derivative {
            Derivative::DT => (t.derivative(), v, n),
            Derivative::DV => (t, v.derivative(), n),
            Derivative::DN => (t, v, n.derivative()),
        };
        StateHD::new(t, v, n)
    }

    /// [StateHD] seeded for the first and second derivative in the given
    /// direction.
    pub fn derive2(&self, derivative: Derivative) -> StateHD<Dual2_64> {
        let t = Dual2_64::from(self.reduced_temperature);
        let v = Dual2_64::from(self.reduced_volume);
        let n = Dual2_64::from(self.reduced_moles);
        let (t, v, n) = match derivative {
            Derivative::DT => (t.derivative(), v, n),
            Derivative::DV => (t, v.derivative(), n),
            Derivative::DN => (t, v, n.derivative()),
        };
        StateHD::new(t, v, n)
    }

    /// [StateHD] seeded for a mixed second derivative.
    pub fn derive2_mixed(
        &self,
        derivative1: Derivative,
        derivative2: Derivative,
    ) -> StateHD<HyperDual64> {
        let t = HyperDual64::from(self.reduced_temperature);
        let v = HyperDual64::from(self.reduced_volume);
        let n = HyperDual64::from(self.reduced_moles);
        let (t, v, n) = match derivative1 {
            Derivative::DT => (t.derivative1(), v, n),
            Derivative::DV => (t, v.derivative1(), n),
            Derivative::DN => (t, v, n.derivative1()),
        };
        let (t, v, n) = match derivative2 {
            Derivative::DT => (t.derivative2(), v, n),
            Derivative::DV => (t, v.derivative2(), n),
            Derivative::DN => (t, v, n.derivative2()),
        };
        StateHD::new(t, v, n)
    }

    /// [StateHD] seeded for derivatives up to third order in the given
    /// direction.
    pub fn derive3(&self, derivative: Derivative) -> StateHD<Dual3_64> {
        let t = Dual3_64::from(self.reduced_temperature);
        let v = Dual3_64::from(self.reduced_volume);
        let n = Dual3_64::from(self.reduced_moles);
        let (t, v, n) = match derivative {
            Derivative::DT => (t.derivative(), v, n),
            Derivative::DV => (t, v.derivative(), n),
            Derivative::DN => (t, v, n.derivative()),
        };
        StateHD::new(t, v, n)
    }
}

/// Starting temperature for the caloric Newton iterations.
fn temperature_seed(initial_temperature: Option<Temperature>) -> Temperature {
    initial_temperature.unwrap_or(Temperature::from_reduced(298.15))
}

/// Starting density for the isothermal caloric Newton iterations.
fn density_seed(eos: &Eos, density_initialization: DensityInitialization) -> Density {
    match density_initialization {
        DensityInitialization::InitialDensity(rho0) => rho0,
        DensityInitialization::Liquid => eos.max_density(),
        DensityInitialization::Vapor => 1.0e-5 * eos.max_density(),
        DensityInitialization::None => 0.01 * eos.max_density(),
    }
}

fn is_close<U: Copy>(
    x: Quantity<f64, U>,
    y: Quantity<f64, U>,
    atol: Quantity<f64, U>,
    rtol: f64,
) -> bool {
    (x - y).abs() <= atol + rtol * y.abs()
}

/// Newton iteration on a scalar residual, generic over the iterated variable.
///
/// The callback returns the residual, its derivative with respect to the
/// iterated variable and the state it was evaluated at, so the converged
/// state is handed back without an extra evaluation.
fn newton<F, X: Copy, Y: Copy>(
    mut x0: Quantity<f64, X>,
    mut f: F,
    atol: Quantity<f64, X>,
) -> EosResult<State>
where
    Y: Sub<X> + Sub<<Y as Sub<X>>::Output, Output = X>,
    F: FnMut(
        Quantity<f64, X>,
    ) -> EosResult<(
        Quantity<f64, Y>,
        Quantity<f64, <Y as Sub<X>>::Output>,
        State,
    )>,
{
    let rtol = 1e-10;
    let maxiter = 50;

    for _ in 0..maxiter {
        let (residual, slope, state) = f(x0)?;
        let x = x0 - residual / slope;
        if is_close(x, x0, atol, rtol) {
            return Ok(state);
        }
        x0 = x;
    }
    Err(EosError::NotConverged("newton".to_owned()))
}

/// Reject non finite or negative temperature, volume and mole number.
///
/// Physics is not checked here, a density above the model's maximum density
/// passes validation and fails later in the evaluation.
fn validate(temperature: Temperature, volume: Volume, moles: Moles) -> EosResult<()> {
    let check = |name: &str, value: f64| {
        if value.is_finite() && !value.is_sign_negative() {
            Ok(())
        } else {
            Err(EosError::InvalidState(
                String::from("validate"),
                String::from(name),
                value,
            ))
        }
    };
    check("temperature", temperature.to_reduced())?;
    check("volume", volume.to_reduced())?;
    check("moles", moles.to_reduced())
}

/// Temperature or pressure given as the specified variable of a
/// phase equilibrium.
#[derive(Clone, Copy)]
pub enum TPSpec {
    Temperature(Temperature),
    Pressure(Pressure),
}

impl From<Temperature> for TPSpec {
    fn from(temperature: Temperature) -> Self {
        Self::Temperature(temperature)
    }
}

// The `Pressure` alias itself does not resolve in the impl header.
impl From<Quantity<f64, SIUnit<N2, N1, P1, Z0, Z0, Z0, Z0>>> for TPSpec {
    fn from(pressure: Pressure) -> Self {
        Self::Pressure(pressure)
    }
}
