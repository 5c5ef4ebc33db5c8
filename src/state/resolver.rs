//! Resolution of property specification pairs into thermodynamic states.
//!
//! A state can be specified by any combination of two of temperature,
//! pressure, density, enthalpy, entropy, internal energy and vapor quality.
//! Caloric and density inputs are accepted on a molar or a mass basis.
//! Depending on the pair, the state is either constructed directly, located
//! relative to the saturation curve, or determined from a Newton iteration
//! that treats the phase split as part of the system of equations.
use super::{Contributions, DensityInitialization, State};
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::phase_equilibria::PhaseEquilibrium;
use crate::{ReferenceSystem, SolverOptions, Verbosity};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use num_dual::linalg::LU;
use quantity::{
    Density, MassDensity, MolarEnergy, MolarEntropy, MolarWeight, Moles, Pressure, SpecificEnergy,
    SpecificEntropy, Temperature, Velocity,
};
use std::fmt;
use std::sync::Arc;
use typenum::{Quot, P2};

const MAX_ITER_FLASH: usize = 50;
const TOL_FLASH: f64 = 1e-10;

/// A single specified property, on a molar or a mass basis.
#[derive(Clone, Copy, Debug)]
pub enum PropertySpec {
    Temperature(Temperature),
    Pressure(Pressure),
    Density(Density),
    MassDensity(MassDensity),
    MolarEnthalpy(MolarEnergy),
    SpecificEnthalpy(SpecificEnergy),
    MolarEntropy(MolarEntropy),
    SpecificEntropy(SpecificEntropy),
    MolarInternalEnergy(MolarEnergy),
    SpecificInternalEnergy(SpecificEnergy),
    VaporQuality(f64),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Temperature,
    Pressure,
    Density,
    Enthalpy,
    Entropy,
    InternalEnergy,
    VaporQuality,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Density => "density",
            Self::Enthalpy => "enthalpy",
            Self::Entropy => "entropy",
            Self::InternalEnergy => "internal energy",
            Self::VaporQuality => "vapor quality",
        };
        write!(f, "{}", name)
    }
}

impl PropertySpec {
    fn kind(&self) -> PropertyKind {
        match self {
            Self::Temperature(_) => PropertyKind::Temperature,
            Self::Pressure(_) => PropertyKind::Pressure,
            Self::Density(_) | Self::MassDensity(_) => PropertyKind::Density,
            Self::MolarEnthalpy(_) | Self::SpecificEnthalpy(_) => PropertyKind::Enthalpy,
            Self::MolarEntropy(_) | Self::SpecificEntropy(_) => PropertyKind::Entropy,
            Self::MolarInternalEnergy(_) | Self::SpecificInternalEnergy(_) => {
                PropertyKind::InternalEnergy
            }
            Self::VaporQuality(_) => PropertyKind::VaporQuality,
        }
    }
}

/// A pair of specified properties that uniquely determines a state.
///
/// Seventeen combinations are valid. Pairs that specify the same property
/// twice (also on different bases, like molar density and mass density) are
/// rejected, as is the vapor quality in combination with anything but
/// temperature or pressure.
#[derive(Clone, Copy, Debug)]
pub struct StateSpecification([PropertySpec; 2]);

impl StateSpecification {
    pub fn new(first: PropertySpec, second: PropertySpec) -> EosResult<Self> {
        let (k1, k2) = (first.kind(), second.kind());
        if k1 == k2 {
            return Err(EosError::InvalidInputPair(format!("{} and {}", k1, k2)));
        }
        let caloric_or_density = |k: PropertyKind| {
            matches!(
                k,
                PropertyKind::Density
                    | PropertyKind::Enthalpy
                    | PropertyKind::Entropy
                    | PropertyKind::InternalEnergy
            )
        };
        if (k1 == PropertyKind::VaporQuality && caloric_or_density(k2))
            || (k2 == PropertyKind::VaporQuality && caloric_or_density(k1))
        {
            return Err(EosError::InvalidInputPair(format!("{} and {}", k1, k2)));
        }
        Ok(Self([first, second]))
    }

    /// The two specified properties on a molar basis, in canonical order.
    fn normalized(&self, eos: &Eos) -> [Property; 2] {
        let mut pair = [
            Property::from_spec(self.0[0], eos.molarweight),
            Property::from_spec(self.0[1], eos.molarweight),
        ];
        if pair[1].index() < pair[0].index() {
            pair.swap(0, 1);
        }
        pair
    }
}

/// Specified property after conversion to a molar basis.
#[derive(Clone, Copy)]
enum Property {
    Temperature(Temperature),
    Pressure(Pressure),
    Density(Density),
    Caloric(Caloric),
    VaporQuality(f64),
}

impl Property {
    fn from_spec(spec: PropertySpec, molarweight: MolarWeight) -> Self {
        match spec {
            PropertySpec::Temperature(t) => Self::Temperature(t),
            PropertySpec::Pressure(p) => Self::Pressure(p),
            PropertySpec::Density(d) => Self::Density(d),
            PropertySpec::MassDensity(d) => Self::Density(d / molarweight),
            PropertySpec::MolarEnthalpy(h) => Self::Caloric(Caloric::Enthalpy(h)),
            PropertySpec::SpecificEnthalpy(h) => Self::Caloric(Caloric::Enthalpy(h * molarweight)),
            PropertySpec::MolarEntropy(s) => Self::Caloric(Caloric::Entropy(s)),
            PropertySpec::SpecificEntropy(s) => Self::Caloric(Caloric::Entropy(s * molarweight)),
            PropertySpec::MolarInternalEnergy(u) => Self::Caloric(Caloric::InternalEnergy(u)),
            PropertySpec::SpecificInternalEnergy(u) => {
                Self::Caloric(Caloric::InternalEnergy(u * molarweight))
            }
            PropertySpec::VaporQuality(x) => Self::VaporQuality(x),
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Temperature(_) => 0,
            Self::Pressure(_) => 1,
            Self::Density(_) => 2,
            Self::Caloric(c) => 3 + c.index(),
            Self::VaporQuality(_) => 6,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Temperature(_) => "temperature",
            Self::Pressure(_) => "pressure",
            Self::Density(_) => "density",
            Self::Caloric(Caloric::Enthalpy(_)) => "enthalpy",
            Self::Caloric(Caloric::Entropy(_)) => "entropy",
            Self::Caloric(Caloric::InternalEnergy(_)) => "internal energy",
            Self::VaporQuality(_) => "vapor quality",
        }
    }
}

/// A specified molar caloric property.
#[derive(Clone, Copy)]
enum Caloric {
    Enthalpy(MolarEnergy),
    Entropy(MolarEntropy),
    InternalEnergy(MolarEnergy),
}

impl Caloric {
    fn index(&self) -> usize {
        match self {
            Self::Enthalpy(_) => 0,
            Self::Entropy(_) => 1,
            Self::InternalEnergy(_) => 2,
        }
    }

    /// Specified value in (molar) SI units.
    fn target(&self) -> f64 {
        match self {
            Self::Enthalpy(h) => h.to_reduced(),
            Self::Entropy(s) => s.to_reduced(),
            Self::InternalEnergy(u) => u.to_reduced(),
        }
    }

    /// Scale used to nondimensionalize residuals of this property.
    fn scale(&self, eos: &Eos) -> f64 {
        match self {
            Self::Entropy(_) => eos.r(),
            _ => eos.r() * eos.constants.tc,
        }
    }

    /// Value of the property for the given state in (molar) SI units.
    fn eval(&self, state: &State) -> f64 {
        let c = Contributions::Total;
        match self {
            Self::Enthalpy(_) => state.molar_enthalpy(c).to_reduced(),
            Self::Entropy(_) => state.molar_entropy(c).to_reduced(),
            Self::InternalEnergy(_) => state.molar_internal_energy(c).to_reduced(),
        }
    }

    /// Partial derivative w.r.t. temperature at constant density.
    fn deriv_t(&self, state: &State) -> f64 {
        let c = Contributions::Total;
        let cv = state.molar_isochoric_heat_capacity(c);
        match self {
            Self::Enthalpy(_) => (cv + state.dp_dt(c) / state.density).to_reduced(),
            Self::Entropy(_) => (cv / state.temperature).to_reduced(),
            Self::InternalEnergy(_) => cv.to_reduced(),
        }
    }

    /// Partial derivative w.r.t. density at constant temperature.
    fn deriv_rho(&self, state: &State) -> f64 {
        let c = Contributions::Total;
        let rho2 = state.density.powi::<P2>();
        match self {
            Self::Enthalpy(_) => (state.dp_drho(c) / state.density
                - state.temperature * state.dp_dt(c) / rho2)
                .to_reduced(),
            Self::Entropy(_) => (-state.dp_dt(c) / rho2).to_reduced(),
            Self::InternalEnergy(_) => {
                ((state.pressure(c) - state.temperature * state.dp_dt(c)) / rho2).to_reduced()
            }
        }
    }

    fn state_at_temperature(
        &self,
        eos: &Arc<Eos>,
        temperature: Temperature,
        density_initialization: DensityInitialization,
    ) -> EosResult<State> {
        let moles = Moles::from_reduced(1.0);
        match *self {
            Self::Enthalpy(h) => State::new_nth(eos, temperature, h, moles, density_initialization),
            Self::Entropy(s) => State::new_nts(eos, temperature, s, moles, density_initialization),
            Self::InternalEnergy(u) => {
                State::new_ntu(eos, temperature, u, moles, density_initialization)
            }
        }
    }

    fn state_at_pressure(
        &self,
        eos: &Arc<Eos>,
        pressure: Pressure,
        density_initialization: DensityInitialization,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<State> {
        let moles = Moles::from_reduced(1.0);
        let ti = initial_temperature;
        match *self {
            Self::Enthalpy(h) => State::new_nph(eos, pressure, h, moles, density_initialization, ti),
            Self::Entropy(s) => State::new_nps(eos, pressure, s, moles, density_initialization, ti),
            Self::InternalEnergy(u) => {
                State::new_npu(eos, pressure, u, moles, density_initialization, ti)
            }
        }
    }
}

/// Phase of a single phase state relative to the saturation curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Liquid,
    Vapor,
    Supercritical,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Liquid => write!(f, "liquid"),
            Self::Vapor => write!(f, "vapor"),
            Self::Supercritical => write!(f, "supercritical"),
        }
    }
}

/// Warning for converged states outside the range of validity of the
/// underlying correlation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainWarning {
    TemperatureOutOfRange,
    DensityOutOfRange,
    PressureOutOfRange,
}

impl fmt::Display for DomainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = match self {
            Self::TemperatureOutOfRange => "temperature",
            Self::DensityOutOfRange => "density",
            Self::PressureOutOfRange => "pressure",
        };
        write!(f, "{} outside of the range of validity", property)
    }
}

/// An equilibrium of a saturated liquid and a saturated vapor phase
/// together with the vapor fraction.
#[derive(Clone, Debug)]
pub struct TwoPhaseState {
    vle: PhaseEquilibrium,
    quality: f64,
}

impl TwoPhaseState {
    /// Combine a phase equilibrium and a molar vapor fraction.
    pub fn new(vle: PhaseEquilibrium, quality: f64) -> EosResult<Self> {
        if !quality.is_finite() || !(0.0..=1.0).contains(&quality) {
            return Err(EosError::InvalidState(
                String::from("TwoPhaseState"),
                String::from("vapor quality"),
                quality,
            ));
        }
        Ok(Self { vle, quality })
    }

    pub fn vapor(&self) -> &State {
        self.vle.vapor()
    }

    pub fn liquid(&self) -> &State {
        self.vle.liquid()
    }

    /// Molar fraction of the vapor phase. For a pure fluid the mass
    /// fraction is identical.
    pub fn vapor_quality(&self) -> f64 {
        self.quality
    }

    pub fn temperature(&self) -> Temperature {
        self.vapor().temperature
    }

    /// Saturation pressure.
    pub fn pressure(&self) -> Pressure {
        self.vapor().pressure(Contributions::Total)
    }

    /// Overall density of the phase split.
    pub fn density(&self) -> Density {
        (self.quality / self.vapor().density + (1.0 - self.quality) / self.liquid().density)
            .inv()
    }

    pub fn mass_density(&self) -> MassDensity {
        self.density() * self.vapor().total_molar_weight()
    }

    pub fn molar_enthalpy(&self) -> MolarEnergy {
        let c = Contributions::Total;
        self.quality * self.vapor().molar_enthalpy(c)
            + (1.0 - self.quality) * self.liquid().molar_enthalpy(c)
    }

    pub fn specific_enthalpy(&self) -> SpecificEnergy {
        self.molar_enthalpy() / self.vapor().total_molar_weight()
    }

    pub fn molar_entropy(&self) -> MolarEntropy {
        let c = Contributions::Total;
        self.quality * self.vapor().molar_entropy(c)
            + (1.0 - self.quality) * self.liquid().molar_entropy(c)
    }

    pub fn specific_entropy(&self) -> SpecificEntropy {
        self.molar_entropy() / self.vapor().total_molar_weight()
    }

    pub fn molar_internal_energy(&self) -> MolarEnergy {
        let c = Contributions::Total;
        self.quality * self.vapor().molar_internal_energy(c)
            + (1.0 - self.quality) * self.liquid().molar_internal_energy(c)
    }

    pub fn specific_internal_energy(&self) -> SpecificEnergy {
        self.molar_internal_energy() / self.vapor().total_molar_weight()
    }

    /// Slope of the vapor pressure curve from the Clapeyron relation.
    pub fn dp_dt(&self) -> Quot<Pressure, Temperature> {
        let c = Contributions::Total;
        (self.vapor().molar_entropy(c) - self.liquid().molar_entropy(c))
            / (self.vapor().molar_volume() - self.liquid().molar_volume())
    }
}

impl fmt::Display for TwoPhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T = {:.5}, p = {:.5}, x = {:.5}",
            self.temperature(),
            self.pressure(),
            self.quality
        )
    }
}

/// A thermodynamic state resolved from a property specification pair.
///
/// The state is either a single phase, classified relative to the
/// saturation curve, or a split into a saturated liquid and a saturated
/// vapor phase.
#[derive(Clone, Debug)]
pub enum ResolvedState {
    SinglePhase(State, Phase),
    TwoPhase(TwoPhaseState),
}

impl fmt::Display for ResolvedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePhase(state, phase) => write!(f, "{} ({})", state, phase),
            Self::TwoPhase(two_phase) => write!(f, "{}", two_phase),
        }
    }
}

impl ResolvedState {
    /// Resolve a property specification pair into a state.
    ///
    /// The initial temperature and the density initialization are used as
    /// starting values where the respective variable has to be iterated.
    pub fn new(
        eos: &Arc<Eos>,
        specification: StateSpecification,
        initial_temperature: Option<Temperature>,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let [first, second] = specification.normalized(eos);
        match (first, second) {
            (Property::Temperature(t), Property::Pressure(p)) => {
                Self::new_tp(eos, t, p, density_initialization)
            }
            (Property::Temperature(t), Property::Density(rho)) => Self::new_trho(eos, t, rho),
            (Property::Temperature(t), Property::Caloric(c)) => Self::new_t_caloric(eos, t, c),
            (Property::Temperature(t), Property::VaporQuality(x)) => Self::new_tq(eos, t, x),
            (Property::Pressure(p), Property::Density(rho)) => {
                Self::new_prho(eos, p, rho, initial_temperature)
            }
            (Property::Pressure(p), Property::Caloric(c)) => {
                Self::new_p_caloric(eos, p, c, initial_temperature)
            }
            (Property::Pressure(p), Property::VaporQuality(x)) => Self::new_pq(eos, p, x),
            (Property::Density(rho), Property::Caloric(c)) => {
                Self::new_rho_caloric(eos, rho, c, initial_temperature, options)
            }
            (Property::Caloric(c1), Property::Caloric(c2)) => Self::new_caloric_pair(
                eos,
                c1,
                c2,
                initial_temperature,
                density_initialization,
                options,
            ),
            (first, second) => Err(EosError::InvalidInputPair(format!(
                "{} and {}",
                first.name(),
                second.name()
            ))),
        }
    }

    fn new_tp(
        eos: &Arc<Eos>,
        temperature: Temperature,
        pressure: Pressure,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let state = State::new_npt(
            eos,
            temperature,
            pressure,
            Moles::from_reduced(1.0),
            density_initialization,
        )?;
        let phase = check_single_phase(eos, &state).unwrap_or_else(|| {
            // metastable root between the binodal densities
            if state.density >= eos.critical_density() {
                Phase::Liquid
            } else {
                Phase::Vapor
            }
        });
        Ok(Self::SinglePhase(state, phase))
    }

    fn new_trho(eos: &Arc<Eos>, temperature: Temperature, density: Density) -> EosResult<Self> {
        if temperature < eos.critical_temperature() {
            if let Ok(vle) = PhaseEquilibrium::pure(eos, temperature, None, SolverOptions::default())
            {
                let rho_v = vle.vapor().density;
                let rho_l = vle.liquid().density;
                if density > rho_v && density < rho_l {
                    let quality = ((density.inv() - rho_l.inv())
                        / (rho_v.inv() - rho_l.inv()))
                    .into_value();
                    return Ok(Self::TwoPhase(TwoPhaseState { vle, quality }));
                }
                let state = State::new_pure(eos, temperature, density)?;
                let phase = if density >= rho_l {
                    Phase::Liquid
                } else {
                    Phase::Vapor
                };
                return Ok(Self::SinglePhase(state, phase));
            }
        }
        let state = State::new_pure(eos, temperature, density)?;
        let phase = if temperature >= eos.critical_temperature() {
            Phase::Supercritical
        } else if density >= eos.critical_density() {
            Phase::Liquid
        } else {
            Phase::Vapor
        };
        Ok(Self::SinglePhase(state, phase))
    }

    fn new_tq(eos: &Arc<Eos>, temperature: Temperature, quality: f64) -> EosResult<Self> {
        if temperature >= eos.critical_temperature() {
            return Err(EosError::SuperCritical);
        }
        let vle = PhaseEquilibrium::pure(eos, temperature, None, SolverOptions::default())?;
        Ok(Self::TwoPhase(TwoPhaseState::new(vle, quality)?))
    }

    fn new_t_caloric(eos: &Arc<Eos>, temperature: Temperature, caloric: Caloric) -> EosResult<Self> {
        if temperature < eos.critical_temperature() {
            if let Ok(vle) = PhaseEquilibrium::pure(eos, temperature, None, SolverOptions::default())
            {
                let phi_l = caloric.eval(vle.liquid());
                let phi_v = caloric.eval(vle.vapor());
                let target = caloric.target();
                if target > phi_l && target < phi_v {
                    let quality = (target - phi_l) / (phi_v - phi_l);
                    return Ok(Self::TwoPhase(TwoPhaseState { vle, quality }));
                }
                let (phase, rho0) = if target <= phi_l {
                    (Phase::Liquid, vle.liquid().density)
                } else {
                    (Phase::Vapor, vle.vapor().density)
                };
                let state = caloric.state_at_temperature(
                    eos,
                    temperature,
                    DensityInitialization::InitialDensity(rho0),
                )?;
                return Ok(Self::SinglePhase(state, phase));
            }
        }
        let state =
            caloric.state_at_temperature(eos, temperature, DensityInitialization::None)?;
        let phase = check_single_phase(eos, &state)
            .ok_or_else(|| EosError::NotConverged(String::from("new_t_caloric")))?;
        Ok(Self::SinglePhase(state, phase))
    }

    fn new_prho(
        eos: &Arc<Eos>,
        pressure: Pressure,
        density: Density,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        let moles = Moles::from_reduced(1.0);
        if pressure < eos.critical_pressure() {
            if let Ok(vle) = PhaseEquilibrium::pure(eos, pressure, None, SolverOptions::default()) {
                let rho_v = vle.vapor().density;
                let rho_l = vle.liquid().density;
                if density > rho_v && density < rho_l {
                    let quality = ((density.inv() - rho_l.inv())
                        / (rho_v.inv() - rho_l.inv()))
                    .into_value();
                    return Ok(Self::TwoPhase(TwoPhaseState { vle, quality }));
                }
                let phase = if density >= rho_l {
                    Phase::Liquid
                } else {
                    Phase::Vapor
                };
                let t0 = initial_temperature.unwrap_or(vle.vapor().temperature);
                let state = State::new_npv(eos, pressure, moles / density, moles, Some(t0))?;
                return Ok(Self::SinglePhase(state, phase));
            }
        }
        let state = State::new_npv(eos, pressure, moles / density, moles, initial_temperature)?;
        let phase = check_single_phase(eos, &state)
            .ok_or_else(|| EosError::NotConverged(String::from("new_prho")))?;
        Ok(Self::SinglePhase(state, phase))
    }

    fn new_pq(eos: &Arc<Eos>, pressure: Pressure, quality: f64) -> EosResult<Self> {
        if pressure >= eos.critical_pressure() {
            return Err(EosError::SuperCritical);
        }
        let vle = PhaseEquilibrium::pure(eos, pressure, None, SolverOptions::default())?;
        Ok(Self::TwoPhase(TwoPhaseState::new(vle, quality)?))
    }

    fn new_p_caloric(
        eos: &Arc<Eos>,
        pressure: Pressure,
        caloric: Caloric,
        initial_temperature: Option<Temperature>,
    ) -> EosResult<Self> {
        if pressure < eos.critical_pressure() {
            if let Ok(vle) = PhaseEquilibrium::pure(eos, pressure, None, SolverOptions::default()) {
                let phi_l = caloric.eval(vle.liquid());
                let phi_v = caloric.eval(vle.vapor());
                let target = caloric.target();
                if target > phi_l && target < phi_v {
                    let quality = (target - phi_l) / (phi_v - phi_l);
                    return Ok(Self::TwoPhase(TwoPhaseState { vle, quality }));
                }
                let (phase, rho0, t0) = if target <= phi_l {
                    (Phase::Liquid, vle.liquid().density, vle.liquid().temperature)
                } else {
                    (Phase::Vapor, vle.vapor().density, vle.vapor().temperature)
                };
                let state = caloric.state_at_pressure(
                    eos,
                    pressure,
                    DensityInitialization::InitialDensity(rho0),
                    Some(initial_temperature.unwrap_or(t0)),
                )?;
                return Ok(Self::SinglePhase(state, phase));
            }
        }
        let state = caloric.state_at_pressure(
            eos,
            pressure,
            DensityInitialization::None,
            initial_temperature,
        )?;
        let phase = check_single_phase(eos, &state)
            .ok_or_else(|| EosError::NotConverged(String::from("new_p_caloric")))?;
        Ok(Self::SinglePhase(state, phase))
    }

    fn new_rho_caloric(
        eos: &Arc<Eos>,
        density: Density,
        caloric: Caloric,
        initial_temperature: Option<Temperature>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let tc = eos.constants.tc;
        let mut t_seeds = Vec::new();
        if let Some(t0) = initial_temperature {
            t_seeds.push(t0.to_reduced());
        }
        t_seeds.push(0.9 * tc);
        t_seeds.push(1.2 * tc);
        t_seeds.push(0.5 * (eos.constants.t_triple + tc));
        for &t0 in &t_seeds {
            if let Ok(state) = solve_t_at_density(eos, density, caloric, t0, options) {
                if let Some(phase) = check_single_phase(eos, &state) {
                    return Ok(Self::SinglePhase(state, phase));
                }
            }
        }
        Self::resolve_two_phase(
            eos,
            Mix::Density(density),
            Mix::Caloric(caloric),
            initial_temperature,
            options,
        )
    }

    fn new_caloric_pair(
        eos: &Arc<Eos>,
        caloric1: Caloric,
        caloric2: Caloric,
        initial_temperature: Option<Temperature>,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let rho_max = eos.max_density().to_reduced();
        let mut rho_seeds = Vec::new();
        match density_initialization {
            DensityInitialization::InitialDensity(rho) => rho_seeds.push(rho.to_reduced()),
            DensityInitialization::Liquid => rho_seeds.push(0.9 * rho_max),
            DensityInitialization::Vapor => rho_seeds.push(1.0e-3 * rho_max),
            DensityInitialization::None => (),
        }
        rho_seeds.push(1.0e-3 * rho_max);
        rho_seeds.push(eos.constants.rhoc);
        rho_seeds.push(0.9 * rho_max);
        let t0 = initial_temperature
            .map_or(0.9 * eos.constants.tc, |t| t.to_reduced());
        for &rho0 in &rho_seeds {
            if let Ok(state) = solve_t_rho(eos, caloric1, caloric2, t0, rho0, options) {
                if let Some(phase) = check_single_phase(eos, &state) {
                    return Ok(Self::SinglePhase(state, phase));
                }
            }
        }
        Self::resolve_two_phase(
            eos,
            Mix::Caloric(caloric1),
            Mix::Caloric(caloric2),
            initial_temperature,
            options,
        )
    }

    fn resolve_two_phase(
        eos: &Arc<Eos>,
        mix1: Mix,
        mix2: Mix,
        initial_temperature: Option<Temperature>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let tc = eos.constants.tc;
        let tt = eos.constants.t_triple;
        let mut t_seeds = Vec::new();
        if let Some(t0) = initial_temperature {
            t_seeds.push(t0.to_reduced().min(0.99 * tc));
        }
        t_seeds.push(0.5 * (tt + tc));
        t_seeds.push(tt + 0.05 * (tc - tt));
        t_seeds.push(0.95 * tc);
        for &t0 in &t_seeds {
            if let Ok((vle, quality)) =
                solve_two_phase(eos, mix1, mix2, Temperature::from_reduced(t0), options)
            {
                return Ok(Self::TwoPhase(TwoPhaseState { vle, quality }));
            }
        }
        Err(EosError::NotConverged(String::from("resolve_two_phase")))
    }

    pub fn temperature(&self) -> Temperature {
        match self {
            Self::SinglePhase(state, _) => state.temperature,
            Self::TwoPhase(two_phase) => two_phase.temperature(),
        }
    }

    pub fn pressure(&self) -> Pressure {
        match self {
            Self::SinglePhase(state, _) => state.pressure(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.pressure(),
        }
    }

    pub fn density(&self) -> Density {
        match self {
            Self::SinglePhase(state, _) => state.density,
            Self::TwoPhase(two_phase) => two_phase.density(),
        }
    }

    pub fn mass_density(&self) -> MassDensity {
        match self {
            Self::SinglePhase(state, _) => state.mass_density(),
            Self::TwoPhase(two_phase) => two_phase.mass_density(),
        }
    }

    pub fn molar_enthalpy(&self) -> MolarEnergy {
        match self {
            Self::SinglePhase(state, _) => state.molar_enthalpy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.molar_enthalpy(),
        }
    }

    pub fn specific_enthalpy(&self) -> SpecificEnergy {
        match self {
            Self::SinglePhase(state, _) => state.specific_enthalpy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.specific_enthalpy(),
        }
    }

    pub fn molar_entropy(&self) -> MolarEntropy {
        match self {
            Self::SinglePhase(state, _) => state.molar_entropy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.molar_entropy(),
        }
    }

    pub fn specific_entropy(&self) -> SpecificEntropy {
        match self {
            Self::SinglePhase(state, _) => state.specific_entropy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.specific_entropy(),
        }
    }

    pub fn molar_internal_energy(&self) -> MolarEnergy {
        match self {
            Self::SinglePhase(state, _) => state.molar_internal_energy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.molar_internal_energy(),
        }
    }

    pub fn specific_internal_energy(&self) -> SpecificEnergy {
        match self {
            Self::SinglePhase(state, _) => state.specific_internal_energy(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.specific_internal_energy(),
        }
    }

    /// Molar vapor fraction, `None` for a single phase state.
    pub fn vapor_quality(&self) -> Option<f64> {
        match self {
            Self::SinglePhase(..) => None,
            Self::TwoPhase(two_phase) => Some(two_phase.vapor_quality()),
        }
    }

    /// Molar isochoric heat capacity, `None` inside the two phase region.
    pub fn molar_isochoric_heat_capacity(&self) -> Option<MolarEntropy> {
        match self {
            Self::SinglePhase(state, _) => {
                Some(state.molar_isochoric_heat_capacity(Contributions::Total))
            }
            Self::TwoPhase(_) => None,
        }
    }

    /// Molar isobaric heat capacity, `None` inside the two phase region.
    pub fn molar_isobaric_heat_capacity(&self) -> Option<MolarEntropy> {
        match self {
            Self::SinglePhase(state, _) => {
                Some(state.molar_isobaric_heat_capacity(Contributions::Total))
            }
            Self::TwoPhase(_) => None,
        }
    }

    /// Speed of sound, `None` inside the two phase region.
    pub fn speed_of_sound(&self) -> Option<Velocity> {
        match self {
            Self::SinglePhase(state, _) => Some(state.speed_of_sound()),
            Self::TwoPhase(_) => None,
        }
    }

    /// Partial derivative of the pressure w.r.t. temperature at constant
    /// density. Inside the two phase region this is the slope of the vapor
    /// pressure curve.
    pub fn dp_dt(&self) -> Quot<Pressure, Temperature> {
        match self {
            Self::SinglePhase(state, _) => state.dp_dt(Contributions::Total),
            Self::TwoPhase(two_phase) => two_phase.dp_dt(),
        }
    }

    /// Warnings for states outside the range of validity of the
    /// correlation. The state itself remains usable.
    pub fn domain_warnings(&self) -> Vec<DomainWarning> {
        let eos = match self {
            Self::SinglePhase(state, _) => &state.eos,
            Self::TwoPhase(two_phase) => &two_phase.vapor().eos,
        };
        let mut warnings = Vec::new();
        let t = self.temperature().to_reduced();
        if t < eos.constants.t_triple || eos.constants.t_max.map_or(false, |t_max| t > t_max) {
            warnings.push(DomainWarning::TemperatureOutOfRange);
        }
        if self.density() > eos.max_density() {
            warnings.push(DomainWarning::DensityOutOfRange);
        }
        if let Some(p_max) = eos.constants.p_max {
            if self.pressure().to_reduced() > p_max {
                warnings.push(DomainWarning::PressureOutOfRange);
            }
        }
        warnings
    }
}

/// Classify a converged state relative to the saturation curve. Returns
/// `None` if the state lies between the binodal densities.
fn check_single_phase(eos: &Arc<Eos>, state: &State) -> Option<Phase> {
    if state.temperature >= eos.critical_temperature() {
        return Some(Phase::Supercritical);
    }
    match PhaseEquilibrium::pure(eos, state.temperature, None, SolverOptions::default()) {
        Ok(vle) => {
            if state.density >= vle.liquid().density {
                Some(Phase::Liquid)
            } else if state.density <= vle.vapor().density {
                Some(Phase::Vapor)
            } else {
                None
            }
        }
        Err(_) => Some(if state.density >= eos.critical_density() {
            Phase::Liquid
        } else {
            Phase::Vapor
        }),
    }
}

/// Specification of a mixed (lever rule) equation in a two phase flash.
#[derive(Clone, Copy)]
enum Mix {
    Density(Density),
    Caloric(Caloric),
}

impl Mix {
    /// Initial vapor fraction from the lever rule at the initial
    /// equilibrium.
    fn initial_quality(&self, liquid: &State, vapor: &State) -> f64 {
        let q = match self {
            Self::Density(rho) => ((rho.inv() - liquid.density.inv())
                / (vapor.density.inv() - liquid.density.inv()))
            .into_value(),
            Self::Caloric(c) => {
                (c.target() - c.eval(liquid)) / (c.eval(vapor) - c.eval(liquid))
            }
        };
        q.clamp(0.01, 0.99)
    }

    /// Scaled residual of the lever rule.
    fn residual(&self, liquid: &State, vapor: &State, quality: f64) -> f64 {
        match self {
            Self::Density(rho) => {
                let rl = liquid.density.to_reduced();
                let rg = vapor.density.to_reduced();
                rho.to_reduced() * (quality / rg + (1.0 - quality) / rl) - 1.0
            }
            Self::Caloric(c) => {
                (quality * c.eval(vapor) + (1.0 - quality) * c.eval(liquid) - c.target())
                    / c.scale(&liquid.eos)
            }
        }
    }

    /// Partial derivatives of the scaled residual w.r.t. temperature,
    /// liquid density, vapor density and vapor fraction.
    fn derivs(&self, liquid: &State, vapor: &State, quality: f64) -> [f64; 4] {
        match self {
            Self::Density(rho) => {
                let rho = rho.to_reduced();
                let rl = liquid.density.to_reduced();
                let rg = vapor.density.to_reduced();
                [
                    0.0,
                    -rho * (1.0 - quality) / (rl * rl),
                    -rho * quality / (rg * rg),
                    rho * (1.0 / rg - 1.0 / rl),
                ]
            }
            Self::Caloric(c) => {
                let scale = c.scale(&liquid.eos);
                [
                    (quality * c.deriv_t(vapor) + (1.0 - quality) * c.deriv_t(liquid)) / scale,
                    (1.0 - quality) * c.deriv_rho(liquid) / scale,
                    quality * c.deriv_rho(vapor) / scale,
                    (c.eval(vapor) - c.eval(liquid)) / scale,
                ]
            }
        }
    }
}

/// Newton iteration for a single phase state with given density and caloric
/// property.
fn solve_t_at_density(
    eos: &Arc<Eos>,
    density: Density,
    caloric: Caloric,
    t0: f64,
    options: SolverOptions,
) -> EosResult<State> {
    let tc = eos.constants.tc;
    let tt = eos.constants.t_triple;
    let scale = caloric.scale(eos);
    let target = caloric.target();
    let x = newton_system(
        "solve_t_at_density",
        DVector::from_vec(vec![t0]),
        &[(0.2 * tt, 20.0 * tc)],
        &[0.2 * tc],
        |x| {
            let state = State::new_pure(eos, Temperature::from_reduced(x[0]), density)?;
            let res = DVector::from_vec(vec![(caloric.eval(&state) - target) / scale]);
            let jac = DMatrix::from_row_slice(1, 1, &[caloric.deriv_t(&state) / scale]);
            Ok((res, jac))
        },
        options,
    )?;
    State::new_pure(eos, Temperature::from_reduced(x[0]), density)
}

/// Newton iteration for a single phase state with two given caloric
/// properties.
fn solve_t_rho(
    eos: &Arc<Eos>,
    caloric1: Caloric,
    caloric2: Caloric,
    t0: f64,
    rho0: f64,
    options: SolverOptions,
) -> EosResult<State> {
    let tc = eos.constants.tc;
    let tt = eos.constants.t_triple;
    let rho_max = eos.max_density().to_reduced();
    let (scale1, scale2) = (caloric1.scale(eos), caloric2.scale(eos));
    let (target1, target2) = (caloric1.target(), caloric2.target());
    let x = newton_system(
        "solve_t_rho",
        DVector::from_vec(vec![t0, rho0]),
        &[(0.2 * tt, 20.0 * tc), (1.0e-12 * rho_max, 1.2 * rho_max)],
        &[0.2 * tc, 0.15 * rho_max],
        |x| {
            let state = State::new_pure(
                eos,
                Temperature::from_reduced(x[0]),
                Density::from_reduced(x[1]),
            )?;
            let res = DVector::from_vec(vec![
                (caloric1.eval(&state) - target1) / scale1,
                (caloric2.eval(&state) - target2) / scale2,
            ]);
            let jac = DMatrix::from_row_slice(
                2,
                2,
                &[
                    caloric1.deriv_t(&state) / scale1,
                    caloric1.deriv_rho(&state) / scale1,
                    caloric2.deriv_t(&state) / scale2,
                    caloric2.deriv_rho(&state) / scale2,
                ],
            );
            Ok((res, jac))
        },
        options,
    )?;
    State::new_pure(
        eos,
        Temperature::from_reduced(x[0]),
        Density::from_reduced(x[1]),
    )
}

/// Newton iteration for the full two phase system: equal pressures, equal
/// chemical potentials and two lever rules for temperature, both binodal
/// densities and the vapor fraction.
fn solve_two_phase(
    eos: &Arc<Eos>,
    mix1: Mix,
    mix2: Mix,
    t0: Temperature,
    options: SolverOptions,
) -> EosResult<(PhaseEquilibrium, f64)> {
    let vle = PhaseEquilibrium::pure(eos, t0, None, SolverOptions::default())?;
    let q0 = mix1.initial_quality(vle.liquid(), vle.vapor());
    let tc = eos.constants.tc;
    let tt = eos.constants.t_triple;
    let rho_c = eos.constants.rhoc;
    let rho_max = eos.max_density().to_reduced();
    let p_c = eos.constants.pc;
    let r_tc = eos.r() * tc;
    let c = Contributions::Total;
    let x = newton_system(
        "solve_two_phase",
        DVector::from_vec(vec![
            t0.to_reduced(),
            vle.liquid().density.to_reduced(),
            vle.vapor().density.to_reduced(),
            q0,
        ]),
        &[
            (0.5 * tt, tc),
            (rho_c, 1.2 * rho_max),
            (1.0e-10 * rho_c, rho_c),
            (-0.2, 1.2),
        ],
        &[0.05 * tc, 0.1 * rho_max, 0.1 * rho_max, 0.25],
        |x| {
            let t = Temperature::from_reduced(x[0]);
            let liquid = State::new_pure(eos, t, Density::from_reduced(x[1]))?;
            let vapor = State::new_pure(eos, t, Density::from_reduced(x[2]))?;
            let quality = x[3];
            let res = DVector::from_vec(vec![
                (liquid.pressure(c) - vapor.pressure(c)).to_reduced() / p_c,
                (liquid.chemical_potential(c) - vapor.chemical_potential(c)).to_reduced() / r_tc,
                mix1.residual(&liquid, &vapor, quality),
                mix2.residual(&liquid, &vapor, quality),
            ]);
            let dp_drho_l = liquid.dp_drho(c).to_reduced();
            let dp_drho_v = vapor.dp_drho(c).to_reduced();
            let d1 = mix1.derivs(&liquid, &vapor, quality);
            let d2 = mix2.derivs(&liquid, &vapor, quality);
            let jac = DMatrix::from_row_slice(
                4,
                4,
                &[
                    (liquid.dp_dt(c) - vapor.dp_dt(c)).to_reduced() / p_c,
                    dp_drho_l / p_c,
                    -dp_drho_v / p_c,
                    0.0,
                    (liquid.dmu_dt(c) - vapor.dmu_dt(c)).to_reduced() / r_tc,
                    dp_drho_l / (x[1] * r_tc),
                    -dp_drho_v / (x[2] * r_tc),
                    0.0,
                    d1[0],
                    d1[1],
                    d1[2],
                    d1[3],
                    d2[0],
                    d2[1],
                    d2[2],
                    d2[3],
                ],
            );
            Ok((res, jac))
        },
        options,
    )?;
    let t = Temperature::from_reduced(x[0]);
    let liquid = State::new_pure(eos, t, Density::from_reduced(x[1]))?;
    let vapor = State::new_pure(eos, t, Density::from_reduced(x[2]))?;
    if PhaseEquilibrium::is_trivial_solution(&vapor, &liquid) {
        return Err(EosError::TrivialSolution);
    }
    let quality = x[3];
    if !(-1.0e-8..=1.0 + 1.0e-8).contains(&quality) {
        return Err(EosError::NotConverged(String::from("solve_two_phase")));
    }
    Ok((
        PhaseEquilibrium::from_states(vapor, liquid),
        quality.clamp(0.0, 1.0),
    ))
}

/// Damped Newton iteration with analytic Jacobian, shared by all flash
/// calculations. Steps are limited per variable and iterates are projected
/// into the given bounds.
fn newton_system<R>(
    name: &str,
    mut x: DVector<f64>,
    bounds: &[(f64, f64)],
    max_step: &[f64],
    mut residual: R,
    options: SolverOptions,
) -> EosResult<DVector<f64>>
where
    R: FnMut(&DVector<f64>) -> EosResult<(DVector<f64>, DMatrix<f64>)>,
{
    let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_FLASH, TOL_FLASH);
    log_iter!(verbosity, " iter |     residual     | variables");
    log_iter!(verbosity, "{:-<64}", "");
    for i in 1..=max_iter {
        let (res, jac) = residual(&x)?;
        let error = res.norm();
        log_iter!(verbosity, " {:4} | {:16.8e} | {:.8?}", i, error, x.as_slice());
        if error.is_nan() {
            return Err(EosError::IterationFailed(name.to_owned()));
        }
        if error < tol {
            log_result!(verbosity, "`{}` converged after {} iterations.", name, i);
            return Ok(x);
        }
        let jac = Array2::from_shape_fn(jac.shape(), |(r, c)| jac[(r, c)]);
        let res = Array1::from_shape_fn(res.len(), |r| res[r]);
        let delta = LU::new(jac)?.solve(&res);
        for j in 0..x.len() {
            let step = delta[j].clamp(-max_step[j], max_step[j]);
            x[j] = (x[j] - step).clamp(bounds[j].0, bounds[j].1);
        }
    }
    Err(EosError::NotConverged(name.to_owned()))
}
