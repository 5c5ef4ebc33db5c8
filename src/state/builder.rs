use super::{DensityInitialization, State};
use crate::eos::Eos;
use crate::errors::EosResult;
use quantity::{Density, MolarEnergy, MolarEntropy, Moles, Pressure, Temperature, Volume};
use std::sync::Arc;

/// Ergonomic construction of [State]s from any combination of inputs.
///
/// # Examples
/// ```
/// # use meos::{Eos, EosResult, IdentifierOption, StateBuilder};
/// # use quantity::{KELVIN, METER, MOL};
/// # use std::sync::Arc;
/// # use typenum::P3;
/// # fn main() -> EosResult<()> {
/// // a state from temperature, volume and moles
/// let eos = Arc::new(Eos::from_json(
///     "pentane",
///     "parameters/pentane.json",
///     IdentifierOption::Name,
/// )?);
/// let state = StateBuilder::new(&eos)
///     .temperature(300.0 * KELVIN)
///     .volume(12.5 * METER.powi::<P3>())
///     .moles(2.5 * MOL)
///     .build()?;
/// assert_eq!(state.density, 0.2 * MOL / METER.powi::<P3>());
///
/// // without an extensive input the state holds 1 mol
/// let state = StateBuilder::new(&eos)
///     .temperature(300.0 * KELVIN)
///     .density(0.2 * MOL / METER.powi::<P3>())
///     .build()?;
/// assert_eq!(state.moles, 1.0 * MOL);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StateBuilder {
    eos: Arc<Eos>,
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
}

impl StateBuilder {
    /// Start an empty builder for the given equation of state.
    pub fn new(eos: &Arc<Eos>) -> Self {
        StateBuilder {
            eos: eos.clone(),
            temperature: None,
            volume: None,
            density: None,
            moles: None,
            pressure: None,
            molar_enthalpy: None,
            molar_entropy: None,
            molar_internal_energy: None,
            density_initialization: DensityInitialization::None,
            initial_temperature: None,
        }
    }

    /// Set the temperature.
    pub fn temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the volume.
    pub fn volume(mut self, volume: Volume) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Set the density.
    pub fn density(mut self, density: Density) -> Self {
        self.density = Some(density);
        self
    }

    /// Set the total moles.
    pub fn moles(mut self, moles: Moles) -> Self {
        self.moles = Some(moles);
        self
    }

    /// Set the pressure.
    pub fn pressure(mut self, pressure: Pressure) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Set the molar enthalpy.
    pub fn molar_enthalpy(mut self, molar_enthalpy: MolarEnergy) -> Self {
        self.molar_enthalpy = Some(molar_enthalpy);
        self
    }

    /// Set the molar entropy.
    pub fn molar_entropy(mut self, molar_entropy: MolarEntropy) -> Self {
        self.molar_entropy = Some(molar_entropy);
        self
    }

    /// Set the molar internal energy.
    pub fn molar_internal_energy(mut self, molar_internal_energy: MolarEnergy) -> Self {
        self.molar_internal_energy = Some(molar_internal_energy);
        self
    }

    /// Ask for the vapor root of the density iteration.
    pub fn vapor(mut self) -> Self {
        self.density_initialization = DensityInitialization::Vapor;
        self
    }

    /// Ask for the liquid root of the density iteration.
    pub fn liquid(mut self) -> Self {
        self.density_initialization = DensityInitialization::Liquid;
        self
    }

    /// Start the density iteration from the given density.
    pub fn initial_density(mut self, initial_density: Density) -> Self {
        self.density_initialization = DensityInitialization::InitialDensity(initial_density);
        self
    }

    /// Start the caloric Newton iterations from the given temperature.
    pub fn initial_temperature(mut self, initial_temperature: Temperature) -> Self {
        self.initial_temperature = Some(initial_temperature);
        self
    }

    /// Build the state from the fields set so far.
    pub fn build(self) -> EosResult<State> {
        State::new(
            &self.eos,
            self.temperature,
            self.volume,
            self.density,
            self.moles,
            self.pressure,
            self.molar_enthalpy,
            self.molar_entropy,
            self.molar_internal_energy,
            self.density_initialization,
            self.initial_temperature,
        )
    }
}
