//! Reference states for enthalpy and entropy.
//!
//! Absolute enthalpies and entropies carry an arbitrary constant. A
//! [`ReferenceConvention`] pins that constant down by prescribing values at
//! a defining state, like the saturated liquid at the normal boiling point.
//! The [`ReferenceState`] cache computes the resulting offsets once per
//! fluid, model and convention and can be persisted across process starts.
use crate::eos::Eos;
use crate::errors::EosResult;
use crate::parameter::ParameterError;
use crate::phase_equilibria::PhaseEquilibrium;
use crate::state::{Contributions, DensityInitialization, State};
use crate::{ReferenceSystem, SolverOptions};
use indexmap::IndexMap;
use quantity::{
    MolarEnergy, MolarEntropy, Moles, Pressure, SpecificEnergy, SpecificEntropy, Temperature,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Convention that defines the zero points of enthalpy and entropy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReferenceConvention {
    /// h = 0 and s = 0 for the saturated liquid at the normal boiling point.
    Nbp,
    /// h = 0 and s = 0 for the saturated liquid at -40 °C.
    Ashrae,
    /// h = 200 kJ/kg and s = 1 kJ/(kg K) for the saturated liquid at 0 °C.
    Iir,
    /// Prescribed molar enthalpy and entropy at a given temperature and
    /// pressure. The defining state is the stable phase at these conditions.
    Custom {
        temperature: Temperature,
        pressure: Pressure,
        molar_enthalpy: MolarEnergy,
        molar_entropy: MolarEntropy,
    },
}

impl ReferenceConvention {
    /// Deterministic identifier used in cache keys.
    fn id(&self) -> String {
        match self {
            Self::Nbp => String::from("nbp"),
            Self::Ashrae => String::from("ashrae"),
            Self::Iir => String::from("iir"),
            Self::Custom {
                temperature,
                pressure,
                molar_enthalpy,
                molar_entropy,
            } => format!(
                "custom({:e},{:e},{:e},{:e})",
                temperature.to_reduced(),
                pressure.to_reduced(),
                molar_enthalpy.to_reduced(),
                molar_entropy.to_reduced()
            ),
        }
    }
}

/// Enthalpy and entropy offsets implied by a reference convention.
///
/// The offsets enter the ideal gas Helmholtz energy as N(Δh - TΔs), so
/// that reported enthalpies shift by Δh, entropies by Δs and pressures,
/// heat capacities and phase equilibria remain untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceOffsets {
    /// Molar enthalpy offset Δh in J/mol.
    pub delta_h: f64,
    /// Molar entropy offset Δs in J/(mol K).
    pub delta_s: f64,
}

/// Cache for reference state offsets.
///
/// The cache is owned by the application and passed to wherever equations
/// of state are constructed. Entries are keyed by fluid, residual model and
/// convention. All writers for the same key compute the same value, so
/// concurrent lookups only require the lock around the actual insert.
/// Persistence is explicit via [`ReferenceState::to_json`] and
/// [`ReferenceState::from_json`].
#[derive(Debug, Default)]
pub struct ReferenceState {
    offsets: RwLock<IndexMap<String, ReferenceOffsets>>,
}

impl ReferenceState {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a previously persisted cache.
    pub fn from_json<P: AsRef<Path>>(file: P) -> Result<Self, ParameterError> {
        let reader = BufReader::new(File::open(file)?);
        let offsets: IndexMap<String, ReferenceOffsets> = serde_json::from_reader(reader)?;
        Ok(Self {
            offsets: RwLock::new(offsets),
        })
    }

    /// Persist the cache to a json file.
    pub fn to_json<P: AsRef<Path>>(&self, file: P) -> Result<(), ParameterError> {
        let writer = BufWriter::new(File::create(file)?);
        serde_json::to_writer_pretty(writer, &*self.offsets.read().unwrap())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.read().unwrap().is_empty()
    }

    /// The offsets for the given equation of state and convention.
    ///
    /// The first call per key evaluates the defining state of the
    /// convention, subsequent calls are lookups.
    pub fn offsets(
        &self,
        eos: &Arc<Eos>,
        convention: ReferenceConvention,
    ) -> EosResult<ReferenceOffsets> {
        let key = format!("{}|{}|{}", eos.name(), eos.model(), convention.id());
        if let Some(offsets) = self.offsets.read().unwrap().get(&key) {
            return Ok(*offsets);
        }
        let offsets = compute_offsets(eos, convention)?;
        // concurrent writers computed the same value, the first insert wins
        Ok(*self.offsets.write().unwrap().entry(key).or_insert(offsets))
    }

    /// A copy of the equation of state with the offsets of the given
    /// convention applied.
    pub fn apply(
        &self,
        eos: &Arc<Eos>,
        convention: ReferenceConvention,
    ) -> EosResult<Arc<Eos>> {
        let offsets = self.offsets(eos, convention)?;
        Ok(Arc::new(
            eos.as_ref().clone().with_reference_offsets(offsets),
        ))
    }
}

/// Evaluate the defining state of the convention and return the offsets
/// that move it onto the prescribed values.
fn compute_offsets(eos: &Arc<Eos>, convention: ReferenceConvention) -> EosResult<ReferenceOffsets> {
    // evaluated without any active offsets, so the cached values are
    // absolute and independent of the current reference of `eos`
    let raw = Arc::new(
        eos.as_ref()
            .clone()
            .with_reference_offsets(ReferenceOffsets::default()),
    );
    let zero_h = MolarEnergy::from_reduced(0.0);
    let zero_s = MolarEntropy::from_reduced(0.0);
    let (state, h0, s0) = match convention {
        ReferenceConvention::Nbp => {
            let vle = PhaseEquilibrium::pure(
                &raw,
                Pressure::from_reduced(101325.0),
                None,
                SolverOptions::default(),
            )?;
            (vle.liquid().clone(), zero_h, zero_s)
        }
        ReferenceConvention::Ashrae => {
            let vle = PhaseEquilibrium::pure(
                &raw,
                Temperature::from_reduced(233.15),
                None,
                SolverOptions::default(),
            )?;
            (vle.liquid().clone(), zero_h, zero_s)
        }
        ReferenceConvention::Iir => {
            let vle = PhaseEquilibrium::pure(
                &raw,
                Temperature::from_reduced(273.15),
                None,
                SolverOptions::default(),
            )?;
            let h0 = SpecificEnergy::from_reduced(200.0e3) * raw.molarweight;
            let s0 = SpecificEntropy::from_reduced(1.0e3) * raw.molarweight;
            (vle.liquid().clone(), h0, s0)
        }
        ReferenceConvention::Custom {
            temperature,
            pressure,
            molar_enthalpy,
            molar_entropy,
        } => {
            let state = State::new_npt(
                &raw,
                temperature,
                pressure,
                Moles::from_reduced(1.0),
                DensityInitialization::None,
            )?;
            (state, molar_enthalpy, molar_entropy)
        }
    };
    let c = Contributions::Total;
    Ok(ReferenceOffsets {
        delta_h: (h0 - state.molar_enthalpy(c)).to_reduced(),
        delta_s: (s0 - state.molar_entropy(c)).to_reduced(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::test::pentane_cubic;
    use approx::assert_relative_eq;
    use quantity::{JOULE, KELVIN, KILO, KILOGRAM, MOL, PASCAL};

    #[test]
    fn nbp_zeroes_the_saturated_liquid() {
        let eos = Arc::new(pentane_cubic());
        let reference = ReferenceState::new();
        let eos = reference.apply(&eos, ReferenceConvention::Nbp).unwrap();
        let vle = PhaseEquilibrium::pure(
            &eos,
            101325.0 * PASCAL,
            None,
            SolverOptions::default(),
        )
        .unwrap();
        let c = Contributions::Total;
        assert!(vle.liquid().molar_enthalpy(c).to_reduced().abs() < 1e-6);
        assert!(vle.liquid().molar_entropy(c).to_reduced().abs() < 1e-9);
        // latent heat remains positive
        assert!(vle.vapor().molar_enthalpy(c).to_reduced() > 0.0);
    }

    #[test]
    fn iir_convention() {
        let eos = Arc::new(pentane_cubic());
        let reference = ReferenceState::new();
        let eos = reference.apply(&eos, ReferenceConvention::Iir).unwrap();
        let vle = PhaseEquilibrium::pure(
            &eos,
            273.15 * KELVIN,
            None,
            SolverOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(
            vle.liquid().specific_enthalpy(Contributions::Total).to_reduced(),
            (200.0 * KILO * JOULE / KILOGRAM).to_reduced(),
            max_relative = 1e-9
        );
        assert_relative_eq!(
            vle.liquid().specific_entropy(Contributions::Total).to_reduced(),
            (1.0 * KILO * JOULE / (KILOGRAM * KELVIN)).to_reduced(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn custom_zero_at_standard_conditions() {
        let eos = Arc::new(pentane_cubic());
        let reference = ReferenceState::new();
        let convention = ReferenceConvention::Custom {
            temperature: 298.15 * KELVIN,
            pressure: 101325.0 * PASCAL,
            molar_enthalpy: 0.0 * JOULE / MOL,
            molar_entropy: 0.0 * JOULE / (MOL * KELVIN),
        };
        let eos = reference.apply(&eos, convention).unwrap();
        let state = State::new_npt(
            &eos,
            298.15 * KELVIN,
            101325.0 * PASCAL,
            1.0 * MOL,
            DensityInitialization::None,
        )
        .unwrap();
        assert!(state.molar_enthalpy(Contributions::Total).to_reduced().abs() < 1e-6);
        assert!(state.molar_entropy(Contributions::Total).to_reduced().abs() < 1e-9);
    }

    #[test]
    fn offsets_are_cached_and_persisted() {
        let eos = Arc::new(pentane_cubic());
        let reference = ReferenceState::new();
        let first = reference.offsets(&eos, ReferenceConvention::Nbp).unwrap();
        let second = reference.offsets(&eos, ReferenceConvention::Nbp).unwrap();
        assert_eq!(first, second);
        assert_eq!(reference.len(), 1);
        reference.offsets(&eos, ReferenceConvention::Ashrae).unwrap();
        assert_eq!(reference.len(), 2);

        let file = std::env::temp_dir().join("meos_reference_offsets.json");
        reference.to_json(&file).unwrap();
        let restored = ReferenceState::from_json(&file).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.offsets(&eos, ReferenceConvention::Nbp).unwrap(), first);
        std::fs::remove_file(&file).unwrap();
    }

    #[test]
    fn offsets_do_not_change_the_equilibrium() {
        let eos = Arc::new(pentane_cubic());
        let p_sat = PhaseEquilibrium::vapor_pressure(&eos, 350.0 * KELVIN).unwrap();
        let reference = ReferenceState::new();
        let shifted = reference.apply(&eos, ReferenceConvention::Iir).unwrap();
        let p_sat_shifted = PhaseEquilibrium::vapor_pressure(&shifted, 350.0 * KELVIN).unwrap();
        assert_relative_eq!(
            p_sat.to_reduced(),
            p_sat_shifted.to_reduced(),
            max_relative = 1e-12
        );
    }
}
