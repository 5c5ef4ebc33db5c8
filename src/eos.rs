//! The equation of state of a pure fluid.
use crate::ideal_gas::IdealGas;
use crate::parameter::{
    FluidConstants, FluidRecord, Identifier, IdentifierOption, ParameterError,
};
use crate::reference_state::ReferenceOffsets;
use crate::residual::ResidualModel;
use crate::state::StateHD;
use crate::ReferenceSystem;
use num_dual::{Dual2_64, Dual64, DualNum};
use quantity::{
    Density, MolarEntropy, MolarVolume, MolarWeight, Pressure, Temperature, GRAM, MOL,
};
use std::fmt;
use std::path::Path;
use typenum::Quot;

/// Equation of state of a pure fluid.
///
/// Combines the characteristic constants of the fluid with an ideal gas
/// model and one of the residual model families. Both contributions are
/// formulated in the reduced variables δ=ρ/ρc and τ=Tc/T, so that every
/// Helmholtz energy derivative can be obtained from the same generalized
/// (hyper-) dual number evaluation.
#[derive(Debug, Clone)]
pub struct Eos {
    /// Identifier of the fluid.
    pub identifier: Identifier,
    /// Molar weight.
    pub molarweight: MolarWeight,
    /// Characteristic constants of the fluid.
    pub constants: FluidConstants,
    /// Enthalpy and entropy offsets of the active reference state convention.
    pub(crate) reference: ReferenceOffsets,
    ideal_gas: IdealGas,
    residual: ResidualModel,
}

impl Eos {
    /// Build an equation of state from a parameter record.
    pub fn from_record(record: FluidRecord) -> Result<Self, ParameterError> {
        let ideal_gas = IdealGas::from_record(&record.ideal_gas)?;
        let residual = ResidualModel::from_record(&record.residual, &record.constants)?;
        Ok(Self {
            identifier: record.identifier,
            molarweight: record.molarweight * (GRAM / MOL),
            constants: record.constants,
            reference: ReferenceOffsets::default(),
            ideal_gas,
            residual,
        })
    }

    /// Read a single substance from a json parameter file.
    pub fn from_json<P: AsRef<Path>>(
        substance: &str,
        file: P,
        identifier_option: IdentifierOption,
    ) -> Result<Self, ParameterError> {
        let mut records = FluidRecord::from_json(&[substance], file, identifier_option)?;
        let record = records
            .pop()
            .ok_or_else(|| ParameterError::ComponentsNotFound(substance.to_owned()))?;
        Self::from_record(record)
    }

    /// Name of the fluid as it appears in output and cache keys.
    pub fn name(&self) -> String {
        self.identifier
            .name
            .clone()
            .or_else(|| self.identifier.cas.clone())
            .or_else(|| self.identifier.formula.clone())
            .unwrap_or_else(|| "unnamed".to_owned())
    }

    /// Name of the residual model variant.
    pub fn model(&self) -> &'static str {
        self.residual.name()
    }

    /// Molar gas constant of the correlation in J/(mol K).
    pub fn r(&self) -> f64 {
        self.constants.r()
    }

    /// Molar gas constant of the correlation.
    pub fn gas_constant(&self) -> MolarEntropy {
        MolarEntropy::from_reduced(self.constants.r())
    }

    /// Replace the enthalpy and entropy offsets of the reference state.
    ///
    /// States created from the returned equation of state report enthalpies
    /// and entropies relative to the new reference.
    pub fn with_reference_offsets(mut self, offsets: ReferenceOffsets) -> Self {
        self.reference = offsets;
        self
    }

    /// Critical temperature.
    pub fn critical_temperature(&self) -> Temperature {
        Temperature::from_reduced(self.constants.tc)
    }

    /// Critical density.
    pub fn critical_density(&self) -> Density {
        Density::from_reduced(self.constants.rhoc)
    }

    /// Critical pressure.
    pub fn critical_pressure(&self) -> Pressure {
        Pressure::from_reduced(self.constants.pc)
    }

    /// Triple point temperature.
    pub fn triple_temperature(&self) -> Temperature {
        Temperature::from_reduced(self.constants.t_triple)
    }

    /// Highest density up to which the residual model is evaluated.
    pub fn max_density(&self) -> Density {
        Density::from_reduced(self.residual.max_density())
    }

    fn reduced_variables<D: DualNum<f64> + Copy>(&self, temperature: D, density: D) -> (D, D) {
        (
            density / self.constants.rhoc,
            temperature.recip() * self.constants.tc,
        )
    }

    /// Reduced residual Helmholtz energy αʳ(δ,τ).
    pub fn alpha_residual<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        self.residual.evaluate(delta, tau)
    }

    /// Residual Helmholtz energy Aʳ(T,V,N) for a reduced state, in J.
    pub fn residual_helmholtz_energy<D: DualNum<f64> + Copy>(&self, state: &StateHD<D>) -> D {
        let (delta, tau) = self.reduced_variables(state.temperature, state.density);
        state.temperature * state.moles * self.residual.evaluate(delta, tau) * self.constants.r()
    }

    /// Ideal gas Helmholtz energy A⁰(T,V,N) for a reduced state, in J.
    ///
    /// The reference state offsets enter as N(Δh - TΔs). All property
    /// shifts, h + Δh, s + Δs, u + Δh and so on, follow from the
    /// derivatives of this term.
    pub fn ideal_gas_helmholtz_energy<D: DualNum<f64> + Copy>(&self, state: &StateHD<D>) -> D {
        let (delta, tau) = self.reduced_variables(state.temperature, state.density);
        state.temperature * state.moles * self.ideal_gas.evaluate(delta, tau) * self.constants.r()
            + state.moles
                * (state.temperature * (-self.reference.delta_s) + self.reference.delta_h)
    }

    /// Second virial coefficient B(T).
    pub fn second_virial_coefficient(&self, temperature: Temperature) -> MolarVolume {
        let tau = Dual64::from(self.constants.tc / temperature.to_reduced());
        let delta = Dual64::from(0.0).derivative();
        MolarVolume::from_reduced(self.residual.evaluate(delta, tau).eps / self.constants.rhoc)
    }

    /// Third virial coefficient C(T).
    pub fn third_virial_coefficient(
        &self,
        temperature: Temperature,
    ) -> Quot<MolarVolume, Density> {
        let tau = Dual2_64::from(self.constants.tc / temperature.to_reduced());
        let delta = Dual2_64::from(0.0).derivative();
        let rhoc = self.constants.rhoc;
        <Quot<MolarVolume, Density>>::from_reduced(
            self.residual.evaluate(delta, tau).v2 / (rhoc * rhoc),
        )
    }
}

impl fmt::Display for Eos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eos({}, {})", self.name(), self.residual)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    /// Full multiparameter record for n-pentane.
    pub fn pentane() -> Eos {
        Eos::from_json("pentane", "parameters/pentane.json", IdentifierOption::Name).unwrap()
    }

    /// Cubic record for n-pentane sharing the ideal gas model of [`pentane`].
    pub fn pentane_cubic() -> Eos {
        let record = r#"
        {
            "identifier": {
                "cas": "109-66-0",
                "name": "pentane",
                "formula": "C5H12"
            },
            "molarweight": 72.14878,
            "constants": {
                "tc": 469.7,
                "rhoc": 3215.5776,
                "pc": 3370000.0,
                "t_triple": 143.47,
                "acentric_factor": 0.251
            },
            "ideal_gas": {
                "a": 9.085216864,
                "b": -85.999519,
                "c": 3.0,
                "n_sinh": [8.95043, 33.4032],
                "theta_sinh": [0.380391739, 3.777411113],
                "n_cosh": [21.836],
                "theta_cosh": [1.789520971]
            },
            "residual": {
                "type": "cubic",
                "cubic_type": "peng_robinson"
            }
        }"#;
        let record: FluidRecord = serde_json::from_str(record).unwrap();
        Eos::from_record(record).unwrap()
    }

    #[test]
    fn virial_coefficients_cubic() {
        // B = b - a/(RT) < 0 well below the Boyle temperature
        let eos = pentane_cubic();
        let t = Temperature::from_reduced(400.0);
        let b = eos.second_virial_coefficient(t);
        assert!(b.to_reduced() < 0.0);
        let c = eos.third_virial_coefficient(t);
        assert!(c.to_reduced() > 0.0);
    }

    #[test]
    fn model_names() {
        let eos = pentane_cubic();
        assert_eq!(eos.model(), "peng_robinson");
        assert_eq!(eos.name(), "pentane");
    }
}
