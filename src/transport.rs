//! Interface to transport property correlations.
//!
//! Viscosity and thermal conductivity correlations are not part of this
//! crate. They plug in through the [`TransportProperties`] trait and are
//! called with the converged state, so correlations based on residual
//! entropy scaling as well as plain (T, ρ) fits can be attached.
use crate::state::{Contributions, State};
use quantity::{Density, MolarEntropy, Temperature, ThermalConductivity, Viscosity};

/// Converged state information handed to a transport correlation.
#[derive(Clone, Copy, Debug)]
pub struct TransportInput {
    pub temperature: Temperature,
    pub density: Density,
    pub molar_isochoric_heat_capacity: MolarEntropy,
    pub molar_isobaric_heat_capacity: MolarEntropy,
    pub residual_molar_entropy: MolarEntropy,
}

/// A transport property correlation for a pure fluid.
///
/// Implementations return [`None`] when a property is not available for
/// the fluid or outside the range of the correlation.
pub trait TransportProperties {
    fn viscosity(&self, input: &TransportInput) -> Option<Viscosity>;

    fn thermal_conductivity(&self, input: &TransportInput) -> Option<ThermalConductivity>;
}

impl State {
    /// The input structure passed to transport correlations.
    pub fn transport_input(&self) -> TransportInput {
        TransportInput {
            temperature: self.temperature,
            density: self.density,
            molar_isochoric_heat_capacity: self
                .molar_isochoric_heat_capacity(Contributions::Total),
            molar_isobaric_heat_capacity: self.molar_isobaric_heat_capacity(Contributions::Total),
            residual_molar_entropy: self.molar_entropy(Contributions::Residual),
        }
    }

    /// Viscosity from the given correlation.
    pub fn viscosity<T: TransportProperties>(&self, transport: &T) -> Option<Viscosity> {
        transport.viscosity(&self.transport_input())
    }

    /// Thermal conductivity from the given correlation.
    pub fn thermal_conductivity<T: TransportProperties>(
        &self,
        transport: &T,
    ) -> Option<ThermalConductivity> {
        transport.thermal_conductivity(&self.transport_input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::test::pentane_cubic;
    use crate::state::DensityInitialization;
    use crate::ReferenceSystem;
    use quantity::{KELVIN, KILO, KILOGRAM, MOL, PASCAL};
    use std::sync::Arc;

    /// Square root of temperature scaling for the dilute gas, nothing
    /// above a fixed density limit.
    struct DiluteGas;

    impl TransportProperties for DiluteGas {
        fn viscosity(&self, input: &TransportInput) -> Option<Viscosity> {
            (input.density.to_reduced() < 500.0).then(|| {
                Viscosity::from_reduced(6.7e-6) * (input.temperature.to_reduced() / 300.0).sqrt()
            })
        }

        fn thermal_conductivity(&self, input: &TransportInput) -> Option<ThermalConductivity> {
            let eta = self.viscosity(input)?;
            // Eucken factor from the isochoric heat capacity
            let cv = input.molar_isochoric_heat_capacity;
            let r = MolarEntropy::from_reduced(crate::RGAS);
            Some(eta * (cv + 2.25 * r) / (72.14878e-3 * KILOGRAM / MOL))
        }
    }

    #[test]
    fn correlation_is_called_with_the_converged_state() {
        let eos = Arc::new(pentane_cubic());
        let vapor = State::new_npt(
            &eos,
            350.0 * KELVIN,
            50.0 * KILO * PASCAL,
            1.0 * MOL,
            DensityInitialization::Vapor,
        )
        .unwrap();
        let eta = vapor.viscosity(&DiluteGas).unwrap();
        assert!(eta.to_reduced() > 6.7e-6);
        assert!(vapor.thermal_conductivity(&DiluteGas).is_some());

        let liquid = State::new_npt(
            &eos,
            300.0 * KELVIN,
            1000.0 * KILO * PASCAL,
            1.0 * MOL,
            DensityInitialization::Liquid,
        )
        .unwrap();
        assert!(liquid.viscosity(&DiluteGas).is_none());
        assert!(liquid.thermal_conductivity(&DiluteGas).is_none());
    }
}
