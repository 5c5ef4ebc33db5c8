use super::{Contributions, Derivative::*, PartialDerivative, State};
use crate::ReferenceSystem;
use quantity::{
    Energy, Entropy, MassDensity, MolarEnergy, MolarEntropy, MolarVolume, MolarWeight, Pressure,
    Quantity, SpecificEnergy, SpecificEntropy, Temperature, Velocity,
};
use std::ops::Div;
use typenum::P2;

impl State {
    fn get_or_compute_derivative(
        &self,
        derivative: PartialDerivative,
        contributions: Contributions,
    ) -> f64 {
        // residual derivatives are cached, the ideal gas ones are cheap
        // enough to evaluate on every call
        let ideal_gas = || match derivative {
            PartialDerivative::Zeroth => self.eos.ideal_gas_helmholtz_energy(&self.derive0()),
            PartialDerivative::First(v) => {
                self.eos.ideal_gas_helmholtz_energy(&self.derive1(v)).eps
            }
            PartialDerivative::Second(v1, v2) if v1 == v2 => {
                self.eos.ideal_gas_helmholtz_energy(&self.derive2(v1)).v2
            }
            PartialDerivative::Second(v1, v2) => {
                self.eos
                    .ideal_gas_helmholtz_energy(&self.derive2_mixed(v1, v2))
                    .eps1eps2
            }
            PartialDerivative::Third(v) => {
                self.eos.ideal_gas_helmholtz_energy(&self.derive3(v)).v3
            }
        };
        match contributions {
            Contributions::IdealGas => ideal_gas(),
            Contributions::Residual => self.get_or_compute_derivative_residual(derivative),
            Contributions::Total => {
                ideal_gas() + self.get_or_compute_derivative_residual(derivative)
            }
        }
    }

    /// Molar weight of the fluid.
    pub fn total_molar_weight(&self) -> MolarWeight {
        self.eos.molarweight
    }

    /// Molar volume: $v=\frac{V}{N}$
    pub fn molar_volume(&self) -> MolarVolume {
        self.volume / self.moles
    }

    /// Mass density: $\rho^{(m)}=\rho M$
    pub fn mass_density(&self) -> MassDensity {
        self.density * self.total_molar_weight()
    }

    /// Chemical potential: $\mu=\left(\frac{\partial A}{\partial N}\right)_{T,V}$
    pub fn chemical_potential(&self, contributions: Contributions) -> MolarEnergy {
        MolarEnergy::from_reduced(
            self.get_or_compute_derivative(PartialDerivative::First(DN), contributions),
        )
    }

    /// Partial derivative of the chemical potential w.r.t. temperature: $\left(\frac{\partial\mu}{\partial T}\right)_{V,N}$
    pub fn dmu_dt(
        &self,
        contributions: Contributions,
    ) -> <MolarEnergy as Div<Temperature>>::Output {
        Quantity::from_reduced(
            self.get_or_compute_derivative(PartialDerivative::Second(DT, DN), contributions),
        )
    }

    /// Molar isochoric heat capacity: $c_v=\left(\frac{\partial u}{\partial T}\right)_{V,N}$
    pub fn molar_isochoric_heat_capacity(&self, contributions: Contributions) -> MolarEntropy {
        self.temperature * self.ds_dt(contributions) / self.moles
    }

    /// Isochoric heat capacity per unit mass.
    pub fn specific_isochoric_heat_capacity(
        &self,
        contributions: Contributions,
    ) -> SpecificEntropy {
        self.molar_isochoric_heat_capacity(contributions) / self.total_molar_weight()
    }

    /// Partial derivative of the molar isochoric heat capacity w.r.t. temperature: $\left(\frac{\partial c_V}{\partial T}\right)_{V,N}$
    pub fn dc_v_dt(
        &self,
        contributions: Contributions,
    ) -> <MolarEntropy as Div<Temperature>>::Output {
        (self.temperature * self.d2s_dt2(contributions) + self.ds_dt(contributions)) / self.moles
    }

    /// Molar isobaric heat capacity: $c_p=\left(\frac{\partial h}{\partial T}\right)_{p,N}$
    pub fn molar_isobaric_heat_capacity(&self, contributions: Contributions) -> MolarEntropy {
        match contributions {
            Contributions::Residual => self.residual_molar_isobaric_heat_capacity(),
            _ => {
                self.temperature / self.moles
                    * (self.ds_dt(contributions)
                        - self.dp_dt(contributions).powi::<P2>() / self.dp_dv(contributions))
            }
        }
    }

    /// Isobaric heat capacity per unit mass.
    pub fn specific_isobaric_heat_capacity(&self, contributions: Contributions) -> SpecificEntropy {
        self.molar_isobaric_heat_capacity(contributions) / self.total_molar_weight()
    }

    /// Entropy: $S=-\left(\frac{\partial A}{\partial T}\right)_{V,N}$
    pub fn entropy(&self, contributions: Contributions) -> Entropy {
        Entropy::from_reduced(
            -self.get_or_compute_derivative(PartialDerivative::First(DT), contributions),
        )
    }

    /// Molar entropy: $s=\frac{S}{N}$
    pub fn molar_entropy(&self, contributions: Contributions) -> MolarEntropy {
        self.entropy(contributions) / self.moles
    }

    /// Entropy per unit mass.
    pub fn specific_entropy(&self, contributions: Contributions) -> SpecificEntropy {
        self.molar_entropy(contributions) / self.total_molar_weight()
    }

    /// Partial derivative of the entropy w.r.t. temperature: $\left(\frac{\partial S}{\partial T}\right)_{V,N}$
    pub fn ds_dt(&self, contributions: Contributions) -> <Entropy as Div<Temperature>>::Output {
        Quantity::from_reduced(
            -self.get_or_compute_derivative(PartialDerivative::Second(DT, DT), contributions),
        )
    }

    /// Second partial derivative of the entropy w.r.t. temperature: $\left(\frac{\partial^2 S}{\partial T^2}\right)_{V,N}$
    pub fn d2s_dt2(
        &self,
        contributions: Contributions,
    ) -> <<Entropy as Div<Temperature>>::Output as Div<Temperature>>::Output {
        Quantity::from_reduced(
            -self.get_or_compute_derivative(PartialDerivative::Third(DT), contributions),
        )
    }

    /// Enthalpy: $H=A+TS+pV$
    pub fn enthalpy(&self, contributions: Contributions) -> Energy {
        self.temperature * self.entropy(contributions)
            + self.helmholtz_energy(contributions)
            + self.pressure(contributions) * self.volume
    }

    /// Molar enthalpy: $h=\frac{H}{N}$
    pub fn molar_enthalpy(&self, contributions: Contributions) -> MolarEnergy {
        self.enthalpy(contributions) / self.moles
    }

    /// Enthalpy per unit mass.
    pub fn specific_enthalpy(&self, contributions: Contributions) -> SpecificEnergy {
        self.molar_enthalpy(contributions) / self.total_molar_weight()
    }

    /// Helmholtz energy: $A$
    pub fn helmholtz_energy(&self, contributions: Contributions) -> Energy {
        Energy::from_reduced(
            self.get_or_compute_derivative(PartialDerivative::Zeroth, contributions),
        )
    }

    /// Molar Helmholtz energy: $a=\frac{A}{N}$
    pub fn molar_helmholtz_energy(&self, contributions: Contributions) -> MolarEnergy {
        self.helmholtz_energy(contributions) / self.moles
    }

    /// Helmholtz energy per unit mass.
    pub fn specific_helmholtz_energy(&self, contributions: Contributions) -> SpecificEnergy {
        self.molar_helmholtz_energy(contributions) / self.total_molar_weight()
    }

    /// Internal energy: $U=A+TS$
    pub fn internal_energy(&self, contributions: Contributions) -> Energy {
        self.temperature * self.entropy(contributions) + self.helmholtz_energy(contributions)
    }

    /// Molar internal energy: $u=\frac{U}{N}$
    pub fn molar_internal_energy(&self, contributions: Contributions) -> MolarEnergy {
        self.internal_energy(contributions) / self.moles
    }

    /// Internal energy per unit mass.
    pub fn specific_internal_energy(&self, contributions: Contributions) -> SpecificEnergy {
        self.molar_internal_energy(contributions) / self.total_molar_weight()
    }

    /// Gibbs energy: $G=A+pV$
    pub fn gibbs_energy(&self, contributions: Contributions) -> Energy {
        self.pressure(contributions) * self.volume + self.helmholtz_energy(contributions)
    }

    /// Molar Gibbs energy: $g=\frac{G}{N}$
    pub fn molar_gibbs_energy(&self, contributions: Contributions) -> MolarEnergy {
        self.gibbs_energy(contributions) / self.moles
    }

    /// Gibbs energy per unit mass.
    pub fn specific_gibbs_energy(&self, contributions: Contributions) -> SpecificEnergy {
        self.molar_gibbs_energy(contributions) / self.total_molar_weight()
    }

    /// Joule Thomson coefficient: $\mu_{JT}=\left(\frac{\partial T}{\partial p}\right)_{H,N}$
    pub fn joule_thomson(&self) -> <Temperature as Div<Pressure>>::Output {
        let total = Contributions::Total;
        -(self.volume + self.temperature * self.dp_dt(total) / self.dp_dv(total))
            / (self.moles * self.molar_isobaric_heat_capacity(total))
    }

    /// Isothermal compressibility: $\kappa_T=-\frac{1}{V}\left(\frac{\partial V}{\partial p}\right)_{T,N}$
    pub fn isothermal_compressibility(&self) -> <f64 as Div<Pressure>>::Output {
        -1.0 / (self.dp_dv(Contributions::Total) * self.volume)
    }

    /// Isentropic compressibility: $\kappa_s=-\frac{1}{V}\left(\frac{\partial V}{\partial p}\right)_{S,N}$
    pub fn isentropic_compressibility(&self) -> <f64 as Div<Pressure>>::Output {
        let total = Contributions::Total;
        -self.molar_isochoric_heat_capacity(total)
            / (self.molar_isobaric_heat_capacity(total) * self.dp_dv(total) * self.volume)
    }

    /// Isenthalpic compressibility: $\kappa_H=-\frac{1}{V}\left(\frac{\partial V}{\partial p}\right)_{H,N}$
    pub fn isenthalpic_compressibility(&self) -> <f64 as Div<Pressure>>::Output {
        self.isentropic_compressibility() * (1.0 + self.grueneisen_parameter())
    }

    /// Thermal expansivity: $\alpha_p=-\frac{1}{V}\left(\frac{\partial V}{\partial T}\right)_{p,N}$
    pub fn thermal_expansivity(&self) -> <f64 as Div<Temperature>>::Output {
        let total = Contributions::Total;
        -self.dp_dt(total) / self.dp_dv(total) / self.volume
    }

    /// Grueneisen parameter: $\phi=V\left(\frac{\partial p}{\partial U}\right)_{V,N}=\frac{v}{c_v}\left(\frac{\partial p}{\partial T}\right)_{v,N}$
    pub fn grueneisen_parameter(&self) -> f64 {
        let total = Contributions::Total;
        (self.volume / (self.moles * self.molar_isochoric_heat_capacity(total))
            * self.dp_dt(total))
        .into_value()
    }

    /// Speed of sound: $c=\sqrt{\left(\frac{\partial p}{\partial\rho^{(m)}}\right)_{S,N}}$
    pub fn speed_of_sound(&self) -> Velocity {
        (1.0 / (self.density * self.total_molar_weight() * self.isentropic_compressibility()))
            .sqrt()
    }
}
