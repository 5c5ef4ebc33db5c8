use super::{Contributions, Derivative::*, PartialDerivative, State};
use crate::ReferenceSystem;
use quantity::{
    Density, Energy, Entropy, MolarEnergy, MolarEntropy, Pressure, Quantity, Temperature, Volume,
};
use typenum::{Quot, P2};

/// # Residual properties
impl State {
    pub(crate) fn get_or_compute_derivative_residual(&self, derivative: PartialDerivative) -> f64 {
        let mut cache = self.cache.lock().unwrap();

        match derivative {
            PartialDerivative::Zeroth => {
                let new_state = self.derive0();
                cache.get_or_insert_with_f64(|| self.eos.residual_helmholtz_energy(&new_state))
            }
            PartialDerivative::First(v) => {
                let new_state = self.derive1(v);
                cache.get_or_insert_with_d64(v, || self.eos.residual_helmholtz_energy(&new_state))
            }
            PartialDerivative::Second(v1, v2) if v1 == v2 => {
                let new_state = self.derive2(v1);
                cache
                    .get_or_insert_with_d2_64(v1, || self.eos.residual_helmholtz_energy(&new_state))
            }
            PartialDerivative::Second(v1, v2) => {
                let new_state = self.derive2_mixed(v1, v2);
                cache.get_or_insert_with_hd64(v1, v2, || {
                    self.eos.residual_helmholtz_energy(&new_state)
                })
            }
            PartialDerivative::Third(v) => {
                let new_state = self.derive3(v);
                cache
                    .get_or_insert_with_d3_64(v, || self.eos.residual_helmholtz_energy(&new_state))
            }
        }
    }

    fn contributions<U: Copy>(
        ideal_gas: Quantity<f64, U>,
        residual: Quantity<f64, U>,
        contributions: Contributions,
    ) -> Quantity<f64, U> {
        match contributions {
            Contributions::IdealGas => ideal_gas,
            Contributions::Total => ideal_gas + residual,
            Contributions::Residual => residual,
        }
    }

    /// Residual Helmholtz energy: $A^\text{res}$
    pub fn residual_helmholtz_energy(&self) -> Energy {
        Energy::from_reduced(self.get_or_compute_derivative_residual(PartialDerivative::Zeroth))
    }

    /// Residual molar Helmholtz energy: $a^\text{res}=\frac{A^\text{res}}{N}$
    pub fn residual_molar_helmholtz_energy(&self) -> MolarEnergy {
        self.residual_helmholtz_energy() / self.moles
    }

    /// Residual entropy: $S^\text{res}(T,V,N)=-\left(\frac{\partial A^\text{res}}{\partial T}\right)_{V,N}$
    pub fn residual_entropy(&self) -> Entropy {
        Entropy::from_reduced(
            -self.get_or_compute_derivative_residual(PartialDerivative::First(DT)),
        )
    }

    /// Residual molar entropy: $s^\text{res}=\frac{S^\text{res}}{N}$
    pub fn residual_molar_entropy(&self) -> MolarEntropy {
        self.residual_entropy() / self.moles
    }

    /// Residual chemical potential: $\mu^\text{res}=\left(\frac{\partial A^\text{res}}{\partial N}\right)_{T,V}$
    pub fn residual_chemical_potential(&self) -> MolarEnergy {
        MolarEnergy::from_reduced(
            self.get_or_compute_derivative_residual(PartialDerivative::First(DN)),
        )
    }

    /// Pressure: $p=-\left(\frac{\partial A}{\partial V}\right)_{T,N}$
    pub fn pressure(&self, contributions: Contributions) -> Pressure {
        let ideal_gas = self.density * self.temperature * self.eos.gas_constant();
        let residual = Pressure::from_reduced(
            -self.get_or_compute_derivative_residual(PartialDerivative::First(DV)),
        );
        Self::contributions(ideal_gas, residual, contributions)
    }

    /// Compressibility factor: $Z=\frac{pV}{NRT}$
    pub fn compressibility(&self, contributions: Contributions) -> f64 {
        (self.pressure(contributions)
            / (self.density * self.temperature * self.eos.gas_constant()))
        .into_value()
    }

    // pressure derivatives

    /// Partial derivative of pressure w.r.t. volume: $\left(\frac{\partial p}{\partial V}\right)_{T,N}$
    pub fn dp_dv(&self, contributions: Contributions) -> Quot<Pressure, Volume> {
        let ideal_gas = -self.density * self.temperature * self.eos.gas_constant() / self.volume;
        let residual = Quantity::from_reduced(
            -self.get_or_compute_derivative_residual(PartialDerivative::Second(DV, DV)),
        );
        Self::contributions(ideal_gas, residual, contributions)
    }

    /// Partial derivative of pressure w.r.t. density: $\left(\frac{\partial p}{\partial \rho}\right)_{T,N}$
    pub fn dp_drho(&self, contributions: Contributions) -> Quot<Pressure, Density> {
        -self.volume / self.density * self.dp_dv(contributions)
    }

    /// Partial derivative of pressure w.r.t. temperature: $\left(\frac{\partial p}{\partial T}\right)_{V,N}$
    pub fn dp_dt(&self, contributions: Contributions) -> Quot<Pressure, Temperature> {
        let ideal_gas = self.density * self.eos.gas_constant();
        let residual = Quantity::from_reduced(
            -self.get_or_compute_derivative_residual(PartialDerivative::Second(DV, DT)),
        );
        Self::contributions(ideal_gas, residual, contributions)
    }

    /// Second partial derivative of pressure w.r.t. volume: $\left(\frac{\partial^2 p}{\partial V^2}\right)_{T,N}$
    pub fn d2p_dv2(&self, contributions: Contributions) -> Quot<Quot<Pressure, Volume>, Volume> {
        let ideal_gas = 2.0 * self.density * self.temperature * self.eos.gas_constant()
            / (self.volume * self.volume);
        let residual = Quantity::from_reduced(
            -self.get_or_compute_derivative_residual(PartialDerivative::Third(DV)),
        );
        Self::contributions(ideal_gas, residual, contributions)
    }

    /// Second partial derivative of pressure w.r.t. density: $\left(\frac{\partial^2 p}{\partial \rho^2}\right)_{T,N}$
    pub fn d2p_drho2(&self, contributions: Contributions) -> Quot<Quot<Pressure, Density>, Density> {
        self.volume / (self.density * self.density)
            * (self.volume * self.d2p_dv2(contributions) + 2.0 * self.dp_dv(contributions))
    }

    // This function is designed specifically for use in density iterations
    pub(crate) fn p_dpdrho(&self) -> (Pressure, Quot<Pressure, Density>) {
        let dp_dv = self.dp_dv(Contributions::Total);
        (
            self.pressure(Contributions::Total),
            -self.volume * dp_dv / self.density,
        )
    }

    // This function is designed specifically for use in spinodal iterations
    pub(crate) fn d2pdrho2(
        &self,
    ) -> (
        Pressure,
        Quot<Pressure, Density>,
        Quot<Quot<Pressure, Density>, Density>,
    ) {
        let d2p_dv2 = self.d2p_dv2(Contributions::Total);
        let dp_dv = self.dp_dv(Contributions::Total);
        (
            self.pressure(Contributions::Total),
            -self.volume * dp_dv / self.density,
            self.volume / (self.density * self.density) * (2.0 * dp_dv + self.volume * d2p_dv2),
        )
    }

    // entropy derivatives

    /// Partial derivative of the residual chemical potential w.r.t. temperature: $\left(\frac{\partial\mu^\text{res}}{\partial T}\right)_{V,N}$
    pub fn dmu_res_dt(&self) -> Quot<MolarEnergy, Temperature> {
        Quantity::from_reduced(
            self.get_or_compute_derivative_residual(PartialDerivative::Second(DT, DN)),
        )
    }

    /// Logarithm of the fugacity coefficient: $\ln\varphi=\frac{\mu^\text{res}(T,V,N)}{RT}-\ln Z$
    pub fn ln_phi(&self) -> f64 {
        (self.residual_chemical_potential() / (self.eos.gas_constant() * self.temperature))
            .into_value()
            - self.compressibility(Contributions::Total).ln()
    }

    /// Fugacity: $f=\varphi p$
    pub fn fugacity(&self) -> Pressure {
        self.pressure(Contributions::Total) * self.ln_phi().exp()
    }

    /// Partial derivative of the logarithm of the fugacity coefficient w.r.t. temperature: $\left(\frac{\partial\ln\varphi}{\partial T}\right)_{p,N}=-\frac{h^\text{res}}{RT^2}$
    pub fn dln_phi_dt(&self) -> Quot<f64, Temperature> {
        -self.residual_molar_enthalpy()
            / (self.eos.gas_constant() * self.temperature.powi::<P2>())
    }

    /// Partial derivative of the logarithm of the fugacity coefficient w.r.t. pressure: $\left(\frac{\partial\ln\varphi}{\partial p}\right)_{T,N}=\frac{v}{RT}-\frac{1}{p}$
    pub fn dln_phi_dp(&self) -> Quot<f64, Pressure> {
        self.molar_volume() / (self.eos.gas_constant() * self.temperature)
            - 1.0 / self.pressure(Contributions::Total)
    }

    /// Molar residual isobaric heat capacity: $c_p^\text{res}=\left(\frac{\partial h^\text{res}}{\partial T}\right)_{p,N}$
    pub(super) fn residual_molar_isobaric_heat_capacity(&self) -> MolarEntropy {
        self.temperature / self.moles
            * (self.ds_dt(Contributions::Residual)
                - self.dp_dt(Contributions::Total).powi::<P2>()
                    / self.dp_dv(Contributions::Total))
            - self.eos.gas_constant()
    }

    /// Residual enthalpy: $H^\text{res}(T,p,N)=A^\text{res}+TS^\text{res}+pV-NRT$
    pub fn residual_enthalpy(&self) -> Energy {
        self.temperature * self.residual_entropy()
            + self.residual_helmholtz_energy()
            + self.pressure(Contributions::Residual) * self.volume
    }

    /// Residual molar enthalpy: $h^\text{res}=\frac{H^\text{res}}{N}$
    pub fn residual_molar_enthalpy(&self) -> MolarEnergy {
        self.residual_enthalpy() / self.moles
    }

    /// Residual internal energy: $U^\text{res}(T,V,N)=A^\text{res}+TS^\text{res}$
    pub fn residual_internal_energy(&self) -> Energy {
        self.temperature * self.residual_entropy() + self.residual_helmholtz_energy()
    }

    /// Residual Gibbs energy: $G^\text{res}(T,p,N)=A^\text{res}+pV-NRT-NRT\ln Z$
    pub fn residual_gibbs_energy(&self) -> Energy {
        self.pressure(Contributions::Residual) * self.volume + self.residual_helmholtz_energy()
            - self.moles
                * self.eos.gas_constant()
                * self.temperature
                * self.compressibility(Contributions::Total).ln()
    }

    /// Residual molar Gibbs energy: $g^\text{res}=\frac{G^\text{res}}{N}$
    pub fn residual_molar_gibbs_energy(&self) -> MolarEnergy {
        self.residual_gibbs_energy() / self.moles
    }
}
