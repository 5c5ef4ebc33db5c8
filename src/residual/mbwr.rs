//! Modified Benedict-Webb-Rubin equations of state with 32 constants.

use crate::parameter::{FluidConstants, ParameterError};
use num_dual::DualNum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters of an MBWR correlation.
///
/// The pressure is given by
/// ```text
/// p = Σₙ₌₁⁹ aₙ(T) ρⁿ + exp(-γρ²) Σₙ₌₁₀¹⁵ aₙ(T) ρ^(2n-17)
/// ```
/// with 15 temperature dependent coefficients built from the 32 constants.
/// All constants are given in SI units (Pa, mol/m³, K), with a₁ = RT fixed
/// by the ideal gas limit.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MbwrRecord {
    /// The 32 constants G₁..G₃₂
    pub g: Vec<f64>,
    /// Parameter of the exponential terms in m⁶/mol², defaults to 1/ρc²
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    /// Maximum density in mol/m³ up to which the correlation is evaluated
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_density: Option<f64>,
}

/// A pressure explicit MBWR equation of state.
///
/// The residual Helmholtz energy is obtained from the analytic integral
/// of `(p - ρRT)/ρ²` along an isotherm, so that all derivatives are exact.
#[derive(Debug, Clone)]
pub struct Mbwr {
    g: [f64; 32],
    gamma: f64,
    tc: f64,
    rhoc: f64,
    r: f64,
    max_density: f64,
}

impl Mbwr {
    pub fn from_record(
        record: &MbwrRecord,
        constants: &FluidConstants,
    ) -> Result<Self, ParameterError> {
        let g: [f64; 32] = record.g.clone().try_into().map_err(|_| {
            ParameterError::IncompatibleParameters(format!(
                "MBWR correlation requires 32 constants, got {}",
                record.g.len()
            ))
        })?;
        let gamma = record.gamma.unwrap_or(1.0 / (constants.rhoc * constants.rhoc));
        if gamma <= 0.0 {
            return Err(ParameterError::IncompatibleParameters(
                "MBWR parameter gamma must be positive".to_string(),
            ));
        }
        Ok(Self {
            g,
            gamma,
            tc: constants.tc,
            rhoc: constants.rhoc,
            r: constants.r(),
            max_density: record.max_density.unwrap_or(4.0 * constants.rhoc),
        })
    }

    /// The temperature dependent coefficients a₁(T)..a₁₅(T).
    fn coefficients<D: DualNum<f64> + Copy>(&self, t: D) -> [D; 15] {
        let g = &self.g;
        let t_inv = t.recip();
        let t2_inv = t_inv * t_inv;
        let t3_inv = t2_inv * t_inv;
        let t4_inv = t2_inv * t2_inv;
        let t_sqrt = t.sqrt();
        [
            t * self.r,
            t * g[0] + t_sqrt * g[1] + t_inv * g[3] + t2_inv * g[4] + g[2],
            t * g[5] + t_inv * g[7] + t2_inv * g[8] + g[6],
            t * g[9] + t_inv * g[11] + g[10],
            D::from(g[12]),
            t_inv * g[13] + t2_inv * g[14],
            t_inv * g[15],
            t_inv * g[16] + t2_inv * g[17],
            t2_inv * g[18],
            t2_inv * g[19] + t3_inv * g[20],
            t2_inv * g[21] + t4_inv * g[22],
            t2_inv * g[23] + t3_inv * g[24],
            t2_inv * g[25] + t4_inv * g[26],
            t2_inv * g[27] + t3_inv * g[28],
            t2_inv * g[29] + t3_inv * g[30] + t4_inv * g[31],
        ]
    }

    /// Pressure in Pa, directly from the correlation.
    pub fn pressure<D: DualNum<f64> + Copy>(&self, t: D, rho: D) -> D {
        let a = self.coefficients(t);
        let mut p = D::zero();
        let mut rho_n = rho;
        for &an in a.iter().take(9) {
            p += an * rho_n;
            rho_n *= rho;
        }
        let rho2 = rho * rho;
        let mut s = D::zero();
        let mut rho_m = rho2 * rho;
        for &an in a.iter().skip(9) {
            s += an * rho_m;
            rho_m *= rho2;
        }
        p + (-rho2 * self.gamma).exp() * s
    }

    /// Reduced residual Helmholtz energy αʳ(δ,τ).
    pub fn evaluate<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        let t = tau.recip() * self.tc;
        let rho = delta * self.rhoc;
        let a = self.coefficients(t);

        // polynomial part of ∫(p - ρRT)/ρ² dρ; the n = 1 term cancels
        // against the ideal gas
        let mut f = D::zero();
        let mut rho_n = rho;
        for (n, &an) in a.iter().enumerate().take(9).skip(1) {
            f += an * rho_n / n as f64;
            rho_n *= rho;
        }

        // exponential part with recursive closed-form integrals
        // I₁ = (1 - exp(-γρ²))/(2γ), I₂ₖ₊₁ = (k I₂ₖ₋₁ - ρ²ᵏ exp(-γρ²)/2)/γ
        let gamma = self.gamma;
        let rho2 = rho * rho;
        let e = (-rho2 * gamma).exp();
        let mut integral = (-e + 1.0) / (2.0 * gamma);
        let mut rho_2k = rho2;
        for (k, &an) in a.iter().skip(9).enumerate() {
            if k > 0 {
                integral = (integral * k as f64 - rho_2k * e * 0.5) / gamma;
                rho_2k *= rho2;
            }
            f += an * integral;
        }

        f / (t * self.r)
    }

    pub fn max_density(&self) -> f64 {
        self.max_density
    }
}

impl fmt::Display for Mbwr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MBWR(gamma={})", self.gamma)
    }
}
