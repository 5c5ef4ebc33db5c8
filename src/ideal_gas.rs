//! Ideal gas contribution to the Helmholtz energy.

use crate::parameter::ParameterError;
use ndarray::Array1;
use num_dual::DualNum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficients of the ideal gas Helmholtz energy of a pure fluid.
///
/// The reduced ideal gas Helmholtz energy is parametrized directly, in the
/// form in which reference correlations report it:
/// ```text
/// α⁰(δ,τ) = ln δ + a + bτ + c ln τ + Σᵢ nᵢ τ^tᵢ + Σⱼ mⱼ ln(1 - exp(-θⱼτ))
///         + Σₖ sₖ ln(sinh(ψₖτ)) - Σₗ cₗ ln(cosh(ψₗτ))
/// ```
/// with the reduced temperature τ = Tc/T and reduced density δ = ρ/ρc of
/// the corresponding residual model. For a temperature independent isobaric
/// heat capacity `cp0`, the coefficient of the logarithmic term is
/// c = cp0/R - 1.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct IdealGasRecord {
    /// Constant offset
    pub a: f64,
    /// Coefficient of the term linear in τ
    pub b: f64,
    /// Coefficient of ln(τ)
    pub c: f64,
    /// Coefficients of the polynomial terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub n_poly: Vec<f64>,
    /// Exponents of the polynomial terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub t_poly: Vec<f64>,
    /// Coefficients of the Planck-Einstein terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub n_einstein: Vec<f64>,
    /// Reduced Einstein temperatures
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub theta_einstein: Vec<f64>,
    /// Coefficients of the hyperbolic sine terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub n_sinh: Vec<f64>,
    /// Reduced temperatures of the hyperbolic sine terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub theta_sinh: Vec<f64>,
    /// Coefficients of the hyperbolic cosine terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub n_cosh: Vec<f64>,
    /// Reduced temperatures of the hyperbolic cosine terms
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub theta_cosh: Vec<f64>,
}

impl fmt::Display for IdealGasRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IdealGasRecord(a={}, b={}, c={}, {} polynomial, {} Einstein, {} hyperbolic terms)",
            self.a,
            self.b,
            self.c,
            self.n_poly.len(),
            self.n_einstein.len(),
            self.n_sinh.len() + self.n_cosh.len()
        )
    }
}

/// The ideal gas Helmholtz energy contribution of a pure fluid.
#[derive(Debug, Clone)]
pub struct IdealGas {
    a: f64,
    b: f64,
    c: f64,
    n_poly: Array1<f64>,
    t_poly: Array1<f64>,
    n_einstein: Array1<f64>,
    theta_einstein: Array1<f64>,
    n_sinh: Array1<f64>,
    theta_sinh: Array1<f64>,
    n_cosh: Array1<f64>,
    theta_cosh: Array1<f64>,
}

fn same_length(name: &str, n: &[f64], t: &[f64]) -> Result<(), ParameterError> {
    if n.len() == t.len() {
        Ok(())
    } else {
        Err(ParameterError::IncompatibleParameters(format!(
            "ideal gas record: {} coefficients and exponents differ in length ({} vs. {})",
            name,
            n.len(),
            t.len()
        )))
    }
}

impl IdealGas {
    pub fn from_record(record: &IdealGasRecord) -> Result<Self, ParameterError> {
        same_length("polynomial", &record.n_poly, &record.t_poly)?;
        same_length("Einstein", &record.n_einstein, &record.theta_einstein)?;
        same_length("sinh", &record.n_sinh, &record.theta_sinh)?;
        same_length("cosh", &record.n_cosh, &record.theta_cosh)?;
        Ok(Self {
            a: record.a,
            b: record.b,
            c: record.c,
            n_poly: Array1::from(record.n_poly.clone()),
            t_poly: Array1::from(record.t_poly.clone()),
            n_einstein: Array1::from(record.n_einstein.clone()),
            theta_einstein: Array1::from(record.theta_einstein.clone()),
            n_sinh: Array1::from(record.n_sinh.clone()),
            theta_sinh: Array1::from(record.theta_sinh.clone()),
            n_cosh: Array1::from(record.n_cosh.clone()),
            theta_cosh: Array1::from(record.theta_cosh.clone()),
        })
    }

    /// Reduced ideal gas Helmholtz energy α⁰(δ,τ).
    pub fn evaluate<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        let mut f = delta.ln() + tau.ln() * self.c + tau * self.b + self.a;
        for (n, t) in self.n_poly.iter().zip(&self.t_poly) {
            f += tau.powf(*t) * *n;
        }
        for (n, theta) in self.n_einstein.iter().zip(&self.theta_einstein) {
            let e = (-tau * *theta).exp();
            f += (-e).ln_1p() * *n;
        }
        for (n, theta) in self.n_sinh.iter().zip(&self.theta_sinh) {
            f += (tau * *theta).sinh().ln() * *n;
        }
        for (n, theta) in self.n_cosh.iter().zip(&self.theta_cosh) {
            f -= (tau * *theta).cosh().ln() * *n;
        }
        f
    }
}

impl fmt::Display for IdealGas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ideal gas (Helmholtz form)")
    }
}
