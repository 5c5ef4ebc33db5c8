//! Term-by-term multiparameter Helmholtz energy correlations.

use crate::parameter::{FluidConstants, ParameterError};
use num_dual::DualNum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block of terms of the reduced residual Helmholtz energy.
///
/// Every block contributes a sum over parallel coefficient arrays. The
/// exponents of the Gaussian blocks have to be even so that the terms stay
/// differentiable for δ < ε and τ < γ.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HelmholtzTerms {
    /// nᵢ δ^dᵢ τ^tᵢ
    Polynomial {
        n: Vec<f64>,
        d: Vec<f64>,
        t: Vec<f64>,
    },
    /// nᵢ δ^dᵢ τ^tᵢ exp(-γᵢ δ^cᵢ)
    Exponential {
        n: Vec<f64>,
        d: Vec<f64>,
        t: Vec<f64>,
        c: Vec<f64>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        gamma: Option<Vec<f64>>,
    },
    /// nᵢ δ^dᵢ τ^tᵢ exp(-αᵢ(δ-εᵢ)^pᵢ - βᵢ(τ-γᵢ)^qᵢ)
    Gaussian {
        n: Vec<f64>,
        d: Vec<f64>,
        t: Vec<f64>,
        alpha: Vec<f64>,
        beta: Vec<f64>,
        gamma: Vec<f64>,
        epsilon: Vec<f64>,
        /// Even exponents p of the density distance, defaults to 2
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        exp_delta: Option<Vec<f64>>,
        /// Even exponents q of the temperature distance, defaults to 2
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        exp_tau: Option<Vec<f64>>,
    },
    /// nᵢ Δ^bᵢ δ ψ with the distance function Δ = θ² + Bᵢ|δ-1|^(2aᵢ),
    /// θ = (1-τ) + Aᵢ|δ-1|^(1/βᵢ) and ψ = exp(-Cᵢ(δ-1)² - Dᵢ(τ-1)²)
    NonAnalytic {
        n: Vec<f64>,
        a: Vec<f64>,
        b: Vec<f64>,
        beta: Vec<f64>,
        #[serde(rename = "A")]
        big_a: Vec<f64>,
        #[serde(rename = "B")]
        big_b: Vec<f64>,
        #[serde(rename = "C")]
        big_c: Vec<f64>,
        #[serde(rename = "D")]
        big_d: Vec<f64>,
    },
    /// nᵢ δ^dᵢ τ^tᵢ exp(-ηᵢ δ^cᵢ - κᵢ τ^mᵢ), damped in both axes as used
    /// for strongly associating fluids
    Associative {
        n: Vec<f64>,
        d: Vec<f64>,
        t: Vec<f64>,
        c: Vec<f64>,
        eta: Vec<f64>,
        m: Vec<f64>,
        kappa: Vec<f64>,
    },
}

/// δ raised to a density exponent.
///
/// Density exponents are small integers. Multiplying them out keeps the
/// dual parts exact in the δ → 0 limit, where `powf` runs into 0^negative
/// in the higher derivatives of δ¹ and δ² terms.
fn powd<D: DualNum<f64> + Copy>(x: D, exp: f64) -> D {
    if exp == 0.0 {
        D::one()
    } else if exp > 0.0 && exp <= 16.0 && exp.fract() == 0.0 {
        let mut f = x;
        for _ in 1..exp as u32 {
            f *= x;
        }
        f
    } else {
        x.powf(exp)
    }
}

fn check_lengths(family: &str, len: usize, arrays: &[(&str, usize)]) -> Result<(), ParameterError> {
    for (name, l) in arrays {
        if *l != len {
            return Err(ParameterError::IncompatibleParameters(format!(
                "{} terms: array '{}' has length {} instead of {}",
                family, name, l, len
            )));
        }
    }
    Ok(())
}

fn check_even(family: &str, exponents: Option<&Vec<f64>>) -> Result<(), ParameterError> {
    if let Some(e) = exponents {
        for &p in e {
            if p <= 0.0 || p % 2.0 != 0.0 {
                return Err(ParameterError::IncompatibleParameters(format!(
                    "{} terms: exponent {} is not a positive even number",
                    family, p
                )));
            }
        }
    }
    Ok(())
}

impl HelmholtzTerms {
    fn validate(&self) -> Result<(), ParameterError> {
        match self {
            Self::Polynomial { n, d, t } => {
                check_lengths("polynomial", n.len(), &[("d", d.len()), ("t", t.len())])
            }
            Self::Exponential { n, d, t, c, gamma } => check_lengths(
                "exponential",
                n.len(),
                &[
                    ("d", d.len()),
                    ("t", t.len()),
                    ("c", c.len()),
                    ("gamma", gamma.as_ref().map_or(n.len(), |g| g.len())),
                ],
            ),
            Self::Gaussian {
                n,
                d,
                t,
                alpha,
                beta,
                gamma,
                epsilon,
                exp_delta,
                exp_tau,
            } => {
                check_lengths(
                    "Gaussian",
                    n.len(),
                    &[
                        ("d", d.len()),
                        ("t", t.len()),
                        ("alpha", alpha.len()),
                        ("beta", beta.len()),
                        ("gamma", gamma.len()),
                        ("epsilon", epsilon.len()),
                        ("exp_delta", exp_delta.as_ref().map_or(n.len(), |e| e.len())),
                        ("exp_tau", exp_tau.as_ref().map_or(n.len(), |e| e.len())),
                    ],
                )?;
                check_even("Gaussian", exp_delta.as_ref())?;
                check_even("Gaussian", exp_tau.as_ref())
            }
            Self::NonAnalytic {
                n,
                a,
                b,
                beta,
                big_a,
                big_b,
                big_c,
                big_d,
            } => {
                check_lengths(
                    "non-analytic",
                    n.len(),
                    &[
                        ("a", a.len()),
                        ("b", b.len()),
                        ("beta", beta.len()),
                        ("A", big_a.len()),
                        ("B", big_b.len()),
                        ("C", big_c.len()),
                        ("D", big_d.len()),
                    ],
                )?;
                if beta.iter().any(|&b| b == 0.0) {
                    return Err(ParameterError::IncompatibleParameters(
                        "non-analytic terms: beta must be nonzero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Associative {
                n,
                d,
                t,
                c,
                eta,
                m,
                kappa,
            } => check_lengths(
                "associative",
                n.len(),
                &[
                    ("d", d.len()),
                    ("t", t.len()),
                    ("c", c.len()),
                    ("eta", eta.len()),
                    ("m", m.len()),
                    ("kappa", kappa.len()),
                ],
            ),
        }
    }

    fn evaluate<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        let mut f = D::zero();
        match self {
            Self::Polynomial { n, d, t } => {
                for i in 0..n.len() {
                    f += powd(delta, d[i]) * tau.powf(t[i]) * n[i];
                }
            }
            Self::Exponential { n, d, t, c, gamma } => {
                for i in 0..n.len() {
                    let g = gamma.as_ref().map_or(1.0, |g| g[i]);
                    f += powd(delta, d[i])
                        * tau.powf(t[i])
                        * (-powd(delta, c[i]) * g).exp()
                        * n[i];
                }
            }
            Self::Gaussian {
                n,
                d,
                t,
                alpha,
                beta,
                gamma,
                epsilon,
                exp_delta,
                exp_tau,
            } => {
                for i in 0..n.len() {
                    let dd = delta - epsilon[i];
                    let dt = tau - gamma[i];
                    let pd = exp_delta.as_ref().map_or(2.0, |e| e[i]);
                    let pt = exp_tau.as_ref().map_or(2.0, |e| e[i]);
                    // even exponents evaluated on the square keep the terms
                    // smooth on both sides of the extremum
                    let ed = if pd == 2.0 {
                        dd * dd
                    } else {
                        (dd * dd).powf(0.5 * pd)
                    };
                    let et = if pt == 2.0 {
                        dt * dt
                    } else {
                        (dt * dt).powf(0.5 * pt)
                    };
                    f += powd(delta, d[i])
                        * tau.powf(t[i])
                        * (-ed * alpha[i] - et * beta[i]).exp()
                        * n[i];
                }
            }
            Self::NonAnalytic {
                n,
                a,
                b,
                beta,
                big_a,
                big_b,
                big_c,
                big_d,
            } => {
                let dm1 = delta - 1.0;
                let tm1 = tau - 1.0;
                // the terms vanish in the critical point itself, where the
                // distance function is not differentiable
                if dm1.re().abs() < f64::EPSILON && tm1.re().abs() < f64::EPSILON {
                    return f;
                }
                let dm1_2 = dm1 * dm1;
                for i in 0..n.len() {
                    let theta = -tm1 + dm1_2.powf(0.5 / beta[i]) * big_a[i];
                    let big_delta = theta * theta + dm1_2.powf(a[i]) * big_b[i];
                    let psi = (-dm1_2 * big_c[i] - tm1 * tm1 * big_d[i]).exp();
                    f += big_delta.powf(b[i]) * delta * psi * n[i];
                }
            }
            Self::Associative {
                n,
                d,
                t,
                c,
                eta,
                m,
                kappa,
            } => {
                for i in 0..n.len() {
                    f += powd(delta, d[i])
                        * tau.powf(t[i])
                        * (-powd(delta, c[i]) * eta[i] - tau.powf(m[i]) * kappa[i]).exp()
                        * n[i];
                }
            }
        }
        f
    }

    fn len(&self) -> usize {
        match self {
            Self::Polynomial { n, .. }
            | Self::Exponential { n, .. }
            | Self::Gaussian { n, .. }
            | Self::NonAnalytic { n, .. }
            | Self::Associative { n, .. } => n.len(),
        }
    }
}

/// Parameters of a multiparameter Helmholtz energy correlation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MultiParameterRecord {
    /// Term blocks of the reduced residual Helmholtz energy
    pub terms: Vec<HelmholtzTerms>,
    /// Maximum density in mol/m³ up to which the correlation is evaluated
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_density: Option<f64>,
}

/// A multiparameter Helmholtz energy equation of state.
#[derive(Debug, Clone)]
pub struct MultiParameter {
    terms: Vec<HelmholtzTerms>,
    max_density: f64,
}

impl MultiParameter {
    pub fn from_record(
        record: &MultiParameterRecord,
        constants: &FluidConstants,
    ) -> Result<Self, ParameterError> {
        if record.terms.is_empty() {
            return Err(ParameterError::InsufficientInformation(
                "multiparameter correlation without terms".to_string(),
            ));
        }
        for terms in &record.terms {
            terms.validate()?;
        }
        Ok(Self {
            terms: record.terms.clone(),
            max_density: record.max_density.unwrap_or(4.0 * constants.rhoc),
        })
    }

    /// Reduced residual Helmholtz energy αʳ(δ,τ).
    pub fn evaluate<D: DualNum<f64> + Copy>(&self, delta: D, tau: D) -> D {
        self.terms
            .iter()
            .fold(D::zero(), |acc, terms| acc + terms.evaluate(delta, tau))
    }

    pub fn max_density(&self) -> f64 {
        self.max_density
    }
}

impl fmt::Display for MultiParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n: usize = self.terms.iter().map(|t| t.len()).sum();
        write!(f, "MultiParameter({} terms)", n)
    }
}
