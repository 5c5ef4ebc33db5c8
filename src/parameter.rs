//! Structures that hold the parameters of a fluid and their serialization.

use crate::ideal_gas::IdealGasRecord;
use crate::residual::{CubicRecord, MbwrRecord, MultiParameterRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Error type for incomplete parameter information and IO problems.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error(transparent)]
    FileIO(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("The following component(s) were not found: {0}")]
    ComponentsNotFound(String),
    #[error("Information missing: {0}")]
    InsufficientInformation(String),
    #[error("Incompatible parameters: {0}")]
    IncompatibleParameters(String),
}

/// The identifier field a substance is looked up by.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub enum IdentifierOption {
    Cas,
    Name,
    IupacName,
    Smiles,
    Inchi,
    Formula,
}

/// Names and registry keys under which a substance is known.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Identifier {
    /// CAS number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas: Option<String>,
    /// Commonly used english name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// IUPAC name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iupac_name: Option<String>,
    /// SMILES key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smiles: Option<String>,
    /// InchI key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inchi: Option<String>,
    /// Chemical formula
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Identifier {
    pub fn as_string(&self, option: IdentifierOption) -> Option<String> {
        match option {
            IdentifierOption::Cas => self.cas.clone(),
            IdentifierOption::Name => self.name.clone(),
            IdentifierOption::IupacName => self.iupac_name.clone(),
            IdentifierOption::Smiles => self.smiles.clone(),
            IdentifierOption::Inchi => self.inchi.clone(),
            IdentifierOption::Formula => self.formula.clone(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("cas", &self.cas),
            ("name", &self.name),
            ("formula", &self.formula),
        ];
        let ids: Vec<_> = fields
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
            .collect();
        write!(f, "Identifier({})", ids.join(", "))
    }
}

/// Characteristic constants of a pure fluid.
///
/// All values are given in SI units: temperatures in K, pressures in Pa
/// and densities in mol/m³.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct FluidConstants {
    /// Critical temperature
    pub tc: f64,
    /// Critical density
    pub rhoc: f64,
    /// Critical pressure
    pub pc: f64,
    /// Triple point temperature, lower end of the validity range
    pub t_triple: f64,
    /// Upper end of the fitted temperature range
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_max: Option<f64>,
    /// Upper end of the fitted pressure range
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_max: Option<f64>,
    /// Acentric factor
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acentric_factor: Option<f64>,
    /// Gas constant used in the original correlation. Older correlations
    /// predate CODATA values, replacing the constant would denormalize
    /// the published coefficients.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_constant: Option<f64>,
}

impl FluidConstants {
    /// Molar gas constant of the correlation in J/(mol K).
    pub fn r(&self) -> f64 {
        self.gas_constant.unwrap_or(crate::RGAS)
    }
}

/// The residual model of a fluid in its parsed but unprocessed form.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResidualRecord {
    MultiParameter(MultiParameterRecord),
    Mbwr(MbwrRecord),
    Cubic(CubicRecord),
}

/// A complete parameter set for a pure substance.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FluidRecord {
    pub identifier: Identifier,
    /// Molar weight in g/mol
    pub molarweight: f64,
    pub constants: FluidConstants,
    pub ideal_gas: IdealGasRecord,
    pub residual: ResidualRecord,
}

impl FluidRecord {
    /// Read fluid records from a json file.
    ///
    /// The file holds a list of records. The returned records are in the
    /// order of `substances`, not in file order.
    pub fn from_json<P>(
        substances: &[&str],
        file: P,
        identifier_option: IdentifierOption,
    ) -> Result<Vec<Self>, ParameterError>
    where
        P: AsRef<Path>,
    {
        let mut queried: HashSet<String> = substances.iter().map(|&s| s.to_owned()).collect();
        if queried.len() != substances.len() {
            return Err(ParameterError::IncompatibleParameters(
                "The substance list contains duplicates.".to_string(),
            ));
        }

        let reader = BufReader::new(File::open(file)?);
        let file_records: Vec<Self> = serde_json::from_reader(reader)?;

        // the first match per queried substance wins
        let mut records: HashMap<String, Self> = HashMap::with_capacity(substances.len());
        for record in file_records {
            if let Some(id) = record.identifier.as_string(identifier_option) {
                if let Some(id) = queried.take(&id) {
                    records.insert(id, record);
                }
            }
            if queried.is_empty() {
                break;
            }
        }

        if !queried.is_empty() {
            return Err(ParameterError::ComponentsNotFound(format!("{queried:?}")));
        };

        Ok(substances
            .iter()
            .filter_map(|&s| records.remove(s))
            .collect())
    }
}

impl fmt::Display for FluidRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FluidRecord(")?;
        writeln!(f, "\tidentifier={},", self.identifier)?;
        writeln!(f, "\tmolarweight={},", self.molarweight)?;
        writeln!(f, "\ttc={},", self.constants.tc)?;
        writeln!(f, "\trhoc={},", self.constants.rhoc)?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identifier_fmt() {
        let id = Identifier {
            cas: Some("109-66-0".into()),
            name: Some("pentane".into()),
            smiles: Some("CCCCC".into()),
            ..Default::default()
        };
        assert_eq!(id.to_string(), "Identifier(cas=109-66-0, name=pentane)");
    }

    #[test]
    fn deserialize_cubic_record() {
        let r = r#"
        {
            "identifier": {
                "cas": "74-98-6",
                "name": "propane",
                "formula": "C3H8"
            },
            "molarweight": 44.0962,
            "constants": {
                "tc": 369.96,
                "rhoc": 5000.0,
                "pc": 4250000.0,
                "t_triple": 85.525,
                "acentric_factor": 0.153
            },
            "ideal_gas": {
                "a": 0.0,
                "b": 0.0,
                "c": 3.0
            },
            "residual": {
                "type": "cubic",
                "cubic_type": "peng_robinson"
            }
        }
        "#;
        let record: FluidRecord = serde_json::from_str(r).expect("Unable to parse json.");
        assert_eq!(record.identifier.cas, Some("74-98-6".into()));
        assert_eq!(record.constants.acentric_factor, Some(0.153));
        assert!(matches!(record.residual, ResidualRecord::Cubic(_)));
    }
}
