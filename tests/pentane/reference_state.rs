use approx::assert_relative_eq;
use meos::{
    DensityInitialization, Eos, EosError, IdentifierOption, Phase, PhaseEquilibrium, PropertySpec,
    ReferenceConvention, ReferenceState, ReferenceSystem, ResolvedState, SolverOptions,
    StateSpecification,
};
use quantity::{JOULE, KELVIN, KILO, KILOGRAM, MOL, PASCAL};
use std::error::Error;
use std::sync::Arc;

fn pentane() -> Result<Arc<Eos>, Box<dyn Error>> {
    Ok(Arc::new(Eos::from_json(
        "pentane",
        "parameters/pentane.json",
        IdentifierOption::Name,
    )?))
}

fn resolve(
    eos: &Arc<Eos>,
    first: PropertySpec,
    second: PropertySpec,
) -> Result<ResolvedState, EosError> {
    ResolvedState::new(
        eos,
        StateSpecification::new(first, second)?,
        None,
        DensityInitialization::None,
        SolverOptions::default(),
    )
}

#[test]
fn reference_conventions() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let references = ReferenceState::new();
    assert!(references.is_empty());

    // IIR: h = 200 kJ/kg and s = 1 kJ/(kg K) for the saturated liquid at 0 °C
    let iir = references.apply(&eos, ReferenceConvention::Iir)?;
    let bubble = resolve(
        &iir,
        PropertySpec::Temperature(273.15 * KELVIN),
        PropertySpec::VaporQuality(0.0),
    )?;
    assert_relative_eq!(
        bubble.specific_enthalpy(),
        200.0 * KILO * JOULE / KILOGRAM,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        bubble.specific_entropy(),
        1.0 * KILO * JOULE / (KILOGRAM * KELVIN),
        max_relative = 1e-9
    );

    // NBP: h and s vanish for the saturated liquid at atmospheric pressure
    let nbp = references.apply(&eos, ReferenceConvention::Nbp)?;
    let bubble = resolve(
        &nbp,
        PropertySpec::Pressure(101325.0 * PASCAL),
        PropertySpec::VaporQuality(0.0),
    )?;
    assert!(bubble.molar_enthalpy().to_reduced().abs() < 1e-6);
    assert!(bubble.molar_entropy().to_reduced().abs() < 1e-9);

    // ASHRAE: h and s vanish for the saturated liquid at -40 °C
    let ashrae = references.apply(&eos, ReferenceConvention::Ashrae)?;
    let bubble = resolve(
        &ashrae,
        PropertySpec::Temperature(233.15 * KELVIN),
        PropertySpec::VaporQuality(0.0),
    )?;
    assert!(bubble.molar_enthalpy().to_reduced().abs() < 1e-6);
    assert!(bubble.molar_entropy().to_reduced().abs() < 1e-9);

    // custom defining state at standard conditions, where pentane is liquid
    let custom = ReferenceConvention::Custom {
        temperature: 298.15 * KELVIN,
        pressure: 101325.0 * PASCAL,
        molar_enthalpy: 0.0 * JOULE / MOL,
        molar_entropy: 0.0 * JOULE / (MOL * KELVIN),
    };
    let shifted = references.apply(&eos, custom)?;
    let state = resolve(
        &shifted,
        PropertySpec::Temperature(298.15 * KELVIN),
        PropertySpec::Pressure(101325.0 * PASCAL),
    )?;
    assert!(matches!(&state, ResolvedState::SinglePhase(_, Phase::Liquid)));
    assert!(state.molar_enthalpy().to_reduced().abs() < 1e-6);
    assert!(state.molar_entropy().to_reduced().abs() < 1e-9);

    assert_eq!(references.len(), 4);

    // the offsets drop out of all saturation calculations
    let p_sat = PhaseEquilibrium::vapor_pressure(&eos, 300.0 * KELVIN)?;
    let p_sat_iir = PhaseEquilibrium::vapor_pressure(&iir, 300.0 * KELVIN)?;
    assert_relative_eq!(p_sat_iir, p_sat, max_relative = 1e-13);
    Ok(())
}

#[test]
fn offset_cache_persistence() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let references = ReferenceState::new();

    let first = references.offsets(&eos, ReferenceConvention::Iir)?;
    let second = references.offsets(&eos, ReferenceConvention::Iir)?;
    assert_eq!(references.len(), 1);
    assert_eq!(first.delta_h, second.delta_h);
    assert_eq!(first.delta_s, second.delta_s);
    references.offsets(&eos, ReferenceConvention::Nbp)?;
    assert_eq!(references.len(), 2);

    let path = std::env::temp_dir().join("pentane_reference_offsets.json");
    references.to_json(&path)?;
    let restored = ReferenceState::from_json(&path)?;
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.len(), 2);
    let cached = restored.offsets(&eos, ReferenceConvention::Iir)?;
    assert_eq!(restored.len(), 2);
    assert_eq!(first.delta_h, cached.delta_h);
    assert_eq!(first.delta_s, cached.delta_s);
    Ok(())
}
