use approx::assert_relative_eq;
use meos::parameter::FluidRecord;
use meos::{
    Contributions, DensityInitialization, DomainWarning, Eos, EosError, IdentifierOption, Phase,
    PhaseEquilibrium, PropertySpec, ReferenceSystem, ResolvedState, SolverOptions,
    StateSpecification,
};
use quantity::{BAR, JOULE, KELVIN, METER, MOL, PASCAL, SECOND};
use std::error::Error;
use std::sync::Arc;
use typenum::P3;

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
fn heat_capacities_and_speed_of_sound() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;

    let liquid = resolve(
        &eos,
        PropertySpec::Temperature(300.0 * KELVIN),
        PropertySpec::Pressure(10.0 * BAR),
    )?;
    assert_relative_eq!(
        liquid.molar_isochoric_heat_capacity().unwrap(),
        125.55364457886368 * JOULE / (MOL * KELVIN),
        max_relative = 1e-8
    );
    assert_relative_eq!(
        liquid.molar_isobaric_heat_capacity().unwrap(),
        167.37457303050002 * JOULE / (MOL * KELVIN),
        max_relative = 1e-8
    );
    assert_relative_eq!(
        liquid.speed_of_sound().unwrap(),
        1011.2470380964851 * METER / SECOND,
        max_relative = 1e-8
    );
    assert_relative_eq!(
        liquid.molar_enthalpy(),
        13736.203468544501 * JOULE / MOL,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        liquid.molar_entropy(),
        76.93754705283884 * JOULE / (MOL * KELVIN),
        max_relative = 1e-9
    );
    assert_relative_eq!(
        liquid.molar_internal_energy(),
        13619.86693113913 * JOULE / MOL,
        max_relative = 1e-9
    );

    let vapor = resolve(
        &eos,
        PropertySpec::Temperature(350.0 * KELVIN),
        PropertySpec::Pressure(0.5 * BAR),
    )?;
    assert_relative_eq!(
        vapor.molar_isochoric_heat_capacity().unwrap(),
        128.6162700909788 * JOULE / (MOL * KELVIN),
        max_relative = 1e-8
    );
    assert_relative_eq!(
        vapor.molar_isobaric_heat_capacity().unwrap(),
        137.49937573238356 * JOULE / (MOL * KELVIN),
        max_relative = 1e-8
    );
    assert_relative_eq!(
        vapor.speed_of_sound().unwrap(),
        204.76201859941125 * METER / SECOND,
        max_relative = 1e-8
    );
    assert_relative_eq!(
        vapor.molar_enthalpy(),
        46601.269391349495 * JOULE / MOL,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        vapor.molar_internal_energy(),
        43731.45610822357 * JOULE / MOL,
        max_relative = 1e-9
    );
    Ok(())
}

#[test]
fn ideal_gas_limit() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let state = match resolve(
        &eos,
        PropertySpec::Temperature(500.0 * KELVIN),
        PropertySpec::Pressure(100.0 * PASCAL),
    )? {
        ResolvedState::SinglePhase(state, phase) => {
            assert_eq!(phase, Phase::Supercritical);
            state
        }
        ResolvedState::TwoPhase(_) => panic!("dilute gas resolved as two phase state"),
    };
    let z = state.compressibility(Contributions::Total);
    assert_relative_eq!(z, 0.9999916697635391, max_relative = 1e-9);
    assert!((z - 1.0).abs() < 1e-4);

    let c = Contributions::Total;
    let cp = state.molar_isobaric_heat_capacity(c);
    let cv = state.molar_isochoric_heat_capacity(c);
    let r = eos.gas_constant();
    assert!(((cp - cv - r) / r).into_value().abs() < 1e-3);
    Ok(())
}

#[test]
fn virial_coefficients() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let b250 = eos.second_virial_coefficient(250.0 * KELVIN);
    let b300 = eos.second_virial_coefficient(300.0 * KELVIN);
    let b_tc = eos.second_virial_coefficient(469.7 * KELVIN);
    assert_relative_eq!(
        b250,
        -1.8670935131908483e-3 * METER.powi::<P3>() / MOL,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        b300,
        -1.1593545949716308e-3 * METER.powi::<P3>() / MOL,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        b_tc,
        -4.0072131262151774e-4 * METER.powi::<P3>() / MOL,
        max_relative = 1e-9
    );
    assert!(b250 < b300 && b300 < b_tc);
    assert!(b_tc < 0.0 * METER.powi::<P3>() / MOL);

    let c300 = eos.third_virial_coefficient(300.0 * KELVIN);
    let c400 = eos.third_virial_coefficient(400.0 * KELVIN);
    assert!(c300.to_reduced() > 0.0);
    assert!(c400.to_reduced() > 0.0);
    Ok(())
}

#[test]
fn domain_warnings() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;

    let state = resolve(
        &eos,
        PropertySpec::Temperature(300.0 * KELVIN),
        PropertySpec::Pressure(10.0 * BAR),
    )?;
    assert!(state.domain_warnings().is_empty());

    // the correlation is published for temperatures up to 600 K
    let state = resolve(
        &eos,
        PropertySpec::Temperature(620.0 * KELVIN),
        PropertySpec::Pressure(10.0 * BAR),
    )?;
    assert!(matches!(
        &state,
        ResolvedState::SinglePhase(_, Phase::Supercritical)
    ));
    assert_eq!(
        state.domain_warnings(),
        vec![DomainWarning::TemperatureOutOfRange]
    );

    // and pressures up to 100 MPa
    let state = resolve(
        &eos,
        PropertySpec::Temperature(300.0 * KELVIN),
        PropertySpec::Pressure(2000.0 * BAR),
    )?;
    assert_eq!(
        state.domain_warnings(),
        vec![DomainWarning::PressureOutOfRange]
    );
    Ok(())
}

#[test]
fn cubic_model_comparison() -> Result<(), Box<dyn Error>> {
    // same fluid and ideal gas model, with the residual part replaced by a
    // generalized cubic
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
    let record: FluidRecord = serde_json::from_str(record)?;
    let cubic = Arc::new(Eos::from_record(record)?);
    assert_eq!(cubic.model(), "peng_robinson");

    let eos = pentane()?;
    assert_eq!(eos.model(), "multi_parameter");

    // a two parameter cubic tracks the reference correlation to within a
    // percent in the vapor pressure and a few percent in the liquid density
    let p_ref = PhaseEquilibrium::vapor_pressure(&eos, 300.0 * KELVIN)?;
    let p_cubic = PhaseEquilibrium::vapor_pressure(&cubic, 300.0 * KELVIN)?;
    assert_relative_eq!(p_cubic, p_ref, max_relative = 1e-2);

    let vle_ref = PhaseEquilibrium::pure(&eos, 300.0 * KELVIN, None, SolverOptions::default())?;
    let vle_cubic = PhaseEquilibrium::pure(&cubic, 300.0 * KELVIN, None, SolverOptions::default())?;
    assert_relative_eq!(
        vle_cubic.liquid().density,
        vle_ref.liquid().density,
        max_relative = 5e-2
    );
    Ok(())
}
