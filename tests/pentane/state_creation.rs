use approx::assert_relative_eq;
use meos::{
    DensityInitialization, Eos, EosError, IdentifierOption, Phase, PropertySpec, ResolvedState,
    SolverOptions, StateSpecification,
};
use quantity::{BAR, JOULE, KELVIN, KILOGRAM, METER, MOL, PASCAL};
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

fn phase_of(state: &ResolvedState) -> Option<Phase> {
    match state {
        ResolvedState::SinglePhase(_, phase) => Some(*phase),
        ResolvedState::TwoPhase(_) => None,
    }
}

#[test]
fn single_phase_points() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;

    // compressed liquid
    let state = resolve(
        &eos,
        PropertySpec::Temperature(300.0 * KELVIN),
        PropertySpec::Pressure(10.0 * BAR),
    )?;
    assert_eq!(phase_of(&state), Some(Phase::Liquid));
    assert_relative_eq!(
        state.density(),
        8595.751793054627 * MOL / METER.powi::<P3>(),
        max_relative = 1e-9
    );
    assert_relative_eq!(
        state.mass_density(),
        620.1730050517039 * KILOGRAM / METER.powi::<P3>(),
        max_relative = 1e-9
    );

    // superheated vapor
    let state = resolve(
        &eos,
        PropertySpec::Temperature(350.0 * KELVIN),
        PropertySpec::Pressure(0.5 * BAR),
    )?;
    assert_eq!(phase_of(&state), Some(Phase::Vapor));
    assert_relative_eq!(
        state.density(),
        17.42273627834694 * MOL / METER.powi::<P3>(),
        max_relative = 1e-9
    );

    // supercritical
    let state = resolve(
        &eos,
        PropertySpec::Temperature(480.0 * KELVIN),
        PropertySpec::Pressure(50.0 * BAR),
    )?;
    assert_eq!(phase_of(&state), Some(Phase::Supercritical));
    assert_relative_eq!(
        state.density(),
        4883.308866158577 * MOL / METER.powi::<P3>(),
        max_relative = 1e-9
    );
    Ok(())
}

#[test]
fn single_phase_round_trips() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;

    // superheated vapor at 350 K, 0.5 bar
    let t = 350.0 * KELVIN;
    let rho = 17.42273627834694 * MOL / METER.powi::<P3>();
    let p = 0.5 * BAR;
    let h = 46601.269391349495 * JOULE / MOL;
    let s = 188.265201863967 * JOULE / (MOL * KELVIN);
    let u = 43731.45610822357 * JOULE / MOL;
    let vapor_pairs = [
        [PropertySpec::Temperature(t), PropertySpec::Density(rho)],
        [PropertySpec::Temperature(t), PropertySpec::MolarEnthalpy(h)],
        [PropertySpec::Temperature(t), PropertySpec::MolarEntropy(s)],
        [PropertySpec::Pressure(p), PropertySpec::Density(rho)],
        [PropertySpec::Pressure(p), PropertySpec::MolarEnthalpy(h)],
        [PropertySpec::Pressure(p), PropertySpec::MolarEntropy(s)],
        [PropertySpec::Pressure(p), PropertySpec::MolarInternalEnergy(u)],
        [PropertySpec::Density(rho), PropertySpec::MolarEnthalpy(h)],
        [PropertySpec::Density(rho), PropertySpec::MolarInternalEnergy(u)],
        [PropertySpec::MolarEnthalpy(h), PropertySpec::MolarEntropy(s)],
        [PropertySpec::MolarEntropy(s), PropertySpec::MolarInternalEnergy(u)],
    ];
    for [first, second] in vapor_pairs {
        let state = resolve(&eos, first, second)?;
        assert_eq!(phase_of(&state), Some(Phase::Vapor));
        assert_relative_eq!(state.temperature(), t, max_relative = 1e-6);
        assert_relative_eq!(state.density(), rho, max_relative = 1e-6);
    }

    // compressed liquid at 300 K, 10 bar
    let t_l = 300.0 * KELVIN;
    let rho_l = 8595.751793054627 * MOL / METER.powi::<P3>();
    let h_l = 13736.203468544501 * JOULE / MOL;
    let s_l = 76.93754705283884 * JOULE / (MOL * KELVIN);
    let u_l = 13619.86693113913 * JOULE / MOL;
    let liquid_pairs = [
        [
            PropertySpec::Temperature(t_l),
            PropertySpec::MolarInternalEnergy(u_l),
        ],
        [PropertySpec::Density(rho_l), PropertySpec::MolarEntropy(s_l)],
    ];
    for [first, second] in liquid_pairs {
        let state = resolve(&eos, first, second)?;
        assert_eq!(phase_of(&state), Some(Phase::Liquid));
        assert_relative_eq!(state.temperature(), t_l, max_relative = 1e-6);
        assert_relative_eq!(state.density(), rho_l, max_relative = 1e-6);
    }

    // enthalpy and internal energy are nearly collinear in the dilute vapor,
    // so this pair is resolved in the liquid with starting values
    let state = ResolvedState::new(
        &eos,
        StateSpecification::new(
            PropertySpec::MolarEnthalpy(h_l),
            PropertySpec::MolarInternalEnergy(u_l),
        )?,
        Some(310.0 * KELVIN),
        DensityInitialization::InitialDensity(8600.0 * MOL / METER.powi::<P3>()),
        SolverOptions::default(),
    )?;
    assert_eq!(phase_of(&state), Some(Phase::Liquid));
    assert_relative_eq!(state.temperature(), t_l, max_relative = 1e-6);
    assert_relative_eq!(state.density(), rho_l, max_relative = 1e-6);

    // inputs on a mass basis resolve to the same states
    let state = resolve(
        &eos,
        PropertySpec::Temperature(t),
        PropertySpec::SpecificEnthalpy(645905.1614088208 * JOULE / KILOGRAM),
    )?;
    assert_relative_eq!(state.density(), rho, max_relative = 1e-6);
    let state = resolve(
        &eos,
        PropertySpec::Temperature(t_l),
        PropertySpec::MassDensity(620.1730050517039 * KILOGRAM / METER.powi::<P3>()),
    )?;
    assert_relative_eq!(state.density(), rho_l, max_relative = 1e-9);
    Ok(())
}

#[test]
fn two_phase_flashes() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let p_sat = 1038406.1291844024 * PASCAL;
    let rho_mix = 762.6902058303914 * MOL / METER.powi::<P3>();
    let h_mix = 41956.25460447698 * JOULE / MOL;
    let s_mix = 154.23894895055273 * JOULE / (MOL * KELVIN);

    // temperature and vapor quality fix the state directly
    let state = resolve(
        &eos,
        PropertySpec::Temperature(400.0 * KELVIN),
        PropertySpec::VaporQuality(0.5),
    )?;
    assert_eq!(phase_of(&state), None);
    assert_eq!(state.vapor_quality(), Some(0.5));
    assert_relative_eq!(state.pressure(), p_sat, max_relative = 1e-8);
    assert_relative_eq!(state.density(), rho_mix, max_relative = 1e-8);
    assert_relative_eq!(state.molar_enthalpy(), h_mix, max_relative = 1e-8);
    assert_relative_eq!(state.molar_entropy(), s_mix, max_relative = 1e-8);
    // slope of the vapor pressure curve from the Clapeyron relation
    assert_relative_eq!(
        state.dp_dt(),
        20206.104051308477 * PASCAL / KELVIN,
        max_relative = 1e-7
    );
    // heat capacities and speed of sound are undefined in the dome
    assert!(state.molar_isochoric_heat_capacity().is_none());
    assert!(state.molar_isobaric_heat_capacity().is_none());
    assert!(state.speed_of_sound().is_none());

    // pressure paired with a caloric property locates the same split
    let state = resolve(
        &eos,
        PropertySpec::Pressure(p_sat),
        PropertySpec::MolarEnthalpy(h_mix),
    )?;
    assert_relative_eq!(state.temperature(), 400.0 * KELVIN, max_relative = 1e-8);
    assert!((state.vapor_quality().unwrap() - 0.5).abs() < 1e-6);

    let state = resolve(
        &eos,
        PropertySpec::Pressure(p_sat),
        PropertySpec::MolarEntropy(s_mix),
    )?;
    assert!((state.vapor_quality().unwrap() - 0.5).abs() < 1e-6);

    // so does the overall density
    let state = resolve(
        &eos,
        PropertySpec::Temperature(400.0 * KELVIN),
        PropertySpec::Density(rho_mix),
    )?;
    assert!((state.vapor_quality().unwrap() - 0.5).abs() < 1e-6);

    // density and enthalpy leave the saturation temperature unknown and
    // require the full flash iteration
    let state = resolve(
        &eos,
        PropertySpec::Density(rho_mix),
        PropertySpec::MolarEnthalpy(h_mix),
    )?;
    assert_eq!(phase_of(&state), None);
    assert_relative_eq!(state.temperature(), 400.0 * KELVIN, max_relative = 1e-7);
    assert!((state.vapor_quality().unwrap() - 0.5).abs() < 1e-6);
    Ok(())
}

#[test]
fn vapor_quality_inputs() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;

    // bubble point at atmospheric pressure
    let state = resolve(
        &eos,
        PropertySpec::Pressure(101325.0 * PASCAL),
        PropertySpec::VaporQuality(0.0),
    )?;
    assert_relative_eq!(
        state.temperature(),
        309.2136248001498 * KELVIN,
        max_relative = 1e-8
    );
    assert_relative_eq!(
        state.density(),
        8450.743694884293 * MOL / METER.powi::<P3>(),
        max_relative = 1e-7
    );

    // dew point at 300 K
    let state = resolve(
        &eos,
        PropertySpec::Temperature(300.0 * KELVIN),
        PropertySpec::VaporQuality(1.0),
    )?;
    assert_eq!(state.vapor_quality(), Some(1.0));
    assert_relative_eq!(
        state.density(),
        30.405306353837446 * MOL / METER.powi::<P3>(),
        max_relative = 1e-7
    );

    // no saturation curve above the critical point
    assert!(matches!(
        resolve(
            &eos,
            PropertySpec::Temperature(475.0 * KELVIN),
            PropertySpec::VaporQuality(0.5),
        ),
        Err(EosError::SuperCritical)
    ));
    assert!(matches!(
        resolve(
            &eos,
            PropertySpec::Pressure(40.0 * BAR),
            PropertySpec::VaporQuality(0.5),
        ),
        Err(EosError::SuperCritical)
    ));

    // vapor quality outside of [0, 1]
    assert!(matches!(
        resolve(
            &eos,
            PropertySpec::Temperature(300.0 * KELVIN),
            PropertySpec::VaporQuality(1.3),
        ),
        Err(EosError::InvalidState(..))
    ));
    assert!(matches!(
        resolve(
            &eos,
            PropertySpec::Temperature(300.0 * KELVIN),
            PropertySpec::VaporQuality(-0.1),
        ),
        Err(EosError::InvalidState(..))
    ));
    Ok(())
}

#[test]
fn invalid_specifications() {
    let t = 300.0 * KELVIN;
    let rho = 8000.0 * MOL / METER.powi::<P3>();
    let h = 10000.0 * JOULE / MOL;
    let pairs = [
        (PropertySpec::Temperature(t), PropertySpec::Temperature(t)),
        (
            PropertySpec::Density(rho),
            PropertySpec::MassDensity(600.0 * KILOGRAM / METER.powi::<P3>()),
        ),
        (
            PropertySpec::MolarEnthalpy(h),
            PropertySpec::SpecificEnthalpy(140000.0 * JOULE / KILOGRAM),
        ),
        (PropertySpec::VaporQuality(0.5), PropertySpec::MolarEnthalpy(h)),
        (PropertySpec::VaporQuality(0.5), PropertySpec::Density(rho)),
    ];
    for (first, second) in pairs {
        assert!(matches!(
            StateSpecification::new(first, second),
            Err(EosError::InvalidInputPair(_))
        ));
    }
}
