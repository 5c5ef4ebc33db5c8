use approx::assert_relative_eq;
use meos::{Contributions, Eos, IdentifierOption, PhaseEquilibrium, SolverOptions};
use quantity::{JOULE, KELVIN, METER, MOL, PASCAL};
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

#[test]
fn vapor_pressure_curve() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    // Span (2003) correlation, from the triple point up to 400 K
    let anchors = [
        (143.47, 0.07632205919450098),
        (250.0, 7585.709468010215),
        (300.0, 73167.5997576241),
        (350.0, 339563.23985256715),
        (400.0, 1038406.1291844024),
    ];
    let mut p_old = 0.0 * PASCAL;
    for (t, p) in anchors {
        let p_sat = PhaseEquilibrium::vapor_pressure(&eos, t * KELVIN)?;
        assert_relative_eq!(p_sat, p * PASCAL, max_relative = 1e-8);
        assert!(p_sat > p_old);
        p_old = p_sat;
    }
    Ok(())
}

#[test]
fn normal_boiling_point() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let t_nbp = PhaseEquilibrium::boiling_temperature(&eos, 101325.0 * PASCAL)?;
    assert_relative_eq!(t_nbp, 309.2136248001498 * KELVIN, max_relative = 1e-8);

    let vle = PhaseEquilibrium::pure(&eos, t_nbp, None, SolverOptions::default())?;
    assert_relative_eq!(
        vle.liquid().density,
        8450.743694884293 * MOL / METER.powi::<P3>(),
        max_relative = 1e-7
    );
    assert_relative_eq!(
        vle.vapor().density,
        41.239214564479234 * MOL / METER.powi::<P3>(),
        max_relative = 1e-7
    );
    let c = Contributions::Total;
    let latent = vle.vapor().molar_enthalpy(c) - vle.liquid().molar_enthalpy(c);
    assert_relative_eq!(latent, 25798.912906266927 * JOULE / MOL, max_relative = 1e-7);
    Ok(())
}

#[test]
fn saturated_phases_in_equilibrium() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let vle = PhaseEquilibrium::pure(&eos, 400.0 * KELVIN, None, SolverOptions::default())?;
    let c = Contributions::Total;
    assert_relative_eq!(
        vle.vapor().pressure(c),
        vle.liquid().pressure(c),
        max_relative = 1e-9
    );
    assert_relative_eq!(
        vle.vapor().chemical_potential(c),
        vle.liquid().chemical_potential(c),
        max_relative = 1e-9
    );
    assert_relative_eq!(
        vle.liquid().density,
        6926.336718566756 * MOL / METER.powi::<P3>(),
        max_relative = 1e-8
    );
    assert_relative_eq!(
        vle.vapor().density,
        403.56424329875813 * MOL / METER.powi::<P3>(),
        max_relative = 1e-8
    );
    Ok(())
}

#[test]
fn approach_to_critical_point() -> Result<(), Box<dyn Error>> {
    let eos = pentane()?;
    let mut vle = PhaseEquilibrium::pure(&eos, 450.0 * KELVIN, None, SolverOptions::default())?;
    let mut width = vle.liquid().density - vle.vapor().density;
    for t in [455.0, 460.0, 462.0, 464.0, 466.0, 468.0] {
        vle = PhaseEquilibrium::pure(&eos, t * KELVIN, Some(&vle), SolverOptions::default())?;
        let w = vle.liquid().density - vle.vapor().density;
        assert!(w < width);
        width = w;
        if t == 460.0 {
            assert_relative_eq!(
                vle.liquid().density,
                4967.923448860301 * MOL / METER.powi::<P3>(),
                max_relative = 1e-7
            );
            assert_relative_eq!(
                vle.vapor().density,
                1617.9520685613252 * MOL / METER.powi::<P3>(),
                max_relative = 1e-7
            );
        }
    }
    assert_relative_eq!(
        vle.liquid().density,
        4177.658729819855 * MOL / METER.powi::<P3>(),
        max_relative = 1e-6
    );
    assert_relative_eq!(
        vle.vapor().density,
        2335.2611064672806 * MOL / METER.powi::<P3>(),
        max_relative = 1e-6
    );

    // at and above the critical temperature both phases coincide in the
    // critical point, with the pressure evaluated from the correlation
    let vle = PhaseEquilibrium::pure(&eos, 475.0 * KELVIN, None, SolverOptions::default())?;
    assert_eq!(vle.vapor().density, vle.liquid().density);
    assert_relative_eq!(vle.vapor().temperature, 469.7 * KELVIN, max_relative = 1e-14);
    assert_relative_eq!(
        vle.vapor().density,
        eos.critical_density(),
        max_relative = 1e-14
    );
    let p_c = PhaseEquilibrium::vapor_pressure(&eos, 500.0 * KELVIN)?;
    assert_relative_eq!(p_c, 3370998.013445263 * PASCAL, max_relative = 1e-9);
    Ok(())
}
