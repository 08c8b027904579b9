use bodycomp::prelude::simulator::AdultConstants;
use bodycomp::prelude::*;
use bodycomp::simulator::constants::{hall_c, GLYCOGEN_WATER, RHO_FAT, RHO_LEAN};
use bodycomp::simulator::output::{
    BODY_WEIGHT, EXTRACELLULAR_FLUID, FAT_MASS, GLYCOGEN, LEAN_MASS,
};
use ndarray::{array, Array1, Array2};

const TOL: f64 = 1e-6;

#[test]
fn unperturbed_cohort_stays_at_steady_state() {
    let n = cohort().len();
    let model = AdultModel::new(
        cohort(),
        Initialization::EstimateAll,
        ForcingTable::zeros(731, n),
        ForcingTable::zeros(731, n),
    )
    .expect("model");
    let out = model
        .simulate(&SimulationOptions::default().with_days(730.0))
        .expect("simulation");

    assert!(out.correct_values());
    assert_eq!(out.nsteps(), 731);
    for name in [FAT_MASS, LEAN_MASS, EXTRACELLULAR_FLUID, GLYCOGEN, BODY_WEIGHT] {
        let series = out.get(name).expect(name);
        for step in 0..out.nsteps() {
            for i in 0..n {
                let drift = (series[[step, i]] - series[[0, i]]).abs();
                assert!(
                    drift < TOL,
                    "{} drifted by {} for individual {} at step {}",
                    name,
                    drift,
                    i,
                    step
                );
            }
        }
    }
}

#[test]
fn expenditure_identity_for_every_initialization() {
    let inits = vec![
        Initialization::EstimateAll,
        Initialization::GivenEnergy(array![2600.0, 1900.0, 2300.0, 2100.0]),
        Initialization::GivenFat(array![20.0, 24.0, 40.0, 14.0]),
        Initialization::GivenEnergyAndFat {
            energy: array![2400.0, 2000.0, 2800.0, 1800.0],
            fat: array![18.0, 26.0, 35.0, 12.0],
        },
    ];
    for init in inits {
        let constants = AdultConstants::derive(&cohort(), &init).expect("constants");
        let residual = constants.expenditure_identity_residual();
        for r in residual.iter() {
            assert!(r.abs() < 1e-8, "{:?}: residual {}", init, r);
        }
    }
}

#[test]
fn intake_above_steady_state_gains_weight() {
    // a measured intake above RMR·PAL is a surplus from day one
    let c = cohort().select_first(1);
    let steady = AdultConstants::derive(&c, &Initialization::EstimateAll)
        .expect("constants")
        .baseline_expenditure()[0];
    let model = AdultModel::new(
        c,
        Initialization::GivenEnergy(array![steady + 200.0]),
        ForcingTable::zeros(91, 1),
        ForcingTable::zeros(91, 1),
    )
    .expect("model");
    let out = model
        .simulate(&SimulationOptions::default().with_days(90.0))
        .expect("simulation");
    let weight = out.body_weight().unwrap();
    assert!(weight[[90, 0]] > weight[[0, 0]]);
}

#[test]
fn compartments_add_up_to_body_weight() {
    let n = cohort().len();
    let change = Array2::from_shape_fn((181, n), |(t, i)| {
        -100.0 * (i as f64 + 1.0) * (t as f64 / 180.0)
    });
    let model = AdultModel::new(
        cohort(),
        Initialization::EstimateAll,
        ForcingTable::new(change),
        ForcingTable::constant(181, &[0.0, 500.0, -500.0, 0.0]),
    )
    .expect("model");
    let out = model
        .simulate(&SimulationOptions::default().with_days(180.0))
        .expect("simulation");

    let fat = out.get(FAT_MASS).unwrap();
    let lean = out.get(LEAN_MASS).unwrap();
    let ecf = out.get(EXTRACELLULAR_FLUID).unwrap();
    let glycogen = out.get(GLYCOGEN).unwrap();
    let weight = out.body_weight().unwrap();
    let bmi = out.get("Body_Mass_Index").unwrap();
    let categories = out.bmi_category().unwrap();
    let height = cohort().height;

    for step in 0..out.nsteps() {
        for i in 0..n {
            let total = fat[[step, i]]
                + lean[[step, i]]
                + ecf[[step, i]]
                + GLYCOGEN_WATER * glycogen[[step, i]];
            assert!((total - weight[[step, i]]).abs() < 1e-9);
            let expected_bmi = weight[[step, i]] / height[i].powi(2);
            assert!((bmi[[step, i]] - expected_bmi).abs() < 1e-12);
            assert_eq!(categories[[step, i]], BmiCategory::classify(bmi[[step, i]]));
        }
    }
}

#[test]
fn fat_mass_follows_lean_mass_on_the_forbes_curve() {
    let n = cohort().len();
    let change = Array2::from_shape_fn((121, n), |(t, i)| {
        if t < 20 {
            -400.0
        } else {
            150.0 * i as f64 - 200.0
        }
    });
    let model = AdultModel::new(
        cohort(),
        Initialization::EstimateAll,
        ForcingTable::new(change),
        ForcingTable::constant(121, &[200.0, 0.0, -300.0, 0.0]),
    )
    .expect("model");
    let out = model
        .simulate(&SimulationOptions::default().with_days(120.0))
        .expect("simulation");
    assert!(out.correct_values());

    let constants = model.constants();
    let fat = out.get(FAT_MASS).unwrap();
    let lean = out.get(LEAN_MASS).unwrap();
    let scale = RHO_LEAN / (RHO_FAT * hall_c());
    for step in 0..out.nsteps() {
        for i in 0..n {
            let expected =
                constants.fat()[i] * ((lean[[step, i]] - constants.lean()[i]) * scale).exp();
            assert!(
                (fat[[step, i]] - expected).abs() < 1e-9 * expected,
                "individual {} at step {}: {} vs {}",
                i,
                step,
                fat[[step, i]],
                expected
            );
        }
    }
    // the forcing moved lean mass away from baseline
    assert!((lean[[120, 0]] - lean[[0, 0]]).abs() > 0.05);
}

#[test]
fn sodium_load_expands_extracellular_fluid() {
    let model = AdultModel::new(
        cohort().select_first(1),
        Initialization::EstimateAll,
        ForcingTable::zeros(31, 1),
        ForcingTable::constant(31, &[1000.0]),
    )
    .expect("model");
    let out = model
        .simulate(&SimulationOptions::default().with_days(30.0))
        .expect("simulation");
    let ecf = out.get(EXTRACELLULAR_FLUID).unwrap();
    // sodium balance settles at ΔNA/ζ_Na above baseline
    assert!((ecf[[30, 0]] - ecf[[0, 0]] - 1000.0 / 3000.0).abs() < 1e-3);
}

#[test]
fn finer_steps_converge_to_the_same_trajectory() {
    let daily = simulate_deficit(1.0, 60);
    let half = simulate_deficit(0.5, 60);
    let weight_daily = daily.body_weight().unwrap();
    let weight_half = half.body_weight().unwrap();
    assert_eq!(weight_half.nrows(), 121);
    assert!((weight_daily[[60, 0]] - weight_half[[120, 0]]).abs() < 5e-3);
}

#[test]
fn csv_export_is_long_format() {
    let out = simulate_deficit(1.0, 5);
    let mut buffer = Vec::new();
    out.write_csv(&mut buffer).expect("csv");
    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Individual,Time,Age,Adaptive_Thermogenesis"));
    assert!(header.ends_with("BMI_Category,Energy_Intake,Correct_Values,Model_Type"));
    assert_eq!(lines.count(), 6);
}

fn simulate_deficit(dt: f64, days: usize) -> Trajectory {
    let rows = (days as f64 / dt) as usize + 1;
    let model = AdultModel::new(
        cohort().select_first(1),
        Initialization::EstimateAll,
        ForcingTable::constant(rows, &[-600.0]),
        ForcingTable::zeros(rows, 1),
    )
    .expect("model");
    model
        .simulate(
            &SimulationOptions::default()
                .with_dt(dt)
                .with_days(days as f64),
        )
        .expect("simulation")
}

fn cohort() -> AdultCohort {
    AdultCohort::new(
        array![80.0, 62.0, 120.0, 55.0],
        array![1.80, 1.62, 1.78, 1.70],
        array![45.0, 32.0, 50.0, 21.0],
        array![0.0, 1.0, 0.0, 1.0],
        array![1.7, 1.5, 1.4, 1.8],
        array![0.5, 0.5, 0.55, 0.45],
        array![0.5, 0.5, 0.55, 0.45],
    )
    .expect("cohort")
}

trait SelectFirst {
    fn select_first(&self, n: usize) -> Self;
}

impl SelectFirst for AdultCohort {
    fn select_first(&self, n: usize) -> Self {
        let take = |v: &Array1<f64>| v.iter().take(n).cloned().collect::<Array1<f64>>();
        AdultCohort::new(
            take(&self.weight),
            take(&self.height),
            take(&self.age),
            take(&self.sex),
            take(&self.pal),
            take(&self.pcarb_base),
            take(&self.pcarb),
        )
        .expect("cohort")
    }
}
