use ndarray::{Array1, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::{data::AdultCohort, simulator::constants::*, BodyCompError};

/// How the baseline energy intake and fat mass are obtained
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Initialization {
    /// Steady-state intake `RMR·PAL` and regression fat mass
    #[default]
    EstimateAll,
    /// Measured baseline intake, kcal/day; regression fat mass
    GivenEnergy(Array1<f64>),
    /// Measured fat mass, kg; steady-state intake
    GivenFat(Array1<f64>),
    /// Measured intake (kcal/day) and fat mass (kg)
    GivenEnergyAndFat {
        energy: Array1<f64>,
        fat: Array1<f64>,
    },
}

impl Initialization {
    pub(crate) fn select(&self, individuals: &[usize]) -> Self {
        let pick = |v: &Array1<f64>| v.select(Axis(0), individuals);
        match self {
            Initialization::EstimateAll => Initialization::EstimateAll,
            Initialization::GivenEnergy(energy) => Initialization::GivenEnergy(pick(energy)),
            Initialization::GivenFat(fat) => Initialization::GivenFat(pick(fat)),
            Initialization::GivenEnergyAndFat { energy, fat } => {
                Initialization::GivenEnergyAndFat {
                    energy: pick(energy),
                    fat: pick(fat),
                }
            }
        }
    }
}

fn given(field: &str, values: &Array1<f64>, n: usize) -> Result<Array1<f64>, BodyCompError> {
    if values.len() != n {
        return Err(BodyCompError::mismatch(field, n, values.len()));
    }
    if let Some(v) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        return Err(BodyCompError::invalid(field, v));
    }
    Ok(values.clone())
}

/// Mifflin–St Jeor resting metabolic rate, kcal/day
pub fn resting_metabolic_rate(cohort: &AdultCohort) -> Array1<f64> {
    Zip::from(&cohort.weight)
        .and(&cohort.height)
        .and(&cohort.age)
        .and(&cohort.sex)
        .map_collect(|&bw, &ht, &age, &sex| {
            let base = RMR_WEIGHT * bw + RMR_HEIGHT * ht - RMR_AGE * age;
            (base + RMR_INTERCEPT.0) * (1.0 - sex) + (base + RMR_INTERCEPT.1) * sex
        })
}

/// Silva extracellular fluid, L
pub fn extracellular_fluid(cohort: &AdultCohort) -> Array1<f64> {
    Zip::from(&cohort.weight)
        .and(&cohort.height)
        .and(&cohort.age)
        .and(&cohort.sex)
        .map_collect(|&bw, &ht, &age, &sex| {
            let male = ECF_AGE_MALE * age + ECF_HEIGHT.0 * ht + ECF_WEIGHT.0 * bw + ECF_INTERCEPT.0;
            let female = ECF_INTERCEPT.1 + ECF_HEIGHT.1 * ht + ECF_WEIGHT.1 * bw;
            male * (1.0 - sex) + female * sex
        })
}

/// Jackson regression fat mass, kg
pub fn fat_from_bmi(cohort: &AdultCohort) -> Array1<f64> {
    Zip::from(&cohort.weight)
        .and(&cohort.height)
        .and(&cohort.age)
        .and(&cohort.sex)
        .map_collect(|&bw, &ht, &age, &sex| {
            let log_bmi = (bw / ht.powi(2)).ln();
            let male = bw * (FAT_AGE * age + FAT_LOG_BMI.0 * log_bmi + FAT_INTERCEPT.0) / 100.0;
            let female = bw * (FAT_AGE * age + FAT_LOG_BMI.1 * log_bmi + FAT_INTERCEPT.1) / 100.0;
            male * (1.0 - sex) + female * sex
        })
}

/// Baseline quantities of the adult model, derived once per cohort
///
/// Everything here is fixed for the duration of a run; the integrator only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdultConstants {
    cohort: AdultCohort,
    rmr: Array1<f64>,
    steady_state: Array1<f64>,
    energy_intake: Array1<f64>,
    extracellular_fluid: Array1<f64>,
    glycogen: Array1<f64>,
    fat: Array1<f64>,
    lean: Array1<f64>,
    adaptive_thermogenesis: Array1<f64>,
    delta: Array1<f64>,
    k: Array1<f64>,
    carb_intake: Array1<f64>,
    kg: Array1<f64>,
}

impl AdultConstants {
    /// Derive the baseline state and energy-balance constants of a cohort.
    ///
    /// `K` is solved from the steady-state expenditure `RMR·PAL`, so
    /// `K + γ_L·L₀ + γ_F·F₀ + δ·BW₀ = RMR·PAL` for every initialization.
    pub fn derive(cohort: &AdultCohort, init: &Initialization) -> Result<Self, BodyCompError> {
        let n = cohort.len();
        let rmr = resting_metabolic_rate(cohort);
        let steady_state = &rmr * &cohort.pal;

        let (energy_intake, fat) = match init {
            Initialization::EstimateAll => (steady_state.clone(), fat_from_bmi(cohort)),
            Initialization::GivenEnergy(energy) => {
                (given("energy_intake", energy, n)?, fat_from_bmi(cohort))
            }
            Initialization::GivenFat(fat) => (steady_state.clone(), given("fat", fat, n)?),
            Initialization::GivenEnergyAndFat { energy, fat } => {
                (given("energy_intake", energy, n)?, given("fat", fat, n)?)
            }
        };

        let extracellular_fluid = extracellular_fluid(cohort);
        let glycogen = Array1::from_elem(n, GLYCOGEN_BASELINE);
        let lean = &cohort.weight
            - &(&extracellular_fluid + &fat + GLYCOGEN_WATER * GLYCOGEN_BASELINE);

        let delta = (cohort.pal.mapv(|pal| (1.0 - BETA_TEF) * pal - 1.0) * &rmr) / &cohort.weight;
        let k = &steady_state
            - &(&lean * GAMMA_LEAN)
            - &(&fat * GAMMA_FAT)
            - &(&delta * &cohort.weight);

        let carb_intake = &cohort.pcarb_base * &energy_intake;
        let kg = &carb_intake / &glycogen.mapv(|g| g.powi(2));

        let constants = AdultConstants {
            cohort: cohort.clone(),
            rmr,
            steady_state,
            energy_intake,
            extracellular_fluid,
            glycogen,
            fat,
            lean,
            adaptive_thermogenesis: Array1::zeros(n),
            delta,
            k,
            carb_intake,
            kg,
        };
        tracing::debug!("Derived adult constants for {} individuals", n);
        Ok(constants)
    }

    pub fn cohort(&self) -> &AdultCohort {
        &self.cohort
    }

    pub fn nindividuals(&self) -> usize {
        self.cohort.len()
    }

    /// Resting metabolic rate, kcal/day
    pub fn rmr(&self) -> &Array1<f64> {
        &self.rmr
    }

    /// Steady-state expenditure `RMR·PAL`, kcal/day
    pub fn baseline_expenditure(&self) -> &Array1<f64> {
        &self.steady_state
    }

    /// Baseline energy intake, kcal/day
    pub fn energy_intake(&self) -> &Array1<f64> {
        &self.energy_intake
    }

    pub fn extracellular_fluid(&self) -> &Array1<f64> {
        &self.extracellular_fluid
    }

    pub fn glycogen(&self) -> &Array1<f64> {
        &self.glycogen
    }

    pub fn fat(&self) -> &Array1<f64> {
        &self.fat
    }

    pub fn lean(&self) -> &Array1<f64> {
        &self.lean
    }

    pub fn adaptive_thermogenesis(&self) -> &Array1<f64> {
        &self.adaptive_thermogenesis
    }

    /// Physical-activity cost per kg, kcal/kg/day
    pub fn delta(&self) -> &Array1<f64> {
        &self.delta
    }

    /// Energy-balance intercept, kcal/day
    pub fn k(&self) -> &Array1<f64> {
        &self.k
    }

    /// Baseline carbohydrate intake, kcal/day
    pub fn carb_intake(&self) -> &Array1<f64> {
        &self.carb_intake
    }

    /// Glycogen oxidation constant
    pub fn kg(&self) -> &Array1<f64> {
        &self.kg
    }

    /// `K + γ_L·L₀ + γ_F·F₀ + δ·BW₀ − RMR·PAL`, zero up to rounding
    pub fn expenditure_identity_residual(&self) -> Array1<f64> {
        &self.k + &(&self.lean * GAMMA_LEAN) + &(&self.fat * GAMMA_FAT)
            + &(&self.delta * &self.cohort.weight)
            - &self.steady_state
    }

    pub(crate) fn select(&self, individuals: &[usize]) -> Self {
        let pick = |v: &Array1<f64>| v.select(Axis(0), individuals);
        AdultConstants {
            cohort: self.cohort.select(individuals),
            rmr: pick(&self.rmr),
            steady_state: pick(&self.steady_state),
            energy_intake: pick(&self.energy_intake),
            extracellular_fluid: pick(&self.extracellular_fluid),
            glycogen: pick(&self.glycogen),
            fat: pick(&self.fat),
            lean: pick(&self.lean),
            adaptive_thermogenesis: pick(&self.adaptive_thermogenesis),
            delta: pick(&self.delta),
            k: pick(&self.k),
            carb_intake: pick(&self.carb_intake),
            kg: pick(&self.kg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn cohort() -> AdultCohort {
        AdultCohort::new(
            array![80.0, 65.0],
            array![1.80, 1.65],
            array![40.0, 30.0],
            array![0.0, 1.0],
            array![1.6, 1.5],
            array![0.5, 0.5],
            array![0.5, 0.5],
        )
        .unwrap()
    }

    #[test]
    fn mifflin_st_jeor_by_sex() {
        let rmr = resting_metabolic_rate(&cohort());
        assert_relative_eq!(rmr[0], 9.99 * 80.0 + 625.0 * 1.80 - 4.92 * 40.0 + 5.0, epsilon = 1e-9);
        assert_relative_eq!(
            rmr[1],
            9.99 * 65.0 + 625.0 * 1.65 - 4.92 * 30.0 - 161.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn extracellular_fluid_by_sex() {
        let ecf = extracellular_fluid(&cohort());
        assert_relative_eq!(
            ecf[0],
            0.025 * 40.0 + 9.57 * 1.80 + 0.191 * 80.0 - 12.4,
            epsilon = 1e-12
        );
        assert_relative_eq!(ecf[1], -4.0 + 5.98 * 1.65 + 0.167 * 65.0, epsilon = 1e-12);
    }

    #[test]
    fn compartments_sum_to_body_weight() {
        let c = AdultConstants::derive(&cohort(), &Initialization::EstimateAll).unwrap();
        let total = c.lean() + c.fat() + c.extracellular_fluid() + &(c.glycogen() * GLYCOGEN_WATER);
        for (t, w) in total.iter().zip(c.cohort().weight.iter()) {
            assert_relative_eq!(*t, *w, epsilon = 1e-9);
        }
        assert_eq!(c.adaptive_thermogenesis(), &array![0.0, 0.0]);
    }

    #[test]
    fn expenditure_identity_holds_for_every_initialization() {
        let inits = [
            Initialization::EstimateAll,
            Initialization::GivenEnergy(array![2200.0, 1800.0]),
            Initialization::GivenFat(array![18.0, 20.0]),
            Initialization::GivenEnergyAndFat {
                energy: array![2500.0, 2100.0],
                fat: array![15.0, 22.0],
            },
        ];
        for init in inits.iter() {
            let c = AdultConstants::derive(&cohort(), init).unwrap();
            for r in c.expenditure_identity_residual().iter() {
                assert!(r.abs() < 1e-8, "{:?}: residual {}", init, r);
            }
        }
    }

    #[test]
    fn given_values_are_used_verbatim() {
        let c = AdultConstants::derive(
            &cohort(),
            &Initialization::GivenEnergyAndFat {
                energy: array![2500.0, 2100.0],
                fat: array![15.0, 22.0],
            },
        )
        .unwrap();
        assert_eq!(c.energy_intake(), &array![2500.0, 2100.0]);
        assert_eq!(c.fat(), &array![15.0, 22.0]);
        assert_eq!(c.carb_intake(), &array![1250.0, 1050.0]);
        assert_eq!(c.kg(), &array![5000.0, 4200.0]);
    }

    #[test]
    fn given_vectors_must_match_cohort() {
        let result = AdultConstants::derive(&cohort(), &Initialization::GivenFat(array![18.0]));
        assert!(matches!(
            result,
            Err(BodyCompError::DimensionMismatch { expected: 2, found: 1, .. })
        ));
        let result =
            AdultConstants::derive(&cohort(), &Initialization::GivenEnergy(array![2000.0, -1.0]));
        assert!(matches!(result, Err(BodyCompError::InvalidParameter { .. })));
    }
}
