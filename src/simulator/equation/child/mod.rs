mod params;

pub use params::*;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    data::{reference::ReferenceCurves, step_index, ChildCohort, ForcingTable},
    simulator::{
        constants::DAYS_PER_YEAR, equation::Equation, integrator::rk4_step, output::*,
        SimulationOptions,
    },
    BodyCompError,
};

const REPORTED: &[&str] = &[AGE, FAT_FREE_MASS, FAT_MASS, BODY_WEIGHT, ENERGY_INTAKE];

/// Energy intake of a child cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChildIntake {
    /// kcal/day by step since baseline, one column per child
    Table(ForcingTable),
    /// The same curve of age for every child
    Logistic(GeneralizedLogistic),
}

/// Hall et al. (2013) child growth and body-composition model
///
/// Two states per child, fat-free mass and fat mass. The clock `t` counts days
/// since baseline and every age-dependent term is evaluated at `age₀ + t/365`.
///
/// # Examples
/// ```
/// use bodycomp::prelude::*;
/// use ndarray::array;
///
/// let cohort = ChildCohort::new(array![6.0], array![1.0], array![16.3], array![3.2]).unwrap();
/// let reference = ChildModel::new(cohort.clone(), ChildIntake::Table(ForcingTable::zeros(1, 1)))
///     .unwrap()
///     .intake_reference(365);
/// let model = ChildModel::new(cohort, ChildIntake::Table(reference)).unwrap();
/// let trajectory = model.simulate(&SimulationOptions::default()).unwrap();
/// assert_eq!(trajectory.nsteps(), 366);
/// ```
#[derive(Debug, Clone)]
pub struct ChildModel {
    cohort: ChildCohort,
    parameters: Vec<ChildParameters>,
    intake: ChildIntake,
}

impl ChildModel {
    pub fn new(cohort: ChildCohort, intake: ChildIntake) -> Result<Self, BodyCompError> {
        if let ChildIntake::Table(table) = &intake {
            table.expect_individuals("intake", cohort.len())?;
        }
        let parameters = cohort.sex.iter().map(|&s| ChildParameters::new(s)).collect();
        tracing::debug!("Built child model for {} individuals", cohort.len());
        Ok(ChildModel {
            cohort,
            parameters,
            intake,
        })
    }

    pub fn cohort(&self) -> &ChildCohort {
        &self.cohort
    }

    pub fn parameters(&self) -> &[ChildParameters] {
        &self.parameters
    }

    pub fn intake_mode(&self) -> &ChildIntake {
        &self.intake
    }

    /// Integration steps taken for `options`, `⌊days/dt⌋`
    pub fn nsteps(&self, options: &SimulationOptions) -> usize {
        step_index(options.days, options.dt)
    }

    /// Age of every child `t` days after baseline, years
    pub fn age_at(&self, t: f64) -> Array1<f64> {
        &self.cohort.age + t / DAYS_PER_YEAR
    }

    /// Energy intake at `t` days after baseline, kcal/day
    pub fn intake(&self, t: f64, dt: f64) -> Result<Array1<f64>, BodyCompError> {
        match &self.intake {
            ChildIntake::Table(table) => Ok(table.at(t, dt)?.to_owned()),
            ChildIntake::Logistic(curve) => Ok(self.age_at(t).mapv(|age| curve.value(age))),
        }
    }

    /// Reference-child intake for each day `0..=days` after baseline
    pub fn intake_reference(&self, days: usize) -> ForcingTable {
        let mut values = Array2::zeros((days + 1, self.parameters.len()));
        for (day, mut row) in values.axis_iter_mut(Axis(0)).enumerate() {
            for ((cell, p), age) in row
                .iter_mut()
                .zip(&self.parameters)
                .zip(self.age_at(day as f64).iter())
            {
                *cell = p.reference_intake(*age);
            }
        }
        ForcingTable::new(values)
    }

    /// Reference fat-free mass and fat mass at the baseline ages, kg
    pub fn mass_reference(&self) -> (Array1<f64>, Array1<f64>) {
        (
            ReferenceCurves::ffm(&self.cohort.age, &self.cohort.sex),
            ReferenceCurves::fm(&self.cohort.age, &self.cohort.sex),
        )
    }

    /// Growth-dynamics curve evaluated at `age`
    pub fn growth(&self, age: &Array1<f64>) -> Result<Array1<f64>, BodyCompError> {
        self.per_child("age", age, |p, a| p.growth.value(a))
    }

    /// Alternate growth-impact curve evaluated at `age`
    pub fn growth_impact(&self, age: &Array1<f64>) -> Result<Array1<f64>, BodyCompError> {
        self.per_child("age", age, |p, a| p.growth_impact.value(a))
    }

    /// Energy-balance impact curve evaluated at `age`
    pub fn energy_balance(&self, age: &Array1<f64>) -> Result<Array1<f64>, BodyCompError> {
        self.per_child("age", age, |p, a| p.energy_balance.value(a))
    }

    fn per_child<F>(
        &self,
        field: &str,
        values: &Array1<f64>,
        f: F,
    ) -> Result<Array1<f64>, BodyCompError>
    where
        F: Fn(&ChildParameters, f64) -> f64,
    {
        if values.len() != self.parameters.len() {
            return Err(BodyCompError::mismatch(
                field,
                self.parameters.len(),
                values.len(),
            ));
        }
        Ok(self
            .parameters
            .iter()
            .zip(values.iter())
            .map(|(p, &v)| f(p, v))
            .collect())
    }

    /// `d/dt` of the 2 × N state `[FFM; FM]`, kg/day
    pub fn derivatives(
        &self,
        t: f64,
        dt: f64,
        state: &Array2<f64>,
    ) -> Result<Array2<f64>, BodyCompError> {
        let intake = self.intake(t, dt)?;
        let age = self.age_at(t);
        let mut rates = Array2::zeros(state.raw_dim());
        for (i, p) in self.parameters.iter().enumerate() {
            let (dffm, dfm) = p.rates(age[i], intake[i], state[[0, i]], state[[1, i]]);
            rates[[0, i]] = dffm;
            rates[[1, i]] = dfm;
        }
        Ok(rates)
    }
}

fn first_invalid(state: &Array2<f64>) -> Option<(usize, &'static str, f64)> {
    for (i, column) in state.axis_iter(Axis(1)).enumerate() {
        for (name, &value) in [FAT_FREE_MASS, FAT_MASS].into_iter().zip(column.iter()) {
            if !(value.is_finite() && value > 0.0) {
                return Some((i, name, value));
            }
        }
    }
    None
}

fn report(age: Array1<f64>, state: &Array2<f64>, intake: Array1<f64>) -> Vec<Array1<f64>> {
    let ffm = state.row(0).to_owned();
    let fm = state.row(1).to_owned();
    let weight = &ffm + &fm;
    vec![age, ffm, fm, weight, intake]
}

impl Equation for ChildModel {
    fn kind() -> ModelKind {
        ModelKind::Child
    }

    fn nindividuals(&self) -> usize {
        self.cohort.len()
    }

    fn select(&self, individuals: &[usize]) -> Self {
        let intake = match &self.intake {
            ChildIntake::Table(table) => ChildIntake::Table(table.select(individuals)),
            ChildIntake::Logistic(curve) => ChildIntake::Logistic(*curve),
        };
        ChildModel {
            cohort: self.cohort.select(individuals),
            parameters: individuals
                .iter()
                .map(|&i| self.parameters[i].clone())
                .collect(),
            intake,
        }
    }

    fn simulate(&self, options: &SimulationOptions) -> Result<Trajectory, BodyCompError> {
        options.validate()?;
        let dt = options.dt;
        let nsteps = self.nsteps(options);
        if let ChildIntake::Table(table) = &self.intake {
            if table.nrows() < nsteps + 1 {
                return Err(BodyCompError::ForcingOutOfBounds {
                    index: nsteps,
                    rows: table.nrows(),
                });
            }
        }

        tracing::debug!(
            "Simulating {} children for {} steps of {} days",
            self.nindividuals(),
            nsteps,
            dt
        );

        let n = self.nindividuals();
        let mut state = Array2::zeros((2, n));
        state.row_mut(0).assign(&self.cohort.ffm);
        state.row_mut(1).assign(&self.cohort.fm);

        let mut out = TrajectoryAssembler::new(ModelKind::Child, REPORTED, nsteps + 1);
        let mut t = 0.0;
        out.push(t, report(self.age_at(t), &state, self.intake(t, dt)?));

        if options.check_values {
            if let Some((i, name, value)) = first_invalid(&state) {
                tracing::warn!(
                    "Individual {} starts with {} = {}; returning baseline only",
                    i,
                    name,
                    value
                );
                return Ok(out.finish(false));
            }
        }

        let mut correct_values = true;
        for step in 1..=nsteps {
            let next = rk4_step(|t, y| self.derivatives(t, dt, y), t, &state, dt)?;
            if options.check_values {
                if let Some((i, name, value)) = first_invalid(&next) {
                    tracing::warn!(
                        "Individual {} reached {} = {} at step {}; stopping early",
                        i,
                        name,
                        value,
                        step
                    );
                    correct_values = false;
                    break;
                }
            }
            state = next;
            t += dt;
            out.push(t, report(self.age_at(t), &state, self.intake(t, dt)?));
        }

        Ok(out.finish(correct_values))
    }
}
