mod params;

pub use params::*;

use ndarray::{Array1, ArrayView1};

use crate::{
    data::{AdultCohort, ForcingTable},
    simulator::{
        constants::*,
        equation::Equation,
        integrator::{rk4_coupled_step, rk4_step},
        output::*,
        SimulationOptions,
    },
    BodyCompError,
};

const REPORTED: &[&str] = &[
    AGE,
    ADAPTIVE_THERMOGENESIS,
    EXTRACELLULAR_FLUID,
    GLYCOGEN,
    FAT_MASS,
    LEAN_MASS,
    BODY_WEIGHT,
    BODY_MASS_INDEX,
    ENERGY_INTAKE,
];

/// Auxiliary states seen by the lean-mass equation: glycogen, adaptive thermogenesis, ECF
pub type LeanCoupling = (Array1<f64>, Array1<f64>, Array1<f64>);

/// Hall (2010) adult body-composition model
///
/// Four states per individual (adaptive thermogenesis, extracellular fluid,
/// glycogen and lean mass) driven by a change in energy intake and in sodium intake.
/// Fat mass and body weight are algebraic in the states.
///
/// # Examples
/// ```
/// use bodycomp::prelude::*;
/// use ndarray::array;
///
/// let cohort = AdultCohort::new(
///     array![80.0],
///     array![1.80],
///     array![40.0],
///     array![0.0],
///     array![1.6],
///     array![0.5],
///     array![0.5],
/// )
/// .unwrap();
/// let model = AdultModel::new(
///     cohort,
///     Initialization::EstimateAll,
///     ForcingTable::constant(366, &[-250.0]),
///     ForcingTable::zeros(366, 1),
/// )
/// .unwrap();
/// let trajectory = model.simulate(&SimulationOptions::default()).unwrap();
/// let weight = trajectory.body_weight().unwrap();
/// assert!(weight[[365, 0]] < weight[[0, 0]]);
/// ```
#[derive(Debug, Clone)]
pub struct AdultModel {
    constants: AdultConstants,
    init: Initialization,
    energy_change: ForcingTable,
    sodium_change: ForcingTable,
}

impl AdultModel {
    /// Build a model from a cohort and its intake changes.
    ///
    /// `energy_change` (kcal/day) and `sodium_change` (mg/day) hold one column per
    /// individual; row `i` is the change in force during step `i`.
    pub fn new(
        cohort: AdultCohort,
        init: Initialization,
        energy_change: ForcingTable,
        sodium_change: ForcingTable,
    ) -> Result<Self, BodyCompError> {
        let n = cohort.len();
        energy_change.expect_individuals("energy_change", n)?;
        sodium_change.expect_individuals("sodium_change", n)?;
        for table in [&energy_change, &sodium_change] {
            if table.nrows() == 0 {
                return Err(BodyCompError::ForcingOutOfBounds { index: 0, rows: 0 });
            }
        }
        let constants = AdultConstants::derive(&cohort, &init)?;
        Ok(AdultModel {
            constants,
            init,
            energy_change,
            sodium_change,
        })
    }

    pub fn constants(&self) -> &AdultConstants {
        &self.constants
    }

    pub fn initialization(&self) -> &Initialization {
        &self.init
    }

    /// Integration steps taken for `options`, bounded by the forcing rows available
    pub fn nsteps(&self, options: &SimulationOptions) -> usize {
        let requested = (options.days / options.dt).ceil() as usize;
        let available = self.energy_change.nrows().min(self.sodium_change.nrows()) - 1;
        requested.min(available)
    }

    /// Right-hand sides evaluated with step size `dt`
    pub fn rhs(&self, dt: f64) -> AdultRhs<'_> {
        AdultRhs { model: self, dt }
    }

    /// Fat mass implied by lean mass through the Forbes relation
    pub fn fat_mass(&self, lean: &Array1<f64>) -> Array1<f64> {
        let c = &self.constants;
        let exponent = (lean - c.lean()) * RHO_LEAN / (RHO_FAT * hall_c());
        c.fat() * &exponent.mapv(f64::exp)
    }
}

/// Derivatives of the adult states at a given step size
///
/// Forcing lookups use row `⌊t/dt⌋`, so every stage of a step reads the change in
/// force on that step.
pub struct AdultRhs<'a> {
    model: &'a AdultModel,
    dt: f64,
}

impl AdultRhs<'_> {
    fn energy_change(&self, t: f64) -> Result<ArrayView1<'_, f64>, BodyCompError> {
        self.model.energy_change.at(t, self.dt)
    }

    fn sodium_change(&self, t: f64) -> Result<ArrayView1<'_, f64>, BodyCompError> {
        self.model.sodium_change.at(t, self.dt)
    }

    /// Total energy intake `EI + ΔEI(t)`, kcal/day
    pub fn total_intake(&self, t: f64) -> Result<Array1<f64>, BodyCompError> {
        Ok(self.model.constants.energy_intake() + &self.energy_change(t)?)
    }

    /// Carbohydrate intake, kcal/day
    pub fn carb_intake(&self, t: f64) -> Result<Array1<f64>, BodyCompError> {
        Ok(&self.model.constants.cohort().pcarb * &self.total_intake(t)?)
    }

    /// Thermic effect of the intake change, kcal/day
    pub fn thermic_effect(&self, t: f64) -> Result<Array1<f64>, BodyCompError> {
        Ok(&self.energy_change(t)? * BETA_TEF)
    }

    /// Glycogen, kg/day
    pub fn d_glycogen(&self, t: f64, g: &Array1<f64>) -> Result<Array1<f64>, BodyCompError> {
        let c = &self.model.constants;
        Ok((self.carb_intake(t)? - &(c.kg() * &(g * g))) / RHO_GLYCOGEN)
    }

    /// Adaptive thermogenesis, kcal/day²
    pub fn d_adaptive_thermogenesis(
        &self,
        t: f64,
        at: &Array1<f64>,
    ) -> Result<Array1<f64>, BodyCompError> {
        Ok((&self.energy_change(t)? * BETA_AT - at) * (1.0 / TAU_AT))
    }

    /// Extracellular fluid, L/day
    pub fn d_extracellular_fluid(
        &self,
        t: f64,
        ecf: &Array1<f64>,
    ) -> Result<Array1<f64>, BodyCompError> {
        let c = &self.model.constants;
        let retention = (ecf - c.extracellular_fluid()) * ZETA_NA;
        let carb_response = (1.0 - self.carb_intake(t)? / c.carb_intake()) * ZETA_CI;
        Ok((&self.sodium_change(t)? - &retention - &carb_response) / SODIUM_CONCENTRATION)
    }

    /// Lean mass, kg/day, with glycogen, adaptive thermogenesis and ECF held at `aux`
    pub fn d_lean(
        &self,
        t: f64,
        lean: &Array1<f64>,
        aux: &LeanCoupling,
    ) -> Result<Array1<f64>, BodyCompError> {
        let c = &self.model.constants;
        let (g, at, ecf) = aux;
        let fat = self.model.fat_mass(lean);
        let weight = lean + &fat + ecf + &(g * GLYCOGEN_WATER);

        let balance = c.k() + &(c.delta() * &weight) + &self.thermic_effect(t)? + at
            - &self.total_intake(t)?
            + &self.d_glycogen(t, g)?;
        let numerator = balance + &(lean * GAMMA_LEAN) + &(&fat * GAMMA_FAT);
        let denominator = (&fat * alpha_fat()) + alpha_lean();
        Ok(numerator / &denominator * (hall_c() / RHO_LEAN))
    }
}

struct AdultState {
    age: Array1<f64>,
    at: Array1<f64>,
    ecf: Array1<f64>,
    g: Array1<f64>,
    lean: Array1<f64>,
    fat: Array1<f64>,
    weight: Array1<f64>,
}

impl AdultState {
    /// Index and value of the first individual with an impossible mass
    fn first_invalid(&self) -> Option<(usize, &'static str, f64)> {
        let positive = |v: &f64| v.is_finite() && *v > 0.0;
        for i in 0..self.lean.len() {
            let checks = [
                (LEAN_MASS, self.lean[i], positive(&self.lean[i])),
                (FAT_MASS, self.fat[i], positive(&self.fat[i])),
                (EXTRACELLULAR_FLUID, self.ecf[i], positive(&self.ecf[i])),
                (GLYCOGEN, self.g[i], positive(&self.g[i])),
                (ADAPTIVE_THERMOGENESIS, self.at[i], self.at[i].is_finite()),
                (BODY_WEIGHT, self.weight[i], positive(&self.weight[i])),
            ];
            if let Some((name, value, _)) = checks.into_iter().find(|(_, _, ok)| !ok) {
                return Some((i, name, value));
            }
        }
        None
    }

    fn report(&self, height: &Array1<f64>, intake: Array1<f64>) -> Vec<Array1<f64>> {
        let bmi = &self.weight / &height.mapv(|h| h.powi(2));
        vec![
            self.age.clone(),
            self.at.clone(),
            self.ecf.clone(),
            self.g.clone(),
            self.fat.clone(),
            self.lean.clone(),
            self.weight.clone(),
            bmi,
            intake,
        ]
    }
}

impl Equation for AdultModel {
    fn kind() -> ModelKind {
        ModelKind::Adult
    }

    fn nindividuals(&self) -> usize {
        self.constants.nindividuals()
    }

    fn select(&self, individuals: &[usize]) -> Self {
        AdultModel {
            constants: self.constants.select(individuals),
            init: self.init.select(individuals),
            energy_change: self.energy_change.select(individuals),
            sodium_change: self.sodium_change.select(individuals),
        }
    }

    fn simulate(&self, options: &SimulationOptions) -> Result<Trajectory, BodyCompError> {
        options.validate()?;
        let dt = options.dt;
        let nsteps = self.nsteps(options);
        let rhs = self.rhs(dt);
        let c = &self.constants;
        let height = &c.cohort().height;

        tracing::debug!(
            "Simulating {} adults for {} steps of {} days",
            self.nindividuals(),
            nsteps,
            dt
        );

        let mut state = AdultState {
            age: c.cohort().age.clone(),
            at: c.adaptive_thermogenesis().clone(),
            ecf: c.extracellular_fluid().clone(),
            g: c.glycogen().clone(),
            lean: c.lean().clone(),
            fat: self.fat_mass(c.lean()),
            weight: c.cohort().weight.clone(),
        };

        let mut out = TrajectoryAssembler::new(ModelKind::Adult, REPORTED, nsteps + 1);
        let mut t = 0.0;

        if options.check_values {
            if let Some((i, name, value)) = state.first_invalid() {
                tracing::warn!(
                    "Individual {} starts with {} = {}; returning baseline only",
                    i,
                    name,
                    value
                );
                out.push(t, state.report(height, c.energy_intake().clone()));
                return Ok(out.finish(false));
            }
        }
        out.push(t, state.report(height, c.energy_intake().clone()));

        let mut correct_values = true;
        for step in 1..=nsteps {
            let at = rk4_step(|t, y| rhs.d_adaptive_thermogenesis(t, y), t, &state.at, dt)?;
            let ecf = rk4_step(|t, y| rhs.d_extracellular_fluid(t, y), t, &state.ecf, dt)?;
            let g = rk4_step(|t, y| rhs.d_glycogen(t, y), t, &state.g, dt)?;

            let prev: LeanCoupling = (state.g, state.at, state.ecf);
            let next: LeanCoupling = (g, at, ecf);
            let lean = rk4_coupled_step(
                |t, y, aux: &LeanCoupling| rhs.d_lean(t, y, aux),
                t,
                &state.lean,
                &prev,
                &next,
                dt,
            )?;
            let (g, at, ecf) = next;

            let fat = self.fat_mass(&lean);
            let weight = &fat + &lean + &ecf + &(&g * GLYCOGEN_WATER);
            t += dt;

            state = AdultState {
                age: &state.age + dt / DAYS_PER_YEAR,
                at,
                ecf,
                g,
                lean,
                fat,
                weight,
            };

            if options.check_values {
                if let Some((i, name, value)) = state.first_invalid() {
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
            out.push(t, state.report(height, rhs.total_intake(t)?));
        }

        Ok(out.finish(correct_values))
    }
}
