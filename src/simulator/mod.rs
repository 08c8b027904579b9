pub mod constants;
pub mod equation;
pub mod integrator;
pub mod output;

use serde::{Deserialize, Serialize};

use crate::BodyCompError;

pub use output::{BmiCategory, ModelKind, Series, Trajectory};

/// Options controlling a simulation run
///
/// # Examples
/// ```
/// use bodycomp::SimulationOptions;
///
/// let options = SimulationOptions::default()
///     .with_days(730.0)
///     .with_dt(0.5)
///     .with_check_values(false);
/// assert_eq!(options.dt, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Integration step, days
    pub dt: f64,
    /// Simulated horizon, days
    pub days: f64,
    /// Stop at the first step producing a non-finite or non-positive mass
    pub check_values: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            dt: 1.0,
            days: 365.0,
            check_values: true,
        }
    }
}

impl SimulationOptions {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_days(mut self, days: f64) -> Self {
        self.days = days;
        self
    }

    pub fn with_check_values(mut self, check_values: bool) -> Self {
        self.check_values = check_values;
        self
    }

    pub fn validate(&self) -> Result<(), BodyCompError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(BodyCompError::invalid("dt", self.dt));
        }
        if !(self.days.is_finite() && self.days >= 0.0) {
            return Err(BodyCompError::invalid("days", self.days));
        }
        Ok(())
    }
}
