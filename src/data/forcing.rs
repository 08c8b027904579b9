use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::BodyCompError;

/// Tolerance, in steps, absorbed when mapping a clock value to a forcing row.
///
/// The integrator clock is accumulated by repeated `t += dt`, so `t/dt` can land a
/// few ulps below an integer.
const STEP_TOLERANCE: f64 = 1e-9;

/// Index of the forcing row that is active at time `t` for a step size `dt`, `⌊t/dt⌋`.
#[inline(always)]
pub fn step_index(t: f64, dt: f64) -> usize {
    let steps = t / dt + STEP_TOLERANCE;
    if steps <= 0.0 {
        0
    } else {
        steps.floor() as usize
    }
}

/// Time-varying exogenous input for a cohort
///
/// Rows are integration steps and columns are individuals, so row `i` holds the
/// value in force on `[i·dt, (i+1)·dt)` for every member of the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcingTable {
    values: Array2<f64>,
}

impl ForcingTable {
    /// Wrap a steps × individuals matrix
    pub fn new(values: Array2<f64>) -> Self {
        ForcingTable { values }
    }

    /// A table of `rows` steps with no change for any of `individuals`
    pub fn zeros(rows: usize, individuals: usize) -> Self {
        ForcingTable {
            values: Array2::zeros((rows, individuals)),
        }
    }

    /// A table holding the same value at every step, one value per individual
    pub fn constant(rows: usize, values: &[f64]) -> Self {
        let mut table = Array2::zeros((rows, values.len()));
        for mut row in table.axis_iter_mut(Axis(0)) {
            row.assign(&ArrayView1::from(values));
        }
        ForcingTable { values: table }
    }

    /// Number of steps held by the table
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of individuals (columns)
    pub fn nindividuals(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }

    /// The cohort vector stored at row `index`
    pub fn row(&self, index: usize) -> Result<ArrayView1<'_, f64>, BodyCompError> {
        if index >= self.values.nrows() {
            return Err(BodyCompError::ForcingOutOfBounds {
                index,
                rows: self.values.nrows(),
            });
        }
        Ok(self.values.row(index))
    }

    /// The cohort vector in force at time `t`
    #[inline]
    pub fn at(&self, t: f64, dt: f64) -> Result<ArrayView1<'_, f64>, BodyCompError> {
        self.row(step_index(t, dt))
    }

    /// Fail unless the table has one column per individual
    pub(crate) fn expect_individuals(
        &self,
        field: &str,
        individuals: usize,
    ) -> Result<(), BodyCompError> {
        if self.nindividuals() != individuals {
            return Err(BodyCompError::mismatch(
                field,
                individuals,
                self.nindividuals(),
            ));
        }
        Ok(())
    }

    /// Keep only the listed individuals, in the given order
    pub(crate) fn select(&self, individuals: &[usize]) -> Self {
        ForcingTable {
            values: self.values.select(Axis(1), individuals),
        }
    }
}

impl From<Array2<f64>> for ForcingTable {
    fn from(values: Array2<f64>) -> Self {
        ForcingTable::new(values)
    }
}
