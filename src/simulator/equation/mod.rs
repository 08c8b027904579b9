pub mod adult;
pub mod child;

pub use adult::*;
pub use child::*;

use rayon::prelude::*;

use crate::{
    simulator::{ModelKind, SimulationOptions, Trajectory},
    BodyCompError,
};

/// A cohort model that can be integrated forward in time.
///
/// Individuals never interact, so a model can be split into sub-cohorts with
/// [Equation::select] and the pieces simulated independently.
pub trait Equation: Sized + Sync {
    fn kind() -> ModelKind;

    /// Number of individuals in the cohort
    fn nindividuals(&self) -> usize;

    /// The same model restricted to the listed individuals, in the given order
    fn select(&self, individuals: &[usize]) -> Self;

    /// Integrate the whole cohort
    ///
    /// # Parameters
    /// - `options`: step size, horizon and whether to stop on invalid masses
    ///
    /// # Returns
    /// The trajectory from baseline to the last valid step
    fn simulate(&self, options: &SimulationOptions) -> Result<Trajectory, BodyCompError>;

    /// Integrate the cohort in chunks of at most `batch_size` individuals, in parallel.
    ///
    /// Chunks are joined with [Trajectory::concat]; the values equal those of
    /// [Equation::simulate] on the whole cohort.
    fn simulate_batched(
        &self,
        options: &SimulationOptions,
        batch_size: usize,
    ) -> Result<Trajectory, BodyCompError> {
        if batch_size == 0 {
            return Err(BodyCompError::invalid("batch_size", batch_size));
        }
        let n = self.nindividuals();
        if batch_size >= n {
            return self.simulate(options);
        }

        let individuals: Vec<usize> = (0..n).collect();
        let parts = individuals
            .par_chunks(batch_size)
            .map(|chunk| self.select(chunk).simulate(options))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Simulated {} individuals in {} batches", n, parts.len());
        Trajectory::concat(parts)
    }
}
