//! Dense per-day forcing from sparse intake measurements
//!
//! Intake is usually measured on a handful of days. [ForcingBuilder] expands such
//! measurements into one value per day, which is the layout the models consume.

use std::{fmt, str::FromStr};

use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{data::forcing::ForcingTable, BodyCompError};

/// Method used to fill the days between two measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Straight line between consecutive measurements
    Linear,
    /// Value of the earlier measurement carried forward, `[tⱼ, tⱼ₊₁)`
    StepwiseLeft,
    /// Value of the later measurement carried backward, `(tⱼ, tⱼ₊₁]`
    StepwiseRight,
    /// Straight line in log space
    Exponential,
    /// `1000·ln` ramp, fast early change that levels off
    Logarithmic,
    /// Brownian bridge pinned at both measurements
    Brownian,
}

impl FromStr for Interpolation {
    type Err = BodyCompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Linear" => Ok(Interpolation::Linear),
            "Stepwise_L" => Ok(Interpolation::StepwiseLeft),
            "Stepwise_R" => Ok(Interpolation::StepwiseRight),
            "Exponential" => Ok(Interpolation::Exponential),
            "Logarithmic" => Ok(Interpolation::Logarithmic),
            "Brownian" => Ok(Interpolation::Brownian),
            other => Err(BodyCompError::UnsupportedInterpolation(other.to_string())),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interpolation::Linear => "Linear",
            Interpolation::StepwiseLeft => "Stepwise_L",
            Interpolation::StepwiseRight => "Stepwise_R",
            Interpolation::Exponential => "Exponential",
            Interpolation::Logarithmic => "Logarithmic",
            Interpolation::Brownian => "Brownian",
        };
        write!(f, "{}", name)
    }
}

/// Value at day `x` of a deterministic segment between `(t0, e0)` and `(t1, e1)`
#[inline]
fn segment_value(mode: Interpolation, e0: f64, e1: f64, t0: f64, t1: f64, x: f64) -> f64 {
    match mode {
        Interpolation::Linear => (e1 - e0) / (t1 - t0) * (x - t0) + e0,
        Interpolation::StepwiseLeft => e0,
        Interpolation::StepwiseRight => {
            if x == t0 {
                e0
            } else {
                e1
            }
        }
        Interpolation::Exponential => ((e1.ln() - e0.ln()) / (t1 - t0) * (x - t0) + e0.ln()).exp(),
        Interpolation::Logarithmic => {
            1000.0 * ((((e1 - e0) / 1000.0).exp() - 1.0) / (t1 - t0) * (x - t0) + 1.0).ln() + e0
        }
        Interpolation::Brownian => unreachable!("Brownian segments are sampled, not evaluated"),
    }
}

/// Expands sparse intake measurements into a per-day [ForcingTable]
///
/// # Example
///
/// ```
/// use bodycomp::prelude::*;
/// use ndarray::array;
///
/// // Two individuals measured on days 0, 10 and 30
/// let measured = array![[2000.0, 1800.0, 1800.0], [2500.0, 2500.0, 2200.0]];
/// let builder = ForcingBuilder::new(measured, vec![0.0, 10.0, 30.0]).unwrap();
/// let table = builder.build(Interpolation::Linear).unwrap();
///
/// assert_eq!(table.nrows(), 31);
/// assert_eq!(table.row(10).unwrap()[0], 1800.0);
/// ```
#[derive(Debug, Clone)]
pub struct ForcingBuilder {
    /// Individuals × measurement times
    measurements: Array2<f64>,
    breakpoints: Vec<f64>,
}

impl ForcingBuilder {
    /// # Arguments
    ///
    /// * `measurements` - One row per individual, one column per measurement time
    /// * `breakpoints` - Measurement days; the first must be 0 and the sequence strictly increasing
    pub fn new(measurements: Array2<f64>, breakpoints: Vec<f64>) -> Result<Self, BodyCompError> {
        if breakpoints.len() < 2 {
            return Err(BodyCompError::InvalidBreakpoints {
                reason: format!("need at least 2 breakpoints, got {}", breakpoints.len()),
            });
        }
        if breakpoints[0] != 0.0 {
            return Err(BodyCompError::InvalidBreakpoints {
                reason: format!("first breakpoint must be 0, got {}", breakpoints[0]),
            });
        }
        if let Some(w) = breakpoints
            .windows(2)
            .find(|w| !(w[1].is_finite() && w[1] > w[0]))
        {
            return Err(BodyCompError::InvalidBreakpoints {
                reason: format!("breakpoints must increase strictly, got {} then {}", w[0], w[1]),
            });
        }
        if measurements.ncols() != breakpoints.len() {
            return Err(BodyCompError::mismatch(
                "measurements",
                breakpoints.len(),
                measurements.ncols(),
            ));
        }
        Ok(ForcingBuilder {
            measurements,
            breakpoints,
        })
    }

    /// Number of days covered, the floor of the last breakpoint
    pub fn days(&self) -> usize {
        self.breakpoints[self.breakpoints.len() - 1].floor() as usize
    }

    pub fn nindividuals(&self) -> usize {
        self.measurements.nrows()
    }

    /// Build the table with the thread-local random generator for [Interpolation::Brownian]
    pub fn build(&self, mode: Interpolation) -> Result<ForcingTable, BodyCompError> {
        self.build_with_rng(mode, &mut rand::rng())
    }

    /// Build the table, drawing Brownian increments from `rng`
    ///
    /// The result has `days() + 1` rows. Its last row always equals the last
    /// measured column.
    pub fn build_with_rng<R: Rng + ?Sized>(
        &self,
        mode: Interpolation,
        rng: &mut R,
    ) -> Result<ForcingTable, BodyCompError> {
        if mode == Interpolation::Exponential {
            if let Some(v) = self
                .measurements
                .iter()
                .find(|v| !(v.is_finite() && **v > 0.0))
            {
                return Err(BodyCompError::invalid(
                    "measurements (exponential interpolation)",
                    v,
                ));
            }
        }

        let days = self.days();
        let mut values = Array2::<f64>::zeros((days + 1, self.nindividuals()));

        match mode {
            Interpolation::Brownian => self.fill_brownian(&mut values, rng),
            _ => self.fill_deterministic(&mut values, mode, days),
        }

        let last = self.measurements.column(self.measurements.ncols() - 1);
        values.row_mut(days).assign(&last);
        tracing::debug!(
            mode = %mode,
            days,
            individuals = self.nindividuals(),
            "built forcing table"
        );
        Ok(ForcingTable::new(values))
    }

    fn fill_deterministic(&self, values: &mut Array2<f64>, mode: Interpolation, days: usize) {
        let bp = &self.breakpoints;
        let mut j = 0;
        for i in 0..days {
            let x = i as f64;
            let (t0, t1) = (bp[j], bp[j + 1]);
            let e0 = self.measurements.column(j);
            let e1 = self.measurements.column(j + 1);
            Zip::from(values.row_mut(i))
                .and(e0)
                .and(e1)
                .for_each(|v, &a, &b| *v = segment_value(mode, a, b, t0, t1, x));

            while j + 2 < bp.len() && x + 1.0 >= bp[j + 1] {
                j += 1;
            }
        }
    }

    /// Each segment is an independent bridge from `eⱼ` at `⌊tⱼ⌋` to `eⱼ₊₁` at `⌊tⱼ₊₁⌋`.
    ///
    /// Segments shorter than a day collapse onto one row; that row keeps the
    /// earliest measurement mapped to it and the next bridge starts from there.
    fn fill_brownian<R: Rng + ?Sized>(&self, values: &mut Array2<f64>, rng: &mut R) {
        let n = self.nindividuals();
        let mut anchor = (0, self.measurements.column(0).to_owned());
        for j in 0..self.breakpoints.len() - 1 {
            let start = self.breakpoints[j].floor() as usize;
            let end = self.breakpoints[j + 1].floor() as usize;
            if end == start {
                continue;
            }
            let span = (end - start) as f64;
            let e0 = if anchor.0 == start {
                anchor.1.clone()
            } else {
                self.measurements.column(j).to_owned()
            };
            let e1 = self.measurements.column(j + 1);

            let mut path = Array2::<f64>::zeros((end - start + 1, n));
            for m in 1..=end - start {
                let step: Array1<f64> = (0..n)
                    .map(|_| rng.sample::<f64, _>(StandardNormal))
                    .collect();
                let next = &path.row(m - 1) + &step;
                path.row_mut(m).assign(&next);
            }
            let terminal: ArrayView1<f64> = path.row(end - start);

            for m in 0..=end - start {
                let frac = m as f64 / span;
                Zip::from(values.row_mut(start + m))
                    .and(&e0)
                    .and(e1)
                    .and(path.row(m))
                    .and(terminal)
                    .for_each(|v, &a, &b, &w, &w_end| {
                        let noise = w - frac * w_end;
                        *v = (a * (1.0 - frac) + b * frac) + noise;
                    });
            }
            anchor = (end, e1.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn builder() -> ForcingBuilder {
        ForcingBuilder::new(
            array![[2000.0, 1500.0, 1800.0], [2500.0, 2600.0, 2100.0]],
            vec![0.0, 4.0, 10.0],
        )
        .unwrap()
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(
            "Stepwise_L".parse::<Interpolation>().unwrap(),
            Interpolation::StepwiseLeft
        );
        assert_eq!(
            "Brownian".parse::<Interpolation>().unwrap(),
            Interpolation::Brownian
        );
        assert_eq!(Interpolation::StepwiseRight.to_string(), "Stepwise_R");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        match "Cubic".parse::<Interpolation>() {
            Err(BodyCompError::UnsupportedInterpolation(mode)) => assert_eq!(mode, "Cubic"),
            other => panic!("expected unsupported mode, got {:?}", other),
        }
    }

    #[test]
    fn breakpoints_must_start_at_zero() {
        let result = ForcingBuilder::new(array![[1.0, 2.0]], vec![1.0, 3.0]);
        assert!(matches!(
            result,
            Err(BodyCompError::InvalidBreakpoints { .. })
        ));
    }

    #[test]
    fn breakpoints_must_increase() {
        let result = ForcingBuilder::new(array![[1.0, 2.0, 3.0]], vec![0.0, 3.0, 3.0]);
        assert!(matches!(
            result,
            Err(BodyCompError::InvalidBreakpoints { .. })
        ));
    }

    #[test]
    fn linear_fills_between_measurements() {
        let table = builder().build(Interpolation::Linear).unwrap();
        assert_eq!(table.nrows(), 11);
        assert_relative_eq!(table.row(2).unwrap()[0], 1750.0);
        assert_relative_eq!(table.row(7).unwrap()[1], 2350.0);
    }

    #[test]
    fn stepwise_modes_hold_values() {
        let left = builder().build(Interpolation::StepwiseLeft).unwrap();
        assert_eq!(left.row(3).unwrap()[0], 2000.0);
        assert_eq!(left.row(5).unwrap()[0], 1500.0);

        let right = builder().build(Interpolation::StepwiseRight).unwrap();
        assert_eq!(right.row(0).unwrap()[0], 2000.0);
        assert_eq!(right.row(1).unwrap()[0], 1500.0);
        assert_eq!(right.row(5).unwrap()[0], 1800.0);
    }

    #[test]
    fn exponential_rejects_non_positive_values() {
        let builder = ForcingBuilder::new(array![[0.0, 10.0]], vec![0.0, 5.0]).unwrap();
        assert!(builder.build(Interpolation::Exponential).is_err());
    }

    #[test]
    fn exponential_rejects_missing_values() {
        let builder = ForcingBuilder::new(array![[2000.0, f64::NAN]], vec![0.0, 5.0]).unwrap();
        assert!(matches!(
            builder.build(Interpolation::Exponential),
            Err(BodyCompError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn sub_day_first_segment_keeps_baseline_row() {
        // the 0.5-day measurement collapses onto row 0 with the baseline one
        let builder =
            ForcingBuilder::new(array![[2000.0, 1500.0, 1800.0]], vec![0.0, 0.5, 10.0]).unwrap();
        let linear = builder.build(Interpolation::Linear).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let brownian = builder
            .build_with_rng(Interpolation::Brownian, &mut rng)
            .unwrap();
        assert_eq!(linear.row(0).unwrap()[0], 2000.0);
        assert_eq!(brownian.row(0).unwrap()[0], 2000.0);
        assert_eq!(brownian.row(10).unwrap()[0], 1800.0);
        assert!(brownian.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn collapsed_interior_segment_keeps_earlier_measurement() {
        // 3.2 and 3.7 both land on row 3
        let builder = ForcingBuilder::new(
            array![[2000.0, 2200.0, 2600.0, 1900.0]],
            vec![0.0, 3.2, 3.7, 8.0],
        )
        .unwrap();
        let table = builder
            .build_with_rng(Interpolation::Brownian, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(table.row(0).unwrap()[0], 2000.0);
        assert_eq!(table.row(3).unwrap()[0], 2200.0);
        assert_eq!(table.row(8).unwrap()[0], 1900.0);
    }

    #[test]
    fn brownian_is_reproducible_with_seed() {
        let a = builder()
            .build_with_rng(Interpolation::Brownian, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = builder()
            .build_with_rng(Interpolation::Brownian, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.row(4).unwrap()[0], 1500.0);
    }
}
