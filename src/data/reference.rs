//! Reference-child body composition by age
//!
//! Fat-free mass and fat mass of the reference child, tabulated at annual knots
//! from 2 to 18 years as `(male, female)` pairs in kg. Values between knots are
//! linearly interpolated; ages outside the table are clamped to the nearest knot.

use ndarray::{Array1, Zip};

use crate::simulator::constants::blend;

/// Age of the first knot, years
pub const FIRST_KNOT_AGE: f64 = 2.0;

/// Number of annual knots
pub const KNOTS: usize = 17;

/// Reference fat-free mass, kg, ages 2..=18
pub const FFM_REFERENCE: [(f64, f64); KNOTS] = [
    (10.134, 9.477),
    (12.099, 11.494),
    (14.0, 13.2),
    (16.0, 14.7),
    (17.4, 16.3),
    (19.9, 18.2),
    (22.0, 20.5),
    (24.4, 23.3),
    (27.5, 26.4),
    (29.5, 28.5),
    (33.2, 32.4),
    (38.1, 36.1),
    (43.6, 38.9),
    (49.1, 40.7),
    (54.0, 41.7),
    (57.7, 42.3),
    (60.0, 42.6),
];

/// Reference fat mass, kg, ages 2..=18
pub const FM_REFERENCE: [(f64, f64); KNOTS] = [
    (2.456, 2.433),
    (2.576, 2.606),
    (2.7, 2.8),
    (2.7, 2.9),
    (2.8, 3.2),
    (2.9, 3.7),
    (3.3, 4.3),
    (3.7, 5.2),
    (4.8, 7.2),
    (5.9, 8.5),
    (6.7, 9.2),
    (7.0, 10.0),
    (7.2, 11.3),
    (7.5, 12.8),
    (8.0, 14.0),
    (8.4, 14.3),
    (8.8, 14.3),
];

/// Piecewise-linear lookup into knots spaced one unit apart starting at `first`.
///
/// `x` is clamped to `[first, first + knots.len() - 1]`.
pub fn interpolate_knots(knots: &[f64], first: f64, x: f64) -> f64 {
    let last = knots.len() - 1;
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= first + last as f64 {
        return knots[last];
    }
    if x <= first {
        return knots[0];
    }
    let whole = x.floor();
    let j = (whole - first) as usize;
    let frac = x - whole;
    knots[j] + frac * (knots[j + 1] - knots[j])
}

/// Sex-blended knot values for one individual
pub(crate) fn blended(table: &[(f64, f64); KNOTS], sex: f64) -> [f64; KNOTS] {
    table.map(|pair| blend(pair, sex))
}

/// Reference body-composition curves evaluated elementwise over a cohort
pub struct ReferenceCurves;

impl ReferenceCurves {
    /// Reference fat-free mass, kg, at `age` (years)
    pub fn ffm(age: &Array1<f64>, sex: &Array1<f64>) -> Array1<f64> {
        Self::evaluate(&FFM_REFERENCE, age, sex)
    }

    /// Reference fat mass, kg, at `age` (years)
    pub fn fm(age: &Array1<f64>, sex: &Array1<f64>) -> Array1<f64> {
        Self::evaluate(&FM_REFERENCE, age, sex)
    }

    fn evaluate(
        table: &[(f64, f64); KNOTS],
        age: &Array1<f64>,
        sex: &Array1<f64>,
    ) -> Array1<f64> {
        Zip::from(age)
            .and(sex)
            .map_collect(|&a, &s| interpolate_knots(&blended(table, s), FIRST_KNOT_AGE, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn knots_are_reproduced() {
        let knots = [1.0, 3.0, 7.0];
        assert_eq!(interpolate_knots(&knots, 2.0, 2.0), 1.0);
        assert_eq!(interpolate_knots(&knots, 2.0, 3.0), 3.0);
        assert_eq!(interpolate_knots(&knots, 2.0, 4.0), 7.0);
    }

    #[test]
    fn midpoints_are_linear() {
        let knots = [1.0, 3.0, 7.0];
        assert_relative_eq!(interpolate_knots(&knots, 2.0, 2.5), 2.0);
        assert_relative_eq!(interpolate_knots(&knots, 2.0, 3.25), 4.0);
    }

    #[test]
    fn out_of_range_ages_clamp() {
        let knots = [1.0, 3.0, 7.0];
        assert_eq!(interpolate_knots(&knots, 2.0, 0.5), 1.0);
        assert_eq!(interpolate_knots(&knots, 2.0, 40.0), 7.0);
    }

    #[test]
    fn reference_curves_blend_by_sex() {
        let age = array![2.0, 2.0, 18.0, 30.0];
        let sex = array![0.0, 1.0, 1.0, 0.0];
        let ffm = ReferenceCurves::ffm(&age, &sex);
        assert_eq!(ffm, array![10.134, 9.477, 42.6, 60.0]);

        let fm = ReferenceCurves::fm(&array![10.5], &array![1.0]);
        assert_relative_eq!(fm[0], 0.5 * (7.2 + 8.5), epsilon = 1e-12);
    }
}
