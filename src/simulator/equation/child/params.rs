use serde::{Deserialize, Serialize};

use crate::{
    data::reference::{
        blended, interpolate_knots, FFM_REFERENCE, FIRST_KNOT_AGE, FM_REFERENCE, KNOTS,
    },
    simulator::constants::*,
    BodyCompError,
};

/// A curve of age made of one exponential decay and two Gaussian pulses
///
/// ```text
/// f(age) = A·exp(−(age − t_A)/τ_A) + B·exp(−½((age − t_B)/τ_B)²) + D·exp(−½((age − t_D)/τ_D)²)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseCurve {
    pub a: f64,
    pub t_a: f64,
    pub tau_a: f64,
    pub b: f64,
    pub t_b: f64,
    pub tau_b: f64,
    pub d: f64,
    pub t_d: f64,
    pub tau_d: f64,
}

impl PulseCurve {
    pub fn value(&self, age: f64) -> f64 {
        self.a * (-(age - self.t_a) / self.tau_a).exp()
            + self.b * (-0.5 * ((age - self.t_b) / self.tau_b).powi(2)).exp()
            + self.d * (-0.5 * ((age - self.t_d) / self.tau_d).powi(2)).exp()
    }

    /// Blend a `(male, female)` pair parameter by parameter
    pub fn blend((male, female): &(PulseCurve, PulseCurve), sex: f64) -> PulseCurve {
        let mix = |m: f64, f: f64| blend((m, f), sex);
        PulseCurve {
            a: mix(male.a, female.a),
            t_a: mix(male.t_a, female.t_a),
            tau_a: mix(male.tau_a, female.tau_a),
            b: mix(male.b, female.b),
            t_b: mix(male.t_b, female.t_b),
            tau_b: mix(male.tau_b, female.tau_b),
            d: mix(male.d, female.d),
            t_d: mix(male.t_d, female.t_d),
            tau_d: mix(male.tau_d, female.tau_d),
        }
    }
}

macro_rules! curve {
    (
        $a:expr, $t_a:expr, $tau_a:expr;
        $b:expr, $t_b:expr, $tau_b:expr;
        $d:expr, $t_d:expr, $tau_d:expr
    ) => {
        PulseCurve {
            a: $a,
            t_a: $t_a,
            tau_a: $tau_a,
            b: $b,
            t_b: $t_b,
            tau_b: $tau_b,
            d: $d,
            t_d: $t_d,
            tau_d: $tau_d,
        }
    };
}

/// Growth term of the mass equations, kcal/day, `(male, female)`
pub const GROWTH_DYNAMICS: (PulseCurve, PulseCurve) = (
    curve!(3.2, 4.7, 2.5; 9.6, 12.5, 1.0; 10.1, 15.0, 1.5),
    curve!(2.3, 4.5, 1.0; 8.4, 11.7, 0.9; 1.1, 16.2, 0.7),
);

/// Alternate growth curve with narrower pulses, `(male, female)`
pub const GROWTH_IMPACT: (PulseCurve, PulseCurve) = (
    curve!(3.2, 4.7, 1.0; 9.6, 12.5, 0.94; 10.0, 15.0, 0.69),
    curve!(2.3, 4.5, 1.0; 8.4, 11.7, 0.94; 1.1, 16.0, 0.69),
);

/// Energy imbalance of the reference child, kcal/day, `(male, female)`
pub const ENERGY_BALANCE_IMPACT: (PulseCurve, PulseCurve) = (
    curve!(7.2, 5.6, 15.0; 30.0, 9.8, 1.5; 21.0, 15.0, 2.0),
    curve!(16.5, 4.8, 7.0; 47.0, 9.1, 1.0; 41.0, 13.5, 1.5),
);

/// Förster energy density of fat-free mass, kcal/kg
#[inline]
pub fn rho_ffm(ffm: f64) -> f64 {
    RHO_FFM_SLOPE * ffm + RHO_FFM_INTERCEPT
}

/// Fraction of an energy imbalance routed to fat-free mass
#[inline]
pub fn partition(ffm: f64, fm: f64) -> f64 {
    let c = FORBES * rho_ffm(ffm) / CHILD_RHO_FM;
    c / (c + fm)
}

/// Sex-blended parameters of one child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildParameters {
    pub sex: f64,
    /// Energy-balance intercept, kcal/day
    pub k: f64,
    /// Maximum physical-activity coefficient, kcal/kg/day
    pub delta_max: f64,
    pub growth: PulseCurve,
    pub growth_impact: PulseCurve,
    pub energy_balance: PulseCurve,
    ffm_reference: [f64; KNOTS],
    fm_reference: [f64; KNOTS],
}

impl ChildParameters {
    pub fn new(sex: f64) -> Self {
        ChildParameters {
            sex,
            k: blend(CHILD_K, sex),
            delta_max: blend(DELTA_MAX, sex),
            growth: PulseCurve::blend(&GROWTH_DYNAMICS, sex),
            growth_impact: PulseCurve::blend(&GROWTH_IMPACT, sex),
            energy_balance: PulseCurve::blend(&ENERGY_BALANCE_IMPACT, sex),
            ffm_reference: blended(&FFM_REFERENCE, sex),
            fm_reference: blended(&FM_REFERENCE, sex),
        }
    }

    /// Physical-activity coefficient, kcal/kg/day, declining through puberty
    pub fn activity(&self, age: f64) -> f64 {
        DELTA_MIN + (self.delta_max - DELTA_MIN) * (1.0 / (1.0 + (age / DELTA_P).powf(DELTA_H)))
    }

    pub fn reference_ffm(&self, age: f64) -> f64 {
        interpolate_knots(&self.ffm_reference, FIRST_KNOT_AGE, age)
    }

    pub fn reference_fm(&self, age: f64) -> f64 {
        interpolate_knots(&self.fm_reference, FIRST_KNOT_AGE, age)
    }

    /// Intake of the reference child at `age`, kcal/day
    pub fn reference_intake(&self, age: f64) -> f64 {
        let eb = self.energy_balance.value(age);
        let ffm = self.reference_ffm(age);
        let fm = self.reference_fm(age);
        let delta = self.activity(age);
        let g = self.growth.value(age);
        let p = partition(ffm, fm);
        let rho = rho_ffm(ffm);
        eb + self.k
            + (GAMMA_FFM + delta) * ffm
            + (GAMMA_FM + delta) * fm
            + ETA_FFM / rho * (p * eb + g)
            + ETA_FM / CHILD_RHO_FM * ((1.0 - p) * eb - g)
    }

    /// Energy expenditure, kcal/day, solved from the energy balance at the given intake
    pub fn expenditure(&self, age: f64, intake: f64, ffm: f64, fm: f64) -> f64 {
        let delta = self.activity(age);
        let deviation = intake - self.reference_intake(age);
        let p = partition(ffm, fm);
        let rho = rho_ffm(ffm);
        let g = self.growth.value(age);
        let expend = self.k
            + (GAMMA_FFM + delta) * ffm
            + (GAMMA_FM + delta) * fm
            + INTAKE_DEVIATION_RESPONSE * deviation
            + (ETA_FFM / rho * p + ETA_FM / CHILD_RHO_FM * (1.0 - p)) * intake
            + g * (ETA_FFM / rho - ETA_FM / CHILD_RHO_FM);
        expend / (1.0 + ETA_FFM / rho * p + ETA_FM / CHILD_RHO_FM * (1.0 - p))
    }

    /// `(dFFM/dt, dFM/dt)`, kg/day
    pub fn rates(&self, age: f64, intake: f64, ffm: f64, fm: f64) -> (f64, f64) {
        let rho = rho_ffm(ffm);
        let p = partition(ffm, fm);
        let g = self.growth.value(age);
        let imbalance = intake - self.expenditure(age, intake, ffm, fm);
        (
            (p * imbalance + g) / rho,
            ((1.0 - p) * imbalance - g) / CHILD_RHO_FM,
        )
    }
}

/// Richards generalized-logistic intake curve of age, kcal/day
///
/// `I(age) = a + (k − a)/(c + q·exp(−b·age))^(1/nu)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneralizedLogistic {
    /// Lower asymptote
    pub a: f64,
    /// Upper asymptote when `c = 1`
    pub k: f64,
    pub q: f64,
    /// Growth rate, 1/year
    pub b: f64,
    /// Asymmetry of the inflection
    pub nu: f64,
    pub c: f64,
}

impl GeneralizedLogistic {
    pub fn new(a: f64, k: f64, q: f64, b: f64, nu: f64, c: f64) -> Result<Self, BodyCompError> {
        for (name, value) in [("a", a), ("k", k), ("q", q), ("b", b), ("nu", nu), ("c", c)] {
            if !value.is_finite() {
                return Err(BodyCompError::invalid(name, value));
            }
        }
        if nu == 0.0 {
            return Err(BodyCompError::invalid("nu", nu));
        }
        Ok(GeneralizedLogistic { a, k, q, b, nu, c })
    }

    pub fn value(&self, age: f64) -> f64 {
        self.a + (self.k - self.a) / (self.c + self.q * (-self.b * age).exp()).powf(1.0 / self.nu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pulse_curve_peaks() {
        let curve = curve!(0.0, 0.0, 1.0; 2.0, 10.0, 1.0; 0.0, 0.0, 1.0);
        assert_relative_eq!(curve.value(10.0), 2.0);
        assert_relative_eq!(curve.value(11.0), 2.0 * (-0.5f64).exp());
    }

    #[test]
    fn blending_by_sex() {
        let male = ChildParameters::new(0.0);
        let female = ChildParameters::new(1.0);
        assert_eq!(male.k, 800.0);
        assert_eq!(female.k, 700.0);
        assert_eq!(male.growth.d, 10.1);
        assert_eq!(female.energy_balance.tau_a, 7.0);
        let mixed = ChildParameters::new(0.5);
        assert_relative_eq!(mixed.delta_max, 18.0);
        assert_relative_eq!(mixed.growth_impact.t_d, 15.5);
    }

    #[test]
    fn activity_declines_through_puberty() {
        let p = ChildParameters::new(0.0);
        assert_relative_eq!(p.activity(12.0), 10.0 + 9.0 * 0.5);
        assert!(p.activity(6.0) > 18.9);
        assert!(p.activity(18.0) < 11.0);
    }

    #[test]
    fn partition_favors_lean_in_lean_children() {
        assert!(partition(20.0, 2.0) > partition(20.0, 10.0));
        let c = FORBES * rho_ffm(20.0) / CHILD_RHO_FM;
        assert_relative_eq!(partition(20.0, c), 0.5);
    }

    #[test]
    fn reference_child_imbalance_equals_energy_balance_curve() {
        for &sex in &[0.0, 1.0] {
            let p = ChildParameters::new(sex);
            for &age in &[4.0, 8.5, 13.2] {
                let intake = p.reference_intake(age);
                let expend = p.expenditure(age, intake, p.reference_ffm(age), p.reference_fm(age));
                assert_relative_eq!(intake - expend, p.energy_balance.value(age), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn logistic_curve() {
        let curve = GeneralizedLogistic::new(0.0, 1.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        assert_relative_eq!(curve.value(7.0), 0.5);
        let curve = GeneralizedLogistic::new(1000.0, 2000.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        assert_relative_eq!(curve.value(40.0), 2000.0, epsilon = 1e-6);
        assert!(GeneralizedLogistic::new(0.0, 1.0, 1.0, 0.0, 0.0, 1.0).is_err());
    }
}
