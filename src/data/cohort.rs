use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};

use crate::BodyCompError;

fn expect_len(field: &str, values: &Array1<f64>, n: usize) -> Result<(), BodyCompError> {
    if values.len() != n {
        return Err(BodyCompError::mismatch(field, n, values.len()));
    }
    Ok(())
}

fn expect_positive(field: &str, values: &Array1<f64>) -> Result<(), BodyCompError> {
    match values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        Some(v) => Err(BodyCompError::invalid(field, v)),
        None => Ok(()),
    }
}

fn expect_sex_indicator(values: &Array1<f64>) -> Result<(), BodyCompError> {
    match values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
        Some(v) => Err(BodyCompError::invalid("sex", v)),
        None => Ok(()),
    }
}

/// Baseline anthropometrics and diet of an adult cohort
///
/// Every field holds one value per individual. The sex indicator is 0 for male and
/// 1 for female; sex-specific regressions are blended linearly by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdultCohort {
    /// Body weight, kg
    pub weight: Array1<f64>,
    /// Height, m
    pub height: Array1<f64>,
    /// Age, years
    pub age: Array1<f64>,
    pub sex: Array1<f64>,
    /// Physical activity level, typically 1.4–2.4
    pub pal: Array1<f64>,
    /// Fraction of intake from carbohydrates at baseline
    pub pcarb_base: Array1<f64>,
    /// Fraction of intake from carbohydrates after the change
    pub pcarb: Array1<f64>,
}

impl AdultCohort {
    /// Validate and assemble a cohort; the cohort size is taken from `weight`.
    pub fn new(
        weight: Array1<f64>,
        height: Array1<f64>,
        age: Array1<f64>,
        sex: Array1<f64>,
        pal: Array1<f64>,
        pcarb_base: Array1<f64>,
        pcarb: Array1<f64>,
    ) -> Result<Self, BodyCompError> {
        let n = weight.len();
        if n == 0 {
            return Err(BodyCompError::invalid("weight", "empty cohort"));
        }
        expect_len("height", &height, n)?;
        expect_len("age", &age, n)?;
        expect_len("sex", &sex, n)?;
        expect_len("pal", &pal, n)?;
        expect_len("pcarb_base", &pcarb_base, n)?;
        expect_len("pcarb", &pcarb, n)?;

        expect_positive("weight", &weight)?;
        expect_positive("height", &height)?;
        expect_positive("pal", &pal)?;
        expect_positive("pcarb_base", &pcarb_base)?;
        expect_sex_indicator(&sex)?;

        Ok(AdultCohort {
            weight,
            height,
            age,
            sex,
            pal,
            pcarb_base,
            pcarb,
        })
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    pub(crate) fn select(&self, individuals: &[usize]) -> Self {
        AdultCohort {
            weight: self.weight.select(Axis(0), individuals),
            height: self.height.select(Axis(0), individuals),
            age: self.age.select(Axis(0), individuals),
            sex: self.sex.select(Axis(0), individuals),
            pal: self.pal.select(Axis(0), individuals),
            pcarb_base: self.pcarb_base.select(Axis(0), individuals),
            pcarb: self.pcarb.select(Axis(0), individuals),
        }
    }
}

/// Baseline age, sex and body composition of a cohort of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildCohort {
    /// Age, years
    pub age: Array1<f64>,
    pub sex: Array1<f64>,
    /// Fat-free mass, kg
    pub ffm: Array1<f64>,
    /// Fat mass, kg
    pub fm: Array1<f64>,
}

impl ChildCohort {
    pub fn new(
        age: Array1<f64>,
        sex: Array1<f64>,
        ffm: Array1<f64>,
        fm: Array1<f64>,
    ) -> Result<Self, BodyCompError> {
        let n = age.len();
        if n == 0 {
            return Err(BodyCompError::invalid("age", "empty cohort"));
        }
        expect_len("sex", &sex, n)?;
        expect_len("ffm", &ffm, n)?;
        expect_len("fm", &fm, n)?;

        expect_positive("ffm", &ffm)?;
        expect_positive("fm", &fm)?;
        expect_sex_indicator(&sex)?;

        Ok(ChildCohort { age, sex, ffm, fm })
    }

    pub fn len(&self) -> usize {
        self.age.len()
    }

    pub fn is_empty(&self) -> bool {
        self.age.is_empty()
    }

    pub(crate) fn select(&self, individuals: &[usize]) -> Self {
        ChildCohort {
            age: self.age.select(Axis(0), individuals),
            sex: self.sex.select(Axis(0), individuals),
            ffm: self.ffm.select(Axis(0), individuals),
            fm: self.fm.select(Axis(0), individuals),
        }
    }
}
