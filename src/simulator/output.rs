use std::{fmt, io::Write};

use csv::WriterBuilder;
use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    simulator::constants::{BMI_OBESE, BMI_PRE_OBESE, BMI_UNDERWEIGHT},
    BodyCompError,
};

/// Which model produced a [Trajectory]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Adult,
    Child,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Adult => write!(f, "Adult"),
            ModelKind::Child => write!(f, "Child"),
        }
    }
}

/// WHO body-mass-index band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    PreObese,
    Obese,
    /// BMI could not be computed (non-finite weight)
    Unknown,
}

impl BmiCategory {
    pub fn classify(bmi: f64) -> Self {
        if bmi.is_nan() {
            BmiCategory::Unknown
        } else if bmi < BMI_UNDERWEIGHT {
            BmiCategory::Underweight
        } else if bmi < BMI_PRE_OBESE {
            BmiCategory::Normal
        } else if bmi < BMI_OBESE {
            BmiCategory::PreObese
        } else {
            BmiCategory::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::PreObese => "Pre-Obese",
            BmiCategory::Obese => "Obese",
            BmiCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const TIME: &str = "Time";
pub const AGE: &str = "Age";
pub const ADAPTIVE_THERMOGENESIS: &str = "Adaptive_Thermogenesis";
pub const EXTRACELLULAR_FLUID: &str = "Extracellular_Fluid";
pub const GLYCOGEN: &str = "Glycogen";
pub const FAT_MASS: &str = "Fat_Mass";
pub const LEAN_MASS: &str = "Lean_Mass";
pub const FAT_FREE_MASS: &str = "Fat_Free_Mass";
pub const BODY_WEIGHT: &str = "Body_Weight";
pub const BODY_MASS_INDEX: &str = "Body_Mass_Index";
pub const BMI_CATEGORY: &str = "BMI_Category";
pub const ENERGY_INTAKE: &str = "Energy_Intake";
pub const CORRECT_VALUES: &str = "Correct_Values";
pub const MODEL_TYPE: &str = "Model_Type";

/// One named numeric series, steps × individuals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    values: Array2<f64>,
}

impl Series {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Simulated time course of a cohort
///
/// Every numeric series is a steps × individuals matrix sharing the [Trajectory::time]
/// axis. Series keep the order in which the model reports them, see [Trajectory::names].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    kind: ModelKind,
    time: Array1<f64>,
    series: Vec<Series>,
    bmi_category: Option<Array2<BmiCategory>>,
    correct_values: bool,
}

impl Trajectory {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    /// `false` when the run stopped early on a non-finite or non-positive mass
    pub fn correct_values(&self) -> bool {
        self.correct_values
    }

    /// Number of stored time points, baseline included
    pub fn nsteps(&self) -> usize {
        self.time.len()
    }

    pub fn nindividuals(&self) -> usize {
        self.series.first().map_or(0, |s| s.values.ncols())
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Numeric series by name
    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.values)
    }

    pub fn age(&self) -> Option<&Array2<f64>> {
        self.get(AGE)
    }

    pub fn body_weight(&self) -> Option<&Array2<f64>> {
        self.get(BODY_WEIGHT)
    }

    pub fn fat_mass(&self) -> Option<&Array2<f64>> {
        self.get(FAT_MASS)
    }

    pub fn energy_intake(&self) -> Option<&Array2<f64>> {
        self.get(ENERGY_INTAKE)
    }

    pub fn bmi_category(&self) -> Option<&Array2<BmiCategory>> {
        self.bmi_category.as_ref()
    }

    /// Names of every reported field, in order
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![TIME];
        for s in &self.series {
            names.push(s.name.as_str());
            if s.name == BODY_MASS_INDEX && self.bmi_category.is_some() {
                names.push(BMI_CATEGORY);
            }
        }
        names.push(CORRECT_VALUES);
        names.push(MODEL_TYPE);
        names
    }

    /// Keep only the listed individuals, in the given order
    pub fn select(&self, individuals: &[usize]) -> Trajectory {
        Trajectory {
            kind: self.kind,
            time: self.time.clone(),
            series: self
                .series
                .iter()
                .map(|s| Series {
                    name: s.name.clone(),
                    values: s.values.select(Axis(1), individuals),
                })
                .collect(),
            bmi_category: self
                .bmi_category
                .as_ref()
                .map(|c| c.select(Axis(1), individuals)),
            correct_values: self.correct_values,
        }
    }

    /// The trajectory of a single individual
    pub fn individual(&self, index: usize) -> Result<Trajectory, BodyCompError> {
        if index >= self.nindividuals() {
            return Err(BodyCompError::invalid(
                "individual",
                format!("{} (cohort of {})", index, self.nindividuals()),
            ));
        }
        Ok(self.select(&[index]))
    }

    /// Join trajectories of disjoint sub-cohorts side by side.
    ///
    /// Parts may have stopped at different steps; the result keeps the common
    /// prefix and is flagged incorrect if any part was.
    pub fn concat(parts: Vec<Trajectory>) -> Result<Trajectory, BodyCompError> {
        let first = match parts.first() {
            Some(first) => first,
            None => return Err(BodyCompError::invalid("parts", "no trajectories to join")),
        };
        for part in &parts[1..] {
            if part.kind != first.kind || part.series.len() != first.series.len() {
                return Err(BodyCompError::invalid(
                    "parts",
                    format!("cannot join {} and {} trajectories", first.kind, part.kind),
                ));
            }
        }

        let steps = parts.iter().map(|p| p.nsteps()).min().unwrap_or(0);
        let total: usize = parts.iter().map(|p| p.nindividuals()).sum();

        let mut series: Vec<Series> = first
            .series
            .iter()
            .map(|s| Series {
                name: s.name.clone(),
                values: Array2::zeros((steps, total)),
            })
            .collect();
        let mut bmi_category = first
            .bmi_category
            .as_ref()
            .map(|_| Array2::from_elem((steps, total), BmiCategory::Unknown));

        let mut offset = 0;
        for part in &parts {
            let n = part.nindividuals();
            for (target, source) in series.iter_mut().zip(&part.series) {
                target
                    .values
                    .slice_mut(s![.., offset..offset + n])
                    .assign(&source.values.slice(s![..steps, ..]));
            }
            if let (Some(target), Some(source)) =
                (bmi_category.as_mut(), part.bmi_category.as_ref())
            {
                target
                    .slice_mut(s![.., offset..offset + n])
                    .assign(&source.slice(s![..steps, ..]));
            }
            offset += n;
        }

        Ok(Trajectory {
            kind: first.kind,
            time: first.time.slice(s![..steps]).to_owned(),
            series,
            bmi_category,
            correct_values: parts.iter().all(|p| p.correct_values),
        })
    }

    /// Write the trajectory in long format, one row per individual and time point
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BodyCompError> {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

        let mut header = vec!["Individual"];
        header.extend(self.names());
        writer.write_record(&header)?;

        for k in 0..self.nindividuals() {
            for i in 0..self.nsteps() {
                let mut record = vec![(k + 1).to_string(), self.time[i].to_string()];
                for s in &self.series {
                    record.push(s.values[[i, k]].to_string());
                    if s.name == BODY_MASS_INDEX {
                        if let Some(categories) = &self.bmi_category {
                            record.push(categories[[i, k]].to_string());
                        }
                    }
                }
                record.push(self.correct_values.to_string());
                record.push(self.kind.to_string());
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, BodyCompError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Collects per-step cohort snapshots into a [Trajectory]
pub(crate) struct TrajectoryAssembler {
    kind: ModelKind,
    names: &'static [&'static str],
    time: Vec<f64>,
    columns: Vec<Vec<Array1<f64>>>,
}

impl TrajectoryAssembler {
    pub(crate) fn new(kind: ModelKind, names: &'static [&'static str], capacity: usize) -> Self {
        TrajectoryAssembler {
            kind,
            names,
            time: Vec::with_capacity(capacity),
            columns: names.iter().map(|_| Vec::with_capacity(capacity)).collect(),
        }
    }

    /// Append one time point; `values` follow the order of `names`
    pub(crate) fn push(&mut self, time: f64, values: Vec<Array1<f64>>) {
        debug_assert_eq!(values.len(), self.names.len());
        self.time.push(time);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    pub(crate) fn finish(self, correct_values: bool) -> Trajectory {
        let steps = self.time.len();
        let series: Vec<Series> = self
            .names
            .iter()
            .zip(self.columns)
            .map(|(name, rows)| {
                let n = rows.first().map_or(0, |r| r.len());
                let mut values = Array2::zeros((steps, n));
                for (mut target, row) in values.axis_iter_mut(Axis(0)).zip(&rows) {
                    target.assign(row);
                }
                Series {
                    name: name.to_string(),
                    values,
                }
            })
            .collect();

        let bmi_category = series
            .iter()
            .find(|s| s.name == BODY_MASS_INDEX)
            .map(|s| s.values.mapv(BmiCategory::classify));

        Trajectory {
            kind: self.kind,
            time: Array1::from(self.time),
            series,
            bmi_category,
            correct_values,
        }
    }
}
