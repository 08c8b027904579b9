//! Physical constants and regression coefficients shared by the models.
//!
//! Energy quantities are expressed in kcal. Values originally published in kJ
//! (Hall 2010; Chow & Hall 2008) were converted with 1 kJ = 0.23900573614 kcal.
//!
//! Sex-specific coefficients are stored as `(male, female)` pairs and blended
//! with [`blend`] using the 0 = male / 1 = female indicator.

/// Linear combination of a `(male, female)` coefficient pair by the sex indicator.
#[inline(always)]
pub fn blend((male, female): (f64, f64), sex: f64) -> f64 {
    male * (1.0 - sex) + female * sex
}

// ============================================================================
// Adult model (Hall 2010)
// ============================================================================

/// Energy density of glycogen, kcal/kg (17.6 MJ/kg)
pub const RHO_GLYCOGEN: f64 = 4206.501;
/// Energy density of fat, kcal/kg (39.5 MJ/kg)
pub const RHO_FAT: f64 = 9440.727;
/// Energy density of lean tissue, kcal/kg (7.6 MJ/kg)
pub const RHO_LEAN: f64 = 1816.444;
/// Extracellular sodium concentration, mg/L
pub const SODIUM_CONCENTRATION: f64 = 3220.0;
/// Sodium excretion sensitivity to ECF change, mg/L/day
pub const ZETA_NA: f64 = 3000.0;
/// Sodium excretion sensitivity to carbohydrate intake, mg/day
pub const ZETA_CI: f64 = 4000.0;
/// Maintenance cost of fat, kcal/kg/day (13 kJ)
pub const GAMMA_FAT: f64 = 3.107075;
/// Maintenance cost of lean tissue, kcal/kg/day (92 kJ)
pub const GAMMA_LEAN: f64 = 21.98853;
/// Synthesis cost of fat, kcal/kg (750 kJ)
pub const ETA_FAT: f64 = 179.2543;
/// Synthesis cost of lean tissue, kcal/kg (960 kJ)
pub const ETA_LEAN: f64 = 229.4455;
/// Thermic effect of feeding, fraction of intake change
pub const BETA_TEF: f64 = 0.1;
/// Adaptive thermogenesis gain, fraction of intake change
pub const BETA_AT: f64 = 0.14;
/// Adaptive thermogenesis time constant, days
pub const TAU_AT: f64 = 14.0;
/// Forbes body-composition constant in the Hall lean/fat partition
pub const FORBES: f64 = 10.4;
/// Water bound per kg of glycogen, kg/kg
pub const GLYCOGEN_WATER: f64 = 3.7;
/// Baseline glycogen, kg
pub const GLYCOGEN_BASELINE: f64 = 0.5;

/// Hall partition constant `C = 10.4·ρ_L/ρ_F`
#[inline(always)]
pub fn hall_c() -> f64 {
    FORBES * (RHO_LEAN / RHO_FAT)
}

/// Lean coefficient of the energy-balance denominator
#[inline(always)]
pub fn alpha_lean() -> f64 {
    -(1.0 + ETA_LEAN / RHO_LEAN) * hall_c()
}

/// Fat coefficient of the energy-balance denominator
#[inline(always)]
pub fn alpha_fat() -> f64 {
    -(1.0 + ETA_FAT / RHO_FAT)
}

/// Mifflin–St Jeor coefficients: kcal per kg, per m, per year
pub const RMR_WEIGHT: f64 = 9.99;
pub const RMR_HEIGHT: f64 = 625.0;
pub const RMR_AGE: f64 = 4.92;
/// Mifflin–St Jeor intercept, kcal/day (`+5` men, `−161` women)
pub const RMR_INTERCEPT: (f64, f64) = (5.0, -161.0);

/// Silva extracellular fluid regression, L, `(male, female)`; age enters for men only
pub const ECF_AGE_MALE: f64 = 0.025;
pub const ECF_HEIGHT: (f64, f64) = (9.57, 5.98);
pub const ECF_WEIGHT: (f64, f64) = (0.191, 0.167);
pub const ECF_INTERCEPT: (f64, f64) = (-12.4, -4.0);

/// Jackson body-fat regression on age and ln(BMI), percent, `(male, female)`
pub const FAT_AGE: f64 = 0.14;
pub const FAT_LOG_BMI: (f64, f64) = (37.31, 39.96);
pub const FAT_INTERCEPT: (f64, f64) = (-103.94, -102.01);

/// BMI band limits, kg/m²
pub const BMI_UNDERWEIGHT: f64 = 18.5;
pub const BMI_PRE_OBESE: f64 = 25.0;
pub const BMI_OBESE: f64 = 30.0;

/// Days per year used to advance age
pub const DAYS_PER_YEAR: f64 = 365.0;

// ============================================================================
// Child model (Hall et al. 2013)
// ============================================================================

/// Energy density of fat mass in children, kcal/kg
pub const CHILD_RHO_FM: f64 = 9.4 * 1000.0;
/// Förster fat-free-mass energy density, slope (kcal/kg per kg)
pub const RHO_FFM_SLOPE: f64 = 4.3;
/// Förster fat-free-mass energy density, intercept (kcal/kg)
pub const RHO_FFM_INTERCEPT: f64 = 837.0;
/// Minimum physical-activity coefficient, kcal/kg/day
pub const DELTA_MIN: f64 = 10.0;
/// Age at half-maximal activity decline, years
pub const DELTA_P: f64 = 12.0;
/// Hill exponent of the activity decline
pub const DELTA_H: f64 = 10.0;
/// Maximum physical-activity coefficient, kcal/kg/day
pub const DELTA_MAX: (f64, f64) = (19.0, 17.0);
/// Energy-balance intercept, kcal/day
pub const CHILD_K: (f64, f64) = (800.0, 700.0);
/// FFM maintenance cost, kcal/kg/day
pub const GAMMA_FFM: f64 = 22.4;
/// FM maintenance cost, kcal/kg/day
pub const GAMMA_FM: f64 = 4.5;
/// FFM synthesis cost, kcal/kg
pub const ETA_FFM: f64 = 230.0;
/// FM synthesis cost, kcal/kg
pub const ETA_FM: f64 = 180.0;
/// Expenditure response to intake deviation from the reference child
pub const INTAKE_DEVIATION_RESPONSE: f64 = 0.24;
