//! Fixed-step fourth-order Runge–Kutta over cohort state arrays
//!
//! States are `ndarray` arrays whose last axis is the cohort, so each stage is an
//! elementwise update and individuals never interact.
//!
//! ```text
//! k₁ = f(tₙ, yₙ)
//! k₂ = f(tₙ + dt/2, yₙ + dt/2·k₁)
//! k₃ = f(tₙ + dt/2, yₙ + dt/2·k₂)
//! k₄ = f(tₙ + dt, yₙ + dt·k₃)
//! yₙ₊₁ = yₙ + dt·(k₁ + 2k₂ + 2k₃ + k₄)/6
//! ```

use ndarray::{Array, Dimension};

/// State that can be evaluated halfway through a step from its two endpoints
pub trait Midpoint {
    fn midpoint(&self, next: &Self) -> Self;
}

impl<D: Dimension> Midpoint for Array<f64, D> {
    #[inline]
    fn midpoint(&self, next: &Self) -> Self {
        (next + self) * 0.5
    }
}

macro_rules! impl_midpoint_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Midpoint),+> Midpoint for ($($name,)+) {
            #[inline]
            fn midpoint(&self, next: &Self) -> Self {
                ($(self.$idx.midpoint(&next.$idx),)+)
            }
        }
    };
}

impl_midpoint_tuple!(A: 0);
impl_midpoint_tuple!(A: 0, B: 1);
impl_midpoint_tuple!(A: 0, B: 1, C: 2);
impl_midpoint_tuple!(A: 0, B: 1, C: 2, D: 3);

#[inline(always)]
fn combine<D: Dimension>(
    y: &Array<f64, D>,
    dt: f64,
    k1: Array<f64, D>,
    k2: Array<f64, D>,
    k3: Array<f64, D>,
    k4: Array<f64, D>,
) -> Array<f64, D> {
    y + &((k1 + &(k2 * 2.0) + &(k3 * 2.0) + &k4) * dt / 6.0)
}

/// Advance `y` from `t` to `t + dt` with the classical RK4 scheme.
///
/// `f(t, y)` returns `dy/dt`; any error it raises aborts the step.
pub fn rk4_step<D, E, F>(mut f: F, t: f64, y: &Array<f64, D>, dt: f64) -> Result<Array<f64, D>, E>
where
    D: Dimension,
    F: FnMut(f64, &Array<f64, D>) -> Result<Array<f64, D>, E>,
{
    let half = 0.5 * dt;
    let k1 = f(t, y)?;
    let k2 = f(t + half, &(y + &(&k1 * half)))?;
    let k3 = f(t + half, &(y + &(&k2 * half)))?;
    let k4 = f(t + dt, &(y + &(&k3 * dt)))?;
    Ok(combine(y, dt, k1, k2, k3, k4))
}

/// RK4 step for a state coupled to auxiliary states that were already advanced.
///
/// `f(t, y, aux)` returns `dy/dt`. The auxiliary state enters `k₁` at `aux_prev`,
/// `k₂` and `k₃` at the average of `aux_prev` and `aux_next`, and `k₄` at
/// `aux_next`, instead of being re-integrated alongside `y`.
pub fn rk4_coupled_step<D, A, E, F>(
    mut f: F,
    t: f64,
    y: &Array<f64, D>,
    aux_prev: &A,
    aux_next: &A,
    dt: f64,
) -> Result<Array<f64, D>, E>
where
    D: Dimension,
    A: Midpoint,
    F: FnMut(f64, &Array<f64, D>, &A) -> Result<Array<f64, D>, E>,
{
    let half = 0.5 * dt;
    let aux_mid = aux_next.midpoint(aux_prev);
    let k1 = f(t, y, aux_prev)?;
    let k2 = f(t + half, &(y + &(&k1 * half)), &aux_mid)?;
    let k3 = f(t + half, &(y + &(&k2 * half)), &aux_mid)?;
    let k4 = f(t + dt, &(y + &(&k3 * dt)), aux_next)?;
    Ok(combine(y, dt, k1, k2, k3, k4))
}
