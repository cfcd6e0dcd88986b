//! Symmetric three-peak fit for cut profiles.
//!
//! The model is one central peak at the origin plus two side peaks mirrored
//! around it:
//!
//! `f(x) = L(x, Ac, Wc, 0) + L(x, As, Ws, X0) + L(x, As, Ws, -X0)`
//!
//! with `L(x, a, w, x0) = a / ((x - x0)^2 + w)`. Note that `w` enters as a
//! squared width term, not as a conventional half width.
//!
//! Parameters are estimated with Levenberg-Marquardt using the analytic
//! Jacobian of the model.

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::util::usize_to_f64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of free model parameters.
pub const N_PARAMS: usize = 5;

/// Fewest profile points accepted for a fit.
pub const MIN_POINTS: usize = N_PARAMS;

const MIN_LAMBDA: f64 = 1e-12;
const DIAG_FLOOR: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e16;
const COST_FLOOR: f64 = 1e-24;
const PIVOT_EPSILON: f64 = 1e-300;

type Params = [f64; N_PARAMS];

/// Peak fit failure, carrying the solver detail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("need at least {required} points, profile has {points}")]
    TooFewPoints { points: usize, required: usize },

    #[error("abscissa has {abscissa} points but ordinate has {ordinate}")]
    LengthMismatch { abscissa: usize, ordinate: usize },

    #[error("profile contains NaN or infinite values")]
    NonFiniteData,

    #[error("residual is not finite for the initial parameters")]
    NonFiniteCost,

    #[error("normal equations are singular at iteration {iteration}")]
    Singular { iteration: usize },

    #[error("damping factor overflow at iteration {iteration}; no step reduces the residual")]
    DampingOverflow { iteration: usize },

    #[error("no convergence after {0} iterations")]
    IterationLimit(usize),
}

/// How the solver's starting point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FitSeed {
    /// Every parameter starts at 1.
    #[default]
    Unit,
    /// Estimate heights, widths and the side offset from the profile.
    Peaks,
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FitConfig {
    /// Maximum accepted steps.
    pub max_iterations: usize,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Factor applied to lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor applied to lambda on an accepted step.
    pub lambda_down: f64,
    /// Relative parameter step below which the fit has converged.
    pub x_tolerance: f64,
    /// Relative residual decrease below which the fit has converged.
    pub f_tolerance: f64,
    /// Starting point strategy.
    pub seed: FitSeed,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            x_tolerance: 1e-10,
            f_tolerance: 1e-12,
            seed: FitSeed::Unit,
        }
    }
}

impl FitConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: FitSeed) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// The five model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakParameters {
    pub central_amplitude: f64,
    pub central_width: f64,
    pub side_amplitude: f64,
    pub side_width: f64,
    pub side_offset: f64,
}

impl PeakParameters {
    #[must_use]
    pub fn new(
        central_amplitude: f64,
        central_width: f64,
        side_amplitude: f64,
        side_width: f64,
        side_offset: f64,
    ) -> Self {
        Self {
            central_amplitude,
            central_width,
            side_amplitude,
            side_width,
            side_offset,
        }
    }

    /// `[Ac, Wc, As, Ws, X0]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; N_PARAMS] {
        [
            self.central_amplitude,
            self.central_width,
            self.side_amplitude,
            self.side_width,
            self.side_offset,
        ]
    }

    #[must_use]
    pub fn from_array(p: [f64; N_PARAMS]) -> Self {
        Self::new(p[0], p[1], p[2], p[3], p[4])
    }

    /// Evaluate the model at `x`.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        model(x, &self.to_array())
    }
}

/// Successful fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResult {
    pub parameters: PeakParameters,
    /// Abscissa of the fitted profile.
    pub abscissa: Vec<f64>,
    /// Model evaluated on `abscissa`.
    pub curve: Vec<f64>,
    pub iterations: usize,
    pub rms_residual: f64,
}

/// Single Lorentzian-shaped kernel `a / ((x - x0)^2 + w)`.
#[inline]
#[must_use]
pub fn lorentzian(x: f64, a: f64, w: f64, x0: f64) -> f64 {
    let dx = x - x0;
    a / (dx * dx + w)
}

#[inline]
fn model(x: f64, p: &Params) -> f64 {
    let [ac, wc, side_a, ws, x0] = *p;
    lorentzian(x, ac, wc, 0.0) + lorentzian(x, side_a, ws, x0) + lorentzian(x, side_a, ws, -x0)
}

/// Partial derivatives of the model at `x`.
#[inline]
fn gradient_at(x: f64, p: &Params) -> Params {
    let [ac, wc, side_a, ws, x0] = *p;
    let dc = x * x + wc;
    let d1 = (x - x0) * (x - x0) + ws;
    let d2 = (x + x0) * (x + x0) + ws;
    [
        1.0 / dc,
        -ac / (dc * dc),
        1.0 / d1 + 1.0 / d2,
        -side_a / (d1 * d1) - side_a / (d2 * d2),
        side_a * 2.0 * (x - x0) / (d1 * d1) - side_a * 2.0 * (x + x0) / (d2 * d2),
    ]
}

fn sum_squares(x: &[f64], y: &[f64], p: &Params) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - model(xi, p);
            r * r
        })
        .sum()
}

/// `J^T J` and `J^T r` at `p`.
fn normal_equations(x: &[f64], y: &[f64], p: &Params) -> ([Params; N_PARAMS], Params) {
    let mut hessian = [[0.0; N_PARAMS]; N_PARAMS];
    let mut gradient = [0.0; N_PARAMS];
    for (&xi, &yi) in x.iter().zip(y) {
        let row = gradient_at(xi, p);
        let r = yi - model(xi, p);
        for i in 0..N_PARAMS {
            gradient[i] += row[i] * r;
            for j in 0..N_PARAMS {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }
    (hessian, gradient)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: [Params; N_PARAMS], mut b: Params) -> Option<Params> {
    for col in 0..N_PARAMS {
        let pivot = (col..N_PARAMS).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON || !a[pivot][col].is_finite() {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..N_PARAMS {
            let factor = a[row][col] / a[col][col];
            for k in col..N_PARAMS {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut out = [0.0; N_PARAMS];
    for i in (0..N_PARAMS).rev() {
        let tail: f64 = ((i + 1)..N_PARAMS).map(|j| a[i][j] * out[j]).sum();
        out[i] = (b[i] - tail) / a[i][i];
    }
    out.iter().all(|v| v.is_finite()).then_some(out)
}

fn norm(v: &Params) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Starting point estimated from the profile shape.
///
/// The central height and half width come from the point nearest the
/// origin; the side peak is the local maximum outside the central peak that
/// stands highest above the central peak's tail.
fn peaks_seed(x: &[f64], y: &[f64]) -> Params {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = hi - lo;

    let centre = x
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map_or(0, |(i, _)| i);
    let hc = y[centre];
    let hw = (centre..x.len())
        .find(|&i| y[i] <= hc / 2.0)
        .map(|i| (x[i] - x[centre]).abs())
        .filter(|w| *w > 0.0)
        .unwrap_or(span / 10.0);
    let hw = if hw > 0.0 { hw } else { 1.0 };
    let wc = hw * hw;
    let ac = hc * wc;

    let excess = |i: usize| y[i] - lorentzian(x[i], ac, wc, 0.0);
    let mut best: Option<(usize, f64)> = None;
    for i in 1..x.len().saturating_sub(1) {
        if x[i].abs() > 2.0 * hw && y[i] >= y[i - 1] && y[i] >= y[i + 1] {
            let e = excess(i);
            if best.map_or(true, |(_, b)| e > b) {
                best = Some((i, e));
            }
        }
    }

    let Some((peak, peak_excess)) = best else {
        return [ac, wc, 0.1 * ac, wc, span / 4.0];
    };
    let hs = peak_excess.max(1e-12 * hc.abs().max(1.0));
    let sw = (peak..x.len())
        .find(|&i| excess(i) <= hs / 2.0)
        .map(|i| (x[i] - x[peak]).abs())
        .filter(|w| *w > 0.0)
        .unwrap_or(hw);
    let ws = sw * sw;
    [ac, wc, hs * ws, ws, x[peak].abs()]
}

/// Fit the three-peak model to `(abscissa, ordinate)`.
///
/// # Errors
/// Returns a [`FitError`] when the input is unusable or the solver does not
/// converge.
pub fn fit(abscissa: &[f64], ordinate: &[f64], config: &FitConfig) -> Result<FitResult, FitError> {
    if abscissa.len() != ordinate.len() {
        return Err(FitError::LengthMismatch {
            abscissa: abscissa.len(),
            ordinate: ordinate.len(),
        });
    }
    if abscissa.len() < MIN_POINTS {
        return Err(FitError::TooFewPoints {
            points: abscissa.len(),
            required: MIN_POINTS,
        });
    }
    if abscissa.iter().chain(ordinate).any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteData);
    }

    let initial = match config.seed {
        FitSeed::Unit => [1.0; N_PARAMS],
        FitSeed::Peaks => peaks_seed(abscissa, ordinate),
    };
    log::debug!("fitting {} points from {initial:?}", abscissa.len());

    let (params, iterations) = levenberg_marquardt(abscissa, ordinate, initial, config)?;
    let cost = sum_squares(abscissa, ordinate, &params);
    let mut parameters = PeakParameters::from_array(params);
    parameters.side_offset = parameters.side_offset.abs();

    log::debug!("fit converged after {iterations} iterations: {parameters:?}");
    Ok(FitResult {
        parameters,
        abscissa: abscissa.to_vec(),
        curve: abscissa.iter().map(|&x| parameters.evaluate(x)).collect(),
        iterations,
        rms_residual: (cost / usize_to_f64(abscissa.len())).sqrt(),
    })
}

fn levenberg_marquardt(
    x: &[f64],
    y: &[f64],
    mut params: Params,
    config: &FitConfig,
) -> Result<(Params, usize), FitError> {
    let mut cost = sum_squares(x, y, &params);
    if !cost.is_finite() {
        return Err(FitError::NonFiniteCost);
    }
    if cost < COST_FLOOR {
        return Ok((params, 0));
    }
    let mut lambda = config.initial_lambda;

    for iteration in 0..config.max_iterations {
        let (hessian, gradient) = normal_equations(x, y, &params);
        loop {
            let mut damped = hessian;
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += lambda * hessian[i][i].max(DIAG_FLOOR);
            }
            let delta = solve(damped, gradient).ok_or(FitError::Singular { iteration })?;

            let mut trial = params;
            for (p, d) in trial.iter_mut().zip(&delta) {
                *p += d;
            }
            let trial_cost = sum_squares(x, y, &trial);

            if trial_cost.is_finite() && trial_cost < cost {
                lambda = (lambda * config.lambda_down).max(MIN_LAMBDA);
                let step = norm(&delta);
                let size = norm(&params);
                let decrease = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
                params = trial;
                cost = trial_cost;
                if step <= config.x_tolerance * (size + config.x_tolerance)
                    || decrease < config.f_tolerance
                    || cost < COST_FLOOR
                {
                    return Ok((params, iteration + 1));
                }
                break;
            }

            lambda *= config.lambda_up;
            if lambda > MAX_LAMBDA {
                return Err(FitError::DampingOverflow { iteration });
            }
        }
    }
    Err(FitError::IterationLimit(config.max_iterations))
}

/// Result of a background fit, tagged with the request generation.
#[derive(Debug)]
pub struct FitMessage {
    pub generation: u64,
    pub result: Result<FitResult, FitError>,
}

/// Run [`fit`] on a worker thread and send the outcome on `tx`.
///
/// A closed channel means the requester is gone; the result is dropped.
pub fn spawn_fit(
    generation: u64,
    abscissa: Vec<f64>,
    ordinate: Vec<f64>,
    config: FitConfig,
    tx: Sender<FitMessage>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let result = fit(&abscissa, &ordinate, &config);
        if tx.send(FitMessage { generation, result }).is_err() {
            log::debug!("fit request {generation} finished after its receiver closed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::mpsc::channel;

    fn grid(start: f64, end: f64, steps: usize) -> Vec<f64> {
        (0..=steps)
            .map(|i| start + (end - start) * usize_to_f64(i) / usize_to_f64(steps))
            .collect()
    }

    fn synthesize(x: &[f64], truth: &PeakParameters) -> Vec<f64> {
        x.iter().map(|&xi| truth.evaluate(xi)).collect()
    }

    fn assert_recovers(found: &PeakParameters, truth: &PeakParameters) {
        for (f, t) in found.to_array().iter().zip(truth.to_array()) {
            assert_relative_eq!(*f, t, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_model_is_symmetric() {
        let p = PeakParameters::new(2.0, 0.5, 1.0, 0.3, 2.5);
        for x in [0.3, 1.7, 4.0] {
            assert_relative_eq!(p.evaluate(x), p.evaluate(-x), epsilon = 1e-12);
        }
        assert_relative_eq!(lorentzian(1.0, 3.0, 2.0, 1.0), 1.5);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let p = [1.5, 1.2, 0.8, 0.9, 1.3];
        let h = 1e-6;
        for x in [-2.0, 0.1, 1.7] {
            let analytic = gradient_at(x, &p);
            for k in 0..N_PARAMS {
                let mut up = p;
                let mut down = p;
                up[k] += h;
                down[k] -= h;
                let numeric = (model(x, &up) - model(x, &down)) / (2.0 * h);
                assert_relative_eq!(analytic[k], numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_unit_seed_recovers_parameters() {
        let truth = PeakParameters::new(1.5, 1.2, 0.8, 0.9, 1.3);
        let x = grid(-6.0, 6.0, 120);
        let y = synthesize(&x, &truth);
        let result = fit(&x, &y, &FitConfig::default()).unwrap();
        assert_recovers(&result.parameters, &truth);
        assert!(result.rms_residual < 1e-8);
        assert_eq!(result.curve.len(), x.len());
    }

    #[test]
    fn test_unit_seed_recovers_narrow_peaks() {
        let truth = PeakParameters::new(4.0, 0.5, 1.0, 0.3, 3.0);
        let x = grid(-6.0, 6.0, 120);
        let y = synthesize(&x, &truth);
        let result = fit(&x, &y, &FitConfig::default()).unwrap();
        assert_recovers(&result.parameters, &truth);
    }

    #[test]
    fn test_peaks_seed_recovers_distant_side_peaks() {
        let truth = PeakParameters::new(50.0, 0.2, 10.0, 0.1, 8.0);
        let x = grid(-12.0, 12.0, 240);
        let y = synthesize(&x, &truth);
        let config = FitConfig::default().with_seed(FitSeed::Peaks);
        let result = fit(&x, &y, &config).unwrap();
        assert_recovers(&result.parameters, &truth);
    }

    #[test]
    fn test_peaks_seed_locates_side_peak() {
        let truth = PeakParameters::new(50.0, 0.2, 10.0, 0.1, 8.0);
        let x = grid(-12.0, 12.0, 240);
        let y = synthesize(&x, &truth);
        let seed = peaks_seed(&x, &y);
        assert_relative_eq!(seed[4], 8.0, epsilon = 1e-9);
        assert!(seed[0] > 0.0 && seed[2] > 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let config = FitConfig::default();
        assert_eq!(
            fit(&[0.0, 1.0], &[1.0, 2.0], &config),
            Err(FitError::TooFewPoints {
                points: 2,
                required: MIN_POINTS
            })
        );
        assert!(matches!(
            fit(&[0.0, 1.0], &[1.0], &config),
            Err(FitError::LengthMismatch { .. })
        ));
        let x = grid(0.0, 1.0, 5);
        let mut y = vec![1.0; 6];
        y[2] = f64::NAN;
        assert_eq!(fit(&x, &y, &config), Err(FitError::NonFiniteData));
    }

    #[test]
    fn test_iteration_limit_reported() {
        let truth = PeakParameters::new(1.5, 1.2, 0.8, 0.9, 1.3);
        let x = grid(-6.0, 6.0, 120);
        let y = synthesize(&x, &truth);
        let config = FitConfig::default().with_max_iterations(1);
        assert_eq!(fit(&x, &y, &config), Err(FitError::IterationLimit(1)));
    }

    #[test]
    fn test_spawn_fit_reports_generation() {
        let truth = PeakParameters::new(1.5, 1.2, 0.8, 0.9, 1.3);
        let x = grid(-6.0, 6.0, 120);
        let y = synthesize(&x, &truth);
        let (tx, rx) = channel();
        spawn_fit(7, x, y, FitConfig::default(), tx).join().unwrap();
        let msg = rx.recv().unwrap();
        assert_eq!(msg.generation, 7);
        assert!(msg.result.is_ok());
    }
}
