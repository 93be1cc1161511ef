// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Nonlinear least-squares curve fitting.
//!
//! A small Levenberg-Marquardt implementation over statically-sized parameter
//! vectors. Each iteration solves the damped normal equations
//! `(JᵀJ + λ diag(JᵀJ)) δ = Jᵀr` and accepts the step if chi² decreases. The
//! schedule is fixed, so a fit from a given initial guess is deterministic.


use log::trace;
use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use thiserror::Error;

/// Errors associated with [`curve_fit`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("The normal equations are singular; the model parameters are degenerate over the sampled points")]
    Singular,

    #[error("The fit did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },
}

/// A scalar model `y = f(x; params)` with analytic partial derivatives.
pub trait CurveModel<const N: usize> {
    /// Evaluate the model at `x`.
    fn value(&self, x: f64, params: &[f64; N]) -> f64;

    /// The partial derivatives of the model with respect to each parameter,
    /// at `x`.
    fn gradient(&self, x: f64, params: &[f64; N]) -> [f64; N];
}

/// Convergence controls for [`curve_fit`].
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Iteration cap.
    pub max_iterations: usize,

    /// The fit has converged when the largest accepted parameter step falls
    /// below this.
    pub convergence_threshold: f64,

    /// Initial damping.
    pub initial_lambda: f64,

    /// Damping increase on a rejected step.
    pub lambda_up: f64,

    /// Damping decrease on an accepted step.
    pub lambda_down: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// A converged least-squares fit.
#[derive(Debug, Clone, Copy)]
pub struct FitResult<const N: usize> {
    /// Best-fit parameters.
    pub params: [f64; N],

    /// Per-parameter standard errors, from the unscaled covariance
    /// `(JᵀJ)⁻¹ · RSS/(n-N)`.
    pub std_errors: [f64; N],

    /// Sum of squared residuals at the solution.
    pub chi2: f64,

    /// Iterations taken.
    pub iterations: usize,
}

/// Fit `model` to the observations `(xs, ys)` by Levenberg-Marquardt, starting
/// from `initial_params`.
pub fn curve_fit<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial_params: [f64; N],
    config: &FitConfig,
) -> Result<FitResult<N>, FitError> {
    let mut params = initial_params;
    let mut lambda = config.initial_lambda;
    let mut chi2 = chi_squared(model, xs, ys, &params);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let (jtj, jtr) = normal_equations(model, xs, ys, &params);

        let mut damped = jtj;
        for i in 0..N {
            damped[(i, i)] *= 1.0 + lambda;
        }

        // nalgebra's LU requires `DimMin`, which isn't implemented for
        // arbitrary `Const<N>`; solve through dynamically-sized copies.
        let damped_dyn = DMatrix::from_fn(N, N, |i, j| damped[(i, j)]);
        let jtr_dyn = DVector::from_fn(N, |i, _| jtr[i]);
        let step = match damped_dyn.lu().solve(&jtr_dyn) {
            Some(step) => step,
            None => return Err(FitError::Singular),
        };

        let mut trial = params;
        for (p, s) in trial.iter_mut().zip(step.iter()) {
            *p += s;
        }

        let trial_chi2 = chi_squared(model, xs, ys, &trial);
        trace!("LM iteration {iterations}: chi2 {trial_chi2:e}, lambda {lambda:e}");

        if trial_chi2 < chi2 {
            params = trial;
            chi2 = trial_chi2;
            lambda *= config.lambda_down;

            let max_step = step.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
            if max_step < config.convergence_threshold {
                converged = true;
                break;
            }
        } else {
            lambda *= config.lambda_up;
            // Once the damping saturates no further step can improve chi²;
            // the current parameters are the minimum.
            if lambda > 1e12 {
                converged = true;
                break;
            }
        }
    }

    if !converged {
        return Err(FitError::DidNotConverge { iterations });
    }

    let (jtj, _) = normal_equations(model, xs, ys, &params);
    let cov = match jtj.try_inverse() {
        Some(inv) => inv * (chi2 / effective_dof::<N>(xs.len())),
        None => return Err(FitError::Singular),
    };
    let mut std_errors = [0.0; N];
    for (i, err) in std_errors.iter_mut().enumerate() {
        *err = cov[(i, i)].max(0.0).sqrt();
    }

    Ok(FitResult {
        params,
        std_errors,
        chi2,
        iterations,
    })
}

fn effective_dof<const N: usize>(num_points: usize) -> f64 {
    num_points.saturating_sub(N).max(1) as f64
}

fn chi_squared<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> f64 {
    xs.iter()
        .zip(ys.iter())
        .map(|(&x, &y)| {
            let r = y - model.value(x, params);
            r * r
        })
        .sum()
}

fn normal_equations<const N: usize, M: CurveModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> (SMatrix<f64, N, N>, SVector<f64, N>) {
    let mut jtj = SMatrix::<f64, N, N>::zeros();
    let mut jtr = SVector::<f64, N>::zeros();
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let r = y - model.value(x, params);
        let g = model.gradient(x, params);
        for i in 0..N {
            jtr[i] += g[i] * r;
            for j in 0..N {
                jtj[(i, j)] += g[i] * g[j];
            }
        }
    }
    (jtj, jtr)
}
