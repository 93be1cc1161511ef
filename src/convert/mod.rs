// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion between spectral-model conventions.
//!
//! Perley-Butler models express flux density as
//! `10^(a + b log10(v) + c log10(v)² + d log10(v)³)`, whereas CASA and
//! Meqtrees use a spectral index normalised at a reference frequency:
//! `S(v0) (v/v0)^(a' + b' log10(v/v0) + c' log10(v/v0)² + d' log10(v/v0)³)`.
//! [`convert_pb_to_casaspi`] fits the latter to the former over a frequency
//! band.

mod error;

pub use error::ConvertModelError;

use log::debug;

use crate::{
    caltable::SpectralPoly,
    fit::{curve_fit, CurveModel, FitConfig},
};

/// How many frequencies are sampled across the fitting band.
const NUM_SAMPLES: usize = 10_000;

/// The largest acceptable per-parameter standard error on the fitted spectral
/// index terms. Anything larger means the two conventions are not numerically
/// reconcilable over the requested band.
const MAX_STD_ERROR: f64 = 1.0e-6;

/// A CASA/Meqtrees spectral-index model, normalised at the reference
/// frequency `v0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CasaSpiModel {
    /// Flux density at the reference frequency \[Jy\].
    pub i_ref: f64,

    /// Reference frequency, in the same unit as the band the model was fitted
    /// over.
    pub v0: f64,

    /// Spectral-index polynomial coefficients a', b', c', d'.
    pub spi: [f64; 4],
}

impl CasaSpiModel {
    /// The flux density at `freq` \[Jy\].
    pub fn flux_density(&self, freq: f64) -> f64 {
        let ratio = freq / self.v0;
        let x = ratio.log10();
        let index =
            self.spi[0] + self.spi[1] * x + self.spi[2] * x.powi(2) + self.spi[3] * x.powi(3);
        self.i_ref * ratio.powf(index)
    }
}

/// The CASA/Meqtrees law with `i_ref` and `v0` held fixed; only the four
/// spectral-index terms are free.
struct CasaSpiCurve {
    i_ref: f64,
    v0: f64,
}

impl CurveModel<4> for CasaSpiCurve {
    fn value(&self, freq: f64, params: &[f64; 4]) -> f64 {
        let ratio = freq / self.v0;
        let x = ratio.log10();
        let index = params[0] + params[1] * x + params[2] * x.powi(2) + params[3] * x.powi(3);
        self.i_ref * ratio.powf(index)
    }

    fn gradient(&self, freq: f64, params: &[f64; 4]) -> [f64; 4] {
        let ratio = freq / self.v0;
        let x = ratio.log10();
        // dS/dp_k = S ln(ratio) x^k
        let s_ln = self.value(freq, params) * ratio.ln();
        [s_ln, s_ln * x, s_ln * x.powi(2), s_ln * x.powi(3)]
    }
}

/// Fit a CASA/Meqtrees spectral-index model to a Perley-Butler polynomial
/// over the band `[vlower, vupper]`, normalised at the reference frequency
/// `v0`. All frequencies must be in the unit `poly` is defined against.
///
/// The flux density at `v0` is held fixed at the Perley-Butler value; the
/// four index terms are fitted by Levenberg-Marquardt from a zero initial
/// guess against 10000 evenly-spaced samples of the Perley-Butler law.
pub fn convert_pb_to_casaspi(
    vlower: f64,
    vupper: f64,
    v0: f64,
    poly: SpectralPoly,
) -> Result<CasaSpiModel, ConvertModelError> {
    if vlower >= vupper {
        return Err(ConvertModelError::InvalidRange { vlower, vupper });
    }

    let i_ref = poly.flux_density(v0);

    let step = (vupper - vlower) / (NUM_SAMPLES - 1) as f64;
    let freqs: Vec<f64> = (0..NUM_SAMPLES).map(|i| vlower + step * i as f64).collect();
    let fluxes: Vec<f64> = freqs.iter().map(|&v| poly.flux_density(v)).collect();

    let curve = CasaSpiCurve { i_ref, v0 };
    let fit = curve_fit(&curve, &freqs, &fluxes, [0.0; 4], &FitConfig::default())?;
    debug!(
        "SPI fit finished after {} iterations, chi2 {:e}",
        fit.iterations, fit.chi2
    );

    // NaN standard errors also count as failures.
    if fit.std_errors.iter().any(|&e| !(e < MAX_STD_ERROR)) {
        return Err(ConvertModelError::FitQuality {
            std_errors: fit.std_errors,
        });
    }

    Ok(CasaSpiModel {
        i_ref,
        v0,
        spi: fit.params,
    })
}
