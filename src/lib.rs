// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Flux-calibrator catalogues and spectral-model conversion for radio
interferometry calibration.

This crate reads "southern standard"-style calibrator catalogues (position,
epoch and a third-order polynomial spectral model per source) and converts
Perley-Butler polynomial flux models into the CASA/Meqtrees spectral-index
convention used by other calibration pipelines.
 */

pub mod caltable;
pub mod convert;
pub mod fit;

// Re-exports.
pub use caltable::{
    parse_caltable, read_caltable, CalTable, Calibrator, RADec, ReadCalTableError, SpectralPoly,
};
pub use convert::{convert_pb_to_casaspi, CasaSpiModel, ConvertModelError};
pub use fit::{curve_fit, CurveModel, FitConfig, FitError, FitResult};
