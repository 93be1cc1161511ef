// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::fit::FitError;

/// Errors associated with converting a Perley-Butler model to a CASA/Meqtrees
/// spectral-index model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertModelError {
    #[error("vlower ({vlower}) must be lower than vupper ({vupper})")]
    InvalidRange { vlower: f64, vupper: f64 },

    #[error("The fitted spectral-index terms have standard errors {std_errors:?}, exceeding 1e-6; the requested band is too wide for the conventions to be reconciled")]
    FitQuality { std_errors: [f64; 4] },

    #[error(transparent)]
    Fit(#[from] FitError),
}
