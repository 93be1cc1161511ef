// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors associated with reading a calibrator catalogue.
#[derive(Error, Debug)]
pub enum ReadCalTableError {
    #[error("Catalogue line {line_num}: Illegal line: '{line}'")]
    IllegalLine { line_num: u32, line: String },

    /// Error when converting a string to a float.
    #[error("Catalogue line {line_num}: Error converting string {string} to a float")]
    ParseFloat { line_num: u32, string: String },

    #[error("Catalogue line {line_num}: Epoch {string} does not fit in a u32")]
    InvalidEpoch { line_num: u32, string: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
