// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Types for flux-calibrator catalogues.

mod error;
mod read;

pub use error::ReadCalTableError;
pub use read::{parse_caltable, read_caltable};

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A right ascension and declination pair, both in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RADec {
    /// Right ascension \[radians\]
    pub ra: f64,

    /// Declination \[radians\]
    pub dec: f64,
}

/// A third-order polynomial in `log10` frequency, describing a Perley-Butler
/// flux model:
///
/// S(f) = 10^(a + b log10(f) + c log10(f)² + d log10(f)³) \[Jy\]
///
/// The frequency unit is whatever the coefficients were derived against
/// (catalogues use MHz, the Perley-Butler papers use GHz); [`SpectralPoly::rebase`]
/// moves between units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPoly {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl SpectralPoly {
    /// The flux density at `freq` \[Jy\], where `freq` is in the unit the
    /// coefficients were derived against.
    pub fn flux_density(self, freq: f64) -> f64 {
        let l = freq.log10();
        10_f64.powf(self.a + self.b * l + self.c * l.powi(2) + self.d * l.powi(3))
    }

    /// Re-express the polynomial under the substitution
    /// `log10(f) -> log10(f) + k`, i.e. against a frequency unit `10^k` times
    /// smaller. MHz coefficients become GHz coefficients with
    /// `k = log10(1000)`; applying the shift again with `-k` recovers the
    /// original coefficients.
    pub fn rebase(self, k: f64) -> SpectralPoly {
        let SpectralPoly { a, b, c, d } = self;
        SpectralPoly {
            a: a + b * k + c * k.powi(2) + d * k.powi(3),
            b: b + 2.0 * c * k + 3.0 * d * k.powi(2),
            c: c + 3.0 * d * k,
            d,
        }
    }
}

/// A flux calibrator: a position, coordinate epoch and spectral model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibrator {
    /// Coordinate equinox year.
    pub epoch: u32,

    /// Source position \[radians\].
    pub radec: RADec,

    /// Spectral model with frequency in GHz.
    pub ghz: SpectralPoly,

    /// Spectral model as given in the catalogue, frequency in MHz.
    pub mhz: SpectralPoly,
}

/// An [`IndexMap`] of calibrator names for keys and [`Calibrator`] structs for
/// values.
///
/// By making [`CalTable`] a new type (specifically, an anonymous struct),
/// useful methods can be put onto it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalTable(IndexMap<String, Calibrator>);

impl CalTable {
    /// Create an empty [`CalTable`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A multi-line description of the catalogue, one calibrator per line in
    /// map order, preceded by a blank line. Coordinates are printed in radians
    /// to 2 decimal places, GHz coefficients to 4.
    pub fn table_string(&self) -> String {
        std::iter::once(String::new())
            .chain(self.iter().map(|(name, cal)| {
                format!(
                    "\t{}\tEpoch:{}\tRA:{:3.2}\tDEC:{:3.2}\ta:{:.4}\tb:{:.4}\tc:{:.4}\td:{:.4}",
                    name,
                    cal.epoch,
                    cal.radec.ra,
                    cal.radec.dec,
                    cal.ghz.a,
                    cal.ghz.b,
                    cal.ghz.c,
                    cal.ghz.d
                )
            }))
            .join("\n")
    }
}

impl From<IndexMap<String, Calibrator>> for CalTable {
    fn from(map: IndexMap<String, Calibrator>) -> Self {
        Self(map)
    }
}

impl Deref for CalTable {
    type Target = IndexMap<String, Calibrator>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CalTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, Calibrator)> for CalTable {
    fn from_iter<I: IntoIterator<Item = (String, Calibrator)>>(iter: I) -> Self {
        let mut c = Self::new();
        for i in iter {
            c.insert(i.0, i.1);
        }
        c
    }
}

impl IntoIterator for CalTable {
    type Item = (String, Calibrator);
    type IntoIter = indexmap::map::IntoIter<String, Calibrator>;

    fn into_iter(self) -> indexmap::map::IntoIter<String, Calibrator> {
        self.0.into_iter()
    }
}
