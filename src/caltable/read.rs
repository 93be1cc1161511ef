// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parsing of calibrator standard catalogues.
//!
//! The format is line oriented: `//` begins a comment running to the end of
//! the line, blank lines are ignored, and every other line must describe a
//! single calibrator, e.g.
//!
//! ```text
//! name=3C286 epoch=2000 ra=13h31m08.29s dec=+30d30m33s a=1.2515 b=-0.4605 c=-0.1715 d=0.0336
//! ```
//!
//! The spectral coefficients are specified against frequency in MHz; records
//! carry both the MHz coefficients as written and their GHz re-expression.

use std::{fs::File, io::BufReader, path::Path};

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use super::{CalTable, Calibrator, RADec, ReadCalTableError, SpectralPoly};

lazy_static! {
    // One record per line: fields in fixed order, separated by spaces or
    // tabs, with nothing trailing. The sexagesimal signs ride on the hour and
    // degree fields.
    static ref RE_RECORD: Regex = Regex::new(concat!(
        r"^name=(?P<name>[0-9A-Za-z\-+_ ]+)[ \t]+",
        r"epoch=(?P<epoch>[0-9]+)[ \t]+",
        r"ra=(?P<rah>[+\-]?[0-9]+)h(?P<ram>[0-9]+)m(?P<ras>[0-9]+(?:\.[0-9]+)?)s[ \t]+",
        r"dec=(?P<decd>[+\-]?[0-9]+)d(?P<decm>[0-9]+)m(?P<decs>[0-9]+(?:\.[0-9]+)?)s[ \t]+",
        r"a=(?P<a>[+\-]?[0-9]+(?:\.[0-9]+)?)[ \t]+",
        r"b=(?P<b>[+\-]?[0-9]+(?:\.[0-9]+)?)[ \t]+",
        r"c=(?P<c>[+\-]?[0-9]+(?:\.[0-9]+)?)[ \t]+",
        r"d=(?P<d>[+\-]?[0-9]+(?:\.[0-9]+)?)$"
    ))
    .unwrap();
}

/// Read a calibrator standard catalogue file into a [`CalTable`].
pub fn read_caltable<P: AsRef<Path>>(path: P) -> Result<CalTable, ReadCalTableError> {
    fn inner(path: &Path) -> Result<CalTable, ReadCalTableError> {
        debug!("Attempting to read calibrator catalogue {}", path.display());
        let mut f = BufReader::new(File::open(path)?);
        parse_caltable(&mut f)
    }
    inner(path.as_ref())
}

/// Parse a buffer containing a calibrator standard catalogue into a
/// [`CalTable`]. The first line that is neither blank, comment-only nor a
/// well-formed record aborts the parse; no partial catalogue is returned.
pub fn parse_caltable<T: std::io::BufRead>(buf: &mut T) -> Result<CalTable, ReadCalTableError> {
    let mut cal_table = CalTable::new();
    let mut line = String::new();
    let mut line_num: u32 = 0;

    let parse_float = |string: &str, line_num: u32| -> Result<f64, ReadCalTableError> {
        string
            .parse()
            .map_err(|_| ReadCalTableError::ParseFloat {
                line_num,
                string: string.to_string(),
            })
    };

    while buf.read_line(&mut line)? > 0 {
        line_num += 1;

        // Everything from the first `//` to the end of the line is a comment.
        // Trailing whitespace left behind by a stripped comment is not part
        // of the record.
        let record = match line.split_once("//") {
            Some((before, _)) => before,
            None => line.as_str(),
        }
        .trim_end();

        if record.is_empty() {
            line.clear();
            continue;
        }

        let caps = match RE_RECORD.captures(record) {
            Some(caps) => caps,
            None => {
                return Err(ReadCalTableError::IllegalLine {
                    line_num,
                    line: line.trim_end_matches(['\r', '\n']).to_string(),
                })
            }
        };

        let name = &caps["name"];
        let epoch: u32 =
            caps["epoch"]
                .parse()
                .map_err(|_| ReadCalTableError::InvalidEpoch {
                    line_num,
                    string: caps["epoch"].to_string(),
                })?;

        // RA hours -> degrees -> radians. The sign is taken from the hour
        // field only.
        let h = parse_float(&caps["rah"], line_num)?;
        let m = parse_float(&caps["ram"], line_num)?;
        let s = parse_float(&caps["ras"], line_num)?;
        let ra = ((h + m / 60.0 + s / 3600.0) / 24.0 * 360.0).to_radians();

        // Degrees, minutes and seconds are summed without the /60 and /3600
        // scaling; existing catalogues and their downstream consumers expect
        // exactly these values.
        let d = parse_float(&caps["decd"], line_num)?;
        let m = parse_float(&caps["decm"], line_num)?;
        let s = parse_float(&caps["decs"], line_num)?;
        let dec = (d + m + s).to_radians();

        let mhz = SpectralPoly {
            a: parse_float(&caps["a"], line_num)?,
            b: parse_float(&caps["b"], line_num)?,
            c: parse_float(&caps["c"], line_num)?,
            d: parse_float(&caps["d"], line_num)?,
        };
        // Catalogue spectra are against MHz; carry the GHz form as well.
        let ghz = mhz.rebase(1000_f64.log10());

        trace!("Catalogue line {line_num}: calibrator {name}");
        // Later definitions of the same name deliberately overwrite earlier
        // ones.
        cal_table.insert(
            name.to_string(),
            Calibrator {
                epoch,
                radec: RADec { ra, dec },
                ghz,
                mhz,
            },
        );

        line.clear();
    }

    Ok(cal_table)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use approx::assert_abs_diff_eq;
    // indoc allows us to write test catalogues that look like they would in a
    // file.
    use indoc::indoc;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn parse_single_calibrator() {
        let mut buf = Cursor::new(indoc! {"
        name=3C286 epoch=2000 ra=13h31m08.29s dec=+30d30m33s a=1.0 b=0.0 c=0.0 d=0.0
        "});

        let result = parse_caltable(&mut buf);
        assert!(result.is_ok(), "{result:?}");
        let table = result.unwrap();
        assert_eq!(table.len(), 1);

        let cal = table.get("3C286").unwrap();
        assert_eq!(cal.epoch, 2000);
        assert_abs_diff_eq!(cal.radec.ra, 3.5392579242309639, epsilon = 1e-12);
        assert_abs_diff_eq!(cal.radec.dec, 1.6231562043547265, epsilon = 1e-12);
        assert_eq!(
            cal.mhz,
            SpectralPoly {
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 0.0
            }
        );
        // With b = c = d = 0, re-basing to GHz changes nothing.
        assert_eq!(cal.ghz, cal.mhz);
    }

    #[test]
    fn parse_rebases_spectra_to_ghz() {
        let mut buf = Cursor::new(indoc! {"
        name=3C48 epoch=2000 ra=01h37m41.3s dec=+33d09m35s a=1.2515 b=-0.4605 c=-0.1715 d=0.0336
        "});

        let table = parse_caltable(&mut buf).unwrap();
        let cal = table.get("3C48").unwrap();
        assert_eq!(cal.ghz, cal.mhz.rebase(1000_f64.log10()));
        assert_abs_diff_eq!(cal.ghz.a, -0.7663, epsilon = 1e-12);
        assert_abs_diff_eq!(cal.ghz.b, -0.5823, epsilon = 1e-12);
        assert_abs_diff_eq!(cal.ghz.c, 0.1309, epsilon = 1e-12);
        assert_abs_diff_eq!(cal.ghz.d, 0.0336, epsilon = 1e-12);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut buf = Cursor::new(indoc! {"
        // southern standard extract

        name=PKS1934-638 epoch=2000 ra=19h39m25.02s dec=-63d42m45.6s a=-30.7667 b=26.4908 c=-7.0977 d=0.605334 // Reynolds

        // done
        "});

        let table = parse_caltable(&mut buf).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("PKS1934-638"));
    }

    #[test]
    fn comments_only_file_is_empty() {
        let mut buf = Cursor::new(indoc! {"
        // a catalogue with

        // nothing in it
        "});

        let table = parse_caltable(&mut buf).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn first_illegal_line_aborts() {
        let mut buf = Cursor::new(indoc! {"
        name=A epoch=2000 ra=0h0m0s dec=0d0m0s a=1.0 b=0.0 c=0.0 d=0.0
        // a comment does not count as a line of interest
        name=B epoch=epoch ra=0h0m0s dec=0d0m0s a=1.0 b=0.0 c=0.0 d=0.0
        name=C epoch=2000 ra=0h0m0s dec=0d0m0s a=1.0 b=0.0 c=0.0 d=0.0
        "});

        let result = parse_caltable(&mut buf);
        match result {
            Err(ReadCalTableError::IllegalLine { line_num, line }) => {
                assert_eq!(line_num, 3);
                assert!(line.starts_with("name=B"), "{line}");
            }
            other => panic!("expected IllegalLine, got {other:?}"),
        }
    }

    #[test]
    fn trailing_junk_is_illegal() {
        let mut buf = Cursor::new(indoc! {"
        name=A epoch=2000 ra=0h0m0s dec=0d0m0s a=1.0 b=0.0 c=0.0 d=0.0 e=1.0
        "});

        let result = parse_caltable(&mut buf);
        assert!(
            matches!(result, Err(ReadCalTableError::IllegalLine { line_num: 1, .. })),
            "{result:?}"
        );
    }

    #[test]
    fn duplicate_name_last_wins() {
        let mut buf = Cursor::new(indoc! {"
        name=3C286 epoch=1950 ra=13h28m49.66s dec=+30d45m58.6s a=1.0 b=0.0 c=0.0 d=0.0
        name=3C286 epoch=2000 ra=13h31m08.29s dec=+30d30m33s a=2.0 b=0.0 c=0.0 d=0.0
        "});

        let table = parse_caltable(&mut buf).unwrap();
        assert_eq!(table.len(), 1);
        let cal = table.get("3C286").unwrap();
        assert_eq!(cal.epoch, 2000);
        assert_abs_diff_eq!(cal.mhz.a, 2.0);
    }

    #[test]
    fn name_may_contain_spaces() {
        let mut buf = Cursor::new(indoc! {"
        name=3C 286 epoch=2000 ra=13h31m08.29s dec=+30d30m33s a=1.0 b=0.0 c=0.0 d=0.0
        "});

        let table = parse_caltable(&mut buf).unwrap();
        assert!(table.contains_key("3C 286"));
    }

    // The declination conversion sums degrees, minutes and seconds without
    // the /60 and /3600 scaling. These values pin that behaviour; changing
    // them changes every downstream consumer's calibrator positions.
    #[test]
    fn dec_flat_sum_pinned() {
        let mut buf = Cursor::new(indoc! {"
        name=N epoch=2000 ra=0h0m0s dec=+30d30m33s a=1.0 b=0.0 c=0.0 d=0.0
        name=S epoch=2000 ra=0h0m0s dec=-45d10m20s a=1.0 b=0.0 c=0.0 d=0.0
        "});

        let table = parse_caltable(&mut buf).unwrap();
        // (30 + 30 + 33) degrees.
        assert_abs_diff_eq!(
            table.get("N").unwrap().radec.dec,
            1.6231562043547265,
            epsilon = 1e-15
        );
        // (-45 + 10 + 20) degrees; the sign rides on the degree field only.
        assert_abs_diff_eq!(
            table.get("S").unwrap().radec.dec,
            -0.26179938779914941,
            epsilon = 1e-15
        );
    }

    #[test]
    fn ra_sign_rides_on_hour_field() {
        let mut buf = Cursor::new(indoc! {"
        name=W epoch=2000 ra=-01h30m00s dec=0d0m0s a=1.0 b=0.0 c=0.0 d=0.0
        "});

        let table = parse_caltable(&mut buf).unwrap();
        // (-1 + 30/60) hours of RA, i.e. -7.5 degrees.
        assert_abs_diff_eq!(
            table.get("W").unwrap().radec.ra,
            -0.13089969389957471,
            epsilon = 1e-15
        );
    }

    #[test]
    fn read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name=3C286 epoch=2000 ra=13h31m08.29s dec=+30d30m33s a=1.0 b=0.0 c=0.0 d=0.0"
        )
        .unwrap();
        file.flush().unwrap();

        let table = read_caltable(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_caltable("/does/not/exist.txt");
        assert!(matches!(result, Err(ReadCalTableError::IO(_))), "{result:?}");
    }
}
