//! Share file format (`.frg`): serialization, parsing and file I/O.
//!
//! ## Text layout
//!
//! ```text
//! (1188054213196758511322097593817, 54462136899031072766431162802660412...)
//! (361559545190290486024612388596, 15438862225740801100000331923312121...)
//! Total count: 2
//! Threshold: 2
//! ```
//!
//! One `(x, y)` line per share in decimal, then the total-count and
//! threshold trailers. Files written by the earlier Spanish-language tool
//! use different trailer wording; both are recognized on read.
//!
//! Parsing is lax on purpose: any line that is neither a well-formed point
//! nor a trailer is skipped with a warning. A share file can therefore be
//! annotated or cut down by hand, at the price that a mangled point line is
//! silently dropped rather than rejected. The threshold trailer is the one
//! line that must be present.

use num_bigint::BigUint;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::io;
use crate::sss::{Point, ShareSet};

pub const TOTAL_PREFIX: &str = "Total count:";
pub const THRESHOLD_PREFIX: &str = "Threshold:";

/// Trailer wording used by share files from the earlier tool.
const LEGACY_TOTAL_PREFIX: &str = "Numero total de contraseñas:";
const LEGACY_THRESHOLD_PREFIX: &str = "Numero necesario de contraseñas para descifrar el archivo:";

/// Suggested share file extension.
pub const SHARE_EXTENSION: &str = "frg";

/// Contents of a parsed share file.
#[derive(Clone, Debug)]
pub struct ShareFile {
    pub points: Vec<Point>,
    /// Informational; a file may hold fewer points than it was written with.
    pub total: Option<u8>,
    pub threshold: u8,
}

impl ShareSet {
    /// Serialize to the text file format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for point in &self.points {
            out.push_str(&format!("{point}\n"));
        }
        out.push_str(&format!("{TOTAL_PREFIX} {}\n", self.total));
        out.push_str(&format!("{THRESHOLD_PREFIX} {}\n", self.threshold));
        out
    }
}

/// Parse the text file format.
pub fn parse_shares(text: &str) -> Result<ShareFile> {
    let mut points = Vec::new();
    let mut total = None;
    let mut threshold = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let threshold_prefixes = [THRESHOLD_PREFIX, LEGACY_THRESHOLD_PREFIX];
        if let Some(rest) = strip_any_prefix(trimmed, &threshold_prefixes) {
            // First trailer wins, like the total below.
            if threshold.is_none() {
                threshold = Some(parse_threshold(rest)?);
            }
            continue;
        }

        if let Some(rest) = strip_any_prefix(trimmed, &[TOTAL_PREFIX, LEGACY_TOTAL_PREFIX]) {
            match rest.trim().parse::<u8>() {
                Ok(n) if total.is_none() => total = Some(n),
                Ok(_) => {}
                Err(_) => warn!(line = line_no, "ignoring unreadable total count"),
            }
            continue;
        }

        match parse_point(trimmed) {
            Some(point) => points.push(point),
            None => warn!(line = line_no, "skipping line that is not a share"),
        }
    }

    let threshold = threshold.ok_or(Error::MissingThreshold)?;

    if let Some(n) = total {
        if n as usize != points.len() {
            warn!(
                expected = n,
                found = points.len(),
                "share file point count differs from its total"
            );
        }
    }

    Ok(ShareFile {
        points,
        total,
        threshold,
    })
}

/// Write a share set to `path` atomically.
pub fn write_shares(path: &Path, shares: &ShareSet) -> Result<()> {
    io::write_atomic(path, shares.to_text().as_bytes())
}

/// Read the points and threshold from a share file.
pub fn read_shares(path: &Path) -> Result<(Vec<Point>, u8)> {
    let file = read_share_file(path)?;
    Ok((file.points, file.threshold))
}

/// Read and parse a share file, keeping the total-count trailer.
pub fn read_share_file(path: &Path) -> Result<ShareFile> {
    let text =
        std::fs::read_to_string(path).map_err(|e| Error::io("read share file", path, e))?;
    parse_shares(&text)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn strip_any_prefix<'a>(line: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| line.strip_prefix(p))
}

fn parse_threshold(rest: &str) -> Result<u8> {
    let rest = rest.trim();
    match rest.parse::<u8>() {
        Ok(t) if t >= 2 => Ok(t),
        _ => Err(Error::MalformedShares(format!(
            "threshold must be an integer in 2..=255, got {rest:?}"
        ))),
    }
}

/// Parse exactly `(digits, digits)`.
fn parse_point(line: &str) -> Option<Point> {
    let inner = line.strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(", ")?;
    Some(Point {
        x: parse_decimal(x)?,
        y: parse_decimal(y)?,
    })
}

fn parse_decimal(s: &str) -> Option<BigUint> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sss::{self, Reduction};

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn small_set() -> ShareSet {
        ShareSet {
            points: vec![
                Point {
                    x: big(11),
                    y: big(1234),
                },
                Point {
                    x: big(22),
                    y: big(5678),
                },
                Point {
                    x: big(33),
                    y: big(9012),
                },
            ],
            total: 3,
            threshold: 2,
        }
    }

    #[test]
    fn text_format_layout() {
        let text = small_set().to_text();
        assert_eq!(
            text,
            "(11, 1234)\n(22, 5678)\n(33, 9012)\nTotal count: 3\nThreshold: 2\n"
        );
    }

    #[test]
    fn roundtrip_text_format() {
        let set = small_set();
        let parsed = parse_shares(&set.to_text()).unwrap();
        assert_eq!(parsed.points, set.points);
        assert_eq!(parsed.total, Some(3));
        assert_eq!(parsed.threshold, 2);
    }

    #[test]
    fn roundtrip_real_shares() {
        let set = sss::split_secret(&[0x5a; 32], 6, 4, Reduction::Integer).unwrap();
        let parsed = parse_shares(&set.to_text()).unwrap();
        assert_eq!(parsed.points, set.points);
        assert_eq!(parsed.threshold, 4);
    }

    #[test]
    fn legacy_trailers_recognized() {
        let text = "(5, 7)\n(6, 8)\n\
                    Numero total de contraseñas: 2\n\
                    Numero necesario de contraseñas para descifrar el archivo: 2\n";
        let parsed = parse_shares(text).unwrap();
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.total, Some(2));
        assert_eq!(parsed.threshold, 2);
    }

    #[test]
    fn missing_threshold_is_an_error() {
        let text = "(5, 7)\n(6, 8)\nTotal count: 2\n";
        assert!(matches!(parse_shares(text), Err(Error::MissingThreshold)));
    }

    #[test]
    fn bad_threshold_value_is_an_error() {
        for bad in ["Threshold: three", "Threshold: 1", "Threshold: 300", "Threshold:"] {
            let text = format!("(5, 7)\n{bad}\n");
            assert!(
                matches!(parse_shares(&text), Err(Error::MalformedShares(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn malformed_point_lines_are_skipped() {
        let text = "# my shares\n\
                    (5, 7)\n\
                    (6,8)\n\
                    (-1, 3)\n\
                    (9, 1x)\n\
                    (10, 12) trailing\n\
                    \n\
                    \t(11, 13)  \n\
                    Threshold: 2\n";
        let parsed = parse_shares(text).unwrap();
        let xs: Vec<_> = parsed.points.iter().map(|p| p.x.clone()).collect();
        let ys: Vec<_> = parsed.points.iter().map(|p| p.y.clone()).collect();
        assert_eq!(xs, vec![big(5), big(11)]);
        assert_eq!(ys, vec![big(7), big(13)]);
        assert_eq!(parsed.total, None);
    }

    #[test]
    fn points_keep_file_order() {
        let text = "(3, 30)\n(1, 10)\n(2, 20)\nThreshold: 3\n";
        let parsed = parse_shares(text).unwrap();
        let xs: Vec<BigUint> = parsed.points.into_iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![big(3), big(1), big(2)]);
    }

    #[test]
    fn trailer_may_precede_points() {
        let text = "Threshold: 2\n(1, 10)\n(2, 20)\n";
        let parsed = parse_shares(text).unwrap();
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.threshold, 2);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.frg");
        let set = small_set();
        write_shares(&path, &set).unwrap();

        let (points, threshold) = read_shares(&path).unwrap();
        assert_eq!(points, set.points);
        assert_eq!(threshold, 2);
    }

    #[test]
    fn reading_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_shares(&dir.path().join("absent.frg")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
