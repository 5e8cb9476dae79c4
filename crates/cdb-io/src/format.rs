//! Fortran-style format lines and fixed-width field parsing/formatting.
//!
//! Every data block in a CDB file declares its own field layout with a
//! format line such as `(3i8,6e20.13)` or `(19i8)`. The widths declared
//! there are binding for both directions: the reader slices lines at
//! exactly those widths and the writer pads to them.

use crate::error::{ArchiveError, Result};

/// Field layout of a node block: leading integer fields followed by
/// floating-point fields, e.g. `(3i8,6e20.13)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFormat {
    /// Number of leading integer fields (node id plus unused fields).
    pub int_fields: usize,
    /// Width of each integer field.
    pub int_width: usize,
    /// Number of floating fields (3 coordinates, optionally 3 angles).
    pub float_fields: usize,
    /// Width of each floating field.
    pub float_width: usize,
}

/// Field layout of an all-integer block, e.g. `(19i8)` or `(8i10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntFormat {
    /// Maximum number of fields per physical line.
    pub fields_per_line: usize,
    /// Width of each field.
    pub width: usize,
}

/// Parse a node block format line such as `(3i8,6e20.13)`.
pub fn parse_node_format(line: &str, lineno: usize) -> Result<NodeFormat> {
    let inner = strip_parens(line, lineno)?;
    let mut parts = inner.split(',');

    let ints = parts
        .next()
        .ok_or_else(|| ArchiveError::format(lineno, "empty node format"))?;
    let (int_fields, int_width) = split_spec(ints, 'i', lineno)?;

    let floats = parts
        .next()
        .ok_or_else(|| ArchiveError::format(lineno, "node format is missing float fields"))?;
    let (float_fields, float_width) = split_spec(floats, 'e', lineno)?;

    Ok(NodeFormat {
        int_fields,
        int_width,
        float_fields,
        float_width,
    })
}

/// Parse an integer block format line such as `(19i8)`.
pub fn parse_int_format(line: &str, lineno: usize) -> Result<IntFormat> {
    let inner = strip_parens(line, lineno)?;
    let spec = inner.split(',').next().unwrap_or(inner);
    let (fields_per_line, width) = split_spec(spec, 'i', lineno)?;
    Ok(IntFormat {
        fields_per_line,
        width,
    })
}

fn strip_parens(line: &str, lineno: usize) -> Result<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ArchiveError::format(lineno, format!("malformed format line {trimmed:?}")))
}

/// Split a single field spec like `3i8` or `6e20.13` into (count, width).
fn split_spec(spec: &str, kind: char, lineno: usize) -> Result<(usize, usize)> {
    let spec = spec.trim();
    let pos = spec
        .find(kind)
        .or_else(|| spec.find(kind.to_ascii_uppercase()))
        .ok_or_else(|| {
            ArchiveError::format(lineno, format!("expected {kind:?} descriptor in {spec:?}"))
        })?;
    let count: usize = spec[..pos]
        .parse()
        .map_err(|_| ArchiveError::format(lineno, format!("bad field count in {spec:?}")))?;
    // Width runs up to the precision separator, if any.
    let rest = &spec[pos + 1..];
    let width_str = rest.split('.').next().unwrap_or(rest);
    let width: usize = width_str
        .parse()
        .map_err(|_| ArchiveError::format(lineno, format!("bad field width in {spec:?}")))?;
    Ok((count, width))
}

/// Parse the fixed-width integer field starting at byte `start`.
///
/// A field shorter than `width` (line ends early) is accepted as long as
/// it still holds digits; an unparsable field is a hard format error.
pub fn fixed_int(line: &str, start: usize, width: usize, lineno: usize) -> Result<i32> {
    let field = field_slice(line, start, width);
    field.trim().parse().map_err(|_| {
        ArchiveError::format(
            lineno,
            format!("expected integer of width {width} at column {start}, found {field:?}"),
        )
    })
}

/// Parse a fixed-width integer field, returning `None` when it does not
/// parse (used for sentinel detection).
pub fn try_fixed_int(line: &str, start: usize, width: usize) -> Option<i32> {
    field_slice(line, start, width).trim().parse().ok()
}

/// Parse the fixed-width floating field starting at byte `start`.
pub fn fixed_float(line: &str, start: usize, width: usize, lineno: usize) -> Result<f64> {
    let field = field_slice(line, start, width);
    field.trim().parse().map_err(|_| {
        ArchiveError::format(
            lineno,
            format!("expected float of width {width} at column {start}, found {field:?}"),
        )
    })
}

/// Slice `width` bytes starting at `start`, clamped to the line length.
pub fn field_slice(line: &str, start: usize, width: usize) -> &str {
    let end = (start + width).min(line.len());
    line.get(start..end).unwrap_or("")
}

/// Count the integer fields actually present on a line for the given
/// width (trailing whitespace ignored).
pub fn fields_on_line(line: &str, width: usize) -> usize {
    let len = line.trim_end().len();
    len.div_ceil(width)
}

/// C-style `%<width>d`: right-aligned decimal.
pub fn fmt_int(value: i64, width: usize) -> String {
    format!("{value:>width$}")
}

/// C-style `%<width>.<precision>E`: upper-case scientific notation with a
/// sign and at least two exponent digits, right-aligned.
pub fn fmt_exp(value: f64, width: usize, precision: usize) -> String {
    let formatted = format!("{value:.precision$e}");
    // `{:e}` output always carries an exponent separator.
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(stripped) => ('-', stripped),
        None => ('+', exponent),
    };
    format!("{:>width$}", format!("{mantissa}E{sign}{digits:0>2}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_node_format_with_angles() {
        let fmt = parse_node_format("(3i8,6e20.13)", 1).unwrap();
        assert_eq!(
            fmt,
            NodeFormat {
                int_fields: 3,
                int_width: 8,
                float_fields: 6,
                float_width: 20,
            }
        );
    }

    #[test]
    fn parses_node_format_without_angles() {
        let fmt = parse_node_format("(3i8,3e20.13)", 1).unwrap();
        assert_eq!(fmt.float_fields, 3);
        assert_eq!(fmt.float_width, 20);
    }

    #[test]
    fn parses_int_format() {
        assert_eq!(
            parse_int_format("(19i8)", 1).unwrap(),
            IntFormat {
                fields_per_line: 19,
                width: 8,
            }
        );
        assert_eq!(parse_int_format("(8i10)", 1).unwrap().width, 10);
    }

    #[test]
    fn rejects_malformed_format_lines() {
        assert!(parse_node_format("3i8,6e20.13", 7).is_err());
        assert!(parse_int_format("(i8)", 7).is_err());
        assert!(parse_node_format("(3i8)", 7).is_err());
    }

    #[test]
    fn fixed_fields_parse_at_declared_widths() {
        let line = "       1       0       0 1.0000000000000E+00";
        assert_eq!(fixed_int(line, 0, 8, 1).unwrap(), 1);
        assert_eq!(fixed_float(line, 24, 20, 1).unwrap(), 1.0);
    }

    #[test]
    fn malformed_fixed_field_is_an_error() {
        let err = fixed_int("     abc", 0, 8, 3).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn formats_c_style_integers() {
        assert_eq!(fmt_int(1, 8), "       1");
        assert_eq!(fmt_int(-1, 8), "      -1");
        assert_eq!(fmt_int(123456, 10), "    123456");
    }

    #[test]
    fn formats_c_style_exponents() {
        assert_eq!(fmt_exp(1.0, 20, 12), "  1.000000000000E+00");
        assert_eq!(fmt_exp(0.0, 20, 12), "  0.000000000000E+00");
        assert_eq!(fmt_exp(-2.5e-3, 20, 12), " -2.500000000000E-03");
        assert_eq!(fmt_exp(6.02e23, 20, 12), "  6.020000000000E+23");
    }

    #[test]
    fn formatted_exponents_parse_back() {
        for value in [0.0, 1.0, -1.0, 3.14159e-8, -9.81e12] {
            let text = fmt_exp(value, 20, 12);
            assert_eq!(text.len(), 20);
            let back: f64 = text.trim().parse().unwrap();
            assert!((back - value).abs() <= value.abs() * 1e-12);
        }
    }
}
