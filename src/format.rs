//! Character output for `DecimalDigits`.
//!
//! The shortest digits of a value are rendered in one of four styles. The
//! precision styles re-round those digits half up first, so the output is
//! always a rounding of the shortest form rather than of the exact binary
//! value.

use std::fmt::{self, Write};
use std::str::FromStr;

use crate::classify::RawFloat;
use crate::error::Error;
use crate::number::{self, DecimalDigits};

/// Precision used when a style string names a conversion without one.
pub const DEFAULT_PRECISION: u32 = 6;

/// How a value is rendered.
///
/// ```
/// # use floating_decimal::{format_value, FormatStyle};
/// let style: FormatStyle = ".2f".parse().unwrap();
///
/// assert_eq!(style, FormatStyle::DecimalFloat { precision: 2 });
/// assert_eq!(format_value(100.0, style), "100.00");
/// assert_eq!(format_value(0.0001, FormatStyle::default()), "1.0E-4");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FormatStyle {
    /// Plain digits for magnitudes in `[1e-3, 1e7)`, scientific otherwise,
    /// always with at least one digit after the point.
    #[default]
    Compatible,

    /// Fixed number of digits after the point.
    DecimalFloat { precision: u32 },

    /// One digit, the point, `precision` digits, then `E` and the exponent.
    Scientific { precision: u32 },

    /// `precision` significant digits, in whichever of the two forms above
    /// suits the magnitude.
    General { precision: u32 },
}

impl FormatStyle {
    /// Whether digit generation must produce a second significant digit for
    /// a value whose decimal exponent estimate is `estimate`.
    ///
    /// Only the plain range of `Compatible` settles for a single digit; the
    /// other forms keep one more so a value like `4.9E-324` is not shown as
    /// `5.0E-324`.
    #[inline]
    pub fn forces_second_digit(&self, estimate: i32) -> bool {
        match self {
            FormatStyle::Compatible => !(-3 < estimate && estimate < 8),
            _ => true,
        }
    }
}

impl FromStr for FormatStyle {
    type Err = Error;

    /// Parses printf-like conversions: `f`, `.2f`, `e`, `.3E`, `g`, `.4G`,
    /// optionally after a `%`. The empty string and `compatible` select
    /// `Compatible`.
    fn from_str(s: &str) -> Result<FormatStyle, Error> {
        let unknown = || Error::UnknownStyle(s.to_string());

        let spec = s.strip_prefix('%').unwrap_or(s);
        if spec.is_empty() || spec.eq_ignore_ascii_case("compatible") {
            return Ok(FormatStyle::Compatible);
        }

        let mut chars = spec.chars();
        let conversion = chars.next_back().ok_or_else(unknown)?;
        let head = chars.as_str();

        let precision = if head.is_empty() {
            DEFAULT_PRECISION
        } else {
            let digits = head.strip_prefix('.').ok_or_else(unknown)?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(unknown());
            }
            if digits.is_empty() {
                0
            } else {
                digits.parse().map_err(|_| unknown())?
            }
        };

        match conversion {
            'f' | 'F' => Ok(FormatStyle::DecimalFloat { precision }),
            'e' | 'E' => Ok(FormatStyle::Scientific { precision }),
            'g' | 'G' => Ok(FormatStyle::General { precision }),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FormatStyle::Compatible => f.write_str("compatible"),
            FormatStyle::DecimalFloat { precision } => write!(f, ".{}f", precision),
            FormatStyle::Scientific { precision } => write!(f, ".{}E", precision),
            FormatStyle::General { precision } => write!(f, ".{}G", precision),
        }
    }
}

/// Render `value` in `style`.
pub fn format(value: &DecimalDigits, style: FormatStyle) -> String {
    let mut out = String::with_capacity(32);
    // Writing into a String never fails
    let _ = write(&mut out, value, style);
    out
}

/// Render `value` in `style`, applying the style's digit generation rules.
/// This is what callers holding a float want.
///
/// ```
/// # use floating_decimal::{format_value, FormatStyle};
/// assert_eq!(format_value(f64::MIN_POSITIVE / 4503599627370496.0, FormatStyle::Compatible), "4.9E-324");
/// assert_eq!(format_value(123456789.0, FormatStyle::Scientific { precision: 3 }), "1.235E8");
/// ```
pub fn format_value<F: RawFloat>(value: F, style: FormatStyle) -> String {
    format(&number::styled(value, style), style)
}

/// Render `value` in `style` into any `fmt::Write`.
pub fn write<W: Write>(out: &mut W, value: &DecimalDigits, style: FormatStyle) -> fmt::Result {
    if value.is_sign_negative() {
        out.write_char('-')?;
    }

    if value.is_exceptional() {
        // Infinity or NaN
        return out.write_str(std::str::from_utf8(value.digits()).map_err(|_| fmt::Error)?);
    }

    match style {
        FormatStyle::Compatible => write_compatible(out, value),
        FormatStyle::DecimalFloat { precision } => {
            let rounded = value.round_to(value.exponent().saturating_add(clamp(precision)));
            write_decimal(out, &rounded, precision)
        }
        FormatStyle::Scientific { precision } => {
            let rounded = value.round_to(clamp(precision).saturating_add(1));
            write_scientific(out, &rounded, precision)
        }
        FormatStyle::General { precision } => {
            let precision = precision.max(1);
            let rounded = value.round_to(clamp(precision));
            let exponent = if rounded.is_zero() { 1 } else { rounded.exponent() };
            let x = exponent - 1;

            if x < -4 || x >= clamp(precision) {
                write_scientific(out, &rounded, precision - 1)
            } else {
                write_decimal(out, &rounded, (clamp(precision) - exponent) as u32)
            }
        }
    }
}

#[inline]
fn clamp(precision: u32) -> i32 {
    precision.min(i32::MAX as u32) as i32
}

fn write_zeros<W: Write>(out: &mut W, count: i32) -> fmt::Result {
    for _ in 0..count {
        out.write_char('0')?;
    }
    Ok(())
}

fn write_digits<W: Write>(out: &mut W, digits: &[u8]) -> fmt::Result {
    for &d in digits {
        out.write_char(d as char)?;
    }
    Ok(())
}

fn write_compatible<W: Write>(out: &mut W, value: &DecimalDigits) -> fmt::Result {
    let digits = value.digits();
    let n = digits.len() as i32;
    let e = value.exponent();

    if 0 < e && e < 8 {
        if n <= e {
            write_digits(out, digits)?;
            write_zeros(out, e - n)?;
            out.write_str(".0")
        } else {
            write_digits(out, &digits[..e as usize])?;
            out.write_char('.')?;
            write_digits(out, &digits[e as usize..])
        }
    } else if -3 < e && e <= 0 {
        out.write_str("0.")?;
        write_zeros(out, -e)?;
        write_digits(out, digits)
    } else {
        write_digits(out, &digits[..1])?;
        out.write_char('.')?;
        if n > 1 {
            write_digits(out, &digits[1..])?;
        } else {
            out.write_char('0')?;
        }
        write!(out, "E{}", e - 1)
    }
}

// `value` is already rounded to `precision` places after the point
fn write_decimal<W: Write>(out: &mut W, value: &DecimalDigits, precision: u32) -> fmt::Result {
    let digits = value.digits();
    let n = digits.len() as i32;
    let e = value.exponent();

    if e > 0 {
        write_digits(out, &digits[..e.min(n) as usize])?;
        write_zeros(out, e - n)?;
    } else {
        out.write_char('0')?;
    }

    if precision == 0 {
        return Ok(());
    }

    out.write_char('.')?;
    for i in 0..precision {
        let index = e as i64 + i as i64;
        let digit = if index >= 0 && index < n as i64 { digits[index as usize] } else { b'0' };
        out.write_char(digit as char)?;
    }
    Ok(())
}

// `value` is already rounded to `precision + 1` significant digits
fn write_scientific<W: Write>(out: &mut W, value: &DecimalDigits, precision: u32) -> fmt::Result {
    let digits = value.digits();

    write_digits(out, &digits[..1])?;
    if precision > 0 {
        out.write_char('.')?;
        for i in 1..=precision as usize {
            out.write_char(digits.get(i).map_or('0', |&d| d as char))?;
        }
    }

    let exponent = if value.is_zero() { 0 } else { value.exponent() - 1 };
    write!(out, "E{}", exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compatible(value: f64) -> String {
        format_value(value, FormatStyle::Compatible)
    }

    fn fixed(value: f64, precision: u32) -> String {
        format_value(value, FormatStyle::DecimalFloat { precision })
    }

    fn sci(value: f64, precision: u32) -> String {
        format_value(value, FormatStyle::Scientific { precision })
    }

    fn general(value: f64, precision: u32) -> String {
        format_value(value, FormatStyle::General { precision })
    }

    #[test]
    fn compatible_plain_range() {
        assert_eq!(compatible(1.0), "1.0");
        assert_eq!(compatible(100.0), "100.0");
        assert_eq!(compatible(0.5), "0.5");
        assert_eq!(compatible(1234.5), "1234.5");
        assert_eq!(compatible(123.456), "123.456");
        assert_eq!(compatible(0.001), "0.001");
        assert_eq!(compatible(-0.0125), "-0.0125");
        assert_eq!(compatible(1234567.0), "1234567.0");
    }

    #[test]
    fn compatible_scientific_range() {
        assert_eq!(compatible(0.0001), "1.0E-4");
        assert_eq!(compatible(1e-5), "1.0E-5");
        assert_eq!(compatible(12345678.0), "1.2345678E7");
        assert_eq!(compatible(1e7), "1.0E7");
        assert_eq!(compatible(1e21), "1.0E21");
        assert_eq!(compatible(f64::MAX), "1.7976931348623157E308");
        assert_eq!(compatible(f64::from_bits(1)), "4.9E-324");
        assert_eq!(format_value(f32::from_bits(1), FormatStyle::Compatible), "1.4E-45");
        assert_eq!(format_value(0.1f32, FormatStyle::Compatible), "0.1");
    }

    #[test]
    fn special_values() {
        assert_eq!(compatible(0.0), "0.0");
        assert_eq!(compatible(-0.0), "-0.0");
        assert_eq!(compatible(f64::INFINITY), "Infinity");
        assert_eq!(fixed(f64::NEG_INFINITY, 2), "-Infinity");
        assert_eq!(sci(f64::NAN, 3), "NaN");
        assert_eq!(general(-f64::NAN, 3), "NaN");
    }

    #[test]
    fn decimal_float() {
        assert_eq!(fixed(100.0, 2), "100.00");
        assert_eq!(fixed(3.14159, 2), "3.14");
        assert_eq!(fixed(2.5, 0), "3");
        assert_eq!(fixed(-1.5, 0), "-2");
        assert_eq!(fixed(0.001234, 3), "0.001");
        assert_eq!(fixed(0.0005, 3), "0.001");
        assert_eq!(fixed(0.0004, 3), "0.000");
        assert_eq!(fixed(0.00004, 3), "0.000");
        assert_eq!(fixed(9.999, 2), "10.00");
        assert_eq!(fixed(1e20, 1), "100000000000000000000.0");
        assert_eq!(fixed(-0.0, 1), "-0.0");
    }

    #[test]
    fn scientific() {
        assert_eq!(sci(123456789.0, 3), "1.235E8");
        assert_eq!(sci(0.00012, 2), "1.20E-4");
        assert_eq!(sci(9.99, 1), "1.0E1");
        assert_eq!(sci(0.0, 2), "0.00E0");
        assert_eq!(sci(5.0, 0), "5E0");
        assert_eq!(sci(-2.5e-300, 4), "-2.5000E-300");
    }

    #[test]
    fn general_style() {
        assert_eq!(general(123456789.0, 4), "1.235E8");
        assert_eq!(general(0.0001234, 3), "0.000123");
        assert_eq!(general(0.00001234, 3), "1.23E-5");
        assert_eq!(general(100.0, 6), "100.000");
        assert_eq!(general(0.0, 0), "0");
        assert_eq!(general(2.5, 0), "3");
    }

    #[test]
    fn second_digit_rule() {
        let compatible = FormatStyle::Compatible;
        assert!(!compatible.forces_second_digit(0));
        assert!(!compatible.forces_second_digit(-2));
        assert!(!compatible.forces_second_digit(7));
        assert!(compatible.forces_second_digit(-3));
        assert!(compatible.forces_second_digit(8));
        assert!(FormatStyle::General { precision: 6 }.forces_second_digit(0));
    }

    #[test]
    fn parse_styles() {
        assert_eq!("".parse(), Ok(FormatStyle::Compatible));
        assert_eq!("Compatible".parse(), Ok(FormatStyle::Compatible));
        assert_eq!("f".parse(), Ok(FormatStyle::DecimalFloat { precision: 6 }));
        assert_eq!("%.2f".parse(), Ok(FormatStyle::DecimalFloat { precision: 2 }));
        assert_eq!(".3E".parse(), Ok(FormatStyle::Scientific { precision: 3 }));
        assert_eq!("%e".parse(), Ok(FormatStyle::Scientific { precision: 6 }));
        assert_eq!(".4G".parse(), Ok(FormatStyle::General { precision: 4 }));
        assert_eq!(".f".parse(), Ok(FormatStyle::DecimalFloat { precision: 0 }));

        for bad in &["x", ".2", "2f", ".+2f", ".2q", "%%f", "é"] {
            assert_eq!(bad.parse::<FormatStyle>(), Err(Error::UnknownStyle(bad.to_string())));
        }
    }

    #[test]
    fn styles_display_as_parseable_text() {
        for style in &[
            FormatStyle::Compatible,
            FormatStyle::DecimalFloat { precision: 0 },
            FormatStyle::Scientific { precision: 12 },
            FormatStyle::General { precision: 3 },
        ] {
            assert_eq!(style.to_string().parse(), Ok(*style));
        }
    }

    #[test]
    fn write_into_formatter() {
        let value = DecimalDigits::from(2.75);
        let mut out = String::new();
        write(&mut out, &value, FormatStyle::DecimalFloat { precision: 1 }).unwrap();
        assert_eq!(out, "2.8");
    }
}
