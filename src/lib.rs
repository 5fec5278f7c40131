//! Correctly rounded conversion between binary floating point and decimal.
//!
//! Going out, a float becomes the shortest run of decimal digits that reads
//! back as the same float, which can then be rendered in one of several
//! `FormatStyle`s. Coming in, digits and a decimal exponent become the float
//! nearest to their exact value.
//!
//! ```
//! # use floating_decimal::{format_value, parse_str, DecimalDigits, FormatStyle};
//! let digits = DecimalDigits::from(0.1 + 0.2);
//! assert_eq!(digits.digits(), b"30000000000000004");
//! assert_eq!(f64::from(digits), 0.1 + 0.2);
//!
//! assert_eq!(format_value(1.0, FormatStyle::Compatible), "1.0");
//! assert_eq!(format_value(1e-7, FormatStyle::General { precision: 3 }), "1.00E-7");
//!
//! assert_eq!(parse_str::<f32>("3.4028235e38"), Ok(f32::MAX));
//! ```
//!
//! The crate logs through the `log` facade: the slow digit generation path
//! and each correction step of the parser are traced, out of range inputs
//! are reported at debug level.

mod bignum;
mod classify;
mod dtoa;
mod error;
mod format;
mod number;
mod parse;

pub use bignum::{pow5, Bignum};
pub use classify::{FloatValue, RawFloat, Special};
pub use error::{Error, Result};
pub use format::{format, format_value, write, FormatStyle, DEFAULT_PRECISION};
pub use number::{DecimalDigits, MAX_DIGITS};
pub use parse::{parse_decimal, parse_str, try_parse_decimal, FromDecimal};

/// Digits of `value` as `style` will render them.
///
/// Unlike `DecimalDigits::from`, which always gives the shortest digits,
/// this keeps a second significant digit where the style calls for one.
///
/// ```
/// # use floating_decimal::{to_decimal, DecimalDigits, FormatStyle};
/// let tiny = f64::from_bits(1);
///
/// assert_eq!(DecimalDigits::from(tiny).digits(), b"5");
/// assert_eq!(to_decimal(tiny, FormatStyle::Compatible).digits(), b"49");
/// ```
pub fn to_decimal<F: RawFloat>(value: F, style: FormatStyle) -> DecimalDigits {
    number::styled(value, style)
}
