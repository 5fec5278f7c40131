use std::{fmt, ops};

use crate::classify::{FloatValue, RawFloat};
use crate::dtoa;
use crate::error::{Error, Result};
use crate::format::{self, FormatStyle};
use crate::parse::FromDecimal;

/// Longest digit sequence a `DecimalDigits` can hold. Enough for any
/// shortest `f64` plus one forced digit, and for every `u64`.
pub const MAX_DIGITS: usize = 20;

const fn padded(text: &[u8]) -> [u8; MAX_DIGITS] {
    let mut digits = [0u8; MAX_DIGITS];
    let mut i = 0;
    while i < text.len() {
        digits[i] = text[i];
        i += 1;
    }
    digits
}

const INFINITY: &[u8] = b"Infinity";
const NOT_A_NUMBER: &[u8] = b"NaN";

/// Decimal form of a float: a run of significant digits and an exponent,
/// read as `0.d1d2...dn × 10^exponent`. The conversion from a float yields
/// the shortest digits that convert back to the same float.
///
/// ```
/// # use floating_decimal::DecimalDigits;
/// let third: DecimalDigits = 0.3.into();
/// let back: f64 = third.into();
///
/// assert_eq!(third.digits(), b"3");
/// assert_eq!(third.exponent(), 0);
/// assert_eq!(back, 0.3);
/// ```
///
/// The digits never carry leading or trailing zeros, except for zero itself
/// which is the single digit `0`.
#[derive(Copy, Clone)]
pub struct DecimalDigits {
    negative: bool,

    // Infinity or NaN, in which case `digits` holds the name
    exceptional: bool,

    exponent: i32,
    len: u8,
    digits: [u8; MAX_DIGITS],
}

impl DecimalDigits {
    /// NaN value represented in `DecimalDigits`. NaN is equal to itself and
    /// has no sign.
    pub const NAN: DecimalDigits = DecimalDigits {
        negative: false,
        exceptional: true,
        exponent: 0,
        len: NOT_A_NUMBER.len() as u8,
        digits: padded(NOT_A_NUMBER),
    };

    #[inline]
    pub fn zero(negative: bool) -> Self {
        DecimalDigits {
            negative,
            exceptional: false,
            exponent: 0,
            len: 1,
            digits: padded(b"0"),
        }
    }

    #[inline]
    pub fn infinity(negative: bool) -> Self {
        DecimalDigits {
            negative,
            exceptional: true,
            exponent: 0,
            len: INFINITY.len() as u8,
            digits: padded(INFINITY),
        }
    }

    /// Builds a value from digits known to be well formed. Trailing zeros are
    /// dropped; the first digit must not be a zero unless it is the only one.
    pub(crate) fn from_slice(negative: bool, digits: &[u8], exponent: i32) -> Self {
        let len = digits.iter().rposition(|&d| d != b'0').map_or(0, |last| last + 1);
        if len == 0 {
            return DecimalDigits::zero(negative);
        }

        assert!(len <= MAX_DIGITS, "{} digits exceed DecimalDigits capacity", len);
        debug_assert!(digits[0] != b'0');

        let mut buf = [0u8; MAX_DIGITS];
        buf[..len].copy_from_slice(&digits[..len]);

        DecimalDigits {
            negative,
            exceptional: false,
            exponent,
            len: len as u8,
            digits: buf,
        }
    }

    /// Construct a new `DecimalDigits` from parts, validating the digits.
    /// Leading zeros move the exponent, trailing zeros are dropped.
    ///
    /// ```
    /// # use floating_decimal::DecimalDigits;
    /// let pi = DecimalDigits::from_parts(false, b"3141592653589793", 1).unwrap();
    /// assert_eq!(pi, 3.141592653589793);
    ///
    /// let same = DecimalDigits::from_parts(false, b"0031415926535897930", 3).unwrap();
    /// assert_eq!(pi, same);
    /// ```
    pub fn from_parts(negative: bool, digits: &[u8], exponent: i32) -> Result<Self> {
        if digits.is_empty() {
            return Err(Error::EmptyDigits);
        }
        if let Some(offset) = digits.iter().position(|d| !d.is_ascii_digit()) {
            return Err(Error::UnexpectedCharacter { ch: digits[offset] as char, offset });
        }

        let zeros = digits.iter().take_while(|&&d| d == b'0').count();
        let significant = &digits[zeros..];
        let len = significant.iter().rposition(|&d| d != b'0').map_or(0, |last| last + 1);

        if len > MAX_DIGITS {
            return Err(Error::TooManyDigits { len });
        }

        Ok(DecimalDigits::from_slice(negative, significant, exponent.saturating_sub(zeros as i32)))
    }

    /// Reverse to `from_parts`: the sign, the digits and the exponent.
    #[inline]
    pub fn as_parts(&self) -> (bool, &[u8], i32) {
        (self.negative, self.digits(), self.exponent)
    }

    /// The significant digits as ASCII, or the name of an exceptional value.
    #[inline]
    pub fn digits(&self) -> &[u8] {
        &self.digits[..self.len as usize]
    }

    #[inline]
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    #[inline]
    pub fn is_sign_negative(&self) -> bool {
        self.negative
    }

    #[inline]
    pub fn is_sign_positive(&self) -> bool {
        !self.negative
    }

    #[inline]
    pub fn is_exceptional(&self) -> bool {
        self.exceptional
    }

    #[inline]
    pub fn is_nan(&self) -> bool {
        self.exceptional && self.digits() == NOT_A_NUMBER
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.exceptional && self.digits() == INFINITY
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        !self.exceptional && self.digits() == b"0"
    }

    /// Round half up to `len` significant digits. The result is a new value;
    /// rounding past the last digit returns a copy.
    ///
    /// ```
    /// # use floating_decimal::DecimalDigits;
    /// let n = DecimalDigits::from(0.9996);
    /// let r = n.round_to(3);
    ///
    /// assert_eq!(r.digits(), b"1");
    /// assert_eq!(r.exponent(), 1);
    /// assert_eq!(n.digits(), b"9996");
    /// ```
    pub fn round_to(&self, len: i32) -> DecimalDigits {
        if self.exceptional || self.is_zero() {
            return *self;
        }
        if len < 0 {
            return DecimalDigits::zero(self.negative);
        }

        let len = len as usize;
        let digits = self.digits();
        if len >= digits.len() {
            return *self;
        }

        if digits[len] < b'5' {
            return DecimalDigits::from_slice(self.negative, &digits[..len], self.exponent);
        }

        // Carry through the trailing nines
        let kept = digits[..len].iter().rposition(|&d| d != b'9').map_or(0, |last| last + 1);
        if kept == 0 {
            return DecimalDigits::from_slice(self.negative, b"1", self.exponent + 1);
        }

        let mut rounded = [0u8; MAX_DIGITS];
        rounded[..kept].copy_from_slice(&digits[..kept]);
        rounded[kept - 1] += 1;

        DecimalDigits::from_slice(self.negative, &rounded[..kept], self.exponent)
    }

    /// Convert to the nearest value of `F`.
    pub fn to_float<F: FromDecimal>(&self) -> F {
        if self.is_nan() {
            F::nan()
        } else if self.exceptional {
            F::infinity(self.negative)
        } else {
            F::parse_decimal(self.digits(), self.exponent.saturating_sub(self.len as i32), self.negative)
        }
    }
}

impl PartialEq for DecimalDigits {
    #[inline]
    fn eq(&self, other: &DecimalDigits) -> bool {
        if self.is_zero() && other.is_zero()
        || self.is_nan()  && other.is_nan() {
            return true;
        }

        self.negative == other.negative
            && self.exceptional == other.exceptional
            && self.exponent == other.exponent
            && self.digits() == other.digits()
    }
}

impl fmt::Debug for DecimalDigits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DecimalDigits")
            .field("negative", &self.negative)
            .field("digits", &String::from_utf8_lossy(self.digits()))
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl fmt::Display for DecimalDigits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format::write(f, self, FormatStyle::Compatible)
    }
}

impl ops::Neg for DecimalDigits {
    type Output = DecimalDigits;

    #[inline]
    fn neg(self) -> DecimalDigits {
        if self.is_nan() {
            return self;
        }

        DecimalDigits {
            negative: !self.negative,
            ..self
        }
    }
}

macro_rules! impl_float {
    ($( $t:ty ),*) => ($(
        impl From<$t> for DecimalDigits {
            #[inline]
            fn from(float: $t) -> DecimalDigits {
                dtoa::shortest(&FloatValue::classify(float))
            }
        }

        impl From<DecimalDigits> for $t {
            #[inline]
            fn from(num: DecimalDigits) -> $t {
                num.to_float()
            }
        }

        impl PartialEq<$t> for DecimalDigits {
            fn eq(&self, other: &$t) -> bool {
                <$t>::from(*self) == *other
            }
        }

        impl PartialEq<DecimalDigits> for $t {
            fn eq(&self, other: &DecimalDigits) -> bool {
                <$t>::from(*other) == *self
            }
        }
    )*)
}

impl_float!(f64, f32);

macro_rules! impl_unsigned {
    ($( $t:ty ),*) => ($(
        impl From<$t> for DecimalDigits {
            #[inline]
            fn from(num: $t) -> DecimalDigits {
                integer(false, num as u64)
            }
        }
    )*)
}

macro_rules! impl_signed {
    ($( $t:ty ),*) => ($(
        impl From<$t> for DecimalDigits {
            #[inline]
            fn from(num: $t) -> DecimalDigits {
                integer(num < 0, (num as i64).unsigned_abs())
            }
        }
    )*)
}

impl_signed!(isize, i8, i16, i32, i64);
impl_unsigned!(usize, u8, u16, u32, u64);

fn integer(negative: bool, mut num: u64) -> DecimalDigits {
    if num == 0 {
        return DecimalDigits::zero(negative);
    }

    let mut buf = [0u8; MAX_DIGITS];
    let mut start = MAX_DIGITS;
    while num > 0 {
        start -= 1;
        buf[start] = b'0' + (num % 10) as u8;
        num /= 10;
    }

    DecimalDigits::from_slice(negative, &buf[start..], (MAX_DIGITS - start) as i32)
}

/// The digits of `value` as `style` will print them.
pub(crate) fn styled<F: RawFloat>(value: F, style: FormatStyle) -> DecimalDigits {
    dtoa::styled(&FloatValue::classify(value), style)
}
