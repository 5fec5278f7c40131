//! Decimal to binary conversion.
//!
//! The result is always the float nearest to the exact decimal value, ties
//! going to the even significand. Short inputs with small exponents are
//! answered with a single floating point operation. Everything else starts
//! from a close approximation and is corrected one ULP at a time against the
//! exact value held in `Bignum`s.

use std::cmp::Ordering;

use log::{debug, trace};

use crate::bignum::Bignum;
use crate::classify::{FloatValue, RawFloat};
use crate::error::{Error, Result};

const EXP_BIAS: i32 = 1023;
const EXP_SHIFT: i32 = 52;

const MAX_DECIMAL_DIGITS: usize = 15;
const MAX_DECIMAL_EXPONENT: i32 = 308;
const MIN_DECIMAL_EXPONENT: i32 = -324;

const SINGLE_MAX_DECIMAL_DIGITS: usize = 7;
const SINGLE_MAX_DECIMAL_EXPONENT: i32 = 38;
const SINGLE_MIN_DECIMAL_EXPONENT: i32 = -45;

/// Every power of ten that is exact in an `f64`.
static SMALL_10_POW: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11,
    1e12, 1e13, 1e14, 1e15, 1e16, 1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Every power of ten that is exact in an `f32`.
static SINGLE_SMALL_10_POW: [f32; 11] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10,
];

static BIG_10_POW: [f64; 5] = [1e16, 1e32, 1e64, 1e128, 1e256];
static TINY_10_POW: [f64; 5] = [1e-16, 1e-32, 1e-64, 1e-128, 1e-256];

const MAX_SMALL_TEN: i32 = SMALL_10_POW.len() as i32 - 1;
const SINGLE_MAX_SMALL_TEN: i32 = SINGLE_SMALL_10_POW.len() as i32 - 1;

/// 2^128, the first power of two past `f32::MAX`.
const F32_OVERFLOW: f64 = 340282366920938463463374607431768211456.0;

/// Which side of a returned `f64` the exact decimal value lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RoundHint {
    Exact,
    Up,
    Down,
}

impl RoundHint {
    #[inline]
    fn flip(self) -> RoundHint {
        match self {
            RoundHint::Exact => RoundHint::Exact,
            RoundHint::Up => RoundHint::Down,
            RoundHint::Down => RoundHint::Up,
        }
    }
}

/// Float types that can be produced from decimal digits.
pub trait FromDecimal: RawFloat {
    /// Correctly rounded value of `digits * 10^exponent`, negated when
    /// `negative`. Leading zeros are ignored and an all-zero input yields a
    /// signed zero.
    ///
    /// # Panics
    ///
    /// If `digits` contains anything but ASCII digits. `try_parse_decimal`
    /// reports that as an error instead.
    fn parse_decimal(digits: &[u8], exponent: i32, negative: bool) -> Self;

    fn infinity(negative: bool) -> Self;

    fn nan() -> Self;
}

impl FromDecimal for f64 {
    fn parse_decimal(digits: &[u8], exponent: i32, negative: bool) -> f64 {
        let magnitude = match Decimal::new(digits, exponent) {
            Some(decimal) => decimal.fast_double().unwrap_or_else(|| decimal.hard_double().0),
            None => 0.0,
        };

        if negative { -magnitude } else { magnitude }
    }

    #[inline]
    fn infinity(negative: bool) -> f64 {
        if negative { f64::NEG_INFINITY } else { f64::INFINITY }
    }

    #[inline]
    fn nan() -> f64 {
        f64::NAN
    }
}

impl FromDecimal for f32 {
    fn parse_decimal(digits: &[u8], exponent: i32, negative: bool) -> f32 {
        let magnitude = match Decimal::new(digits, exponent) {
            Some(decimal) => decimal.float_value(),
            None => 0.0,
        };

        if negative { -magnitude } else { magnitude }
    }

    #[inline]
    fn infinity(negative: bool) -> f32 {
        if negative { f32::NEG_INFINITY } else { f32::INFINITY }
    }

    #[inline]
    fn nan() -> f32 {
        f32::NAN
    }
}

/// Correctly rounded value of `digits * 10^exponent`.
///
/// ```
/// # use floating_decimal::parse_decimal;
/// assert_eq!(parse_decimal::<f64>(b"1", 1, false), 10.0);
/// assert_eq!(parse_decimal::<f32>(b"0125", -3, true), -0.125);
/// ```
#[inline]
pub fn parse_decimal<F: FromDecimal>(digits: &[u8], exponent: i32, negative: bool) -> F {
    F::parse_decimal(digits, exponent, negative)
}

/// Like `parse_decimal`, but rejects input that isn't a non-empty run of
/// ASCII digits instead of panicking.
pub fn try_parse_decimal<F: FromDecimal>(digits: &[u8], exponent: i32, negative: bool) -> Result<F> {
    if digits.is_empty() {
        return Err(Error::EmptyDigits);
    }
    if let Some(offset) = digits.iter().position(|d| !d.is_ascii_digit()) {
        return Err(Error::UnexpectedCharacter { ch: digits[offset] as char, offset });
    }

    Ok(F::parse_decimal(digits, exponent, negative))
}

/// Parse decimal text: an optional sign, then `NaN`, `Infinity`, or
/// `digits[.digits][(e|E)[sign]digits]`. Exponents too large for an `i32`
/// saturate.
///
/// ```
/// # use floating_decimal::parse_str;
/// assert_eq!(parse_str::<f64>("-1.5e3"), Ok(-1500.0));
/// assert_eq!(parse_str::<f32>(".1"), Ok(0.1));
/// assert!(parse_str::<f64>("1e").is_err());
/// ```
pub fn parse_str<F: FromDecimal>(input: &str) -> Result<F> {
    let bytes = input.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    match &input[pos..] {
        "NaN" => return Ok(F::nan()),
        "Infinity" => return Ok(F::infinity(negative)),
        _ => {}
    }

    let mut digits = Vec::with_capacity(bytes.len() - pos);
    let mut point = None;

    while let Some(&b) = bytes.get(pos) {
        match b {
            b'0'..=b'9' => digits.push(b),
            b'.' if point.is_none() => point = Some(digits.len()),
            _ => break,
        }
        pos += 1;
    }

    if digits.is_empty() {
        return Err(if pos == bytes.len() { Error::EmptyDigits } else { unexpected(input, pos) });
    }

    let mut exponent: i32 = 0;
    if let Some(b'e' | b'E') = bytes.get(pos) {
        let marker = pos;
        pos += 1;

        let exp_negative = match bytes.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let start = pos;
        while let Some(&d @ b'0'..=b'9') = bytes.get(pos) {
            exponent = exponent.saturating_mul(10).saturating_add((d - b'0') as i32);
            pos += 1;
        }
        if pos == start {
            return Err(Error::MissingExponent { offset: marker });
        }
        if exp_negative {
            exponent = -exponent;
        }
    }

    if pos < bytes.len() {
        return Err(unexpected(input, pos));
    }

    let fraction = point.map_or(0, |point| digits.len() - point);
    Ok(F::parse_decimal(&digits, exponent.saturating_sub(len_i32(fraction)), negative))
}

fn unexpected(input: &str, offset: usize) -> Error {
    Error::UnexpectedCharacter {
        ch: input[offset..].chars().next().unwrap_or('\0'),
        offset,
    }
}

#[inline]
fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// A non-zero decimal magnitude, `0.digits × 10^dec_exponent`, with no
/// leading or trailing zeros in `digits`.
struct Decimal<'a> {
    digits: &'a [u8],
    dec_exponent: i32,
}

impl<'a> Decimal<'a> {
    fn new(digits: &'a [u8], exponent: i32) -> Option<Decimal<'a>> {
        assert!(
            digits.iter().all(u8::is_ascii_digit),
            "decimal digits must be ASCII '0'..='9'"
        );

        let start = digits.iter().position(|&d| d != b'0')?;
        let end = digits.iter().rposition(|&d| d != b'0')? + 1;

        Some(Decimal {
            digits: &digits[start..end],
            dec_exponent: exponent.saturating_add(len_i32(digits.len() - start)),
        })
    }

    #[inline]
    fn len(&self) -> i32 {
        len_i32(self.digits.len())
    }

    /// Integer value of the first `count` digits.
    fn leading(&self, count: usize) -> u64 {
        self.digits[..count]
            .iter()
            .fold(0, |acc, &d| acc * 10 + (d - b'0') as u64)
    }

    /// The answer from one rounding, when digits and exponent allow it.
    fn fast_double(&self) -> Option<f64> {
        if self.digits.len() > MAX_DECIMAL_DIGITS {
            return None;
        }

        let k_digits = self.digits.len();
        let value = self.leading(k_digits) as f64;
        let exp = self.dec_exponent.saturating_sub(k_digits as i32);

        if exp == 0 {
            Some(value)
        } else if exp > 0 {
            if exp <= MAX_SMALL_TEN {
                return Some(value * SMALL_10_POW[exp as usize]);
            }

            // Short inputs can absorb part of the exponent exactly
            let slop = MAX_DECIMAL_DIGITS as i32 - k_digits as i32;
            if exp <= MAX_SMALL_TEN + slop {
                let value = value * SMALL_10_POW[slop as usize];
                return Some(value * SMALL_10_POW[(exp - slop) as usize]);
            }

            None
        } else if exp >= -MAX_SMALL_TEN {
            Some(value / SMALL_10_POW[-exp as usize])
        } else {
            None
        }
    }

    /// The nearest `f64`, and where the exact value lies relative to it.
    fn hard_double(&self) -> (f64, RoundHint) {
        let k_digits = self.digits.len().min(MAX_DECIMAL_DIGITS + 1);
        let mut value = self.leading(k_digits) as f64;
        let exp = self.dec_exponent.saturating_sub(k_digits as i32);

        if exp > 0 {
            if self.dec_exponent > MAX_DECIMAL_EXPONENT + 1 {
                debug!("decimal exponent {} overflows f64", self.dec_exponent);
                return (f64::INFINITY, RoundHint::Exact);
            }
            value = match scale_up(value, exp) {
                Some(value) => value,
                None => {
                    debug!("approximation of 10^{} digits overflows f64", self.dec_exponent);
                    return (f64::INFINITY, RoundHint::Exact);
                }
            };
        } else if exp < 0 {
            if self.dec_exponent < MIN_DECIMAL_EXPONENT - 1 {
                debug!("decimal exponent {} underflows f64", self.dec_exponent);
                return (0.0, RoundHint::Exact);
            }
            value = match scale_down(value, -exp) {
                Some(value) => value,
                None => {
                    debug!("approximation of 10^{} digits underflows f64", self.dec_exponent);
                    return (0.0, RoundHint::Exact);
                }
            };
        }

        self.correct(value)
    }

    /// Walks `candidate` towards the exact value until it is within half an
    /// ULP of it.
    fn correct(&self, mut candidate: f64) -> (f64, RoundHint) {
        let exact = Bignum::from_digits(self.digits, 0);
        let exp = self.dec_exponent.saturating_sub(self.len());

        loop {
            let (big_b, big_exp, nbits) = to_big_int(candidate);

            let (mut b2, b5, mut d2, d5) = if exp >= 0 {
                (0, 0, exp, exp)
            } else {
                (-exp, -exp, 0, 0)
            };
            if big_exp >= 0 {
                b2 += big_exp;
            } else {
                d2 -= big_exp;
            }
            let mut ulp2 = b2;

            // Scale so that half an ULP is still an integer
            let half_ulp_bias = if big_exp + nbits <= -EXP_BIAS + 1 {
                big_exp + EXP_BIAS + EXP_SHIFT
            } else {
                EXP_SHIFT + 2 - nbits
            };
            b2 += half_ulp_bias;
            d2 += half_ulp_bias;

            let common2 = b2.min(d2).min(ulp2);
            b2 -= common2;
            d2 -= common2;
            ulp2 -= common2;

            let big_b = big_b.mul_pow52(b5 as u32, b2 as u32);
            let big_d = exact.clone().mul_pow52(d5 as u32, d2 as u32);

            let (overvalue, mut diff) = match big_b.cmp(&big_d) {
                Ordering::Greater => (true, big_b.sub(&big_d)),
                Ordering::Less => (false, big_d.sub(&big_b)),
                Ordering::Equal => return (candidate, RoundHint::Exact),
            };

            if overvalue && nbits == 1 && big_exp > 1 - EXP_BIAS {
                // A power of two stepping down uses the ULP of the binade below
                ulp2 -= 1;
                if ulp2 < 0 {
                    ulp2 = 0;
                    diff.shift_left(1);
                }
            }

            let half_ulp = Bignum::pow52(b5 as u32, ulp2 as u32);
            let toward = if overvalue { RoundHint::Down } else { RoundHint::Up };

            match diff.cmp(&half_ulp) {
                Ordering::Less => return (candidate, toward),
                Ordering::Equal => {
                    if candidate.to_bits() & 1 == 0 {
                        return (candidate, toward);
                    }
                    return (next_ulp(candidate, overvalue), toward.flip());
                }
                Ordering::Greater => {
                    candidate = next_ulp(candidate, overvalue);
                    trace!("correction step {} to {:e}", if overvalue { "down" } else { "up" }, candidate);

                    if candidate == 0.0 || candidate.is_infinite() {
                        return (candidate, RoundHint::Exact);
                    }
                }
            }
        }
    }

    fn float_value(&self) -> f32 {
        let n = self.digits.len();
        let k_digits = n.min(SINGLE_MAX_DECIMAL_DIGITS + 1);
        let value = self.leading(k_digits) as f32;
        let exp = self.dec_exponent.saturating_sub(k_digits as i32);

        if n <= SINGLE_MAX_DECIMAL_DIGITS {
            if exp == 0 {
                return value;
            } else if exp > 0 {
                if exp <= SINGLE_MAX_SMALL_TEN {
                    return value * SINGLE_SMALL_10_POW[exp as usize];
                }
                let slop = SINGLE_MAX_DECIMAL_DIGITS as i32 - k_digits as i32;
                if exp <= SINGLE_MAX_SMALL_TEN + slop {
                    let value = value * SINGLE_SMALL_10_POW[slop as usize];
                    return value * SINGLE_SMALL_10_POW[(exp - slop) as usize];
                }
            } else if exp >= -SINGLE_MAX_SMALL_TEN {
                return value / SINGLE_SMALL_10_POW[-exp as usize];
            }
        } else if self.dec_exponent >= self.len() && self.dec_exponent <= MAX_DECIMAL_DIGITS as i32 {
            // An integer that is exact in f64, so the cast is the only rounding
            let value = self.leading(n) as f64 * SMALL_10_POW[(self.dec_exponent - self.len()) as usize];
            return value as f32;
        }

        if self.dec_exponent > SINGLE_MAX_DECIMAL_EXPONENT + 1 {
            debug!("decimal exponent {} overflows f32", self.dec_exponent);
            return f32::INFINITY;
        }
        if self.dec_exponent < SINGLE_MIN_DECIMAL_EXPONENT - 1 {
            debug!("decimal exponent {} underflows f32", self.dec_exponent);
            return 0.0;
        }

        let (value, hint) = self.hard_double();
        sticky_round(value, hint)
    }
}

/// Multiply by `10^exp`, or `None` if the result is certainly infinite.
fn scale_up(mut value: f64, exp: i32) -> Option<f64> {
    if exp & 15 != 0 {
        value *= SMALL_10_POW[(exp & 15) as usize];
    }

    let mut exp = exp >> 4;
    if exp == 0 {
        return Some(value);
    }

    let mut j = 0;
    while exp > 1 {
        if exp & 1 != 0 {
            value *= BIG_10_POW[j];
        }
        j += 1;
        exp >>= 1;
    }

    let scaled = value * BIG_10_POW[j];
    if scaled.is_finite() {
        return Some(scaled);
    }

    // One binade too far is still worth correcting down from MAX
    if (value / 2.0 * BIG_10_POW[j]).is_infinite() {
        None
    } else {
        Some(f64::MAX)
    }
}

/// Divide by `10^exp`, or `None` if the result is certainly zero.
fn scale_down(mut value: f64, exp: i32) -> Option<f64> {
    if exp & 15 != 0 {
        value /= SMALL_10_POW[(exp & 15) as usize];
    }

    let mut exp = exp >> 4;
    if exp == 0 {
        return Some(value);
    }

    let mut j = 0;
    while exp > 1 {
        if exp & 1 != 0 {
            value *= TINY_10_POW[j];
        }
        j += 1;
        exp >>= 1;
    }

    let scaled = value * TINY_10_POW[j];
    if scaled != 0.0 {
        return Some(scaled);
    }

    if value * 2.0 * TINY_10_POW[j] == 0.0 {
        None
    } else {
        Some(f64::from_bits(1))
    }
}

/// Splits a positive finite `f64` into an odd integer, the exponent of its
/// lowest bit and its bit length.
fn to_big_int(value: f64) -> (Bignum, i32, i32) {
    let parts = FloatValue::classify(value);
    let low_zeros = parts.mantissa.trailing_zeros();
    let nbits = EXP_SHIFT + 1 - low_zeros as i32;

    (
        Bignum::from_u64(parts.mantissa >> low_zeros),
        parts.exponent + 1 - nbits,
        nbits,
    )
}

#[inline]
fn next_ulp(value: f64, down: bool) -> f64 {
    let bits = value.to_bits();
    f64::from_bits(if down { bits - 1 } else { bits + 1 })
}

#[inline]
fn widen(value: f32) -> f64 {
    if value.is_infinite() { F32_OVERFLOW } else { value as f64 }
}

/// Narrows a positive `f64` to `f32`. When `value` sits exactly halfway
/// between two `f32`s but the decimal it came from doesn't, the hint picks
/// the side that the decimal is on.
fn sticky_round(value: f64, hint: RoundHint) -> f32 {
    let rounded = value as f32;
    if hint == RoundHint::Exact || widen(rounded) == value {
        return rounded;
    }

    let (below, above) = if widen(rounded) < value {
        (rounded, f32::from_bits(rounded.to_bits() + 1))
    } else {
        (f32::from_bits(rounded.to_bits() - 1), rounded)
    };

    if (widen(below) + widen(above)) / 2.0 != value {
        return rounded;
    }

    match hint {
        RoundHint::Up => above,
        RoundHint::Down => below,
        RoundHint::Exact => rounded,
    }
}
