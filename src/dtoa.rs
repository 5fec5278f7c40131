/*
    Shortest round-trip digit generation.

    Given a finite non-zero float d, we pick integers B, S, M- and M+ and a
    decimal exponent k such that

        d   = (B / S) * 10^k,  1 <= B / S < 10
        M-  = half the gap to the next smaller float, scaled like B
        M+  = half the gap to the next larger float, scaled like B

    and then peel off quotient digits of B / S. After each digit we know the
    remainder B and the tolerances; as soon as truncating (B < M-) or rounding
    up (B + M+ > 10 S) stays within half a gap of d, the digits generated so
    far are the shortest that read back as d.

    When B and 10 S fit in a machine word the whole loop runs on u32 or u64,
    otherwise on Bignum. The loop itself is written once, over `Scaled`.
*/

use std::cell::RefCell;
use std::cmp::Ordering;

use log::trace;

use crate::bignum::{pow5_bits, Bignum, LONG_5_POW};
use crate::classify::{FloatValue, Special};
use crate::format::FormatStyle;
use crate::number::{DecimalDigits, MAX_DIGITS};

const EXP_ONE: u64 = 0x3FF0000000000000;
const FRACT_HOB: u64 = 0x0010000000000000;
const DOUBLE_PRECISION: u32 = 53;

const MIN_SMALL_BIN_EXP: i32 = -21;
const MAX_SMALL_BIN_EXP: i32 = 62;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(MAX_DIGITS));
}

/// Run `f` with this thread's digit buffer, emptied. A nested call on the
/// same thread gets a buffer of its own.
fn with_scratch<R>(f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
    SCRATCH.with(|cell| match cell.try_borrow_mut() {
        Ok(mut buf) => {
            buf.clear();
            let result = f(&mut buf);
            buf.clear();
            result
        }
        Err(_) => f(&mut Vec::with_capacity(MAX_DIGITS)),
    })
}

/// Shortest digits that read back as `value`.
pub(crate) fn shortest(value: &FloatValue) -> DecimalDigits {
    convert(value, None)
}

/// Digits for `value` as `style` will display them. Identical to `shortest`
/// except where the style asks for a second significant digit.
pub(crate) fn styled(value: &FloatValue, style: FormatStyle) -> DecimalDigits {
    convert(value, Some(style))
}

fn convert(value: &FloatValue, style: Option<FormatStyle>) -> DecimalDigits {
    match value.special {
        Special::Zero => return DecimalDigits::zero(value.sign),
        Special::Infinity => return DecimalDigits::infinity(value.sign),
        Special::NaN => return DecimalDigits::NAN,
        Special::None => {}
    }

    with_scratch(|buf| {
        let exponent = generate(value, style, buf);
        DecimalDigits::from_slice(value.sign, buf, exponent)
    })
}

/// Arithmetic the digit loop needs from its scaled quantities.
trait Scaled {
    /// Returns `self / divisor` and leaves `10 * (self % divisor)` behind.
    fn next_digit(&mut self, divisor: &Self) -> u32;

    /// Multiplies by ten, or returns `false` if that would overflow.
    fn times_ten(&mut self) -> bool;

    /// `self < m`, or `self <= m` when `inclusive`.
    fn below(&self, m: &Self, inclusive: bool) -> bool;

    /// `self + m > tens`, or `>=` when `inclusive`.
    fn exceeds(&self, m: &Self, tens: &Self, inclusive: bool) -> bool;

    /// Compares `2 * self` with `tens`.
    fn cmp_half(&self, tens: &Self) -> Ordering;
}

macro_rules! impl_scaled_native {
    ($( $t:ty ),*) => ($(
        impl Scaled for $t {
            #[inline]
            fn next_digit(&mut self, divisor: &$t) -> u32 {
                let q = *self / *divisor;
                *self = 10 * (*self % *divisor);
                q as u32
            }

            #[inline]
            fn times_ten(&mut self) -> bool {
                match self.checked_mul(10) {
                    Some(value) => {
                        *self = value;
                        true
                    }
                    None => false,
                }
            }

            #[inline]
            fn below(&self, m: &$t, inclusive: bool) -> bool {
                if inclusive { *self <= *m } else { *self < *m }
            }

            #[inline]
            fn exceeds(&self, m: &$t, tens: &$t, inclusive: bool) -> bool {
                match self.checked_add(*m) {
                    Some(sum) if inclusive => sum >= *tens,
                    Some(sum) => sum > *tens,
                    None => true,
                }
            }

            #[inline]
            fn cmp_half(&self, tens: &$t) -> Ordering {
                (*self << 1).cmp(tens)
            }
        }
    )*)
}

impl_scaled_native!(u32, u64);

impl Scaled for Bignum {
    fn next_digit(&mut self, divisor: &Bignum) -> u32 {
        self.quotient_digit_and_remainder_times_ten(divisor)
    }

    fn times_ten(&mut self) -> bool {
        *self = self.mul_small(10);
        true
    }

    fn below(&self, m: &Bignum, inclusive: bool) -> bool {
        match self.cmp(m) {
            Ordering::Less => true,
            Ordering::Equal => inclusive,
            Ordering::Greater => false,
        }
    }

    fn exceeds(&self, m: &Bignum, tens: &Bignum, inclusive: bool) -> bool {
        match self.add(m).cmp(tens) {
            Ordering::Greater => true,
            Ordering::Equal => inclusive,
            Ordering::Less => false,
        }
    }

    fn cmp_half(&self, tens: &Bignum) -> Ordering {
        self.shift_left_new(1).cmp(tens)
    }
}

/// Which arithmetic the digit loop runs on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Path {
    Word32,
    Word64,
    Big,
}

impl Path {
    fn select(bin_exp: i32, b_bits: i32, ten_s_bits: i32) -> Path {
        if bin_exp < MIN_SMALL_BIN_EXP || bin_exp > MAX_SMALL_BIN_EXP {
            Path::Big
        } else if b_bits < 32 && ten_s_bits < 32 {
            Path::Word32
        } else if b_bits < 64 && ten_s_bits < 64 {
            Path::Word64
        } else {
            Path::Big
        }
    }
}

struct Quantities<T> {
    b: T,
    s: T,
    m_minus: T,
    m_plus: T,
    tens: T,
}

impl Quantities<u64> {
    fn narrow(self) -> Quantities<u32> {
        Quantities {
            b: self.b as u32,
            s: self.s as u32,
            m_minus: self.m_minus as u32,
            m_plus: self.m_plus as u32,
            tens: self.tens as u32,
        }
    }
}

/// Writes the digits of `value` into `buf` and returns the decimal exponent,
/// such that `value == 0.<buf> * 10^exponent`.
fn generate(value: &FloatValue, style: Option<FormatStyle>, buf: &mut Vec<u8>) -> i32 {
    let bin_exp = value.exponent;
    let fract_bits = value.mantissa << (DOUBLE_PRECISION - value.precision);
    let n_significant_bits = value.significant_bits as i32;
    let n_fract_bits = (64 - fract_bits.leading_zeros() - fract_bits.trailing_zeros()) as i32;
    let n_tiny_bits = (n_fract_bits - bin_exp - 1).max(0);

    // log10(d2) is concave, so this tangent at 1.5 never underestimates
    let d2 = f64::from_bits(EXP_ONE | (fract_bits & !FRACT_HOB));
    let estimate = ((d2 - 1.5) * 0.289529654 + 0.176091259 + bin_exp as f64 * 0.301029995663981).floor() as i32;

    let b5 = (-estimate).max(0);
    let mut b2 = b5 + n_tiny_bits + bin_exp;
    let s5 = estimate.max(0);
    let mut s2 = s5 + n_tiny_bits;
    let m5 = b5;
    let mut m2_plus = b2 - n_significant_bits;
    let mut m2_minus = if value.has_closer_lower_neighbor() { m2_plus - 1 } else { m2_plus };

    // Drop the trailing zero bits of the mantissa
    let fract = fract_bits >> (DOUBLE_PRECISION as i32 - n_fract_bits);
    b2 -= n_fract_bits - 1;

    let common2 = b2.min(s2);
    b2 -= common2;
    s2 -= common2;
    m2_plus -= common2;
    m2_minus -= common2;

    if m2_minus < 0 {
        // M can't be scaled down any further, so scale everything else up
        b2 -= m2_minus;
        s2 -= m2_minus;
        m2_plus -= m2_minus;
        m2_minus = 0;
    }

    let b_bits = n_fract_bits + b2 + pow5_bits(b5);
    let ten_s_bits = s2 + 1 + pow5_bits(s5 + 1);
    let accept_bounds = value.is_even();

    let exponent = match Path::select(bin_exp, b_bits, ten_s_bits) {
        path @ (Path::Word32 | Path::Word64) => {
            let s = LONG_5_POW[s5 as usize] << s2;
            let quantities = Quantities {
                b: (fract * LONG_5_POW[b5 as usize]) << b2,
                s,
                m_minus: LONG_5_POW[m5 as usize] << m2_minus,
                m_plus: LONG_5_POW[m5 as usize] << m2_plus,
                tens: s * 10,
            };

            if path == Path::Word32 {
                develop(quantities.narrow(), estimate, accept_bounds, style, buf)
            } else {
                develop(quantities, estimate, accept_bounds, style, buf)
            }
        }
        Path::Big => {
            trace!(
                "bignum digit generation: bin_exp={} b5={} b2={} s5={} s2={}",
                bin_exp, b5, b2, s5, s2
            );

            let mut b = Bignum::from_u64(fract).mul_pow52(b5 as u32, b2 as u32);
            let mut s = Bignum::pow52(s5 as u32, s2 as u32);
            let mut m_minus = Bignum::pow52(m5 as u32, m2_minus as u32);
            let mut m_plus = Bignum::pow52(m5 as u32, m2_plus as u32);

            let shift = s.normalize();
            b.shift_left(shift);
            m_minus.shift_left(shift);
            m_plus.shift_left(shift);
            let tens = s.mul_small(10);

            develop(Quantities { b, s, m_minus, m_plus, tens }, estimate, accept_bounds, style, buf)
        }
    };

    strip_leading_zeros(buf, exponent)
}

/// One division step. Returns the digit and the `(low, high)` stop flags.
fn step<T: Scaled>(q: &mut Quantities<T>, accept_bounds: bool) -> (u8, bool, bool) {
    let digit = q.b.next_digit(&q.s);
    assert!(digit < 10, "decimal exponent estimate too low: digit {}", digit);

    // An overflowing tolerance is larger than anything it gets compared to
    let low = !q.m_minus.times_ten() || q.b.below(&q.m_minus, accept_bounds);
    let high = !q.m_plus.times_ten() || q.b.exceeds(&q.m_plus, &q.tens, accept_bounds);

    (b'0' + digit as u8, low, high)
}

fn develop<T: Scaled>(
    mut q: Quantities<T>,
    mut estimate: i32,
    accept_bounds: bool,
    style: Option<FormatStyle>,
    buf: &mut Vec<u8>,
) -> i32 {
    let (digit, mut low, mut high) = step(&mut q, accept_bounds);

    if digit == b'0' && !high {
        // The estimate was one too high
        estimate -= 1;
    } else {
        buf.push(digit);
    }

    if style.map_or(false, |style| style.forces_second_digit(estimate)) {
        low = false;
        high = false;
    }

    while !low && !high {
        let (digit, l, h) = step(&mut q, accept_bounds);
        buf.push(digit);
        low = l;
        high = h;
    }

    let round_up = high
        && (!low
            || match q.b.cmp_half(&q.tens) {
                Ordering::Greater => true,
                Ordering::Equal => buf.last().map_or(false, |&d| (d - b'0') & 1 == 1),
                Ordering::Less => false,
            });

    if round_up {
        increment(buf, &mut estimate);
    }

    estimate + 1
}

/// Adds one to the last digit. A carry out of the first digit leaves a
/// single significant `1` and bumps the exponent.
fn increment(buf: &mut [u8], estimate: &mut i32) {
    for digit in buf.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }

    if let Some(first) = buf.first_mut() {
        *first = b'1';
        *estimate += 1;
    }
}

fn strip_leading_zeros(buf: &mut Vec<u8>, exponent: i32) -> i32 {
    let zeros = buf.iter().take_while(|&&d| d == b'0').count();
    if zeros == 0 || zeros == buf.len() {
        return exponent;
    }
    buf.drain(..zeros);
    exponent - zeros as i32
}
