//! Arbitrary precision unsigned integers.
//!
//! `Bignum` only carries the handful of operations that exact float/decimal
//! conversion needs. Values are built fresh by each operation; the in-place
//! variants (`shift_left`, `normalize`, `quotient_digit_and_remainder_times_ten`)
//! are only ever called on values the caller owns outright.

use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};

/// Every power of five that fits in a `u32`.
pub(crate) static SMALL_5_POW: [u32; 14] = [
    1,
    5,
    25,
    125,
    625,
    3125,
    15625,
    78125,
    390625,
    1953125,
    9765625,
    48828125,
    244140625,
    1220703125,
];

/// Every power of five that fits in a `u64`.
pub(crate) static LONG_5_POW: [u64; 28] = powers_of_five();

static POW10: [u32; 10] = [
    1, 10, 100, 1000, 10000, 100000, 1000000, 10000000, 100000000, 1000000000,
];

const fn powers_of_five<const N: usize>() -> [u64; N] {
    let mut table = [1u64; N];
    let mut i = 1;
    while i < N {
        table[i] = table[i - 1] * 5;
        i += 1;
    }
    table
}

/// Number of bits needed to hold `5^p`, overestimated for large `p`.
#[inline]
pub(crate) fn pow5_bits(p: i32) -> i32 {
    match LONG_5_POW.get(p as usize) {
        Some(&pow) if p >= 0 => 64 - pow.leading_zeros() as i32,
        _ => p * 3,
    }
}

/// Arbitrary precision non-negative integer.
///
/// ```
/// # use floating_decimal::Bignum;
/// let a = Bignum::from_u64(u64::MAX);
/// let b = a.mul(&a).add(&Bignum::from_u64(1));
///
/// assert!(b > a);
/// assert_eq!(b.sub(&Bignum::from_u64(1)), a.mul(&a));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bignum {
    // Little endian words. Zero is the empty vector, and the last word is
    // never zero.
    words: Vec<u32>,
}

#[allow(clippy::should_implement_trait)]
impl Bignum {
    #[inline]
    pub fn zero() -> Self {
        Bignum { words: Vec::new() }
    }

    fn from_words(mut words: Vec<u32>) -> Self {
        while words.last() == Some(&0) {
            words.pop();
        }
        Bignum { words }
    }

    pub fn from_u64(value: u64) -> Self {
        Bignum::from_words(vec![value as u32, (value >> 32) as u32])
    }

    /// Integer value of ASCII `digits`, multiplied by `10^exponent`.
    ///
    /// Panics if `digits` contains anything other than `b'0'..=b'9'`.
    pub fn from_digits(digits: &[u8], exponent: u32) -> Self {
        let mut result = Bignum::zero();

        for chunk in digits.chunks(9) {
            let mut value = 0u32;
            for &digit in chunk {
                assert!(digit.is_ascii_digit(), "non-digit byte {:#04x} in decimal digits", digit);
                value = value * 10 + (digit - b'0') as u32;
            }
            result = result.mul_add_small(POW10[chunk.len()], value);
        }

        result.mul_pow52(exponent, exponent)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.words.is_empty()
    }

    fn mul_add_small(&self, factor: u32, addend: u32) -> Bignum {
        let mut words = Vec::with_capacity(self.words.len() + 1);
        let mut carry = addend as u64;

        for &word in &self.words {
            let t = word as u64 * factor as u64 + carry;
            words.push(t as u32);
            carry = t >> 32;
        }
        if carry != 0 {
            words.push(carry as u32);
        }

        Bignum::from_words(words)
    }

    pub fn mul_small(&self, factor: u32) -> Bignum {
        self.mul_add_small(factor, 0)
    }

    pub fn mul(&self, other: &Bignum) -> Bignum {
        if self.is_zero() || other.is_zero() {
            return Bignum::zero();
        }

        let mut words = vec![0u32; self.words.len() + other.words.len()];

        for (i, &a) in self.words.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let mut carry = 0u64;
            for (j, &b) in other.words.iter().enumerate() {
                // (2^32 - 1)^2 + 2 * (2^32 - 1) == 2^64 - 1, so this can't overflow
                let t = a as u64 * b as u64 + words[i + j] as u64 + carry;
                words[i + j] = t as u32;
                carry = t >> 32;
            }
            words[i + other.words.len()] = carry as u32;
        }

        Bignum::from_words(words)
    }

    /// `self * 5^p5 * 2^p2`.
    pub fn mul_pow52(self, p5: u32, p2: u32) -> Bignum {
        let mut value = match p5 {
            0 => self,
            p if (p as usize) < SMALL_5_POW.len() => self.mul_small(SMALL_5_POW[p as usize]),
            p => self.mul(&pow5(p)),
        };
        value.shift_left(p2);
        value
    }

    /// `5^p5 * 2^p2`.
    pub fn pow52(p5: u32, p2: u32) -> Bignum {
        let mut value = Bignum::clone(&pow5(p5));
        value.shift_left(p2);
        value
    }

    pub fn shift_left(&mut self, bits: u32) {
        if bits == 0 || self.is_zero() {
            return;
        }

        let word_shift = (bits / 32) as usize;
        let bit_shift = bits % 32;

        if bit_shift != 0 {
            let mut carry = 0u32;
            for word in self.words.iter_mut() {
                let next = *word >> (32 - bit_shift);
                *word = (*word << bit_shift) | carry;
                carry = next;
            }
            if carry != 0 {
                self.words.push(carry);
            }
        }

        if word_shift != 0 {
            self.words.splice(0..0, std::iter::repeat(0).take(word_shift));
        }
    }

    pub fn shift_left_new(&self, bits: u32) -> Bignum {
        let mut value = self.clone();
        value.shift_left(bits);
        value
    }

    /// Shift left until the top bit of the top word is set, returning the
    /// shift amount. Normalizing a divisor keeps the quotient estimate in
    /// `quotient_digit_and_remainder_times_ten` within two of the truth.
    pub fn normalize(&mut self) -> u32 {
        let shift = match self.words.last() {
            Some(top) => top.leading_zeros(),
            None => panic!("cannot normalize a zero bignum"),
        };
        self.shift_left(shift);
        shift
    }

    /// `self - other`. Panics if `other > self`.
    pub fn sub(&self, other: &Bignum) -> Bignum {
        assert!(*self >= *other, "bignum subtraction underflow");

        let mut words = Vec::with_capacity(self.words.len());
        let mut borrow = 0u32;

        for (i, &a) in self.words.iter().enumerate() {
            let b = other.words.get(i).copied().unwrap_or(0);
            let (d, o1) = a.overflowing_sub(b);
            let (d, o2) = d.overflowing_sub(borrow);
            words.push(d);
            borrow = (o1 || o2) as u32;
        }

        Bignum::from_words(words)
    }

    pub fn add(&self, other: &Bignum) -> Bignum {
        let (long, short) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut words = Vec::with_capacity(long.words.len() + 1);
        let mut carry = 0u64;

        for (i, &a) in long.words.iter().enumerate() {
            let t = a as u64 + short.words.get(i).copied().unwrap_or(0) as u64 + carry;
            words.push(t as u32);
            carry = t >> 32;
        }
        if carry != 0 {
            words.push(carry as u32);
        }

        Bignum::from_words(words)
    }

    /// One step of decimal long division.
    ///
    /// Requires `self < 10 * divisor`. Returns `self / divisor` (a single
    /// decimal digit) and replaces `self` with `10 * (self % divisor)`.
    ///
    /// ```
    /// # use floating_decimal::Bignum;
    /// let mut b = Bignum::from_u64(47);
    /// let s = Bignum::from_u64(10);
    ///
    /// assert_eq!(b.quotient_digit_and_remainder_times_ten(&s), 4);
    /// assert_eq!(b, Bignum::from_u64(70));
    /// ```
    pub fn quotient_digit_and_remainder_times_ten(&mut self, divisor: &Bignum) -> u32 {
        let n = divisor.words.len();
        assert!(n > 0, "bignum division by zero");

        let top = divisor.words[n - 1] as u64;

        // Dividing by the divisor's top word only never underestimates
        let estimate = match self.words.len() {
            len if len > n + 1 => panic!("quotient digit does not fit a decimal digit"),
            len if len == n + 1 => (((self.words[n] as u64) << 32) | self.words[n - 1] as u64) / top,
            len if len == n => self.words[n - 1] as u64 / top,
            _ => 0,
        };

        let mut q = estimate.min(9) as u32;
        let mut product = divisor.mul_small(q);
        while product > *self {
            q -= 1;
            product = product.sub(divisor);
        }

        let remainder = self.sub(&product);
        assert!(remainder < *divisor, "quotient digit does not fit a decimal digit");

        *self = remainder.mul_small(10);
        q
    }
}

impl Ord for Bignum {
    fn cmp(&self, other: &Bignum) -> Ordering {
        self.words
            .len()
            .cmp(&other.words.len())
            .then_with(|| self.words.iter().rev().cmp(other.words.iter().rev()))
    }
}

impl PartialOrd for Bignum {
    fn partial_cmp(&self, other: &Bignum) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Sparse, append-only. Slots are filled once and never replaced.
static POW5_CACHE: RwLock<Vec<Option<Arc<Bignum>>>> = RwLock::new(Vec::new());

/// `5^p`, memoized for the whole process.
///
/// A miss computes the value outside of the lock, as `5^(p/2) * 5^(p - p/2)`,
/// and then publishes it. If two threads race on the same power the first
/// published value wins, and both are equal anyway.
pub fn pow5(p: u32) -> Arc<Bignum> {
    let index = p as usize;

    if let Some(Some(cached)) = POW5_CACHE.read().unwrap_or_else(PoisonError::into_inner).get(index) {
        return Arc::clone(cached);
    }

    let value = if index < LONG_5_POW.len() {
        Bignum::from_u64(LONG_5_POW[index])
    } else {
        let q = p / 2;
        let r = p - q;
        let low = pow5(q);

        match SMALL_5_POW.get(r as usize) {
            Some(&small) => low.mul_small(small),
            None => low.mul(&pow5(r)),
        }
    };

    let mut cache = POW5_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if cache.len() <= index {
        cache.resize(index + 1, None);
    }
    Arc::clone(cache[index].get_or_insert_with(|| Arc::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn big(v: u128) -> Bignum {
        Bignum::from_u64(v as u64).add(&Bignum::from_u64((v >> 64) as u64).shift_left_new(64))
    }

    fn bit_len(v: &Bignum) -> u32 {
        match v.words.last() {
            Some(&top) => v.words.len() as u32 * 32 - top.leading_zeros(),
            None => 0,
        }
    }

    #[test]
    fn zero_has_no_words() {
        assert!(Bignum::from_u64(0).is_zero());
        assert_eq!(Bignum::from_u64(0), Bignum::zero());
        assert_eq!(Bignum::from_u64(5).sub(&Bignum::from_u64(5)), Bignum::zero());
        assert_eq!(Bignum::from_u64(5).mul_small(0), Bignum::zero());
        assert_eq!(bit_len(&Bignum::zero()), 0);
    }

    #[test]
    fn multiplication_matches_native() {
        let a = 0xdead_beef_cafe_babe_u64;
        let b = 0x1234_5678_9abc_def0_u64;

        assert_eq!(Bignum::from_u64(a).mul(&Bignum::from_u64(b)), big(a as u128 * b as u128));
        assert_eq!(Bignum::from_u64(a).mul_small(1_000_000_007), big(a as u128 * 1_000_000_007));
        assert_eq!(Bignum::from_u64(a).mul(&Bignum::zero()), Bignum::zero());
    }

    #[test]
    fn add_and_sub_carry_across_words() {
        let max = Bignum::from_u64(u64::MAX);
        let sum = max.add(&Bignum::from_u64(1));

        assert_eq!(sum, big(1 << 64));
        assert_eq!(sum.sub(&Bignum::from_u64(1)), max);
        assert_eq!(big(1 << 100).sub(&big(1)), big((1 << 100) - 1));
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn sub_underflow_panics() {
        Bignum::from_u64(1).sub(&Bignum::from_u64(2));
    }

    #[test]
    fn shifts() {
        let mut v = Bignum::from_u64(0b1011);
        v.shift_left(70);
        assert_eq!(v, big(0b1011 << 70));
        assert_eq!(bit_len(&v), 74);

        assert_eq!(Bignum::from_u64(3).shift_left_new(32), big(3 << 32));
        assert_eq!(Bignum::from_u64(3).shift_left_new(0), Bignum::from_u64(3));
    }

    #[test]
    fn normalize_sets_top_bit() {
        let mut v = big((1 << 40) + 12345);
        let shift = v.normalize();

        assert_eq!(shift, 23);
        assert_eq!(bit_len(&v) % 32, 0);
        assert_eq!(v, big(((1 << 40) + 12345) << 23));
    }

    #[test]
    fn ordering() {
        assert!(big(1 << 64) > Bignum::from_u64(u64::MAX));
        assert!(Bignum::from_u64(7) < Bignum::from_u64(8));
        assert_eq!(big(1 << 90).cmp(&big(1 << 90)), Ordering::Equal);
    }

    #[test]
    fn from_digits_scales_by_power_of_ten() {
        assert_eq!(Bignum::from_digits(b"12345678901234567890", 0), big(12345678901234567890));
        assert_eq!(Bignum::from_digits(b"42", 3), Bignum::from_u64(42000));
        assert_eq!(Bignum::from_digits(b"000", 0), Bignum::zero());
    }

    #[test]
    fn long_division_digits() {
        // 1/7 = 0.142857...
        let mut b = Bignum::from_u64(1).mul_pow52(40, 3);
        let mut s = Bignum::from_u64(7).mul_pow52(40, 3);
        let shift = s.normalize();
        b.shift_left(shift);
        b = b.mul_small(10);

        let digits: Vec<u32> = (0..12).map(|_| b.quotient_digit_and_remainder_times_ten(&s)).collect();
        assert_eq!(digits, [1, 4, 2, 8, 5, 7, 1, 4, 2, 8, 5, 7]);
    }

    #[test]
    fn long_division_with_unnormalized_divisor() {
        let mut b = Bignum::from_u64(99);
        assert_eq!(b.quotient_digit_and_remainder_times_ten(&Bignum::from_u64(10)), 9);
        assert_eq!(b, Bignum::from_u64(90));
    }

    #[test]
    fn powers_of_five() {
        let mut expected = Bignum::from_u64(1);
        for p in 0..400 {
            assert_eq!(*pow5(p), expected, "5^{}", p);
            expected = expected.mul_small(5);
        }
        assert_eq!(Bignum::pow52(3, 4), Bignum::from_u64(2000));
    }

    #[test]
    fn cache_is_shared_between_threads() {
        let handles: Vec<_> = (0..8)
            .map(|i| thread::spawn(move || Bignum::clone(&pow5(700 + i % 3))))
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let value = handle.join().unwrap();
            assert_eq!(value, pow5(350 + (i as u32 % 3) / 2).mul(&pow5(350 + (i as u32 % 3 + 1) / 2)));
        }
    }

    #[test]
    fn bit_counts() {
        assert_eq!(pow5_bits(0), 1);
        assert_eq!(pow5_bits(1), 3);
        assert_eq!(pow5_bits(4), 10);
        assert_eq!(pow5_bits(27), 63);
        assert_eq!(pow5_bits(30), 90);
    }
}
