//! Fixed-width machine integers.
//!
//! [`ApInt`] is a bit pattern of a fixed, positive width with modular
//! (wraparound) arithmetic. It carries no signedness: unsigned operations read
//! the bits as a natural number, signed operations read them in two's
//! complement. The value is stored as a [`BigUint`], so any width works, from
//! `i1` booleans up to `i128` and beyond.
//!
//! # Examples
//!
//! ```
//! use range_rs::apint::ApInt;
//!
//! let a = ApInt::from_u64(8, 250);
//! let b = ApInt::from_u64(8, 10);
//! assert_eq!(a.wrapping_add(&b), ApInt::zero(8));
//! assert!(ApInt::from_i64(8, -1).slt(&ApInt::zero(8)));
//! ```

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// `2^width`.
fn modulus(width: u32) -> BigUint {
    BigUint::one() << width
}

/// `2^width - 1`, i.e. all `width` low bits set.
fn mask(width: u32) -> BigUint {
    modulus(width) - 1u32
}

/// A `width`-bit machine word.
///
/// # Invariants
///
/// - `width >= 1`
/// - `value < 2^width`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApInt {
    width: u32,
    value: BigUint,
}

// Constructors
impl ApInt {
    /// Creates a word from an arbitrary natural number, reduced modulo `2^width`.
    ///
    /// # Panics
    ///
    /// Panics if `width == 0`.
    pub fn new(width: u32, value: BigUint) -> Self {
        assert!(width > 0, "Bit width must be positive");
        let value = value & mask(width);
        Self { width, value }
    }

    pub fn from_u64(width: u32, value: u64) -> Self {
        Self::new(width, BigUint::from(value))
    }

    /// Creates a word from a signed value, encoded in two's complement.
    pub fn from_i64(width: u32, value: i64) -> Self {
        if value >= 0 {
            Self::from_u64(width, value as u64)
        } else {
            let magnitude = Self::from_u64(width, value.unsigned_abs());
            Self::zero(width).wrapping_sub(&magnitude)
        }
    }

    pub fn zero(width: u32) -> Self {
        Self::new(width, BigUint::zero())
    }

    pub fn one(width: u32) -> Self {
        Self::new(width, BigUint::one())
    }

    /// All bits set: `2^width - 1`.
    pub fn max_value(width: u32) -> Self {
        Self::new(width, mask(width))
    }

    /// Only the sign bit set: `100..0`.
    pub fn signed_min(width: u32) -> Self {
        Self::new(width, BigUint::one() << (width - 1))
    }

    /// Every bit except the sign bit set: `011..1`.
    pub fn signed_max(width: u32) -> Self {
        Self::signed_min(width).wrapping_sub(&Self::one(width))
    }

    /// Bits `[low, width)` set, bits below `low` clear.
    pub fn bits_set_from(width: u32, low: u32) -> Self {
        if low >= width {
            return Self::zero(width);
        }
        Self::new(width, mask(width) ^ mask(low))
    }
}

// Getters
impl ApInt {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Interprets the word as an unsigned shift amount, saturating at `u32::MAX`.
    pub fn shift_amount(&self) -> u32 {
        self.value.to_u32().unwrap_or(u32::MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    pub fn is_max_value(&self) -> bool {
        self.value == mask(self.width)
    }

    pub fn is_signed_min(&self) -> bool {
        *self == Self::signed_min(self.width)
    }

    pub fn is_signed_max(&self) -> bool {
        *self == Self::signed_max(self.width)
    }

    /// Whether the sign bit is set.
    pub fn is_negative(&self) -> bool {
        !(&self.value >> (self.width - 1)).is_zero()
    }

    /// Number of bits needed to represent the unsigned value.
    pub fn active_bits(&self) -> u32 {
        self.value.bits() as u32
    }

    pub fn leading_zeros(&self) -> u32 {
        self.width - self.active_bits()
    }

    /// Flips the sign bit, turning signed order into unsigned order.
    fn signed_key(&self) -> BigUint {
        &self.value ^ Self::signed_min(self.width).value
    }

    fn check_width(&self, other: &ApInt) {
        assert_eq!(
            self.width, other.width,
            "Bit widths differ: {} vs {}",
            self.width, other.width
        );
    }
}

// Arithmetic
impl ApInt {
    pub fn wrapping_add(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value + &rhs.value)
    }

    pub fn wrapping_sub(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value + modulus(self.width) - &rhs.value)
    }

    pub fn wrapping_mul(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value * &rhs.value)
    }

    /// Unsigned division.
    ///
    /// # Panics
    ///
    /// Panics if `rhs` is zero.
    pub fn udiv(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        assert!(!rhs.is_zero(), "Division by zero");
        Self::new(self.width, &self.value / &rhs.value)
    }

    /// Logical shift left; shifting by `width` or more yields zero.
    pub fn shl(&self, amount: u32) -> ApInt {
        if amount >= self.width {
            return Self::zero(self.width);
        }
        Self::new(self.width, &self.value << amount)
    }

    /// Logical shift right; shifting by `width` or more yields zero.
    pub fn lshr(&self, amount: u32) -> ApInt {
        if amount >= self.width {
            return Self::zero(self.width);
        }
        Self::new(self.width, &self.value >> amount)
    }

    pub fn and(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value & &rhs.value)
    }

    pub fn or(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value | &rhs.value)
    }

    pub fn xor(&self, rhs: &ApInt) -> ApInt {
        self.check_width(rhs);
        Self::new(self.width, &self.value ^ &rhs.value)
    }

    pub fn not(&self) -> ApInt {
        Self::new(self.width, &self.value ^ mask(self.width))
    }

    pub fn clear_bit(&self, bit: u32) -> ApInt {
        let b = BigUint::one() << bit;
        if (&self.value & &b).is_zero() {
            self.clone()
        } else {
            Self::new(self.width, &self.value - b)
        }
    }
}

// Comparisons
impl ApInt {
    pub fn ucmp(&self, other: &ApInt) -> Ordering {
        self.check_width(other);
        self.value.cmp(&other.value)
    }

    pub fn scmp(&self, other: &ApInt) -> Ordering {
        self.check_width(other);
        self.signed_key().cmp(&other.signed_key())
    }

    pub fn ult(&self, other: &ApInt) -> bool {
        self.ucmp(other) == Ordering::Less
    }
    pub fn ule(&self, other: &ApInt) -> bool {
        self.ucmp(other) != Ordering::Greater
    }
    pub fn ugt(&self, other: &ApInt) -> bool {
        self.ucmp(other) == Ordering::Greater
    }
    pub fn uge(&self, other: &ApInt) -> bool {
        self.ucmp(other) != Ordering::Less
    }

    pub fn slt(&self, other: &ApInt) -> bool {
        self.scmp(other) == Ordering::Less
    }
    pub fn sle(&self, other: &ApInt) -> bool {
        self.scmp(other) != Ordering::Greater
    }
    pub fn sgt(&self, other: &ApInt) -> bool {
        self.scmp(other) == Ordering::Greater
    }
    pub fn sge(&self, other: &ApInt) -> bool {
        self.scmp(other) != Ordering::Less
    }

    pub fn umin<'a>(&'a self, other: &'a ApInt) -> &'a ApInt {
        if self.ule(other) {
            self
        } else {
            other
        }
    }

    pub fn umax<'a>(&'a self, other: &'a ApInt) -> &'a ApInt {
        if self.uge(other) {
            self
        } else {
            other
        }
    }
}

// Width changes
impl ApInt {
    pub fn zext(&self, width: u32) -> ApInt {
        assert!(width >= self.width, "Zero-extension must not narrow");
        Self::new(width, self.value.clone())
    }

    pub fn sext(&self, width: u32) -> ApInt {
        assert!(width >= self.width, "Sign-extension must not narrow");
        if self.is_negative() {
            let high = mask(width) ^ mask(self.width);
            Self::new(width, &self.value | high)
        } else {
            Self::new(width, self.value.clone())
        }
    }

    pub fn trunc(&self, width: u32) -> ApInt {
        assert!(width <= self.width, "Truncation must not widen");
        Self::new(width, self.value.clone())
    }

    pub fn zext_or_trunc(&self, width: u32) -> ApInt {
        match width.cmp(&self.width) {
            Ordering::Greater => self.zext(width),
            Ordering::Less => self.trunc(width),
            Ordering::Equal => self.clone(),
        }
    }
}

impl fmt::Display for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{} {}", self.width, self.value)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(ApInt::max_value(8).to_u64(), Some(255));
        assert_eq!(ApInt::signed_min(8).to_u64(), Some(128));
        assert_eq!(ApInt::signed_max(8).to_u64(), Some(127));
        assert_eq!(ApInt::max_value(1).to_u64(), Some(1));
        assert!(ApInt::signed_min(1).is_max_value());
        assert_eq!(ApInt::bits_set_from(8, 4).to_u64(), Some(0xF0));
    }

    #[test]
    fn test_wide_words() {
        let max = ApInt::max_value(128);
        assert_eq!(max.active_bits(), 128);
        assert!(max.wrapping_add(&ApInt::one(128)).is_zero());
        assert_eq!(ApInt::signed_min(128).leading_zeros(), 0);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let a = ApInt::from_u64(8, 200);
        let b = ApInt::from_u64(8, 100);
        assert_eq!(a.wrapping_add(&b).to_u64(), Some(44));
        assert_eq!(b.wrapping_sub(&a).to_u64(), Some(156));
        assert_eq!(a.wrapping_mul(&b).to_u64(), Some((200 * 100) % 256));
        assert_eq!(a.udiv(&b).to_u64(), Some(2));
    }

    #[test]
    fn test_from_negative() {
        assert_eq!(ApInt::from_i64(8, -1), ApInt::max_value(8));
        assert_eq!(ApInt::from_i64(8, -128), ApInt::signed_min(8));
        assert_eq!(ApInt::from_i64(16, -2).to_u64(), Some(0xFFFE));
    }

    #[test]
    fn test_shifts() {
        let x = ApInt::from_u64(8, 0b0110_0001);
        assert_eq!(x.shl(1).to_u64(), Some(0b1100_0010));
        assert_eq!(x.shl(2).to_u64(), Some(0b1000_0100));
        assert_eq!(x.lshr(5).to_u64(), Some(0b11));
        assert!(x.shl(8).is_zero());
        assert!(x.lshr(100).is_zero());
    }

    #[test]
    fn test_signed_order() {
        let minus_one = ApInt::from_i64(8, -1);
        let one = ApInt::one(8);
        assert!(minus_one.ugt(&one));
        assert!(minus_one.slt(&one));
        assert!(ApInt::signed_min(8).slt(&ApInt::signed_max(8)));
        assert!(ApInt::signed_min(8).ugt(&ApInt::signed_max(8)));
    }

    #[test]
    fn test_extend_and_truncate() {
        let x = ApInt::from_i64(8, -3);
        assert_eq!(x.zext(16).to_u64(), Some(253));
        assert_eq!(x.sext(16), ApInt::from_i64(16, -3));
        assert_eq!(ApInt::from_u64(16, 0x1234).trunc(8).to_u64(), Some(0x34));
        assert_eq!(ApInt::from_u64(8, 5).sext(32).to_u64(), Some(5));
    }

    #[test]
    fn test_clear_bit() {
        let x = ApInt::from_u64(16, 0x1FF);
        assert_eq!(x.clear_bit(8).to_u64(), Some(0xFF));
        assert_eq!(x.clear_bit(12), x);
    }

    #[test]
    #[should_panic(expected = "Bit widths differ")]
    fn test_width_mismatch_panics() {
        ApInt::zero(8).wrapping_add(&ApInt::zero(16));
    }
}
