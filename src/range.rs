//! Wraparound integer intervals.
//!
//! An [`IntRange`] is a half-open interval `[lower, upper)` of `width`-bit
//! words, read modulo `2^width`. When `lower > upper` the interval wraps past
//! the maximum value back to zero, so a single range can describe sets such as
//! `{250..=255, 0..=3}` without losing convexity on the ring of machine words.
//!
//! Two degenerate encodings have `lower == upper`:
//!
//! - the **empty set** (bottom) is `[0, 0)`,
//! - the **full set** (top) is `[max, max)`.
//!
//! Any other pair with `lower == upper` is invalid.
//!
//! Every operator returns a range that contains the result of applying the
//! concrete operation to every pair of members of its inputs, under modular
//! semantics. When the exact result is not a single interval, the smaller of
//! the candidate covering intervals is chosen.
//!
//! # Examples
//!
//! ```
//! use range_rs::predicate::Predicate;
//! use range_rs::range::IntRange;
//!
//! let x = IntRange::full(8);
//! let ten = IntRange::constant(8, 10);
//!
//! // Values of `x` for which `x < 10` may hold.
//! let taken = x.intersect(&IntRange::allowed_icmp_region(Predicate::Ult, &ten));
//! assert_eq!(taken, IntRange::inclusive(8, 0, 9));
//! ```

use std::cmp::Ordering;
use std::fmt;

use log::warn;
use num_bigint::BigUint;
use num_traits::One;

use crate::apint::ApInt;
use crate::predicate::Predicate;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IntRange {
    lower: ApInt,
    upper: ApInt,
}

// Constructors
impl IntRange {
    /// The full set of `width`-bit values.
    pub fn full(width: u32) -> Self {
        let max = ApInt::max_value(width);
        Self {
            lower: max.clone(),
            upper: max,
        }
    }

    /// The empty set of `width`-bit values.
    pub fn empty(width: u32) -> Self {
        Self {
            lower: ApInt::zero(width),
            upper: ApInt::zero(width),
        }
    }

    /// The singleton `{value}`.
    pub fn single(value: ApInt) -> Self {
        let upper = value.wrapping_add(&ApInt::one(value.width()));
        Self {
            lower: value,
            upper,
        }
    }

    /// The singleton `{value}` at the given width.
    pub fn constant(width: u32, value: u64) -> Self {
        Self::single(ApInt::from_u64(width, value))
    }

    /// Creates `[lower, upper)`.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ, or if `lower == upper` while being neither
    /// the minimum nor the maximum value.
    pub fn from_bounds(lower: ApInt, upper: ApInt) -> Self {
        assert_eq!(lower.width(), upper.width(), "Bound widths differ");
        assert!(
            lower != upper || lower.is_max_value() || lower.is_zero(),
            "Lower == Upper, but they aren't min or max value"
        );
        Self { lower, upper }
    }

    /// Creates `[lower, upper)`, reading `lower == upper` as the full set.
    pub fn non_empty(lower: ApInt, upper: ApInt) -> Self {
        if lower == upper {
            Self::full(lower.width())
        } else {
            Self::from_bounds(lower, upper)
        }
    }

    /// Creates the closed interval `[lo, hi]` (wrapping if `lo > hi`).
    pub fn inclusive(width: u32, lo: u64, hi: u64) -> Self {
        let lower = ApInt::from_u64(width, lo);
        let upper = ApInt::from_u64(width, hi).wrapping_add(&ApInt::one(width));
        Self::non_empty(lower, upper)
    }
}

// Queries
impl IntRange {
    pub fn width(&self) -> u32 {
        self.lower.width()
    }

    pub fn lower(&self) -> &ApInt {
        &self.lower
    }

    pub fn upper(&self) -> &ApInt {
        &self.upper
    }

    pub fn is_full(&self) -> bool {
        self.lower == self.upper && self.lower.is_max_value()
    }

    pub fn is_empty(&self) -> bool {
        self.lower == self.upper && self.lower.is_zero()
    }

    /// Whether `lower > upper`, including `[x, 0)`.
    pub fn is_upper_wrapped(&self) -> bool {
        self.lower.ugt(&self.upper)
    }

    /// Whether the set actually contains both the maximum value and zero.
    pub fn is_wrapped(&self) -> bool {
        self.lower.ugt(&self.upper) && !self.upper.is_zero()
    }

    pub fn is_upper_sign_wrapped(&self) -> bool {
        self.lower.sgt(&self.upper)
    }

    /// Whether the set contains both the signed maximum and the signed minimum.
    pub fn is_sign_wrapped(&self) -> bool {
        self.lower.sgt(&self.upper) && !self.upper.is_signed_min()
    }

    pub fn single_element(&self) -> Option<&ApInt> {
        if self.upper == self.lower.wrapping_add(&ApInt::one(self.width())) {
            Some(&self.lower)
        } else {
            None
        }
    }

    pub fn is_single_element(&self) -> bool {
        self.single_element().is_some()
    }

    /// Number of members, as a natural number up to `2^width`.
    pub fn set_size(&self) -> BigUint {
        if self.is_full() {
            return BigUint::one() << self.width();
        }
        self.upper.wrapping_sub(&self.lower).value().clone()
    }

    pub fn is_size_strictly_smaller_than(&self, other: &IntRange) -> bool {
        self.set_size() < other.set_size()
    }

    pub fn unsigned_max(&self) -> ApInt {
        if self.is_full() || self.is_upper_wrapped() {
            ApInt::max_value(self.width())
        } else {
            self.upper.wrapping_sub(&ApInt::one(self.width()))
        }
    }

    pub fn unsigned_min(&self) -> ApInt {
        if self.is_full() || self.is_wrapped() {
            ApInt::zero(self.width())
        } else {
            self.lower.clone()
        }
    }

    pub fn signed_max(&self) -> ApInt {
        if self.is_full() || self.is_upper_sign_wrapped() {
            ApInt::signed_max(self.width())
        } else {
            self.upper.wrapping_sub(&ApInt::one(self.width()))
        }
    }

    pub fn signed_min(&self) -> ApInt {
        if self.is_full() || self.is_sign_wrapped() {
            ApInt::signed_min(self.width())
        } else {
            self.lower.clone()
        }
    }

    pub fn contains(&self, value: &ApInt) -> bool {
        if self.lower == self.upper {
            return self.is_full();
        }
        if !self.is_upper_wrapped() {
            self.lower.ule(value) && value.ult(&self.upper)
        } else {
            self.lower.ule(value) || value.ult(&self.upper)
        }
    }

    /// Whether every member of `other` is a member of `self`.
    pub fn contains_range(&self, other: &IntRange) -> bool {
        if self.is_full() || other.is_empty() {
            return true;
        }
        if self.is_empty() || other.is_full() {
            return false;
        }

        if !self.is_upper_wrapped() {
            if other.is_upper_wrapped() {
                return false;
            }
            return self.lower.ule(&other.lower) && other.upper.ule(&self.upper);
        }

        if !other.is_upper_wrapped() {
            return other.upper.ule(&self.upper) || self.lower.ule(&other.lower);
        }

        other.upper.ule(&self.upper) && self.lower.ule(&other.lower)
    }
}

/// Picks the smaller of two covering candidates.
fn preferred(a: IntRange, b: IntRange) -> IntRange {
    if b.is_size_strictly_smaller_than(&a) {
        b
    } else {
        a
    }
}

// Lattice operations
impl IntRange {
    /// Smallest range containing both `self` and `other` (convex join).
    pub fn union(&self, other: &IntRange) -> IntRange {
        self.check_width(other);

        if self.is_full() || other.is_empty() {
            return self.clone();
        }
        if other.is_full() || self.is_empty() {
            return other.clone();
        }

        if !self.is_upper_wrapped() && other.is_upper_wrapped() {
            return other.union(self);
        }

        let (l, u) = (&self.lower, &self.upper);
        let (ol, ou) = (&other.lower, &other.upper);

        if !self.is_upper_wrapped() && !other.is_upper_wrapped() {
            //        L---U  and  L---U        : self
            //  L---U                   L---U  : other
            if ou.ult(l) || u.ult(ol) {
                return preferred(
                    IntRange::from_bounds(l.clone(), ou.clone()),
                    IntRange::from_bounds(ol.clone(), u.clone()),
                );
            }

            let one = ApInt::one(self.width());
            let lower = if ol.ult(l) { ol } else { l };
            let upper = if ou.wrapping_sub(&one).ugt(&u.wrapping_sub(&one)) {
                ou
            } else {
                u
            };
            return IntRange::non_empty(lower.clone(), upper.clone());
        }

        if !other.is_upper_wrapped() {
            // ------U   L-----  and  ------U   L----- : self
            //   L--U                            L--U  : other
            if ou.ule(u) || ol.uge(l) {
                return self.clone();
            }

            // ------U   L----- : self
            //    L---------U   : other
            if ol.ule(u) && l.ule(ou) {
                return IntRange::full(self.width());
            }

            // ----U       L---- : self
            //       L---U       : other
            if u.ult(ol) && ou.ult(l) {
                return preferred(
                    IntRange::from_bounds(l.clone(), ou.clone()),
                    IntRange::from_bounds(ol.clone(), u.clone()),
                );
            }

            // ----U     L----- : self
            //        L----U    : other
            if u.ult(ol) && l.ule(ou) {
                return IntRange::from_bounds(ol.clone(), u.clone());
            }

            // ------U    L---- : self
            //    L-----U       : other
            return IntRange::from_bounds(l.clone(), ou.clone());
        }

        // Both wrapped.
        if ol.ule(u) || l.ule(ou) {
            return IntRange::full(self.width());
        }
        let lower = if ol.ult(l) { ol } else { l };
        let upper = if ou.ugt(u) { ou } else { u };
        IntRange::from_bounds(lower.clone(), upper.clone())
    }

    /// A range containing every value in both `self` and `other`.
    ///
    /// When the exact intersection is two disjoint pieces, the smaller input
    /// covering both pieces is returned.
    pub fn intersect(&self, other: &IntRange) -> IntRange {
        self.check_width(other);

        if self.is_empty() || other.is_full() {
            return self.clone();
        }
        if other.is_empty() || self.is_full() {
            return other.clone();
        }

        if !self.is_upper_wrapped() && other.is_upper_wrapped() {
            return other.intersect(self);
        }

        let (l, u) = (&self.lower, &self.upper);
        let (ol, ou) = (&other.lower, &other.upper);
        let empty = || IntRange::empty(self.width());

        if !self.is_upper_wrapped() && !other.is_upper_wrapped() {
            if l.ult(ol) {
                // L---U       : self
                //       L---U : other
                if u.ule(ol) {
                    return empty();
                }
                // L---U       : self
                //   L---U     : other
                if u.ult(ou) {
                    return IntRange::from_bounds(ol.clone(), u.clone());
                }
                // L-------U   : self
                //   L---U     : other
                return other.clone();
            }
            //   L---U     : self
            // L-------U   : other
            if u.ult(ou) {
                return self.clone();
            }
            //   L-----U   : self
            // L-----U     : other
            if l.ult(ou) {
                return IntRange::from_bounds(l.clone(), ou.clone());
            }
            //       L---U : self
            // L---U       : other
            return empty();
        }

        if self.is_upper_wrapped() && !other.is_upper_wrapped() {
            if ol.ult(u) {
                // ------U   L--- : self
                //  L--U          : other
                if ou.ult(u) {
                    return other.clone();
                }
                // ------U   L--- : self
                //  L------U      : other
                if ou.ule(l) {
                    return IntRange::from_bounds(ol.clone(), u.clone());
                }
                // ------U   L--- : self
                //  L----------U  : other
                return preferred(self.clone(), other.clone());
            }
            if ol.ult(l) {
                // --U      L---- : self
                //     L--U       : other
                if ou.ule(l) {
                    return empty();
                }
                // --U      L---- : self
                //     L------U   : other
                return IntRange::from_bounds(l.clone(), ou.clone());
            }
            // --U  L------ : self
            //        L--U  : other
            return other.clone();
        }

        // Both wrapped.
        if ou.ult(u) {
            // ------U L-- : self
            // --U L------ : other
            if ol.ult(u) {
                return preferred(self.clone(), other.clone());
            }
            // ----U   L-- : self
            // --U   L---- : other
            if ol.ult(l) {
                return IntRange::from_bounds(l.clone(), ou.clone());
            }
            // ----U L---- : self
            // --U     L-- : other
            return other.clone();
        }
        if ou.ule(l) {
            // --U     L-- : self
            // ----U L---- : other
            if ol.ult(l) {
                return self.clone();
            }
            // --U   L---- : self
            // ----U   L-- : other
            return IntRange::from_bounds(ol.clone(), u.clone());
        }
        // --U L------ : self
        // ------U L-- : other
        preferred(self.clone(), other.clone())
    }

    /// The complement of the set.
    pub fn inverse(&self) -> IntRange {
        if self.is_full() {
            return IntRange::empty(self.width());
        }
        if self.is_empty() {
            return IntRange::full(self.width());
        }
        IntRange::from_bounds(self.upper.clone(), self.lower.clone())
    }

    /// Brings `other` to this range's width, warning when they differ.
    ///
    /// The incoming range is zero-extended or truncated; extension keeps every
    /// member, truncation may fold members together.
    pub fn conform(&self, other: &IntRange) -> IntRange {
        if self.width() == other.width() {
            return other.clone();
        }
        warn!(
            "range {} ({} bits) and {} ({} bits) unmatch",
            self,
            self.width(),
            other,
            other.width()
        );
        other.zext_or_trunc(self.width())
    }

    /// Unions `other` into `self` after width normalization.
    ///
    /// Returns whether `self` grew.
    pub fn union_in_place(&mut self, other: &IntRange) -> bool {
        let other = self.conform(other);
        let joined = self.union(&other);
        let changed = joined != *self;
        *self = joined;
        changed
    }

    fn check_width(&self, other: &IntRange) {
        assert_eq!(
            self.width(),
            other.width(),
            "Range widths differ: {} vs {}",
            self.width(),
            other.width()
        );
    }
}

// Arithmetic
impl IntRange {
    pub fn add(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }
        if self.is_full() || other.is_full() {
            return IntRange::full(self.width());
        }

        let one = ApInt::one(self.width());
        let lower = self.lower.wrapping_add(&other.lower);
        let upper = self.upper.wrapping_add(&other.upper).wrapping_sub(&one);
        if lower == upper {
            return IntRange::full(self.width());
        }

        let result = IntRange::from_bounds(lower, upper);
        if result.is_size_strictly_smaller_than(self) || result.is_size_strictly_smaller_than(other) {
            // Wrapped around the whole ring.
            return IntRange::full(self.width());
        }
        result
    }

    pub fn sub(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }
        if self.is_full() || other.is_full() {
            return IntRange::full(self.width());
        }

        let one = ApInt::one(self.width());
        let lower = self.lower.wrapping_sub(&other.upper).wrapping_add(&one);
        let upper = self.upper.wrapping_sub(&other.lower);
        if lower == upper {
            return IntRange::full(self.width());
        }

        let result = IntRange::from_bounds(lower, upper);
        if result.is_size_strictly_smaller_than(self) || result.is_size_strictly_smaller_than(other) {
            return IntRange::full(self.width());
        }
        result
    }

    /// Multiplication, computed in double width both as unsigned and as
    /// signed products, keeping the smaller truncated result.
    pub fn multiply(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }

        let width = self.width();
        let wide = width * 2;

        let this_min = self.unsigned_min().zext(wide);
        let this_max = self.unsigned_max().zext(wide);
        let other_min = other.unsigned_min().zext(wide);
        let other_max = other.unsigned_max().zext(wide);
        let unsigned = IntRange::from_bounds(
            this_min.wrapping_mul(&other_min),
            this_max
                .wrapping_mul(&other_max)
                .wrapping_add(&ApInt::one(wide)),
        )
        .truncate(width);

        let this_min = self.signed_min().sext(wide);
        let this_max = self.signed_max().sext(wide);
        let other_min = other.signed_min().sext(wide);
        let other_max = other.signed_max().sext(wide);
        let products = [
            this_min.wrapping_mul(&other_min),
            this_min.wrapping_mul(&other_max),
            this_max.wrapping_mul(&other_min),
            this_max.wrapping_mul(&other_max),
        ];
        let lowest = products
            .iter()
            .min_by(|a, b| a.scmp(b))
            .cloned()
            .unwrap_or_else(|| ApInt::zero(wide));
        let highest = products
            .iter()
            .max_by(|a, b| a.scmp(b))
            .cloned()
            .unwrap_or_else(|| ApInt::zero(wide));
        let signed = IntRange::from_bounds(lowest, highest.wrapping_add(&ApInt::one(wide)))
            .truncate(width);

        preferred(unsigned, signed)
    }

    /// Unsigned division; division by a range that is exactly `{0}` is empty.
    pub fn udiv(&self, rhs: &IntRange) -> IntRange {
        self.check_width(rhs);
        if self.is_empty() || rhs.is_empty() || rhs.unsigned_max().is_zero() {
            return IntRange::empty(self.width());
        }

        let one = ApInt::one(self.width());
        let lower = self.unsigned_min().udiv(&rhs.unsigned_max());

        // Smallest non-zero divisor: usually 1, except for ranges `[x, 1)`.
        let mut rhs_min = rhs.unsigned_min();
        if rhs_min.is_zero() {
            rhs_min = if rhs.upper.is_one() {
                rhs.lower.clone()
            } else {
                one.clone()
            };
        }

        let upper = self.unsigned_max().udiv(&rhs_min).wrapping_add(&one);
        IntRange::non_empty(lower, upper)
    }

    pub fn shl(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }

        let max = self.unsigned_max();
        let other_max = other.unsigned_max();
        if other_max.is_zero() {
            return self.clone();
        }
        if other_max.value() > &BigUint::from(max.leading_zeros()) {
            // Some member overflows.
            return IntRange::full(self.width());
        }

        let min = self.unsigned_min().shl(other.unsigned_min().shift_amount());
        let max = max.shl(other_max.shift_amount());
        IntRange::non_empty(min, max.wrapping_add(&ApInt::one(self.width())))
    }

    pub fn lshr(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }

        let max = self
            .unsigned_max()
            .lshr(other.unsigned_min().shift_amount())
            .wrapping_add(&ApInt::one(self.width()));
        let min = self
            .unsigned_min()
            .lshr(other.unsigned_max().shift_amount());
        IntRange::non_empty(min, max)
    }

    /// Bitwise and: bounded above by the smaller unsigned maximum.
    pub fn binary_and(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }

        let this_max = self.unsigned_max();
        let other_max = other.unsigned_max();
        let umin = other_max.umin(&this_max);
        if umin.is_max_value() {
            return IntRange::full(self.width());
        }
        IntRange::from_bounds(
            ApInt::zero(self.width()),
            umin.wrapping_add(&ApInt::one(self.width())),
        )
    }

    /// Bitwise or: bounded below by the larger unsigned minimum.
    pub fn binary_or(&self, other: &IntRange) -> IntRange {
        self.check_width(other);
        if self.is_empty() || other.is_empty() {
            return IntRange::empty(self.width());
        }

        let this_min = self.unsigned_min();
        let other_min = other.unsigned_min();
        let umax = this_min.umax(&other_min);
        if umax.is_zero() {
            return IntRange::full(self.width());
        }
        IntRange::from_bounds(umax.clone(), ApInt::zero(self.width()))
    }
}

// Width changes
impl IntRange {
    pub fn zero_extend(&self, width: u32) -> IntRange {
        let src = self.width();
        assert!(width > src, "Not a value extension");
        if self.is_empty() {
            return IntRange::empty(width);
        }

        if self.is_full() || self.is_upper_wrapped() {
            // [x, 0) does not really wrap around.
            let lower = if self.upper.is_zero() {
                self.lower.zext(width)
            } else {
                ApInt::zero(width)
            };
            return IntRange::from_bounds(lower, ApInt::one(width).shl(src));
        }

        IntRange::from_bounds(self.lower.zext(width), self.upper.zext(width))
    }

    pub fn sign_extend(&self, width: u32) -> IntRange {
        let src = self.width();
        assert!(width > src, "Not a value extension");
        if self.is_empty() {
            return IntRange::empty(width);
        }

        // [x, INT_MIN) does not really wrap around.
        if self.upper.is_signed_min() {
            return IntRange::from_bounds(self.lower.sext(width), self.upper.zext(width));
        }

        if self.is_full() || self.is_sign_wrapped() {
            return IntRange::from_bounds(
                ApInt::signed_min(src).sext(width),
                ApInt::signed_max(src)
                    .zext(width)
                    .wrapping_add(&ApInt::one(width)),
            );
        }

        IntRange::from_bounds(self.lower.sext(width), self.upper.sext(width))
    }

    pub fn truncate(&self, width: u32) -> IntRange {
        let src = self.width();
        assert!(width < src, "Not a value truncation");
        if self.is_empty() {
            return IntRange::empty(width);
        }
        if self.is_full() {
            return IntRange::full(width);
        }

        let mut lower_div = self.lower.clone();
        let mut upper_div = self.upper.clone();
        let mut union = IntRange::empty(width);

        // A wrapped set is analysed as [lower, max) plus [max, upper).
        if self.is_upper_wrapped() {
            if self.upper.active_bits() > width || self.upper == ApInt::max_value(width).zext(src) {
                return IntRange::full(width);
            }
            union = IntRange::from_bounds(ApInt::max_value(width), self.upper.trunc(width));
            upper_div = ApInt::max_value(src);
            if lower_div == upper_div {
                return union;
            }
        }

        // Chop off the bits past the destination width.
        if lower_div.active_bits() > width {
            let adjust = lower_div.and(&ApInt::bits_set_from(src, width));
            lower_div = lower_div.wrapping_sub(&adjust);
            upper_div = upper_div.wrapping_sub(&adjust);
        }

        let upper_div_width = upper_div.active_bits();
        if upper_div_width <= width {
            return IntRange::from_bounds(lower_div.trunc(width), upper_div.trunc(width)).union(&union);
        }

        // The truncated value wraps around once; that is still an interval.
        if upper_div_width == width + 1 {
            let upper_div = upper_div.clear_bit(width);
            if upper_div.ult(&lower_div) {
                return IntRange::from_bounds(lower_div.trunc(width), upper_div.trunc(width)).union(&union);
            }
        }

        IntRange::full(width)
    }

    pub fn zext_or_trunc(&self, width: u32) -> IntRange {
        match width.cmp(&self.width()) {
            Ordering::Greater => self.zero_extend(width),
            Ordering::Less => self.truncate(width),
            Ordering::Equal => self.clone(),
        }
    }
}

// Comparison regions
impl IntRange {
    /// The values `x` for which `x <pred> y` holds for *some* `y` in `other`.
    pub fn allowed_icmp_region(pred: Predicate, other: &IntRange) -> IntRange {
        if other.is_empty() {
            return other.clone();
        }

        let w = other.width();
        match pred {
            Predicate::Eq => other.clone(),
            Predicate::Ne => {
                if other.is_single_element() {
                    IntRange::from_bounds(other.upper.clone(), other.lower.clone())
                } else {
                    IntRange::full(w)
                }
            }
            Predicate::Ult => {
                let umax = other.unsigned_max();
                if umax.is_zero() {
                    return IntRange::empty(w);
                }
                IntRange::from_bounds(ApInt::zero(w), umax)
            }
            Predicate::Slt => {
                let smax = other.signed_max();
                if smax.is_signed_min() {
                    return IntRange::empty(w);
                }
                IntRange::from_bounds(ApInt::signed_min(w), smax)
            }
            Predicate::Ule => IntRange::non_empty(
                ApInt::zero(w),
                other.unsigned_max().wrapping_add(&ApInt::one(w)),
            ),
            Predicate::Sle => IntRange::non_empty(
                ApInt::signed_min(w),
                other.signed_max().wrapping_add(&ApInt::one(w)),
            ),
            Predicate::Ugt => {
                let umin = other.unsigned_min();
                if umin.is_max_value() {
                    return IntRange::empty(w);
                }
                IntRange::from_bounds(umin.wrapping_add(&ApInt::one(w)), ApInt::zero(w))
            }
            Predicate::Sgt => {
                let smin = other.signed_min();
                if smin.is_signed_max() {
                    return IntRange::empty(w);
                }
                IntRange::from_bounds(smin.wrapping_add(&ApInt::one(w)), ApInt::signed_min(w))
            }
            Predicate::Uge => IntRange::non_empty(other.unsigned_min(), ApInt::zero(w)),
            Predicate::Sge => IntRange::non_empty(other.signed_min(), ApInt::signed_min(w)),
        }
    }

    /// The values `x` for which `x <pred> y` holds for *every* `y` in `other`.
    pub fn satisfying_icmp_region(pred: Predicate, other: &IntRange) -> IntRange {
        IntRange::allowed_icmp_region(pred.inverse(), other).inverse()
    }

    /// Whether `x <pred> y` holds for every `x` in `self` and `y` in `other`.
    pub fn icmp(&self, pred: Predicate, other: &IntRange) -> bool {
        IntRange::satisfying_icmp_region(pred, other).contains_range(self)
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            write!(f, "full-set")
        } else if self.is_empty() {
            write!(f, "empty-set")
        } else {
            write!(f, "[{},{})", self.lower, self.upper)
        }
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{} {}", self.width(), self)
    }
}
