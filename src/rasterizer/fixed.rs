//! Fixed-point scalar for the edge arithmetic
//!
//! Accumulating float slopes across a triangle leaves visible cracks between
//! neighbours near shared corners. Snapping vertices to 1/16 pixel and doing
//! the edge math exactly in integers removes them.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Integer type that can back a [`Fixed`] value.
///
/// All arithmetic is carried out in `i128` and narrowed back, so the backing
/// only decides storage width and overflow range.
pub trait FixedBacking: Copy + Ord + Default + fmt::Debug {
    const BITS: u32;

    fn to_wide(self) -> i128;

    /// Narrow an intermediate back into the backing. Values out of range are
    /// saturated.
    fn from_wide(v: i128) -> Self;
}

impl FixedBacking for i32 {
    const BITS: u32 = 32;

    fn to_wide(self) -> i128 {
        self as i128
    }

    fn from_wide(v: i128) -> Self {
        v.clamp(i32::MIN as i128, i32::MAX as i128) as i32
    }
}

impl FixedBacking for i64 {
    const BITS: u32 = 64;

    fn to_wide(self) -> i128 {
        self as i128
    }

    fn from_wide(v: i128) -> Self {
        v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// Signed fixed-point number with `F` fractional bits stored in `B`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed<B: FixedBacking, const F: u32> {
    raw: B,
}

/// 28.4 sub-pixel coordinate / edge delta
pub type Sub4 = Fixed<i32, 4>;

/// 56.8 edge accumulator (product of two [`Sub4`] values)
pub type Acc8 = Fixed<i64, 8>;

/// Divide by `2^shift`, rounding half away from zero
fn round_shift(v: i128, shift: u32) -> i128 {
    if shift == 0 {
        return v;
    }
    let half = 1i128 << (shift - 1);
    if v >= 0 {
        (v + half) >> shift
    } else {
        -((-v + half) >> shift)
    }
}

impl<B: FixedBacking, const F: u32> Fixed<B, F> {
    pub const FRAC_BITS: u32 = F;

    pub fn from_raw(raw: B) -> Self {
        Self { raw }
    }

    pub fn raw(self) -> B {
        self.raw
    }

    /// Smallest representable positive step
    pub fn epsilon() -> Self {
        Self::from_raw(B::from_wide(1))
    }

    pub fn one() -> Self {
        Self::from_int(1)
    }

    pub fn from_int(v: i64) -> Self {
        Self::from_raw(B::from_wide((v as i128) << F))
    }

    /// Round to the nearest representable value
    pub fn from_f32(v: f32) -> Self {
        let scaled = (v as f64) * (1u64 << F) as f64;
        Self::from_raw(B::from_wide(scaled.round() as i128))
    }

    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    pub fn to_f64(self) -> f64 {
        self.raw.to_wide() as f64 / (1u64 << F) as f64
    }

    /// Smallest integer not below this value
    pub fn ceil_to_int(self) -> i64 {
        let mask = (1i128 << F) - 1;
        ((self.raw.to_wide() + mask) >> F) as i64
    }

    /// Multiply, narrowing the `2F`-bit product back to `F` bits with rounding
    pub fn mul(self, rhs: Self) -> Self {
        let product = self.raw.to_wide() * rhs.raw.to_wide();
        Self::from_raw(B::from_wide(round_shift(product, F)))
    }

    /// Exact product carried into a wider representation without rounding.
    ///
    /// The raw product has `2F` fractional bits; `G` must be at least that
    /// for the result to stay exact.
    pub fn mul_denorm<W: FixedBacking, const G: u32>(self, rhs: Self) -> Fixed<W, G> {
        let product = self.raw.to_wide() * rhs.raw.to_wide();
        let frac = 2 * F;
        let raw = if G >= frac {
            product << (G - frac)
        } else {
            product >> (frac - G)
        };
        Fixed::from_raw(W::from_wide(raw))
    }

    /// Convert to another precision/backing; dropping fraction bits rounds
    pub fn rescale<W: FixedBacking, const G: u32>(self) -> Fixed<W, G> {
        let v = self.raw.to_wide();
        let raw = if G >= F {
            v << (G - F)
        } else {
            round_shift(v, F - G)
        };
        Fixed::from_raw(W::from_wide(raw))
    }

    pub fn is_positive(self) -> bool {
        self.raw > B::default()
    }

    pub fn is_negative(self) -> bool {
        self.raw < B::default()
    }

    pub fn is_zero(self) -> bool {
        self.raw == B::default()
    }
}

impl<B: FixedBacking, const F: u32> Add for Fixed<B, F> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::from_raw(B::from_wide(self.raw.to_wide() + rhs.raw.to_wide()))
    }
}

impl<B: FixedBacking, const F: u32> AddAssign for Fixed<B, F> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<B: FixedBacking, const F: u32> Sub for Fixed<B, F> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::from_raw(B::from_wide(self.raw.to_wide() - rhs.raw.to_wide()))
    }
}

impl<B: FixedBacking, const F: u32> SubAssign for Fixed<B, F> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<B: FixedBacking, const F: u32> Neg for Fixed<B, F> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::from_raw(B::from_wide(-self.raw.to_wide()))
    }
}

impl<B: FixedBacking, const F: u32> fmt::Debug for Fixed<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed<{}, {}>({})", B::BITS, F, self.to_f64())
    }
}
