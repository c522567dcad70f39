//! Fixed-point price and quantity representation.
//!
//! Prices and quantities are stored as `u64` values scaled by [`SCALE`]
//! (10^8), so comparisons and hashing are exact. Conversion to and from the
//! external floating representation happens only at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale factor for fixed-point values: 10^8, eight decimal places.
pub const SCALE: u64 = 100_000_000;

/// A fixed-point price, stored as raw units scaled by [`SCALE`].
///
/// `Price` is `Ord` on the raw value and is used directly as the key of the
/// book's per-side skip lists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Zero price.
    pub const ZERO: Price = Price(0);

    /// Build a price from an already-scaled raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Price(raw)
    }

    /// Convert an external floating price. Rounds to the nearest raw unit;
    /// negative inputs clamp to zero.
    pub fn from_f64(value: f64) -> Self {
        if value <= 0.0 {
            return Price(0);
        }
        Price((value * SCALE as f64).round() as u64)
    }

    /// The raw scaled value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Convert back to the external floating representation.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Whether this price is zero (absent for optional price fields).
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Notional value of `quantity` at this price, in raw price units.
    /// Exact integer math, widened to avoid overflow.
    #[inline]
    pub fn notional(&self, quantity: Quantity) -> u128 {
        (self.0 as u128) * (quantity.raw() as u128) / (SCALE as u128)
    }

    /// `self - other`, saturating at zero.
    #[inline]
    pub fn saturating_sub(&self, other: Price) -> Price {
        Price(self.0.saturating_sub(other.0))
    }

    /// Midpoint between two prices.
    #[inline]
    pub fn midpoint(&self, other: Price) -> Price {
        Price(self.0 / 2 + other.0 / 2 + (self.0 % 2 + other.0 % 2) / 2)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}

/// A fixed-point quantity, stored as raw units scaled by [`SCALE`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(0);

    /// Build a quantity from an already-scaled raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Quantity(raw)
    }

    /// Convert an external floating quantity. Negative inputs clamp to zero.
    pub fn from_f64(value: f64) -> Self {
        if value <= 0.0 {
            return Quantity(0);
        }
        Quantity((value * SCALE as f64).round() as u64)
    }

    /// The raw scaled value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Convert back to the external floating representation.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Whether this quantity is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self + other`, saturating on overflow.
    #[inline]
    pub fn saturating_add(&self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }

    /// `self - other`, saturating at zero.
    #[inline]
    pub fn saturating_sub(&self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(other.0))
    }

    /// The smaller of two quantities.
    #[inline]
    pub fn min(&self, other: Quantity) -> Quantity {
        Quantity(self.0.min(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}
