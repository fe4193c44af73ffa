//! Strongly-typed scalar measures for distance, duration, load, and cost.
//!
//! All measures wrap an `i64` value. Arithmetic is overflow-checked in debug
//! builds and wraps to plain integer arithmetic in release builds, so the hot
//! move-evaluation loops pay nothing for the type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

macro_rules! measure {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl $name {
            pub const MAX: $name = $name(i64::MAX);

            /// The underlying integer value.
            #[inline]
            pub fn get(self) -> i64 {
                self.0
            }

            #[inline]
            pub fn max(self, other: $name) -> $name {
                $name(self.0.max(other.0))
            }

            #[inline]
            pub fn min(self, other: $name) -> $name {
                $name(self.0.min(other.0))
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(value: i64) -> Self {
                $name(value)
            }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<$name> for f64 {
            #[inline]
            fn from(value: $name) -> Self {
                value.0 as f64
            }
        }

        impl Add for $name {
            type Output = $name;

            #[inline]
            fn add(self, rhs: $name) -> $name {
                if cfg!(debug_assertions) {
                    $name(self.0.checked_add(rhs.0).expect("measure overflow"))
                } else {
                    $name(self.0.wrapping_add(rhs.0))
                }
            }
        }

        impl Sub for $name {
            type Output = $name;

            #[inline]
            fn sub(self, rhs: $name) -> $name {
                if cfg!(debug_assertions) {
                    $name(self.0.checked_sub(rhs.0).expect("measure overflow"))
                } else {
                    $name(self.0.wrapping_sub(rhs.0))
                }
            }
        }

        impl Neg for $name {
            type Output = $name;

            #[inline]
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: $name) {
                *self = *self + rhs;
            }
        }

        impl SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: $name) {
                *self = *self - rhs;
            }
        }

        impl Mul<i64> for $name {
            type Output = $name;

            #[inline]
            fn mul(self, rhs: i64) -> $name {
                if cfg!(debug_assertions) {
                    $name(self.0.checked_mul(rhs).expect("measure overflow"))
                } else {
                    $name(self.0.wrapping_mul(rhs))
                }
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                iter.fold($name(0), |acc, item| acc + item)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

measure! {
    /// Travel distance between two locations, or along a route segment.
    Distance
}

measure! {
    /// Time quantity: travel or service durations, time windows, time warp.
    Duration
}

measure! {
    /// Vehicle load quantity (demand, supply, capacity).
    Load
}

measure! {
    /// Objective value: distances, penalties, prizes, and fixed costs.
    Cost
}

/// Client and depot coordinates. Plain integers; only centroid and polar
/// angle computations convert these to floating point.
pub type Coordinate = i64;

impl From<Distance> for Cost {
    #[inline]
    fn from(value: Distance) -> Self {
        Cost(value.0)
    }
}

impl From<Duration> for Cost {
    #[inline]
    fn from(value: Duration) -> Self {
        Cost(value.0)
    }
}

impl From<Load> for Cost {
    #[inline]
    fn from(value: Load) -> Self {
        Cost(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_and_ordering() {
        let a = Distance(10);
        let b = Distance(4);

        assert_eq!(a + b, Distance(14));
        assert_eq!(a - b, Distance(6));
        assert_eq!(b * 3, Distance(12));
        assert_eq!(-b, Distance(-4));
        assert!(b < a);
        assert_eq!(a.max(b), a);
        assert_eq!(a.min(b), b);
    }

    #[test]
    fn sums_and_conversions() {
        let total: Duration = [Duration(1), Duration(2), Duration(3)].into_iter().sum();
        assert_eq!(total, Duration(6));
        assert_eq!(Cost::from(Distance(42)), Cost(42));
        assert_eq!(f64::from(Load(7)), 7.0);
    }

    #[test]
    #[should_panic(expected = "measure overflow")]
    #[cfg(debug_assertions)]
    fn overflow_is_caught_in_debug() {
        let _ = Cost(i64::MAX) + Cost(1);
    }
}
