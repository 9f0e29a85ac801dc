//! Combine operators for group reductions.
//!
//! A combine operator is an associative binary function together with its
//! identity element. The identity is what the segment kernel writes into
//! thread slots that have no real input, so it must leave every value
//! unchanged: `combine(identity, x) == combine(x, identity) == x`.
//!
//! Operators are passed by reference into every thread of a block, so they
//! must be `Sync`. Keep `combine` small and branch-free; it runs once per
//! reduction step per thread.

use num_traits::{Bounded, Zero};
use std::ops::Add;

/// Associative binary operator with an explicit identity element.
pub trait Combine<T>: Sync {
    /// Combine two partial results.
    ///
    /// When a row fits in one lane group, `a` always covers positions left
    /// of `b`. Wider rows fold column `c + offset` into column `c` through
    /// shared memory first, so the operator must then be commutative too.
    fn combine(&self, a: T, b: T) -> T;

    /// Neutral element used to pad positions past the end of a segment.
    fn identity(&self) -> T;
}

impl<T, C: Combine<T> + ?Sized> Combine<T> for &C {
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        (**self).combine(a, b)
    }

    #[inline]
    fn identity(&self) -> T {
        (**self).identity()
    }
}

/// Minimum reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Min<T> {
    identity: T,
}

impl<T> Min<T> {
    /// Minimum with a caller-chosen identity, e.g. `true` for booleans.
    pub const fn with_identity(identity: T) -> Self {
        Self { identity }
    }
}

impl<T: Bounded> Default for Min<T> {
    fn default() -> Self {
        Self::with_identity(T::max_value())
    }
}

impl<T: PartialOrd + Copy + Sync> Combine<T> for Min<T> {
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        if b < a {
            b
        } else {
            a
        }
    }

    #[inline]
    fn identity(&self) -> T {
        self.identity
    }
}

/// Maximum reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Max<T> {
    identity: T,
}

impl<T> Max<T> {
    /// Maximum with a caller-chosen identity.
    pub const fn with_identity(identity: T) -> Self {
        Self { identity }
    }
}

impl<T: Bounded> Default for Max<T> {
    fn default() -> Self {
        Self::with_identity(T::min_value())
    }
}

impl<T: PartialOrd + Copy + Sync> Combine<T> for Max<T> {
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        if b > a {
            b
        } else {
            a
        }
    }

    #[inline]
    fn identity(&self) -> T {
        self.identity
    }
}

/// Sum reduction. Wrapping behaviour follows `T`'s `Add`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

impl<T: Add<Output = T> + Zero + Copy> Combine<T> for Sum {
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        a + b
    }

    #[inline]
    fn identity(&self) -> T {
        T::zero()
    }
}

/// Boolean AND; the same result as [`Min`] over `bool` with `true` as identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalAnd;

impl Combine<bool> for LogicalAnd {
    #[inline]
    fn combine(&self, a: bool, b: bool) -> bool {
        a & b
    }

    #[inline]
    fn identity(&self) -> bool {
        true
    }
}

/// Boolean OR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalOr;

impl Combine<bool> for LogicalOr {
    #[inline]
    fn combine(&self, a: bool, b: bool) -> bool {
        a | b
    }

    #[inline]
    fn identity(&self) -> bool {
        false
    }
}

/// Operator built from a closure and its identity.
///
/// ```
/// use kornia_group_reduce::{combine_fn, Combine};
///
/// let gcd = combine_fn(0u32, |mut a: u32, mut b: u32| {
///     while b != 0 {
///         (a, b) = (b, a % b);
///     }
///     a
/// });
/// assert_eq!(gcd.combine(12, 18), 6);
/// assert_eq!(gcd.combine(gcd.identity(), 7), 7);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnCombine<T, F> {
    identity: T,
    f: F,
}

/// Wrap `f` as a [`Combine`] operator with the given identity.
pub fn combine_fn<T, F>(identity: T, f: F) -> FnCombine<T, F>
where
    T: Copy + Sync,
    F: Fn(T, T) -> T + Sync,
{
    FnCombine { identity, f }
}

impl<T, F> Combine<T> for FnCombine<T, F>
where
    T: Copy + Sync,
    F: Fn(T, T) -> T + Sync,
{
    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        (self.f)(a, b)
    }

    #[inline]
    fn identity(&self) -> T {
        self.identity
    }
}
