//! Exact rational amounts.
//!
//! A `Numeric` keeps exactly the numerator/denominator pair it was built
//! with. Nothing here normalizes behind the caller's back: `3/6` stays `3/6`
//! until [`Numeric::reduce`] is asked for. Structural equality (`==`) compares
//! the pair; value comparisons go through [`Numeric::same_value`] and
//! [`Numeric::cmp_value`].

use std::{cmp::Ordering, fmt, ops::Neg, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ValueError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNumeric", into = "RawNumeric")]
pub struct Numeric {
    num: i64,
    denom: i64,
}

#[derive(Serialize, Deserialize)]
struct RawNumeric {
    num: i64,
    denom: i64,
}

impl TryFrom<RawNumeric> for Numeric {
    type Error = ValueError;

    fn try_from(raw: RawNumeric) -> Result<Self, Self::Error> {
        Numeric::new(raw.num, raw.denom)
    }
}

impl From<Numeric> for RawNumeric {
    fn from(value: Numeric) -> Self {
        RawNumeric {
            num: value.num,
            denom: value.denom,
        }
    }
}

impl Numeric {
    /// Builds `num / denom`. The denominator must be strictly positive.
    pub fn new(num: i64, denom: i64) -> Result<Self, ValueError> {
        if denom == 0 {
            return Err(ValueError::InvalidNumeric(format!(
                "zero denominator in {num}/{denom}"
            )));
        }
        if denom < 0 {
            return Err(ValueError::InvalidNumeric(format!(
                "negative denominator in {num}/{denom}"
            )));
        }
        Ok(Self { num, denom })
    }

    pub const fn zero() -> Self {
        Self { num: 0, denom: 1 }
    }

    pub const fn from_integer(value: i64) -> Self {
        Self {
            num: value,
            denom: 1,
        }
    }

    pub const fn num(&self) -> i64 {
        self.num
    }

    pub const fn denom(&self) -> i64 {
        self.denom
    }

    pub const fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub const fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub const fn is_positive(&self) -> bool {
        self.num > 0
    }

    /// Negation. Fails only for `i64::MIN` numerators.
    pub fn checked_neg(&self) -> Result<Self, ValueError> {
        let num = self
            .num
            .checked_neg()
            .ok_or_else(|| overflow("negate", self, self))?;
        Ok(Self {
            num,
            denom: self.denom,
        })
    }

    pub fn abs(&self) -> Result<Self, ValueError> {
        if self.is_negative() {
            self.checked_neg()
        } else {
            Ok(*self)
        }
    }

    /// Lowest-terms form of the same value.
    pub fn reduce(&self) -> Self {
        let g = gcd(self.num as i128, self.denom as i128);
        if g <= 1 {
            return *self;
        }
        Self {
            num: (self.num as i128 / g) as i64,
            denom: (self.denom as i128 / g) as i64,
        }
    }

    /// Exact sum over the least common denominator.
    pub fn checked_add(&self, other: &Numeric) -> Result<Self, ValueError> {
        let (a, b, denom) = self.aligned(other);
        fit(a + b, denom).ok_or_else(|| overflow("add", self, other))
    }

    pub fn checked_sub(&self, other: &Numeric) -> Result<Self, ValueError> {
        let (a, b, denom) = self.aligned(other);
        fit(a - b, denom).ok_or_else(|| overflow("subtract", self, other))
    }

    /// Exact product, reduced to lowest terms.
    pub fn checked_mul(&self, other: &Numeric) -> Result<Self, ValueError> {
        let num = self.num as i128 * other.num as i128;
        let denom = self.denom as i128 * other.denom as i128;
        reduced_fit(num, denom).ok_or_else(|| overflow("multiply", self, other))
    }

    /// Exact quotient, reduced to lowest terms.
    pub fn checked_div(&self, other: &Numeric) -> Result<Self, ValueError> {
        if other.is_zero() {
            return Err(ValueError::InvalidNumeric(format!(
                "division of {self} by zero"
            )));
        }
        let mut num = self.num as i128 * other.denom as i128;
        let mut denom = self.denom as i128 * other.num as i128;
        if denom < 0 {
            num = -num;
            denom = -denom;
        }
        reduced_fit(num, denom).ok_or_else(|| overflow("divide", self, other))
    }

    /// Value equality: `1/2` and `50/100` are the same value.
    pub fn same_value(&self, other: &Numeric) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }

    pub fn cmp_value(&self, other: &Numeric) -> Ordering {
        let lhs = self.num as i128 * other.denom as i128;
        let rhs = other.num as i128 * self.denom as i128;
        lhs.cmp(&rhs)
    }

    /// Lossy conversion for display and reporting.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    fn aligned(&self, other: &Numeric) -> (i128, i128, i128) {
        let lhs_denom = self.denom as i128;
        let rhs_denom = other.denom as i128;
        let denom = lhs_denom / gcd(lhs_denom, rhs_denom) * rhs_denom;
        (
            self.num as i128 * (denom / lhs_denom),
            other.num as i128 * (denom / rhs_denom),
            denom,
        )
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn fit(num: i128, denom: i128) -> Option<Numeric> {
    Some(Numeric {
        num: i64::try_from(num).ok()?,
        denom: i64::try_from(denom).ok()?,
    })
}

fn reduced_fit(num: i128, denom: i128) -> Option<Numeric> {
    let g = gcd(num, denom).max(1);
    fit(num / g, denom / g)
}

fn overflow(op: &str, lhs: &Numeric, rhs: &Numeric) -> ValueError {
    ValueError::InvalidNumeric(format!("overflow while trying to {op} {lhs} and {rhs}"))
}

/// Anything a setter accepts as an amount. Validation happens here, before
/// the value gets anywhere near the engine.
pub trait IntoNumeric {
    fn into_numeric(self) -> Result<Numeric, ValueError>;
}

impl IntoNumeric for Numeric {
    fn into_numeric(self) -> Result<Numeric, ValueError> {
        Ok(self)
    }
}

impl IntoNumeric for (i64, i64) {
    fn into_numeric(self) -> Result<Numeric, ValueError> {
        Numeric::new(self.0, self.1)
    }
}

impl IntoNumeric for &str {
    fn into_numeric(self) -> Result<Numeric, ValueError> {
        self.parse()
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Neg for Numeric {
    type Output = Numeric;

    /// Panics on `i64::MIN` numerators in every build profile; use
    /// [`Numeric::checked_neg`] to get an error instead.
    fn neg(self) -> Self::Output {
        match self.checked_neg() {
            Ok(negated) => negated,
            Err(err) => panic!("{err}"),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

impl fmt::Debug for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Numeric({}/{})", self.num, self.denom)
    }
}

impl FromStr for Numeric {
    type Err = ValueError;

    /// Accepts `n/d` or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|err| ValueError::InvalidNumeric(format!("`{trimmed}`: {err}")))
        };
        match trimmed.split_once('/') {
            Some((num, denom)) => Numeric::new(parse(num)?, parse(denom)?),
            None => Ok(Numeric::from_integer(parse(trimmed)?)),
        }
    }
}
