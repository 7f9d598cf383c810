use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Whole-yen amount. Receipts carry no fractional subunits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Yen(i64);

impl Yen {
    pub const ZERO: Yen = Yen(0);

    pub fn new(amount: i64) -> Self {
        Yen(amount)
    }

    pub fn amount(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for Yen {
    fn from(amount: i64) -> Self {
        Yen(amount)
    }
}

impl From<i32> for Yen {
    fn from(amount: i32) -> Self {
        Yen(i64::from(amount))
    }
}

impl fmt::Display for Yen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}", self.0)
    }
}

impl Add for Yen {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Yen(self.0 + rhs.0)
    }
}

impl Sum for Yen {
    fn sum<I: Iterator<Item = Yen>>(iter: I) -> Self {
        iter.fold(Yen::ZERO, Add::add)
    }
}
