use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An amount of ScroogeCoin in minor units.
/// It's signed so that a malformed transaction can carry a negative output, which validation
/// then rejects.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Coins(i64);

impl Coins {
    pub const fn new(amount: i64) -> Self {
        Coins(amount)
    }

    pub const fn zero() -> Self {
        Self::new(0)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Sums the amounts in iteration order.
    /// Returns None if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Coins>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |sum, amount| sum.checked_add(amount))
    }
}

impl From<i64> for Coins {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<i32> for Coins {
    fn from(value: i32) -> Self {
        Self(value as i64)
    }
}

impl Display for Coins {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} SCR", self.0)
    }
}
