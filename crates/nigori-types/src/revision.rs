use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version identifier for one value in a (user, key) lineage.
///
/// Revisions are totally ordered. The first write to a key is stored at
/// [`Revision::INITIAL`]; every later write must land on a strictly greater
/// revision. A revision is never reused for the same (user, key) pair while
/// its lineage exists.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision(u64);

impl Revision {
    /// The revision minted for the first write to a key.
    pub const INITIAL: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The revision immediately after this one, or `None` on overflow.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Returns `true` if `self` may legally follow `previous` in a lineage.
    pub fn succeeds(&self, previous: &Self) -> bool {
        self > previous
    }

    /// Big-endian bytes, so that byte order matches numeric order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Revision {
    type Err = std::num::ParseIntError;

    /// Accepts both `"7"` and the display form `"r7"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('r').unwrap_or(s);
        s.parse::<u64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn initial_is_zero() {
        assert_eq!(Revision::INITIAL.value(), 0);
        assert_eq!(Revision::default(), Revision::INITIAL);
    }

    #[test]
    fn next_increments() {
        assert_eq!(Revision::INITIAL.next(), Some(Revision::new(1)));
        assert_eq!(Revision::new(u64::MAX).next(), None);
    }

    #[test]
    fn succeeds_is_strict() {
        let r1 = Revision::new(1);
        let r2 = Revision::new(2);
        assert!(r2.succeeds(&r1));
        assert!(!r1.succeeds(&r1));
        assert!(!r1.succeeds(&r2));
    }

    #[test]
    fn parse_with_and_without_prefix() {
        assert_eq!("7".parse::<Revision>().unwrap(), Revision::new(7));
        assert_eq!("r7".parse::<Revision>().unwrap(), Revision::new(7));
        assert!("seven".parse::<Revision>().is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(Revision::new(3).to_string(), "r3");
    }

    proptest! {
        #[test]
        fn byte_order_matches_numeric_order(a in any::<u64>(), b in any::<u64>()) {
            let (ra, rb) = (Revision::new(a), Revision::new(b));
            prop_assert_eq!(ra.cmp(&rb), ra.to_be_bytes().cmp(&rb.to_be_bytes()));
        }
    }
}
