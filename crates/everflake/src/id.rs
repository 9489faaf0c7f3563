use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// A packed identifier in one of two interchangeable encodings.
///
/// IDs start life as plain 64-bit integers. Once the elapsed seconds since
/// the epoch outgrow the timestamp field's fixed capacity, the same
/// shift-and-OR composition continues over an arbitrary-precision integer
/// and the value simply keeps growing.
///
/// The encoding is self-describing: decoding branches on the numeric bit
/// length (`< 64` means the 64-bit frame applies), never on the variant, so
/// an ID that round-trips through plain integer storage decodes identically
/// no matter which variant it comes back as. For the same reason, equality,
/// ordering and hashing are numeric: a value representable in both
/// encodings compares equal regardless of variant.
#[derive(Clone, Debug)]
pub enum Uid {
    /// A 64-bit encoding. The sign bit is never set, so the value is
    /// non-negative under any signed interpretation.
    Fixed(u64),
    /// An arbitrary-precision encoding, used once the timestamp no longer
    /// fits its fixed-width field.
    Big(BigUint),
}

impl Uid {
    /// Returns the position of the highest set bit plus one, i.e. the
    /// number of bits needed to represent the value. Zero for the value 0.
    ///
    /// This is the detection rule shared with decoding: values below 64
    /// bits are interpreted through the fixed 64-bit frame.
    pub fn bit_len(&self) -> u64 {
        match self {
            Self::Fixed(v) => u64::from(u64::BITS - v.leading_zeros()),
            Self::Big(b) => b.bits(),
        }
    }

    /// Returns the value as a `u64` if it fits, regardless of variant.
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Fixed(v) => Some(*v),
            Self::Big(b) => u64::try_from(b).ok(),
        }
    }

    /// Returns the value widened to a [`BigUint`], regardless of variant.
    pub fn to_biguint(&self) -> BigUint {
        match self {
            Self::Fixed(v) => BigUint::from(*v),
            Self::Big(b) => b.clone(),
        }
    }
}

impl From<u64> for Uid {
    fn from(value: u64) -> Self {
        Self::Fixed(value)
    }
}

impl From<BigUint> for Uid {
    fn from(value: BigUint) -> Self {
        Self::Big(value)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => fmt::Display::fmt(v, f),
            Self::Big(b) => fmt::Display::fmt(b, f),
        }
    }
}

impl FromStr for Uid {
    type Err = Error;

    /// Parses the plain decimal form.
    ///
    /// Values below 64 bits come back as [`Uid::Fixed`], everything else as
    /// [`Uid::Big`]. Signs, whitespace and non-digit input are rejected; in
    /// particular a negative number is never a valid identifier.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidUid { input: s.into() });
        }
        let value = BigUint::from_str(s).map_err(|_| Error::InvalidUid { input: s.into() })?;
        if value.bits() < 64 {
            // Fits one u64 digit by construction.
            Ok(Self::Fixed(value.iter_u64_digits().next().unwrap_or(0)))
        } else {
            Ok(Self::Big(value))
        }
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Uid {}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Fixed(a), Self::Fixed(b)) => a.cmp(b),
            (Self::Big(a), Self::Big(b)) => a.cmp(b),
            (Self::Fixed(a), Self::Big(b)) => BigUint::from(*a).cmp(b),
            (Self::Big(a), Self::Fixed(b)) => a.cmp(&BigUint::from(*b)),
        }
    }
}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Uid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the little-endian u64 digits so both encodings of the same
        // value hash alike.
        match self {
            Self::Fixed(v) => v.hash(state),
            Self::Big(b) => {
                let mut digits = b.iter_u64_digits();
                match digits.next() {
                    None => 0u64.hash(state),
                    Some(first) => {
                        first.hash(state);
                        for digit in digits {
                            digit.hash(state);
                        }
                    }
                }
            }
        }
    }
}

impl Serialize for Uid {
    /// Serializes as the plain decimal string. Fixed-width values would fit
    /// a native integer, but many formats (and JavaScript consumers) lose
    /// precision above 2^53, and the arbitrary-precision form has no native
    /// representation at all.
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
