//! Camelot wheel harmonic-compatibility model
//!
//! The Camelot wheel arranges the 24 musical keys on a clock face: positions
//! 1-12, each with an inner (A, minor) and outer (B, major) ring. Keys mix
//! harmonically with their relative key (same number, other ring) and with
//! their numeric neighbors on the same ring.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ring of the Camelot wheel: A is the minor ring, B the major ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ring {
    A,
    B,
}

impl Ring {
    /// The other ring at the same wheel position (the relative key)
    pub fn toggled(self) -> Self {
        match self {
            Ring::A => Ring::B,
            Ring::B => Ring::A,
        }
    }

    pub fn is_minor(self) -> bool {
        self == Ring::A
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ring::A => write!(f, "A"),
            Ring::B => write!(f, "B"),
        }
    }
}

/// One of the 24 Camelot wheel positions, e.g. `8A` (A minor) or `12B`.
///
/// A pure value type: construction validates the position, so every existing
/// `CamelotKey` names a real key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CamelotKey {
    number: u8,
    ring: Ring,
}

impl CamelotKey {
    /// Create a key from a wheel position (1-12) and ring
    ///
    /// Returns `None` if the number is outside the wheel.
    pub fn new(number: u8, ring: Ring) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self { number, ring })
        } else {
            None
        }
    }

    /// Wheel position, 1-12
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Ring (A = minor, B = major)
    pub fn ring(&self) -> Ring {
        self.ring
    }

    /// The relative key: same number, opposite ring
    pub fn relative(&self) -> Self {
        Self {
            number: self.number,
            ring: self.ring.toggled(),
        }
    }

    /// The next key clockwise on the same ring, wrapping 12 -> 1
    pub fn next(&self) -> Self {
        Self {
            number: if self.number < 12 { self.number + 1 } else { 1 },
            ring: self.ring,
        }
    }

    /// The previous key counterclockwise on the same ring, wrapping 1 -> 12
    pub fn prev(&self) -> Self {
        Self {
            number: if self.number > 1 { self.number - 1 } else { 12 },
            ring: self.ring,
        }
    }

    /// All keys that mix harmonically with this one
    ///
    /// The key itself, its relative, and its two numeric neighbors on the
    /// same ring. Always four distinct keys.
    pub fn compatible_keys(&self) -> [CamelotKey; 4] {
        [*self, self.relative(), self.next(), self.prev()]
    }

    /// Whether `other` mixes harmonically with this key
    pub fn is_compatible_with(&self, other: CamelotKey) -> bool {
        self.compatible_keys().contains(&other)
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.ring)
    }
}

impl FromStr for CamelotKey {
    type Err = ParseKeyError;

    /// Parse notation like `"8A"`, `"12b"`. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(ParseKeyError(s.to_string()));
        }
        let (num_part, ring_part) = s.split_at(s.len() - 1);
        let ring = match ring_part {
            "A" | "a" => Ring::A,
            "B" | "b" => Ring::B,
            _ => return Err(ParseKeyError(s.to_string())),
        };
        let number: u8 = num_part.parse().map_err(|_| ParseKeyError(s.to_string()))?;
        CamelotKey::new(number, ring).ok_or_else(|| ParseKeyError(s.to_string()))
    }
}

/// Error returned when a string is not valid Camelot notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(pub String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a Camelot key: {:?}", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl TryFrom<String> for CamelotKey {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CamelotKey> for String {
    fn from(key: CamelotKey) -> Self {
        key.to_string()
    }
}
