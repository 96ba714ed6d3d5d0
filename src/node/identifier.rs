//! 160-bit ring arithmetic: identifiers, modular addition, wrapping interval
//! containment. Every other component builds on this one, and it is the only
//! one with no suspension points at all.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha1::{Digest, Sha1};

/// Width of the ring's identifier space, in bits.
pub const RING_BITS: u32 = 160;

/// Number of finger table entries (one per bit of the ring).
pub const FINGER_COUNT: usize = RING_BITS as usize;

fn modulus() -> BigUint {
    BigUint::one() << RING_BITS
}

/// A point on the 160-bit Chord ring, `[0, 2^160)`.
///
/// Wraps an arbitrary-precision unsigned integer rather than a fixed-width
/// one so modular arithmetic never has to special-case overflow by hand;
/// every operation reduces modulo `2^160` before returning.
#[derive(Clone, Eq)]
pub struct Identifier(BigUint);

impl Identifier {
    pub fn zero() -> Self {
        Identifier(BigUint::zero())
    }

    /// Derives a ring identifier from an address string by taking its SHA-1
    /// digest and reading the 20 bytes as a big-endian unsigned integer.
    pub fn from_address(address: &str) -> Self {
        let digest = Sha1::digest(address.as_bytes());
        Identifier(BigUint::from_bytes_be(&digest))
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Identifier(BigUint::from_bytes_be(bytes) % modulus())
    }

    pub fn to_bytes_be(&self) -> Vec<u8> {
        // Pad to a fixed 20 bytes so wire-level comparisons and debug output
        // are stable regardless of leading zero bytes.
        let mut bytes = self.0.to_bytes_be();
        let width = (RING_BITS / 8) as usize;
        if bytes.len() < width {
            let mut padded = vec![0u8; width - bytes.len()];
            padded.extend_from_slice(&bytes);
            bytes = padded;
        }
        bytes
    }

    pub fn to_hex(&self) -> String {
        self.to_bytes_be()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Adds `2^exponent` to this identifier, modulo `2^160`. `exponent` is
    /// zero-indexed here; it corresponds to the spec's one-indexed finger
    /// `i` via `exponent = i - 1`.
    pub fn add_power_of_two(&self, exponent: u32) -> Self {
        let offset = BigUint::one() << exponent;
        Identifier((&self.0 + offset) % modulus())
    }

    /// `start(i)` for zero-indexed finger slot `index` (`0..FINGER_COUNT`).
    pub fn finger_start(&self, index: usize) -> Self {
        self.add_power_of_two(index as u32)
    }

    /// `(a, b)`: fully open. Empty when `a == b`.
    pub fn is_in_open(&self, a: &Identifier, b: &Identifier) -> bool {
        match a.0.cmp(&b.0) {
            Ordering::Equal => false,
            Ordering::Less => *self > *a && *self < *b,
            Ordering::Greater => *self > *a || *self < *b,
        }
    }

    /// `(a, b]`: open on the left, closed on the right. When `a == b` this
    /// covers the whole ring except `a`.
    pub fn is_in_open_closed(&self, a: &Identifier, b: &Identifier) -> bool {
        match a.0.cmp(&b.0) {
            Ordering::Equal => *self != *a,
            Ordering::Less => *self > *a && *self <= *b,
            Ordering::Greater => *self > *a || *self <= *b,
        }
    }

    /// `[a, b)`: closed on the left, open on the right. When `a == b` this
    /// covers the whole ring except `b` (the mirror image of
    /// [`is_in_open_closed`](Self::is_in_open_closed)).
    pub fn is_in_closed_open(&self, a: &Identifier, b: &Identifier) -> bool {
        match a.0.cmp(&b.0) {
            Ordering::Equal => *self != *b,
            Ordering::Less => *self >= *a && *self < *b,
            Ordering::Greater => *self >= *a || *self < *b,
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> Identifier {
        Identifier(BigUint::from(n))
    }

    #[test]
    fn hashing_is_deterministic_and_160_bit() {
        let a = Identifier::from_address("127.0.0.1:1234");
        let b = Identifier::from_address("127.0.0.1:1234");
        assert_eq!(a, b);
        assert_eq!(a.to_bytes_be().len(), 20);
    }

    #[test]
    fn different_addresses_hash_differently() {
        let a = Identifier::from_address("127.0.0.1:1234");
        let b = Identifier::from_address("127.0.0.1:1235");
        assert_ne!(a, b);
    }

    #[test]
    fn add_power_of_two_wraps_modulo_2_160() {
        let max = Identifier((BigUint::one() << RING_BITS) - BigUint::one());
        let wrapped = max.add_power_of_two(0);
        assert_eq!(wrapped, Identifier::zero());
    }

    #[test]
    fn finger_start_matches_worked_example() {
        // node id 100 on an 8-bit ring: start(1)=101, start(2)=102, start(3)=104, start(4)=108
        let n = id(100);
        assert_eq!(n.finger_start(0), id(101));
        assert_eq!(n.finger_start(1), id(102));
        assert_eq!(n.finger_start(2), id(104));
        assert_eq!(n.finger_start(3), id(108));
    }

    #[test]
    fn open_closed_wraparound_interval() {
        // a=200, b=10 on an 8-bit ring (we just use plain u64 arithmetic; the
        // wraparound logic is width-independent).
        let a = id(200);
        let b = id(10);
        assert!(id(5).is_in_open_closed(&a, &b));
        assert!(!id(150).is_in_open_closed(&a, &b));
        assert!(id(10).is_in_open_closed(&a, &b));
        assert!(!id(200).is_in_open_closed(&a, &b));
    }

    #[test]
    fn equal_bounds_open_closed_covers_ring_except_a() {
        let a = id(42);
        assert!(!id(42).is_in_open_closed(&a, &a));
        assert!(id(0).is_in_open_closed(&a, &a));
        assert!(id(255).is_in_open_closed(&a, &a));
    }

    #[test]
    fn equal_bounds_fully_open_is_empty() {
        let a = id(42);
        assert!(!id(0).is_in_open(&a, &a));
        assert!(!id(42).is_in_open(&a, &a));
        assert!(!id(255).is_in_open(&a, &a));
    }

    #[test]
    fn equal_bounds_closed_open_covers_ring_except_b() {
        let a = id(42);
        assert!(!id(42).is_in_closed_open(&a, &a));
        assert!(id(0).is_in_closed_open(&a, &a));
        assert!(id(255).is_in_closed_open(&a, &a));
    }

    #[test]
    fn key_ownership_worked_example() {
        // 3-node ring with ids 10, 50, 200 on an 8-bit ring: key 30 -> 50,
        // key 100 -> 200, key 220 -> 10 (wraps).
        let n10 = id(10);
        let n50 = id(50);
        let n200 = id(200);

        assert!(id(30).is_in_open_closed(&n10, &n50));
        assert!(id(100).is_in_open_closed(&n50, &n200));
        assert!(id(220).is_in_open_closed(&n200, &n10));
    }
}
