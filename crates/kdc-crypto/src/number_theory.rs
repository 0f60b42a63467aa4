//! Number theory for toy RSA
//!
//! Trial-division primality, Euclid's algorithms and square-and-multiply
//! exponentiation over `u64`. Intermediate products are widened to `u128`, so
//! every function is exact for any `u64` input.

use rand::Rng;

use crate::{caesar::ALPHABET_LEN, error::CryptoError};

/// Inclusive lower bound of the default prime range (two-digit primes).
pub const DEFAULT_PRIME_MIN: u64 = 10;

/// Exclusive upper bound of the default prime range (two-digit primes).
pub const DEFAULT_PRIME_MAX: u64 = 100;

/// Largest accepted upper bound. Keeps every modulus below 2^32.
pub const MAX_PRIME_BOUND: u64 = 1 << 16;

/// Half-open range `[min, max)` that RSA primes are sampled from.
///
/// The default is the two-digit range `[10, 100)`, which is what the protocol
/// is defined over. Wider ranges are accepted so the scale is a parameter
/// rather than a constant, but the range is never widened implicitly.
///
/// # Invariants
///
/// - The range holds at least two primes
/// - The product of its two smallest primes exceeds every Caesar key, so a
///   session key `k < 26` always satisfies `k < n`
/// - `max <= MAX_PRIME_BOUND`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeRange {
    min: u64,
    max: u64,
    primes: Vec<u64>,
}

impl PrimeRange {
    /// Validate and build a prime range.
    pub fn new(min: u64, max: u64) -> Result<Self, CryptoError> {
        let invalid = |reason| CryptoError::InvalidPrimeRange { min, max, reason };

        if min >= max {
            return Err(invalid("range is empty"));
        }
        if max > MAX_PRIME_BOUND {
            return Err(invalid("upper bound exceeds 65536"));
        }

        let primes: Vec<u64> = (min..max).filter(|&n| is_prime(n)).collect();
        let [first, second, ..] = primes.as_slice() else {
            return Err(invalid("fewer than two primes"));
        };
        if first * second <= u64::from(ALPHABET_LEN) - 1 {
            return Err(invalid("smallest modulus cannot hold a caesar key"));
        }

        Ok(Self { min, max, primes })
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// All primes in the range, ascending.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }
}

impl Default for PrimeRange {
    fn default() -> Self {
        let primes = (DEFAULT_PRIME_MIN..DEFAULT_PRIME_MAX).filter(|&n| is_prime(n)).collect();
        Self { min: DEFAULT_PRIME_MIN, max: DEFAULT_PRIME_MAX, primes }
    }
}

/// Trial division up to ⌊√n⌋. Returns `false` for `n <= 1`.
pub fn is_prime(n: u64) -> bool {
    if n <= 1 {
        return false;
    }

    let mut divisor = 2;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}

/// Sample two distinct primes uniformly from `range`.
///
/// The second prime is resampled until it differs from the first. The pair is
/// unordered.
pub fn generate_two_primes<R: Rng + ?Sized>(rng: &mut R, range: &PrimeRange) -> (u64, u64) {
    let primes = range.primes();
    debug_assert!(primes.len() >= 2);

    let p = primes[rng.gen_range(0..primes.len())];
    let mut q = primes[rng.gen_range(0..primes.len())];
    while q == p {
        q = primes[rng.gen_range(0..primes.len())];
    }

    (p, q)
}

/// Greatest common divisor (Euclid).
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Multiplicative inverse of `value` modulo `modulus` (extended Euclid).
///
/// Returns the unique `x` in `[0, modulus)` with `value·x ≡ 1 (mod modulus)`.
///
/// # Errors
///
/// - `NoInverse` if `gcd(value, modulus) != 1` or `modulus == 0`
pub fn mod_inverse(value: u64, modulus: u64) -> Result<u64, CryptoError> {
    if modulus == 0 {
        return Err(CryptoError::NoInverse { value, modulus });
    }

    let m = i128::from(modulus);
    let (mut old_r, mut r) = (i128::from(value), m);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }

    if old_r != 1 {
        return Err(CryptoError::NoInverse { value, modulus });
    }

    Ok(old_s.rem_euclid(m) as u64)
}

/// `base^exp mod modulus` by square-and-multiply.
///
/// A modulus of 0 or 1 yields 0.
pub fn mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
    if modulus <= 1 {
        return 0;
    }

    let m = u128::from(modulus);
    let mut result = 1u128;
    let mut base = u128::from(base) % m;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }

    result as u64
}
