//! Error types for the cryptographic primitives

use thiserror::Error;

/// Errors from number theory, RSA and Caesar operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// `value` has no multiplicative inverse modulo `modulus`
    ///
    /// Happens when `gcd(value, modulus) != 1`. Key generation picks `e`
    /// coprime with φ(n), so this never surfaces from a generated keypair.
    #[error("modular inverse does not exist: gcd({value}, {modulus}) != 1")]
    NoInverse {
        /// Number that was inverted
        value: u64,
        /// Modulus of the inversion
        modulus: u64,
    },

    /// Prime range cannot produce a usable keypair
    #[error("invalid prime range [{min}, {max}): {reason}")]
    InvalidPrimeRange {
        /// Inclusive lower bound
        min: u64,
        /// Exclusive upper bound
        max: u64,
        /// Why the range was rejected
        reason: &'static str,
    },

    /// Integer is not a valid Caesar shift in `[0, 26)`
    #[error("caesar key out of range: {0}")]
    CaesarKeyOutOfRange(u64),

    /// Private exponent could not be parsed
    #[error("invalid private exponent: {0}")]
    InvalidPrivateExponent(String),
}
