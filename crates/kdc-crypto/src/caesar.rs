//! Caesar shift cipher
//!
//! ASCII letters rotate within their own case; every other character,
//! including non-ASCII letters, passes through unchanged. Character count and
//! positions are preserved, so ciphertext has the same shape as plaintext.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Letters per alphabet, and the size of the key space.
pub const ALPHABET_LEN: u8 = 26;

/// Session key: a shift in `[0, 26)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CaesarKey(u8);

impl CaesarKey {
    /// Normalize any integer shift into a key (Euclidean mod 26).
    pub fn from_shift(shift: i64) -> Self {
        Self(shift.rem_euclid(i64::from(ALPHABET_LEN)) as u8)
    }

    /// Uniformly random key.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0..ALPHABET_LEN))
    }

    /// Shift amount.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Encrypt `plaintext` with this key.
    pub fn encrypt(self, plaintext: &str) -> String {
        encrypt(plaintext, i64::from(self.0))
    }

    /// Decrypt `ciphertext` with this key.
    pub fn decrypt(self, ciphertext: &str) -> String {
        decrypt(ciphertext, i64::from(self.0))
    }
}

impl TryFrom<u64> for CaesarKey {
    type Error = CryptoError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value < u64::from(ALPHABET_LEN) {
            Ok(Self(value as u8))
        } else {
            Err(CryptoError::CaesarKeyOutOfRange(value))
        }
    }
}

impl TryFrom<u8> for CaesarKey {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(u64::from(value))
    }
}

impl From<CaesarKey> for u8 {
    fn from(key: CaesarKey) -> Self {
        key.0
    }
}

impl fmt::Display for CaesarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shift every ASCII letter of `plaintext` forward by `shift mod 26`.
///
/// Negative and out-of-range shifts are normalized with Euclidean mod.
pub fn encrypt(plaintext: &str, shift: i64) -> String {
    let shift = CaesarKey::from_shift(shift).0;
    plaintext.chars().map(|c| rotate(c, shift)).collect()
}

/// Inverse of [`encrypt`]: `encrypt(ciphertext, -shift)`.
pub fn decrypt(ciphertext: &str, shift: i64) -> String {
    // -shift overflows for i64::MIN, so negate after reducing
    let inverse = (ALPHABET_LEN - CaesarKey::from_shift(shift).0) % ALPHABET_LEN;
    encrypt(ciphertext, i64::from(inverse))
}

fn rotate(c: char, shift: u8) -> char {
    let base = match c {
        'A'..='Z' => b'A',
        'a'..='z' => b'a',
        _ => return c,
    };
    let offset = (c as u8 - base + shift) % ALPHABET_LEN;
    char::from(base + offset)
}
