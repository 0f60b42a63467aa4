//! Textbook RSA over toy moduli
//!
//! No padding, no blinding. Encryption is `m^e mod n` and decryption is
//! `c^d mod n`; both require `0 <= m < n`, which is the caller's job.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    number_theory::{PrimeRange, gcd, generate_two_primes, mod_inverse, mod_pow},
};

/// First public exponent tried during the coprime search.
const FIRST_PUBLIC_EXPONENT: u64 = 3;

/// Public half of a keypair, `(e, n)`. Safe to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    /// Public exponent
    pub e: u64,
    /// Modulus `p·q`
    pub n: u64,
}

impl PublicKey {
    /// Encrypt `message` under this key.
    pub fn encrypt(&self, message: u64) -> u64 {
        encrypt(message, self.e, self.n)
    }
}

/// Private exponent `d`.
///
/// Transient by construction: no `Serialize`, redacted `Debug`, and the value
/// is zeroized when dropped. The KDC hands it out once at registration and
/// only ever receives it back as request input.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateExponent(u64);

impl PrivateExponent {
    /// Wrap a raw exponent.
    pub fn new(d: u64) -> Self {
        Self(d)
    }

    /// Raw exponent, for display to its owner.
    pub fn expose(&self) -> u64 {
        self.0
    }

    /// Decrypt `ciphertext` under modulus `n`.
    pub fn decrypt(&self, ciphertext: u64, n: u64) -> u64 {
        decrypt(ciphertext, self.0, n)
    }
}

impl fmt::Debug for PrivateExponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateExponent(<redacted>)")
    }
}

impl FromStr for PrivateExponent {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d: u64 = s
            .trim()
            .parse()
            .map_err(|e| CryptoError::InvalidPrivateExponent(format!("{s:?}: {e}")))?;
        if d == 0 {
            return Err(CryptoError::InvalidPrivateExponent("exponent must be positive".into()));
        }
        Ok(Self(d))
    }
}

impl Drop for PrivateExponent {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A freshly generated keypair.
///
/// `p` and `q` are kept for inspection and tests; the KDC discards them along
/// with `private` after handing `private` to its owner.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// First prime factor
    pub p: u64,
    /// Second prime factor
    pub q: u64,
    /// Public key `(e, n)`
    pub public: PublicKey,
    /// Private exponent `d`
    pub private: PrivateExponent,
}

impl KeyPair {
    /// Euler's totient `(p-1)(q-1)`.
    pub fn phi(&self) -> u64 {
        (self.p - 1) * (self.q - 1)
    }

    /// Split into the persistable public half and the transient private half.
    pub fn into_parts(self) -> (PublicKey, PrivateExponent) {
        (self.public, self.private)
    }
}

/// Generate a keypair from two distinct primes in `range`.
///
/// `e` is the smallest odd integer `>= 3` coprime with φ(n), found by probing
/// 3, 5, 7, ... in order; `d = e⁻¹ mod φ(n)`.
///
/// # Errors
///
/// - `NoInverse` is unreachable for a coprime `e` but is propagated rather
///   than assumed away
pub fn generate_keypair<R: Rng + ?Sized>(
    rng: &mut R,
    range: &PrimeRange,
) -> Result<KeyPair, CryptoError> {
    let (p, q) = generate_two_primes(rng, range);
    let n = p * q;
    let phi = (p - 1) * (q - 1);

    let mut e = FIRST_PUBLIC_EXPONENT;
    while gcd(e, phi) != 1 {
        e += 2;
    }

    let d = mod_inverse(e, phi)?;

    Ok(KeyPair { p, q, public: PublicKey { e, n }, private: PrivateExponent(d) })
}

/// `message^e mod n`.
///
/// Not checked: a `message >= n` is silently reduced and will not decrypt back
/// to itself.
pub fn encrypt(message: u64, e: u64, n: u64) -> u64 {
    mod_pow(message, e, n)
}

/// `ciphertext^d mod n`.
pub fn decrypt(ciphertext: u64, d: u64, n: u64) -> u64 {
    mod_pow(ciphertext, d, n)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn textbook_example() {
        // p = 61, q = 53: n = 3233, phi = 3120, e = 17, d = 2753
        let public = PublicKey { e: 17, n: 3233 };
        let private = PrivateExponent::new(2753);

        let ciphertext = public.encrypt(65);
        assert_eq!(ciphertext, 2790);
        assert_eq!(private.decrypt(ciphertext, 3233), 65);
    }

    #[test]
    fn e_is_smallest_odd_coprime() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let range = PrimeRange::default();

        for _ in 0..200 {
            let keys = generate_keypair(&mut rng, &range).unwrap();
            let phi = keys.phi();
            let e = keys.public.e;

            assert!(e >= 3 && e % 2 == 1);
            assert_eq!(gcd(e, phi), 1);
            for smaller in (3..e).step_by(2) {
                assert_ne!(gcd(smaller, phi), 1, "{smaller} is coprime with {phi} but e = {e}");
            }
        }
    }

    #[test]
    fn d_inverts_e() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let range = PrimeRange::default();

        for _ in 0..200 {
            let keys = generate_keypair(&mut rng, &range).unwrap();
            let phi = keys.phi();
            assert_eq!(u128::from(keys.public.e) * u128::from(keys.private.expose()) % u128::from(phi), 1);
            assert!(keys.private.expose() < phi);
            assert_eq!(keys.public.n, keys.p * keys.q);
        }
    }

    #[test]
    fn every_caesar_key_round_trips() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let keys = generate_keypair(&mut rng, &PrimeRange::default()).unwrap();

        for m in 0..26 {
            let c = keys.public.encrypt(m);
            assert_eq!(keys.private.decrypt(c, keys.public.n), m);
        }
    }

    #[test]
    fn private_exponent_is_redacted() {
        let d = PrivateExponent::new(2753);
        assert_eq!(format!("{d:?}"), "PrivateExponent(<redacted>)");
        assert!(!format!("{d:?}").contains("2753"));
    }

    #[test]
    fn private_exponent_parsing() {
        assert_eq!(" 2753 ".parse::<PrivateExponent>().unwrap().expose(), 2753);
        assert!("".parse::<PrivateExponent>().is_err());
        assert!("-5".parse::<PrivateExponent>().is_err());
        assert!("abc".parse::<PrivateExponent>().is_err());
        assert!(matches!(
            "0".parse::<PrivateExponent>(),
            Err(CryptoError::InvalidPrivateExponent(_))
        ));
    }

    #[test]
    fn keypair_split() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let keys = generate_keypair(&mut rng, &PrimeRange::default()).unwrap();
        let d = keys.private.expose();
        let n = keys.public.n;

        let (public, private) = keys.into_parts();
        assert_eq!(public.n, n);
        assert_eq!(private.expose(), d);
    }
}
