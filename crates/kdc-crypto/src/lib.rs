//! KDC Cryptographic Primitives
//!
//! Number-theoretic building blocks for the key distribution center. Pure
//! functions with deterministic outputs. Callers provide the random number
//! generator so key generation can be replayed from a seed in tests.
//!
//! # Key Lifecycle
//!
//! ```text
//! Two distinct primes p, q (sampled from a PrimeRange)
//!        │
//!        ▼
//! RSA keypair: n = p·q, e = smallest odd coprime, d = e⁻¹ mod φ(n)
//!        │
//!        ▼
//! Session key k ∈ [0, 26) wrapped per party: cₓ = kᵉ mod n
//!        │
//!        ▼
//! Party recovers k = cᵈ mod n, then Caesar-shifts message text by k
//! ```
//!
//! # Security
//!
//! None. Moduli are at most four decimal digits with the default range, RSA is
//! unpadded and the Caesar cipher has 26 keys. The primitives reproduce a
//! teaching protocol and must not protect real data.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod caesar;
mod error;
pub mod number_theory;
pub mod rsa;

pub use caesar::{ALPHABET_LEN, CaesarKey};
pub use error::CryptoError;
pub use number_theory::{PrimeRange, gcd, generate_two_primes, is_prime, mod_inverse, mod_pow};
pub use rsa::{KeyPair, PrivateExponent, PublicKey, generate_keypair};
