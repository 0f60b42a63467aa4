//! Production Environment backed by the OS RNG.
//!
//! Non-deterministic: every run draws fresh primes and session keys.

use kdc_core::env::Environment;

/// Production environment using the OS cryptographic RNG (getrandom).
///
/// # Panics
///
/// Panics if the OS RNG fails. A KDC without entropy would hand out
/// predictable keys; stopping is the only safe outcome.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - KDC cannot issue keys");
    }
}

#[cfg(test)]
mod tests {
    use kdc_crypto::{PrimeRange, generate_keypair};

    use super::*;

    #[test]
    fn random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];

        env.random_bytes(&mut bytes1);
        env.random_bytes(&mut bytes2);

        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn drives_key_generation() {
        let env = SystemEnv::new();
        let keys = generate_keypair(&mut env.rng(), &PrimeRange::default()).unwrap();
        assert_eq!(keys.public.n, keys.p * keys.q);
    }
}
