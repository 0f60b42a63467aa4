//! Fuzz target for the number theory library
//!
//! # Invariants
//!
//! - `mod_inverse` succeeds exactly when the inputs are coprime, and the
//!   result really is an inverse
//! - `mod_pow` agrees with repeated multiplication for small exponents
//! - `PrimeRange::new` never panics; accepted ranges hold only primes
//! - RSA round-trips every message below the modulus

#![no_main]

use arbitrary::Arbitrary;
use kdc_core::env::Environment;
use kdc_crypto::{PrimeRange, gcd, generate_keypair, is_prime, mod_inverse, mod_pow};
use kdc_harness::SimEnv;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    value: u64,
    modulus: u64,
    exp: u8,
    range_min: u16,
    range_width: u16,
    seed: u64,
    message: u16,
}

fuzz_target!(|input: Input| {
    match mod_inverse(input.value, input.modulus) {
        Ok(inverse) => {
            assert_eq!(gcd(input.value, input.modulus), 1);
            if input.modulus > 1 {
                let product = u128::from(input.value) * u128::from(inverse) % u128::from(input.modulus);
                assert_eq!(product, 1);
            }
        },
        Err(_) => assert!(input.modulus == 0 || gcd(input.value, input.modulus) != 1),
    }

    if input.modulus > 1 {
        let m = u128::from(input.modulus);
        let expected = (0..input.exp).fold(1u128, |acc, _| acc * u128::from(input.value) % m);
        assert_eq!(u128::from(mod_pow(input.value, u64::from(input.exp), input.modulus)), expected);
    }

    let min = u64::from(input.range_min);
    let max = min + u64::from(input.range_width);
    if let Ok(range) = PrimeRange::new(min, max) {
        assert!(range.primes().iter().all(|&p| is_prime(p) && (min..max).contains(&p)));

        let env = SimEnv::with_seed(input.seed);
        let keys = generate_keypair(&mut env.rng(), &range).unwrap();
        let message = u64::from(input.message) % keys.public.n;
        let (public, private) = keys.into_parts();
        assert_eq!(private.decrypt(public.encrypt(message), public.n), message);
    }
});
