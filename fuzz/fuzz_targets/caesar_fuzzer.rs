//! Fuzz target for the Caesar engine
//!
//! # Invariants
//!
//! - Decrypting an encryption with the same shift returns the input
//! - Non-letters pass through unchanged, letters keep their case
//! - Shifts are taken modulo 26 (negative and huge shifts included)

#![no_main]

use arbitrary::Arbitrary;
use kdc_crypto::{CaesarKey, caesar};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    shift: i64,
}

fuzz_target!(|input: Input| {
    let ciphertext = caesar::encrypt(&input.text, input.shift);
    assert_eq!(caesar::decrypt(&ciphertext, input.shift), input.text);

    assert_eq!(ciphertext.chars().count(), input.text.chars().count());
    for (plain, cipher) in input.text.chars().zip(ciphertext.chars()) {
        if plain.is_ascii_alphabetic() {
            assert_eq!(plain.is_ascii_uppercase(), cipher.is_ascii_uppercase());
        } else {
            assert_eq!(plain, cipher);
        }
    }

    let key = CaesarKey::from_shift(input.shift);
    assert_eq!(key.encrypt(&input.text), ciphertext);
    assert_eq!(caesar::encrypt(&input.text, i64::from(key.value())), ciphertext);
});
