//! KDC configuration and request validation limits.

use kdc_crypto::PrimeRange;

use crate::error::KdcError;

/// Longest accepted identity name, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

/// Longest accepted session label, in characters.
pub const DEFAULT_MAX_LABEL_LEN: usize = 100;

/// KDC configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdcConfig {
    /// Range RSA primes are sampled from at registration
    pub prime_range: PrimeRange,
    /// Maximum identity name length (characters)
    pub max_name_len: usize,
    /// Maximum session label length (characters)
    pub max_label_len: usize,
}

impl Default for KdcConfig {
    fn default() -> Self {
        Self {
            prime_range: PrimeRange::default(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_label_len: DEFAULT_MAX_LABEL_LEN,
        }
    }
}

impl KdcConfig {
    /// Validate an identity name.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if empty, too long or containing control characters
    pub fn validate_name(&self, field: &'static str, name: &str) -> Result<(), KdcError> {
        validate_text(field, name, self.max_name_len)
    }

    /// Validate a session label.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if empty, too long or containing control characters
    pub fn validate_label(&self, label: &str) -> Result<(), KdcError> {
        validate_text("label", label, self.max_label_len)
    }
}

/// Message bodies only need to be non-empty.
pub fn validate_plaintext(plaintext: &str) -> Result<(), KdcError> {
    if plaintext.is_empty() {
        return Err(KdcError::invalid("plaintext", "must not be empty"));
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str, max_len: usize) -> Result<(), KdcError> {
    if value.is_empty() {
        return Err(KdcError::invalid(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(KdcError::invalid(field, format!("longer than {max_len} characters")));
    }
    if value.chars().any(char::is_control) {
        return Err(KdcError::invalid(field, "contains control characters"));
    }
    Ok(())
}
