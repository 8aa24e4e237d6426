use rand::Rng;
use serde::{Deserialize, Serialize};

use movierent_core::{DomainError, DomainResult, value_object::ValueObject};

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Upper bound on regenerate-on-collision attempts when creating a rental.
pub const MAX_CODE_ATTEMPTS: usize = 16;

/// Human-facing rental lookup key: uppercase ASCII letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalCode(String);

impl RentalCode {
    /// Parse user input. Lowercase letters are accepted and uppercased.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() || !code.bytes().all(|b| CHARSET.contains(&b)) {
            return Err(DomainError::validation("rental code must be alphanumeric"));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl ValueObject for RentalCode {}

impl core::fmt::Display for RentalCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalCodeGenerator {
    length: usize,
}

impl Default for RentalCodeGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl RentalCodeGenerator {
    pub fn new(length: usize) -> DomainResult<Self> {
        if length == 0 {
            return Err(DomainError::validation("rental code length must be positive"));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> RentalCode {
        let code = (0..self.length)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        RentalCode(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn zero_length_is_rejected() {
        assert!(RentalCodeGenerator::new(0).is_err());
        assert_eq!(RentalCodeGenerator::default().length(), DEFAULT_CODE_LENGTH);
    }

    #[test]
    fn parse_uppercases_and_rejects_symbols() {
        assert_eq!(RentalCode::parse(" ab12cd34 ").unwrap().as_str(), "AB12CD34");
        assert!(RentalCode::parse("AB-12").is_err());
        assert!(RentalCode::parse("").is_err());
    }

    #[test]
    fn same_seed_same_code() {
        let generator = RentalCodeGenerator::default();
        let a = generator.generate(&mut StdRng::seed_from_u64(7));
        let b = generator.generate(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn generated_codes_parse_back(len in 1usize..32, seed in any::<u64>()) {
            let generator = RentalCodeGenerator::new(len).unwrap();
            let code = generator.generate(&mut StdRng::seed_from_u64(seed));
            prop_assert_eq!(code.as_str().len(), len);
            prop_assert_eq!(RentalCode::parse(code.as_str()).unwrap(), code);
        }
    }
}
