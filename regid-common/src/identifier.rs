//! Canonical registry identifier (CNPJ)
//!
//! A CNPJ is written in many shapes (`12.345.678/0001-90`, `12345678/0001-90`,
//! `12345678000190`). Everything in regid stores and compares the digits-only
//! 14 character form held by [`Cnpj`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of digits in a canonical CNPJ
pub const CNPJ_LEN: usize = 14;

const FIRST_CHECK_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_CHECK_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Canonical (digits-only, fixed-length) registry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse any punctuated rendering into canonical form.
    ///
    /// All non-digit characters are dropped; the remainder must be exactly
    /// [`CNPJ_LEN`] digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != CNPJ_LEN {
            return Err(Error::InvalidInput(format!(
                "CNPJ must have {} digits, got {} in {:?}",
                CNPJ_LEN,
                digits.len(),
                raw
            )));
        }

        Ok(Self(digits))
    }

    /// Canonical digits-only form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form `NN.NNN.NNN/NNNN-NN`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }

    /// MOD-11 check digit verification
    pub fn has_valid_check_digits(&self) -> bool {
        let digits: Vec<u32> = self.0.chars().filter_map(|c| c.to_digit(10)).collect();

        // Repeated digits pass MOD-11 but are never issued
        if digits.iter().all(|d| *d == digits[0]) {
            return false;
        }

        let first = check_digit(&digits[..12], &FIRST_CHECK_WEIGHTS);
        let second = check_digit(&digits[..13], &SECOND_CHECK_WEIGHTS);

        digits[12] == first && digits[13] == second
    }
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cnpj {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cnpj {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cnpj> for String {
    fn from(value: Cnpj) -> Self {
        value.0
    }
}
