//! CPF (Cadastro de Pessoas Físicas) validation and formatting.
//!
//! A CPF is 11 decimal digits; the last two are check digits computed from the
//! first nine with a weighted sum modulo 11. The display form is
//! `ddd.ddd.ddd-dd`. All functions here accept arbitrary user input (dots,
//! dashes, spaces, stray letters) and never panic.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of digits in a canonical CPF.
pub const CPF_LEN: usize = 11;

/// Strip every character that is not an ASCII decimal digit.
pub fn clean(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Apply the display mask to whatever digits `input` contains.
///
/// Separators are placed progressively so partially typed values format as
/// the user types (`12345` -> `123.45`). The mask never drops digits: input
/// longer than 11 digits keeps the excess after the dash.
pub fn format(input: &str) -> String {
    let digits = clean(input);
    let mut out = String::with_capacity(digits.len() + 3);
    for (i, c) in digits.chars().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Whether `input` holds a valid CPF once cleaned.
pub fn validate(input: &str) -> bool {
    canonical_digits(input).is_some_and(|digits| checksum_matches(&digits))
}

/// Compute both check digits for the first nine digits of a CPF.
pub fn check_digits(base: &[u8; 9]) -> (u8, u8) {
    let first = verifier(base);
    let mut extended = [0u8; 10];
    extended[..9].copy_from_slice(base);
    extended[9] = first;
    (first, verifier(&extended))
}

/// Weighted-sum verifier: weights run from `len + 1` down to 2.
fn verifier(digits: &[u8]) -> u8 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (top - i as u32))
        .sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => (11 - r) as u8,
    }
}

fn canonical_digits(input: &str) -> Option<[u8; CPF_LEN]> {
    let cleaned = clean(input);
    if cleaned.len() != CPF_LEN {
        return None;
    }
    let mut digits = [0u8; CPF_LEN];
    for (slot, b) in digits.iter_mut().zip(cleaned.bytes()) {
        *slot = b - b'0';
    }
    Some(digits)
}

fn checksum_matches(digits: &[u8; CPF_LEN]) -> bool {
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }
    let mut base = [0u8; 9];
    base.copy_from_slice(&digits[..9]);
    let (first, second) = check_digits(&base);
    digits[9] == first && digits[10] == second
}

/// A validated CPF, stored as its 11 canonical digits.
///
/// Serializes as the digits-only string the backend stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parse user input (masked or not) into a valid CPF.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let digits = clean(input);
        if digits.is_empty() {
            return Err(DomainError::field("cpf", "CPF is required"));
        }
        if !validate(&digits) {
            return Err(DomainError::field("cpf", "invalid CPF"));
        }
        Ok(Self(digits))
    }

    /// Canonical digits-only form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form (`ddd.ddd.ddd-dd`).
    pub fn formatted(&self) -> String {
        format(&self.0)
    }
}

impl ValueObject for Cpf {}

impl core::fmt::Display for Cpf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl core::str::FromStr for Cpf {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cpf {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(value: Cpf) -> Self {
        value.0
    }
}
