//! Serial number normalization
//!
//! Turns free-form user input (mixed numeral scripts, punctuation, any case)
//! into a canonical fixed-width [`Identifier`]:
//!
//! ```text
//! <alphabetic run> <zero padding> <digit run>      total = width characters
//! ```
//!
//! Ordering constraint: canonical identifiers are compared as plain strings.
//! Because the padding is always `'0'` and the width is fixed, two identifiers
//! sharing the same alphabetic prefix compare in the same order as their
//! numeric suffixes. Range matching relies on this; identifiers with different
//! alphabetic prefixes have no numeric relationship.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

/// Identifier width used by the deployed service
pub const DEFAULT_WIDTH: usize = 30;

/// Persian (Extended Arabic-Indic) digits, 0 through 9
pub const PERSIAN_DIGITS: &str = "۰۱۲۳۴۵۶۷۸۹";

/// Arabic-Indic digits, 0 through 9
pub const ARABIC_INDIC_DIGITS: &str = "٠١٢٣٤٥٦٧٨٩";

const ASCII_DIGITS: &str = "0123456789";

/// Canonical serial number
///
/// Only produced by [`Normalizer::normalize`] or re-validated from storage
/// with [`Identifier::from_canonical`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Re-validate a string previously produced by the normalizer
    ///
    /// Checks the width and the `alpha* digit*` shape. Letters without an
    /// uppercase form (`ĸ`, `ª`) are canonical as-is. Used when loading
    /// persisted tables.
    pub fn from_canonical(value: &str, width: usize) -> Result<Self> {
        let len = value.chars().count();
        if len != width {
            return Err(Error::InvalidInput(format!(
                "stored identifier '{}' has length {}, expected {}",
                value, len, width
            )));
        }

        let mut in_digits = false;
        for c in value.chars() {
            if c.is_ascii_digit() {
                in_digits = true;
            } else if in_digits || !c.is_alphabetic() {
                return Err(Error::InvalidInput(format!(
                    "stored identifier '{}' is not canonical",
                    value
                )));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Table of equivalent numeral alphabets
///
/// Each alphabet lists the digits zero through nine in order. The character at
/// position `n` of every alphabet folds to ASCII digit `n`. Adding a numeral
/// system is a configuration change.
#[derive(Debug, Clone)]
pub struct DigitFolding {
    map: HashMap<char, char>,
}

impl DigitFolding {
    /// Build a folding table from ten-character alphabets
    pub fn new<I, S>(alphabets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();

        for alphabet in alphabets {
            let alphabet = alphabet.as_ref();
            let chars: Vec<char> = alphabet.chars().collect();
            if chars.len() != 10 {
                return Err(Error::Config(format!(
                    "numeral alphabet '{}' must list exactly 10 digits, found {}",
                    alphabet,
                    chars.len()
                )));
            }

            for (c, ascii) in chars.into_iter().zip(ASCII_DIGITS.chars()) {
                if c == ascii {
                    continue;
                }
                match map.insert(c, ascii) {
                    Some(previous) if previous != ascii => {
                        return Err(Error::Config(format!(
                            "numeral '{}' maps to both {} and {}",
                            c, previous, ascii
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(Self { map })
    }

    /// Fold a single character; characters outside the table pass through
    pub fn fold(&self, c: char) -> char {
        self.map.get(&c).copied().unwrap_or(c)
    }
}

impl Default for DigitFolding {
    fn default() -> Self {
        let mut map = HashMap::new();
        for alphabet in [PERSIAN_DIGITS, ARABIC_INDIC_DIGITS] {
            for (c, ascii) in alphabet.chars().zip(ASCII_DIGITS.chars()) {
                map.insert(c, ascii);
            }
        }
        Self { map }
    }
}

/// Pure raw-text → [`Identifier`] transformation
#[derive(Debug, Clone)]
pub struct Normalizer {
    width: usize,
    folding: DigitFolding,
}

impl Normalizer {
    pub fn new(width: usize, folding: DigitFolding) -> Self {
        Self { width, folding }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Normalize raw input into a canonical identifier
    ///
    /// 1. fold every configured numeral to ASCII
    /// 2. uppercase
    /// 3. drop everything that is neither a letter nor an ASCII digit
    /// 4. split into the letter run and the digit run, keeping relative order
    /// 5. left-pad the digit run with `'0'` up to the width
    ///
    /// Returns [`Error::MalformedInput`] when the significant characters do
    /// not fit the width. Nothing is truncated.
    pub fn normalize(&self, raw: &str) -> Result<Identifier> {
        let mut alpha = String::new();
        let mut digits = String::new();
        let mut alpha_len = 0usize;

        for c in raw.chars().map(|c| self.folding.fold(c)) {
            for upper in c.to_uppercase() {
                if upper.is_ascii_digit() {
                    digits.push(upper);
                } else if upper.is_alphabetic() {
                    alpha.push(upper);
                    alpha_len += 1;
                }
            }
        }

        // digits are ASCII, so byte length == char count
        let significant = alpha_len + digits.len();
        if significant > self.width {
            return Err(Error::MalformedInput {
                significant,
                width: self.width,
            });
        }

        let pad = self.width - significant;
        let mut canonical = alpha;
        canonical.reserve(pad + digits.len());
        canonical.extend(std::iter::repeat('0').take(pad));
        canonical.push_str(&digits);

        Ok(Identifier(canonical))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DigitFolding::default())
    }
}
