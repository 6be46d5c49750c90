//! Two-letter language codes selecting an engine's data directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid language code {code:?}: expected two ASCII letters")]
pub struct LanguageError {
    pub code: String,
}

/// ISO-style two-letter language code, stored upper-case (`EN`, `NL`, `PT`).
///
/// The engine loads its model from a directory named after the code,
/// relative to its working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode([u8; 2]);

impl LanguageCode {
    pub fn new(code: &str) -> Result<Self, LanguageError> {
        match code.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => Err(LanguageError {
                code: code.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII letters by construction
        std::str::from_utf8(&self.0).unwrap_or("??")
    }

    /// Data directory argument handed to the engine (`./EN/`).
    pub fn data_dir_arg(&self) -> String {
        format!("./{}/", self.as_str())
    }

    /// Data directory resolved against the engine's working directory.
    pub fn data_dir_in(&self, base: &Path) -> PathBuf {
        base.join(self.as_str())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.as_str().to_string()
    }
}
