//! Validated locale type.

use super::{LocaleConfig, LocaleRegistry};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported locale code: '{0}'")]
pub struct UnsupportedLocale(pub String);

/// A locale that has been validated against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    /// The canonical locale. Rows in this locale own the shared fields.
    pub const CANONICAL: Locale = Locale { code: "en" };

    /// Create a Locale from a code string.
    ///
    /// # Example
    /// ```ignore
    /// let french = Locale::from_code("fr")?;
    /// ```
    pub fn from_code(code: &str) -> Result<Locale, UnsupportedLocale> {
        LocaleRegistry::supported()
            .get_by_code(code)
            .map(|config| Locale { code: config.code })
            .ok_or_else(|| UnsupportedLocale(code.to_string()))
    }

    pub fn canonical() -> Locale {
        Locale {
            code: LocaleRegistry::supported().canonical().code,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Full registry entry for this locale.
    ///
    /// # Panics
    /// Never in practice: a `Locale` can only be built from a registry code.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::supported()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }

    /// Whether a stored locale string refers to this locale.
    pub fn matches(&self, stored: &str) -> bool {
        self.code.eq_ignore_ascii_case(stored.trim())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl std::str::FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s)
    }
}
