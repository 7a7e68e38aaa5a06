//! Locale registry: the closed set of locales a catalog row may carry.
//!
//! The table is a compile-time constant. Exactly one entry is canonical; its
//! rows are the source of truth for shared fields.

/// Metadata for one supported locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Lowercase locale code as stored in the `locale` column (e.g. "en", "fr")
    pub code: &'static str,

    /// English name of the locale
    pub name: &'static str,

    /// Whether rows in this locale own the shared fields (only one should be true)
    pub is_canonical: bool,
}

const SUPPORTED_LOCALES: &[LocaleConfig] = &[
    LocaleConfig {
        code: "en",
        name: "English",
        is_canonical: true,
    },
    LocaleConfig {
        code: "fr",
        name: "French",
        is_canonical: false,
    },
    LocaleConfig {
        code: "es",
        name: "Spanish",
        is_canonical: false,
    },
    LocaleConfig {
        code: "de",
        name: "German",
        is_canonical: false,
    },
    LocaleConfig {
        code: "it",
        name: "Italian",
        is_canonical: false,
    },
    LocaleConfig {
        code: "pt",
        name: "Portuguese",
        is_canonical: false,
    },
    LocaleConfig {
        code: "nl",
        name: "Dutch",
        is_canonical: false,
    },
    LocaleConfig {
        code: "ar",
        name: "Arabic",
        is_canonical: false,
    },
];

/// Read-only view over the supported locale table.
#[derive(Debug, Clone, Copy)]
pub struct LocaleRegistry {
    locales: &'static [LocaleConfig],
}

impl LocaleRegistry {
    /// The registry of locales supported by the catalog.
    pub const fn supported() -> Self {
        Self {
            locales: SUPPORTED_LOCALES,
        }
    }

    /// Look up a locale by code. The comparison ignores ASCII case and
    /// surrounding whitespace, since codes arrive from admin forms and from
    /// rows written by older tooling.
    pub fn get_by_code(&self, code: &str) -> Option<&'static LocaleConfig> {
        let code = code.trim();
        self.locales
            .iter()
            .find(|locale| locale.code.eq_ignore_ascii_case(code))
    }

    /// All supported locales, canonical first.
    pub fn list_all(&self) -> impl Iterator<Item = &'static LocaleConfig> {
        let locales = self.locales;
        locales
            .iter()
            .filter(|l| l.is_canonical)
            .chain(locales.iter().filter(|l| !l.is_canonical))
    }

    /// The canonical locale configuration.
    ///
    /// # Panics
    /// Panics if the table does not define exactly one canonical locale. The
    /// table is a constant, so this is a programming error caught by the tests.
    pub fn canonical(&self) -> &'static LocaleConfig {
        let mut canonical = self.locales.iter().filter(|l| l.is_canonical);
        match (canonical.next(), canonical.next()) {
            (Some(config), None) => config,
            (None, _) => panic!("No canonical locale found in registry"),
            (Some(_), Some(_)) => panic!("Multiple canonical locales found in registry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_code_english() {
        let config = LocaleRegistry::supported().get_by_code("en").unwrap();
        assert_eq!(config.code, "en");
        assert_eq!(config.name, "English");
        assert!(config.is_canonical);
    }

    #[test]
    fn test_get_by_code_ignores_case_and_whitespace() {
        let registry = LocaleRegistry::supported();
        assert_eq!(registry.get_by_code("FR").unwrap().code, "fr");
        assert_eq!(registry.get_by_code(" de ").unwrap().code, "de");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LocaleRegistry::supported();
        assert!(registry.get_by_code("xx").is_none());
        assert!(registry.get_by_code("").is_none());
    }

    #[test]
    fn test_exactly_one_canonical() {
        let registry = LocaleRegistry::supported();
        assert_eq!(registry.list_all().filter(|l| l.is_canonical).count(), 1);
        assert_eq!(registry.canonical().code, "en");
    }

    #[test]
    fn test_list_all_starts_with_canonical() {
        let mut all = LocaleRegistry::supported().list_all();
        assert_eq!(all.next().unwrap().code, "en");
        assert_eq!(all.count(), SUPPORTED_LOCALES.len() - 1);
    }

    #[test]
    fn test_codes_are_unique_and_lowercase() {
        let codes: Vec<_> = SUPPORTED_LOCALES.iter().map(|l| l.code).collect();
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(codes.len(), deduped.len());
        assert!(codes.iter().all(|c| c.chars().all(|ch| ch.is_ascii_lowercase())));
    }
}
