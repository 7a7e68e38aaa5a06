//! Supported locales for catalog rows.
//!
//! - `registry`: the closed table of supported locales, one of them canonical
//! - `code`: the validated `Locale` type used at every API boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_sync::locale::Locale;
//!
//! let canonical = Locale::canonical();
//! let french = Locale::from_code("fr")?;
//! assert!(!french.is_canonical());
//! ```

mod code;
mod registry;

pub use code::{Locale, UnsupportedLocale};
pub use registry::{LocaleConfig, LocaleRegistry};
