//! Internationalization (i18n) support
//!
//! This module picks the locale used for CLI messages.
//! Supported languages: English (en), Korean (ko), Spanish (es)
//!
//! An explicit `--lang` wins; otherwise the locale is detected from the
//! system (LANG environment variable on Unix).

use rust_i18n::set_locale;
use sys_locale::get_locale;

/// Supported locales
const SUPPORTED_LOCALES: &[&str] = &["en", "ko", "es"];

/// Default locale when system locale is not supported
const DEFAULT_LOCALE: &str = "en";

/// Initialize the message locale and return the one in use
///
/// `requested` is a user override such as `ko` or `es-MX`; an unsupported
/// override falls back to system detection.
pub fn init_locale(requested: Option<&str>) -> String {
    let locale = requested
        .and_then(supported_locale)
        .unwrap_or_else(detect_locale);
    set_locale(&locale);
    locale
}

/// Map a locale tag to a supported locale code
fn supported_locale(tag: &str) -> Option<String> {
    // Extract language code (e.g., "en-US" -> "en", "ko_KR.UTF-8" -> "ko")
    let lang = tag.split(['-', '_', '.']).next()?.to_ascii_lowercase();
    SUPPORTED_LOCALES.contains(&lang.as_str()).then_some(lang)
}

/// Detect the system locale and return a supported locale code
fn detect_locale() -> String {
    get_locale()
        .as_deref()
        .and_then(supported_locale)
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}
