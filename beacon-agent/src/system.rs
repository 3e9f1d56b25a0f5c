//! Host properties for page views.

use beacon_sdk::StaticSystemInfo;
use beacon_sdk::system::NOT_SET;

/// Build the agent's system info.
///
/// Language comes from `language` if set, otherwise from the first of
/// `LC_ALL` / `LANG` that names a real locale.
pub fn detect(screen_resolution: Option<String>, language: Option<String>) -> StaticSystemInfo {
    let language = language.or_else(|| {
        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|locale| language_from_locale(&locale))
    });

    StaticSystemInfo::new(
        screen_resolution.unwrap_or_else(|| NOT_SET.to_string()),
        language.unwrap_or_else(|| NOT_SET.to_string()),
    )
}

/// `en_US.UTF-8` -> `en-US`. `C` and `POSIX` carry no language.
fn language_from_locale(locale: &str) -> Option<String> {
    let tag = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();

    match tag {
        "" | "C" | "POSIX" => None,
        tag => Some(tag.replace('_', "-")),
    }
}
