//! Host property lookups.
//!
//! Only [`Event::page_view`](crate::objects::Event::page_view) reads these.
//! Where the values come from is up to the host.

/// Placeholder reported when the host cannot provide a value.
pub const NOT_SET: &str = "(not set)";

/// Static host properties used to fill convenience events.
pub trait SystemInfo: Send + Sync {
    /// Screen resolution as `"<width>x<height>"`.
    fn screen_resolution(&self) -> String;

    /// Preferred user language, e.g. `"en-US"`.
    fn language(&self) -> String;
}

/// [`SystemInfo`] backed by fixed strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSystemInfo {
    pub screen_resolution: String,
    pub language: String,
}

impl StaticSystemInfo {
    pub fn new(screen_resolution: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            screen_resolution: screen_resolution.into(),
            language: language.into(),
        }
    }
}

impl Default for StaticSystemInfo {
    fn default() -> Self {
        Self::new(NOT_SET, NOT_SET)
    }
}

impl SystemInfo for StaticSystemInfo {
    fn screen_resolution(&self) -> String {
        self.screen_resolution.clone()
    }

    fn language(&self) -> String {
        self.language.clone()
    }
}
