//! JavaScript bundled with the rewriter.
//!
//! Filters that inject script ask the [`StaticAssets`] manager for the body
//! by [`StaticAsset`] id instead of embedding it themselves, so a host can
//! swap in its own build of an asset.

use std::collections::HashMap;

use strum_macros::Display;

const CRITICAL_CSS_LOADER_JS: &str = include_str!("../assets/critical_css_loader.js");

/// Identifies a bundled asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StaticAsset {
    /// Defines `pagespeed.CriticalCssLoader`, which lifts the stylesheets
    /// parked in `<noscript class="psa_add_styles">` into the page after
    /// the first paint.
    CriticalCssLoader,
}

impl StaticAsset {
    /// The JavaScript shipped with the crate.
    #[must_use]
    pub const fn bundled_js(self) -> &'static str {
        match self {
            Self::CriticalCssLoader => CRITICAL_CSS_LOADER_JS,
        }
    }
}

/// Serves asset bodies, preferring overrides registered by the host.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    overrides: HashMap<StaticAsset, String>,
}

impl StaticAssets {
    /// A manager serving the bundled assets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `js` instead of the bundled body of `asset`.
    pub fn set_asset(&mut self, asset: StaticAsset, js: impl Into<String>) {
        let _ = self.overrides.insert(asset, js.into());
    }

    /// The current body of `asset`.
    #[must_use]
    pub fn get_asset(&self, asset: StaticAsset) -> &str {
        self.overrides
            .get(&asset)
            .map_or_else(|| asset.bundled_js(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_loader_defines_run() {
        let js = StaticAssets::new().get_asset(StaticAsset::CriticalCssLoader).to_string();
        assert!(js.contains("pagespeed.CriticalCssLoader.Run = function"));
        assert!(js.contains("psa_add_styles"));
    }

    #[test]
    fn test_override() {
        let mut assets = StaticAssets::new();
        assets.set_asset(StaticAsset::CriticalCssLoader, "var x;");
        assert_eq!(assets.get_asset(StaticAsset::CriticalCssLoader), "var x;");
        assert_eq!(StaticAsset::CriticalCssLoader.to_string(), "critical_css_loader");
    }
}
