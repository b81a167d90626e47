//! Process-wide settings
//!
//! Read once from the environment on first use:
//!
//! | Variable                  | Values                                   |
//! |---------------------------|------------------------------------------|
//! | `BEANLENS_PACKAGES_PRINT` | `on`/`enable`/`true` abbreviate packages, `off`/`disable`/`false` print them in full |

use std::sync::LazyLock;

use crate::format::PackagePrintMode;

/// Environment variable controlling package abbreviation
pub const PACKAGES_PRINT_VAR: &str = "BEANLENS_PACKAGES_PRINT";

/// Settings shared by the whole process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    /// Default package print mode of type names in diagnostics
    pub package_print_mode: PackagePrintMode,
}

impl Settings {
    /// Settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable source; unknown values fall back
    /// to the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();
        if let Some(raw) = lookup(PACKAGES_PRINT_VAR) {
            match PackagePrintMode::parse(&raw) {
                Some(mode) => settings.package_print_mode = mode,
                None => tracing::warn!(
                    variable = PACKAGES_PRINT_VAR,
                    value = %raw,
                    "ignoring unrecognized package print mode"
                ),
            }
        }
        settings
    }
}

static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::from_env);

/// Settings of the current process
pub fn settings() -> &'static Settings {
    &SETTINGS
}
