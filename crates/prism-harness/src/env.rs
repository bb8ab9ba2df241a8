//! Environment-driven harness configuration.
//!
//! Each variable is read once when the harness is constructed, lower-cased,
//! and compared against a small fixed vocabulary; anything outside it is
//! ignored rather than guessed at.

/// Which classes of validation diagnostics to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSelect {
    /// Everything the layer implements, including the expensive checks.
    All,
    /// Core checks only; strips any disable list.
    Core,
    /// No validation diagnostics at all.
    None,
}

/// Snapshot of the `PRISM_TESTS_*` environment, taken once per harness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessEnv {
    /// `PRISM_TESTS_VALIDATION` ∈ {all, core, none}.
    pub validation: Option<ValidationSelect>,
    /// `PRISM_TESTS_DISABLE_CORE_VALIDATION` set to a falsy value: strip the
    /// disable list from a caller-supplied validation fragment so every core
    /// message is delivered.
    pub force_core_validation: bool,
    /// `PRISM_TESTS_PRINT_DRIVER` non-empty: log driver name/info once per
    /// process.
    pub print_driver_info: bool,
    /// `PRISM_TESTS_IGNORE_DISABLE_CHECKS` non-empty: bypass gates keyed on
    /// the mock driver.
    pub ignore_disable_checks: bool,
    /// `PRISM_TESTS_EMULATE_PORTABILITY` non-empty and not "false": require
    /// the portability capabilities as if on a portability platform.
    pub emulate_portability: bool,
    /// `PRISM_TESTS_DEVICE_INDEX`: pin a physical device by index, bypassing
    /// ranked selection when in range.
    pub device_index: Option<usize>,
}

impl HarnessEnv {
    pub const VALIDATION: &'static str = "PRISM_TESTS_VALIDATION";
    pub const DISABLE_CORE_VALIDATION: &'static str = "PRISM_TESTS_DISABLE_CORE_VALIDATION";
    pub const PRINT_DRIVER: &'static str = "PRISM_TESTS_PRINT_DRIVER";
    pub const IGNORE_DISABLE_CHECKS: &'static str = "PRISM_TESTS_IGNORE_DISABLE_CHECKS";
    pub const EMULATE_PORTABILITY: &'static str = "PRISM_TESTS_EMULATE_PORTABILITY";
    pub const DEVICE_INDEX: &'static str = "PRISM_TESTS_DEVICE_INDEX";

    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through an arbitrary lookup, so parsing is testable without
    /// mutating process-global state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let validation = lookup(Self::VALIDATION)
            .map(|v| v.trim().to_ascii_lowercase())
            .and_then(|v| match v.as_str() {
                "all" => Some(ValidationSelect::All),
                "core" => Some(ValidationSelect::Core),
                "none" => Some(ValidationSelect::None),
                _ => None,
            });

        let force_core_validation = lookup(Self::DISABLE_CORE_VALIDATION)
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                v == "false" || v == "0"
            })
            .unwrap_or(false);

        let print_driver_info = lookup(Self::PRINT_DRIVER).is_some_and(|v| !v.is_empty());
        let ignore_disable_checks =
            lookup(Self::IGNORE_DISABLE_CHECKS).is_some_and(|v| !v.is_empty());

        let emulate_portability = lookup(Self::EMULATE_PORTABILITY)
            .is_some_and(|v| !v.is_empty() && v.trim().to_ascii_lowercase() != "false");

        let device_index = lookup(Self::DEVICE_INDEX).and_then(|v| v.trim().parse().ok());

        Self {
            validation,
            force_core_validation,
            print_driver_info,
            ignore_disable_checks,
            emulate_portability,
            device_index,
        }
    }
}
