//! Linker configuration

/// Environment variable that turns on strict linking
pub const STRICT_ENV: &str = "KILN_STRICT_LINK";

/// Environment variable that turns on class tracing
pub const TRACE_ENV: &str = "KILN_TRACE_CLASSES";

/// Options for linking classes in a domain
#[derive(Debug, Clone)]
pub struct LinkerOptions {
    /// Structural verifier failures abort linking instead of being reported
    pub strict: bool,

    /// Dump every linked class to the log at trace level
    pub trace: bool,

    /// Run the verifier after templates are finalized
    pub verify: bool,
}

impl Default for LinkerOptions {
    fn default() -> Self {
        Self {
            strict: false,
            trace: false,
            verify: true,
        }
    }
}

impl LinkerOptions {
    /// Options with structural checks promoted to errors
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    /// Options with verification disabled
    pub fn unverified() -> Self {
        Self {
            verify: false,
            ..Default::default()
        }
    }

    /// Defaults overridden by `KILN_STRICT_LINK` and `KILN_TRACE_CLASSES`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key).map_or(false, |v| matches!(v.trim(), "1" | "true" | "yes"))
        };
        Self {
            strict: flag(STRICT_ENV),
            trace: flag(TRACE_ENV),
            ..Default::default()
        }
    }
}
