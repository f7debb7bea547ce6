//! Link-time diagnostics
//!
//! Non-fatal findings produced while building classes. Each diagnostic is
//! kept in the domain's sink and mirrored to the `log` facade under the
//! `kiln::verify` target.

use parking_lot::Mutex;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Suspicious but harmless
    Warning,
    /// Broken invariant tolerated outside strict mode
    Error,
}

/// Which trait set a native trait was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitSet {
    /// Class-level traits
    Static,
    /// Per-object traits
    Instance,
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitSet::Static => write!(f, "static"),
            TraitSet::Instance => write!(f, "instance"),
        }
    }
}

/// What was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A native trait has no implementation in any holder
    MissingNativeTrait {
        /// Trait name
        trait_name: String,
        /// `method`, `getter` or `setter`
        trait_kind: &'static str,
        /// Static or instance
        set: TraitSet,
        /// Owning class
        class_name: String,
    },
    /// A bytecode constructor was offered to a class that already has a native one
    IgnoredConstructor {
        /// Class name
        class_name: String,
    },
    /// A native class kept the root class's default holder list
    InheritedNativeHolders {
        /// Class name
        class_name: String,
        /// Static or instance holders
        set: TraitSet,
    },
    /// A structural invariant does not hold
    Structural {
        /// Class name
        class_name: String,
        /// Description of the broken invariant
        message: String,
    },
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Finding
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Warning diagnostic
    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }

    /// Error diagnostic
    pub fn error(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
        }
    }

    /// Class the diagnostic refers to
    pub fn class_name(&self) -> &str {
        match &self.kind {
            DiagnosticKind::MissingNativeTrait { class_name, .. }
            | DiagnosticKind::IgnoredConstructor { class_name }
            | DiagnosticKind::InheritedNativeHolders { class_name, .. }
            | DiagnosticKind::Structural { class_name, .. } => class_name,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::MissingNativeTrait {
                trait_name,
                trait_kind,
                set,
                class_name,
            } => write!(
                f,
                "template is missing an implementation of the native {} {}: {} in class: {}",
                set, trait_kind, trait_name, class_name
            ),
            DiagnosticKind::IgnoredConstructor { class_name } => {
                write!(f, "ignoring bytecode instance constructor of {}", class_name)
            }
            DiagnosticKind::InheritedNativeHolders { class_name, set } => write!(
                f,
                "template {} does not override its {} natives",
                class_name, set
            ),
            DiagnosticKind::Structural {
                class_name,
                message,
            } => write!(f, "{}: {}", class_name, message),
        }
    }
}

/// Collects diagnostics for a domain
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it
    pub fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::warn!(target: "kiln::verify", "{}", diagnostic),
            Severity::Error => log::error!(target: "kiln::verify", "{}", diagnostic),
        }
        self.entries.lock().push(diagnostic);
    }

    /// Snapshot of every diagnostic so far
    pub fn all(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Diagnostics that refer to `class_name`
    pub fn for_class(&self, class_name: &str) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.class_name() == class_name)
            .cloned()
            .collect()
    }

    /// Number of diagnostics recorded
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove and return every diagnostic
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_filters_by_class() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::warning(DiagnosticKind::IgnoredConstructor {
            class_name: "Foo".to_string(),
        }));
        sink.emit(Diagnostic::error(DiagnosticKind::Structural {
            class_name: "Bar".to_string(),
            message: "has no base class".to_string(),
        }));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.for_class("Foo").len(), 1);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_trait_message_names_trait_and_class() {
        let d = Diagnostic::warning(DiagnosticKind::MissingNativeTrait {
            trait_name: "bar".to_string(),
            trait_kind: "method",
            set: TraitSet::Instance,
            class_name: "Foo".to_string(),
        });
        let text = d.to_string();
        assert!(text.contains("bar"));
        assert!(text.contains("Foo"));
        assert!(text.contains("instance method"));
    }
}
