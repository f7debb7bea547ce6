//! Namespaces and qualified names
//!
//! A `Multiname` here is always a resolved QName: one namespace plus a local
//! name. `qualified_key` is the canonical lookup key under which a trait is
//! installed on runtime objects.

use std::fmt;

/// Namespace kind as declared in the constant pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Public (package) namespace
    Public,
    /// Package-internal namespace
    PackageInternal,
    /// Protected namespace
    Protected,
    /// Static protected namespace
    StaticProtected,
    /// Private namespace
    Private,
    /// Explicitly declared namespace (`namespace foo = "..."`)
    Explicit,
}

impl NamespaceKind {
    /// Short prefix used when building qualified keys
    fn key_prefix(self) -> &'static str {
        match self {
            NamespaceKind::Public => "",
            NamespaceKind::PackageInternal => "internal",
            NamespaceKind::Protected => "protected",
            NamespaceKind::StaticProtected => "sprotected",
            NamespaceKind::Private => "private",
            NamespaceKind::Explicit => "ns",
        }
    }
}

/// A namespace: kind plus URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Namespace kind
    pub kind: NamespaceKind,
    /// Namespace URI (package name for public namespaces)
    pub uri: String,
}

impl Namespace {
    /// Create a namespace
    pub fn new(kind: NamespaceKind, uri: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
        }
    }

    /// The unnamed public namespace
    pub fn public() -> Self {
        Self::new(NamespaceKind::Public, "")
    }

    /// Public namespace of a package
    pub fn package(uri: impl Into<String>) -> Self {
        Self::new(NamespaceKind::Public, uri)
    }

    /// Private namespace scoped to a class
    pub fn private(uri: impl Into<String>) -> Self {
        Self::new(NamespaceKind::Private, uri)
    }

    /// Whether this is a public namespace (any package)
    pub fn is_public(&self) -> bool {
        self.kind == NamespaceKind::Public
    }

    /// Whether this is the unnamed public namespace
    pub fn is_unnamed_public(&self) -> bool {
        self.is_public() && self.uri.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_public() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "{}:{}", self.kind.key_prefix(), self.uri)
        }
    }
}

/// A resolved qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Multiname {
    /// Namespace
    pub namespace: Namespace,
    /// Local name
    pub name: String,
}

impl Multiname {
    /// Create a qualified name
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Name in the unnamed public namespace
    pub fn public(name: impl Into<String>) -> Self {
        Self::new(Namespace::public(), name)
    }

    /// Local (unqualified) name
    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// Canonical lookup key for this name.
    ///
    /// Names in the unnamed public namespace map to their local name so that
    /// dynamic property access and trait lookup agree on the key. Everything
    /// else is prefixed with namespace kind and URI.
    pub fn qualified_key(&self) -> String {
        qualified_key(&self.namespace, &self.name)
    }
}

impl fmt::Display for Multiname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.uri.is_empty() && self.namespace.is_public() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.namespace, self.name)
        }
    }
}

/// Resolve a namespace and local name into a canonical lookup key
pub fn qualified_key(namespace: &Namespace, name: &str) -> String {
    if namespace.is_unnamed_public() {
        return name.to_string();
    }
    format!("{}${}::{}", namespace.kind.key_prefix(), namespace.uri, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_is_local_name() {
        let name = Multiname::public("length");
        assert_eq!(name.qualified_key(), "length");
        assert_eq!(name.to_string(), "length");
    }

    #[test]
    fn test_keys_distinguish_namespaces() {
        let private = Multiname::new(Namespace::private("Foo"), "secret");
        let internal = Multiname::new(
            Namespace::new(NamespaceKind::PackageInternal, "Foo"),
            "secret",
        );
        assert_ne!(private.qualified_key(), internal.qualified_key());
        assert_eq!(private.qualified_key(), "private$Foo::secret");
    }

    #[test]
    fn test_package_display() {
        let name = Multiname::new(Namespace::package("flash.display"), "Sprite");
        assert_eq!(name.to_string(), "flash.display::Sprite");
        assert_eq!(name.qualified_key(), "$flash.display::Sprite");
    }
}
