//! Error types for descriptor validation

/// Result type for descriptor operations
pub type AbcResult<T> = Result<T, AbcError>;

/// Descriptor consistency errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbcError {
    /// Two traits in the same set share a qualified name and kind
    #[error("Duplicate {kind} trait '{name}' in {owner}")]
    DuplicateTrait {
        /// Qualified trait name
        name: String,
        /// Trait kind label
        kind: &'static str,
        /// Owning class name
        owner: String,
    },

    /// Native metadata carried an empty identifier
    #[error("Class {0} declares an empty native identifier")]
    EmptyNativeIdentifier(String),
}
