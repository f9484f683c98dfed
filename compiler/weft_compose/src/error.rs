//! Composition errors.
//!
//! Every error here aborts the registration or composition call that raised
//! it. Nothing is retried and nothing is cached as a negative result, so an
//! identical call after the cause is fixed starts from scratch.
//!
//! "Not found" is not an error: lookups that can legitimately miss return
//! `Option`.

/// Fatal composition error.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ComposeError {
    // Configuration errors
    /// A type name no declaration source knows.
    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    #[error(
        "trait `{trait_name}` with resolved parent `{parent}` does not extend base type `{base}`"
    )]
    ParentMismatch {
        trait_name: String,
        parent: String,
        base: String,
    },

    #[error("base type `{base}` declares no usable constructor")]
    NoBaseConstructor { base: String },

    #[error("factory `{shape}` matches no constructor of `{composite}`")]
    FactoryShapeMismatch { composite: String, shape: String },

    #[error("invalid factory shape `{shape}`: {reason}")]
    InvalidFactoryShape { shape: String, reason: String },

    #[error("no language extractor claims `{name}`")]
    Unclaimed { name: String },

    #[error("duplicate language extractor `{name}` (sorting index {index})")]
    DuplicateExtractor { name: String, index: i32 },

    #[error("cannot register `{trait_name}` as a trait: {reason}")]
    InvalidTrait { trait_name: String, reason: String },

    #[error("trait `{name}` is not registered")]
    UnregisteredTrait { name: String },

    #[error("cyclic parent traits: {}", chain.join(" -> "))]
    CyclicTraits { chain: Vec<String> },

    #[error("type `{name}` is already defined")]
    AlreadyDefined { name: String },

    #[error("invalid value `{value}` for `{key}`")]
    InvalidConfig { key: String, value: String },

    // Synthesis invariant violations
    #[error(
        "`{composite}`: no trait before `{trait_name}` and no ancestor of the base type implements super call `{method}`"
    )]
    MissingSuperTarget {
        composite: String,
        trait_name: String,
        method: String,
    },

    #[error("extractor built trait `{found}` from declaration `{expected}`")]
    TraitNameMismatch { expected: String, found: String },

    #[error("`{composite}` declares `{member}` twice")]
    DuplicateMember { composite: String, member: String },

    #[error("cannot assemble `{name}`: {reason}")]
    Assembly { name: String, reason: String },

    #[error("`{composite}` references undefined entry point `{entry}`")]
    UnresolvedEntry { composite: String, entry: String },
}

/// Broad error category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The inputs cannot be composed: bad ancestry, shapes, extractors.
    Configuration,
    /// The composer produced or received something structurally illegal.
    Invariant,
}

impl ComposeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::UnknownType { .. }
            | ComposeError::ParentMismatch { .. }
            | ComposeError::NoBaseConstructor { .. }
            | ComposeError::FactoryShapeMismatch { .. }
            | ComposeError::InvalidFactoryShape { .. }
            | ComposeError::Unclaimed { .. }
            | ComposeError::DuplicateExtractor { .. }
            | ComposeError::InvalidTrait { .. }
            | ComposeError::UnregisteredTrait { .. }
            | ComposeError::CyclicTraits { .. }
            | ComposeError::AlreadyDefined { .. }
            | ComposeError::InvalidConfig { .. } => ErrorKind::Configuration,
            ComposeError::MissingSuperTarget { .. }
            | ComposeError::TraitNameMismatch { .. }
            | ComposeError::DuplicateMember { .. }
            | ComposeError::Assembly { .. }
            | ComposeError::UnresolvedEntry { .. } => ErrorKind::Invariant,
        }
    }

    pub(crate) fn unknown(name: impl ToString) -> Self {
        ComposeError::UnknownType {
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_chain() {
        let err = ComposeError::CyclicTraits {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic parent traits: A -> B -> A");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn super_target_is_invariant() {
        let err = ComposeError::MissingSuperTarget {
            composite: "Tile_t$$0".into(),
            trait_name: "Z".into(),
            method: "foo() -> void".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert!(err.to_string().contains("foo() -> void"));
    }
}
