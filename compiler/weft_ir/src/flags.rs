//! Modifier flags for members and types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifiers on a field or method.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
    pub struct MemberFlags: u8 {
        /// Only visible to the declaring type.
        const PRIVATE = 1 << 0;
        /// Belongs to the type, not to instances.
        const STATIC = 1 << 1;
        /// Declared without an implementation.
        const ABSTRACT = 1 << 2;
        /// Emitted by the composer, not declared by a user.
        const SYNTHETIC = 1 << 3;
        /// Forwards to another signature of the same method.
        const BRIDGE = 1 << 4;
    }
}

bitflags! {
    /// Modifiers on a type declaration.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
    pub struct ClassFlags: u8 {
        const INTERFACE = 1 << 0;
        const ABSTRACT = 1 << 1;
        /// Declared in the trait language: an interface-like type with
        /// bodies, fields and parent traits.
        const TRAIT = 1 << 2;
    }
}
