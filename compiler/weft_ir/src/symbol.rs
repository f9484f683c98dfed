//! Value-equal names for types and members.
//!
//! A `Symbol` is a reference-counted string. Cloning is a pointer bump and
//! equality/hashing go through the string contents, so two symbols built
//! from the same text are interchangeable as map keys.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Member name of constructors.
pub const CONSTRUCTOR: &str = "<init>";

/// Static entry point that initializes a trait's fields on a new instance.
pub const INITIALIZER: &str = "$init$";

/// Name of a type or member.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Name of the implicit root of every class hierarchy.
    pub const OBJECT: &'static str = "Object";

    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    /// The root type symbol.
    pub fn object() -> Self {
        Symbol::new(Self::OBJECT)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        &*self.0 == Self::OBJECT
    }

    /// The name with every path separator (`/`, `.`, `::`) replaced by `$`.
    ///
    /// Used to build member names that are namespaced by their owning type.
    pub fn flattened(&self) -> String {
        self.0.replace("::", "$").replace(['/', '.'], "$")
    }

    /// Last path segment, e.g. `Tile` for `game/block/Tile`.
    pub fn simple_name(&self) -> &str {
        let s = &*self.0;
        let start = s
            .rfind(|c| c == '/' || c == '.' || c == ':')
            .map_or(0, |i| i + 1);
        &s[start..]
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(Arc::from(s))
    }
}

impl From<&Symbol> for Symbol {
    fn from(s: &Symbol) -> Self {
        s.clone()
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Symbol::from)
    }
}
