//! Value types and method signatures.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::symbol::{Symbol, CONSTRUCTOR};

/// Type of a field, parameter or return value.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Ty {
    Void,
    Bool,
    Int,
    Float,
    Str,
    /// Reference to a named class, interface or trait.
    Object(Symbol),
}

impl Ty {
    pub fn object(name: impl Into<Symbol>) -> Self {
        Ty::Object(name.into())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => f.write_str("void"),
            Ty::Bool => f.write_str("bool"),
            Ty::Int => f.write_str("int"),
            Ty::Float => f.write_str("float"),
            Ty::Str => f.write_str("str"),
            Ty::Object(name) => write!(f, "{name}"),
        }
    }
}

/// Parameter list. Most members take at most a handful of arguments.
pub type Params = SmallVec<[Ty; 4]>;

/// Parameter types plus return type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MethodSig {
    pub params: Params,
    pub ret: Ty,
}

impl MethodSig {
    pub fn new(params: impl IntoIterator<Item = Ty>, ret: Ty) -> Self {
        MethodSig {
            params: params.into_iter().collect(),
            ret,
        }
    }

    /// `() -> ret`
    pub fn nullary(ret: Ty) -> Self {
        MethodSig {
            params: Params::new(),
            ret,
        }
    }

    /// `() -> void`
    pub fn unit() -> Self {
        Self::nullary(Ty::Void)
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Same parameter list, return type ignored.
    #[inline]
    pub fn same_params(&self, other: &MethodSig) -> bool {
        self.params == other.params
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A member's identity: name plus full signature.
///
/// Two methods with the same name and parameters but different return types
/// are distinct keys; covariant bridging relies on that.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MethodKey {
    pub name: Symbol,
    pub sig: MethodSig,
}

impl MethodKey {
    pub fn new(name: impl Into<Symbol>, sig: MethodSig) -> Self {
        MethodKey {
            name: name.into(),
            sig,
        }
    }

    /// Constructor key taking `params`.
    pub fn constructor(params: impl IntoIterator<Item = Ty>) -> Self {
        MethodKey::new(CONSTRUCTOR, MethodSig::new(params, Ty::Void))
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    /// Same name and parameters; return types may differ.
    #[inline]
    pub fn same_params(&self, other: &MethodKey) -> bool {
        self.name == other.name && self.sig.same_params(&other.sig)
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.sig)
    }
}
