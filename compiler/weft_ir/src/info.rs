//! Structural info: the ancestry and methods of a resolved type.
//!
//! Ancestors are referenced by name. Walking them requires a resolver, so
//! the walks live with the composer; this module only describes one type.

use std::fmt;

use crate::decl::TypeDecl;
use crate::flags::{ClassFlags, MemberFlags};
use crate::symbol::Symbol;
use crate::ty::MethodKey;
use crate::value::MethodBody;

/// A method as seen from outside its declaring type.
#[derive(Clone)]
pub struct MethodInfo {
    pub owner: Symbol,
    pub key: MethodKey,
    pub flags: MemberFlags,
    /// Implementation, if the owner provides one.
    pub body: Option<MethodBody>,
}

impl MethodInfo {
    #[inline]
    pub fn is_private(&self) -> bool {
        self.flags.contains(MemberFlags::PRIVATE)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MemberFlags::ABSTRACT) || self.body.is_none()
    }

    /// Callable from a subtype: concrete, non-private, non-static.
    #[inline]
    pub fn is_public_impl(&self) -> bool {
        !self.is_abstract() && !self.is_private() && !self.is_static()
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("owner", &self.owner)
            .field("key", &self.key)
            .field("flags", &self.flags)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Structural info for one type.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: Symbol,
    pub flags: ClassFlags,
    pub superclass: Option<Symbol>,
    pub interfaces: Vec<Symbol>,
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// The implicit root of every hierarchy. It declares nothing.
    pub fn root() -> Self {
        ClassInfo {
            name: Symbol::object(),
            flags: ClassFlags::empty(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Info for a declaration, taken member for member.
    pub fn from_decl(decl: &TypeDecl) -> Self {
        let methods = decl
            .methods
            .iter()
            .map(|m| MethodInfo {
                owner: decl.name.clone(),
                key: m.key.clone(),
                flags: if m.is_abstract() {
                    m.flags | MemberFlags::ABSTRACT
                } else {
                    m.flags
                },
                body: m.body.clone(),
            })
            .collect();

        ClassInfo {
            name: decl.name.clone(),
            flags: decl.flags,
            superclass: decl.superclass.clone(),
            interfaces: decl.interfaces.clone(),
            methods,
        }
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    #[inline]
    pub fn is_trait(&self) -> bool {
        self.flags.contains(ClassFlags::TRAIT)
    }

    /// The concrete class this type builds on.
    #[inline]
    pub fn concrete_parent(&self) -> Option<&Symbol> {
        self.superclass.as_ref()
    }

    /// A method declared directly on this type.
    pub fn find_method(&self, key: &MethodKey) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| &m.key == key)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|m| m.key.is_constructor())
    }

    /// Superclass first, then interfaces, in declaration order.
    pub fn parents(&self) -> impl Iterator<Item = &Symbol> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}
