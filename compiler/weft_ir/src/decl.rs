//! Host-language type declarations.
//!
//! A `TypeDecl` is what a declaration source hands the composer for a type
//! name: members, modifiers, ancestry and method bodies. Language
//! extractors turn it into structural info and, for traits, into a
//! `Trait`.

use std::fmt;

use crate::flags::{ClassFlags, MemberFlags};
use crate::symbol::Symbol;
use crate::ty::{MethodKey, MethodSig, Ty};
use crate::value::{MethodBody, Receiver, RuntimeError, Value};

/// A field declared on a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Symbol,
    pub ty: Ty,
    pub flags: MemberFlags,
}

impl FieldDecl {
    pub fn private(name: impl Into<Symbol>, ty: Ty) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
            flags: MemberFlags::PRIVATE,
        }
    }

    pub fn public(name: impl Into<Symbol>, ty: Ty) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
            flags: MemberFlags::empty(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.flags.contains(MemberFlags::PRIVATE)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }
}

/// An annotation on a method, with its optional `value` element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub ty: Symbol,
    pub value: Option<Symbol>,
}

/// A method declared on a type.
#[derive(Clone)]
pub struct MethodDecl {
    pub key: MethodKey,
    pub flags: MemberFlags,
    pub body: Option<MethodBody>,
    /// Ancestor implementations this method forwards to (`super.name(..)`).
    pub super_calls: Vec<MethodKey>,
    pub annotations: Vec<Annotation>,
}

impl MethodDecl {
    /// A method without a body. Attach one with [`MethodDecl::body`].
    pub fn new(name: impl Into<Symbol>, sig: MethodSig) -> Self {
        MethodDecl {
            key: MethodKey::new(name, sig),
            flags: MemberFlags::empty(),
            body: None,
            super_calls: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// A constructor taking `params`.
    pub fn constructor(params: impl IntoIterator<Item = Ty>) -> Self {
        let key = MethodKey::constructor(params);
        MethodDecl::new(key.name, key.sig)
    }

    #[must_use]
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut dyn Receiver, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.body = Some(crate::value::body(f));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn private(self) -> Self {
        self.with_flags(MemberFlags::PRIVATE)
    }

    #[must_use]
    pub fn abstract_(self) -> Self {
        self.with_flags(MemberFlags::ABSTRACT)
    }

    #[must_use]
    pub fn static_(self) -> Self {
        self.with_flags(MemberFlags::STATIC)
    }

    /// Record that the body forwards to the preceding implementation of `key`.
    #[must_use]
    pub fn calls_super(mut self, key: MethodKey) -> Self {
        self.super_calls.push(key);
        self
    }

    #[must_use]
    pub fn annotated(mut self, ty: impl Into<Symbol>, value: Option<&str>) -> Self {
        self.annotations.push(Annotation {
            ty: ty.into(),
            value: value.map(Symbol::new),
        });
        self
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.flags.contains(MemberFlags::PRIVATE)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    /// Declared abstract, or declared without a body.
    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MemberFlags::ABSTRACT) || self.body.is_none()
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("key", &self.key)
            .field("flags", &self.flags)
            .field("has_body", &self.body.is_some())
            .field("super_calls", &self.super_calls)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// A type declaration.
#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: Symbol,
    pub flags: ClassFlags,
    pub superclass: Option<Symbol>,
    pub interfaces: Vec<Symbol>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

impl TypeDecl {
    /// A class extending `Object`.
    pub fn class(name: impl Into<Symbol>) -> Self {
        let name = name.into();
        let superclass = (!name.is_object()).then(Symbol::object);
        TypeDecl {
            name,
            flags: ClassFlags::empty(),
            superclass,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<Symbol>) -> Self {
        TypeDecl {
            flags: ClassFlags::INTERFACE | ClassFlags::ABSTRACT,
            superclass: None,
            ..TypeDecl::class(name)
        }
    }

    /// A trait-language trait. Its concrete parent defaults to `Object`.
    pub fn trait_decl(name: impl Into<Symbol>) -> Self {
        TypeDecl {
            flags: ClassFlags::TRAIT | ClassFlags::ABSTRACT,
            ..TypeDecl::class(name)
        }
    }

    #[must_use]
    pub fn extends(mut self, superclass: impl Into<Symbol>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: impl Into<Symbol>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    #[inline]
    pub fn is_trait(&self) -> bool {
        self.flags.contains(ClassFlags::TRAIT)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods.iter().filter(|m| m.key.is_constructor())
    }
}
