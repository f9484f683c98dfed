//! Trait member model.
//!
//! A `Trait` is the unit of composition: a name, the concrete parent it
//! assumes, the traits it depends on, and the fields, methods and super
//! references it contributes. Traits are built once by a language
//! extractor and shared by `Arc` afterwards.
//!
//! # Naming conventions
//!
//! A composite type exposes trait members under these names:
//!
//! | member | name |
//! |---|---|
//! | private field storage / getter | `Owner$$field` |
//! | non-private field storage / getter | `field` |
//! | field setter | `<getter>_$eq` |
//! | static implementation entry | `method$` on the trait |
//! | super bridge | `Owner$$super$method` |
//!
//! `Owner` is the trait name with path separators flattened to `$`.

use std::fmt;
use std::sync::Arc;

use crate::symbol::{Symbol, INITIALIZER};
use crate::ty::{MethodKey, MethodSig, Ty};
use crate::value::MethodBody;

/// Field visibility as seen by the composite type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Private,
    Public,
}

/// A field a trait adds to every composite it is part of.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldContribution {
    pub name: Symbol,
    pub ty: Ty,
    pub visibility: Visibility,
}

impl FieldContribution {
    pub fn private(name: impl Into<Symbol>, ty: Ty) -> Self {
        FieldContribution {
            name: name.into(),
            ty,
            visibility: Visibility::Private,
        }
    }

    pub fn public(name: impl Into<Symbol>, ty: Ty) -> Self {
        FieldContribution {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
        }
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Storage slot and getter name on the composite type.
    ///
    /// Private fields are namespaced by `owner` so two traits may both
    /// declare a private `value`.
    pub fn storage_name(&self, owner: &Symbol) -> Symbol {
        if self.is_private() {
            Symbol::from(format!("{}$${}", owner.flattened(), self.name))
        } else {
            self.name.clone()
        }
    }

    pub fn setter_name(&self, owner: &Symbol) -> Symbol {
        Symbol::from(format!("{}_$eq", self.storage_name(owner)))
    }

    /// `storage() -> ty`
    pub fn getter_key(&self, owner: &Symbol) -> MethodKey {
        MethodKey::new(self.storage_name(owner), MethodSig::nullary(self.ty.clone()))
    }

    /// `storage_$eq(ty) -> void`
    pub fn setter_key(&self, owner: &Symbol) -> MethodKey {
        MethodKey::new(
            self.setter_name(owner),
            MethodSig::new([self.ty.clone()], Ty::Void),
        )
    }
}

/// A method a trait implements.
#[derive(Clone)]
pub struct TraitMethod {
    pub key: MethodKey,
    pub body: MethodBody,
}

impl fmt::Debug for TraitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitMethod")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// A composable trait.
pub struct Trait {
    /// Unique name; the key in every registry.
    pub name: Symbol,
    /// Concrete type this trait assumes as its base.
    pub parent: Symbol,
    /// Traits this one depends on, in declaration order.
    pub parent_traits: Vec<Arc<Trait>>,
    pub fields: Vec<FieldContribution>,
    pub methods: Vec<TraitMethod>,
    /// Signatures this trait forwards to whatever implementation precedes it.
    pub supers: Vec<MethodKey>,
    /// Field initializer run by every composite constructor.
    pub initializer: Option<MethodBody>,
}

impl Trait {
    pub fn new(name: impl Into<Symbol>, parent: impl Into<Symbol>) -> Self {
        Trait {
            name: name.into(),
            parent: parent.into(),
            parent_traits: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            supers: Vec::new(),
            initializer: None,
        }
    }

    #[must_use]
    pub fn with_parent_trait(mut self, parent: Arc<Trait>) -> Self {
        self.parent_traits.push(parent);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldContribution) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_method(mut self, key: MethodKey, body: MethodBody) -> Self {
        self.methods.push(TraitMethod { key, body });
        self
    }

    #[must_use]
    pub fn with_super(mut self, key: MethodKey) -> Self {
        if !self.supers.contains(&key) {
            self.supers.push(key);
        }
        self
    }

    #[must_use]
    pub fn with_initializer(mut self, body: MethodBody) -> Self {
        self.initializer = Some(body);
        self
    }

    /// Whether this trait implements `key` itself.
    pub fn provides(&self, key: &MethodKey) -> bool {
        self.methods.iter().any(|m| &m.key == key)
    }

    /// Name of the static entry point implementing `key` on this trait.
    pub fn static_entry_name(key: &MethodKey) -> Symbol {
        Symbol::from(format!("{}$", key.name))
    }

    /// Static entry point of the field initializer.
    pub fn initializer_name() -> Symbol {
        Symbol::new(INITIALIZER)
    }

    /// The bridge a trait named `owner` calls to reach the implementation
    /// of `key` that precedes it.
    pub fn super_bridge(owner: &Symbol, key: &MethodKey) -> MethodKey {
        MethodKey::new(
            format!("{}$$super${}", owner.flattened(), key.name),
            key.sig.clone(),
        )
    }

    /// [`Trait::super_bridge`] for this trait.
    pub fn super_bridge_key(&self, key: &MethodKey) -> MethodKey {
        Trait::super_bridge(&self.name, key)
    }
}

impl fmt::Debug for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parents: Vec<&Symbol> = self.parent_traits.iter().map(|t| &t.name).collect();
        f.debug_struct("Trait")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("parent_traits", &parents)
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("supers", &self.supers)
            .field("has_initializer", &self.initializer.is_some())
            .finish()
    }
}
