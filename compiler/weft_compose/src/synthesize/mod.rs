//! Composite synthesis.
//!
//! Given a base type and the traits selected for it, produce the
//! [`CompositeDef`] of a type that extends the base and carries every trait
//! in the linearized order.
//!
//! # Design
//!
//! Emission runs in a fixed sequence:
//!
//! 1. one constructor per usable base constructor, running the base
//!    constructor then each trait initializer in composition order;
//! 2. for each trait in composition order, its storage slots with getter and
//!    setter, then its super bridges;
//! 3. trait methods, claimed by the *last* trait in composition order that
//!    provides each key;
//! 4. covariant bridges from ancestor signatures to the claimed methods;
//! 5. inherited base implementations for every key still unclaimed.
//!
//! A super bridge of trait `T` targets the nearest trait *before* `T` that
//! provides the method, and otherwise the nearest concrete implementation on
//! the base type's ancestry. It never targets `T` or anything after it.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use weft_ir::{ClassInfo, MemberFlags, MethodKey, Symbol, Trait};

use crate::ancestry::{self, StructuralInfoProvider};
use crate::def::{CompositeDef, CtorDef, EntryPoint, MethodDef, SlotDef, Target};
use crate::error::ComposeError;
use crate::linearize::linearize_all;


/// Synthesize the composite `name` extending `base` with `traits`.
///
/// `traits` are the directly selected traits, in request order; their
/// parent traits are pulled in by linearization.
#[tracing::instrument(level = "debug", skip_all, fields(composite = %name, base = %base))]
pub fn synthesize<P>(
    provider: &P,
    name: &Symbol,
    base: &Symbol,
    traits: &[Arc<Trait>],
) -> Result<CompositeDef, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    let base_info = provider.require(base)?;
    let order = linearize_all(traits)?;
    tracing::trace!(order = ?order.iter().map(|t| t.name.as_str()).collect::<Vec<_>>());

    let mut emitter = Emitter::new(provider, name, &base_info, traits, &order)?;
    emitter.constructors()?;
    for (i, t) in order.iter().enumerate() {
        emitter.fields(t)?;
        emitter.super_bridges(t, &order[..i])?;
    }
    let claimed = emitter.trait_methods()?;
    emitter.covariant_bridges(&claimed)?;
    emitter.inherited()?;
    Ok(emitter.def)
}

struct Emitter<'a, P: ?Sized> {
    provider: &'a P,
    base: &'a Arc<ClassInfo>,
    order: &'a [Arc<Trait>],
    def: CompositeDef,
    /// Every key in the method table so far.
    members: FxHashSet<MethodKey>,
}

impl<'a, P> Emitter<'a, P>
where
    P: StructuralInfoProvider + ?Sized,
{
    fn new(
        provider: &'a P,
        name: &Symbol,
        base: &'a Arc<ClassInfo>,
        traits: &[Arc<Trait>],
        order: &'a [Arc<Trait>],
    ) -> Result<Self, ComposeError> {
        let mut supertypes: Vec<Symbol> = ancestry::all_parents(provider, base)?
            .iter()
            .map(|info| info.name.clone())
            .collect();
        for t in order {
            if !supertypes.contains(&t.name) {
                supertypes.push(t.name.clone());
            }
        }

        let def = CompositeDef {
            name: name.clone(),
            base: base.name.clone(),
            interfaces: traits.iter().map(|t| t.name.clone()).collect(),
            composed: order.iter().map(|t| t.name.clone()).collect(),
            supertypes,
            slots: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        };

        Ok(Emitter {
            provider,
            base,
            order,
            def,
            members: FxHashSet::default(),
        })
    }

    fn push(&mut self, method: MethodDef) -> Result<(), ComposeError> {
        if !self.members.insert(method.key.clone()) {
            return Err(ComposeError::DuplicateMember {
                composite: self.def.name.to_string(),
                member: method.key.to_string(),
            });
        }
        self.def.methods.push(method);
        Ok(())
    }

    fn constructors(&mut self) -> Result<(), ComposeError> {
        let initializers: Vec<EntryPoint> = self
            .order
            .iter()
            .filter(|t| t.initializer.is_some())
            .map(|t| EntryPoint::initializer(&t.name))
            .collect();

        for ctor in self.base.constructors().filter(|c| !c.is_private()) {
            self.def.constructors.push(CtorDef {
                key: ctor.key.clone(),
                base: ctor
                    .body
                    .is_some()
                    .then(|| EntryPoint::new(&ctor.owner, ctor.key.clone())),
                initializers: initializers.clone(),
                frame: Default::default(),
            });
        }

        if self.def.constructors.is_empty() {
            return Err(ComposeError::NoBaseConstructor {
                base: self.base.name.to_string(),
            });
        }
        Ok(())
    }

    fn fields(&mut self, t: &Trait) -> Result<(), ComposeError> {
        for field in &t.fields {
            let storage = field.storage_name(&t.name);
            if self.def.slots.iter().any(|s| s.name == storage) {
                return Err(ComposeError::DuplicateMember {
                    composite: self.def.name.to_string(),
                    member: storage.to_string(),
                });
            }
            let slot = u32::try_from(self.def.slots.len()).map_err(|_| ComposeError::Assembly {
                name: self.def.name.to_string(),
                reason: "too many storage slots".to_owned(),
            })?;
            self.def.slots.push(SlotDef {
                name: storage,
                ty: field.ty.clone(),
                owner: t.name.clone(),
                private: field.is_private(),
            });

            self.push(MethodDef::new(field.getter_key(&t.name), Target::GetField(slot)))?;
            self.push(MethodDef::new(field.setter_key(&t.name), Target::SetField(slot)))?;
        }
        Ok(())
    }

    fn super_bridges(&mut self, t: &Trait, preceding: &[Arc<Trait>]) -> Result<(), ComposeError> {
        for key in &t.supers {
            let target = match preceding.iter().rev().find(|p| p.provides(key)) {
                Some(p) => Target::Static(static_entry(&p.name, key)),
                None => match ancestry::find_public_impl(self.provider, self.base, key)? {
                    Some(m) => Target::Special(EntryPoint::new(m.owner, m.key)),
                    None => {
                        return Err(ComposeError::MissingSuperTarget {
                            composite: self.def.name.to_string(),
                            trait_name: t.name.to_string(),
                            method: key.to_string(),
                        })
                    }
                },
            };
            self.push(MethodDef::new(t.super_bridge_key(key), target))?;
        }
        Ok(())
    }

    /// Emit trait methods, last provider wins. Returns the claimed keys in
    /// emission order.
    fn trait_methods(&mut self) -> Result<Vec<MethodKey>, ComposeError> {
        let mut claimed = Vec::new();
        let mut seen = FxHashSet::default();
        let order = self.order;
        for t in order.iter().rev() {
            for m in &t.methods {
                if !seen.insert(m.key.clone()) {
                    continue;
                }
                let entry = static_entry(&t.name, &m.key);
                self.push(MethodDef::new(m.key.clone(), Target::Static(entry)))?;
                claimed.push(m.key.clone());
            }
        }
        Ok(claimed)
    }

    /// Ancestor signatures that differ from a claimed method only by a wider
    /// return type get a bridge forwarding to the claimed method.
    fn covariant_bridges(&mut self, claimed: &[MethodKey]) -> Result<(), ComposeError> {
        let mut ancestors = ancestry::all_parents(self.provider, self.base)?;
        for t in self.order {
            // Traits built in memory need not resolve.
            if let Some(info) = self.provider.resolve(&t.name)? {
                for ancestor in ancestry::all_parents(self.provider, &info)? {
                    if !ancestors.iter().any(|a| a.name == ancestor.name) {
                        ancestors.push(ancestor);
                    }
                }
            }
        }

        for key in claimed {
            for ancestor in &ancestors {
                for m in &ancestor.methods {
                    if m.key == *key
                        || !m.key.same_params(key)
                        || m.is_static()
                        || m.is_private()
                        || self.members.contains(&m.key)
                    {
                        continue;
                    }
                    if !ancestry::is_assignable(self.provider, &key.sig.ret, &m.key.sig.ret)? {
                        tracing::warn!(
                            composite = %self.def.name,
                            method = %key,
                            ancestor = %m.key,
                            "return type is not assignable; no bridge emitted"
                        );
                        continue;
                    }
                    tracing::trace!(bridge = %m.key, target = %key, "covariant bridge");
                    self.push(
                        MethodDef::new(m.key.clone(), Target::Virtual(key.clone()))
                            .with_flags(MemberFlags::BRIDGE | MemberFlags::SYNTHETIC),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn inherited(&mut self) -> Result<(), ComposeError> {
        for m in ancestry::all_methods(self.provider, self.base)? {
            if m.key.is_constructor() || !m.is_public_impl() || self.members.contains(&m.key) {
                continue;
            }
            let key = m.key.clone();
            self.push(MethodDef::new(key, Target::Special(EntryPoint::new(m.owner, m.key))))?;
        }
        Ok(())
    }
}

/// The static implementation entry for `key` on the trait `owner`.
pub fn static_entry(owner: &Symbol, key: &MethodKey) -> EntryPoint {
    EntryPoint::new(owner, MethodKey::new(Trait::static_entry_name(key), key.sig.clone()))
}
