//! Linked composite types and their instances.
//!
//! Linking resolves every symbolic target in a [`CompositeDef`] once, so
//! dispatch on an [`Instance`] is a map lookup followed by a direct call.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use weft_ir::{MemberFlags, MethodBody, MethodKey, MethodSig, Receiver, RuntimeError, Symbol, Value};

use crate::def::{CompositeDef, EntryPoint, Target};
use crate::error::ComposeError;

/// Shared handle to a defined composite type.
pub type TypeHandle = Arc<CompositeType>;

enum Dispatch {
    Body(MethodBody),
    Get(usize),
    Set(usize),
    Virtual(MethodKey),
}

struct LinkedMethod {
    sig: MethodSig,
    flags: MemberFlags,
    dispatch: Dispatch,
}

struct LinkedCtor {
    key: MethodKey,
    base: Option<MethodBody>,
    initializers: Vec<MethodBody>,
}

/// A composite type, linked and ready to instantiate.
pub struct CompositeType {
    def: CompositeDef,
    methods: FxHashMap<MethodKey, LinkedMethod>,
    /// Declared (non-bridge) keys by name, in table order.
    by_name: FxHashMap<Symbol, SmallVec<[MethodKey; 2]>>,
    ctors: Vec<LinkedCtor>,
}

impl CompositeType {
    /// Resolve every target of `def` through `lookup`.
    pub(crate) fn link<F>(def: CompositeDef, lookup: F) -> Result<Self, ComposeError>
    where
        F: Fn(&EntryPoint) -> Option<MethodBody>,
    {
        let resolve = |entry: &EntryPoint| {
            lookup(entry).ok_or_else(|| ComposeError::UnresolvedEntry {
                composite: def.name.to_string(),
                entry: entry.to_string(),
            })
        };
        let slot = |n: u32| {
            usize::try_from(n)
                .ok()
                .filter(|&n| n < def.slots.len())
                .ok_or_else(|| ComposeError::UnresolvedEntry {
                    composite: def.name.to_string(),
                    entry: format!("slot #{n}"),
                })
        };

        let mut methods = FxHashMap::default();
        let mut by_name: FxHashMap<Symbol, SmallVec<[MethodKey; 2]>> = FxHashMap::default();
        for m in &def.methods {
            let dispatch = match &m.target {
                Target::Static(entry) | Target::Special(entry) => Dispatch::Body(resolve(entry)?),
                Target::GetField(n) => Dispatch::Get(slot(*n)?),
                Target::SetField(n) => Dispatch::Set(slot(*n)?),
                Target::Virtual(key) => {
                    if def.method(key).is_none() {
                        return Err(ComposeError::UnresolvedEntry {
                            composite: def.name.to_string(),
                            entry: key.to_string(),
                        });
                    }
                    Dispatch::Virtual(key.clone())
                }
            };
            if !m.is_bridge() {
                by_name.entry(m.key.name.clone()).or_default().push(m.key.clone());
            }
            methods.insert(
                m.key.clone(),
                LinkedMethod {
                    sig: m.key.sig.clone(),
                    flags: m.flags,
                    dispatch,
                },
            );
        }

        let ctors = def
            .constructors
            .iter()
            .map(|c| -> Result<LinkedCtor, ComposeError> {
                Ok(LinkedCtor {
                    key: c.key.clone(),
                    base: c.base.as_ref().map(resolve).transpose()?,
                    initializers: c
                        .initializers
                        .iter()
                        .map(resolve)
                        .collect::<Result<Vec<_>, ComposeError>>()?,
                })
            })
            .collect::<Result<Vec<_>, ComposeError>>()?;

        Ok(CompositeType {
            def,
            methods,
            by_name,
            ctors,
        })
    }

    pub fn name(&self) -> &Symbol {
        &self.def.name
    }

    pub fn base(&self) -> &Symbol {
        &self.def.base
    }

    /// The definition this type was linked from.
    pub fn def(&self) -> &CompositeDef {
        &self.def
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodKey> {
        self.ctors.iter().map(|c| &c.key)
    }

    pub fn has_method(&self, key: &MethodKey) -> bool {
        self.methods.contains_key(key)
    }

    pub fn method_flags(&self, key: &MethodKey) -> Option<MemberFlags> {
        self.methods.get(key).map(|m| m.flags)
    }

    /// Whether instances are also instances of `name`.
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.def.name == name || self.def.supertypes.iter().any(|s| s == name)
    }

    /// Allocate an instance and run the constructor `ctor`.
    pub fn instantiate(self: &Arc<Self>, ctor: &MethodKey, args: &[Value]) -> Result<Instance, RuntimeError> {
        Instance::new(self, ctor, args)
    }
}

impl fmt::Debug for CompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeType")
            .field("name", &self.def.name)
            .field("base", &self.def.base)
            .field("composed", &self.def.composed)
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

fn check_args(key: &MethodKey, params: &[weft_ir::Ty], args: &[Value]) -> Result<(), RuntimeError> {
    if params.len() != args.len() {
        return Err(RuntimeError::ArityMismatch {
            method: key.to_string(),
            expected: params.len(),
            found: args.len(),
        });
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if !arg.conforms_to(param) {
            return Err(RuntimeError::ArgumentType {
                method: key.to_string(),
                index,
                expected: param.to_string(),
                found: arg.type_name().to_owned(),
            });
        }
    }
    Ok(())
}

/// An object of a composite type.
pub struct Instance {
    ty: TypeHandle,
    slots: Vec<Value>,
}

impl Instance {
    pub fn new(ty: &TypeHandle, ctor: &MethodKey, args: &[Value]) -> Result<Self, RuntimeError> {
        let linked = ty
            .ctors
            .iter()
            .find(|c| &c.key == ctor)
            .ok_or_else(|| RuntimeError::NoSuchMethod {
                type_name: ty.name().to_string(),
                method: ctor.to_string(),
            })?;
        check_args(ctor, &ctor.sig.params, args)?;

        let mut instance = Instance {
            ty: Arc::clone(ty),
            slots: ty.def.slots.iter().map(|s| Value::default_for(&s.ty)).collect(),
        };
        if let Some(base) = &linked.base {
            base(&mut instance as &mut dyn Receiver, args)?;
        }
        for init in &linked.initializers {
            init(&mut instance as &mut dyn Receiver, &[])?;
        }
        Ok(instance)
    }

    pub fn composite(&self) -> &TypeHandle {
        &self.ty
    }

    /// Current value of the storage slot `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let (slot, _) = self.ty.def.slot(name)?;
        self.slots.get(usize::try_from(slot).ok()?)
    }

    pub fn is_instance_of(&self, name: &str) -> bool {
        self.ty.is_subtype_of(name)
    }
}

impl Receiver for Instance {
    fn type_name(&self) -> &Symbol {
        self.ty.name()
    }

    fn invoke(&mut self, key: &MethodKey, args: &[Value]) -> Result<Value, RuntimeError> {
        let ty = Arc::clone(&self.ty);
        let method = ty.methods.get(key).ok_or_else(|| RuntimeError::NoSuchMethod {
            type_name: ty.name().to_string(),
            method: key.to_string(),
        })?;
        check_args(key, &method.sig.params, args)?;

        match &method.dispatch {
            Dispatch::Body(body) => body(self as &mut dyn Receiver, args),
            Dispatch::Get(slot) => Ok(self.slots.get(*slot).cloned().unwrap_or(Value::Null)),
            Dispatch::Set(slot) => {
                if let (Some(dst), [value]) = (self.slots.get_mut(*slot), args) {
                    *dst = value.clone();
                }
                Ok(Value::Void)
            }
            Dispatch::Virtual(target) => self.invoke(target, args),
        }
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let key = self
            .ty
            .by_name
            .get(name)
            .and_then(|keys| keys.iter().find(|k| k.sig.arity() == args.len()))
            .cloned()
            .ok_or_else(|| RuntimeError::NoSuchMethod {
                type_name: self.ty.name().to_string(),
                method: format!("{name}/{}", args.len()),
            })?;
        self.invoke(&key, args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<(&str, &Value)> = self
            .ty
            .def
            .slots
            .iter()
            .map(|s| s.name.as_str())
            .zip(&self.slots)
            .collect();
        f.debug_struct("Instance")
            .field("type", self.ty.name())
            .field("slots", &slots)
            .finish()
    }
}
