//! Trait factories: the compiled-type and factory caches for one base type.
//!
//! A [`TraitFactory`] composes a fixed base type with sets of registered
//! traits. Each distinct [`TraitSet`] is compiled into a composite type
//! once; the composite is then bound to the factory's constructor shape
//! and the bound [`Factory`] is cached as well.
//!
//! # Locking
//!
//! The compiled-type cache holds one slot per trait set. A compile takes
//! the map lock only long enough to fetch its slot, then holds the slot's
//! own lock while synthesizing, so concurrent requests for the same set
//! wait for a single compile while unrelated sets compile in parallel.
//! A failed compile removes its slot, so the next request retries.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use weft_ir::{ClassInfo, MethodKey, RuntimeError, Symbol, Ty, TypeDecl, Value};

use crate::ancestry;
use crate::composer::Composer;
use crate::error::ComposeError;
use crate::runtime::{Instance, TypeHandle};

/// Handle to a trait registered with a [`TraitFactory`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraitKey(Symbol);

impl TraitKey {
    pub fn name(&self) -> &Symbol {
        &self.0
    }
}

impl fmt::Debug for TraitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitKey({})", self.0)
    }
}

impl fmt::Display for TraitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A set of traits to compose.
///
/// Iteration follows insertion order, which is the composition order when
/// this set is the first to compile. Equality and hashing ignore order.
#[derive(Clone, Default)]
pub struct TraitSet {
    keys: Vec<TraitKey>,
    sorted: Vec<TraitKey>,
}

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`; returns `false` if it was already present.
    pub fn insert(&mut self, key: TraitKey) -> bool {
        match self.sorted.binary_search(&key) {
            Ok(_) => false,
            Err(at) => {
                self.sorted.insert(at, key.clone());
                self.keys.push(key);
                true
            }
        }
    }

    pub fn contains(&self, key: &TraitKey) -> bool {
        self.sorted.binary_search(key).is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraitKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<TraitKey> for TraitSet {
    fn from_iter<I: IntoIterator<Item = TraitKey>>(iter: I) -> Self {
        let mut set = TraitSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<TraitKey> for TraitSet {
    fn extend<I: IntoIterator<Item = TraitKey>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a> IntoIterator for &'a TraitSet {
    type Item = &'a TraitKey;
    type IntoIter = std::slice::Iter<'a, TraitKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl PartialEq for TraitSet {
    fn eq(&self, other: &Self) -> bool {
        self.sorted == other.sorted
    }
}

impl Eq for TraitSet {}

impl Hash for TraitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted.hash(state);
    }
}

impl fmt::Debug for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.iter().map(TraitKey::name)).finish()
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("}")
    }
}

/// The constructor signature a [`Factory`] exposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactoryShape {
    name: Symbol,
    params: Vec<Ty>,
}

impl FactoryShape {
    pub fn new(name: impl Into<Symbol>, params: impl IntoIterator<Item = Ty>) -> Result<Self, ComposeError> {
        let name = name.into();
        let params: Vec<Ty> = params.into_iter().collect();
        if name.as_str().is_empty() {
            return Err(ComposeError::InvalidFactoryShape {
                shape: format!("{}", Shown(&name, &params)),
                reason: "factory method has no name".into(),
            });
        }
        if let Some(i) = params.iter().position(|p| *p == Ty::Void) {
            return Err(ComposeError::InvalidFactoryShape {
                shape: format!("{}", Shown(&name, &params)),
                reason: format!("parameter {i} is void"),
            });
        }
        Ok(FactoryShape { name, params })
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn params(&self) -> &[Ty] {
        &self.params
    }
}

impl fmt::Display for FactoryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Shown(&self.name, &self.params), f)
    }
}

struct Shown<'a>(&'a Symbol, &'a [Ty]);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0)?;
        for (i, p) in self.1.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

/// A composite type bound to one of its constructors.
pub struct Factory {
    ty: TypeHandle,
    ctor: MethodKey,
    shape: FactoryShape,
}

impl Factory {
    /// Create an instance, running the base constructor and then every
    /// trait initializer.
    pub fn construct(&self, args: &[Value]) -> Result<Instance, RuntimeError> {
        Instance::new(&self.ty, &self.ctor, args)
    }

    pub fn composite(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn shape(&self) -> &FactoryShape {
        &self.shape
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("composite", self.ty.name())
            .field("shape", &self.shape.to_string())
            .finish()
    }
}

type CompileSlot = Arc<Mutex<Option<TypeHandle>>>;

/// Composes one base type with sets of traits.
pub struct TraitFactory {
    composer: Arc<Composer>,
    base: Symbol,
    base_info: Arc<ClassInfo>,
    shape: FactoryShape,
    suffix: String,
    counter: AtomicUsize,

    registered: Mutex<FxHashMap<Symbol, TraitKey>>,
    compiled: Mutex<FxHashMap<TraitSet, CompileSlot>>,
    factories: RwLock<FxHashMap<TraitSet, Arc<Factory>>>,
    reverse: RwLock<FxHashMap<Symbol, TraitSet>>,
}

impl TraitFactory {
    /// A factory composing `base`, exposing constructors shaped `shape`,
    /// and naming composites `<base>_<suffix>$$<n>`.
    pub fn new(
        composer: Arc<Composer>,
        base: impl Into<Symbol>,
        shape: FactoryShape,
        suffix: impl Into<String>,
    ) -> Result<Self, ComposeError> {
        let base = base.into();
        let base_info = composer
            .class_info(&base)?
            .ok_or_else(|| ComposeError::unknown(&base))?;

        Ok(TraitFactory {
            composer,
            base,
            base_info,
            shape,
            suffix: suffix.into(),
            counter: AtomicUsize::new(0),
            registered: Mutex::new(FxHashMap::default()),
            compiled: Mutex::new(FxHashMap::default()),
            factories: RwLock::new(FxHashMap::default()),
            reverse: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn composer(&self) -> &Arc<Composer> {
        &self.composer
    }

    pub fn base(&self) -> &Symbol {
        &self.base
    }

    pub fn shape(&self) -> &FactoryShape {
        &self.shape
    }

    /// Register the trait declared as `name` in the composer's source.
    pub fn register_trait(&self, name: impl Into<Symbol>) -> Result<TraitKey, ComposeError> {
        let name = name.into();
        if let Some(key) = self.registered.lock().get(&name) {
            return Ok(key.clone());
        }
        let decl = self
            .composer
            .declaration(&name)
            .ok_or_else(|| ComposeError::unknown(&name))?;
        self.register_decl(&decl)
    }

    /// Register the trait `decl` declares. Its parent must be the base type
    /// or one of the base type's superclasses.
    #[tracing::instrument(level = "debug", skip_all, fields(base = %self.base, name = %decl.name))]
    pub fn register_decl(&self, decl: &TypeDecl) -> Result<TraitKey, ComposeError> {
        if let Some(key) = self.registered.lock().get(&decl.name) {
            return Ok(key.clone());
        }

        let info = self.composer.class_info_for(decl)?;
        let parent = info.concrete_parent().cloned().unwrap_or_else(Symbol::object);
        self.check_parent(&decl.name, &parent)?;

        let t = self.composer.register_trait(decl)?;
        self.check_parent(&t.name, &t.parent)?;
        let mut registered = self.registered.lock();
        Ok(registered
            .entry(t.name.clone())
            .or_insert_with(|| TraitKey(t.name.clone()))
            .clone())
    }

    fn check_parent(&self, trait_name: &Symbol, parent: &Symbol) -> Result<(), ComposeError> {
        if ancestry::extends(&*self.composer, &self.base_info, parent)? {
            return Ok(());
        }
        Err(ComposeError::ParentMismatch {
            trait_name: trait_name.to_string(),
            parent: parent.to_string(),
            base: self.base.to_string(),
        })
    }

    /// The factory for the composite of the base type and `traits`.
    #[tracing::instrument(level = "debug", skip_all, fields(base = %self.base, traits = %traits))]
    pub fn construct(&self, traits: &TraitSet) -> Result<Arc<Factory>, ComposeError> {
        if let Some(factory) = self.factories.read().get(traits) {
            return Ok(Arc::clone(factory));
        }

        let ty = self.compile(traits)?;
        let factory = Arc::new(self.bind(ty)?);
        let mut factories = self.factories.write();
        Ok(Arc::clone(factories.entry(traits.clone()).or_insert(factory)))
    }

    fn compile(&self, traits: &TraitSet) -> Result<TypeHandle, ComposeError> {
        {
            let registered = self.registered.lock();
            if let Some(key) = traits.iter().find(|k| !registered.contains_key(k.name())) {
                return Err(ComposeError::UnregisteredTrait {
                    name: key.name().to_string(),
                });
            }
        }

        loop {
            let slot = Arc::clone(self.compiled.lock().entry(traits.clone()).or_default());
            let mut compiled = slot.lock();
            if let Some(ty) = &*compiled {
                return Ok(Arc::clone(ty));
            }
            // A failed compile drops its slot; waiters on it start over.
            let current = self.compiled.lock().get(traits).is_some_and(|s| Arc::ptr_eq(s, &slot));
            if !current {
                continue;
            }

            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let name = Symbol::from(format!("{}_{}$${n}", self.base.simple_name(), self.suffix));
            let order: Vec<Symbol> = traits.iter().map(|k| k.name().clone()).collect();
            let ty = match self.composer.compile_composite(&name, &self.base, &order) {
                Ok(ty) => ty,
                Err(err) => {
                    self.compiled.lock().remove(traits);
                    return Err(err);
                }
            };

            self.reverse.write().insert(name, traits.clone());
            *compiled = Some(Arc::clone(&ty));
            return Ok(ty);
        }
    }

    fn bind(&self, ty: TypeHandle) -> Result<Factory, ComposeError> {
        let ctor = ty
            .constructors()
            .find(|key| key.sig.params.as_slice() == self.shape.params())
            .cloned()
            .ok_or_else(|| ComposeError::FactoryShapeMismatch {
                composite: ty.name().to_string(),
                shape: self.shape.to_string(),
            })?;
        Ok(Factory {
            ty,
            ctor,
            shape: self.shape.clone(),
        })
    }

    /// The composite already compiled for `traits`, if any.
    pub fn compiled_type(&self, traits: &TraitSet) -> Option<TypeHandle> {
        let slot = self.compiled.lock().get(traits).cloned()?;
        let compiled = slot.lock().clone();
        compiled
    }

    /// The traits the composite named `name` was compiled from.
    pub fn traits_for_type(&self, name: &Symbol) -> Option<TraitSet> {
        self.reverse.read().get(name).cloned()
    }
}

impl fmt::Debug for TraitFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitFactory")
            .field("base", &self.base)
            .field("shape", &self.shape.to_string())
            .field("suffix", &self.suffix)
            .field("registered", &self.registered.lock().len())
            .field("compiled", &self.reverse.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
