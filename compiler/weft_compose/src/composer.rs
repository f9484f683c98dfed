//! The composer: trait registry, structural-info cache and composite
//! compilation.
//!
//! # Design
//!
//! - Structural info is cached in a `DashMap`; the first info inserted for a
//!   name is the one every caller sees
//! - Traits live in a read-mostly map; a hit never takes the registration
//!   lock
//! - Registration misses are serialized by a reentrant lock, so an
//!   extractor may register parent traits from inside `build_trait` on the
//!   same thread. The in-progress chain under that lock detects cycles
//! - Method bodies of every obtained type and registered trait are
//!   published to the loader, which is what composites link against

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use rustc_hash::{FxBuildHasher, FxHashMap};
use weft_ir::{ClassInfo, Symbol, Trait, TypeDecl};

use crate::ancestry::StructuralInfoProvider;
use crate::assemble::{BinaryAssembler, BincodeAssembler};
use crate::config::ComposerConfig;
use crate::debug::{Debugger, DumpDebugger, NullDebugger};
use crate::def::EntryPoint;
use crate::error::ComposeError;
use crate::extract::{
    AnnotationFilter, ExtractCx, ExtractorSet, KeepAll, LanguageExtractor, TraitLangExtractor,
};
use crate::loader::{InMemoryLoader, RuntimeLoader};
use crate::runtime::TypeHandle;
use crate::synthesize::{static_entry, synthesize};
use crate::trace::log_at;

/// Where type declarations come from.
pub trait DeclSource: Send + Sync {
    fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>>;
}

/// Declarations held in memory.
#[derive(Default)]
pub struct DeclTable {
    decls: RwLock<FxHashMap<Symbol, Arc<TypeDecl>>>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `decl`, replacing any declaration with the same name.
    pub fn insert(&self, decl: TypeDecl) -> Arc<TypeDecl> {
        let decl = Arc::new(decl);
        self.decls.write().insert(decl.name.clone(), Arc::clone(&decl));
        decl
    }

    #[must_use]
    pub fn with(self, decl: TypeDecl) -> Self {
        self.insert(decl);
        self
    }

    pub fn len(&self) -> usize {
        self.decls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.read().is_empty()
    }
}

impl DeclSource for DeclTable {
    fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>> {
        self.decls.read().get(name).cloned()
    }
}

impl<I> From<I> for DeclTable
where
    I: IntoIterator<Item = TypeDecl>,
{
    fn from(decls: I) -> Self {
        let table = DeclTable::new();
        for decl in decls {
            table.insert(decl);
        }
        table
    }
}

/// Builder for [`Composer`].
pub struct ComposerBuilder {
    source: Arc<dyn DeclSource>,
    extractors: Vec<Arc<dyn LanguageExtractor>>,
    assembler: Option<Arc<dyn BinaryAssembler>>,
    loader: Option<Arc<dyn RuntimeLoader>>,
    debugger: Option<Arc<dyn Debugger>>,
    filter: Arc<dyn AnnotationFilter>,
    config: ComposerConfig,
}

impl ComposerBuilder {
    /// Add a language extractor. The trait-language extractor is present
    /// unless [`without_default_extractors`](Self::without_default_extractors)
    /// is called.
    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn LanguageExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    #[must_use]
    pub fn without_default_extractors(mut self) -> Self {
        self.extractors.clear();
        self
    }

    #[must_use]
    pub fn assembler(mut self, assembler: Arc<dyn BinaryAssembler>) -> Self {
        self.assembler = Some(assembler);
        self
    }

    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn RuntimeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub fn debugger(mut self, debugger: Arc<dyn Debugger>) -> Self {
        self.debugger = Some(debugger);
        self
    }

    #[must_use]
    pub fn annotation_filter(mut self, filter: Arc<dyn AnnotationFilter>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ComposerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Composer, ComposeError> {
        let extractors = ExtractorSet::new(self.extractors)?;
        let assembler = self
            .assembler
            .unwrap_or_else(|| Arc::new(BincodeAssembler::new()));
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(InMemoryLoader::new(Arc::clone(&assembler))));
        let debugger = match (self.debugger, &self.config.dump) {
            (Some(debugger), _) => debugger,
            (None, Some(dump)) => Arc::new(DumpDebugger::with_assembler(dump, Arc::clone(&assembler))),
            (None, None) => Arc::new(NullDebugger),
        };

        Ok(Composer {
            source: self.source,
            extractors,
            assembler,
            loader,
            debugger,
            filter: self.filter,
            config: self.config,
            infos: DashMap::with_hasher(FxBuildHasher),
            traits: RwLock::new(FxHashMap::default()),
            registering: ReentrantMutex::new(RefCell::new(Vec::new())),
        })
    }
}

/// Owns every registry and cache shared by the trait factories built on
/// it. Share it by `Arc`.
pub struct Composer {
    source: Arc<dyn DeclSource>,
    extractors: ExtractorSet,
    assembler: Arc<dyn BinaryAssembler>,
    loader: Arc<dyn RuntimeLoader>,
    debugger: Arc<dyn Debugger>,
    filter: Arc<dyn AnnotationFilter>,
    config: ComposerConfig,

    infos: DashMap<Symbol, Arc<ClassInfo>, FxBuildHasher>,
    traits: RwLock<FxHashMap<Symbol, Arc<Trait>>>,
    /// Traits whose registration is in progress on the lock-holding thread.
    registering: ReentrantMutex<RefCell<Vec<Symbol>>>,
}

impl Composer {
    pub fn builder(source: Arc<dyn DeclSource>) -> ComposerBuilder {
        ComposerBuilder {
            source,
            extractors: vec![Arc::new(TraitLangExtractor)],
            assembler: None,
            loader: None,
            debugger: None,
            filter: Arc::new(KeepAll),
            config: ComposerConfig::default(),
        }
    }

    /// A composer with the default extractors, loader and assembler.
    pub fn new(source: Arc<dyn DeclSource>) -> Result<Self, ComposeError> {
        Self::builder(source).build()
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn loader(&self) -> &Arc<dyn RuntimeLoader> {
        &self.loader
    }

    pub fn extractor(&self, name: &str) -> Option<&Arc<dyn LanguageExtractor>> {
        self.extractors.get(name)
    }

    pub fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>> {
        self.source.declaration(name)
    }

    /// Structural info for `name`. `None` when no declaration exists.
    pub fn class_info(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError> {
        if let Some(info) = self.infos.get(name) {
            return Ok(Some(Arc::clone(info.value())));
        }
        if name.is_object() {
            return Ok(Some(self.cache_info(ClassInfo::root())));
        }
        match self.source.declaration(name) {
            Some(decl) => self.class_info_for(&decl).map(Some),
            None => Ok(None),
        }
    }

    /// Structural info for a declaration that need not come from the
    /// source.
    pub fn class_info_for(&self, decl: &TypeDecl) -> Result<Arc<ClassInfo>, ComposeError> {
        if let Some(info) = self.infos.get(&decl.name) {
            return Ok(Arc::clone(info.value()));
        }
        for extractor in self.extractors.iter() {
            if let Some(info) = extractor.obtain_info(decl, self)? {
                tracing::trace!(name = %decl.name, extractor = extractor.name(), "obtained info");
                return Ok(self.cache_info(info));
            }
        }
        Err(ComposeError::Unclaimed {
            name: decl.name.to_string(),
        })
    }

    fn cache_info(&self, info: ClassInfo) -> Arc<ClassInfo> {
        let entry = self.infos.entry(info.name.clone()).or_insert_with(|| {
            for m in &info.methods {
                if let Some(body) = &m.body {
                    self.loader
                        .define_entry(EntryPoint::new(&info.name, m.key.clone()), body.clone());
                }
            }
            Arc::new(info)
        });
        Arc::clone(entry.value())
    }

    /// The registered trait `name`.
    pub fn trait_info(&self, name: &Symbol) -> Option<Arc<Trait>> {
        self.traits.read().get(name).cloned()
    }

    /// Build and register the trait declared by `decl`, or return the one
    /// already registered under its name.
    #[tracing::instrument(level = "debug", skip_all, fields(name = %decl.name))]
    pub fn register_trait(&self, decl: &TypeDecl) -> Result<Arc<Trait>, ComposeError> {
        if let Some(t) = self.trait_info(&decl.name) {
            return Ok(t);
        }

        let guard = self.registering.lock();
        if let Some(t) = self.trait_info(&decl.name) {
            return Ok(t);
        }
        {
            let mut chain = guard.borrow_mut();
            if chain.contains(&decl.name) {
                let mut cycle: Vec<String> = chain
                    .iter()
                    .skip_while(|n| **n != decl.name)
                    .map(ToString::to_string)
                    .collect();
                cycle.push(decl.name.to_string());
                return Err(ComposeError::CyclicTraits { chain: cycle });
            }
            chain.push(decl.name.clone());
        }

        let built = self.build_trait(decl);
        guard.borrow_mut().pop();
        let t = Arc::new(built?);

        for m in &t.methods {
            self.loader
                .define_entry(static_entry(&t.name, &m.key), m.body.clone());
        }
        if let Some(init) = &t.initializer {
            self.loader
                .define_entry(EntryPoint::initializer(&t.name), init.clone());
        }
        self.traits.write().insert(t.name.clone(), Arc::clone(&t));
        tracing::debug!(
            fields = t.fields.len(),
            methods = t.methods.len(),
            supers = t.supers.len(),
            "registered trait"
        );
        Ok(t)
    }

    fn build_trait(&self, decl: &TypeDecl) -> Result<Trait, ComposeError> {
        for extractor in self.extractors.iter() {
            if let Some(t) = extractor.build_trait(decl, self)? {
                if t.name != decl.name {
                    return Err(ComposeError::TraitNameMismatch {
                        expected: decl.name.to_string(),
                        found: t.name.to_string(),
                    });
                }
                tracing::trace!(extractor = extractor.name(), "built trait");
                return Ok(t);
            }
        }
        Err(ComposeError::Unclaimed {
            name: decl.name.to_string(),
        })
    }

    /// Synthesize, assemble and define the composite `name` extending
    /// `base` with the registered traits `traits`, in that order.
    #[tracing::instrument(level = "debug", skip_all, fields(composite = %name, base = %base))]
    pub fn compile_composite(
        &self,
        name: &Symbol,
        base: &Symbol,
        traits: &[Symbol],
    ) -> Result<TypeHandle, ComposeError> {
        let start = Instant::now();
        let selected = traits
            .iter()
            .map(|t| {
                self.trait_info(t).ok_or_else(|| ComposeError::UnregisteredTrait {
                    name: t.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let def = synthesize(self, name, base, &selected)?;
        let binary = self.assembler.assemble(&def)?;
        let ty = self.define(name, &binary)?;

        log_at!(
            self.config.log_level,
            composite = %name,
            base = %base,
            traits = ?traits.iter().map(Symbol::as_str).collect::<Vec<_>>(),
            methods = def.methods.len(),
            elapsed = ?start.elapsed(),
            "synthesized composite"
        );
        Ok(ty)
    }

    /// Hand `binary` to the debugger, then define it in the loader.
    pub fn define(&self, name: &Symbol, binary: &[u8]) -> Result<TypeHandle, ComposeError> {
        self.debugger.define(name, binary);
        self.loader.define(name, binary)
    }

    pub fn get_defined(&self, name: &Symbol) -> Option<TypeHandle> {
        self.loader.get_defined(name)
    }
}

impl StructuralInfoProvider for Composer {
    fn resolve(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError> {
        self.class_info(name)
    }
}

impl ExtractCx for Composer {
    fn class_info(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError> {
        Composer::class_info(self, name)
    }

    fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>> {
        Composer::declaration(self, name)
    }

    fn register_parent(&self, name: &Symbol) -> Result<Arc<Trait>, ComposeError> {
        let decl = self
            .source
            .declaration(name)
            .ok_or_else(|| ComposeError::unknown(name))?;
        self.register_trait(&decl)
    }

    fn filter_annotation(&self, ty: &Symbol, value: &Symbol) -> bool {
        self.filter.filter(ty, value)
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("extractors", &self.extractors)
            .field("config", &self.config)
            .field("infos", &self.infos.len())
            .field("traits", &self.traits.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
